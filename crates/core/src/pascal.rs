//! Built-in grammars for a small Pascal subset.
//!
//! [`grammar`] is the full program grammar for the top-down parser. Lists
//! are written as right-nested tail rules so every element survives in the
//! parse tree; selections cover inline alternatives and optional parts.
//! [`expression_grammar`] is loop-free and operator-shaped, for the
//! precedence builder.

use crate::error::GrammarFault;
use crate::grammar::{Grammar, Operation, Pattern};
use crate::terminal::TerminalPack;

pub const KEYWORDS: [&str; 17] = [
    "program", "var", "integer", "real", "char", "string", "begin", "end", "if", "then", "else",
    "read", "write", "not", "and", "or", "div",
];

pub const PUNCTUATION: [&str; 16] = [
    ":=", "<>", "<=", ">=", "=", "<", ">", "+", "-", "*", "/", "(", ")", ";", ":", ",",
];

/// Terminal pack shared by every built-in grammar.
pub fn terminals() -> TerminalPack {
    TerminalPack::builder()
        .words(&KEYWORDS)
        .word("mod")
        .spaced_all(&PUNCTUATION)
        .spaced(".")
        .build()
}

fn s(name: &str) -> Operation {
    Operation::symbol(name)
}

fn id() -> Operation {
    Operation::identifier()
}

fn lit() -> Operation {
    Operation::literal()
}

fn p(ops: Vec<Operation>) -> Pattern {
    Pattern::new(ops)
}

/// `SS a SB b SB ... SE`, each branch one operation.
fn one_of(branches: Vec<Operation>) -> Vec<Operation> {
    let mut ops = vec![Operation::selection_start()];
    let count = branches.len();
    for (i, branch) in branches.into_iter().enumerate() {
        ops.push(branch);
        ops.push(if i + 1 == count {
            Operation::selection_end()
        } else {
            Operation::selection_body()
        });
    }
    ops
}

/// `SS ops SB SE`: `ops` or nothing.
fn optional(ops: Vec<Operation>) -> Vec<Operation> {
    let mut out = vec![Operation::selection_start()];
    out.extend(ops);
    out.push(Operation::selection_body());
    out.push(Operation::selection_end());
    out
}

fn seq(parts: Vec<Vec<Operation>>) -> Pattern {
    Pattern::new(parts.into_iter().flatten().collect())
}

/// Full program grammar.
pub fn grammar() -> Result<Grammar, GrammarFault> {
    Grammar::builder(terminals())
        .rule(
            "program file",
            vec![seq(vec![
                vec![s("header").capture("header"), s(";")],
                optional(vec![s("description section").capture("description")]),
                vec![s("operator section").capture("operators"), s(".")],
            ])],
        )
        .rule(
            "header",
            vec![p(vec![s("program").type_of("name"), id().capture("name")])],
        )
        .rule(
            "description section",
            vec![p(vec![
                s("var"),
                s("declaration").capture("declaration"),
                s("declaration list").capture("more"),
            ])],
        )
        .rule(
            "declaration list",
            vec![
                p(vec![
                    s("declaration").capture("declaration"),
                    s("declaration list").capture("more"),
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "declaration",
            vec![p(vec![
                s("variable list").capture("list"),
                s(":"),
                s("variable type").capture("type").type_of("list"),
                s(";"),
            ])],
        )
        .rule(
            "variable type",
            vec![seq(vec![one_of(vec![
                s("integer").capture("type"),
                s("real").capture("type"),
                s("char").capture("type"),
                s("string").capture("type"),
            ])])],
        )
        .rule(
            "variable list",
            vec![p(vec![
                id().capture("variable"),
                s("variable list tail").capture("more"),
            ])],
        )
        .rule(
            "variable list tail",
            vec![
                p(vec![
                    s(","),
                    id().capture("variable"),
                    s("variable list tail").capture("more"),
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "operator section",
            vec![
                p(vec![s("begin"), s("operator list").capture("list"), s("end")]),
                p(vec![s("operator").capture("operator")]),
            ],
        )
        .rule(
            "operator list",
            vec![
                p(vec![
                    s("operator").capture("operator"),
                    s("operator list tail").capture("more"),
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "operator list tail",
            vec![
                p(vec![
                    s(";"),
                    s("operator").capture("operator"),
                    s("operator list tail").capture("more"),
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "operator",
            vec![seq(vec![one_of(vec![
                s("assignment").capture("statement"),
                s("conditional").capture("statement"),
                s("input").capture("statement"),
                s("output").capture("statement"),
            ])])],
        )
        .rule(
            "assignment",
            vec![p(vec![
                id().capture("target"),
                s(":="),
                s("expression").capture("value"),
            ])],
        )
        .rule(
            "conditional",
            vec![seq(vec![
                vec![
                    s("if"),
                    s("expression").capture("condition"),
                    s("then"),
                    s("operator section").capture("then"),
                ],
                optional(vec![s("else"), s("operator section").capture("else")]),
            ])],
        )
        .rule(
            "input",
            vec![p(vec![
                s("read"),
                s("("),
                s("variable list").capture("list"),
                s(")"),
            ])],
        )
        .rule(
            "output",
            vec![p(vec![
                s("write"),
                s("("),
                s("variable list").capture("list"),
                s(")"),
            ])],
        )
        .rule(
            "expression",
            vec![
                p(vec![s("not"), s("expression").capture("negated")]),
                p(vec![
                    s("comparison").capture("left"),
                    s("expression tail").capture("more"),
                ]),
            ],
        )
        .rule(
            "expression tail",
            vec![
                seq(vec![
                    one_of(vec![s("and").capture("op"), s("or").capture("op")]),
                    vec![
                        s("comparison").capture("right"),
                        s("expression tail").capture("more"),
                    ],
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "comparison",
            vec![seq(vec![
                vec![s("sum").capture("left")],
                optional(vec![
                    s("comparison operator").capture("op"),
                    s("sum").capture("right"),
                ]),
            ])],
        )
        .rule(
            "comparison operator",
            vec![seq(vec![one_of(vec![
                s("=").capture("op"),
                s("<>").capture("op"),
                s("<=").capture("op"),
                s(">=").capture("op"),
                s("<").capture("op"),
                s(">").capture("op"),
            ])])],
        )
        .rule(
            "sum",
            vec![p(vec![
                s("term").capture("left"),
                s("sum tail").capture("more"),
            ])],
        )
        .rule(
            "sum tail",
            vec![
                seq(vec![
                    one_of(vec![s("+").capture("op"), s("-").capture("op")]),
                    vec![s("term").capture("right"), s("sum tail").capture("more")],
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "term",
            vec![p(vec![
                s("factor").capture("left"),
                s("term tail").capture("more"),
            ])],
        )
        .rule(
            "term tail",
            vec![
                seq(vec![
                    one_of(vec![
                        s("*").capture("op"),
                        s("/").capture("op"),
                        s("div").capture("op"),
                        s("mod").capture("op"),
                    ]),
                    vec![s("factor").capture("right"), s("term tail").capture("more")],
                ]),
                Pattern::empty(),
            ],
        )
        .rule(
            "factor",
            vec![
                p(vec![id().capture("value")]),
                p(vec![lit().capture("value")]),
                p(vec![s("("), s("expression").capture("value"), s(")")]),
                p(vec![s("-"), s("factor").capture("negated")]),
            ],
        )
        .start("program file")
        .build()
}

/// `program <name> ; begin {operator ;} end .`
pub fn minimal_grammar() -> Result<Grammar, GrammarFault> {
    Grammar::builder(terminals())
        .rule(
            "program file",
            vec![p(vec![
                s("header").capture("header"),
                s(";"),
                s("begin"),
                s("operator list").capture("operators"),
                s("end"),
                s("."),
            ])],
        )
        .rule(
            "header",
            vec![p(vec![s("program").type_of("name"), id().capture("name")])],
        )
        .rule(
            "operator list",
            vec![p(vec![
                Operation::loop_start(),
                s("operator").capture("last"),
                s(";"),
                Operation::loop_end(),
            ])],
        )
        .rule(
            "operator",
            vec![p(vec![id().capture("target"), s(":="), s("operand").capture("value")])],
        )
        .rule(
            "operand",
            vec![p(vec![id().capture("value")]), p(vec![lit().capture("value")])],
        )
        .start("program file")
        .build()
}

/// Operator grammar over `+ - * / div mod`, parentheses, identifiers and
/// literals. Left-recursive, so only the precedence builder can use it.
pub fn expression_grammar() -> Result<Grammar, GrammarFault> {
    Grammar::builder(terminals())
        .rule(
            "expression",
            vec![
                p(vec![s("expression"), s("+"), s("term")]),
                p(vec![s("expression"), s("-"), s("term")]),
                p(vec![s("term")]),
            ],
        )
        .rule(
            "term",
            vec![
                p(vec![s("term"), s("*"), s("factor")]),
                p(vec![s("term"), s("/"), s("factor")]),
                p(vec![s("term"), s("div"), s("factor")]),
                p(vec![s("term"), s("mod"), s("factor")]),
                p(vec![s("factor")]),
            ],
        )
        .rule(
            "factor",
            vec![
                p(vec![s("("), s("expression"), s(")")]),
                p(vec![id()]),
                p(vec![lit()]),
            ],
        )
        .start("expression")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::TopDownParser;
    use crate::lexer::Lexer;
    use crate::matcher::ParseContext;

    fn parse(grammar: &Grammar, src: &str) -> (crate::driver::ParseTree, ParseContext) {
        let mut ctx = ParseContext::new();
        let tokens = Lexer::new(grammar.pack())
            .tokenize(src, &mut ctx.identifiers)
            .unwrap();
        let tree = TopDownParser::new(grammar).parse(&tokens, &mut ctx).unwrap();
        (tree, ctx)
    }

    #[test]
    fn terminal_codes_are_stable() {
        let pack = terminals();
        assert_eq!(pack.find_code("program"), Some(0));
        assert_eq!(pack.find_code("mod"), Some(17));
        assert_eq!(pack.find_code("."), Some(34));
        assert_eq!(pack.identifier_code(), 35);
        assert_eq!(pack.literal_code(), 36);
    }

    #[test]
    fn built_in_grammars_validate() {
        grammar().unwrap().validate().unwrap();
        minimal_grammar().unwrap().validate().unwrap();
        expression_grammar().unwrap().validate().unwrap();
    }

    #[test]
    fn start_symbol_does_not_shadow_program_keyword() {
        let pack = terminals();
        for g in [grammar().unwrap(), minimal_grammar().unwrap()] {
            assert_eq!(g.start(), "program file");
            assert!(g.symbol("program").unwrap().is_terminal());
            assert!(pack.find_code(g.start()).is_none());
        }
        let tree = TopDownParser::new(&minimal_grammar().unwrap())
            .parse(&["program", "35.0", ";", "begin", "end", "."], &mut ParseContext::new())
            .unwrap();
        assert_eq!(
            tree.serialized,
            "((35.0@$name#header)@$header|(#operator list)@$operators#program file)"
        );
    }

    #[test]
    fn minimal_program_has_header_and_empty_operator_list() {
        let grammar = minimal_grammar().unwrap();
        let tokens = ["program", "35.0", ";", "begin", "end", "."];
        let mut ctx = ParseContext::new();
        ctx.identifiers.intern("demo");
        let tree = TopDownParser::new(&grammar).parse(&tokens, &mut ctx).unwrap();
        assert_eq!(tree.bindings["header"], "(35.0@$name#header)");
        assert_eq!(tree.bindings["operators"], "(#operator list)");
        assert_eq!(ctx.identifiers.get_type(0), Some("program"));
    }

    #[test]
    fn minimal_program_with_operators() {
        let grammar = minimal_grammar().unwrap();
        let (tree, _) = parse(&grammar, "program p; begin a := 1; b := a; end.");
        let node = tree.to_node().unwrap();
        let list = node.node("operators").unwrap();
        assert_eq!(list.node("last").unwrap().leaf("target"), Some("35.2"));
    }

    #[test]
    fn declarations_tag_identifier_types() {
        let grammar = grammar().unwrap();
        let (_, ctx) = parse(
            &grammar,
            "program p;\nvar a, b : integer;\n    s : string;\nbegin a := 1 end.",
        );
        let ids = &ctx.identifiers;
        assert_eq!(ids.get_type(ids.lookup("p").unwrap()), Some("program"));
        assert_eq!(ids.get_type(ids.lookup("a").unwrap()), Some("integer"));
        assert_eq!(ids.get_type(ids.lookup("b").unwrap()), Some("integer"));
        assert_eq!(ids.get_type(ids.lookup("s").unwrap()), Some("string"));
    }

    #[test]
    fn conditional_with_and_without_else() {
        let grammar = grammar().unwrap();
        let (tree, _) = parse(
            &grammar,
            "program p; begin if a < 1 then b := 2 else b := 3; if not c then read(c) end.",
        );
        let node = tree.to_node().unwrap();
        let list = node.node("operators").unwrap().node("list").unwrap();
        let first = list.node("operator").unwrap().node("statement").unwrap();
        assert_eq!(first.name, "conditional");
        assert!(first.node("else").is_some());
        let second = list
            .node("more")
            .unwrap()
            .node("operator")
            .unwrap()
            .node("statement")
            .unwrap();
        assert!(second.node("else").is_none());
    }

    #[test]
    fn missing_period_is_reported_at_end() {
        let grammar = grammar().unwrap();
        let mut ctx = ParseContext::new();
        let tokens = Lexer::new(grammar.pack())
            .tokenize("program p; begin end", &mut ctx.identifiers)
            .unwrap();
        let err = TopDownParser::new(&grammar).parse(&tokens, &mut ctx).unwrap_err();
        let crate::error::ParseError::Syntax(err) = err else {
            panic!("expected a syntax error");
        };
        assert_eq!(err.index, tokens.len());
        assert_eq!(err.token, None);
    }
}
