//! PL/I emission for Pascal parse trees.
//!
//! Declared types are read from the identifier table, where the parser's
//! type tagging put them. The tree's own `variable type` is the fallback.

use crate::kind::NodeKind;
use crate::CodegenError;
use gramex_core::terminal::{split_token, TerminalPack};
use gramex_core::{IdentifierTable, ParseNode};
use log::debug;

const INDENT: &str = "    ";

/// Render a `program file` tree as a PL/I main procedure.
pub fn generate(
    tree: &ParseNode,
    pack: &TerminalPack,
    identifiers: &IdentifierTable,
) -> Result<String, CodegenError> {
    let mut generator = Pl1Generator {
        pack,
        identifiers,
        lines: Vec::new(),
        depth: 0,
    };
    generator.program(tree)?;
    debug!(target: "codegen", "emitted {} lines", generator.lines.len());
    let mut out = generator.lines.join("\n");
    out.push('\n');
    Ok(out)
}

fn pl1_type(pascal: &str) -> Option<&'static str> {
    match pascal {
        "integer" => Some("FIXED DECIMAL(32, 0)"),
        "real" => Some("FLOAT DECIMAL(32)"),
        "char" => Some("CHARACTER(1)"),
        "string" => Some("CHARACTER(32767) VARYING"),
        _ => None,
    }
}

fn binary(op: &str, left: String, right: String) -> String {
    match op {
        "and" => format!("{} & {}", left, right),
        "or" => format!("{} | {}", left, right),
        "<>" => format!("{} ^= {}", left, right),
        "div" => format!("TRUNC({} / {})", left, right),
        "mod" => format!("MOD({}, {})", left, right),
        _ => format!("{} {} {}", left, op, right),
    }
}

/// Items of a right-nested list: `item` on each node, `more` to continue.
fn chain<'n>(node: &'n ParseNode, item: &str) -> Vec<&'n ParseNode> {
    let mut out = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        out.extend(n.node(item));
        current = n.node("more");
    }
    out
}

fn chain_leaves<'n>(node: &'n ParseNode, item: &str) -> Vec<&'n str> {
    let mut out = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        out.extend(n.leaf(item));
        current = n.node("more");
    }
    out
}

fn child<'n>(node: &'n ParseNode, binding: &str) -> Result<&'n ParseNode, CodegenError> {
    node.node(binding).ok_or_else(|| CodegenError::MissingBinding {
        node: node.name.clone(),
        binding: binding.to_owned(),
    })
}

fn leaf<'n>(node: &'n ParseNode, binding: &str) -> Result<&'n str, CodegenError> {
    node.leaf(binding).ok_or_else(|| CodegenError::MissingBinding {
        node: node.name.clone(),
        binding: binding.to_owned(),
    })
}

fn unexpected(expected: &str, node: &ParseNode) -> CodegenError {
    CodegenError::UnexpectedNode {
        expected: expected.to_owned(),
        found: node.name.clone(),
    }
}

struct Pl1Generator<'a> {
    pack: &'a TerminalPack,
    identifiers: &'a IdentifierTable,
    lines: Vec<String>,
    depth: usize,
}

impl Pl1Generator<'_> {
    fn line(&mut self, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(self.depth), text.as_ref()));
    }

    fn identifier(&self, token: &str) -> Result<String, CodegenError> {
        let index = match split_token(token) {
            Some((code, index)) if code == self.pack.identifier_code() => index.parse::<usize>().ok(),
            _ => None,
        };
        index
            .and_then(|index| self.identifiers.name(index))
            .map(str::to_uppercase)
            .ok_or_else(|| CodegenError::UnknownIdentifier(token.to_owned()))
    }

    fn operand(&self, token: &str) -> Result<String, CodegenError> {
        match split_token(token) {
            Some((code, _)) if code == self.pack.identifier_code() => self.identifier(token),
            Some((code, value)) if code == self.pack.literal_code() => Ok(match value {
                "true" => "'1'B".to_owned(),
                "false" => "'0'B".to_owned(),
                quoted if quoted.starts_with('"') => format!("'{}'", quoted.trim_matches('"')),
                other => other.to_owned(),
            }),
            _ => Ok(token.to_owned()),
        }
    }

    // ── Program structure ────────────────────────────────────────────

    fn program(&mut self, node: &ParseNode) -> Result<(), CodegenError> {
        if NodeKind::of(&node.name) != NodeKind::Program {
            return Err(unexpected("program file", node));
        }
        let header = child(node, "header")?;
        let name = self.identifier(leaf(header, "name")?)?;
        self.line(format!("{}: PROCEDURE OPTIONS (MAIN);", name));
        self.depth += 1;
        if let Some(description) = node.node("description") {
            for declaration in chain(description, "declaration") {
                self.declaration(declaration)?;
            }
        }
        let body = child(node, "operators")?;
        for operator in self.section_operators(body)? {
            self.operator(operator)?;
        }
        self.depth -= 1;
        self.line(format!("END {};", name));
        Ok(())
    }

    fn declaration(&mut self, node: &ParseNode) -> Result<(), CodegenError> {
        let declared = child(node, "type")?.leaf("type");
        for token in chain_leaves(child(node, "list")?, "variable") {
            let name = self.identifier(token)?;
            let tagged = split_token(token)
                .and_then(|(_, index)| index.parse::<usize>().ok())
                .and_then(|index| self.identifiers.get_type(index));
            let pascal = tagged.or(declared).ok_or_else(|| CodegenError::MissingBinding {
                node: node.name.clone(),
                binding: "type".to_owned(),
            })?;
            let target = pl1_type(pascal).ok_or_else(|| CodegenError::UnknownType {
                identifier: name.clone(),
                type_name: pascal.to_owned(),
            })?;
            self.line(format!("DECLARE {} {};", name, target));
        }
        Ok(())
    }

    /// Operators of an `operator section`: a `begin ... end` list or one
    /// operator.
    fn section_operators<'n>(&self, section: &'n ParseNode) -> Result<Vec<&'n ParseNode>, CodegenError> {
        if let Some(list) = section.node("list") {
            return Ok(chain(list, "operator"));
        }
        Ok(vec![child(section, "operator")?])
    }

    fn branch(&mut self, prefix: String, section: &ParseNode) -> Result<(), CodegenError> {
        let operators = self.section_operators(section)?;
        if section.node("list").is_some() {
            self.line(format!("{} DO;", prefix));
            self.depth += 1;
            for operator in operators {
                self.operator(operator)?;
            }
            self.depth -= 1;
            self.line("END;");
        } else {
            self.line(prefix);
            self.depth += 1;
            for operator in operators {
                self.operator(operator)?;
            }
            self.depth -= 1;
        }
        Ok(())
    }

    fn operator(&mut self, node: &ParseNode) -> Result<(), CodegenError> {
        let statement = match NodeKind::of(&node.name) {
            NodeKind::Operator => child(node, "statement")?,
            _ => node,
        };
        match NodeKind::of(&statement.name) {
            NodeKind::Assignment => {
                let target = self.identifier(leaf(statement, "target")?)?;
                let value = self.expression(child(statement, "value")?)?;
                self.line(format!("{} = {};", target, value));
            }
            NodeKind::Input | NodeKind::Output => {
                let names = chain_leaves(child(statement, "list")?, "variable")
                    .into_iter()
                    .map(|token| self.identifier(token))
                    .collect::<Result<Vec<_>, _>>()?;
                let verb = if NodeKind::of(&statement.name) == NodeKind::Input {
                    "GET"
                } else {
                    "PUT"
                };
                self.line(format!("{} LIST ({});", verb, names.join(", ")));
            }
            NodeKind::Conditional => {
                let condition = self.expression(child(statement, "condition")?)?;
                self.branch(format!("IF {} THEN", condition), child(statement, "then")?)?;
                if let Some(otherwise) = statement.node("else") {
                    self.branch("ELSE".to_owned(), otherwise)?;
                }
            }
            NodeKind::Other(name) => self.line(name),
            NodeKind::Program
            | NodeKind::Header
            | NodeKind::DescriptionSection
            | NodeKind::DeclarationList
            | NodeKind::Declaration
            | NodeKind::VariableType
            | NodeKind::VariableList
            | NodeKind::VariableListTail
            | NodeKind::OperatorSection
            | NodeKind::OperatorList
            | NodeKind::OperatorListTail
            | NodeKind::Operator
            | NodeKind::Expression
            | NodeKind::ExpressionTail
            | NodeKind::Comparison
            | NodeKind::ComparisonOperator
            | NodeKind::Sum
            | NodeKind::SumTail
            | NodeKind::Term
            | NodeKind::TermTail
            | NodeKind::Factor => return Err(unexpected("statement", statement)),
        }
        Ok(())
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Fold `left` with the `op`/`right` pairs of its tail chain.
    fn fold(&self, node: &ParseNode) -> Result<String, CodegenError> {
        let mut acc = self.expression(child(node, "left")?)?;
        let mut tail = node.node("more");
        while let Some(t) = tail {
            if let (Some(op), Some(right)) = (t.leaf("op"), t.node("right")) {
                acc = binary(op, acc, self.expression(right)?);
            }
            tail = t.node("more");
        }
        Ok(acc)
    }

    fn expression(&self, node: &ParseNode) -> Result<String, CodegenError> {
        match NodeKind::of(&node.name) {
            NodeKind::Expression => match node.node("negated") {
                Some(inner) => Ok(format!("^({})", self.expression(inner)?)),
                None => self.fold(node),
            },
            NodeKind::Sum | NodeKind::Term => self.fold(node),
            NodeKind::Comparison => {
                let left = self.expression(child(node, "left")?)?;
                match (node.node("op"), node.node("right")) {
                    (Some(op), Some(right)) => {
                        Ok(binary(leaf(op, "op")?, left, self.expression(right)?))
                    }
                    _ => Ok(left),
                }
            }
            NodeKind::Factor => {
                if let Some(inner) = node.node("negated") {
                    return Ok(format!("-{}", self.expression(inner)?));
                }
                match (node.leaf("value"), node.node("value")) {
                    (Some(token), _) => self.operand(token),
                    (None, Some(inner)) => Ok(format!("({})", self.expression(inner)?)),
                    (None, None) => Err(CodegenError::MissingBinding {
                        node: node.name.clone(),
                        binding: "value".to_owned(),
                    }),
                }
            }
            NodeKind::Other(name) => Ok(name),
            NodeKind::Program
            | NodeKind::Header
            | NodeKind::DescriptionSection
            | NodeKind::DeclarationList
            | NodeKind::Declaration
            | NodeKind::VariableType
            | NodeKind::VariableList
            | NodeKind::VariableListTail
            | NodeKind::OperatorSection
            | NodeKind::OperatorList
            | NodeKind::OperatorListTail
            | NodeKind::Operator
            | NodeKind::Assignment
            | NodeKind::Conditional
            | NodeKind::Input
            | NodeKind::Output
            | NodeKind::ExpressionTail
            | NodeKind::ComparisonOperator
            | NodeKind::SumTail
            | NodeKind::TermTail => Err(unexpected("expression", node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramex_core::node::decode;
    use gramex_core::pascal;

    fn table(names: &[&str]) -> IdentifierTable {
        let mut table = IdentifierTable::new();
        for name in names {
            table.intern(name);
        }
        table
    }

    #[test]
    fn test_binary_operator_mapping() {
        assert_eq!(binary("<>", "A".into(), "B".into()), "A ^= B");
        assert_eq!(binary("mod", "A".into(), "2".into()), "MOD(A, 2)");
        assert_eq!(binary("+", "A".into(), "B".into()), "A + B");
    }

    #[test]
    fn test_minimal_tree_renders_empty_procedure() {
        let pack = pascal::terminals();
        let tree = decode("((35.0@$name#header)@$header|((#operator list)@$list#operator section)@$operators#program file)").unwrap();
        let out = generate(&tree, &pack, &table(&["demo"])).unwrap();
        assert_eq!(out, "DEMO: PROCEDURE OPTIONS (MAIN);\nEND DEMO;\n");
    }

    #[test]
    fn test_unknown_statement_falls_back_to_name() {
        let pack = pascal::terminals();
        let tree = decode("((35.0@$name#header)@$header|((#halt)@$operator#operator section)@$operators#program file)").unwrap();
        let out = generate(&tree, &pack, &table(&["p"])).unwrap();
        assert!(out.contains("\n    halt\n"));
    }

    #[test]
    fn test_declared_type_without_pl1_form() {
        let pack = pascal::terminals();
        let tree = decode(concat!(
            "((35.0@$name#header)@$header",
            "|(((35.1@$variable#variable list)@$list|(set@$type#variable type)@$type#declaration)",
            "@$declaration#description section)@$description",
            "|((#operator list)@$list#operator section)@$operators#program file)"
        ))
        .unwrap();
        assert_eq!(
            generate(&tree, &pack, &table(&["p", "s"])),
            Err(CodegenError::UnknownType {
                identifier: "S".into(),
                type_name: "set".into()
            })
        );
    }

    #[test]
    fn test_rejects_non_program_root() {
        let pack = pascal::terminals();
        let tree = decode("(#factor)").unwrap();
        assert_eq!(
            generate(&tree, &pack, &IdentifierTable::new()),
            Err(CodegenError::UnexpectedNode {
                expected: "program file".into(),
                found: "factor".into()
            })
        );
    }
}
