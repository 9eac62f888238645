//! Whole-program parses through the lexer, driver and Pascal grammars.

use gramex_core::pascal;
use gramex_core::{
    Lexer, ParseContext, ParseError, ParseOptions, ParseTree, TopDownParser,
};

const SUM_PROGRAM: &str = "\
program summation;
var i, total : integer;
    mean : real;
begin
  read(i);
  total := 0;
  if i > 0 then
  begin
    total := total + i * 2;
    mean := total / i
  end
  else total := 0 - 1;
  write(total, mean)
end.
";

fn lex(src: &str, ctx: &mut ParseContext) -> Vec<String> {
    Lexer::new(&pascal::terminals())
        .tokenize(src, &mut ctx.identifiers)
        .unwrap()
}

fn parse(src: &str) -> (Result<ParseTree, ParseError>, ParseContext, Vec<String>) {
    let grammar = pascal::grammar().unwrap();
    let mut ctx = ParseContext::new();
    let tokens = lex(src, &mut ctx);
    let result = TopDownParser::new(&grammar).parse(&tokens, &mut ctx);
    (result, ctx, tokens)
}

#[test]
fn parses_complete_program() {
    let (result, ctx, tokens) = parse(SUM_PROGRAM);
    let tree = result.unwrap();
    assert_eq!(tree.consumed, tokens.len());

    let node = tree.to_node().unwrap();
    assert_eq!(node.name, "program file");
    assert!(node.node("description").is_some());
    assert_eq!(node.node("header").unwrap().leaf("name"), Some("35.0"));

    let ids = &ctx.identifiers;
    assert_eq!(ids.get_type(ids.lookup("total").unwrap()), Some("integer"));
    assert_eq!(ids.get_type(ids.lookup("mean").unwrap()), Some("real"));
}

#[test]
fn program_without_declarations() {
    let (result, _, _) = parse("program p; write(x) .");
    let node = result.unwrap().to_node().unwrap();
    assert!(node.node("description").is_none());
    let statement = node
        .node("operators")
        .unwrap()
        .node("operator")
        .unwrap()
        .node("statement")
        .unwrap();
    assert_eq!(statement.name, "output");
}

#[test]
fn error_points_at_deepest_token() {
    let (result, _, tokens) = parse("program p;\nbegin x := ( 1 + end.");
    let Err(ParseError::Syntax(err)) = result else {
        panic!("expected a syntax error");
    };
    assert_eq!(tokens[err.index], "end");
    assert_eq!(err.token.as_deref(), Some("end"));
}

#[test]
fn error_names_identifier_tokens() {
    let (result, _, _) = parse("program p; begin x y end.");
    let Err(ParseError::Syntax(err)) = result else {
        panic!("expected a syntax error");
    };
    assert_eq!(err.token_name.as_deref(), Some("<identifier>"));
}

#[test]
fn trailing_tokens_depend_on_consumption_option() {
    let grammar = pascal::grammar().unwrap();
    let src = "program p; begin end. begin";

    let mut ctx = ParseContext::new();
    let tokens = lex(src, &mut ctx);
    let strict = TopDownParser::new(&grammar).parse(&tokens, &mut ctx);
    assert!(matches!(strict, Err(ParseError::Syntax(ref e)) if e.index == 6));

    let options = ParseOptions {
        require_full_consumption: false,
        ..ParseOptions::default()
    };
    let lenient = TopDownParser::with_options(&grammar, options)
        .parse(&tokens, &mut ctx)
        .unwrap();
    assert_eq!(lenient.consumed, 6);
}

#[test]
fn retyping_a_variable_keeps_last_declaration() {
    let (result, ctx, _) = parse("program p; var a : integer; a : char; begin end.");
    result.unwrap();
    let ids = &ctx.identifiers;
    assert_eq!(ids.get_type(ids.lookup("a").unwrap()), Some("char"));
}
