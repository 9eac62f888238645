mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use gramex_core::terminal::split_token;
use gramex_core::{
    pascal, Grammar, GrammarFault, IdentifierTable, Lexer, ParseContext, ParseError, TerminalPack,
    TokenClass, TopDownParser,
};
use gramex_precedence::{build_with, OperatorPrecedenceParser};
use log::{debug, info};

use crate::config::GramexConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Built-in grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GrammarName {
    /// Full Pascal program grammar
    Pascal,
    /// `program <id>; begin ... end.` with a looped operator list
    Minimal,
    /// Left-recursive operator grammar for precedence tables
    Expression,
}

impl GrammarName {
    fn as_str(self) -> &'static str {
        match self {
            GrammarName::Pascal => "pascal",
            GrammarName::Minimal => "minimal",
            GrammarName::Expression => "expression",
        }
    }

    fn load(self) -> Result<Grammar, GrammarFault> {
        match self {
            GrammarName::Pascal => pascal::grammar(),
            GrammarName::Minimal => pascal::minimal_grammar(),
            GrammarName::Expression => pascal::expression_grammar(),
        }
    }
}

/// Grammar-driven parsing toolkit.
#[derive(Parser)]
#[command(name = "gramex", version, about = "Grammar-driven parsing toolkit")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a gramex.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a Pascal source file
    Lex {
        /// Path to the source file
        file: PathBuf,
    },

    /// Parse a source file top-down and print its tree
    Parse {
        /// Path to the source file
        file: PathBuf,
        /// Grammar to parse with
        #[arg(long, default_value = "pascal", value_enum)]
        grammar: GrammarName,
        /// Accept a parse that leaves trailing tokens
        #[arg(long)]
        partial: bool,
    },

    /// Build and print the operator-precedence table of a grammar
    Table {
        /// Grammar to analyze
        #[arg(long, default_value = "expression", value_enum)]
        grammar: GrammarName,
        /// Fail on conflicting relations
        #[arg(long)]
        strict: bool,
    },

    /// Reduce an expression file with the operator-precedence table
    Reduce {
        /// Path to the expression file
        file: PathBuf,
        /// Grammar the table is built from
        #[arg(long, default_value = "expression", value_enum)]
        grammar: GrammarName,
    },

    /// Translate a Pascal program to PL/I
    Generate {
        /// Path to the Pascal source file
        file: PathBuf,
    },

    /// Validate a built-in grammar
    Check {
        /// Grammar to validate
        #[arg(long, default_value = "pascal", value_enum)]
        grammar: GrammarName,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("config error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    debug!("config: {:?}", config);

    match cli.command {
        Commands::Lex { file } => {
            cmd_lex(&file, cli.output, cli.quiet);
        }
        Commands::Parse {
            file,
            grammar,
            partial,
        } => {
            cmd_parse(&file, grammar, partial, &config, cli.output, cli.quiet);
        }
        Commands::Table { grammar, strict } => {
            cmd_table(grammar, strict, &config, cli.output, cli.quiet);
        }
        Commands::Reduce { file, grammar } => {
            cmd_reduce(&file, grammar, &config, cli.output, cli.quiet);
        }
        Commands::Generate { file } => {
            cmd_generate(&file, &config, cli.output, cli.quiet);
        }
        Commands::Check { grammar } => {
            cmd_check(grammar, cli.output, cli.quiet);
        }
    }
}

// ── Shared steps ─────────────────────────────────────────────────────────────

fn read_source(file: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn load_grammar(name: GrammarName, output: OutputFormat, quiet: bool) -> Grammar {
    match name.load() {
        Ok(g) => g,
        Err(e) => {
            let msg = format!("grammar '{}' is invalid: {}", name.as_str(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn tokenize(
    source: &str,
    pack: &TerminalPack,
    identifiers: &mut IdentifierTable,
    output: OutputFormat,
    quiet: bool,
) -> Vec<String> {
    match Lexer::new(pack).tokenize(source, identifiers) {
        Ok(tokens) => {
            info!("{} tokens, {} identifiers", tokens.len(), identifiers.len());
            tokens
        }
        Err(e) => {
            report_error(&format!("lexical error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn report_parse_error(e: &ParseError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("{}", e);
            }
        }
    }
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}

// ── Subcommands ──────────────────────────────────────────────────────────────

fn cmd_lex(file: &Path, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let pack = pascal::terminals();
    let mut identifiers = IdentifierTable::new();
    let tokens = tokenize(&source, &pack, &mut identifiers, output, quiet);

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "tokens": tokens,
            "identifiers": identifiers.records(),
        })),
        OutputFormat::Text => {
            for token in &tokens {
                match describe(token, &pack, &identifiers) {
                    Some(label) => println!("{}\t{}", token, label),
                    None => println!("{}", token),
                }
            }
        }
    }
}

/// Human-readable name for identifier and literal tokens.
fn describe(token: &str, pack: &TerminalPack, identifiers: &IdentifierTable) -> Option<String> {
    match pack.classify(token)? {
        TokenClass::Ordinary(_) => None,
        TokenClass::Identifier => {
            let (_, index) = split_token(token)?;
            let name = index.parse().ok().and_then(|i| identifiers.name(i))?;
            Some(format!("identifier {}", name))
        }
        TokenClass::Literal => pack.describe(token),
    }
}

fn cmd_parse(
    file: &Path,
    grammar_name: GrammarName,
    partial: bool,
    config: &GramexConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(file, output, quiet);
    let grammar = load_grammar(grammar_name, output, quiet);
    let mut ctx = ParseContext::new();
    let tokens = tokenize(&source, grammar.pack(), &mut ctx.identifiers, output, quiet);

    let mut options = config.parse;
    if partial {
        options.require_full_consumption = false;
    }
    let tree = match TopDownParser::with_options(&grammar, options).parse(&tokens, &mut ctx) {
        Ok(t) => t,
        Err(e) => {
            report_parse_error(&e, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "grammar": grammar_name.as_str(),
            "tree": tree.serialized,
            "consumed": tree.consumed,
            "tokens": tokens.len(),
            "identifiers": ctx.identifiers.records(),
        })),
        OutputFormat::Text => {
            println!("{}", tree.serialized);
            if !quiet && tree.consumed < tokens.len() {
                eprintln!(
                    "note: {} of {} tokens consumed",
                    tree.consumed,
                    tokens.len()
                );
            }
        }
    }
}

fn cmd_table(
    grammar_name: GrammarName,
    strict: bool,
    config: &GramexConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let grammar = load_grammar(grammar_name, output, quiet);
    let mut options = config.precedence;
    if strict {
        options.strict = true;
    }
    let matrix = match build_with(&grammar, options) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!("precedence table error: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&matrix.to_json_value()),
        OutputFormat::Text => {
            print!("{}", matrix.dump());
            if !quiet {
                for conflict in matrix.conflicts() {
                    eprintln!("warning: {}", conflict);
                }
            }
        }
    }
}

fn cmd_reduce(
    file: &Path,
    grammar_name: GrammarName,
    config: &GramexConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(file, output, quiet);
    let grammar = load_grammar(grammar_name, output, quiet);
    let matrix = match build_with(&grammar, config.precedence) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!("precedence table error: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let mut identifiers = IdentifierTable::new();
    let tokens = tokenize(&source, grammar.pack(), &mut identifiers, output, quiet);

    let reduction = match OperatorPrecedenceParser::new(&matrix, grammar.pack()).reduce(&tokens) {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("reduction error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "handles": reduction.handles,
            "postfix": reduction.postfix(),
            "result": reduction.result,
        })),
        OutputFormat::Text => {
            for handle in &reduction.handles {
                println!("{}", handle.join(" "));
            }
            if !quiet {
                println!("result: {}", reduction.result);
            }
        }
    }
}

fn cmd_generate(file: &Path, config: &GramexConfig, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let grammar = load_grammar(GrammarName::Pascal, output, quiet);
    let mut ctx = ParseContext::new();
    let tokens = tokenize(&source, grammar.pack(), &mut ctx.identifiers, output, quiet);

    let tree = match TopDownParser::with_options(&grammar, config.parse).parse(&tokens, &mut ctx) {
        Ok(t) => t,
        Err(e) => {
            report_parse_error(&e, output, quiet);
            process::exit(1);
        }
    };
    let node = match tree.to_node() {
        Ok(n) => n,
        Err(e) => {
            report_error(&format!("malformed parse tree: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let program = match gramex_codegen::generate(&node, grammar.pack(), &ctx.identifiers) {
        Ok(p) => p,
        Err(e) => {
            report_error(&format!("code generation error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({ "pl1": program })),
        OutputFormat::Text => print!("{}", program),
    }
}

fn cmd_check(grammar_name: GrammarName, output: OutputFormat, quiet: bool) {
    let grammar = load_grammar(grammar_name, output, quiet);
    if let Err(e) = grammar.validate() {
        let msg = format!("grammar '{}' is invalid: {}", grammar_name.as_str(), e);
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    let nonterminals = grammar.nonterminals().count();

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "grammar": grammar_name.as_str(),
                "valid": true,
                "start": grammar.start(),
                "nonterminals": nonterminals,
            })),
            OutputFormat::Text => println!(
                "grammar '{}' is valid: {} nonterminals, start '{}'",
                grammar_name.as_str(),
                nonterminals,
                grammar.start()
            ),
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
