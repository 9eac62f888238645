//! gramex-core: grammar model and top-down parsing.
//!
//! A [`Grammar`] maps nonterminals to ordered alternative [`Pattern`]s over
//! a [`TerminalPack`]. The [`Matcher`] executes patterns against a token
//! stream with backtracking over loops and selections, capturing variables
//! and tagging identifier types as it goes. [`TopDownParser`] runs it from
//! the start symbol.
//!
//! # Public API
//!
//! - [`TerminalPack`] -- terminal spellings and codes
//! - [`Grammar`], [`GrammarBuilder`], [`Pattern`], [`Operation`] -- grammar model
//! - [`Matcher`], [`ParseContext`], [`MatchResult`] -- the pattern engine
//! - [`TopDownParser`], [`ParseOptions`], [`ParseTree`] -- the driver
//! - [`Lexer`], [`IdentifierTable`] -- token stream collaborators
//! - [`ParseNode`] -- typed form of the serialized parse tree
//! - [`pascal`] -- built-in Pascal grammars

pub mod driver;
pub mod error;
pub mod grammar;
pub mod ident;
pub mod lexer;
pub mod matcher;
pub mod node;
pub mod pascal;
pub mod terminal;

// ── Convenience re-exports: key types ────────────────────────────────

pub use driver::{ParseOptions, ParseTree, TopDownParser};
pub use error::{GrammarFault, MatchFailure, ParseError, Resource, SyntaxError};
pub use grammar::{Grammar, GrammarBuilder, GrammarSymbol, OpKind, Operation, Pattern};
pub use ident::{IdentifierRecord, IdentifierTable};
pub use lexer::{LexError, Lexer};
pub use matcher::{MatchOptions, MatchResult, Matcher, ParseContext};
pub use node::{NodeError, NodeValue, ParseNode};
pub use terminal::{Terminal, TerminalCode, TerminalPack, TokenClass, IDENTIFIER_LABEL, LITERAL_LABEL};
