//! Top-down driver: runs the matcher from the grammar's start symbol.

use crate::error::{ParseError, SyntaxError};
use crate::grammar::Grammar;
use crate::matcher::{MatchOptions, Matcher, ParseContext};
use crate::node::{self, ParseNode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Treat tokens left over after the start symbol matched as an error.
    pub require_full_consumption: bool,
    #[serde(flatten)]
    pub limits: MatchOptions,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            require_full_consumption: true,
            limits: MatchOptions::default(),
        }
    }
}

/// A successful top-down parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    /// Serialized node of the start symbol.
    pub serialized: String,
    pub bindings: BTreeMap<String, String>,
    /// Tokens consumed from the front of the input.
    pub consumed: usize,
}

impl ParseTree {
    pub fn to_node(&self) -> Result<ParseNode, node::NodeError> {
        node::decode(&self.serialized)
    }
}

pub struct TopDownParser<'g> {
    grammar: &'g Grammar,
    options: ParseOptions,
}

impl<'g> TopDownParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_options(grammar, ParseOptions::default())
    }

    pub fn with_options(grammar: &'g Grammar, options: ParseOptions) -> Self {
        TopDownParser { grammar, options }
    }

    /// Parse `tokens` from index 0. Identifier types found along the way
    /// are written into `ctx`.
    pub fn parse<T: AsRef<str>>(
        &self,
        tokens: &[T],
        ctx: &mut ParseContext,
    ) -> Result<ParseTree, ParseError> {
        let matcher = Matcher::with_options(self.grammar, self.options.limits);
        let start = self.grammar.start();
        debug!(target: "syntax", "parsing {} tokens from '{}'", tokens.len(), start);
        let result = matcher.match_symbol(start, tokens, 0, ctx)?;

        if !result.success {
            let failure = result.deepest.unwrap_or_else(|| {
                crate::error::MatchFailure::new(format!("'{}' did not match", start), None, 0)
            });
            return Err(ParseError::Syntax(self.syntax_error(
                failure.message,
                failure.token,
                failure.index,
            )));
        }

        if self.options.require_full_consumption && result.end < tokens.len() {
            let error = match result.deepest {
                Some(failure) if failure.index >= result.end => {
                    self.syntax_error(failure.message, failure.token, failure.index)
                }
                _ => {
                    let token = tokens[result.end].as_ref();
                    self.syntax_error(
                        format!(
                            "unexpected '{}' at index {} after the end of '{}'",
                            token, result.end, start
                        ),
                        Some(token.to_owned()),
                        result.end,
                    )
                }
            };
            return Err(ParseError::Syntax(error));
        }

        debug!(target: "syntax", "'{}' consumed {} of {} tokens", start, result.end, tokens.len());
        Ok(ParseTree {
            serialized: result.output,
            bindings: result.bindings,
            consumed: result.end,
        })
    }

    fn syntax_error(&self, message: String, token: Option<String>, index: usize) -> SyntaxError {
        let token_name = token
            .as_deref()
            .and_then(|token| self.grammar.pack().describe(token));
        SyntaxError {
            message,
            token,
            token_name,
            index,
        }
    }
}
