//! PL/I code generation from parsed Pascal programs.
//!
//! The input is the typed [`ParseNode`] tree produced by the top-down
//! driver over `gramex_core::pascal::grammar()`, together with the
//! identifier table the lexer and parser filled in.
//!
//! [`ParseNode`]: gramex_core::ParseNode

pub mod kind;
pub mod pl1;

use std::fmt;

/// Error type for code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// A node lacks a binding the generator needs.
    MissingBinding { node: String, binding: String },
    /// A node appeared where a different kind was required.
    UnexpectedNode { expected: String, found: String },
    /// A token that should name an identifier is not in the table.
    UnknownIdentifier(String),
    /// A declared type with no PL/I counterpart.
    UnknownType {
        identifier: String,
        type_name: String,
    },
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::MissingBinding { node, binding } => {
                write!(f, "node '{}' has no '{}' binding", node, binding)
            }
            CodegenError::UnexpectedNode { expected, found } => {
                write!(f, "expected {} node, found '{}'", expected, found)
            }
            CodegenError::UnknownIdentifier(token) => {
                write!(f, "token '{}' is not a known identifier", token)
            }
            CodegenError::UnknownType {
                identifier,
                type_name,
            } => write!(
                f,
                "identifier {} has type '{}' with no PL/I equivalent",
                identifier, type_name
            ),
        }
    }
}

impl std::error::Error for CodegenError {}

// Convenience re-exports
pub use kind::NodeKind;
pub use pl1::generate;
