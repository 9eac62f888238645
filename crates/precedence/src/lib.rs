//! gramex-precedence: operator-precedence tables and reduction.
//!
//! [`build()`] derives a [`PrecedenceMatrix`] from a loop-free grammar by
//! static analysis of its patterns. [`OperatorPrecedenceParser`] uses the
//! matrix to reduce a token stream handle by handle.

pub mod builder;
pub mod matrix;
pub mod reducer;

pub use builder::{build, build_with, BuildError, BuildOptions};
pub use matrix::{Conflict, Entry, PrecedenceMatrix, Relation};
pub use reducer::{OperatorPrecedenceParser, ReduceError, Reduction};
