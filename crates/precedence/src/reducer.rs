//! Operator-precedence reducer.
//!
//! Each round finds the leftmost HIGHER pair in the window, or uses the
//! right edge when there is none. It then walks back over EQUAL pairs to
//! find where the handle starts, emits the handle and removes it from the
//! window. The last remaining token is the result.

use crate::matrix::{PrecedenceMatrix, Relation};
use gramex_core::{TerminalCode, TerminalPack};
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error("at least two tokens are needed, got {0}")]
    TooShort(usize),
    #[error("token '{token}' at index {index} is not a terminal of the grammar")]
    UnknownToken { token: String, index: usize },
    #[error("no precedence relation between '{left}' and '{right}' at index {index}")]
    NoRelation {
        left: String,
        right: String,
        index: usize,
    },
}

/// Handles in the order they were reduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reduction {
    pub handles: Vec<Vec<String>>,
    pub result: String,
}

impl Reduction {
    /// Every emitted token, in emission order.
    pub fn emitted(&self) -> Vec<&str> {
        self.handles.iter().flatten().map(String::as_str).collect()
    }

    pub fn postfix(&self) -> String {
        self.emitted().join(" ")
    }
}

struct Slot {
    token: String,
    code: TerminalCode,
    /// Position in the original input.
    index: usize,
}

pub struct OperatorPrecedenceParser<'a> {
    matrix: &'a PrecedenceMatrix,
    pack: &'a TerminalPack,
}

impl<'a> OperatorPrecedenceParser<'a> {
    pub fn new(matrix: &'a PrecedenceMatrix, pack: &'a TerminalPack) -> Self {
        OperatorPrecedenceParser { matrix, pack }
    }

    pub fn reduce<T: AsRef<str>>(&self, tokens: &[T]) -> Result<Reduction, ReduceError> {
        if tokens.len() < 2 {
            return Err(ReduceError::TooShort(tokens.len()));
        }

        let mut window = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            let token = token.as_ref();
            let code = self
                .pack
                .token_code(token)
                .ok_or_else(|| ReduceError::UnknownToken {
                    token: token.to_owned(),
                    index,
                })?;
            window.push(Slot {
                token: token.to_owned(),
                code,
                index,
            });
        }

        let mut handles = Vec::new();
        while window.len() > 1 {
            let end = self.handle_end(&window)?;
            let mut start = end;
            while start > 0 && self.matrix.get(window[start - 1].code, window[start].code) == Relation::Equal {
                start -= 1;
            }
            let handle: Vec<String> = window.drain(start..=end).map(|slot| slot.token).collect();
            debug!(target: "reduce", "handle [{}] at {}", handle.join(" "), start);
            handles.push(handle);
        }

        let result = match window.pop() {
            Some(slot) => {
                handles.push(vec![slot.token.clone()]);
                slot.token
            }
            // The last handle spanned the whole window.
            None => handles
                .last()
                .and_then(|handle| handle.last())
                .cloned()
                .unwrap_or_default(),
        };
        Ok(Reduction { handles, result })
    }

    /// Index of the last token of the next handle: the left side of the
    /// first HIGHER pair, else the last token.
    fn handle_end(&self, window: &[Slot]) -> Result<usize, ReduceError> {
        for (i, pair) in window.windows(2).enumerate() {
            match self.matrix.get(pair[0].code, pair[1].code) {
                Relation::Higher => return Ok(i),
                Relation::None => {
                    return Err(ReduceError::NoRelation {
                        left: pair[0].token.clone(),
                        right: pair[1].token.clone(),
                        index: pair[0].index,
                    })
                }
                Relation::Equal | Relation::Lower => {}
            }
        }
        Ok(window.len() - 1)
    }
}
