use serde::{Deserialize, Serialize};

/// A recoverable match failure: where matching stopped and why.
///
/// Failures are compared by `index`; the deepest one explains a failed
/// parse best.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFailure {
    pub message: String,
    /// Offending token, `None` at end of input.
    pub token: Option<String>,
    pub index: usize,
}

impl MatchFailure {
    pub fn new(message: impl Into<String>, token: Option<&str>, index: usize) -> Self {
        MatchFailure {
            message: message.into(),
            token: token.map(str::to_owned),
            index,
        }
    }
}

/// Keep the failure with the greater index; ties keep the earlier one.
pub fn deeper(current: Option<MatchFailure>, candidate: Option<MatchFailure>) -> Option<MatchFailure> {
    match (current, candidate) {
        (Some(current), Some(candidate)) if candidate.index > current.index => Some(candidate),
        (Some(current), _) => Some(current),
        (None, candidate) => candidate,
    }
}

/// A defect in the grammar itself. Aborts the whole operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarFault {
    #[error("symbol '{name}' is not defined (referenced from '{referenced_by}')")]
    UndefinedSymbol { name: String, referenced_by: String },

    #[error("symbol '{symbol}', pattern {pattern}, operation {operation}: {message}")]
    Unbalanced {
        symbol: String,
        pattern: usize,
        operation: usize,
        message: String,
    },

    #[error("symbol '{symbol}', pattern {pattern}: loops and selections cannot be analyzed for precedence")]
    UnsupportedOperation { symbol: String, pattern: usize },

    #[error("symbol '{symbol}', pattern {pattern}: type tag refers to unbound variable '{variable}'")]
    UnboundTypeVariable {
        symbol: String,
        pattern: usize,
        variable: String,
    },

    #[error("symbol '{symbol}', pattern {pattern}: captured terminal '{text}' contains a reserved delimiter")]
    ReservedDelimiter {
        symbol: String,
        pattern: usize,
        text: String,
    },

    #[error("symbol '{0}' is defined more than once")]
    DuplicateSymbol(String),

    #[error("start symbol '{0}' is not defined")]
    MissingStart(String),

    #[error("{resource} limit of {limit} exceeded at symbol '{symbol}'")]
    LimitExceeded {
        symbol: String,
        resource: Resource,
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Depth,
    Steps,
    Rounds,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Depth => write!(f, "recursion depth"),
            Resource::Steps => write!(f, "step"),
            Resource::Rounds => write!(f, "fixed-point round"),
        }
    }
}

impl GrammarFault {
    /// Name of the nonterminal the fault was detected in.
    pub fn symbol(&self) -> &str {
        match self {
            GrammarFault::UndefinedSymbol { referenced_by, .. } => referenced_by,
            GrammarFault::Unbalanced { symbol, .. }
            | GrammarFault::UnsupportedOperation { symbol, .. }
            | GrammarFault::UnboundTypeVariable { symbol, .. }
            | GrammarFault::ReservedDelimiter { symbol, .. }
            | GrammarFault::LimitExceeded { symbol, .. } => symbol,
            GrammarFault::DuplicateSymbol(name) | GrammarFault::MissingStart(name) => name,
        }
    }

    pub fn pattern(&self) -> Option<usize> {
        match self {
            GrammarFault::Unbalanced { pattern, .. }
            | GrammarFault::UnsupportedOperation { pattern, .. }
            | GrammarFault::UnboundTypeVariable { pattern, .. }
            | GrammarFault::ReservedDelimiter { pattern, .. } => Some(*pattern),
            _ => None,
        }
    }
}

/// A user-visible syntax error from the top-down driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub message: String,
    pub token: Option<String>,
    /// Terminal name for the token, when it can be resolved.
    pub token_name: Option<String>,
    pub index: usize,
}

impl SyntaxError {
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "index":      self.index,
            "message":    self.message,
            "token":      self.token,
            "token_name": self.token_name,
        })
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(name) = &self.token_name {
            write!(f, " (symbol is \"{}\")", name)?;
        }
        Ok(())
    }
}

/// Outcome of a failed top-down parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(SyntaxError),
    #[error("grammar fault: {0}")]
    Grammar(#[from] GrammarFault),
}

impl ParseError {
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            ParseError::Syntax(err) => serde_json::json!({ "syntax": err.to_json_value() }),
            ParseError::Grammar(fault) => serde_json::json!({
                "grammar": {
                    "message": fault.to_string(),
                    "symbol":  fault.symbol(),
                    "pattern": fault.pattern(),
                }
            }),
        }
    }
}
