//! Terminal dictionary.
//!
//! A [`TerminalPack`] assigns every terminal spelling a stable integer code
//! and reserves two pseudo-terminal codes, one for identifiers and one for
//! literals. Codes follow declaration order; the identifier code is the
//! first free code after the last terminal and the literal code follows it.

use serde::Serialize;
use std::collections::HashMap;

/// Integer code of a terminal.
pub type TerminalCode = u32;

/// Display label of the identifier pseudo-terminal.
pub const IDENTIFIER_LABEL: &str = "<identifier>";
/// Display label of the literal pseudo-terminal.
pub const LITERAL_LABEL: &str = "<literal>";

/// Characters (and the `@$` pair) reserved by the serialized node format.
pub const RESERVED_DELIMITERS: [&str; 5] = ["(", ")", "|", "#", "@$"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Terminal {
    pub code: TerminalCode,
    pub text: String,
}

/// How the lexer recognizes a terminal in raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStyle {
    /// Keyword: recognized only as a whole word.
    Word,
    /// Punctuation: recognized anywhere, longest match first.
    Spaced,
}

/// Which class a token belongs to once its code is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Ordinary(TerminalCode),
    Identifier,
    Literal,
}

#[derive(Debug, Clone)]
pub struct TerminalPack {
    terminals: Vec<Terminal>,
    styles: Vec<TerminalStyle>,
    by_text: HashMap<String, TerminalCode>,
    identifier_code: TerminalCode,
    literal_code: TerminalCode,
}

impl TerminalPack {
    pub fn builder() -> TerminalPackBuilder {
        TerminalPackBuilder::default()
    }

    pub fn find_code(&self, text: &str) -> Option<TerminalCode> {
        self.by_text.get(text).copied()
    }

    /// Spelling for an ordinary code, or the display label for the
    /// identifier/literal pseudo-terminals.
    pub fn find_text(&self, code: TerminalCode) -> Option<&str> {
        if code == self.identifier_code {
            return Some(IDENTIFIER_LABEL);
        }
        if code == self.literal_code {
            return Some(LITERAL_LABEL);
        }
        self.terminals
            .get(code as usize)
            .map(|terminal| terminal.text.as_str())
    }

    pub fn identifier_code(&self) -> TerminalCode {
        self.identifier_code
    }

    pub fn literal_code(&self) -> TerminalCode {
        self.literal_code
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn style(&self, code: TerminalCode) -> Option<TerminalStyle> {
        self.styles.get(code as usize).copied()
    }

    /// Spaced terminals, longest spelling first.
    pub fn spaced_terminals(&self) -> Vec<&Terminal> {
        let mut spaced: Vec<&Terminal> = self
            .terminals
            .iter()
            .filter(|t| self.styles[t.code as usize] == TerminalStyle::Spaced)
            .collect();
        spaced.sort_by(|a, b| b.text.len().cmp(&a.text.len()).then(a.code.cmp(&b.code)));
        spaced
    }

    /// All codes a precedence matrix must cover: every terminal, then the
    /// identifier and literal codes.
    pub fn all_codes(&self) -> Vec<TerminalCode> {
        let mut codes: Vec<TerminalCode> = self.terminals.iter().map(|t| t.code).collect();
        codes.push(self.identifier_code);
        codes.push(self.literal_code);
        codes
    }

    /// Format an identifier token for the table index.
    pub fn identifier_token(&self, index: usize) -> String {
        format!("{}.{}", self.identifier_code, index)
    }

    /// Format a literal token for its printed form.
    pub fn literal_token(&self, text: &str) -> String {
        format!("{}.{}", self.literal_code, text)
    }

    /// Classify a token from a token stream. Returns `None` for text that
    /// is neither a known spelling nor an identifier/literal token.
    pub fn classify(&self, token: &str) -> Option<TokenClass> {
        if let Some(code) = self.find_code(token) {
            return Some(TokenClass::Ordinary(code));
        }
        match split_token(token) {
            Some((code, _)) if code == self.identifier_code => Some(TokenClass::Identifier),
            Some((code, _)) if code == self.literal_code => Some(TokenClass::Literal),
            _ => None,
        }
    }

    /// Terminal code a token stands for, folding identifiers and literals
    /// onto their pseudo-terminal codes.
    pub fn token_code(&self, token: &str) -> Option<TerminalCode> {
        match self.classify(token)? {
            TokenClass::Ordinary(code) => Some(code),
            TokenClass::Identifier => Some(self.identifier_code),
            TokenClass::Literal => Some(self.literal_code),
        }
    }

    /// Human-readable name for a token: a bare integer is looked up as a
    /// terminal code, identifier and literal tokens are labelled.
    pub fn describe(&self, token: &str) -> Option<String> {
        if let Ok(code) = token.parse::<TerminalCode>() {
            return self.find_text(code).map(str::to_owned);
        }
        match self.classify(token)? {
            TokenClass::Ordinary(_) => None,
            TokenClass::Identifier => Some(IDENTIFIER_LABEL.to_owned()),
            TokenClass::Literal => {
                let (_, value) = split_token(token)?;
                Some(format!("{} {}", LITERAL_LABEL, value))
            }
        }
    }
}

/// Split a `<code>.<value>` token. The value may itself contain dots.
pub fn split_token(token: &str) -> Option<(TerminalCode, &str)> {
    let (code, value) = token.split_once('.')?;
    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    code.parse().ok().map(|code| (code, value))
}

#[derive(Debug, Default)]
pub struct TerminalPackBuilder {
    entries: Vec<(String, TerminalStyle)>,
}

impl TerminalPackBuilder {
    pub fn word(mut self, text: &str) -> Self {
        self.entries.push((text.to_owned(), TerminalStyle::Word));
        self
    }

    pub fn words(mut self, texts: &[&str]) -> Self {
        for text in texts {
            self = self.word(text);
        }
        self
    }

    pub fn spaced(mut self, text: &str) -> Self {
        self.entries.push((text.to_owned(), TerminalStyle::Spaced));
        self
    }

    pub fn spaced_all(mut self, texts: &[&str]) -> Self {
        for text in texts {
            self = self.spaced(text);
        }
        self
    }

    /// Assign codes. A repeated spelling keeps its first code.
    pub fn build(self) -> TerminalPack {
        let mut terminals = Vec::new();
        let mut styles = Vec::new();
        let mut by_text = HashMap::new();
        for (text, style) in self.entries {
            if by_text.contains_key(&text) {
                continue;
            }
            let code = terminals.len() as TerminalCode;
            by_text.insert(text.clone(), code);
            terminals.push(Terminal { code, text });
            styles.push(style);
        }
        let identifier_code = terminals.len() as TerminalCode;
        TerminalPack {
            terminals,
            styles,
            by_text,
            identifier_code,
            literal_code: identifier_code + 1,
        }
    }
}
