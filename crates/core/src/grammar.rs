//! Grammar model: symbols, alternative patterns and their operations.
//!
//! A [`Grammar`] is immutable once built. Every pack terminal has a
//! terminal-wrapping symbol named by its spelling, and the identifier and
//! literal pseudo-terminals get symbols named [`IDENTIFIER_LABEL`] and
//! [`LITERAL_LABEL`]. Nonterminals are added through [`GrammarBuilder`].

use crate::error::GrammarFault;
use crate::terminal::{
    Terminal, TerminalCode, TerminalPack, IDENTIFIER_LABEL, LITERAL_LABEL, RESERVED_DELIMITERS,
};
use std::collections::{BTreeMap, BTreeSet};

// ── Operations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    /// Match a terminal or nonterminal by symbol name.
    Symbol(String),
    Identifier,
    Literal,
    LoopStart,
    LoopEnd,
    SelectionStart,
    /// Boundary between two selection branches.
    SelectionBody,
    SelectionEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    /// Variables bound to this operation's output.
    pub captures: Vec<String>,
    /// Variables whose identifiers take this operation's output as type.
    pub type_of: Vec<String>,
}

impl Operation {
    fn of(kind: OpKind) -> Self {
        Operation {
            kind,
            captures: Vec::new(),
            type_of: Vec::new(),
        }
    }

    pub fn symbol(name: &str) -> Self {
        Self::of(OpKind::Symbol(name.to_owned()))
    }

    pub fn identifier() -> Self {
        Self::of(OpKind::Identifier)
    }

    pub fn literal() -> Self {
        Self::of(OpKind::Literal)
    }

    pub fn loop_start() -> Self {
        Self::of(OpKind::LoopStart)
    }

    pub fn loop_end() -> Self {
        Self::of(OpKind::LoopEnd)
    }

    pub fn selection_start() -> Self {
        Self::of(OpKind::SelectionStart)
    }

    pub fn selection_body() -> Self {
        Self::of(OpKind::SelectionBody)
    }

    pub fn selection_end() -> Self {
        Self::of(OpKind::SelectionEnd)
    }

    pub fn capture(mut self, variable: &str) -> Self {
        self.captures.push(variable.to_owned());
        self
    }

    pub fn type_of(mut self, variable: &str) -> Self {
        self.type_of.push(variable.to_owned());
        self
    }

    /// Loop and selection markers consume nothing themselves.
    pub fn is_marker(&self) -> bool {
        !matches!(
            self.kind,
            OpKind::Symbol(_) | OpKind::Identifier | OpKind::Literal
        )
    }
}

// ── Patterns ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    ops: Vec<Operation>,
}

impl Pattern {
    pub fn new(ops: Vec<Operation>) -> Self {
        Pattern { ops }
    }

    /// The empty pattern, matching without consuming input.
    pub fn empty() -> Self {
        Pattern::default()
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn has_markers(&self) -> bool {
        self.ops.iter().any(Operation::is_marker)
    }
}

/// Partner index of each marker in a balanced pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Partner {
    None,
    /// On a LoopStart: index of its LoopEnd.
    LoopEnd(usize),
    /// On a LoopEnd: index of its LoopStart.
    LoopStart(usize),
    /// On a SelectionStart: every SelectionBody index, then the SelectionEnd.
    Boundaries(Vec<usize>),
    /// On a SelectionBody/SelectionEnd: index of its SelectionStart.
    Selection(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    partners: Vec<Partner>,
}

impl Layout {
    /// Check that loop and selection markers nest and balance, pairing
    /// each marker with its partner.
    pub(crate) fn of(symbol: &str, pattern_index: usize, pattern: &Pattern) -> Result<Self, GrammarFault> {
        let unbalanced = |operation: usize, message: &str| GrammarFault::Unbalanced {
            symbol: symbol.to_owned(),
            pattern: pattern_index,
            operation,
            message: message.to_owned(),
        };

        let mut partners = vec![Partner::None; pattern.ops.len()];
        let mut open: Vec<usize> = Vec::new();
        for (i, op) in pattern.ops.iter().enumerate() {
            match op.kind {
                OpKind::LoopStart => {
                    open.push(i);
                    partners[i] = Partner::LoopEnd(usize::MAX);
                }
                OpKind::SelectionStart => {
                    open.push(i);
                    partners[i] = Partner::Boundaries(Vec::new());
                }
                OpKind::LoopEnd => match open.pop() {
                    Some(start) if pattern.ops[start].kind == OpKind::LoopStart => {
                        partners[start] = Partner::LoopEnd(i);
                        partners[i] = Partner::LoopStart(start);
                    }
                    Some(_) => return Err(unbalanced(i, "loop end closes an open selection")),
                    None => return Err(unbalanced(i, "loop end without loop start")),
                },
                OpKind::SelectionBody | OpKind::SelectionEnd => {
                    let start = match open.last() {
                        Some(&start) if pattern.ops[start].kind == OpKind::SelectionStart => start,
                        Some(_) => {
                            return Err(unbalanced(i, "selection boundary inside an open loop"))
                        }
                        None => {
                            return Err(unbalanced(i, "selection boundary without selection start"))
                        }
                    };
                    if let Partner::Boundaries(bounds) = &mut partners[start] {
                        bounds.push(i);
                    }
                    partners[i] = Partner::Selection(start);
                    if op.kind == OpKind::SelectionEnd {
                        open.pop();
                    }
                }
                OpKind::Symbol(_) | OpKind::Identifier | OpKind::Literal => {}
            }
        }
        if let Some(&start) = open.last() {
            return Err(unbalanced(start, "construct is never closed"));
        }
        Ok(Layout { partners })
    }

    pub(crate) fn partner(&self, index: usize) -> &Partner {
        &self.partners[index]
    }
}

// ── Symbols ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarSymbol {
    name: String,
    term: Option<Terminal>,
    patterns: Option<Vec<Pattern>>,
    inline_precedence: bool,
}

impl GrammarSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped terminal, for terminal symbols.
    pub fn term(&self) -> Option<&Terminal> {
        self.term.as_ref()
    }

    /// Alternatives in declaration order, for nonterminals.
    pub fn patterns(&self) -> Option<&[Pattern]> {
        self.patterns.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.term.is_some()
    }

    pub fn inline_precedence(&self) -> bool {
        self.inline_precedence
    }
}

// ── Grammar ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Grammar {
    pack: TerminalPack,
    symbols: BTreeMap<String, GrammarSymbol>,
    start: String,
}

impl Grammar {
    pub fn builder(pack: TerminalPack) -> GrammarBuilder {
        GrammarBuilder::new(pack)
    }

    pub fn pack(&self) -> &TerminalPack {
        &self.pack
    }

    pub fn symbol(&self, name: &str) -> Option<&GrammarSymbol> {
        self.symbols.get(name)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn symbols(&self) -> impl Iterator<Item = &GrammarSymbol> {
        self.symbols.values()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &GrammarSymbol> {
        self.symbols.values().filter(|s| !s.is_terminal())
    }

    /// Terminal code matched by an operation, when it matches a terminal.
    pub fn terminal_code(&self, op: &Operation) -> Option<TerminalCode> {
        match &op.kind {
            OpKind::Identifier => Some(self.pack.identifier_code()),
            OpKind::Literal => Some(self.pack.literal_code()),
            OpKind::Symbol(name) => self.symbols.get(name)?.term.as_ref().map(|t| t.code),
            _ => None,
        }
    }

    /// Nonterminals reachable from the start symbol, in discovery order.
    pub fn reachable(&self) -> Result<Vec<&GrammarSymbol>, GrammarFault> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = vec![self.start.as_str()];
        seen.insert(self.start.as_str());
        while let Some(name) = queue.pop() {
            let symbol = self
                .symbols
                .get(name)
                .ok_or_else(|| GrammarFault::MissingStart(name.to_owned()))?;
            order.push(symbol);
            for pattern in symbol.patterns().unwrap_or_default() {
                for op in pattern.ops() {
                    let OpKind::Symbol(target) = &op.kind else {
                        continue;
                    };
                    let referenced = self.symbols.get(target.as_str()).ok_or_else(|| {
                        GrammarFault::UndefinedSymbol {
                            name: target.clone(),
                            referenced_by: symbol.name.clone(),
                        }
                    })?;
                    if !referenced.is_terminal() && seen.insert(referenced.name.as_str()) {
                        queue.push(referenced.name.as_str());
                    }
                }
            }
        }
        Ok(order)
    }

    /// Eager check of every nonterminal: references resolve, markers
    /// balance and type tags name a variable some operation captures.
    pub fn validate(&self) -> Result<(), GrammarFault> {
        for symbol in self.nonterminals() {
            for (index, pattern) in symbol.patterns().unwrap_or_default().iter().enumerate() {
                Layout::of(&symbol.name, index, pattern)?;
                let mut bound = BTreeSet::new();
                for op in pattern.ops() {
                    if let OpKind::Symbol(target) = &op.kind {
                        if !self.symbols.contains_key(target) {
                            return Err(GrammarFault::UndefinedSymbol {
                                name: target.clone(),
                                referenced_by: symbol.name.clone(),
                            });
                        }
                    }
                    bound.extend(op.captures.iter().map(String::as_str));
                }
                for op in pattern.ops() {
                    if let Some(variable) = op.type_of.iter().find(|v| !bound.contains(v.as_str())) {
                        return Err(GrammarFault::UnboundTypeVariable {
                            symbol: symbol.name.clone(),
                            pattern: index,
                            variable: variable.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct GrammarBuilder {
    pack: TerminalPack,
    rules: Vec<(String, Vec<Pattern>, bool)>,
    start: Option<String>,
}

impl GrammarBuilder {
    pub fn new(pack: TerminalPack) -> Self {
        GrammarBuilder {
            pack,
            rules: Vec::new(),
            start: None,
        }
    }

    pub fn rule(mut self, name: &str, patterns: Vec<Pattern>) -> Self {
        self.rules.push((name.to_owned(), patterns, false));
        self
    }

    /// A rule whose interior terminals relate EQUAL to the surrounding
    /// terminals in the precedence table.
    pub fn inline_rule(mut self, name: &str, patterns: Vec<Pattern>) -> Self {
        self.rules.push((name.to_owned(), patterns, true));
        self
    }

    pub fn start(mut self, name: &str) -> Self {
        self.start = Some(name.to_owned());
        self
    }

    /// The start symbol defaults to the first rule.
    pub fn build(self) -> Result<Grammar, GrammarFault> {
        let mut symbols = BTreeMap::new();
        for terminal in self.pack.terminals() {
            symbols.insert(terminal.text.clone(), terminal_symbol(terminal.clone()));
        }
        for (label, code) in [
            (IDENTIFIER_LABEL, self.pack.identifier_code()),
            (LITERAL_LABEL, self.pack.literal_code()),
        ] {
            let terminal = Terminal {
                code,
                text: label.to_owned(),
            };
            symbols.insert(label.to_owned(), terminal_symbol(terminal));
        }

        let start = match (self.start, self.rules.first()) {
            (Some(start), _) => start,
            (None, Some((first, _, _))) => first.clone(),
            (None, None) => return Err(GrammarFault::MissingStart(String::new())),
        };

        for (name, patterns, inline_precedence) in self.rules {
            if symbols.contains_key(&name) {
                return Err(GrammarFault::DuplicateSymbol(name));
            }
            check_captured_spellings(&name, &patterns, &self.pack)?;
            symbols.insert(
                name.clone(),
                GrammarSymbol {
                    name,
                    term: None,
                    patterns: Some(patterns),
                    inline_precedence,
                },
            );
        }

        match symbols.get(&start) {
            Some(symbol) if !symbol.is_terminal() => {}
            _ => return Err(GrammarFault::MissingStart(start)),
        }

        Ok(Grammar {
            pack: self.pack,
            symbols,
            start,
        })
    }
}

fn terminal_symbol(terminal: Terminal) -> GrammarSymbol {
    GrammarSymbol {
        name: terminal.text.clone(),
        term: Some(terminal),
        patterns: None,
        inline_precedence: false,
    }
}

/// A captured terminal lands verbatim in the serialized node, so its
/// spelling must not contain a node delimiter.
fn check_captured_spellings(
    name: &str,
    patterns: &[Pattern],
    pack: &TerminalPack,
) -> Result<(), GrammarFault> {
    for (index, pattern) in patterns.iter().enumerate() {
        for op in pattern.ops() {
            let OpKind::Symbol(target) = &op.kind else {
                continue;
            };
            if op.captures.is_empty() || pack.find_code(target).is_none() {
                continue;
            }
            if RESERVED_DELIMITERS.iter().any(|d| target.contains(d)) {
                return Err(GrammarFault::ReservedDelimiter {
                    symbol: name.to_owned(),
                    pattern: index,
                    text: target.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> TerminalPack {
        TerminalPack::builder()
            .words(&["a", "b"])
            .spaced_all(&["(", ")"])
            .build()
    }

    fn ops(pattern: Vec<Operation>) -> Pattern {
        Pattern::new(pattern)
    }

    #[test]
    fn layout_pairs_nested_markers() {
        let pattern = ops(vec![
            Operation::loop_start(),
            Operation::selection_start(),
            Operation::symbol("a"),
            Operation::selection_body(),
            Operation::symbol("b"),
            Operation::selection_end(),
            Operation::loop_end(),
        ]);
        let layout = Layout::of("s", 0, &pattern).unwrap();
        assert_eq!(layout.partner(0), &Partner::LoopEnd(6));
        assert_eq!(layout.partner(6), &Partner::LoopStart(0));
        assert_eq!(layout.partner(1), &Partner::Boundaries(vec![3, 5]));
        assert_eq!(layout.partner(3), &Partner::Selection(1));
    }

    #[test]
    fn layout_rejects_crossed_markers() {
        let pattern = ops(vec![
            Operation::loop_start(),
            Operation::selection_start(),
            Operation::loop_end(),
            Operation::selection_end(),
        ]);
        let err = Layout::of("s", 2, &pattern).unwrap_err();
        assert!(matches!(
            err,
            GrammarFault::Unbalanced { pattern: 2, operation: 2, .. }
        ));
    }

    #[test]
    fn layout_rejects_unclosed_loop() {
        let pattern = ops(vec![Operation::loop_start(), Operation::symbol("a")]);
        let err = Layout::of("s", 0, &pattern).unwrap_err();
        assert!(matches!(err, GrammarFault::Unbalanced { operation: 0, .. }));
    }

    #[test]
    fn builder_creates_terminal_symbols() {
        let grammar = Grammar::builder(pack())
            .rule("s", vec![ops(vec![Operation::symbol("a")])])
            .build()
            .unwrap();
        assert_eq!(grammar.start(), "s");
        assert!(grammar.symbol("a").unwrap().is_terminal());
        assert_eq!(grammar.symbol(IDENTIFIER_LABEL).unwrap().term().unwrap().code, 4);
        assert!(!grammar.symbol("s").unwrap().is_terminal());
    }

    #[test]
    fn builder_rejects_duplicates_and_bad_start() {
        let dup = Grammar::builder(pack())
            .rule("s", vec![])
            .rule("s", vec![])
            .build();
        assert_eq!(dup.unwrap_err(), GrammarFault::DuplicateSymbol("s".into()));

        let clash = Grammar::builder(pack()).rule("a", vec![]).build();
        assert_eq!(clash.unwrap_err(), GrammarFault::DuplicateSymbol("a".into()));

        let missing = Grammar::builder(pack()).rule("s", vec![]).start("t").build();
        assert_eq!(missing.unwrap_err(), GrammarFault::MissingStart("t".into()));
    }

    #[test]
    fn builder_rejects_captured_delimiter() {
        let err = Grammar::builder(pack())
            .rule("s", vec![ops(vec![Operation::symbol("(").capture("open")])])
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarFault::ReservedDelimiter { .. }));
    }

    #[test]
    fn validate_reports_undefined_and_unbound() {
        let undefined = Grammar::builder(pack())
            .rule("s", vec![ops(vec![Operation::symbol("missing")])])
            .build()
            .unwrap();
        assert!(matches!(
            undefined.validate(),
            Err(GrammarFault::UndefinedSymbol { ref name, .. }) if name == "missing"
        ));

        let unbound = Grammar::builder(pack())
            .rule("s", vec![ops(vec![Operation::symbol("a").type_of("v")])])
            .build()
            .unwrap();
        assert!(matches!(
            unbound.validate(),
            Err(GrammarFault::UnboundTypeVariable { ref variable, .. }) if variable == "v"
        ));
    }

    #[test]
    fn reachable_skips_unused_rules() {
        let grammar = Grammar::builder(pack())
            .rule("s", vec![ops(vec![Operation::symbol("t")])])
            .rule("t", vec![ops(vec![Operation::symbol("a")])])
            .rule("unused", vec![ops(vec![Operation::symbol("b")])])
            .build()
            .unwrap();
        let names: Vec<&str> = grammar.reachable().unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["s", "t"]);
    }
}
