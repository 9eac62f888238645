//! Backtracking pattern matcher.
//!
//! A nonterminal tries its alternatives in declaration order and succeeds
//! with the first one that matches. Inside a pattern, loops and selections
//! are driven by an explicit stack of [`Frame`]s. The top frame is always
//! the innermost construct around the cursor, and it decides where
//! matching resumes after a failed operation:
//!
//! - a loop rewinds to its last completed iteration and continues after
//!   its end marker;
//! - a selection rewinds to its entry and tries the next branch, or, when
//!   no branch is left, hands the failure to the next frame down.
//!
//! With no frame left the pattern fails and consumes nothing.

use crate::error::{deeper, GrammarFault, MatchFailure, Resource};
use crate::grammar::{GrammarSymbol, Grammar, Layout, OpKind, Operation, Partner, Pattern};
use crate::ident::IdentifierTable;
use crate::node::{self, NodeValue};
use crate::terminal::{split_token, Terminal, IDENTIFIER_LABEL, LITERAL_LABEL};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name recorded as the referrer when the entry symbol itself is missing.
const ENTRY: &str = "<entry>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Deepest allowed nesting of symbol matches.
    pub max_depth: usize,
    /// Operations executed per parse before giving up.
    pub max_steps: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            max_depth: 256,
            max_steps: 1_000_000,
        }
    }
}

/// Mutable state of one parse.
#[derive(Debug, Default)]
pub struct ParseContext {
    pub identifiers: IdentifierTable,
    depth: usize,
    steps: usize,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifiers(identifiers: IdentifierTable) -> Self {
        ParseContext {
            identifiers,
            ..Self::default()
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn enter(&mut self, symbol: &str, limit: usize) -> Result<(), GrammarFault> {
        self.depth += 1;
        if self.depth > limit {
            return Err(GrammarFault::LimitExceeded {
                symbol: symbol.to_owned(),
                resource: Resource::Depth,
                limit,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn tick(&mut self, symbol: &str, limit: usize) -> Result<(), GrammarFault> {
        self.steps += 1;
        if self.steps > limit {
            return Err(GrammarFault::LimitExceeded {
                symbol: symbol.to_owned(),
                resource: Resource::Steps,
                limit,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub start: usize,
    /// One past the last consumed token; equals `start` on failure.
    pub end: usize,
    pub success: bool,
    /// The token for terminals, the serialized node for nonterminals.
    pub output: String,
    /// Outputs of the successful operations, in order.
    pub pieces: Vec<String>,
    pub bindings: BTreeMap<String, String>,
    /// Deepest failure seen, also along a successful path.
    pub deepest: Option<MatchFailure>,
}

impl MatchResult {
    fn failure(position: usize, failure: MatchFailure) -> Self {
        MatchResult {
            start: position,
            end: position,
            success: false,
            output: String::new(),
            pieces: Vec::new(),
            bindings: BTreeMap::new(),
            deepest: Some(failure),
        }
    }

    pub fn consumed(&self) -> usize {
        self.end - self.start
    }
}

// ── Pattern state ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Checkpoint {
    position: usize,
    pieces: usize,
    bindings: BTreeMap<String, String>,
    type_tags: BTreeMap<String, String>,
}

#[derive(Debug)]
struct State {
    position: usize,
    pieces: Vec<String>,
    bindings: BTreeMap<String, String>,
    /// Variable -> type text, applied once the pattern succeeds.
    type_tags: BTreeMap<String, String>,
}

impl State {
    fn new(position: usize) -> Self {
        State {
            position,
            pieces: Vec::new(),
            bindings: BTreeMap::new(),
            type_tags: BTreeMap::new(),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
            pieces: self.pieces.len(),
            bindings: self.bindings.clone(),
            type_tags: self.type_tags.clone(),
        }
    }

    fn restore(&mut self, checkpoint: &Checkpoint) {
        self.position = checkpoint.position;
        self.pieces.truncate(checkpoint.pieces);
        self.bindings = checkpoint.bindings.clone();
        self.type_tags = checkpoint.type_tags.clone();
    }
}

#[derive(Debug)]
enum Frame {
    Loop {
        start: usize,
        end: usize,
        /// State after the last completed iteration.
        entry: Checkpoint,
    },
    Selection {
        start: usize,
        /// Branch boundaries; the last one is the end marker.
        boundaries: Vec<usize>,
        entry: Checkpoint,
    },
}

/// Pop frames until one can resume matching. Returns the next cursor, or
/// `None` when the whole pattern has failed.
fn recover(frames: &mut Vec<Frame>, state: &mut State, mut cursor: usize) -> Option<usize> {
    while let Some(frame) = frames.pop() {
        match frame {
            Frame::Loop { end, entry, .. } => {
                state.restore(&entry);
                return Some(end + 1);
            }
            Frame::Selection {
                start,
                boundaries,
                entry,
            } => {
                state.restore(&entry);
                let next = boundaries.iter().copied().find(|&b| b > cursor);
                match next {
                    Some(boundary) if Some(boundary) != boundaries.last().copied() => {
                        frames.push(Frame::Selection {
                            start,
                            boundaries,
                            entry,
                        });
                        return Some(boundary + 1);
                    }
                    _ => cursor = start,
                }
            }
        }
    }
    None
}

struct PatternOutcome {
    state: Option<State>,
    deepest: Option<MatchFailure>,
}

// ── Matcher ──────────────────────────────────────────────────────────

pub struct Matcher<'g> {
    grammar: &'g Grammar,
    options: MatchOptions,
}

impl<'g> Matcher<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_options(grammar, MatchOptions::default())
    }

    pub fn with_options(grammar: &'g Grammar, options: MatchOptions) -> Self {
        Matcher { grammar, options }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Match the symbol `name` against `tokens` starting at `position`.
    ///
    /// A failed match is an `Ok` result with `success == false`; `Err` is
    /// reserved for defects in the grammar and exhausted limits.
    pub fn match_symbol<T: AsRef<str>>(
        &self,
        name: &str,
        tokens: &[T],
        position: usize,
        ctx: &mut ParseContext,
    ) -> Result<MatchResult, GrammarFault> {
        self.match_from(name, ENTRY, tokens, position, ctx)
    }

    fn match_from<T: AsRef<str>>(
        &self,
        name: &str,
        referenced_by: &str,
        tokens: &[T],
        position: usize,
        ctx: &mut ParseContext,
    ) -> Result<MatchResult, GrammarFault> {
        let symbol = self
            .grammar
            .symbol(name)
            .ok_or_else(|| GrammarFault::UndefinedSymbol {
                name: name.to_owned(),
                referenced_by: referenced_by.to_owned(),
            })?;

        ctx.enter(name, self.options.max_depth)?;
        trace!(target: "syntax", "enter '{}' at {}", name, position);
        let result = match (symbol.term(), symbol.patterns()) {
            (Some(term), _) => Ok(self.match_terminal(term, tokens, position)),
            (None, Some(patterns)) => self.match_alternatives(symbol, patterns, tokens, position, ctx),
            (None, None) => Ok(MatchResult::failure(
                position,
                MatchFailure::new(format!("'{}' has no alternatives", name), token_at(tokens, position), position),
            )),
        };
        ctx.leave();
        if let Ok(result) = &result {
            trace!(
                target: "syntax",
                "leave '{}' at {}: {}",
                name,
                result.end,
                if result.success { "matched" } else { "failed" }
            );
        }
        result
    }

    fn match_terminal<T: AsRef<str>>(&self, term: &Terminal, tokens: &[T], position: usize) -> MatchResult {
        let pack = self.grammar.pack();
        let Some(token) = token_at(tokens, position) else {
            return MatchResult::failure(
                position,
                MatchFailure::new(
                    format!("expected '{}' but reached end of input", term.text),
                    None,
                    position,
                ),
            );
        };

        let matched = if term.code == pack.identifier_code() || term.code == pack.literal_code() {
            matches!(split_token(token), Some((code, _)) if code == term.code)
        } else {
            token == term.text
        };

        if !matched {
            return MatchResult::failure(
                position,
                MatchFailure::new(
                    format!("expected '{}' but found '{}' at index {}", term.text, token, position),
                    Some(token),
                    position,
                ),
            );
        }

        MatchResult {
            start: position,
            end: position + 1,
            success: true,
            output: token.to_owned(),
            pieces: vec![token.to_owned()],
            bindings: BTreeMap::new(),
            deepest: None,
        }
    }

    fn match_alternatives<T: AsRef<str>>(
        &self,
        symbol: &GrammarSymbol,
        patterns: &[Pattern],
        tokens: &[T],
        position: usize,
        ctx: &mut ParseContext,
    ) -> Result<MatchResult, GrammarFault> {
        let mut deepest = None;
        for (index, pattern) in patterns.iter().enumerate() {
            let layout = Layout::of(symbol.name(), index, pattern)?;
            let outcome = self.run_pattern(symbol, index, pattern, &layout, tokens, position, ctx)?;
            deepest = deeper(deepest, outcome.deepest);
            if let Some(state) = outcome.state {
                self.propagate_types(symbol, index, &state, ctx)?;
                return Ok(MatchResult {
                    start: position,
                    end: state.position,
                    success: true,
                    output: node::encode(symbol.name(), &state.bindings),
                    pieces: state.pieces,
                    bindings: state.bindings,
                    deepest,
                });
            }
        }

        let failure = deepest.unwrap_or_else(|| {
            MatchFailure::new(
                format!("'{}' has no alternatives", symbol.name()),
                token_at(tokens, position),
                position,
            )
        });
        Ok(MatchResult::failure(position, failure))
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pattern<T: AsRef<str>>(
        &self,
        symbol: &GrammarSymbol,
        pattern_index: usize,
        pattern: &Pattern,
        layout: &Layout,
        tokens: &[T],
        position: usize,
        ctx: &mut ParseContext,
    ) -> Result<PatternOutcome, GrammarFault> {
        let misplaced = |operation: usize, message: &str| GrammarFault::Unbalanced {
            symbol: symbol.name().to_owned(),
            pattern: pattern_index,
            operation,
            message: message.to_owned(),
        };

        let ops = pattern.ops();
        let mut state = State::new(position);
        let mut frames: Vec<Frame> = Vec::new();
        let mut deepest = None;
        let mut cursor = 0;

        while cursor < ops.len() {
            ctx.tick(symbol.name(), self.options.max_steps)?;
            let op = &ops[cursor];
            match &op.kind {
                OpKind::LoopStart => {
                    let Partner::LoopEnd(end) = layout.partner(cursor) else {
                        return Err(misplaced(cursor, "loop start without partner"));
                    };
                    frames.push(Frame::Loop {
                        start: cursor,
                        end: *end,
                        entry: state.checkpoint(),
                    });
                    cursor += 1;
                }
                OpKind::LoopEnd => {
                    let (loop_start, progressed) = match frames.last() {
                        Some(Frame::Loop { start, end, entry }) if *end == cursor => {
                            (*start, state.position != entry.position)
                        }
                        _ => return Err(misplaced(cursor, "loop end reached outside its loop")),
                    };
                    if progressed {
                        if let Some(Frame::Loop { entry, .. }) = frames.last_mut() {
                            *entry = state.checkpoint();
                        }
                        cursor = loop_start + 1;
                    } else {
                        // An iteration that consumed nothing ends the loop.
                        frames.pop();
                        cursor += 1;
                    }
                }
                OpKind::SelectionStart => {
                    let Partner::Boundaries(boundaries) = layout.partner(cursor) else {
                        return Err(misplaced(cursor, "selection start without branches"));
                    };
                    frames.push(Frame::Selection {
                        start: cursor,
                        boundaries: boundaries.clone(),
                        entry: state.checkpoint(),
                    });
                    cursor += 1;
                }
                OpKind::SelectionBody | OpKind::SelectionEnd => {
                    // Reached by falling through: the current branch matched.
                    let end = match frames.last() {
                        Some(Frame::Selection { boundaries, .. }) if boundaries.contains(&cursor) => {
                            boundaries[boundaries.len() - 1]
                        }
                        _ => return Err(misplaced(cursor, "selection boundary reached outside its selection")),
                    };
                    frames.pop();
                    cursor = end + 1;
                }
                OpKind::Symbol(_) | OpKind::Identifier | OpKind::Literal => {
                    let result = self.match_operation(symbol, op, tokens, state.position, ctx)?;
                    deepest = deeper(deepest, result.deepest.clone());
                    if result.success {
                        state.position = result.end;
                        for variable in &op.captures {
                            state.bindings.insert(variable.clone(), result.output.clone());
                        }
                        for variable in &op.type_of {
                            state.type_tags.insert(variable.clone(), result.output.clone());
                        }
                        state.pieces.push(result.output);
                        cursor += 1;
                    } else {
                        match recover(&mut frames, &mut state, cursor) {
                            Some(next) => cursor = next,
                            None => {
                                return Ok(PatternOutcome {
                                    state: None,
                                    deepest,
                                })
                            }
                        }
                    }
                }
            }
        }

        Ok(PatternOutcome {
            state: Some(state),
            deepest,
        })
    }

    fn match_operation<T: AsRef<str>>(
        &self,
        symbol: &GrammarSymbol,
        op: &Operation,
        tokens: &[T],
        position: usize,
        ctx: &mut ParseContext,
    ) -> Result<MatchResult, GrammarFault> {
        let target = match &op.kind {
            OpKind::Symbol(target) => target.as_str(),
            OpKind::Identifier => IDENTIFIER_LABEL,
            _ => LITERAL_LABEL,
        };
        self.match_from(target, symbol.name(), tokens, position, ctx)
    }

    /// Write each recorded type into the identifiers bound to its variable.
    fn propagate_types(
        &self,
        symbol: &GrammarSymbol,
        pattern_index: usize,
        state: &State,
        ctx: &mut ParseContext,
    ) -> Result<(), GrammarFault> {
        for (variable, type_text) in &state.type_tags {
            let bound = state
                .bindings
                .get(variable)
                .ok_or_else(|| GrammarFault::UnboundTypeVariable {
                    symbol: symbol.name().to_owned(),
                    pattern: pattern_index,
                    variable: variable.clone(),
                })?;
            let type_name = resolve_type(type_text);
            for index in self.identifier_indices(bound) {
                if ctx.identifiers.set_type(index, &type_name) {
                    trace!(target: "syntax", "identifier {} has type '{}'", index, type_name);
                } else {
                    trace!(target: "syntax", "no identifier record at index {}", index);
                }
            }
        }
        Ok(())
    }

    fn identifier_indices(&self, bound: &str) -> Vec<usize> {
        let identifier_code = self.grammar.pack().identifier_code();
        let leaves: Vec<String> = match node::decode_value(bound) {
            Ok(NodeValue::Node(node)) => node.leaves().into_iter().map(str::to_owned).collect(),
            _ => vec![bound.to_owned()],
        };
        leaves
            .iter()
            .filter_map(|leaf| match split_token(leaf) {
                Some((code, index)) if code == identifier_code => index.parse().ok(),
                _ => None,
            })
            .collect()
    }
}

/// A type given as a node with a `type` binding resolves to that binding.
fn resolve_type(text: &str) -> String {
    match node::decode_value(text) {
        Ok(NodeValue::Node(node)) => node.leaf("type").unwrap_or(text).to_owned(),
        _ => text.to_owned(),
    }
}

fn token_at<T: AsRef<str>>(tokens: &[T], position: usize) -> Option<&str> {
    tokens.get(position).map(AsRef::as_ref)
}
