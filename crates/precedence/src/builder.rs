//! Precedence table builder.
//!
//! Derives Floyd's operator-precedence relations from a loop-free grammar.
//! Each alternative is cut into segments at its terminals: a segment runs
//! from one terminal (its leading terminal) to the next (its trailing
//! terminal) and holds the nonterminals in between. Nonterminals after the
//! last terminal form a final segment with no trailing terminal.
//!
//! From each segment:
//!
//! - leading and trailing terminal: `leading EQUAL trailing`
//! - leading terminal: `leading LOWER s` for every start terminal `s` of an
//!   interior nonterminal (EQUAL when that nonterminal is inline)
//! - trailing terminal: `e HIGHER trailing` for every end terminal `e` of
//!   an interior nonterminal (EQUAL when inline)
//!
//! Start and end sets are memoized per nonterminal with an
//! unvisited/in-progress/done marker, so cycles through left or right
//! recursion stop at the in-progress nonterminal. The memoized pass is
//! repeated until no set grows.

use crate::matrix::{Conflict, PrecedenceMatrix, Relation};
use gramex_core::error::Resource;
use gramex_core::{Grammar, GrammarFault, GrammarSymbol, OpKind, Pattern, TerminalCode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Fail on the first conflicting relation instead of overwriting it.
    pub strict: bool,
    pub max_depth: usize,
    pub max_rounds: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            strict: false,
            max_depth: 256,
            max_rounds: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Grammar(#[from] GrammarFault),
    #[error("conflicting precedence: {0}")]
    Conflict(Conflict),
}

/// Build the matrix with default options.
pub fn build(grammar: &Grammar) -> Result<PrecedenceMatrix, BuildError> {
    build_with(grammar, BuildOptions::default())
}

/// Build the matrix for the nonterminals reachable from the start symbol.
/// Nothing is returned unless the whole analysis succeeds.
pub fn build_with(grammar: &Grammar, options: BuildOptions) -> Result<PrecedenceMatrix, BuildError> {
    let mut analysis = Analysis::new(grammar, options)?;
    analysis.resolve_sets()?;
    let tuples = analysis.tuples();
    debug!(target: "precedence", "{} relation tuples", tuples.len());

    let mut matrix = PrecedenceMatrix::empty(grammar.pack());
    for (left, right, relation) in tuples {
        if let Some(conflict) = matrix.set(left, right, relation) {
            debug!(target: "precedence", "conflict: {}", conflict);
            if options.strict {
                return Err(BuildError::Conflict(conflict));
            }
        }
    }
    Ok(matrix)
}

// ── Segments ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Segment<'g> {
    leading: Option<TerminalCode>,
    trailing: Option<TerminalCode>,
    interior: Vec<&'g GrammarSymbol>,
}

fn decompose<'g>(
    grammar: &'g Grammar,
    symbol: &GrammarSymbol,
    index: usize,
    pattern: &Pattern,
) -> Result<Vec<Segment<'g>>, GrammarFault> {
    if pattern.has_markers() {
        return Err(GrammarFault::UnsupportedOperation {
            symbol: symbol.name().to_owned(),
            pattern: index,
        });
    }

    let mut segments = Vec::new();
    let mut leading = None;
    let mut interior = Vec::new();
    for op in pattern.ops() {
        if let Some(code) = grammar.terminal_code(op) {
            segments.push(Segment {
                leading,
                trailing: Some(code),
                interior: std::mem::take(&mut interior),
            });
            leading = Some(code);
            continue;
        }
        let OpKind::Symbol(name) = &op.kind else {
            continue;
        };
        let target = grammar
            .symbol(name)
            .ok_or_else(|| GrammarFault::UndefinedSymbol {
                name: name.clone(),
                referenced_by: symbol.name().to_owned(),
            })?;
        interior.push(target);
    }
    if !interior.is_empty() {
        segments.push(Segment {
            leading,
            trailing: None,
            interior,
        });
    }
    Ok(segments)
}

// ── Analysis ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Analysis<'g> {
    options: BuildOptions,
    order: Vec<&'g str>,
    segments: BTreeMap<&'g str, Vec<Vec<Segment<'g>>>>,
    inline: BTreeMap<&'g str, bool>,
    start_sets: BTreeMap<&'g str, BTreeSet<TerminalCode>>,
    end_sets: BTreeMap<&'g str, BTreeSet<TerminalCode>>,
    marks: BTreeMap<&'g str, Mark>,
    depth: usize,
}

impl<'g> Analysis<'g> {
    fn new(grammar: &'g Grammar, options: BuildOptions) -> Result<Self, GrammarFault> {
        let reachable = grammar.reachable()?;
        let mut order = Vec::new();
        let mut segments = BTreeMap::new();
        let mut inline = BTreeMap::new();
        for symbol in reachable {
            let mut per_pattern = Vec::new();
            for (index, pattern) in symbol.patterns().unwrap_or_default().iter().enumerate() {
                per_pattern.push(decompose(grammar, symbol, index, pattern)?);
            }
            order.push(symbol.name());
            segments.insert(symbol.name(), per_pattern);
            inline.insert(symbol.name(), symbol.inline_precedence());
        }
        Ok(Analysis {
            options,
            order,
            segments,
            inline,
            start_sets: BTreeMap::new(),
            end_sets: BTreeMap::new(),
            marks: BTreeMap::new(),
            depth: 0,
        })
    }

    fn set_sizes(&self) -> usize {
        self.start_sets.values().map(BTreeSet::len).sum::<usize>()
            + self.end_sets.values().map(BTreeSet::len).sum::<usize>()
    }

    /// Repeat the memoized pass until the start and end sets stop growing.
    /// `max_rounds` bounds the passes that grow a set; the pass that only
    /// confirms nothing changed is not counted.
    fn resolve_sets(&mut self) -> Result<(), GrammarFault> {
        let order = self.order.clone();
        let mut grown = 0;
        loop {
            let before = self.set_sizes();
            self.marks.clear();
            for &name in &order {
                self.visit(name)?;
            }
            if self.set_sizes() == before {
                debug!(target: "precedence", "start/end sets stable after {} growing rounds", grown);
                return Ok(());
            }
            grown += 1;
            if grown > self.options.max_rounds {
                return Err(GrammarFault::LimitExceeded {
                    symbol: order.first().copied().unwrap_or_default().to_owned(),
                    resource: Resource::Rounds,
                    limit: self.options.max_rounds,
                });
            }
        }
    }

    fn visit(&mut self, name: &'g str) -> Result<(), GrammarFault> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                // Cycle: the partial sets gathered so far stand in.
                return Ok(());
            }
            None => {}
        }
        self.marks.insert(name, Mark::InProgress);
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(GrammarFault::LimitExceeded {
                symbol: name.to_owned(),
                resource: Resource::Depth,
                limit: self.options.max_depth,
            });
        }

        let mut starts = BTreeSet::new();
        let mut ends = BTreeSet::new();
        let patterns = self.segment_refs(name);
        for (first, last) in patterns {
            if let Some((trailing, interior)) = first {
                starts.extend(trailing);
                for child in interior {
                    self.visit(child)?;
                    starts.extend(self.start_sets.get(child).into_iter().flatten().copied());
                }
            }
            if let Some((leading, trailing, interior)) = last {
                match trailing {
                    Some(code) => {
                        ends.insert(code);
                    }
                    None => {
                        ends.extend(leading);
                        for child in interior {
                            self.visit(child)?;
                            ends.extend(self.end_sets.get(child).into_iter().flatten().copied());
                        }
                    }
                }
            }
        }

        self.start_sets.entry(name).or_default().extend(starts);
        self.end_sets.entry(name).or_default().extend(ends);
        self.marks.insert(name, Mark::Done);
        self.depth -= 1;
        Ok(())
    }

    /// First and last segment of each pattern, detached from `self` so the
    /// recursion can borrow it mutably.
    #[allow(clippy::type_complexity)]
    fn segment_refs(
        &self,
        name: &str,
    ) -> Vec<(
        Option<(Option<TerminalCode>, Vec<&'g str>)>,
        Option<(Option<TerminalCode>, Option<TerminalCode>, Vec<&'g str>)>,
    )> {
        let names = |segment: &Segment<'g>| -> Vec<&'g str> {
            segment
                .interior
                .iter()
                .filter(|s| !s.is_terminal())
                .map(|&s| s.name())
                .collect()
        };
        self.segments
            .get(name)
            .map(|patterns| {
                patterns
                    .iter()
                    .map(|segments| {
                        let first = segments.first().map(|s| (s.trailing, names(s)));
                        let last = segments.last().map(|s| (s.leading, s.trailing, names(s)));
                        (first, last)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Relation tuples in emission order.
    fn tuples(&self) -> Vec<(TerminalCode, TerminalCode, Relation)> {
        let empty = BTreeSet::new();
        let mut out = Vec::new();
        for name in &self.order {
            for segment in self.segments[name].iter().flatten() {
                if let (Some(leading), Some(trailing)) = (segment.leading, segment.trailing) {
                    out.push((leading, trailing, Relation::Equal));
                }
                for child in segment.interior.iter().filter(|s| !s.is_terminal()) {
                    let inline = self.inline.get(child.name()).copied().unwrap_or(false);
                    if let Some(leading) = segment.leading {
                        let relation = if inline { Relation::Equal } else { Relation::Lower };
                        for &start in self.start_sets.get(child.name()).unwrap_or(&empty) {
                            out.push((leading, start, relation));
                        }
                    }
                    if let Some(trailing) = segment.trailing {
                        let relation = if inline { Relation::Equal } else { Relation::Higher };
                        for &end in self.end_sets.get(child.name()).unwrap_or(&empty) {
                            out.push((end, trailing, relation));
                        }
                    }
                }
            }
        }
        out
    }
}
