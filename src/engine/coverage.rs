//! LRLM coverage search (spec §4.D): a beam of `(coverage-so-far, state)`
//! pairs walked token by token through the pattern FST.
//!
//! Mirrors the reference engine's saturation loop shape — a seed state
//! followed by per-item fixpoint-style stepping — even though the actual
//! transition rule (category-labeled FST edges rather than regex/predicate
//! rule matching) is specific to this domain.

use super::fst::{Fst, StateId};
use crate::category::CategoryIndex;
use crate::stats::RunStats;
use crate::token::Token;
use bitflags::bitflags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentRule {
    Rule(usize),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub tokens: Vec<Token>,
    pub rule: SegmentRule,
}

#[derive(Debug, Clone, Default)]
pub struct Coverage {
    pub segments: Vec<Segment>,
}

bitflags! {
    /// Coarse, quickly-computed features of a coverage, used for logging
    /// and stats rather than control flow.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CoverageFlags: u8 {
        const HAS_UNKNOWN = 1 << 0;
    }
}

impl Coverage {
    /// Tuple of segment token-counts; the LRLM tie-break key (spec §3).
    pub fn signature(&self) -> Vec<usize> {
        self.segments.iter().map(|s| s.tokens.len()).collect()
    }

    pub fn flags(&self) -> CoverageFlags {
        let mut flags = CoverageFlags::empty();
        if self.segments.iter().any(|s| s.rule == SegmentRule::Unknown) {
            flags |= CoverageFlags::HAS_UNKNOWN;
        }
        flags
    }

    /// Concatenation of every segment's tokens, in order — should equal
    /// the original input stream (spec §8 invariant 1).
    pub fn flat_tokens(&self) -> Vec<&Token> {
        self.segments.iter().flat_map(|s| &s.tokens).collect()
    }
}

#[derive(Debug, Clone)]
struct BeamItem {
    closed: Vec<Segment>,
    pending: Vec<Token>,
    state: StateId,
}

/// `lrlm`: returns every coverage tied for the top signature, or an empty
/// list if no beam item survived to the end of the stream (spec §4.D).
pub fn lrlm(tokens: &[Token], fst: &Fst, categories: &CategoryIndex, stats: &mut RunStats) -> Vec<Coverage> {
    let mut beam = vec![BeamItem { closed: Vec::new(), pending: Vec::new(), state: Fst::START }];

    for token in tokens {
        let cats = categories.categories_of(token);
        let mut new_beam = Vec::new();

        if cats.is_empty() {
            if token.unknown {
                for item in &beam {
                    if let Some(rule_idx) = fst.accepting_rule(item.state) {
                        let mut closed = item.closed.clone();
                        closed.push(Segment { tokens: item.pending.clone(), rule: SegmentRule::Rule(rule_idx) });
                        closed.push(Segment { tokens: vec![token.clone()], rule: SegmentRule::Unknown });
                        new_beam.push(BeamItem { closed, pending: Vec::new(), state: Fst::START });
                    } else if item.state == Fst::START {
                        let mut closed = item.closed.clone();
                        closed.push(Segment { tokens: vec![token.clone()], rule: SegmentRule::Unknown });
                        new_beam.push(BeamItem { closed, pending: Vec::new(), state: Fst::START });
                    }
                    // else: no continuation available, drop this item.
                }
            } else {
                // Empty category set, not an unknown word: spec §7's
                // EmptyCategory. No beam item can consume this token (no
                // category edge exists to extend or restart with), so
                // every branch dies here; the line's search ends without
                // a complete coverage. Counted, not fatal.
                stats.empty_category_tokens += 1;
            }
        } else {
            for item in &beam {
                for cat in &cats {
                    if let Some(s2) = fst.transition(item.state, cat) {
                        let mut pending = item.pending.clone();
                        pending.push(token.clone());
                        new_beam.push(BeamItem { closed: item.closed.clone(), pending, state: s2 });
                    } else if let Some(rule_idx) = fst.accepting_rule(item.state) {
                        let mut closed = item.closed.clone();
                        closed.push(Segment { tokens: item.pending.clone(), rule: SegmentRule::Rule(rule_idx) });
                        if let Some(s3) = fst.transition(Fst::START, cat) {
                            new_beam.push(BeamItem { closed, pending: vec![token.clone()], state: s3 });
                        } else if token.unknown {
                            closed.push(Segment { tokens: vec![token.clone()], rule: SegmentRule::Unknown });
                            new_beam.push(BeamItem { closed, pending: Vec::new(), state: Fst::START });
                        }
                        // else: drop this (item, cat) branch.
                    } else if item.state == Fst::START && token.unknown {
                        let mut closed = item.closed.clone();
                        closed.push(Segment { tokens: vec![token.clone()], rule: SegmentRule::Unknown });
                        new_beam.push(BeamItem { closed, pending: Vec::new(), state: Fst::START });
                    }
                    // else: drop this (item, cat) branch.
                }
            }
        }

        beam = new_beam;
        if beam.is_empty() {
            break;
        }
    }

    let mut coverages: Vec<Coverage> = Vec::new();
    for item in beam {
        if let Some(rule_idx) = fst.accepting_rule(item.state) {
            let mut closed = item.closed;
            closed.push(Segment { tokens: item.pending, rule: SegmentRule::Rule(rule_idx) });
            coverages.push(Coverage { segments: closed });
        } else if item.pending.is_empty() {
            coverages.push(Coverage { segments: item.closed });
        }
        // else: incomplete, drop.
    }

    if coverages.is_empty() {
        return coverages;
    }

    coverages.sort_by(|a, b| b.signature().cmp(&a.signature()));
    let top = coverages[0].signature();
    coverages.into_iter().take_while(|c| c.signature() == top).collect()
}
