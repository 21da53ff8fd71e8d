//! Ambiguity detection over a coverage (spec §4.E).

use super::coverage::{Coverage, SegmentRule};
use crate::rules_xml::RuleGroup;
use crate::token::Token;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AmbiguousSite<'a> {
    pub segment_index: usize,
    pub group_id: usize,
    pub tokens: &'a [Token],
}

/// Walks `coverage`'s segments; for each whose accepting rule is the
/// default of an ambiguous group, emits a site. When the coverage engine
/// returned several top-signature coverages, callers should pass only the
/// first (spec §4.E's stated tie-break).
pub fn ambiguous_sites<'a>(
    coverage: &'a Coverage,
    ambiguous_groups: &HashMap<usize, RuleGroup>,
) -> Vec<AmbiguousSite<'a>> {
    let mut sites = Vec::new();
    for (segment_index, segment) in coverage.segments.iter().enumerate() {
        if let SegmentRule::Rule(rule_idx) = segment.rule {
            if ambiguous_groups.contains_key(&rule_idx) {
                sites.push(AmbiguousSite { segment_index, group_id: rule_idx, tokens: &segment.tokens });
            }
        }
    }
    sites
}
