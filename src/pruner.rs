//! Weights document pruner (spec §4.I) plus the supplemented
//! `remove_generalized` pass.

use crate::weights_xml::{WRule, WRuleGroup, WeightedPattern, WeightsDocument};
use std::collections::HashMap;

/// Collapses each rule-group's redundant pattern entries: for every
/// pattern, keep only the rule with the highest weight; if that rule is
/// the group's default (first rule), drop the pattern entirely since the
/// default applies anyway. Surviving entries are forced to weight 1.0.
/// Rule order and attributes are preserved (spec §8 invariant 6).
pub fn prune(doc: &WeightsDocument) -> WeightsDocument {
    let groups = doc
        .groups
        .iter()
        .map(|group| prune_group(group))
        .collect();
    WeightsDocument { groups }
}

fn prune_group(group: &WRuleGroup) -> WRuleGroup {
    // pattern key -> (rule index within group, weight), best so far.
    let mut best: HashMap<String, (usize, f64, WeightedPattern)> = HashMap::new();
    for (rule_idx, rule) in group.rules.iter().enumerate() {
        for pattern in &rule.patterns {
            let key = pattern.key();
            match best.get(&key) {
                Some((_, existing_weight, _)) if *existing_weight >= pattern.weight => {}
                _ => {
                    best.insert(key, (rule_idx, pattern.weight, pattern.clone()));
                }
            }
        }
    }

    let mut kept_by_rule: HashMap<usize, Vec<WeightedPattern>> = HashMap::new();
    for (rule_idx, _weight, pattern) in best.into_values() {
        if rule_idx == 0 {
            continue; // default rule: dropped, it applies anyway.
        }
        kept_by_rule.entry(rule_idx).or_default().push(WeightedPattern { tokens: pattern.tokens, weight: 1.0 });
    }

    let rules = group
        .rules
        .iter()
        .enumerate()
        .map(|(rule_idx, rule)| WRule {
            attrs: rule.attrs.clone(),
            md5: rule.md5.clone(),
            patterns: kept_by_rule.remove(&rule_idx).unwrap_or_default(),
        })
        .collect();

    WRuleGroup { rules }
}

/// Drops any pattern with at least one generalized (lemma-unspecified)
/// pattern-item. Grounded on the reference's `remgen.py` utility, which
/// filters these out of a weights document as a separate housekeeping
/// pass rather than folding it into pruning proper.
pub fn remove_generalized(doc: &WeightsDocument) -> WeightsDocument {
    let groups = doc
        .groups
        .iter()
        .map(|group| WRuleGroup {
            rules: group
                .rules
                .iter()
                .map(|rule| WRule {
                    attrs: rule.attrs.clone(),
                    md5: rule.md5.clone(),
                    patterns: rule
                        .patterns
                        .iter()
                        .filter(|p| !p.tokens.iter().any(|t| t.is_generalized()))
                        .cloned()
                        .collect(),
                })
                .collect(),
        })
        .collect();
    WeightsDocument { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights_xml::PatternToken;

    fn pattern(lemma: &str, weight: f64) -> WeightedPattern {
        WeightedPattern { tokens: vec![PatternToken { lemma: lemma.into(), tags: vec!["n".into()] }], weight }
    }

    #[test]
    fn s6_pruner_scenario_seed() {
        let doc = WeightsDocument {
            groups: vec![WRuleGroup {
                rules: vec![
                    WRule { attrs: vec![("id".into(), "r1".into())], md5: "m1".into(), patterns: vec![pattern("dog", 0.3)] },
                    WRule { attrs: vec![("id".into(), "r2".into())], md5: "m2".into(), patterns: vec![pattern("dog", 0.7)] },
                ],
            }],
        };
        let pruned = prune(&doc);
        let group = &pruned.groups[0];
        assert!(group.rules[0].patterns.is_empty(), "default rule r1 should list no patterns");
        assert_eq!(group.rules[1].patterns.len(), 1);
        assert_eq!(group.rules[1].patterns[0].weight, 1.0);
    }

    #[test]
    fn default_rule_winning_drops_pattern_entirely() {
        let doc = WeightsDocument {
            groups: vec![WRuleGroup {
                rules: vec![
                    WRule { attrs: vec![("id".into(), "r1".into())], md5: "m1".into(), patterns: vec![pattern("dog", 0.9)] },
                    WRule { attrs: vec![("id".into(), "r2".into())], md5: "m2".into(), patterns: vec![pattern("dog", 0.1)] },
                ],
            }],
        };
        let pruned = prune(&doc);
        let group = &pruned.groups[0];
        assert!(group.rules[0].patterns.is_empty());
        assert!(group.rules[1].patterns.is_empty());
    }

    #[test]
    fn remove_generalized_drops_lemma_unspecified_patterns() {
        let doc = WeightsDocument {
            groups: vec![WRuleGroup {
                rules: vec![WRule {
                    attrs: vec![("id".into(), "r1".into())],
                    md5: "m1".into(),
                    patterns: vec![
                        pattern("dog", 1.0),
                        WeightedPattern { tokens: vec![PatternToken { lemma: "".into(), tags: vec!["n".into()] }], weight: 1.0 },
                    ],
                }],
            }],
        };
        let filtered = remove_generalized(&doc);
        assert_eq!(filtered.groups[0].rules[0].patterns.len(), 1);
        assert_eq!(filtered.groups[0].rules[0].patterns[0].tokens[0].lemma, "dog");
    }
}
