//! Deterministic trie-FST over category sequences (spec §4.C).
//!
//! Patterns are merged into a trie via a `(state, label) -> state` hash
//! map. Because each `(state, label)` key can only be inserted once,
//! determinism (spec §3 invariant, §8 #3) and prefix sharing both fall out
//! of the construction for free — this is the hash-map alternative spec
//! §9's Design Notes explicitly sanctions over the sorted-levels walk the
//! reference algorithm uses.

use std::collections::HashMap;

pub type StateId = usize;

#[derive(Debug, Clone, Default)]
pub struct Fst {
    transitions: HashMap<(StateId, String), StateId>,
    /// state -> rule index of the group's default rule.
    final_states: HashMap<StateId, usize>,
    next_state: StateId,
}

impl Fst {
    pub const START: StateId = 0;

    /// Builds the FST from `(pattern, default_rule_index)` pairs (spec
    /// §4.C). Patterns are sorted lexicographically first, matching the
    /// spec's stated input contract, though the trie-merge construction
    /// itself does not depend on that order.
    pub fn build(mut patterns: Vec<(Vec<String>, usize)>) -> Fst {
        patterns.sort_by(|a, b| a.0.cmp(&b.0));

        let mut fst = Fst { transitions: HashMap::new(), final_states: HashMap::new(), next_state: 1 };
        for (pattern, rule_index) in patterns {
            let mut state = Fst::START;
            for label in &pattern {
                state = *fst.transitions.entry((state, label.clone())).or_insert_with(|| {
                    let s = fst.next_state;
                    fst.next_state += 1;
                    s
                });
            }
            fst.final_states.insert(state, rule_index);
        }
        fst
    }

    pub fn transition(&self, state: StateId, label: &str) -> Option<StateId> {
        self.transitions.get(&(state, label.to_string())).copied()
    }

    /// Returns the default rule index if `state` is accepting.
    pub fn accepting_rule(&self, state: StateId) -> Option<usize> {
        self.final_states.get(&state).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_one_edge_per_label() {
        let fst = Fst::build(vec![(vec!["A".into()], 0), (vec!["A".into(), "B".into()], 1)]);
        let s1 = fst.transition(Fst::START, "A").unwrap();
        assert_eq!(fst.accepting_rule(s1), Some(0));
        let s2 = fst.transition(s1, "B").unwrap();
        assert_eq!(fst.accepting_rule(s2), Some(1));
    }

    #[test]
    fn distinct_patterns_get_distinct_edges() {
        let fst = Fst::build(vec![(vec!["A".into()], 0), (vec!["B".into()], 1)]);
        let s1 = fst.transition(Fst::START, "A").unwrap();
        let s2 = fst.transition(Fst::START, "B").unwrap();
        assert_ne!(s1, s2);
        assert_eq!(fst.accepting_rule(s1), Some(0));
        assert_eq!(fst.accepting_rule(s2), Some(1));
    }

    #[test]
    fn prefix_shared_states_reused() {
        let fst = Fst::build(vec![
            (vec!["A".into(), "B".into()], 0),
            (vec!["A".into(), "C".into()], 1),
        ]);
        let s1 = fst.transition(Fst::START, "A").unwrap();
        assert!(fst.transition(s1, "B").is_some());
        assert!(fst.transition(s1, "C").is_some());
    }
}
