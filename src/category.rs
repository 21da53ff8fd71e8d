//! Category index: lemma+tags → category-name lookup (spec §4.B).

use crate::token::Token;
use regex::Regex;
use std::collections::BTreeSet;

/// One `def-cat/cat-item` row, compiled into a tag-string matcher plus an
/// optional required lemma.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub tag_regex: Regex,
    /// `None` = any lemma (spec §4.B: "Lemma absent = any lemma").
    pub lemma: Option<String>,
    pub categories: Vec<String>,
}

/// Compiles a dot-separated tag pattern into the regex described by spec
/// §4.B: each non-terminal literal becomes `<name>`, non-terminal `*`
/// becomes `<[a-z0-9-]+>`, a terminal literal becomes `<name>$`, a
/// terminal `*` becomes `(<[a-z0-9-]+>)*$`, and an empty pattern matches
/// only the no-tag token.
pub fn tag_pattern_to_regex(tag_pattern: &str) -> Regex {
    if tag_pattern.is_empty() {
        return Regex::new("^$").expect("static regex");
    }
    let any_tag = "<[a-z0-9-]+>";
    let mut re = String::from("^");
    let items: Vec<&str> = tag_pattern.split('.').collect();
    for tag in &items[..items.len() - 1] {
        if *tag == "*" {
            re.push_str(any_tag);
        } else {
            re.push('<');
            re.push_str(tag);
            re.push('>');
        }
    }
    match *items.last().unwrap() {
        "*" => {
            re.push('(');
            re.push_str(any_tag);
            re.push_str(")*");
        }
        tag => {
            re.push('<');
            re.push_str(tag);
            re.push('>');
        }
    }
    re.push('$');
    Regex::new(&re).unwrap_or_else(|e| panic!("bad tag pattern {tag_pattern:?}: {e}"))
}

#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    rules: Vec<CategoryRule>,
}

impl CategoryIndex {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        CategoryIndex { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// `categories_of`: exhaustively tries every rule whose lemma matches
    /// and unions the category names of the ones whose tag regex matches.
    /// Returns an empty set if nothing matches (spec §4.B).
    pub fn categories_of(&self, token: &Token) -> BTreeSet<String> {
        let tag_string = token.tag_string();
        let mut out = BTreeSet::new();
        for rule in &self.rules {
            let lemma_ok = match &rule.lemma {
                None => true,
                Some(l) => l == &token.lemma,
            };
            if lemma_ok && rule.tag_regex.is_match(&tag_string) {
                out.extend(rule.categories.iter().cloned());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_tag_pattern_regex() {
        let re = tag_pattern_to_regex("n.*");
        assert!(re.is_match("<n><pl>"));
        assert!(!re.is_match("<vblex><pres>"));
    }

    #[test]
    fn empty_pattern_matches_no_tag_string() {
        let re = tag_pattern_to_regex("");
        assert!(re.is_match(""));
        assert!(!re.is_match("<n>"));
    }

    #[test]
    fn wildcard_terminal_matches_zero_or_more() {
        let re = tag_pattern_to_regex("n.*");
        assert!(re.is_match("<n>"));
    }

    #[test]
    fn categories_of_unions_matches() {
        let idx = CategoryIndex::new(vec![
            CategoryRule {
                tag_regex: tag_pattern_to_regex("n.*"),
                lemma: None,
                categories: vec!["noun".into()],
            },
            CategoryRule {
                tag_regex: tag_pattern_to_regex("n.*"),
                lemma: Some("dog".into()),
                categories: vec!["dog-noun".into()],
            },
        ]);
        let tok = Token { lemma: "dog".into(), tags: vec!["n".into(), "pl".into()], unknown: false };
        let cats = idx.categories_of(&tok);
        assert!(cats.contains("noun"));
        assert!(cats.contains("dog-noun"));
    }

    #[test]
    fn categories_of_empty_when_no_match() {
        let idx = CategoryIndex::new(vec![]);
        let tok = Token { lemma: "dog".into(), tags: vec!["n".into()], unknown: false };
        assert!(idx.categories_of(&tok).is_empty());
    }
}
