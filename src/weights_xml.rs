//! The weights document data model (spec §3 `WeightsDocument`), its
//! canonical XML serialization (spec §6) and parser (needed by the pruner
//! and by the round-trip test, spec §8 invariant 5).

use crate::errors::{LearnerError, Result};
use crate::token::tokens as parse_alu_tokens;
use crate::xmlwrite::escape_attr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct PatternToken {
    pub lemma: String,
    pub tags: Vec<String>,
}

impl PatternToken {
    /// Renders back to `^lemma<tag>…$` stream format.
    pub fn render(&self) -> String {
        let mut s = format!("^{}", self.lemma);
        for t in &self.tags {
            s.push('<');
            s.push_str(t);
            s.push('>');
        }
        s.push('$');
        s
    }

    /// `true` when this is a "generalized" pattern-item: no lemma
    /// specified (spec's supplemented `remove_generalized` feature).
    pub fn is_generalized(&self) -> bool {
        self.lemma.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPattern {
    pub tokens: Vec<PatternToken>,
    pub weight: f64,
}

impl WeightedPattern {
    /// Canonical string key for a pattern, space-joining its rendered
    /// tokens — the same shape as the score-row file's `pattern_string`
    /// column (spec §6), so rows can be parsed with [`crate::token::tokens`].
    pub fn key(&self) -> String {
        self.tokens.iter().map(|t| t.render()).collect::<Vec<_>>().join(" ")
    }
}

/// Builds the token list for a pattern key by re-using the stream-format
/// tokenizer (spec §6's score-row `pattern_string` has exactly that shape).
pub fn pattern_tokens_from_key(key: &str) -> Vec<PatternToken> {
    parse_alu_tokens(key).into_iter().map(|t| PatternToken { lemma: t.lemma, tags: t.tags }).collect()
}

#[derive(Debug, Clone)]
pub struct WRule {
    /// Original XML attributes in source order (including `id` if
    /// present), excluding `md5` (always re-derived/appended last).
    pub attrs: Vec<(String, String)>,
    pub md5: String,
    pub patterns: Vec<WeightedPattern>,
}

impl WRule {
    pub fn id_attr(&self) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == "id").map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WRuleGroup {
    /// Rules in original transfer-file order; `rules[0]` is the default.
    pub rules: Vec<WRule>,
}

#[derive(Debug, Clone, Default)]
pub struct WeightsDocument {
    pub groups: Vec<WRuleGroup>,
}

impl WeightsDocument {
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<transfer-weights>\n");
        for group in &self.groups {
            out.push_str("<rule-group>\n");
            for rule in &group.rules {
                out.push_str("<rule");
                for (k, v) in &rule.attrs {
                    out.push_str(&format!(" {}=\"{}\"", k, escape_attr(v)));
                }
                out.push_str(&format!(" md5=\"{}\"", rule.md5));
                out.push('>');
                for pattern in &rule.patterns {
                    out.push_str(&format!("<pattern weight=\"{}\">", pattern.weight));
                    for tok in &pattern.tokens {
                        out.push_str(&format!(
                            "<pattern-item lemma=\"{}\" tags=\"{}\"/>",
                            escape_attr(&tok.lemma),
                            tok.tags.join(".")
                        ));
                    }
                    out.push_str("</pattern>");
                }
                out.push_str("</rule>\n");
            }
            out.push_str("</rule-group>\n");
        }
        out.push_str("</transfer-weights>\n");
        out
    }
}

pub fn parse_weights_xml(xml_text: &str, path: &Path) -> Result<WeightsDocument> {
    let doc = roxmltree::Document::parse(xml_text)
        .map_err(|e| LearnerError::BadRulesXml { path: path.to_path_buf(), source: e })?;
    let root = doc.root_element();

    let mut groups = Vec::new();
    for group_node in root.children().filter(|n| n.is_element() && n.tag_name().name() == "rule-group") {
        let mut rules = Vec::new();
        for rule_node in group_node.children().filter(|n| n.is_element() && n.tag_name().name() == "rule") {
            let mut attrs = Vec::new();
            let mut md5 = String::new();
            for a in rule_node.attributes() {
                if a.name() == "md5" {
                    md5 = a.value().to_string();
                } else {
                    attrs.push((a.name().to_string(), a.value().to_string()));
                }
            }
            let mut patterns = Vec::new();
            for pattern_node in rule_node.children().filter(|n| n.is_element() && n.tag_name().name() == "pattern") {
                let weight: f64 = pattern_node
                    .attribute("weight")
                    .unwrap_or("0")
                    .parse()
                    .map_err(|_| LearnerError::RulesSchema { path: path.to_path_buf(), detail: "bad weight".into() })?;
                let mut tokens = Vec::new();
                for item in pattern_node.children().filter(|n| n.is_element() && n.tag_name().name() == "pattern-item") {
                    let lemma = item.attribute("lemma").unwrap_or("").to_string();
                    let tags = item
                        .attribute("tags")
                        .unwrap_or("")
                        .split('.')
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                    tokens.push(PatternToken { lemma, tags });
                }
                patterns.push(WeightedPattern { tokens, weight });
            }
            rules.push(WRule { attrs, md5, patterns });
        }
        groups.push(WRuleGroup { rules });
    }
    Ok(WeightsDocument { groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WeightsDocument {
        WeightsDocument {
            groups: vec![WRuleGroup {
                rules: vec![
                    WRule {
                        attrs: vec![("id".into(), "r0".into())],
                        md5: "abc123".into(),
                        patterns: vec![],
                    },
                    WRule {
                        attrs: vec![("id".into(), "r1".into())],
                        md5: "def456".into(),
                        patterns: vec![WeightedPattern {
                            tokens: vec![PatternToken { lemma: "dog".into(), tags: vec!["n".into(), "pl".into()] }],
                            weight: 1.0,
                        }],
                    },
                ],
            }],
        }
    }

    #[test]
    fn round_trip_is_a_fixed_point() {
        let doc = sample();
        let xml = doc.to_xml();
        let parsed = parse_weights_xml(&xml, Path::new("w.w1x")).unwrap();
        let xml2 = parsed.to_xml();
        assert_eq!(xml, xml2);
    }

    #[test]
    fn pattern_key_round_trips_through_token_parser() {
        let pattern = WeightedPattern {
            tokens: vec![PatternToken { lemma: "dog".into(), tags: vec!["n".into(), "pl".into()] }],
            weight: 1.0,
        };
        let key = pattern.key();
        let back = pattern_tokens_from_key(&key);
        assert_eq!(back, pattern.tokens);
    }

    #[test]
    fn generalized_pattern_detected() {
        let t = PatternToken { lemma: "".into(), tags: vec!["n".into()] };
        assert!(t.is_generalized());
    }
}
