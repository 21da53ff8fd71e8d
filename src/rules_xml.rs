//! Transfer-rules XML parsing: builds the [`CategoryIndex`] (§4.B) and the
//! rule/rule-group data (§4.C's FST input, §3's `Rule`/`RuleGroup`).
//!
//! Parsing is eager and produces owned data — the source text is kept only
//! long enough to slice out each `<rule>` element's verbatim text (needed
//! for the `md5` attribute emitted downstream, spec §3/§8 invariant 7) and
//! to preserve any other top-level sections verbatim.

use crate::category::{CategoryIndex, CategoryRule, tag_pattern_to_regex};
use crate::errors::{LearnerError, Result};
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Rule {
    pub index: usize,
    pub id: Option<String>,
    pub pattern: Vec<String>,
    /// Original XML attributes in source order (includes `id` if present).
    pub attrs: Vec<(String, String)>,
    /// Verbatim `<rule>...</rule>` source text.
    pub raw_xml: String,
}

impl Rule {
    /// MD5 of the whitespace-stripped original rule XML (spec §3, §8 #7).
    pub fn md5(&self) -> String {
        let stripped: String = self.raw_xml.chars().filter(|c| !c.is_whitespace()).collect();
        let mut hasher = Md5::new();
        hasher.update(stripped.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A maximal set of rule indices sharing one pattern tuple (spec §3).
#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub default_index: usize,
    pub members: Vec<usize>,
}

impl RuleGroup {
    /// Per spec §3: an ambiguous group is a maximal set of rules sharing a
    /// pattern tuple, *each carrying an author-supplied id* — two rules
    /// that merely happen to share a pattern, with no `id` authored on
    /// either, are not alternatives and must not be treated as a group.
    pub fn is_ambiguous(&self, rules: &[Rule]) -> bool {
        self.members.len() >= 2 && self.members.iter().all(|&idx| rules[idx].id.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct RulesDocument {
    pub category_index: CategoryIndex,
    /// All rules in original file order (not deduplicated by pattern).
    pub rules: Vec<Rule>,
    /// One entry per distinct pattern tuple, mapping to the group's default
    /// rule index — this is the FST builder's input (spec §4.C).
    pub fst_patterns: Vec<(Vec<String>, usize)>,
    /// Keyed by default rule index; only contains groups of size >= 2.
    pub ambiguous_groups: HashMap<usize, RuleGroup>,
    /// Top-level sections other than `section-def-cats`/`section-rules`,
    /// preserved verbatim (spec §6: "macros, lists, attrs, vars").
    pub other_sections: Vec<(String, String)>,
}

impl RulesDocument {
    pub fn rule_by_index(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }
}

pub fn parse(xml_text: &str, path: &Path) -> Result<RulesDocument> {
    let doc = roxmltree::Document::parse(xml_text)
        .map_err(|e| LearnerError::BadRulesXml { path: path.to_path_buf(), source: e })?;
    let root = doc.root_element();

    let def_cats_node = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "section-def-cats")
        .ok_or_else(|| schema_err(path, "missing section-def-cats"))?;

    let mut category_rules = Vec::new();
    for def_cat in def_cats_node.children().filter(|n| n.is_element() && n.tag_name().name() == "def-cat") {
        let cat_name = def_cat
            .attribute("n")
            .ok_or_else(|| schema_err(path, "def-cat missing n attribute"))?
            .to_string();
        for cat_item in def_cat.children().filter(|n| n.is_element() && n.tag_name().name() == "cat-item") {
            let tags = cat_item.attribute("tags").unwrap_or("*");
            // Per §9 Open Question 3: an absent lemma attribute means "any
            // lemma"; a present (even empty-string) attribute is matched
            // literally.
            let lemma = cat_item.attribute("lemma").map(|s| s.to_string());
            category_rules.push(CategoryRule {
                tag_regex: tag_pattern_to_regex(tags),
                lemma,
                categories: vec![cat_name.clone()],
            });
        }
    }

    let rules_node = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "section-rules")
        .ok_or_else(|| schema_err(path, "missing section-rules"))?;

    let mut rules = Vec::new();
    for (index, rule_node) in rules_node.children().filter(|n| n.is_element() && n.tag_name().name() == "rule").enumerate() {
        let id = rule_node.attribute("id").map(|s| s.to_string());
        let pattern_node = rule_node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "pattern")
            .ok_or_else(|| schema_err(path, "rule missing pattern"))?;
        let mut pattern = Vec::new();
        for item in pattern_node.children().filter(|n| n.is_element() && n.tag_name().name() == "pattern-item") {
            let n = item.attribute("n").ok_or_else(|| schema_err(path, "pattern-item missing n attribute"))?;
            pattern.push(n.to_string());
        }
        if pattern.is_empty() {
            return Err(schema_err(path, "rule pattern has zero pattern-items"));
        }
        let attrs = rule_node.attributes().map(|a| (a.name().to_string(), a.value().to_string())).collect();
        let raw_xml = xml_text[rule_node.range()].to_string();
        rules.push(Rule { index, id, pattern, attrs, raw_xml });
    }

    let (fst_patterns, ambiguous_groups) = group_rules(&rules);

    let mut other_sections = Vec::new();
    for node in root.children().filter(|n| n.is_element()) {
        let name = node.tag_name().name();
        if name != "section-def-cats" && name != "section-rules" {
            other_sections.push((name.to_string(), xml_text[node.range()].to_string()));
        }
    }

    Ok(RulesDocument {
        category_index: CategoryIndex::new(category_rules),
        rules,
        fst_patterns,
        ambiguous_groups,
        other_sections,
    })
}

/// Groups rules by identical pattern tuple (not requiring file adjacency,
/// per spec §3's "maximal set"). Returns the FST's input pattern list
/// (one entry per distinct pattern, using the group's default/lowest
/// index) and the map of ambiguous groups (size >= 2) keyed by that
/// default index.
fn group_rules(rules: &[Rule]) -> (Vec<(Vec<String>, usize)>, HashMap<usize, RuleGroup>) {
    let mut first_seen: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: HashMap<usize, RuleGroup> = HashMap::new();
    let mut order: Vec<Vec<String>> = Vec::new();

    for rule in rules {
        match first_seen.get(&rule.pattern) {
            Some(&default_index) => {
                groups
                    .entry(default_index)
                    .or_insert_with(|| RuleGroup { default_index, members: vec![default_index] })
                    .members
                    .push(rule.index);
            }
            None => {
                first_seen.insert(rule.pattern.clone(), rule.index);
                order.push(rule.pattern.clone());
            }
        }
    }

    groups.retain(|_, g| g.is_ambiguous(rules));

    let fst_patterns = order.into_iter().map(|p| {
        let default_index = first_seen[&p];
        (p, default_index)
    }).collect();

    (fst_patterns, groups)
}

fn schema_err(path: &Path, detail: &str) -> LearnerError {
    LearnerError::RulesSchema { path: path.to_path_buf(), detail: detail.to_string() }
}

pub fn load(path: &Path) -> Result<RulesDocument> {
    let text = std::fs::read_to_string(path).map_err(|e| LearnerError::CorpusIo { path: path.to_path_buf(), source: e })?;
    parse(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<transfer-rules>
  <section-def-cats>
    <def-cat n="noun">
      <cat-item tags="n.*"/>
    </def-cat>
    <def-cat n="det">
      <cat-item tags="det"/>
    </def-cat>
  </section-def-cats>
  <section-rules>
    <rule id="r0" comment="first">
      <pattern><pattern-item n="det"/><pattern-item n="noun"/></pattern>
    </rule>
    <rule id="r1" comment="second">
      <pattern><pattern-item n="det"/><pattern-item n="noun"/></pattern>
    </rule>
    <rule id="r2">
      <pattern><pattern-item n="noun"/></pattern>
    </rule>
  </section-rules>
</transfer-rules>"#;

    #[test]
    fn parses_rules_and_groups() {
        let doc = parse(SAMPLE, Path::new("test.t1x")).unwrap();
        assert_eq!(doc.rules.len(), 3);
        assert_eq!(doc.fst_patterns.len(), 2);
        assert!(doc.ambiguous_groups.contains_key(&0));
        let group = &doc.ambiguous_groups[&0];
        assert_eq!(group.members, vec![0, 1]);
        assert!(!doc.ambiguous_groups.contains_key(&2));
    }

    #[test]
    fn shared_pattern_without_ids_is_not_ambiguous() {
        let xml = r#"<transfer-rules>
          <section-def-cats><def-cat n="noun"><cat-item tags="n"/></def-cat></section-def-cats>
          <section-rules>
            <rule><pattern><pattern-item n="noun"/></pattern></rule>
            <rule><pattern><pattern-item n="noun"/></pattern></rule>
          </section-rules>
        </transfer-rules>"#;
        let doc = parse(xml, Path::new("test.t1x")).unwrap();
        assert_eq!(doc.rules.len(), 2);
        assert_eq!(doc.fst_patterns.len(), 1);
        assert!(doc.ambiguous_groups.is_empty());
    }

    #[test]
    fn shared_pattern_with_one_id_missing_is_not_ambiguous() {
        let xml = r#"<transfer-rules>
          <section-def-cats><def-cat n="noun"><cat-item tags="n"/></def-cat></section-def-cats>
          <section-rules>
            <rule id="r0"><pattern><pattern-item n="noun"/></pattern></rule>
            <rule><pattern><pattern-item n="noun"/></pattern></rule>
          </section-rules>
        </transfer-rules>"#;
        let doc = parse(xml, Path::new("test.t1x")).unwrap();
        assert!(doc.ambiguous_groups.is_empty());
    }

    #[test]
    fn md5_is_stable_under_whitespace_changes() {
        let doc = parse(SAMPLE, Path::new("test.t1x")).unwrap();
        let r0 = &doc.rules[0];
        let with_extra_ws = r0.raw_xml.replace('\n', "\n\n  ");
        let r0_ws = Rule { raw_xml: with_extra_ws, ..r0.clone() };
        assert_eq!(r0.md5(), r0_ws.md5());
    }
}
