//! Stream-format token parsing.
//!
//! Operation `tokens(line)`: extracts maximal substrings between an
//! unescaped `^` and the next `$`, then splits each into lemma + tag
//! string. See spec §4.A.

/// One parsed `^lemma<t1>…<tk>$` surface form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lemma: String,
    pub tags: Vec<String>,
    /// Set when the raw token text contained `*` (unknown word).
    pub unknown: bool,
}

impl Token {
    /// Reconstructs the `<t1><t2>…` tag string used by category matchers.
    pub fn tag_string(&self) -> String {
        let mut s = String::new();
        for t in &self.tags {
            s.push('<');
            s.push_str(t);
            s.push('>');
        }
        s
    }

    /// True if this token carries the `sent` tag, i.e. marks a sentence
    /// boundary in the stream (spec §6, "Stream token format").
    pub fn is_sentence_boundary(&self) -> bool {
        self.tags.iter().any(|t| t == "sent")
    }

    fn from_alu_body(body: &str) -> Token {
        let unknown = body.contains('*');
        let lemma_end = body.find('<').unwrap_or(body.len());
        let lemma = body[..lemma_end].trim_start_matches('*').to_string();
        let tag_str = &body[lemma_end..];
        let tags = parse_tags(tag_str);
        Token { lemma, tags, unknown }
    }
}

fn parse_tags(tag_str: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut start = None;
    for (i, c) in tag_str.char_indices() {
        match c {
            '<' => start = Some(i + 1),
            '>' => {
                if let Some(s) = start.take() {
                    tags.push(tag_str[s..i].to_string());
                }
            }
            _ => {}
        }
    }
    tags
}

/// Splits `line` into tokens, ignoring any intervening surface text.
///
/// A `^` is "unescaped" unless immediately preceded by a backslash in the
/// input; the scan otherwise takes the first `$` following each `^` as the
/// token's end, per spec §4.A.
pub fn tokens(line: &str) -> Vec<Token> {
    let bytes: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == '^' && (i == 0 || bytes[i - 1] != '\\') {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j] != '$' {
                j += 1;
            }
            if j < bytes.len() {
                let body: String = bytes[start..j].iter().collect();
                out.push(Token::from_alu_body(&body));
                i = j + 1;
                continue;
            } else {
                // No closing `$`: nothing more to find.
                break;
            }
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_token() {
        let toks = tokens("^dog<n><pl>$ some surface text ^run<vblex><pres>$");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].lemma, "dog");
        assert_eq!(toks[0].tags, vec!["n", "pl"]);
        assert!(!toks[0].unknown);
        assert_eq!(toks[1].lemma, "run");
    }

    #[test]
    fn flags_unknown_words() {
        let toks = tokens("^*foo<n>$");
        assert_eq!(toks.len(), 1);
        assert!(toks[0].unknown);
        assert_eq!(toks[0].lemma, "foo");
    }

    #[test]
    fn empty_tags_token() {
        let toks = tokens("^foo$");
        assert_eq!(toks[0].tags.len(), 0);
        assert_eq!(toks[0].tag_string(), "");
    }

    #[test]
    fn detects_sentence_boundary() {
        let toks = tokens("^.<sent>$");
        assert!(toks[0].is_sentence_boundary());
    }
}
