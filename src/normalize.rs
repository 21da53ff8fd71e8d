//! Corpus-line normalization.
//!
//! Not a component in its own right (spec §1 lists corpus normalization as
//! out of scope), but the estimator and the parallel-mode containment
//! check both call into it, so it is implemented as a small internal
//! helper rather than a standalone module.

use once_cell::sync::Lazy;
use regex::Regex;

static BEFORE_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<c>[^\s])\u{2014}").unwrap());
static AFTER_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\u{2014}(?P<c>[^\s])").unwrap());
static BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<c>[^\s])([,.;:!?])").unwrap());
static AFTER_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([,.;:!?])(?P<c>[^\s])").unwrap());
static NUMFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)\s([,.])\s(\d)").unwrap());
static SMART_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\u{2018}\u{2019}\u{201c}\u{201d}]"#).unwrap());

/// Lowercases, normalizes dash/quote variants, pads punctuation, and closes
/// up digit-group separators, following the reference normalization pass.
pub fn normalize(line: &str) -> String {
    let mut s = line.to_lowercase();
    s = s.replace("--", "\u{2014}");
    s = SMART_QUOTES.replace_all(&s, "\"").into_owned();
    s = BEFORE_DASH.replace_all(&s, "$c —").into_owned();
    s = AFTER_DASH.replace_all(&s, "— $c").into_owned();
    s = BEFORE_PUNCT.replace_all(&s, "$c $2").into_owned();
    s = AFTER_PUNCT.replace_all(&s, "$1 $c").into_owned();
    s = NUMFIX.replace_all(&s, "$1$2$3").into_owned();
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_closes_up_digit_groups() {
        assert_eq!(normalize("It Costs 1 ,000 Dollars."), "it costs 1,000 dollars .");
    }
}
