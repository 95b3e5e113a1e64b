//! Text normalization for accent-insensitive matching.
//!
//! Pure functions with no I/O: accent folding, relaxed regex generation,
//! Levenshtein distance, snippet extraction and HTML stripping.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::{decompose_canonical, is_combining_mark};

/// Accent variants of each base letter, used to build relaxed patterns.
///
/// Every member of a class folds to the class key.
const ACCENT_CLASSES: &[(char, &str)] = &[
    ('a', "aáàảãạăắằẳẵặâấầẩẫậäåā"),
    ('c', "cç"),
    ('d', "dđ"),
    ('e', "eéèẻẽẹêếềểễệëē"),
    ('i', "iíìỉĩịîïī"),
    ('n', "nñ"),
    ('o', "oóòỏõọôốồổỗộơớờởỡợöō"),
    ('u', "uúùủũụưứừửữựûüū"),
    ('y', "yýỳỷỹỵÿ"),
];

/// Folds a single character to its base Latin letter.
///
/// Characters whose canonical decomposition is an ASCII letter followed only
/// by combining marks are folded; everything else passes through.
pub fn fold_char(c: char) -> char {
    match c {
        'đ' => return 'd',
        'Đ' => return 'D',
        _ if c.is_ascii() => return c,
        _ => {}
    }

    let mut base: Option<char> = None;
    let mut only_marks = true;
    decompose_canonical(c, |d| {
        if base.is_none() {
            base = Some(d);
        } else {
            only_marks &= is_combining_mark(d);
        }
    });

    match base {
        Some(b) if b != c && b.is_ascii_alphabetic() && only_marks => b,
        _ => c,
    }
}

/// Removes diacritics, mapping each accented letter to its base letter.
///
/// Case is preserved. Folding is idempotent.
pub fn fold_accents(s: &str) -> String {
    s.chars().map(fold_char).collect()
}

/// Builds a regex fragment that matches `s` regardless of accents.
///
/// The input is lowercased; letters with accent variants become character
/// classes and everything else is escaped. Callers add `(?i)` for case
/// insensitivity.
pub fn relaxed_pattern(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 4);
    let mut buf = [0u8; 4];

    for c in s.to_lowercase().chars() {
        let base = fold_char(c);
        match ACCENT_CLASSES.iter().find(|(key, _)| *key == base) {
            Some((_, class)) => {
                out.push('[');
                out.push_str(class);
                out.push(']');
            }
            None => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }

    out
}

/// Case-insensitive Levenshtein distance over Unicode scalar values.
///
/// Uses a single DP row sized by the shorter input.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }

    let mut row: Vec<usize> = (0..=short.len()).collect();

    for (i, lc) in long.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if lc == sc {
                diag
            } else {
                1 + diag.min(above).min(row[j])
            };
            diag = above;
        }
    }

    row[short.len()]
}

/// Extracts a window of `context` characters around the first match of
/// `query` in `body`.
///
/// Matching is case-insensitive, falling back to accent-folded comparison.
/// Returns `None` when the query does not occur. Truncated ends are marked
/// with `...`.
pub fn contextual_snippet(body: &str, query: &str, context: usize) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    // Per-char lowercase keeps char indices aligned with `body`.
    let body_chars: Vec<char> = body.chars().collect();
    let lower_body: Vec<char> = body_chars.iter().map(|c| lower_char(*c)).collect();
    let lower_query: Vec<char> = query.chars().map(lower_char).collect();

    let start_idx = find_chars(&lower_body, &lower_query).or_else(|| {
        let folded_body: Vec<char> = lower_body.iter().map(|c| fold_char(*c)).collect();
        let folded_query: Vec<char> = lower_query.iter().map(|c| fold_char(*c)).collect();
        find_chars(&folded_body, &folded_query)
    })?;

    let start = start_idx.saturating_sub(context);
    let end = (start_idx + lower_query.len() + context).min(body_chars.len());

    let mut snippet: String = body_chars[start..end].iter().collect();
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < body_chars.len() {
        snippet.push_str("...");
    }
    Some(snippet)
}

/// Removes HTML tags and collapses whitespace runs into single spaces.
pub fn strip_html(html: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    let stripped = match TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").ok()) {
        Some(re) => re.replace_all(html, " "),
        None => html.into(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lower_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fold_vietnamese_and_latin() {
        assert_eq!(fold_accents("Hóa đơn"), "Hoa don");
        assert_eq!(fold_accents("Đặng Thị Ngọc"), "Dang Thi Ngoc");
        assert_eq!(fold_accents("café crème"), "cafe creme");
        assert_eq!(fold_accents("Ünïcödé"), "Unicode");
    }

    #[test]
    fn fold_passes_unmapped_through() {
        assert_eq!(fold_accents("plain ascii 123"), "plain ascii 123");
        assert_eq!(fold_accents("東京"), "東京");
        assert_eq!(fold_accents("한국"), "한국");
    }

    #[test]
    fn relaxed_pattern_matches_accented_text() {
        let re = Regex::new(&format!("(?i){}", relaxed_pattern("hoa don"))).unwrap();
        assert!(re.is_match("Gửi hóa đơn tháng 5"));
        assert!(re.is_match("HOA DON"));
        assert!(!re.is_match("hoa hong"));
    }

    #[test]
    fn relaxed_pattern_from_accented_query() {
        let re = Regex::new(&format!("(?i){}", relaxed_pattern("Café"))).unwrap();
        assert!(re.is_match("cafe au lait"));
        assert!(re.is_match("CAFÉ"));
    }

    #[test]
    fn relaxed_pattern_escapes_metacharacters() {
        let pattern = relaxed_pattern("a.b*(c)");
        let re = Regex::new(&pattern).unwrap();
        assert!(re.is_match("a.b*(c)"));
        assert!(!re.is_match("axbbbc"));
    }

    #[test]
    fn edit_distance_known_values() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("xkcqz", "xkcqy"), 1);
        assert_eq!(edit_distance("Invoice", "invoice"), 0);
    }

    #[test]
    fn edit_distance_counts_code_points() {
        assert_eq!(edit_distance("đơn", "don"), 2);
        assert_eq!(edit_distance("日本語", "日本"), 1);
    }

    #[test]
    fn snippet_marks_truncation() {
        let body = format!("{}invoice{}", "x".repeat(100), "y".repeat(100));
        let snippet = contextual_snippet(&body, "INVOICE", 10).unwrap();
        assert_eq!(
            snippet,
            format!("...{}invoice{}...", "x".repeat(10), "y".repeat(10))
        );
    }

    #[test]
    fn snippet_without_truncation() {
        let snippet = contextual_snippet("pay the invoice today", "invoice", 60).unwrap();
        assert_eq!(snippet, "pay the invoice today");
    }

    #[test]
    fn snippet_falls_back_to_folded_match() {
        let snippet = contextual_snippet("Gửi hóa đơn tháng 5", "hoa don", 3).unwrap();
        assert_eq!(snippet, "...ửi hóa đơn th...");
    }

    #[test]
    fn snippet_none_without_match() {
        assert!(contextual_snippet("hello world", "invoice", 10).is_none());
        assert!(contextual_snippet("hello world", "  ", 10).is_none());
    }

    #[test]
    fn strip_html_removes_tags() {
        let html = "<html><body><p>Hello <b>there</b></p>\n<br/>friend</body></html>";
        assert_eq!(strip_html(html), "Hello there friend");
        assert_eq!(strip_html("no tags"), "no tags");
    }

    proptest! {
        #[test]
        fn fold_is_idempotent(s in "\\PC{0,40}") {
            let once = fold_accents(&s);
            prop_assert_eq!(fold_accents(&once), once);
        }

        #[test]
        fn edit_distance_is_symmetric(a in "\\PC{0,20}", b in "\\PC{0,20}") {
            prop_assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
        }

        #[test]
        fn edit_distance_identity(a in "\\PC{0,30}") {
            prop_assert_eq!(edit_distance(&a, &a), 0);
        }

        #[test]
        fn accent_variants_fold_equal(base in "[a-z ]{0,20}") {
            let accented: String = base
                .chars()
                .map(|c| match c {
                    'a' => 'ắ',
                    'e' => 'ệ',
                    'o' => 'ơ',
                    other => other,
                })
                .collect();
            prop_assert_eq!(fold_accents(&accented), fold_accents(&base));
        }
    }
}
