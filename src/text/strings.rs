//! String operations exported over string handles.

use std::cmp::Ordering;

/// Split around each `sep`. An empty `sep` splits into single characters.
pub fn split(s: &str, sep: &str) -> Vec<String> {
    split_n(s, sep, -1)
}

/// Split into at most `n` parts (all parts when `n < 0`, none when `n == 0`).
/// The last part holds the unsplit remainder.
pub fn split_n(s: &str, sep: &str, n: i32) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    if sep.is_empty() {
        let chars: Vec<&str> = s
            .char_indices()
            .map(|(i, c)| &s[i..i + c.len_utf8()])
            .collect();
        if n < 0 || n as usize >= chars.len() {
            return chars.into_iter().map(str::to_string).collect();
        }
        let keep = n as usize - 1;
        let head: usize = chars[..keep].iter().map(|c| c.len()).sum();
        let mut parts: Vec<String> = chars[..keep].iter().map(|c| c.to_string()).collect();
        parts.push(s[head..].to_string());
        return parts;
    }
    if n < 0 {
        s.split(sep).map(str::to_string).collect()
    } else {
        s.splitn(n as usize, sep).map(str::to_string).collect()
    }
}

/// Split around runs of whitespace.
pub fn fields(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Replace the first `n` non-overlapping occurrences (all when `n < 0`).
pub fn replace(s: &str, old: &str, new: &str, n: i32) -> String {
    match n {
        0 => s.to_string(),
        n if n < 0 => s.replace(old, new),
        n => s.replacen(old, new, n as usize),
    }
}

pub fn trim(s: &str, cutset: &str) -> String {
    s.trim_matches(|c: char| cutset.contains(c)).to_string()
}

pub fn trim_prefix(s: &str, prefix: &str) -> String {
    s.strip_prefix(prefix).unwrap_or(s).to_string()
}

pub fn trim_suffix(s: &str, suffix: &str) -> String {
    s.strip_suffix(suffix).unwrap_or(s).to_string()
}

/// Slice around the first `sep`. Without a match, `before` is all of `s`.
pub fn cut<'a>(s: &'a str, sep: &str) -> (&'a str, &'a str, bool) {
    match s.split_once(sep) {
        Some((before, after)) => (before, after, true),
        None => (s, "", false),
    }
}

pub fn cut_prefix<'a>(s: &'a str, prefix: &str) -> (&'a str, bool) {
    match s.strip_prefix(prefix) {
        Some(rest) => (rest, true),
        None => (s, false),
    }
}

pub fn cut_suffix<'a>(s: &'a str, suffix: &str) -> (&'a str, bool) {
    match s.strip_suffix(suffix) {
        Some(rest) => (rest, true),
        None => (s, false),
    }
}

/// Byte index of the first character of `s` that appears in `chars`, or -1.
pub fn index_any(s: &str, chars: &str) -> i32 {
    s.find(|c: char| chars.contains(c)).map_or(-1, |i| i as i32)
}

pub fn contains_any(s: &str, chars: &str) -> bool {
    index_any(s, chars) >= 0
}

/// Byte index of the first `sub`, or -1.
pub fn index(s: &str, sub: &str) -> i32 {
    s.find(sub).map_or(-1, |i| i as i32)
}

/// Non-overlapping occurrences; an empty `sub` counts characters plus one.
pub fn count(s: &str, sub: &str) -> i32 {
    if sub.is_empty() {
        return s.chars().count() as i32 + 1;
    }
    s.matches(sub).count() as i32
}

pub fn compare(a: &str, b: &str) -> i32 {
    match a.cmp(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Simple lowercase mapping: one rune to one rune. Runes whose full mapping
/// expands (only U+0130) take their single-rune mapping.
pub fn lower_rune(c: char) -> char {
    let mut mapped = c.to_lowercase();
    match (mapped.next(), mapped.next()) {
        (Some(single), None) => single,
        _ if c == '\u{130}' => 'i',
        _ => c,
    }
}

/// Simple uppercase mapping: one rune to one rune. Runes whose full mapping
/// expands keep themselves, except the Greek iota-subscript letters, which
/// map to their titlecase form.
pub fn upper_rune(c: char) -> char {
    let mut mapped = c.to_uppercase();
    match (mapped.next(), mapped.next()) {
        (Some(single), None) => single,
        _ => {
            let code = c as u32;
            let simple = match code {
                0x1F80..=0x1FAF if code & 0xF < 8 => code + 8,
                0x1FB3 | 0x1FC3 | 0x1FF3 => code + 9,
                _ => code,
            };
            char::from_u32(simple).unwrap_or(c)
        }
    }
}

/// Lowercase rune by rune; the result has as many runes as the input.
pub fn to_lower(s: &str) -> String {
    s.chars().map(lower_rune).collect()
}

/// Uppercase rune by rune; `ß` stays `ß`.
pub fn to_upper(s: &str) -> String {
    s.chars().map(upper_rune).collect()
}

/// Case-insensitive equality under simple Unicode case folding: runes are
/// compared one to one, so `ß` does not match `SS`.
pub fn equal_fold(a: &str, b: &str) -> bool {
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if fold_eq(x, y) => continue,
            _ => return false,
        }
    }
}

fn fold_eq(x: char, y: char) -> bool {
    x == y || lower_rune(x) == lower_rune(y) || upper_rune(x) == upper_rune(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_variants() {
        assert_eq!(split("a,b,c", ","), ["a", "b", "c"]);
        assert_eq!(split("abc", ""), ["a", "b", "c"]);
        assert_eq!(split_n("a,b,c", ",", 2), ["a", "b,c"]);
        assert_eq!(split_n("héllo", "", 2), ["h", "éllo"]);
        assert!(split_n("a,b", ",", 0).is_empty());
    }

    #[test]
    fn test_fields() {
        assert_eq!(fields("  foo bar\tbaz  "), ["foo", "bar", "baz"]);
    }

    #[test]
    fn test_replace() {
        assert_eq!(replace("oink oink oink", "k", "ky", 2), "oinky oinky oink");
        assert_eq!(replace("oink oink", "oink", "moo", -1), "moo moo");
        assert_eq!(replace("abc", "b", "x", 0), "abc");
    }

    #[test]
    fn test_trims() {
        assert_eq!(trim("¡¡Hello!!", "!¡"), "Hello");
        assert_eq!(trim_prefix("prefix-body", "prefix-"), "body");
        assert_eq!(trim_suffix("body.txt", ".md"), "body.txt");
    }

    #[test]
    fn test_index_count_compare() {
        assert_eq!(index("chicken", "ken"), 4);
        assert_eq!(index("chicken", "dmr"), -1);
        assert_eq!(count("cheese", "e"), 3);
        assert_eq!(count("five", ""), 5);
        assert_eq!(compare("a", "b"), -1);
        assert_eq!(compare("b", "a"), 1);
    }

    #[test]
    fn test_cut_family() {
        assert_eq!(cut("key=value=x", "="), ("key", "value=x", true));
        assert_eq!(cut("novalue", "="), ("novalue", "", false));
        assert_eq!(cut("", ""), ("", "", true));
        assert_eq!(cut_prefix("v1.2", "v"), ("1.2", true));
        assert_eq!(cut_prefix("1.2", "v"), ("1.2", false));
        assert_eq!(cut_suffix("main.rs", ".rs"), ("main", true));
        assert_eq!(cut_suffix("main.go", ".rs"), ("main.go", false));
    }

    #[test]
    fn test_index_any() {
        assert_eq!(index_any("golang", "xyzn"), 4);
        assert_eq!(index_any("chicken", "xyz"), -1);
        assert_eq!(index_any("häagen", "ag"), 3);
        assert_eq!(index_any("anything", ""), -1);
        assert!(contains_any("failure", "ui"));
        assert!(!contains_any("foo", ""));
        assert!(!contains_any("", ""));
    }

    #[test]
    fn test_equal_fold() {
        assert!(equal_fold("Go", "GO"));
        assert!(equal_fold("Straße", "STRAßE"));
        assert!(!equal_fold("go", "gopher"));
        assert!(!equal_fold("ß", "SS"));
        assert!(equal_fold("\u{212A}", "k"));
        assert!(equal_fold("ſ", "S"));
        assert!(equal_fold("σ", "ς"));
    }

    #[test]
    fn test_case_mapping_is_per_rune() {
        assert_eq!(to_lower("İSTANBUL"), "istanbul");
        assert_eq!(to_upper("straße"), "STRAßE");
        assert_eq!(to_upper("ᾳ"), "\u{1FBC}");
        assert_eq!(to_upper("ﬀ"), "ﬀ");
        assert_eq!(to_lower("ÀÉÎ"), "àéî");
        assert_eq!(to_upper("hello, мир"), "HELLO, МИР");
    }
}
