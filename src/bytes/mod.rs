//! Byte Slices
//!
//! Immutable byte values (`Vec<u8>` in the registry) and the slice
//! operations exported over them. Operations never modify their inputs;
//! every result is a fresh value.

mod buffer;
mod reader;

pub use buffer::BytesBuffer;
pub use reader::{BytesReader, ReadOutcome, SEEK_CUR, SEEK_END, SEEK_SET};

pub(crate) use reader::SliceCursor;

use std::cmp::Ordering;

use crate::text::strings;

/// Byte offset of the first occurrence of `needle`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Index of `needle` or -1.
pub fn index(haystack: &[u8], needle: &[u8]) -> i32 {
    find(haystack, needle).map_or(-1, |i| i as i32)
}

pub fn compare(a: &[u8], b: &[u8]) -> i32 {
    match a.cmp(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Non-overlapping occurrences of `sep`; an empty `sep` counts runes plus one.
pub fn count(s: &[u8], sep: &[u8]) -> i32 {
    if sep.is_empty() {
        return rune_boundaries(s).len() as i32;
    }
    let mut n = 0;
    let mut rest = s;
    while let Some(i) = find(rest, sep) {
        n += 1;
        rest = &rest[i + sep.len()..];
    }
    n
}

/// Split around each `sep`. An empty `sep` splits after each UTF-8 sequence.
pub fn split(s: &[u8], sep: &[u8]) -> Vec<Vec<u8>> {
    if sep.is_empty() {
        let bounds = rune_boundaries(s);
        return bounds
            .windows(2)
            .map(|w| s[w[0]..w[1]].to_vec())
            .collect();
    }
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(i) = find(rest, sep) {
        parts.push(rest[..i].to_vec());
        rest = &rest[i + sep.len()..];
    }
    parts.push(rest.to_vec());
    parts
}

pub fn join(parts: &[Vec<u8>], sep: &[u8]) -> Vec<u8> {
    parts.join(sep)
}

/// Replace the first `n` occurrences of `old` (all of them when `n < 0`).
pub fn replace(s: &[u8], old: &[u8], new: &[u8], n: i32) -> Vec<u8> {
    if n == 0 || (old == new && !old.is_empty()) {
        return s.to_vec();
    }
    let limit = if n < 0 { usize::MAX } else { n as usize };
    let mut out = Vec::with_capacity(s.len());

    if old.is_empty() {
        let bounds = rune_boundaries(s);
        let mut done = 0;
        let mut last = 0;
        for &b in &bounds {
            if done == limit {
                break;
            }
            out.extend_from_slice(&s[last..b]);
            out.extend_from_slice(new);
            last = b;
            done += 1;
        }
        out.extend_from_slice(&s[last..]);
        return out;
    }

    let mut rest = s;
    let mut done = 0;
    while done < limit {
        match find(rest, old) {
            Some(i) => {
                out.extend_from_slice(&rest[..i]);
                out.extend_from_slice(new);
                rest = &rest[i + old.len()..];
                done += 1;
            }
            None => break,
        }
    }
    out.extend_from_slice(rest);
    out
}

/// Map every valid rune with `map`, copying invalid bytes through.
fn map_runes(s: &[u8], map: fn(char) -> char) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for chunk in s.utf8_chunks() {
        for c in chunk.valid().chars() {
            out.extend_from_slice(map(c).encode_utf8(&mut buf).as_bytes());
        }
        out.extend_from_slice(chunk.invalid());
    }
    out
}

/// Lowercase rune by rune; invalid UTF-8 is copied unchanged.
pub fn to_lower(s: &[u8]) -> Vec<u8> {
    map_runes(s, strings::lower_rune)
}

/// Uppercase rune by rune; invalid UTF-8 is copied unchanged.
pub fn to_upper(s: &[u8]) -> Vec<u8> {
    map_runes(s, strings::upper_rune)
}

pub fn trim_space(s: &[u8]) -> Vec<u8> {
    let start = s
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(s.len());
    let end = s
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    s[start..end.max(start)].to_vec()
}

/// Trim leading and trailing bytes that appear in `cutset`.
pub fn trim(s: &[u8], cutset: &str) -> Vec<u8> {
    match std::str::from_utf8(s) {
        Ok(text) => text
            .trim_matches(|c: char| cutset.contains(c))
            .as_bytes()
            .to_vec(),
        Err(_) => {
            let cut = cutset.as_bytes();
            let start = s.iter().position(|b| !cut.contains(b)).unwrap_or(s.len());
            let end = s
                .iter()
                .rposition(|b| !cut.contains(b))
                .map_or(start, |i| i + 1);
            s[start..end.max(start)].to_vec()
        }
    }
}

pub fn trim_prefix<'a>(s: &'a [u8], prefix: &[u8]) -> &'a [u8] {
    s.strip_prefix(prefix).unwrap_or(s)
}

pub fn trim_suffix<'a>(s: &'a [u8], suffix: &[u8]) -> &'a [u8] {
    s.strip_suffix(suffix).unwrap_or(s)
}

/// Slice around the first `sep`. Without a match, `before` is all of `s`.
pub fn cut<'a>(s: &'a [u8], sep: &[u8]) -> (&'a [u8], &'a [u8], bool) {
    match find(s, sep) {
        Some(i) => (&s[..i], &s[i + sep.len()..], true),
        None => (s, &[], false),
    }
}

pub fn cut_prefix<'a>(s: &'a [u8], prefix: &[u8]) -> (&'a [u8], bool) {
    match s.strip_prefix(prefix) {
        Some(rest) => (rest, true),
        None => (s, false),
    }
}

pub fn cut_suffix<'a>(s: &'a [u8], suffix: &[u8]) -> (&'a [u8], bool) {
    match s.strip_suffix(suffix) {
        Some(rest) => (rest, true),
        None => (s, false),
    }
}

/// Split around runs of Unicode whitespace. Invalid bytes are never space.
pub fn fields(s: &[u8]) -> Vec<Vec<u8>> {
    let mut parts = Vec::new();
    let mut start = None;
    for (at, rune) in runes(s) {
        let space = rune.is_some_and(char::is_whitespace);
        match (start, space) {
            (None, false) => start = Some(at),
            (Some(from), true) => {
                parts.push(s[from..at].to_vec());
                start = None;
            }
            _ => {}
        }
    }
    if let Some(from) = start {
        parts.push(s[from..].to_vec());
    }
    parts
}

pub fn index_byte(s: &[u8], c: u8) -> i32 {
    s.iter().position(|&b| b == c).map_or(-1, |i| i as i32)
}

/// Byte index of the first rune of `s` found in `chars`, or -1. An invalid
/// byte matches when `chars` holds U+FFFD.
pub fn index_any(s: &[u8], chars: &str) -> i32 {
    if chars.is_empty() {
        return -1;
    }
    runes(s)
        .find(|(_, rune)| chars.contains(rune.unwrap_or(char::REPLACEMENT_CHARACTER)))
        .map_or(-1, |(at, _)| at as i32)
}

/// Replace each run of invalid UTF-8 with `replacement`.
pub fn to_valid_utf8(s: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut in_invalid = false;
    for chunk in s.utf8_chunks() {
        if !chunk.valid().is_empty() {
            out.extend_from_slice(chunk.valid().as_bytes());
            in_invalid = false;
        }
        if !chunk.invalid().is_empty() {
            if !in_invalid {
                out.extend_from_slice(replacement);
            }
            in_invalid = true;
        }
    }
    out
}

/// Each rune with its byte offset; `None` for an invalid byte.
fn runes(s: &[u8]) -> impl Iterator<Item = (usize, Option<char>)> + '_ {
    let bounds = rune_boundaries(s);
    (0..bounds.len() - 1).map(move |i| {
        let (from, to) = (bounds[i], bounds[i + 1]);
        let rune = std::str::from_utf8(&s[from..to])
            .ok()
            .and_then(|r| r.chars().next());
        (from, rune)
    })
}

/// Byte offsets of every rune start plus the end offset. Invalid bytes count
/// as one rune each.
fn rune_boundaries(s: &[u8]) -> Vec<usize> {
    let mut bounds = Vec::with_capacity(s.len() + 1);
    let mut i = 0;
    while i < s.len() {
        bounds.push(i);
        i += utf8_width(&s[i..]);
    }
    bounds.push(s.len());
    bounds
}

fn utf8_width(s: &[u8]) -> usize {
    let width = match s[0] {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return 1,
    };
    if s.len() >= width && std::str::from_utf8(&s[..width]).is_ok() {
        width
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_and_index() {
        assert_eq!(index(b"chicken", b"ken"), 4);
        assert_eq!(index(b"chicken", b"dmr"), -1);
        assert_eq!(index(b"abc", b""), 0);
        assert!(contains(b"seafood", b"foo"));
        assert!(!contains(b"sea", b"seafood"));
    }

    #[test]
    fn test_count() {
        assert_eq!(count(b"cheese", b"e"), 3);
        assert_eq!(count(b"five", b""), 5);
        assert_eq!(count("héllo".as_bytes(), b""), 6);
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split(b"a,b,c", b","),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(split(b"", b","), vec![Vec::<u8>::new()]);
        assert_eq!(split("aé".as_bytes(), b"").len(), 2);
    }

    #[test]
    fn test_replace() {
        assert_eq!(replace(b"oink oink oink", b"k", b"ky", 2), b"oinky oinky oink");
        assert_eq!(replace(b"oink oink oink", b"oink", b"moo", -1), b"moo moo moo");
        assert_eq!(replace(b"abc", b"", b"-", -1), b"-a-b-c-");
        assert_eq!(replace(b"abc", b"", b"-", 2), b"-a-bc");
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(to_upper(b"Gopher"), b"GOPHER");
        assert_eq!(to_lower(&[0xFF, b'A']), vec![0xFF, b'a']);
        assert_eq!(to_upper("straße ǆ".as_bytes()), "STRAßE Ǆ".as_bytes());
        assert_eq!(to_lower("ÀÉ\u{130}".as_bytes()), "àéi".as_bytes());
        assert_eq!(trim_space(b"  \t hi \n"), b"hi");
        assert_eq!(trim_space(b"   "), b"");
        assert_eq!(trim(b"xxhixx", "x"), b"hi");
    }

    #[test]
    fn test_cut_and_trim_affixes() {
        assert_eq!(cut(b"k=v=w", b"="), (&b"k"[..], &b"v=w"[..], true));
        assert_eq!(cut(b"kv", b"="), (&b"kv"[..], &b""[..], false));
        assert_eq!(cut_prefix(b"0x1F", b"0x"), (&b"1F"[..], true));
        assert_eq!(cut_suffix(b"a.tar", b".gz"), (&b"a.tar"[..], false));
        assert_eq!(trim_prefix(b"--flag", b"--"), b"flag");
        assert_eq!(trim_suffix(b"name.txt", b".txt"), b"name");
        assert_eq!(trim_suffix(b"name", b".txt"), b"name");
    }

    #[test]
    fn test_fields() {
        assert_eq!(
            fields(b"  foo bar\t baz \n"),
            vec![b"foo".to_vec(), b"bar".to_vec(), b"baz".to_vec()]
        );
        assert_eq!(fields("a\u{2003}b".as_bytes()), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(fields(&[0xFF, b' ', b'x']), vec![vec![0xFF], b"x".to_vec()]);
        assert!(fields(b" \t\n").is_empty());
    }

    #[test]
    fn test_index_byte_and_any() {
        assert_eq!(index_byte(b"chicken", b'k'), 4);
        assert_eq!(index_byte(b"chicken", b'g'), -1);
        assert_eq!(index_any(b"golang", "xyzn"), 4);
        assert_eq!(index_any(b"golang", ""), -1);
        assert_eq!(index_any(&[b'a', 0xFF, b'b'], "\u{FFFD}"), 1);
        assert_eq!(index_any(&[b'a', 0xFF, b'b'], "b"), 2);
    }

    #[test]
    fn test_to_valid_utf8() {
        assert_eq!(to_valid_utf8(b"ok", b"?"), b"ok");
        assert_eq!(to_valid_utf8(&[b'a', 0xFF, 0xFE, b'b', 0xC0], b"\xEF\xBF\xBD"), "a\u{FFFD}b\u{FFFD}".as_bytes());
        assert_eq!(to_valid_utf8(&[0xFF, b'x'], b""), b"x");
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(b"a", b"b"), -1);
        assert_eq!(compare(b"b", b"b"), 0);
        assert_eq!(compare(b"bb", b"b"), 1);
    }
}
