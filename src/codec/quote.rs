//! Quoted string literals.
//!
//! Double-quoted, single-quoted (one rune) and back-quoted literals with the
//! usual escapes: `\a \b \f \n \r \t \v \\`, `\xNN`, three-digit octal,
//! `\uNNNN` and `\UNNNNNNNN`.
//!
//! Printability is decided without Unicode category tables: controls,
//! whitespace other than ASCII space, format characters, private use and
//! noncharacters are escaped; everything else prints as itself.

use crate::status::{FatResult, Failure, Status};

fn invalid_syntax() -> Failure {
    Failure::syntax(Status::Syntax.code(), "invalid syntax")
}

fn is_format(c: char) -> bool {
    matches!(c as u32,
        0x00AD
        | 0x0600..=0x0605
        | 0x061C
        | 0x06DD
        | 0x070F
        | 0x180E
        | 0x200B..=0x200F
        | 0x202A..=0x202E
        | 0x2060..=0x2064
        | 0x2066..=0x206F
        | 0xFEFF
        | 0xFFF9..=0xFFFB
        | 0x110BD
        | 0x1D173..=0x1D17A
        | 0xE0001
        | 0xE0020..=0xE007F)
}

fn is_private_or_noncharacter(c: char) -> bool {
    let r = c as u32;
    matches!(r, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD | 0xFDD0..=0xFDEF)
        || r & 0xFFFE == 0xFFFE
}

/// Whether `c` can appear unescaped in a quoted literal.
pub fn is_print(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control() || c.is_whitespace() || is_format(c) || is_private_or_noncharacter(c))
}

fn push_escaped(out: &mut String, c: char, quote: char, ascii_only: bool) {
    if c == quote || c == '\\' {
        out.push('\\');
        out.push(c);
        return;
    }
    let printable = if ascii_only { c.is_ascii() && is_print(c) } else { is_print(c) };
    if printable {
        out.push(c);
        return;
    }
    match c {
        '\x07' => out.push_str("\\a"),
        '\x08' => out.push_str("\\b"),
        '\x0C' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\x0B' => out.push_str("\\v"),
        c if c < ' ' || c == '\x7F' => out.push_str(&format!("\\x{:02x}", c as u32)),
        c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push_str(&format!("\\U{:08x}", c as u32)),
    }
}

fn quote_with(s: &str, quote: char, ascii_only: bool) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        push_escaped(&mut out, c, quote, ascii_only);
    }
    out.push(quote);
    out
}

/// Values past U+10FFFF and surrogates quote as U+FFFD.
fn rune(r: u32) -> char {
    char::from_u32(r).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Double-quoted literal; non-printable characters are escaped.
pub fn quote(s: &str) -> String {
    quote_with(s, '"', false)
}

/// Double-quoted literal using only ASCII.
pub fn quote_to_ascii(s: &str) -> String {
    quote_with(s, '"', true)
}

pub fn quote_rune(r: u32) -> String {
    quote_with(rune(r).encode_utf8(&mut [0; 4]), '\'', false)
}

pub fn quote_rune_to_ascii(r: u32) -> String {
    quote_with(rune(r).encode_utf8(&mut [0; 4]), '\'', true)
}

/// Whether `s` can be written as a back-quoted literal without change.
pub fn can_backquote(s: &str) -> bool {
    s.chars()
        .all(|c| !(c == '`' || c == '\x7F' || c == '\u{FEFF}' || (c < ' ' && c != '\t')))
}

/// One decoded element of a quoted literal.
enum Unit {
    Rune(char),
    Byte(u8),
}

fn hex_value(digits: &str) -> Option<u32> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Decode one character or escape from the front of `s`, returning it and
/// the remaining input.
fn unquote_char(s: &str, quote: char) -> FatResult<(Unit, &str)> {
    let mut chars = s.chars();
    let c = chars.next().ok_or_else(invalid_syntax)?;
    if c == quote {
        return Err(invalid_syntax());
    }
    if c != '\\' {
        return Ok((Unit::Rune(c), chars.as_str()));
    }
    let escape = chars.next().ok_or_else(invalid_syntax)?;
    let rest = chars.as_str();
    let decoded = match escape {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        '\\' => '\\',
        '\'' | '"' if escape == quote => escape,
        'x' | 'u' | 'U' => {
            let width = match escape {
                'x' => 2,
                'u' => 4,
                _ => 8,
            };
            let digits = rest.get(..width).ok_or_else(invalid_syntax)?;
            let value = hex_value(digits).ok_or_else(invalid_syntax)?;
            let rest = &rest[width..];
            if escape == 'x' {
                return Ok((Unit::Byte(value as u8), rest));
            }
            let c = char::from_u32(value).ok_or_else(invalid_syntax)?;
            return Ok((Unit::Rune(c), rest));
        }
        '0'..='7' => {
            let digits = rest.get(..2).ok_or_else(invalid_syntax)?;
            let mut value = escape as u32 - '0' as u32;
            for d in digits.bytes() {
                if !(b'0'..=b'7').contains(&d) {
                    return Err(invalid_syntax());
                }
                value = value << 3 | u32::from(d - b'0');
            }
            let byte = u8::try_from(value).map_err(|_| invalid_syntax())?;
            return Ok((Unit::Byte(byte), &rest[2..]));
        }
        _ => return Err(invalid_syntax()),
    };
    Ok((Unit::Rune(decoded), rest))
}

/// Parse the quoted literal at the front of `s`. Returns the decoded bytes
/// and the length of the literal.
fn parse_prefix(s: &str) -> FatResult<(Vec<u8>, usize)> {
    let quote = s.chars().next().ok_or_else(invalid_syntax)?;
    if !matches!(quote, '`' | '"' | '\'') {
        return Err(invalid_syntax());
    }
    let body = &s[1..];
    match quote {
        '`' => {
            let end = body.find('`').ok_or_else(invalid_syntax)?;
            let value = body[..end].bytes().filter(|&b| b != b'\r').collect();
            Ok((value, end + 2))
        }
        _ => {
            let mut out = Vec::new();
            let mut rest = body;
            while !rest.is_empty() && !rest.starts_with(quote) {
                if rest.starts_with('\n') {
                    return Err(invalid_syntax());
                }
                let (unit, tail) = unquote_char(rest, quote)?;
                match unit {
                    Unit::Rune(c) => out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
                    Unit::Byte(b) => out.push(b),
                }
                rest = tail;
                if quote == '\'' {
                    break;
                }
            }
            if !rest.starts_with(quote) {
                return Err(invalid_syntax());
            }
            if quote == '\'' && out.is_empty() {
                return Err(invalid_syntax());
            }
            Ok((out, s.len() - rest.len() + 1))
        }
    }
}

/// Decode a complete quoted literal. Bytes produced by `\x` or octal
/// escapes that do not form UTF-8 are replaced with U+FFFD.
pub fn unquote(s: &str) -> FatResult<String> {
    let (value, used) = parse_prefix(s)?;
    if used != s.len() {
        return Err(invalid_syntax());
    }
    Ok(String::from_utf8_lossy(&value).into_owned())
}

/// The quoted literal at the front of `s`, still quoted.
pub fn quoted_prefix(s: &str) -> FatResult<String> {
    let (_, used) = parse_prefix(s)?;
    Ok(s[..used].to_string())
}
