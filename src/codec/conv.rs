//! Numeric and boolean text conversion.
//!
//! Parse failures are classified as `Syntax` (malformed text) or `Range`
//! (well formed but not representable); the error code is the status value.
//! Invalid bases and bit sizes are `Other`.

use crate::contract::misuse;
use crate::status::{FatResult, Failure, Status};

fn failure(status: Status, func: &str, input: &str, reason: &str) -> Failure {
    Failure::new(
        status,
        status.code(),
        format!("strconv.{}: parsing {:?}: {}", func, input, reason),
    )
}

fn syntax(func: &str, input: &str) -> Failure {
    failure(Status::Syntax, func, input, "invalid syntax")
}

fn range(func: &str, input: &str) -> Failure {
    failure(Status::Range, func, input, "value out of range")
}

pub fn parse_bool(s: &str) -> FatResult<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(syntax("ParseBool", s)),
    }
}

pub fn format_bool(b: bool) -> String {
    b.to_string()
}

fn check_bit_size(func: &str, input: &str, bit_size: i32) -> FatResult<u32> {
    match bit_size {
        0 => Ok(64),
        1..=64 => Ok(bit_size as u32),
        _ => Err(failure(
            Status::Other,
            func,
            input,
            &format!("invalid bit size {}", bit_size),
        )),
    }
}

/// Parse an unsigned integer. `base` 0 infers the base from a `0b`, `0o`,
/// `0x` or `0` prefix and permits `_` separators.
pub fn parse_uint(s: &str, base: i32, bit_size: i32) -> FatResult<u64> {
    parse_unsigned("ParseUint", s, s, base, bit_size)
}

fn parse_unsigned(func: &str, input: &str, s: &str, base: i32, bit_size: i32) -> FatResult<u64> {
    if s.is_empty() {
        return Err(syntax(func, input));
    }
    let (base, digits, base_prefixed) = match base {
        0 => {
            let bytes = s.as_bytes();
            if bytes[0] == b'0' {
                match bytes.get(1).map(u8::to_ascii_lowercase) {
                    Some(b'b') if s.len() >= 3 => (2, &s[2..], true),
                    Some(b'o') if s.len() >= 3 => (8, &s[2..], true),
                    Some(b'x') if s.len() >= 3 => (16, &s[2..], true),
                    _ => (8, &s[1..], true),
                }
            } else {
                (10, s, true)
            }
        }
        2..=36 => (base as u32, s, false),
        _ => {
            return Err(failure(
                Status::Other,
                func,
                input,
                &format!("invalid base {}", base),
            ))
        }
    };
    let bits = check_bit_size(func, input, bit_size)?;
    let max = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };

    if base_prefixed && !underscores_ok(s) {
        return Err(syntax(func, input));
    }

    let mut n: u64 = 0;
    for c in digits.chars() {
        if c == '_' && base_prefixed {
            continue;
        }
        let d = match c.to_digit(36) {
            Some(d) if d < base => d as u64,
            _ => return Err(syntax(func, input)),
        };
        n = match n.checked_mul(base as u64).and_then(|v| v.checked_add(d)) {
            Some(v) => v,
            None => return Err(range(func, input)),
        };
    }
    if n > max {
        return Err(range(func, input));
    }
    Ok(n)
}

/// Underscores may only sit between digits of a base-prefixed literal.
fn underscores_ok(s: &str) -> bool {
    if !s.contains('_') {
        return true;
    }
    let bytes = s.as_bytes();
    if bytes.first() == Some(&b'_') || bytes.last() == Some(&b'_') {
        return false;
    }
    !s.contains("__")
}

/// Parse a signed integer with an optional `+`/`-` sign.
pub fn parse_int(s: &str, base: i32, bit_size: i32) -> FatResult<i64> {
    const FUNC: &str = "ParseInt";
    if s.is_empty() {
        return Err(syntax(FUNC, s));
    }
    let (negative, body) = match s.as_bytes()[0] {
        b'+' => (false, &s[1..]),
        b'-' => (true, &s[1..]),
        _ => (false, s),
    };
    let magnitude = parse_unsigned(FUNC, s, body, base, bit_size)
        .map_err(|f| if f.status == Status::Range { range(FUNC, s) } else { f })?;
    let bits = check_bit_size(FUNC, s, bit_size)?;
    let cutoff = 1u64 << (bits - 1);
    if !negative && magnitude >= cutoff {
        return Err(range(FUNC, s));
    }
    if negative && magnitude > cutoff {
        return Err(range(FUNC, s));
    }
    Ok(if negative {
        (magnitude as i64).wrapping_neg()
    } else {
        magnitude as i64
    })
}

/// Base 10, 64-bit `parse_int`, reported as `Atoi`.
pub fn atoi(s: &str) -> FatResult<i64> {
    parse_int(s, 10, 64).map_err(|f| match f.status {
        Status::Range => range("Atoi", s),
        Status::Syntax => syntax("Atoi", s),
        _ => f,
    })
}

/// Parse a decimal or special (`inf`, `nan`) float at 32 or 64 bits.
pub fn parse_float(s: &str, bit_size: i32) -> FatResult<f64> {
    const FUNC: &str = "ParseFloat";
    if bit_size != 32 && bit_size != 64 {
        return Err(failure(
            Status::Other,
            FUNC,
            s,
            &format!("invalid bit size {}", bit_size),
        ));
    }
    let value: f64 = s.parse().map_err(|_| syntax(FUNC, s))?;
    let explicit_inf = s.to_ascii_lowercase().contains("inf");
    if value.is_infinite() && !explicit_inf {
        return Err(range(FUNC, s));
    }
    if bit_size == 32 {
        let narrow = value as f32;
        if narrow.is_infinite() && !value.is_infinite() {
            return Err(range(FUNC, s));
        }
        return Ok(narrow as f64);
    }
    Ok(value)
}

/// Format in `base` (2 to 36), lowercase digits.
pub fn format_uint(mut n: u64, base: i32) -> String {
    if !(2..=36).contains(&base) {
        misuse("conv format", format!("illegal base {}", base));
    }
    if n == 0 {
        return "0".to_string();
    }
    let base = base as u64;
    let mut digits = Vec::new();
    while n > 0 {
        let d = (n % base) as u32;
        digits.push(std::char::from_digit(d, 36).unwrap_or('?'));
        n /= base;
    }
    digits.iter().rev().collect()
}

pub fn format_int(i: i64, base: i32) -> String {
    if i < 0 {
        format!("-{}", format_uint(i.unsigned_abs(), base))
    } else {
        format_uint(i as u64, base)
    }
}

pub fn itoa(i: i64) -> String {
    i.to_string()
}

/// Decimal digits with trailing zeros removed; the value is `0.digits * 10^dp`.
struct Decimal {
    digits: Vec<u8>,
    dp: i32,
}

impl Decimal {
    /// Read back Rust's scientific rendering (`d.ddde-x`) of a non-negative value.
    fn from_scientific(sci: &str) -> Decimal {
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci, "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let mut digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
        while digits.last() == Some(&b'0') {
            digits.pop();
        }
        let dp = if digits.is_empty() { 0 } else { exp + 1 };
        Decimal { digits, dp }
    }

    fn nd(&self) -> i32 {
        self.digits.len() as i32
    }

    fn digit(&self, i: i32) -> u8 {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.digits.get(i))
            .copied()
            .unwrap_or(b'0')
    }
}

/// Shortest digits that round-trip at `bit_size`, or `sig` significant digits.
fn decimal(abs: f64, sig: Option<usize>, bit_size: i32) -> Decimal {
    let sci = match (sig, bit_size) {
        (None, 32) => format!("{:e}", abs as f32),
        (None, _) => format!("{:e}", abs),
        (Some(n), 32) => format!("{:.*e}", n.saturating_sub(1), abs as f32),
        (Some(n), _) => format!("{:.*e}", n.saturating_sub(1), abs),
    };
    Decimal::from_scientific(&sci)
}

fn fmt_e(out: &mut String, d: &Decimal, prec: i32, verb: char) {
    out.push(char::from(d.digit(0)));
    if prec > 0 {
        out.push('.');
        for i in 1..=prec {
            out.push(char::from(d.digit(i)));
        }
    }
    out.push(verb);
    let exp = if d.digits.is_empty() { 0 } else { d.dp - 1 };
    out.push(if exp < 0 { '-' } else { '+' });
    out.push_str(&format!("{:02}", exp.unsigned_abs()));
}

fn fmt_f(out: &mut String, d: &Decimal, prec: i32) {
    if d.dp > 0 {
        for i in 0..d.dp {
            out.push(char::from(d.digit(i)));
        }
    } else {
        out.push('0');
    }
    if prec > 0 {
        out.push('.');
        for i in 1..=prec {
            out.push(char::from(d.digit(d.dp + i - 1)));
        }
    }
}

/// Mantissa and binary exponent, `-ddddp±ddd`.
fn fmt_b(f: f64, bit_size: i32) -> String {
    let (negative, mut mant, biased, mant_bits, bias) = if bit_size == 32 {
        let bits = (f as f32).to_bits();
        (bits >> 31 != 0, u64::from(bits & 0x7F_FFFF), ((bits >> 23) & 0xFF) as i32, 23, 127)
    } else {
        let bits = f.to_bits();
        (bits >> 63 != 0, bits & ((1 << 52) - 1), ((bits >> 52) & 0x7FF) as i32, 52, 1023)
    };
    // Subnormals keep the minimum exponent and have no implicit leading bit.
    let biased = if biased == 0 {
        1
    } else {
        mant |= 1u64 << mant_bits;
        biased
    };
    let exp = biased - bias - mant_bits;
    format!("{}{}p{}{}", if negative { "-" } else { "" }, mant, if exp >= 0 { "+" } else { "" }, exp)
}

/// Format `f` with verb `fmt` (`b`, `e`, `E`, `f`, `g`, `G`). A negative
/// `prec` picks the fewest digits that read back to the same value at
/// `bit_size`. Any other verb renders as `%` followed by the verb.
pub fn format_float(f: f64, fmt: u8, prec: i32, bit_size: i32) -> String {
    if bit_size != 32 && bit_size != 64 {
        misuse("conv format_float", format!("illegal bit size {}", bit_size));
    }
    let f = if bit_size == 32 { f64::from(f as f32) } else { f };
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if fmt == b'b' {
        return fmt_b(f, bit_size);
    }

    let mut out = String::new();
    if f.is_sign_negative() {
        out.push('-');
    }
    let abs = f.abs();
    let shortest = prec < 0;
    match fmt {
        b'e' | b'E' => {
            let sig = (!shortest).then(|| prec as usize + 1);
            let d = decimal(abs, sig, bit_size);
            let prec = if shortest { (d.nd() - 1).max(0) } else { prec };
            fmt_e(&mut out, &d, prec, char::from(fmt));
        }
        b'f' if shortest => {
            let d = decimal(abs, None, bit_size);
            fmt_f(&mut out, &d, (d.nd() - d.dp).max(0));
        }
        b'f' if bit_size == 32 => out.push_str(&format!("{:.*}", prec as usize, abs as f32)),
        b'f' => out.push_str(&format!("{:.*}", prec as usize, abs)),
        b'g' | b'G' => {
            let sig = (!shortest).then(|| prec.max(1) as usize);
            let d = decimal(abs, sig, bit_size);
            let mut prec = if shortest { d.nd() } else { prec.max(1) };
            let mut eprec = prec;
            if eprec > d.nd() && d.nd() >= d.dp {
                eprec = d.nd();
            }
            if shortest {
                eprec = 6;
            }
            let exp = d.dp - 1;
            if exp < -4 || exp >= eprec {
                prec = prec.min(d.nd());
                let verb = if fmt == b'g' { 'e' } else { 'E' };
                fmt_e(&mut out, &d, prec - 1, verb);
            } else {
                if prec > d.dp {
                    prec = d.nd();
                }
                fmt_f(&mut out, &d, (prec - d.dp).max(0));
            }
        }
        other => return format!("%{}", char::from(other)),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("True").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert_eq!(parse_bool("yes").unwrap_err().status, Status::Syntax);
    }

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int("-42", 10, 64).unwrap(), -42);
        assert_eq!(parse_int("0x1F", 0, 64).unwrap(), 31);
        assert_eq!(parse_int("0b101", 0, 8).unwrap(), 5);
        assert_eq!(parse_int("017", 0, 64).unwrap(), 15);
        assert_eq!(parse_int("1_000", 0, 64).unwrap(), 1000);
        assert_eq!(parse_int("zz", 36, 64).unwrap(), 1295);
        assert_eq!(parse_int("0", 0, 64).unwrap(), 0);
    }

    #[test]
    fn test_parse_int_errors() {
        let err = parse_int("12a", 10, 64).unwrap_err();
        assert_eq!(err.status, Status::Syntax);
        assert_eq!(err.code, Status::Syntax.code());
        assert_eq!(err.message, "strconv.ParseInt: parsing \"12a\": invalid syntax");

        assert_eq!(parse_int("128", 10, 8).unwrap_err().status, Status::Range);
        assert_eq!(parse_int("-128", 10, 8).unwrap(), -128);
        assert_eq!(parse_int("-129", 10, 8).unwrap_err().status, Status::Range);
        assert_eq!(parse_int("1_000", 10, 64).unwrap_err().status, Status::Syntax);
        assert_eq!(parse_int("1", 1, 64).unwrap_err().status, Status::Other);
        assert_eq!(parse_int("1", 10, 65).unwrap_err().status, Status::Other);
    }

    #[test]
    fn test_parse_int_extremes() {
        assert_eq!(parse_int("-9223372036854775808", 10, 64).unwrap(), i64::MIN);
        assert_eq!(
            parse_int("9223372036854775808", 10, 64).unwrap_err().status,
            Status::Range
        );
    }

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint("18446744073709551615", 10, 64).unwrap(), u64::MAX);
        assert_eq!(
            parse_uint("18446744073709551616", 10, 64).unwrap_err().status,
            Status::Range
        );
        assert_eq!(parse_uint("-1", 10, 64).unwrap_err().status, Status::Syntax);
    }

    #[test]
    fn test_atoi() {
        assert_eq!(atoi("123").unwrap(), 123);
        assert!(atoi("").unwrap_err().message.starts_with("strconv.Atoi"));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.25", 64).unwrap(), 3.25);
        assert!(parse_float("-Inf", 64).unwrap().is_infinite());
        assert!(parse_float("NaN", 64).unwrap().is_nan());
        assert_eq!(parse_float("1e400", 64).unwrap_err().status, Status::Range);
        assert_eq!(parse_float("1e39", 32).unwrap_err().status, Status::Range);
        assert_eq!(parse_float("x1", 64).unwrap_err().status, Status::Syntax);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_int(-255, 16), "-ff");
        assert_eq!(format_uint(5, 2), "101");
        assert_eq!(format_int(i64::MIN, 10), "-9223372036854775808");
        assert_eq!(format_bool(true), "true");
        assert_eq!(itoa(-7), "-7");
    }

    #[test]
    fn test_format_float_verbs() {
        assert_eq!(format_float(3.14159, b'f', 2, 64), "3.14");
        assert_eq!(format_float(1.5, b'f', -1, 64), "1.5");
        assert_eq!(format_float(1e21, b'f', -1, 64), "1000000000000000000000");
        assert_eq!(format_float(1.5, b'e', -1, 64), "1.5e+00");
        assert_eq!(format_float(1234.5678, b'e', 3, 64), "1.235e+03");
        assert_eq!(format_float(1234.5678, b'E', 3, 64), "1.235E+03");
        assert_eq!(format_float(0.0, b'e', -1, 64), "0e+00");
        assert_eq!(format_float(1e-300, b'e', -1, 64), "1e-300");
        assert_eq!(format_float(1.0, b'b', -1, 64), "4503599627370496p-52");
        assert_eq!(format_float(1.0, b'x', -1, 64), "%x");
    }

    #[test]
    fn test_format_float_general() {
        assert_eq!(format_float(100000.0, b'g', -1, 64), "100000");
        assert_eq!(format_float(1e6, b'g', -1, 64), "1e+06");
        assert_eq!(format_float(0.0001, b'g', -1, 64), "0.0001");
        assert_eq!(format_float(0.00001, b'g', -1, 64), "1e-05");
        assert_eq!(format_float(1e21, b'G', -1, 64), "1E+21");
        assert_eq!(format_float(123456789.0, b'g', 4, 64), "1.235e+08");
        assert_eq!(format_float(100.0, b'g', 3, 64), "100");
        assert_eq!(format_float(1.0, b'g', 5, 64), "1");
        assert_eq!(format_float(-0.0, b'g', -1, 64), "-0");
    }

    #[test]
    fn test_format_float_specials_and_width() {
        assert_eq!(format_float(f64::NAN, b'g', -1, 64), "NaN");
        assert_eq!(format_float(f64::INFINITY, b'f', 2, 64), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY, b'e', -1, 32), "-Inf");
        assert_eq!(format_float(0.1, b'g', -1, 32), "0.1");
        assert_eq!(format_float(f64::from(0.1f32), b'g', -1, 64), "0.10000000149011612");
        assert_eq!(format_float(1.0, b'b', -1, 32), "8388608p-23");
    }

    #[test]
    #[should_panic(expected = "illegal bit size")]
    fn test_format_float_bad_bit_size() {
        format_float(1.0, b'g', -1, 16);
    }

    #[test]
    #[should_panic(expected = "illegal base")]
    fn test_format_bad_base() {
        format_int(1, 37);
    }
}
