//! Line parser: turns one line of text into an ordered sequence of
//! `(value, decimal_places)` pairs, expanding `(real, imag)` complex tokens
//! into two consecutive entries.

use crate::precision;
use thiserror::Error;

/// Errors from parsing one line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A complex token was opened with `(` but never closed, or its comma
    /// separator was missing.
    #[error("line {line_number}: unclosed or malformed complex number")]
    MalformedComplex {
        /// 1-based line number, for diagnostics.
        line_number: usize,
    },
    /// A token could not be parsed as a number.
    #[error("line {line_number}: {source}")]
    Token {
        /// 1-based line number, for diagnostics.
        line_number: usize,
        /// The underlying token-parse failure.
        source: precision::Error,
    },
}

/// One parsed line: values in source order, each with its own printed
/// decimal-place count. `values.len() == decimal_places.len()` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineData {
    /// Parsed values, in source order.
    pub values: Vec<f64>,
    /// Decimal places printed for each value, in source order.
    pub decimal_places: Vec<i32>,
}

impl LineData {
    fn push(&mut self, value: f64, decimal_places: i32) {
        debug_assert!(decimal_places >= 0);
        self.values.push(value);
        self.decimal_places.push(decimal_places.max(0));
    }

    /// Number of values on the line.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the line produced no values (e.g. a blank line).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse one line, in source order, handling real tokens and `(real, imag)`
/// complex tokens. On a malformed complex number, returns whatever was
/// parsed so far as the error's accompanying partial state is not retained —
/// callers that want a best-effort partial line should catch the error and
/// fall back to an empty/partial `LineData` per their own policy.
pub fn parse_line(line: &str, line_number: usize) -> Result<LineData, Error> {
    let mut data = LineData::default();
    let mut pos = 0usize;

    while pos < line.len() {
        let ch = line[pos..].chars().next().expect("pos < line.len()");
        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }
        if ch == '(' {
            let rest = &line[pos + 1..];
            let (real, imag, dp_real, dp_imag, consumed) =
                parse_complex(rest, line_number)?;
            data.push(real, dp_real);
            data.push(imag, dp_imag);
            pos += 1 + consumed;
            continue;
        }

        let token_start = pos;
        let token_end = line[token_start..]
            .find(char::is_whitespace)
            .map(|rel| token_start + rel)
            .unwrap_or(line.len());
        let token = &line[token_start..token_end];
        let info = precision::analyze(token).map_err(|source| Error::Token {
            line_number,
            source,
        })?;
        data.push(info.value, info.effective_decimal_places());
        pos = token_end;
    }

    Ok(data)
}

/// Parse the contents of a complex token after the opening `(` has been
/// consumed, up to and including its closing `)`. Returns
/// `(real, imag, dp_real, dp_imag, chars_consumed)` where `chars_consumed`
/// is measured from just after the `(`.
fn parse_complex(rest: &str, line_number: usize) -> Result<(f64, f64, i32, i32, usize), Error> {
    let comma_pos = rest.find(',');
    let paren_pos = rest.find(')');

    let (comma_pos, paren_pos) = match (comma_pos, paren_pos) {
        (Some(c), Some(p)) if c < p => (c, p),
        _ => return Err(Error::MalformedComplex { line_number }),
    };

    let real_str = rest[..comma_pos].trim();
    let imag_str = rest[comma_pos + 1..paren_pos].trim();

    let real_info = precision::analyze(real_str).map_err(|source| Error::Token {
        line_number,
        source,
    })?;
    let imag_info = precision::analyze(imag_str).map_err(|source| Error::Token {
        line_number,
        source,
    })?;

    Ok((
        real_info.value,
        imag_info.value,
        real_info.effective_decimal_places(),
        imag_info.effective_decimal_places(),
        paren_pos + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_reals() {
        let data = parse_line("1.0 2.0", 1).unwrap();
        assert_eq!(data.values, vec![1.0, 2.0]);
        assert_eq!(data.decimal_places, vec![1, 1]);
    }

    #[test]
    fn parses_tab_separated_values() {
        let data = parse_line("1.0\t2.5\t3", 1).unwrap();
        assert_eq!(data.values, vec![1.0, 2.5, 3.0]);
        assert_eq!(data.decimal_places, vec![1, 1, 0]);
    }

    #[test]
    fn empty_line_yields_no_values() {
        let data = parse_line("", 1).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn parses_complex_token() {
        let data = parse_line("(1.5, 2.0)", 1).unwrap();
        assert_eq!(data.values, vec![1.5, 2.0]);
        assert_eq!(data.decimal_places, vec![1, 1]);
    }

    #[test]
    fn parses_complex_with_irregular_whitespace() {
        let data = parse_line("( 1.50 ,2.718 )", 1).unwrap();
        assert_eq!(data.values, vec![1.50, 2.718]);
        assert_eq!(data.decimal_places, vec![2, 3]);
    }

    #[test]
    fn parses_mixed_real_and_complex_tokens() {
        let data = parse_line("10.0 (1.5, 2.0) 5", 1).unwrap();
        assert_eq!(data.values, vec![10.0, 1.5, 2.0, 5.0]);
    }

    #[test]
    fn unclosed_complex_is_an_error() {
        let err = parse_line("(1.5, 2.0", 1).unwrap_err();
        assert_eq!(err, Error::MalformedComplex { line_number: 1 });
    }

    #[test]
    fn missing_comma_in_complex_is_an_error() {
        let err = parse_line("(1.5 2.0)", 1).unwrap_err();
        assert_eq!(err, Error::MalformedComplex { line_number: 1 });
    }

    #[test]
    fn unparseable_token_is_an_error() {
        assert!(parse_line("1.0 abc", 1).is_err());
    }

    #[test]
    fn scientific_tokens_roundtrip_value() {
        let data = parse_line("1.23e-5 4.5D2", 1).unwrap();
        assert!((data.values[0] - 1.23e-5).abs() < 1e-15);
        assert!((data.values[1] - 450.0).abs() < 1e-9);
    }
}
