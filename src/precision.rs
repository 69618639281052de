//! Token precision analyser: parses one numeric token and records the
//! printed precision it carries (decimal places for fixed notation, an
//! effective-decimal-place equivalent for scientific/Fortran-`d` notation).

use thiserror::Error;

/// Errors from parsing a single numeric token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The token had no parseable numeric prefix.
    #[error("token {0:?} has no parseable numeric value")]
    NotNumeric(String),
}

/// Precision analysis of one numeric token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionInfo {
    /// The parsed numeric value.
    pub value: f64,
    /// For fixed notation: digits printed after the decimal point.
    pub decimal_places: i32,
    /// Significant figures in the mantissa (or the whole token for fixed
    /// notation).
    pub significant_figures: i32,
    /// True when the token used an exponent marker (`e`, `E`, `d`, `D`).
    pub is_scientific: bool,
    /// The parsed exponent, when `is_scientific`.
    pub exponent: i32,
    /// True when the sig-fig count (6 or 7) suggests the source value was
    /// only ever single-precision.
    pub has_single_precision_warning: bool,
}

impl PrecisionInfo {
    /// Decimal places this token's printed precision is equivalent to,
    /// unifying fixed and scientific notation under one currency.
    ///
    /// Fixed notation: the printed decimal places directly. Scientific:
    /// `significant_figures - 1 - exponent`, clamped to `[0, 10]`.
    pub fn effective_decimal_places(&self) -> i32 {
        if !self.is_scientific {
            return self.decimal_places;
        }
        let effective = self.significant_figures - 1 - self.exponent;
        effective.clamp(0, 10)
    }
}

/// Count significant figures in a numeric string: strip sign/whitespace,
/// ignore leading zeros, but count zeros once a non-zero digit has been
/// seen. `"0"` and `"0.0"` (and anything that reduces to just zero digits)
/// count as one significant figure.
pub fn count_significant_figures(token: &str) -> i32 {
    let cleaned: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned.strip_prefix('-').unwrap_or(&cleaned);

    if cleaned.is_empty() || cleaned == "0" || cleaned == "0.0" {
        return 1;
    }

    let mut sig_figs = 0;
    let mut started_counting = false;
    for c in cleaned.chars() {
        if c == '.' {
            continue;
        }
        if let Some(digit) = c.to_digit(10) {
            if digit != 0 {
                started_counting = true;
                sig_figs += 1;
            } else if started_counting {
                sig_figs += 1;
            }
        }
    }

    if sig_figs > 0 {
        sig_figs
    } else {
        1
    }
}

/// Parse one numeric token, extracting its value and printed precision.
///
/// Accepts fixed notation (`sign? digits? . digits?`) and scientific /
/// Fortran double-precision notation (`mantissa` followed by `e`, `E`, `d`,
/// or `D`, then a signed integer exponent).
pub fn analyze(token: &str) -> Result<PrecisionInfo, Error> {
    let lower = token.to_ascii_lowercase();
    let exponent_pos = lower.find('e').or_else(|| lower.find('d'));

    let mut info = if let Some(pos) = exponent_pos {
        let mantissa = &token[..pos];
        let exp_str = &token[pos + 1..];
        let exponent: i32 = exp_str.parse().unwrap_or(0);
        let significant_figures = count_significant_figures(mantissa);
        PrecisionInfo {
            value: 0.0,
            decimal_places: 0,
            significant_figures,
            is_scientific: true,
            exponent,
            has_single_precision_warning: false,
        }
    } else {
        let decimal_places = token
            .find('.')
            .map(|dot| (token.len() - dot - 1) as i32)
            .unwrap_or(0);
        let significant_figures = count_significant_figures(token);
        PrecisionInfo {
            value: 0.0,
            decimal_places,
            significant_figures,
            is_scientific: false,
            exponent: 0,
            has_single_precision_warning: false,
        }
    };

    // Fortran 'd'/'D' exponent markers aren't valid for Rust's f64::from_str,
    // so normalize to 'e' before parsing the value.
    let normalized = if exponent_pos.is_some() {
        token.replace(['d', 'D'], "e")
    } else {
        token.to_owned()
    };
    info.value = normalized
        .parse::<f64>()
        .map_err(|_| Error::NotNumeric(token.to_owned()))?;

    info.has_single_precision_warning = (6..=7).contains(&info.significant_figures);

    Ok(info)
}
