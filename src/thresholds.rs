//! User-supplied and fixed thresholds that parameterize the difference classifier.

use schemars_derive::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Single-precision epsilon, used as the "effectively zero" cutoff for raw
/// differences (`2^-23 ~= 1.19e-7`).
pub const SINGLE_PRECISION_EPSILON: f64 = 1.192_092_895_507_812_5e-7;

/// Upper edge of the operationally significant TL band, in dB.
///
/// See <https://doi.org/10.23919/OCEANS.2009.5422312>.
pub const MARGINAL: f64 = 110.0;

/// Number of decimal places associated with a single-precision value.
pub const NDP_SINGLE_PRECISION: i32 = 7;

/// Default cap on the number of rows written into the difference table before
/// a single truncation notice is emitted and further rows are suppressed.
pub const DEFAULT_MAX_TABLE_ROWS: usize = 32;

/// User thresholds plus the fixed domain constants the classifier cascade
/// is built on.
///
/// `significant` is the only field that can change after construction; its
/// mutator invalidates the cached `log10(significant)` so later reads are
/// never stale.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Thresholds {
    /// Minimum absolute difference classed as significant. `0.0` enables
    /// maximum-sensitivity mode: every non-trivial, non-ignorable difference
    /// counts as significant.
    significant: f64,
    /// Absolute difference above which a comparison fails fatally, provided
    /// both values are below `ignore`.
    pub critical: f64,
    /// Minimum difference that gets a row in the difference table.
    pub print: f64,
    /// When set, significance (levels 3 and 6) is tested as a fraction of
    /// the reference value rather than as an absolute difference.
    pub significant_is_percent: bool,
    /// Fractional significance threshold used when `significant_is_percent`
    /// is set, e.g. `0.01` for 1%.
    pub significant_percent: f64,
    /// Cap on the number of rows emitted into the difference table.
    #[serde(default = "default_max_table_rows")]
    pub max_table_rows: usize,

    #[serde(skip)]
    #[schemars(skip)]
    log10_significant: Cell<Option<f64>>,
}

fn default_max_table_rows() -> usize {
    DEFAULT_MAX_TABLE_ROWS
}

impl Thresholds {
    /// "effectively zero" cutoff for raw differences.
    pub const ZERO: f64 = SINGLE_PRECISION_EPSILON;

    /// Upper bound of the numerically meaningful TL range; values above this
    /// are considered meaningless and never trigger classification action.
    pub fn ignore() -> f64 {
        -20.0 * SINGLE_PRECISION_EPSILON.log10()
    }

    /// Build thresholds in absolute mode.
    pub fn new(significant: f64, critical: f64, print: f64) -> Self {
        Self {
            significant,
            critical,
            print,
            significant_is_percent: false,
            significant_percent: 0.0,
            max_table_rows: DEFAULT_MAX_TABLE_ROWS,
            log10_significant: Cell::new(None),
        }
    }

    /// Switch to percent mode with the given fractional threshold.
    pub fn with_percent_mode(mut self, significant_percent: f64) -> Self {
        self.significant_is_percent = true;
        self.significant_percent = significant_percent;
        self
    }

    /// Current significance threshold.
    pub fn significant(&self) -> f64 {
        self.significant
    }

    /// Update the significance threshold, invalidating the log10 cache only
    /// if the value actually changed.
    pub fn set_significant(&mut self, new_significant: f64) {
        if self.significant != new_significant {
            self.significant = new_significant;
            self.log10_significant.set(None);
        }
    }

    /// `log10(significant)`, cached after first use. Returns `0.0` for a
    /// non-positive threshold (the zero-threshold / maximum-sensitivity
    /// case), matching the source's defensive edge-case handling.
    pub fn log10_significant(&self) -> f64 {
        if self.significant <= 0.0 {
            return 0.0;
        }
        if let Some(cached) = self.log10_significant.get() {
            return cached;
        }
        let value = self.significant.log10();
        self.log10_significant.set(Some(value));
        value
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(0.05, 10.0, 1.0)
    }
}
