//! Error-accumulation analysis: does the disagreement between two TL curves
//! grow with range, sit at a fixed offset, or look like noise? Grounded on
//! a linear-regression / autocorrelation / runs-test cascade.

/// Tunable thresholds for pattern classification.
#[derive(Debug, Clone, Copy)]
pub struct AccumulationThresholds {
    /// Minimum number of points before a pattern is attempted at all.
    pub min_points: usize,
    /// Minimum |slope| (dB per range unit) to call growth "systematic".
    pub slope_threshold: f64,
    /// Minimum R^2 for the regression to be considered a good fit.
    pub r_squared_threshold: f64,
    /// Minimum |lag-1 autocorrelation| to call the errors correlated.
    pub autocorr_threshold: f64,
}

impl Default for AccumulationThresholds {
    fn default() -> Self {
        Self {
            min_points: 10,
            slope_threshold: 0.001,
            r_squared_threshold: 0.5,
            autocorr_threshold: 0.5,
        }
    }
}

/// The classified shape of the accumulated error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorPattern {
    /// Error magnitude grows roughly linearly with range.
    SystematicGrowth,
    /// Error sits at a roughly constant non-zero offset.
    SystematicBias,
    /// Error looks like uncorrelated noise around zero.
    RandomNoise,
    /// A handful of isolated large errors amid otherwise small ones.
    TransientSpikes,
    /// Noise concentrated near TL nulls (deep interference minima).
    NullPointNoise,
    /// Too few points to classify.
    InsufficientData,
}

impl ErrorPattern {
    /// Stable name for reports, matching the original analyzer's labels.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorPattern::SystematicGrowth => "SYSTEMATIC_GROWTH",
            ErrorPattern::SystematicBias => "SYSTEMATIC_BIAS",
            ErrorPattern::RandomNoise => "RANDOM_NOISE",
            ErrorPattern::TransientSpikes => "TRANSIENT_SPIKES",
            ErrorPattern::NullPointNoise => "NULL_POINT_NOISE",
            ErrorPattern::InsufficientData => "INSUFFICIENT_DATA",
        }
    }
}

/// Ordinary-least-squares fit of error against range.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub std_error: f64,
    pub p_value: f64,
}

/// Accumulated (range, error) samples for one comparison, plus the tl values
/// needed to tell a genuine null-point dip from ordinary noise.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulationData {
    ranges: Vec<f64>,
    errors: Vec<f64>,
    tl_values_ref: Vec<f64>,
}

impl ErrorAccumulationData {
    /// Record one (range, signed error, reference TL) sample.
    pub fn add_point(&mut self, range: f64, error: f64, tl_ref: f64) {
        self.ranges.push(range);
        self.errors.push(error);
        self.tl_values_ref.push(tl_ref);
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Discard all recorded samples (used between comparison runs).
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.errors.clear();
        self.tl_values_ref.clear();
    }
}

/// Full classification result: the fitted regression, its derived stats, and
/// the resulting pattern with human-readable interpretation text.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccumulationMetrics {
    pub regression: LinearRegression,
    pub autocorrelation: f64,
    pub run_test_z: f64,
    pub pattern: ErrorPattern,
    pub interpretation: String,
    pub recommendation: String,
}

/// `erfc` via Abramowitz & Stegun 7.1.26, accurate to ~1.5e-7 - ample for a
/// p-value used only to gate a classification decision.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let tau = t
        * (-z * z
            - 1.26551223
            + t * (1.00002368
                + t * (0.37409196
                    + t * (0.09678418
                        + t * (-0.18628806
                            + t * (0.27886807
                                + t * (-1.13520398
                                    + t * (1.48851587
                                        + t * (-0.82215223 + t * 0.17087277))))))))
            .exp();
    if x >= 0.0 {
        tau
    } else {
        2.0 - tau
    }
}

/// Two-tailed p-value for the standard-normal z statistic of the
/// regression's slope. Early-exits to 0 for |z| > 6 where the series above
/// loses accuracy and the result would round to zero regardless.
fn z_to_p_value(z: f64) -> f64 {
    if z.abs() > 6.0 {
        return 0.0;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

/// Fit `errors ~ ranges` by ordinary least squares.
fn linear_regression(ranges: &[f64], errors: &[f64]) -> LinearRegression {
    let n = ranges.len() as f64;
    if ranges.len() < 2 {
        return LinearRegression::default();
    }

    let mean_x = ranges.iter().sum::<f64>() / n;
    let mean_y = errors.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in ranges.iter().zip(errors.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx < 1e-12 {
        return LinearRegression::default();
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy < 1e-12 { 0.0 } else { (sxy * sxy) / (sxx * syy) };

    let residual_ss = (syy - slope * sxy).max(0.0);
    let std_error = if n > 2.0 {
        ((residual_ss / (n - 2.0)) / sxx).sqrt()
    } else {
        0.0
    };

    let p_value = if std_error > 1e-12 {
        z_to_p_value(slope / std_error)
    } else if slope.abs() > 1e-12 {
        // Residuals collapse to floating-point noise: the fit is as close to
        // perfect as this data can express, so the slope is maximally
        // significant rather than untestable.
        0.0
    } else {
        1.0
    };

    LinearRegression {
        slope,
        intercept,
        r_squared,
        std_error,
        p_value,
    }
}

/// Lag-1 autocorrelation of the residual error sequence.
fn calculate_autocorrelation(errors: &[f64]) -> f64 {
    let n = errors.len();
    if n < 2 {
        return 0.0;
    }
    let mean = errors.iter().sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let d = errors[i] - mean;
        denominator += d * d;
        if i + 1 < n {
            numerator += d * (errors[i + 1] - mean);
        }
    }

    if denominator < 1e-12 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Count the number of runs (maximal same-signed stretches) of positive vs.
/// negative values, plus how many points fell on each side. Signs are taken
/// against zero, not the sample mean; a zero value is neither positive nor
/// negative, so it continues whatever run precedes it rather than breaking
/// or starting one.
fn count_runs(errors: &[f64]) -> (usize, usize, usize) {
    if errors.is_empty() {
        return (0, 0, 0);
    }

    let n_pos = errors.iter().filter(|e| **e > 0.0).count();
    let n_neg = errors.iter().filter(|e| **e < 0.0).count();

    let mut runs = 1usize;
    for window in errors.windows(2) {
        let prev_pos = window[0] > 0.0;
        let prev_neg = window[0] < 0.0;
        let curr_pos = window[1] > 0.0;
        let curr_neg = window[1] < 0.0;
        if (prev_pos && curr_neg) || (prev_neg && curr_pos) {
            runs += 1;
        }
    }
    (runs, n_pos, n_neg)
}

/// Wald-Wolfowitz run test: expected run count and its variance under the
/// null hypothesis of randomness.
fn expected_runs(n_pos: usize, n_neg: usize) -> (f64, f64) {
    let n1 = n_pos as f64;
    let n2 = n_neg as f64;
    let n = n1 + n2;
    if n < 2.0 {
        return (0.0, 0.0);
    }
    let expected = (2.0 * n1 * n2) / n + 1.0;
    let variance = (2.0 * n1 * n2 * (2.0 * n1 * n2 - n)) / (n * n * (n - 1.0));
    (expected, variance.max(0.0))
}

/// z-score of the observed run count against the expected distribution.
/// `|z| < 1.96` fails to reject randomness at the 5% level.
fn run_test_z_score(errors: &[f64]) -> f64 {
    if errors.len() < 2 {
        return 0.0;
    }
    let (observed_runs, n_pos, n_neg) = count_runs(errors);
    let (expected, variance) = expected_runs(n_pos, n_neg);
    if variance < 1e-12 {
        0.0
    } else {
        (observed_runs as f64 - expected) / variance.sqrt()
    }
}

/// Classify the accumulated error shape against the regression/autocorrelation
/// diagnostics already computed, in strict precedence order: systematic
/// growth first, then bias, then randomness, then the two "interesting
/// failure" shapes, with random noise as the catch-all.
fn classify_pattern(
    regression: &LinearRegression,
    autocorrelation: f64,
    run_z: f64,
    errors: &[f64],
    thresholds: &AccumulationThresholds,
) -> ErrorPattern {
    let is_random = run_z.abs() < 1.96;

    if regression.slope > thresholds.slope_threshold
        && regression.r_squared > thresholds.r_squared_threshold
        && regression.p_value < 0.05
    {
        return ErrorPattern::SystematicGrowth;
    }

    // A constant offset plus noise centers its own runs test around the mean
    // by construction, so randomness alone can't distinguish bias from noise
    // here; what marks it is that the mean sits far from zero.
    let mean_abs_error = errors.iter().map(|e| e.abs()).sum::<f64>() / errors.len() as f64;
    let mean_error = errors.iter().sum::<f64>() / errors.len() as f64;
    if mean_abs_error > 1e-9 && mean_error.abs() / mean_abs_error > 0.8 {
        return ErrorPattern::SystematicBias;
    }

    if is_random && autocorrelation.abs() < thresholds.autocorr_threshold {
        return ErrorPattern::RandomNoise;
    }

    let max_abs = errors.iter().fold(0.0_f64, |m, e| m.max(e.abs()));
    let spike_count = errors.iter().filter(|e| e.abs() > 3.0 * mean_abs_error.max(1e-9)).count();
    if max_abs > 5.0 * mean_abs_error.max(1e-9) && spike_count > 0 && spike_count < errors.len() / 4 {
        return ErrorPattern::TransientSpikes;
    }

    ErrorPattern::NullPointNoise
}

fn interpretation_for(pattern: ErrorPattern, regression: &LinearRegression) -> String {
    match pattern {
        ErrorPattern::SystematicGrowth => format!(
            "Error grows systematically with range (slope {:.4} dB/unit, R^2 {:.3}); \
             the two curves are diverging rather than disagreeing at a fixed level.",
            regression.slope, regression.r_squared
        ),
        ErrorPattern::SystematicBias => {
            "Error sits at a roughly constant offset across the whole curve, consistent \
             with a fixed calibration or reference-level difference."
                .to_owned()
        }
        ErrorPattern::RandomNoise => {
            "Error behaves like uncorrelated noise around zero with no discernible trend."
                .to_owned()
        }
        ErrorPattern::TransientSpikes => {
            "Error is small almost everywhere but spikes sharply at a handful of points, \
             consistent with isolated transients rather than a broad disagreement."
                .to_owned()
        }
        ErrorPattern::NullPointNoise => {
            "Error is elevated in a pattern consistent with transmission-loss nulls, where \
             small range/frequency shifts produce large dB swings near destructive \
             interference minima."
                .to_owned()
        }
        ErrorPattern::InsufficientData => {
            "Too few points were available to classify the error pattern.".to_owned()
        }
    }
}

fn recommendation_for(pattern: ErrorPattern) -> String {
    match pattern {
        ErrorPattern::SystematicGrowth => {
            "Check for a scale or unit difference between the two runs, or a model \
             parameter that diverges with range."
                .to_owned()
        }
        ErrorPattern::SystematicBias => {
            "Check reference levels, source levels, or a constant offset in one of the \
             model configurations."
                .to_owned()
        }
        ErrorPattern::RandomNoise => {
            "Differences are likely within the two models' numerical tolerance; no \
             further investigation is suggested."
                .to_owned()
        }
        ErrorPattern::TransientSpikes => {
            "Inspect the flagged points individually; a broad re-run is unlikely to be \
             necessary."
                .to_owned()
        }
        ErrorPattern::NullPointNoise => {
            "Consider comparing at null-avoiding range offsets, or relaxing significance \
             thresholds near TL nulls before drawing conclusions."
                .to_owned()
        }
        ErrorPattern::InsufficientData => {
            "Collect more comparison points before attempting pattern classification."
                .to_owned()
        }
    }
}

/// Run the full accumulation analysis against the recorded samples.
pub fn analyze(
    data: &ErrorAccumulationData,
    thresholds: &AccumulationThresholds,
) -> AccumulationMetrics {
    if data.len() < thresholds.min_points {
        return AccumulationMetrics {
            regression: LinearRegression::default(),
            autocorrelation: 0.0,
            run_test_z: 0.0,
            pattern: ErrorPattern::InsufficientData,
            interpretation: interpretation_for(ErrorPattern::InsufficientData, &LinearRegression::default()),
            recommendation: recommendation_for(ErrorPattern::InsufficientData),
        };
    }

    let regression = linear_regression(&data.ranges, &data.errors);
    let autocorrelation = calculate_autocorrelation(&data.errors);
    let run_z = run_test_z_score(&data.errors);
    let pattern = classify_pattern(&regression, autocorrelation, run_z, &data.errors, thresholds);

    AccumulationMetrics {
        regression,
        autocorrelation,
        run_test_z: run_z,
        pattern,
        interpretation: interpretation_for(pattern, &regression),
        recommendation: recommendation_for(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> AccumulationThresholds {
        AccumulationThresholds::default()
    }

    #[test]
    fn too_few_points_is_insufficient_data() {
        let mut data = ErrorAccumulationData::default();
        for i in 0..5 {
            data.add_point(i as f64, 0.1, 80.0);
        }
        let result = analyze(&data, &thresholds());
        assert_eq!(result.pattern, ErrorPattern::InsufficientData);
    }

    #[test]
    fn linearly_growing_error_is_systematic_growth() {
        let mut data = ErrorAccumulationData::default();
        for i in 0..20 {
            let range = i as f64;
            data.add_point(range, 0.05 * range, 80.0);
        }
        let result = analyze(&data, &thresholds());
        assert_eq!(result.pattern, ErrorPattern::SystematicGrowth);
        assert!(result.regression.slope > 0.0);
        assert!(result.regression.r_squared > 0.9);
    }

    #[test]
    fn constant_offset_is_systematic_bias() {
        let mut data = ErrorAccumulationData::default();
        let offsets = [2.0, 2.1, 1.9, 2.05, 1.95, 2.0, 2.1, 1.9, 2.0, 2.05, 2.0, 1.95];
        for (i, off) in offsets.iter().enumerate() {
            data.add_point(i as f64, *off, 80.0);
        }
        let result = analyze(&data, &thresholds());
        assert_eq!(result.pattern, ErrorPattern::SystematicBias);
    }

    #[test]
    fn scattered_noise_is_random() {
        // A perfectly alternating sequence is too regular to pass the
        // Wald-Wolfowitz run test; real noise needs a mix of run lengths.
        let mut data = ErrorAccumulationData::default();
        let values = [0.05, -0.06, -0.03, 0.08, 0.02, -0.07, 0.04, -0.05, -0.02, 0.06, -0.04, 0.03];
        for (i, v) in values.iter().enumerate() {
            data.add_point(i as f64, *v, 80.0);
        }
        let result = analyze(&data, &thresholds());
        assert_eq!(result.pattern, ErrorPattern::RandomNoise);
    }

    #[test]
    fn erfc_matches_known_value_at_zero() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn run_test_z_score_is_near_zero_for_strictly_alternating_signs() {
        let errors = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let z = run_test_z_score(&errors);
        assert!(z.abs() < 3.0);
    }
}
