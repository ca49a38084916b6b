//! HRV Trend Analysis
//!
//! Compares the latest RMSSD reading against a rolling personal baseline built from
//! the trailing days of samples, and classifies the athlete's autonomic recovery.
//!
//! # Sports Science Background
//!
//! RMSSD (root mean square of successive RR differences) tracks parasympathetic
//! activity. Day-to-day values are noisy, so a single reading is only meaningful
//! relative to the athlete's own recent history:
//!
//! - **Baseline**: mean and standard deviation of the trailing 7 days
//! - **Thresholds**: bands at ±0.5, +0.75, -0.75 and -1.5 standard deviations
//! - **Overtraining markers**: week-over-week decline, rising variability, and
//!   readings collapsing below the prior week's lower band
//!
//! The analyzer is stateless. Every call recomputes the baseline from the samples
//! it is given, so one instance can be shared freely across threads.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::models::{BiosignalSample, TrendDirection};
use crate::stats::{coefficient_of_variation, mean, population_std_dev};

/// Trend analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Length of the rolling baseline window in days
    pub baseline_days: u32,

    /// Minimum qualifying samples in the window for a real assessment
    pub min_samples: usize,

    /// Samples below this quality score are ignored
    pub min_quality: f64,

    /// Number of most recent samples compared in the trend check
    pub trend_recent_samples: usize,

    /// Number of preceding samples the recent ones are compared against
    pub trend_prior_samples: usize,

    /// Percent change needed to call a trend increasing or decreasing
    pub trend_threshold_pct: f64,

    /// Samples needed before overtraining markers are evaluated
    pub overtraining_min_samples: usize,

    /// Week-over-week change (percent) below which the decline is flagged
    pub decline_threshold_pct: f64,

    /// Coefficient of variation above which the current week is flagged as unstable
    pub high_variability_cv: f64,

    /// Sample count that earns full sample-size confidence
    pub full_confidence_samples: usize,

    /// Coefficient of variation at or below which stability earns full confidence
    pub stable_cv: f64,

    /// Trailing samples whose mean quality feeds the confidence score
    pub quality_window_samples: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            baseline_days: 7,
            min_samples: 7,
            min_quality: 0.0,
            trend_recent_samples: 3,
            trend_prior_samples: 4,
            trend_threshold_pct: 5.0,
            overtraining_min_samples: 14,
            decline_threshold_pct: -10.0,
            high_variability_cv: 0.15,
            full_confidence_samples: 14,
            stable_cv: 0.10,
            quality_window_samples: 7,
        }
    }
}

/// Recovery state of the latest reading relative to baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    /// At or above the elevated threshold
    Excellent,
    /// Upper half of the normal band or above
    Good,
    /// Inside the normal band
    Normal,
    /// Below normal but above the very-reduced threshold
    Fatigued,
    /// Below the very-reduced threshold
    VeryFatigued,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryState::Excellent => write!(f, "excellent"),
            RecoveryState::Good => write!(f, "good"),
            RecoveryState::Normal => write!(f, "normal"),
            RecoveryState::Fatigued => write!(f, "fatigued"),
            RecoveryState::VeryFatigued => write!(f, "very_fatigued"),
        }
    }
}

impl RecoveryState {
    /// Training recommendation for this state
    pub fn recommendation(&self) -> &'static str {
        match self {
            RecoveryState::Excellent => {
                "Well recovered. Good day for high-intensity work or a planned overload session"
            }
            RecoveryState::Good => "Recovered. Proceed with the planned session",
            RecoveryState::Normal => "Normal recovery. Train as planned and monitor how you feel",
            RecoveryState::Fatigued => {
                "Signs of fatigue. Reduce intensity or volume and favour technique work"
            }
            RecoveryState::VeryFatigued => {
                "Significant fatigue. Prioritise rest, sleep and light active recovery"
            }
        }
    }
}

/// Rolling baseline derived from a window of RMSSD values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub stddev: f64,
    pub coefficient_of_variation: f64,
    pub sample_size: usize,

    /// (mean - 0.5 SD, mean + 0.5 SD)
    pub normal_range: (f64, f64),
    pub elevated_threshold: f64,
    pub reduced_threshold: f64,
    pub very_reduced_threshold: f64,
}

impl Baseline {
    /// Build a baseline from raw RMSSD values
    pub fn from_values(values: &[f64]) -> Self {
        let mean = mean(values);
        let stddev = population_std_dev(values);

        Baseline {
            mean,
            stddev,
            coefficient_of_variation: coefficient_of_variation(mean, stddev),
            sample_size: values.len(),
            normal_range: (mean - 0.5 * stddev, mean + 0.5 * stddev),
            elevated_threshold: mean + 0.75 * stddev,
            reduced_threshold: mean - 0.75 * stddev,
            very_reduced_threshold: mean - 1.5 * stddev,
        }
    }

    /// Classify a reading against this baseline
    ///
    /// Checks run from the top band down, so every value lands in exactly one state.
    pub fn classify(&self, value: f64) -> RecoveryState {
        if value >= self.elevated_threshold {
            RecoveryState::Excellent
        } else if value >= self.normal_range.1 {
            RecoveryState::Good
        } else if value >= self.normal_range.0 {
            RecoveryState::Normal
        } else if value >= self.very_reduced_threshold {
            RecoveryState::Fatigued
        } else {
            RecoveryState::VeryFatigued
        }
    }

    /// Percent deviation of a reading from the baseline mean
    pub fn percent_from_baseline(&self, value: f64) -> f64 {
        if self.mean.abs() > f64::EPSILON {
            (value - self.mean) / self.mean * 100.0
        } else {
            0.0
        }
    }
}

/// Result of analyzing the latest reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAssessment {
    /// Latest RMSSD value in milliseconds
    pub current_value: f64,

    /// Baseline used for classification (None when data was insufficient)
    pub baseline: Option<Baseline>,

    pub percent_from_baseline: f64,
    pub state: RecoveryState,

    /// Confidence in the assessment (0.0-1.0)
    pub confidence: f64,

    pub trend_direction: TrendDirection,

    /// Consecutive readings, including today, classified in the current state
    pub days_in_state: u32,

    pub recommendation_text: String,
    pub notes: Vec<String>,

    /// True when this is the degrade-gracefully default
    pub insufficient_data: bool,
}

/// Overtraining risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OvertrainingRisk {
    Low,
    Moderate,
    High,
}

impl fmt::Display for OvertrainingRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OvertrainingRisk::Low => write!(f, "low"),
            OvertrainingRisk::Moderate => write!(f, "moderate"),
            OvertrainingRisk::High => write!(f, "high"),
        }
    }
}

/// Week-over-week overtraining markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertrainingMarkers {
    /// Current week mean dropped more than the decline threshold
    pub sustained_decline: bool,

    /// Current week coefficient of variation above the variability threshold
    pub high_variability: bool,

    /// Most recent readings below the prior week's very-reduced threshold
    pub critical_low: bool,

    pub risk_level: OvertrainingRisk,

    /// (now.mean - prior.mean) / prior.mean x 100
    pub week_over_week_change_pct: Option<f64>,

    pub current_week: Option<Baseline>,
    pub prior_week: Option<Baseline>,
    pub notes: Vec<String>,
    pub insufficient_data: bool,
}

/// HRV trend analyzer
#[derive(Debug, Clone, Default)]
pub struct HrvTrendAnalyzer {
    config: TrendConfig,
}

impl HrvTrendAnalyzer {
    /// Create new analyzer with default configuration
    pub fn new() -> Self {
        HrvTrendAnalyzer {
            config: TrendConfig::default(),
        }
    }

    /// Create new analyzer with custom configuration
    pub fn with_config(config: TrendConfig) -> Self {
        HrvTrendAnalyzer { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    fn qualifying<'a>(&self, samples: &'a [BiosignalSample]) -> Vec<&'a BiosignalSample> {
        samples
            .iter()
            .filter(|s| s.quality_score >= self.config.min_quality && s.rmssd_ms.is_finite())
            .collect()
    }

    /// Samples inside the trailing baseline window ending at the latest sample
    fn baseline_window<'a>(&self, qualifying: &[&'a BiosignalSample]) -> Vec<&'a BiosignalSample> {
        let Some(latest) = qualifying.last() else {
            return Vec::new();
        };
        let cutoff = latest.timestamp - Duration::days(self.config.baseline_days as i64);

        qualifying
            .iter()
            .filter(|s| s.timestamp > cutoff && s.timestamp <= latest.timestamp)
            .copied()
            .collect()
    }

    /// Compute the rolling baseline, or None when the window is too thin
    pub fn calculate_baseline(&self, samples: &[BiosignalSample]) -> Option<Baseline> {
        let qualifying = self.qualifying(samples);
        let window = self.baseline_window(&qualifying);

        if window.len() < self.config.min_samples {
            return None;
        }

        let values: Vec<f64> = window.iter().map(|s| s.rmssd_ms).collect();
        Some(Baseline::from_values(&values))
    }

    /// Analyze the latest sample against the rolling baseline
    ///
    /// Never fails: with too few samples the result is a flagged default
    /// (state normal, confidence at most 0.3, a note naming the shortfall).
    pub fn analyze(&self, samples: &[BiosignalSample]) -> RecoveryAssessment {
        let qualifying = self.qualifying(samples);
        let window = self.baseline_window(&qualifying);
        let current_value = qualifying.last().map(|s| s.rmssd_ms).unwrap_or(0.0);

        if window.len() < self.config.min_samples {
            return self.default_assessment(window.len(), current_value);
        }

        let window_values: Vec<f64> = window.iter().map(|s| s.rmssd_ms).collect();
        let baseline = Baseline::from_values(&window_values);
        let history: Vec<f64> = qualifying.iter().map(|s| s.rmssd_ms).collect();

        let state = baseline.classify(current_value);
        let recent_quality =
            Self::recent_quality(&qualifying, self.config.quality_window_samples.max(1));
        let confidence = self.calculate_confidence(history.len(), &baseline, recent_quality);
        let trend_direction = self.trend_direction(&history);
        let days_in_state = Self::days_in_state(&history, &baseline);

        debug!(
            mean = baseline.mean,
            stddev = baseline.stddev,
            cv = baseline.coefficient_of_variation,
            current = current_value,
            state = %state,
            confidence,
            "HRV baseline computed"
        );

        let mut notes = Vec::new();
        if confidence < 0.5 {
            notes.push(format!(
                "Low confidence ({:.2}); interpret this reading with caution",
                confidence
            ));
        }
        if recent_quality < 0.6 {
            notes.push(format!(
                "Recent measurements have low signal quality (mean {:.2})",
                recent_quality
            ));
        }
        if baseline.stddev == 0.0 {
            notes.push("Baseline shows no variation; all thresholds equal the mean".to_string());
        }
        if days_in_state >= 3 && matches!(state, RecoveryState::Fatigued | RecoveryState::VeryFatigued)
        {
            notes.push(format!(
                "Fatigued for {} consecutive readings; consider a deload",
                days_in_state
            ));
        }

        RecoveryAssessment {
            current_value,
            percent_from_baseline: baseline.percent_from_baseline(current_value),
            baseline: Some(baseline),
            state,
            confidence,
            trend_direction,
            days_in_state,
            recommendation_text: state.recommendation().to_string(),
            notes,
            insufficient_data: false,
        }
    }

    fn default_assessment(&self, available: usize, current_value: f64) -> RecoveryAssessment {
        warn!(
            available,
            required = self.config.min_samples,
            "Insufficient HRV samples, returning default assessment"
        );

        let ratio = available as f64 / self.config.min_samples.max(1) as f64;

        RecoveryAssessment {
            current_value,
            baseline: None,
            percent_from_baseline: 0.0,
            state: RecoveryState::Normal,
            confidence: (0.3 * ratio).min(0.3),
            trend_direction: TrendDirection::Stable,
            days_in_state: if available > 0 { 1 } else { 0 },
            recommendation_text: RecoveryState::Normal.recommendation().to_string(),
            notes: vec![format!(
                "Insufficient data: {} of {} required samples in the last {} days; \
                 default assessment returned",
                available, self.config.min_samples, self.config.baseline_days
            )],
            insufficient_data: true,
        }
    }

    fn recent_quality(qualifying: &[&BiosignalSample], count: usize) -> f64 {
        let recent: Vec<f64> = qualifying
            .iter()
            .rev()
            .take(count)
            .map(|s| s.quality_score)
            .collect();
        mean(&recent)
    }

    /// Confidence from sample size (0-0.4), stability (0-0.4) and quality (0-0.2)
    pub fn calculate_confidence(
        &self,
        sample_count: usize,
        baseline: &Baseline,
        recent_quality: f64,
    ) -> f64 {
        let full = self.config.full_confidence_samples.max(1) as f64;
        let sample_component = 0.4 * (sample_count as f64 / full).min(1.0);

        let cv = baseline.coefficient_of_variation;
        let stability_component = if cv <= self.config.stable_cv {
            0.4
        } else {
            (0.4 * (1.0 - cv)).max(0.0)
        };

        let quality_component = (recent_quality * 0.2).clamp(0.0, 0.2);

        (sample_component + stability_component + quality_component).clamp(0.0, 1.0)
    }

    /// Compare the mean of the latest readings with the mean of the ones before them
    pub fn trend_direction(&self, values: &[f64]) -> TrendDirection {
        let recent_n = self.config.trend_recent_samples;
        let prior_n = self.config.trend_prior_samples;

        if values.len() < recent_n + prior_n || recent_n == 0 || prior_n == 0 {
            return TrendDirection::Stable;
        }

        let split = values.len() - recent_n;
        let recent = mean(&values[split..]);
        let prior = mean(&values[split - prior_n..split]);

        if prior.abs() <= f64::EPSILON {
            return TrendDirection::Stable;
        }

        let change_pct = (recent - prior) / prior * 100.0;
        if change_pct > self.config.trend_threshold_pct {
            TrendDirection::Increasing
        } else if change_pct < -self.config.trend_threshold_pct {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// Count consecutive readings, walking back from the latest, in today's state
    pub fn days_in_state(values: &[f64], baseline: &Baseline) -> u32 {
        let Some(&today) = values.last() else {
            return 0;
        };
        let state = baseline.classify(today);

        values
            .iter()
            .rev()
            .take_while(|&&v| baseline.classify(v) == state)
            .count() as u32
    }

    /// Evaluate week-over-week overtraining markers
    ///
    /// Uses the most recent 14 qualifying samples split into a prior and a current
    /// week, each with its own baseline.
    pub fn detect_overtraining(&self, samples: &[BiosignalSample]) -> OvertrainingMarkers {
        let qualifying = self.qualifying(samples);
        let needed = self.config.overtraining_min_samples;

        if qualifying.len() < needed || needed < 2 {
            return OvertrainingMarkers {
                sustained_decline: false,
                high_variability: false,
                critical_low: false,
                risk_level: OvertrainingRisk::Low,
                week_over_week_change_pct: None,
                current_week: None,
                prior_week: None,
                notes: vec![format!(
                    "Insufficient data: {} of {} samples needed for overtraining analysis",
                    qualifying.len(),
                    needed
                )],
                insufficient_data: true,
            };
        }

        let values: Vec<f64> = qualifying
            .iter()
            .skip(qualifying.len() - needed)
            .map(|s| s.rmssd_ms)
            .collect();
        let half = needed / 2;
        let prior = Baseline::from_values(&values[..half]);
        let now = Baseline::from_values(&values[half..]);

        let change_pct = prior.percent_from_baseline(now.mean);
        let sustained_decline = change_pct < self.config.decline_threshold_pct;
        let high_variability = now.coefficient_of_variation > self.config.high_variability_cv;

        let recent_n = self.config.trend_recent_samples.clamp(1, values.len());
        let recent_mean = mean(&values[values.len() - recent_n..]);
        let critical_low = recent_mean < prior.very_reduced_threshold;

        let mut notes = Vec::new();
        if sustained_decline {
            notes.push(format!(
                "HRV declined {:.1}% week over week",
                change_pct.abs()
            ));
        }
        if high_variability {
            notes.push(format!(
                "High day-to-day HRV variability (CV {:.2})",
                now.coefficient_of_variation
            ));
        }
        if critical_low {
            notes.push(format!(
                "Recent HRV ({:.1} ms) below last week's lower limit ({:.1} ms)",
                recent_mean, prior.very_reduced_threshold
            ));
        }

        let risk_level = if critical_low {
            OvertrainingRisk::High
        } else if sustained_decline || high_variability {
            OvertrainingRisk::Moderate
        } else {
            OvertrainingRisk::Low
        };

        if risk_level != OvertrainingRisk::Low {
            warn!(risk = %risk_level, change_pct, "Overtraining markers present");
        }

        OvertrainingMarkers {
            sustained_decline,
            high_variability,
            critical_low,
            risk_level,
            week_over_week_change_pct: Some(change_pct),
            current_week: Some(now),
            prior_week: Some(prior),
            notes,
            insufficient_data: false,
        }
    }
}
