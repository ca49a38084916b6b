//! Composite readiness scoring
//!
//! Blends HRV status, sleep, resting heart rate and the athlete's own rating into a
//! single 0-100 readiness score, a category, and a training load multiplier.
//!
//! Only the inputs that are present count. Their weights are renormalised to sum to
//! one, so a missing sleep tracker does not drag the score towards zero.
//!
//! The multiplier is piecewise linear per category. Adjacent bands do not meet
//! exactly (69.9 scores 0.999 under moderate, 70.0 scores 1.0 under good); the
//! small steps at band edges are expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::hrv_trend::{RecoveryAssessment, RecoveryState};

/// Relative weight of each readiness component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessWeights {
    pub hrv: f64,
    pub sleep_quality: f64,
    pub sleep_duration: f64,
    pub resting_hr: f64,
    pub subjective: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        ReadinessWeights {
            hrv: 0.40,
            sleep_quality: 0.25,
            sleep_duration: 0.15,
            resting_hr: 0.10,
            subjective: 0.10,
        }
    }
}

/// Readiness calculator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub weights: ReadinessWeights,

    /// Composite reported when no component is available
    pub default_composite: f64,

    /// HRV vs subjective gap (points) that triggers the consistency note
    pub consistency_gap: f64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            weights: ReadinessWeights::default(),
            default_composite: 65.0,
            consistency_gap: 30.0,
        }
    }
}

/// Readiness category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryCategory {
    Excellent, // 85+
    Good,      // 70-85
    Moderate,  // 55-70
    Poor,      // 40-55
    Critical,  // below 40
}

impl RecoveryCategory {
    /// Get category from composite score
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            RecoveryCategory::Excellent
        } else if score >= 70.0 {
            RecoveryCategory::Good
        } else if score >= 55.0 {
            RecoveryCategory::Moderate
        } else if score >= 40.0 {
            RecoveryCategory::Poor
        } else {
            RecoveryCategory::Critical
        }
    }

    /// Training load multiplier for a score inside this category
    pub fn training_adjustment(&self, score: f64) -> f64 {
        let factor = match self {
            RecoveryCategory::Excellent => 1.0 + (score - 85.0) / 100.0,
            RecoveryCategory::Good => 1.0,
            RecoveryCategory::Moderate => 0.85 + (score - 55.0) / 100.0,
            RecoveryCategory::Poor => 0.65 + (score - 40.0) / 100.0,
            RecoveryCategory::Critical => 0.50 + score / 200.0,
        };
        factor.clamp(0.5, 1.2)
    }

    pub fn description(&self) -> &'static str {
        match self {
            RecoveryCategory::Excellent => "Fully recovered and primed for hard training",
            RecoveryCategory::Good => "Recovered and ready for normal training",
            RecoveryCategory::Moderate => "Partially recovered",
            RecoveryCategory::Poor => "Under-recovered",
            RecoveryCategory::Critical => "Severely under-recovered",
        }
    }

    pub fn intensity_recommendation(&self) -> &'static str {
        match self {
            RecoveryCategory::Excellent => "Push intensity: top sets and PR attempts are appropriate",
            RecoveryCategory::Good => "Train at planned intensity",
            RecoveryCategory::Moderate => "Cap intensity around RPE 7-8 and avoid maximal efforts",
            RecoveryCategory::Poor => "Keep intensity light to moderate, RPE 6 or below",
            RecoveryCategory::Critical => "Avoid intense work; rest or mobility only",
        }
    }

    pub fn volume_recommendation(&self) -> &'static str {
        match self {
            RecoveryCategory::Excellent => "Planned volume, optional extra back-off sets",
            RecoveryCategory::Good => "Complete the planned volume",
            RecoveryCategory::Moderate => "Trim volume by 10-20%",
            RecoveryCategory::Poor => "Cut volume by 30-40%",
            RecoveryCategory::Critical => "Minimal volume or a full rest day",
        }
    }
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Excellent => write!(f, "excellent"),
            RecoveryCategory::Good => write!(f, "good"),
            RecoveryCategory::Moderate => write!(f, "moderate"),
            RecoveryCategory::Poor => write!(f, "poor"),
            RecoveryCategory::Critical => write!(f, "critical"),
        }
    }
}

/// HRV input taken from a trend assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvReading {
    pub state: RecoveryState,
    pub percent_from_baseline: f64,
}

impl HrvReading {
    /// HRV input from an assessment, None when the assessment is a default
    pub fn from_assessment(assessment: &RecoveryAssessment) -> Option<Self> {
        if assessment.insufficient_data {
            return None;
        }
        Some(HrvReading {
            state: assessment.state,
            percent_from_baseline: assessment.percent_from_baseline,
        })
    }
}

/// Resting heart rate against the athlete's own baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestingHeartRate {
    pub current_bpm: f64,
    pub baseline_bpm: f64,
}

/// Raw inputs for one readiness calculation; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessInputs {
    pub hrv: Option<HrvReading>,

    /// Sleep quality rating (0-10)
    pub sleep_quality: Option<f64>,

    /// Hours slept
    pub sleep_hours: Option<f64>,

    pub resting_hr: Option<RestingHeartRate>,

    /// Subjective readiness rating (1-10)
    pub subjective: Option<f64>,
}

/// Per-component sub-scores (0-100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub hrv: Option<f64>,
    pub sleep_quality: Option<f64>,
    pub sleep_duration: Option<f64>,
    pub resting_hr: Option<f64>,
    pub subjective: Option<f64>,
}

impl ComponentScores {
    /// Number of components that have a score
    pub fn present(&self) -> usize {
        [
            self.hrv,
            self.sleep_quality,
            self.sleep_duration,
            self.resting_hr,
            self.subjective,
        ]
        .iter()
        .filter(|c| c.is_some())
        .count()
    }
}

/// Composite readiness result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScore {
    /// Weighted composite (0-100)
    pub composite_score: f64,

    pub category: RecoveryCategory,

    /// Multiplier applied to planned volume (0.5-1.2)
    pub training_adjustment: f64,

    pub components: ComponentScores,
    pub components_present: usize,
    pub intensity_recommendation: String,
    pub volume_recommendation: String,
    pub notes: Vec<String>,

    /// True when no component was available and the default composite was used
    pub is_default: bool,
}

/// Composite readiness calculator
#[derive(Debug, Clone, Default)]
pub struct ReadinessCalculator {
    config: ReadinessConfig,
}

impl ReadinessCalculator {
    pub fn new() -> Self {
        ReadinessCalculator {
            config: ReadinessConfig::default(),
        }
    }

    pub fn with_config(config: ReadinessConfig) -> Self {
        ReadinessCalculator { config }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// HRV sub-score: state base value plus half the percent deviation
    pub fn hrv_score(reading: &HrvReading) -> f64 {
        let base = match reading.state {
            RecoveryState::Excellent => 95.0,
            RecoveryState::Good => 80.0,
            RecoveryState::Normal => 65.0,
            RecoveryState::Fatigued => 45.0,
            RecoveryState::VeryFatigued => 25.0,
        };
        (base + reading.percent_from_baseline * 0.5).clamp(0.0, 100.0)
    }

    /// Sleep quality sub-score from a 0-10 rating
    pub fn sleep_quality_score(rating: f64) -> f64 {
        (rating / 10.0 * 100.0).clamp(0.0, 100.0)
    }

    /// Sleep duration sub-score
    ///
    /// Full marks for 7-9 hours, minus 15 per hour short, minus 10 per hour over
    /// (never below 75 for oversleeping).
    pub fn sleep_duration_score(hours: f64) -> f64 {
        if hours < 7.0 {
            (100.0 - (7.0 - hours) * 15.0).max(0.0)
        } else if hours <= 9.0 {
            100.0
        } else {
            (100.0 - (hours - 9.0) * 10.0).max(75.0)
        }
    }

    /// Resting heart rate sub-score: 5 points off per BPM above baseline
    pub fn resting_hr_score(rhr: &RestingHeartRate) -> f64 {
        if rhr.current_bpm <= rhr.baseline_bpm {
            100.0
        } else {
            (100.0 - (rhr.current_bpm - rhr.baseline_bpm) * 5.0).max(0.0)
        }
    }

    /// Subjective readiness sub-score from a 1-10 rating
    pub fn subjective_score(rating: f64) -> f64 {
        (rating / 10.0 * 100.0).clamp(0.0, 100.0)
    }

    /// Score every present input
    pub fn component_scores(&self, inputs: &ReadinessInputs) -> ComponentScores {
        ComponentScores {
            hrv: inputs.hrv.as_ref().map(Self::hrv_score),
            sleep_quality: inputs.sleep_quality.map(Self::sleep_quality_score),
            sleep_duration: inputs.sleep_hours.map(Self::sleep_duration_score),
            resting_hr: inputs.resting_hr.as_ref().map(Self::resting_hr_score),
            subjective: inputs.subjective.map(Self::subjective_score),
        }
    }

    /// Weighted average over present components, None when nothing is present
    pub fn composite(&self, components: &ComponentScores) -> Option<f64> {
        let w = &self.config.weights;
        let weighted = [
            (components.hrv, w.hrv),
            (components.sleep_quality, w.sleep_quality),
            (components.sleep_duration, w.sleep_duration),
            (components.resting_hr, w.resting_hr),
            (components.subjective, w.subjective),
        ];

        let (sum, weight_total) = weighted
            .iter()
            .filter_map(|(score, weight)| score.map(|s| (s * weight, *weight)))
            .fold((0.0, 0.0), |(sum, total), (ws, w)| (sum + ws, total + w));

        if weight_total <= 0.0 {
            return None;
        }
        Some((sum / weight_total).clamp(0.0, 100.0))
    }

    /// Calculate the composite readiness score
    pub fn calculate(&self, inputs: &ReadinessInputs) -> RecoveryScore {
        let components = self.component_scores(inputs);
        let components_present = components.present();
        let mut notes = Vec::new();

        let (composite_score, is_default) = match self.composite(&components) {
            Some(score) => (score, false),
            None => {
                warn!("No readiness inputs available, using default composite");
                notes.push(format!(
                    "No readiness inputs available; default score of {} used",
                    self.config.default_composite
                ));
                (self.config.default_composite, true)
            }
        };

        if let (Some(hrv), Some(subjective)) = (components.hrv, components.subjective) {
            if (hrv - subjective).abs() > self.config.consistency_gap {
                notes.push(format!(
                    "HRV score ({:.0}) and subjective readiness ({:.0}) disagree; \
                     trust the objective HRV signal",
                    hrv, subjective
                ));
            }
        }

        let category = RecoveryCategory::from_score(composite_score);
        let training_adjustment = category.training_adjustment(composite_score);

        debug!(
            composite = composite_score,
            category = %category,
            adjustment = training_adjustment,
            components = components_present,
            "Readiness score calculated"
        );

        RecoveryScore {
            composite_score,
            category,
            training_adjustment,
            components,
            components_present,
            intensity_recommendation: category.intensity_recommendation().to_string(),
            volume_recommendation: category.volume_recommendation().to_string(),
            notes,
            is_default,
        }
    }
}
