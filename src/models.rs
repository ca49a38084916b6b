use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single heart rate variability reading supplied by the wearable ingestion layer
///
/// Samples are expected in timestamp order. Duplicates at the same timestamp are
/// kept as-is; de-duplication is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiosignalSample {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,

    /// Root mean square of successive RR differences in milliseconds
    pub rmssd_ms: f64,

    /// Standard deviation of NN intervals in milliseconds, if the device reports it
    #[serde(default)]
    pub sdnn_ms: Option<f64>,

    /// Device-reported signal quality (0.0-1.0)
    #[serde(default = "default_quality")]
    pub quality_score: f64,
}

fn default_quality() -> f64 {
    1.0
}

impl BiosignalSample {
    /// Create a full-quality sample without SDNN
    pub fn new(timestamp: DateTime<Utc>, rmssd_ms: f64) -> Self {
        BiosignalSample {
            timestamp,
            rmssd_ms,
            sdnn_ms: None,
            quality_score: 1.0,
        }
    }

    pub fn with_quality(mut self, quality_score: f64) -> Self {
        self.quality_score = quality_score;
        self
    }

    pub fn with_sdnn(mut self, sdnn_ms: f64) -> Self {
        self.sdnn_ms = Some(sdnn_ms);
        self
    }
}

/// Training load recorded for one calendar day (session RPE x minutes, TSS, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    pub date: NaiveDate,
    pub load: f64,
}

impl DailyLoad {
    pub fn new(date: NaiveDate, load: f64) -> Self {
        DailyLoad { date, load }
    }
}

/// Direction of a short-term trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Sets, reps and target effort for one exercise in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPrescription {
    pub sets: u32,
    pub reps: u32,

    /// Target Rate of Perceived Exertion (1-10)
    pub rpe: Decimal,
}

impl SessionPrescription {
    pub fn new(sets: u32, reps: u32, rpe: Decimal) -> Self {
        SessionPrescription { sets, reps, rpe }
    }

    /// Reps in reserve implied by the target RPE
    pub fn reps_in_reserve(&self) -> Decimal {
        crate::autoregulation::rpe_to_rir(self.rpe)
    }
}

impl fmt::Display for SessionPrescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ RPE {}", self.sets, self.reps, self.rpe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sample_defaults_on_deserialize() {
        let json = r#"{"timestamp":"2024-09-01T07:00:00Z","rmssd_ms":42.5}"#;
        let sample: BiosignalSample = serde_json::from_str(json).unwrap();

        assert_eq!(sample.rmssd_ms, 42.5);
        assert_eq!(sample.sdnn_ms, None);
        assert_eq!(sample.quality_score, 1.0);
    }

    #[test]
    fn test_prescription_display() {
        let session = SessionPrescription::new(4, 8, dec!(7.5));
        assert_eq!(session.to_string(), "4x8 @ RPE 7.5");
        assert_eq!(session.reps_in_reserve(), dec!(2.5));
    }

    #[test]
    fn test_trend_direction_display() {
        assert_eq!(TrendDirection::Increasing.to_string(), "increasing");
        assert_eq!(TrendDirection::Decreasing.to_string(), "decreasing");
    }
}
