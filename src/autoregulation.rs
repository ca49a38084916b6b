//! Autoregulated load adjustment
//!
//! Turns a planned session and today's readiness into the session that should
//! actually be performed, and provides two in-session feedback loops: load
//! recalculation from the RPE of a completed set, and velocity-loss based set
//! termination.
//!
//! # Sports Science Background
//!
//! - **RPE / RIR**: on the 10-point scale an RPE of 8 leaves roughly 2 reps in
//!   reserve. A completed set that felt one RPE point harder than planned calls
//!   for about 2.5% less load on the next set.
//! - **Velocity loss**: bar speed drops as a set approaches failure. Ending the
//!   set once velocity has fallen ~20% below the fastest rep limits fatigue
//!   while preserving most of the training stimulus.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::models::SessionPrescription;
use crate::readiness::RecoveryScore;

/// Load adjuster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoregulationConfig {
    /// Load change per RPE point of deviation, in percent
    pub rpe_step_pct: Decimal,

    /// Velocity loss (percent of best rep) that ends a set
    pub velocity_loss_threshold_pct: f64,

    /// Factor below which sets and effort are cut
    pub reduce_below_factor: f64,

    /// Highest RPE an adjusted session may target
    pub max_rpe: Decimal,

    /// Lowest RPE an adjusted session may target
    pub min_rpe: Decimal,
}

impl Default for AutoregulationConfig {
    fn default() -> Self {
        AutoregulationConfig {
            rpe_step_pct: dec!(2.5),
            velocity_loss_threshold_pct: 20.0,
            reduce_below_factor: 0.9,
            max_rpe: dec!(10.0),
            min_rpe: dec!(5.0),
        }
    }
}

/// Planned and adjusted prescription for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAdjustment {
    pub planned: SessionPrescription,
    pub adjusted: SessionPrescription,
    pub adjustment_factor: f64,
    pub message: String,
}

impl SessionAdjustment {
    /// Sets removed (negative when sets were added)
    pub fn sets_delta(&self) -> i64 {
        self.planned.sets as i64 - self.adjusted.sets as i64
    }
}

/// Direction of a load change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadDirection {
    Increase,
    Maintain,
    Decrease,
}

impl fmt::Display for LoadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadDirection::Increase => write!(f, "increase"),
            LoadDirection::Maintain => write!(f, "maintain"),
            LoadDirection::Decrease => write!(f, "decrease"),
        }
    }
}

/// Next-set load derived from RPE feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRecommendation {
    pub target_rpe: Decimal,
    pub actual_rpe: Decimal,

    /// actual - target
    pub rpe_diff: Decimal,

    /// Positive when the load should drop
    pub adjustment_percent: Decimal,

    pub current_load: Decimal,
    pub recommended_load: Decimal,
    pub direction: LoadDirection,
    pub message: String,
}

/// Outcome of a velocity-loss check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityDecision {
    Stop,
    Continue,
    InsufficientData,
}

impl fmt::Display for VelocityDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VelocityDecision::Stop => write!(f, "stop"),
            VelocityDecision::Continue => write!(f, "continue"),
            VelocityDecision::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

/// Velocity-based set termination result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityCheck {
    pub decision: VelocityDecision,
    pub stop_now: bool,

    /// Index of the rep that crossed the threshold
    pub stop_index: Option<usize>,

    /// Reps completed before the stop (all reps when continuing)
    pub reps_completed: usize,

    /// Largest loss observed up to the decision point, in percent
    pub max_velocity_loss_pct: f64,

    pub threshold_pct: f64,
    pub message: String,
}

/// Reps in reserve implied by an RPE (RIR = 10 - RPE, never negative)
pub fn rpe_to_rir(rpe: Decimal) -> Decimal {
    (dec!(10) - rpe).max(Decimal::ZERO)
}

/// Load adjuster
#[derive(Debug, Clone, Default)]
pub struct LoadAdjuster {
    config: AutoregulationConfig,
}

impl LoadAdjuster {
    /// Create new load adjuster with default configuration
    pub fn new() -> Self {
        LoadAdjuster {
            config: AutoregulationConfig::default(),
        }
    }

    /// Create new load adjuster with custom configuration
    pub fn with_config(config: AutoregulationConfig) -> Self {
        LoadAdjuster { config }
    }

    pub fn config(&self) -> &AutoregulationConfig {
        &self.config
    }

    /// Adjust a planned session using today's recovery score
    pub fn adjust_session(
        &self,
        planned: &SessionPrescription,
        score: &RecoveryScore,
    ) -> SessionAdjustment {
        self.adjust_session_with_factor(planned, score.training_adjustment)
    }

    /// Adjust a planned session by an explicit factor
    ///
    /// Sets scale with the factor (at least one set), reps are untouched, and
    /// RPE moves up half a point above 1.0, holds down to the reduce threshold
    /// and drops a full point below it.
    pub fn adjust_session_with_factor(
        &self,
        planned: &SessionPrescription,
        factor: f64,
    ) -> SessionAdjustment {
        let sets = (planned.sets as f64 * factor).round().max(1.0) as u32;

        let (rpe, message) = if factor > 1.0 {
            (
                (planned.rpe + dec!(0.5)).min(self.config.max_rpe),
                "Well recovered: push slightly harder than planned",
            )
        } else if factor >= self.config.reduce_below_factor {
            (planned.rpe, "Recovery supports the planned session")
        } else {
            (
                (planned.rpe - dec!(1.0)).max(self.config.min_rpe),
                "Reduced session: fewer sets at lower effort",
            )
        };

        let adjusted = SessionPrescription::new(sets, planned.reps, rpe);
        debug!(factor, planned = %planned, adjusted = %adjusted, "Session adjusted");

        SessionAdjustment {
            planned: planned.clone(),
            adjusted,
            adjustment_factor: factor,
            message: message.to_string(),
        }
    }

    /// Recalculate the working load from the RPE of a completed set
    pub fn recalculate_load(
        &self,
        target_rpe: Decimal,
        actual_rpe: Decimal,
        current_load: Decimal,
    ) -> LoadRecommendation {
        let rpe_diff = actual_rpe - target_rpe;
        let adjustment_percent = rpe_diff * self.config.rpe_step_pct;
        let recommended_load = (current_load * (Decimal::ONE - adjustment_percent / dec!(100)))
            .max(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let direction = if adjustment_percent > Decimal::ZERO {
            LoadDirection::Decrease
        } else if adjustment_percent < Decimal::ZERO {
            LoadDirection::Increase
        } else {
            LoadDirection::Maintain
        };

        let message = match direction {
            LoadDirection::Decrease => format!(
                "Set felt harder than planned (RPE {} vs {}): reduce load by {}% to {}",
                actual_rpe, target_rpe, adjustment_percent, recommended_load
            ),
            LoadDirection::Increase => format!(
                "Set felt easier than planned (RPE {} vs {}): increase load by {}% to {}",
                actual_rpe,
                target_rpe,
                adjustment_percent.abs(),
                recommended_load
            ),
            LoadDirection::Maintain => format!("On target at RPE {}: keep {}", actual_rpe, current_load),
        };

        LoadRecommendation {
            target_rpe,
            actual_rpe,
            rpe_diff,
            adjustment_percent,
            current_load,
            recommended_load,
            direction,
            message,
        }
    }

    /// Velocity-loss check using the configured threshold
    pub fn check_velocity(&self, velocities: &[f64]) -> VelocityCheck {
        self.check_velocity_with_threshold(velocities, self.config.velocity_loss_threshold_pct)
    }

    /// Velocity-loss check against an explicit threshold (percent)
    ///
    /// Loss is measured against the fastest rep seen so far. The set stops at the
    /// first rep whose loss strictly exceeds the threshold.
    pub fn check_velocity_with_threshold(
        &self,
        velocities: &[f64],
        threshold_pct: f64,
    ) -> VelocityCheck {
        let insufficient = |message: &str| VelocityCheck {
            decision: VelocityDecision::InsufficientData,
            stop_now: false,
            stop_index: None,
            reps_completed: velocities.len(),
            max_velocity_loss_pct: 0.0,
            threshold_pct,
            message: message.to_string(),
        };

        if velocities.len() < 2 {
            return insufficient("At least two rep velocities are needed");
        }
        if velocities[0] <= 0.0 {
            return insufficient("First rep velocity must be positive");
        }

        let mut best = velocities[0];
        let mut max_loss = 0.0_f64;

        for (index, &velocity) in velocities.iter().enumerate() {
            best = best.max(velocity);
            let loss = (best - velocity) / best * 100.0;
            max_loss = max_loss.max(loss);

            if loss > threshold_pct {
                debug!(index, loss, threshold_pct, "Velocity loss threshold exceeded");
                return VelocityCheck {
                    decision: VelocityDecision::Stop,
                    stop_now: true,
                    stop_index: Some(index),
                    reps_completed: index,
                    max_velocity_loss_pct: max_loss,
                    threshold_pct,
                    message: format!(
                        "Stop the set: rep {} lost {:.1}% velocity (limit {:.0}%)",
                        index + 1,
                        loss,
                        threshold_pct
                    ),
                };
            }
        }

        VelocityCheck {
            decision: VelocityDecision::Continue,
            stop_now: false,
            stop_index: None,
            reps_completed: velocities.len(),
            max_velocity_loss_pct: max_loss,
            threshold_pct,
            message: format!(
                "Continue: max velocity loss {:.1}% (limit {:.0}%)",
                max_loss, threshold_pct
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::{ReadinessCalculator, ReadinessInputs};

    #[test]
    fn test_reduced_session() {
        let adjuster = LoadAdjuster::new();
        let planned = SessionPrescription::new(4, 8, dec!(8.0));

        let adjustment = adjuster.adjust_session_with_factor(&planned, 0.65);

        assert_eq!(adjustment.adjusted.sets, 3);
        assert_eq!(adjustment.adjusted.reps, 8);
        assert_eq!(adjustment.adjusted.rpe, dec!(7.0));
        assert_eq!(adjustment.sets_delta(), 1);
    }

    #[test]
    fn test_neutral_factor_is_identity() {
        let adjuster = LoadAdjuster::new();
        let planned = SessionPrescription::new(5, 5, dec!(8.5));

        let adjustment = adjuster.adjust_session_with_factor(&planned, 1.0);

        assert_eq!(adjustment.adjusted, planned);
    }

    #[test]
    fn test_rpe_bands() {
        let adjuster = LoadAdjuster::new();
        let planned = SessionPrescription::new(4, 6, dec!(9.8));

        let boosted = adjuster.adjust_session_with_factor(&planned, 1.15);
        assert_eq!(boosted.adjusted.rpe, dec!(10.0));
        assert_eq!(boosted.adjusted.sets, 5);

        let held = adjuster.adjust_session_with_factor(&planned, 0.9);
        assert_eq!(held.adjusted.rpe, dec!(9.8));

        let light = SessionPrescription::new(3, 10, dec!(5.5));
        let cut = adjuster.adjust_session_with_factor(&light, 0.5);
        assert_eq!(cut.adjusted.rpe, dec!(5.0));
        assert_eq!(cut.adjusted.sets, 2);
    }

    #[test]
    fn test_minimum_one_set() {
        let adjuster = LoadAdjuster::new();
        let planned = SessionPrescription::new(1, 5, dec!(7));

        assert_eq!(adjuster.adjust_session_with_factor(&planned, 0.1).adjusted.sets, 1);
        assert_eq!(adjuster.adjust_session_with_factor(&planned, 0.0).adjusted.sets, 1);
    }

    #[test]
    fn test_adjust_from_recovery_score() {
        let calculator = ReadinessCalculator::new();
        let score = calculator.calculate(&ReadinessInputs {
            sleep_quality: Some(3.0),
            subjective: Some(3.0),
            ..Default::default()
        });
        let planned = SessionPrescription::new(4, 8, dec!(8.0));

        let adjustment = LoadAdjuster::new().adjust_session(&planned, &score);

        assert_eq!(adjustment.adjustment_factor, score.training_adjustment);
        assert!(adjustment.adjusted.sets < planned.sets);
        assert_eq!(adjustment.adjusted.rpe, dec!(7.0));
    }

    #[test]
    fn test_rpe_feedback_harder_than_target() {
        let rec = LoadAdjuster::new().recalculate_load(dec!(8), dec!(9), dec!(100));

        assert_eq!(rec.rpe_diff, dec!(1));
        assert_eq!(rec.adjustment_percent, dec!(2.5));
        assert_eq!(rec.recommended_load, dec!(97.5));
        assert_eq!(rec.direction, LoadDirection::Decrease);
        assert!(rec.message.contains("reduce load"));
    }

    #[test]
    fn test_rpe_feedback_easier_than_target() {
        let rec = LoadAdjuster::new().recalculate_load(dec!(8), dec!(6.5), dec!(140));

        assert_eq!(rec.adjustment_percent, dec!(-3.75));
        assert_eq!(rec.recommended_load, dec!(145.25));
        assert_eq!(rec.direction, LoadDirection::Increase);
    }

    #[test]
    fn test_rpe_feedback_on_target() {
        let rec = LoadAdjuster::new().recalculate_load(dec!(7.5), dec!(7.5), dec!(80));
        assert_eq!(rec.recommended_load, dec!(80));
        assert_eq!(rec.direction, LoadDirection::Maintain);
    }

    #[test]
    fn test_velocity_stop_is_threshold_exact() {
        let check = LoadAdjuster::new().check_velocity(&[1.0, 0.95, 0.79]);

        assert_eq!(check.decision, VelocityDecision::Stop);
        assert!(check.stop_now);
        assert_eq!(check.stop_index, Some(2));
        assert_eq!(check.reps_completed, 2);
        assert!((check.max_velocity_loss_pct - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_continue() {
        let check = LoadAdjuster::new().check_velocity(&[0.82, 0.80, 0.76, 0.71]);

        assert_eq!(check.decision, VelocityDecision::Continue);
        assert!(!check.stop_now);
        assert_eq!(check.reps_completed, 4);
        assert!((check.max_velocity_loss_pct - (0.11 / 0.82 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_uses_fastest_rep() {
        // Second rep is fastest; loss is measured against it
        let check = LoadAdjuster::new().check_velocity_with_threshold(&[0.9, 1.0, 0.85], 10.0);

        assert_eq!(check.stop_index, Some(2));
        assert!((check.max_velocity_loss_pct - 15.0).abs() < 1e-9);

        // Against the first rep this would be a 1.25% loss; against the best it is 21%
        let check = LoadAdjuster::new().check_velocity(&[0.8, 1.0, 0.79]);
        assert_eq!(check.decision, VelocityDecision::Stop);
        assert_eq!(check.stop_index, Some(2));
        assert_eq!(check.reps_completed, 2);
    }

    #[test]
    fn test_velocity_insufficient_data() {
        let adjuster = LoadAdjuster::new();

        let check = adjuster.check_velocity(&[0.9]);
        assert_eq!(check.decision, VelocityDecision::InsufficientData);
        assert!(!check.stop_now);

        let check = adjuster.check_velocity(&[0.0, 0.5]);
        assert_eq!(check.decision, VelocityDecision::InsufficientData);
    }

    #[test]
    fn test_rpe_to_rir() {
        assert_eq!(rpe_to_rir(dec!(8)), dec!(2));
        assert_eq!(rpe_to_rir(dec!(6.5)), dec!(3.5));
        assert_eq!(rpe_to_rir(dec!(10)), dec!(0));
        assert_eq!(rpe_to_rir(dec!(10.5)), dec!(0));
    }
}
