//! Closed-loop daily decision engine
//!
//! Wires the five components together the way a session runner uses them:
//! biosignal trend → composite readiness → session adjustment, with the
//! workload monitor and overtraining markers acting as an independent safety
//! check that can cap the adjustment. All components are stateless, so one
//! engine can serve any number of athletes concurrently.

use rayon::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

use crate::autoregulation::{LoadAdjuster, SessionAdjustment};
use crate::config::{EngineConfig, SafetyConfig};
use crate::hrv_trend::{
    HrvTrendAnalyzer, OvertrainingMarkers, OvertrainingRisk, RecoveryAssessment,
};
use crate::models::{BiosignalSample, SessionPrescription};
use crate::periodization::{PeriodizationPlan, PeriodizationPlanner};
use crate::readiness::{HrvReading, ReadinessCalculator, ReadinessInputs, RecoveryScore};
use crate::workload::{AcwrZone, FatigueMetrics, WorkloadMonitor};

/// Everything known about one athlete on one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteDay {
    pub athlete_id: String,

    /// HRV history, oldest first
    pub samples: Vec<BiosignalSample>,

    /// Daily training loads, oldest first, rest days as 0
    pub daily_loads: Vec<f64>,

    /// Sleep, resting HR and subjective inputs; HRV is filled from `samples` when absent
    pub wellness: ReadinessInputs,

    /// Today's planned session, if any
    pub planned: Option<SessionPrescription>,
}

/// The engine's answer for one athlete-day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDecision {
    pub athlete_id: String,
    pub assessment: RecoveryAssessment,
    pub overtraining: OvertrainingMarkers,
    pub readiness: RecoveryScore,
    pub workload: FatigueMetrics,

    /// Factor actually applied after safety limits
    pub applied_factor: f64,

    /// True when a safety flag lowered the readiness factor
    pub safety_capped: bool,

    pub adjustment: Option<SessionAdjustment>,
    pub warnings: Vec<String>,
}

/// Training load engine
#[derive(Debug, Clone, Default)]
pub struct TrainingLoadEngine {
    trend: HrvTrendAnalyzer,
    readiness: ReadinessCalculator,
    workload: WorkloadMonitor,
    planner: PeriodizationPlanner,
    adjuster: LoadAdjuster,
    safety: SafetyConfig,
}

impl TrainingLoadEngine {
    /// Create new engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new engine from an engine configuration
    pub fn with_config(config: &EngineConfig) -> Self {
        TrainingLoadEngine {
            trend: HrvTrendAnalyzer::with_config(config.trend.clone()),
            readiness: ReadinessCalculator::with_config(config.readiness.clone()),
            workload: WorkloadMonitor::with_config(config.workload.clone()),
            planner: PeriodizationPlanner::new(),
            adjuster: LoadAdjuster::with_config(config.autoregulation.clone()),
            safety: config.safety.clone(),
        }
    }

    pub fn trend_analyzer(&self) -> &HrvTrendAnalyzer {
        &self.trend
    }

    pub fn readiness_calculator(&self) -> &ReadinessCalculator {
        &self.readiness
    }

    pub fn workload_monitor(&self) -> &WorkloadMonitor {
        &self.workload
    }

    pub fn planner(&self) -> &PeriodizationPlanner {
        &self.planner
    }

    pub fn load_adjuster(&self) -> &LoadAdjuster {
        &self.adjuster
    }

    /// Run the full daily loop for one athlete
    pub fn daily_decision(&self, day: &AthleteDay) -> DailyDecision {
        let span = info_span!("daily_decision", athlete = %day.athlete_id);
        let _guard = span.enter();

        let assessment = self.trend.analyze(&day.samples);
        let overtraining = self.trend.detect_overtraining(&day.samples);

        let mut inputs = day.wellness.clone();
        if inputs.hrv.is_none() {
            inputs.hrv = HrvReading::from_assessment(&assessment);
        }
        let readiness = self.readiness.calculate(&inputs);
        let workload = self.workload.calculate(&day.daily_loads);

        let mut warnings = Vec::new();
        if assessment.insufficient_data {
            warnings.extend(assessment.notes.iter().cloned());
        }
        if readiness.is_default {
            warnings.push("No readiness inputs available; neutral score used".to_string());
        }
        if workload.is_default {
            warnings.extend(workload.notes.iter().cloned());
        }

        let mut flags = Vec::new();
        if self.safety.cap_on_acwr_danger && workload.zone == AcwrZone::Danger {
            flags.push(format!("ACWR {:.2} is in the danger zone", workload.acwr));
        }
        if self.safety.cap_on_overtraining && overtraining.risk_level == OvertrainingRisk::High {
            flags.push("High overtraining risk from HRV markers".to_string());
        }
        if overtraining.risk_level == OvertrainingRisk::Moderate {
            warnings.push("Moderate overtraining risk: watch the next few days".to_string());
        }

        let mut applied_factor = readiness.training_adjustment;
        let mut safety_capped = false;
        if !flags.is_empty() && applied_factor > self.safety.flagged_adjustment_cap {
            applied_factor = self.safety.flagged_adjustment_cap;
            safety_capped = true;
            warn!(
                factor = readiness.training_adjustment,
                cap = applied_factor,
                "Safety flag capped the session"
            );
        }
        for flag in flags {
            warnings.push(format!(
                "{}; session capped at {:.2}",
                flag, self.safety.flagged_adjustment_cap
            ));
        }

        let adjustment = day
            .planned
            .as_ref()
            .map(|planned| self.adjuster.adjust_session_with_factor(planned, applied_factor));

        debug!(
            composite = readiness.composite_score,
            acwr = workload.acwr,
            applied_factor,
            safety_capped,
            "Daily decision made"
        );

        DailyDecision {
            athlete_id: day.athlete_id.clone(),
            assessment,
            overtraining,
            readiness,
            workload,
            applied_factor,
            safety_capped,
            adjustment,
            warnings,
        }
    }

    /// Evaluate many independent athlete-days in parallel, preserving order
    pub fn evaluate_batch(&self, days: &[AthleteDay]) -> Vec<DailyDecision> {
        days.par_iter().map(|day| self.daily_decision(day)).collect()
    }

    /// Planned session for a program week, using the middle of each target range
    pub fn planned_session(
        &self,
        plan: &PeriodizationPlan,
        week: u32,
        wave_loading: bool,
    ) -> SessionPrescription {
        let target = if wave_loading {
            plan.get_week_targets_waved(week)
        } else {
            plan.get_week_targets(week)
        };

        let sets = (target.sets.min + target.sets.max + 1) / 2;
        let reps = (target.reps.min + target.reps.max + 1) / 2;
        let rpe: Decimal = (target.rpe.min + target.rpe.max) / dec!(2);

        SessionPrescription::new(
            sets,
            reps,
            rpe.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periodization::{PeriodizationModel, TrainingGoal};
    use chrono::{Duration, TimeZone, Utc};

    fn daily_samples(values: &[f64]) -> Vec<BiosignalSample> {
        let start = Utc.with_ymd_and_hms(2024, 9, 1, 6, 30, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| BiosignalSample::new(start + Duration::days(i as i64), v))
            .collect()
    }

    fn recovered_day(daily_loads: Vec<f64>) -> AthleteDay {
        AthleteDay {
            athlete_id: "athlete-1".to_string(),
            samples: daily_samples(&[
                50.0, 52.0, 51.0, 49.0, 50.0, 51.0, 50.0, 50.0, 52.0, 51.0, 49.0, 50.0, 51.0, 60.0,
            ]),
            daily_loads,
            wellness: ReadinessInputs {
                sleep_quality: Some(10.0),
                subjective: Some(10.0),
                ..Default::default()
            },
            planned: Some(SessionPrescription::new(4, 8, dec!(8.0))),
        }
    }

    #[test]
    fn test_recovered_athlete_trains_harder() {
        let engine = TrainingLoadEngine::new();
        let decision = engine.daily_decision(&recovered_day(vec![100.0; 28]));

        assert!(decision.readiness.components.hrv.is_some());
        assert!((decision.readiness.composite_score - 100.0).abs() < 1e-9);
        assert!(!decision.safety_capped);
        assert!((decision.applied_factor - 1.15).abs() < 1e-6);

        let adjustment = decision.adjustment.unwrap();
        assert_eq!(adjustment.adjusted.sets, 5);
        assert_eq!(adjustment.adjusted.rpe, dec!(8.5));
        assert!(decision.warnings.is_empty());
    }

    #[test]
    fn test_load_spike_caps_session() {
        let engine = TrainingLoadEngine::new();
        let mut loads = vec![50.0; 21];
        loads.extend(vec![150.0; 7]);

        let decision = engine.daily_decision(&recovered_day(loads));

        assert_eq!(decision.workload.zone, AcwrZone::Danger);
        assert!(decision.safety_capped);
        assert_eq!(decision.applied_factor, 0.85);

        let adjustment = decision.adjustment.unwrap();
        assert_eq!(adjustment.adjusted.sets, 3);
        assert_eq!(adjustment.adjusted.rpe, dec!(7.0));
        assert!(decision.warnings.iter().any(|w| w.contains("danger zone")));
    }

    #[test]
    fn test_overtraining_caps_session() {
        let engine = TrainingLoadEngine::new();
        let mut day = recovered_day(vec![100.0; 28]);
        day.samples = daily_samples(&[
            60.0, 61.0, 59.0, 60.0, 62.0, 58.0, 60.0, 58.0, 55.0, 50.0, 45.0, 40.0, 38.0, 36.0,
        ]);
        // Subjective inputs say fine; the HRV markers disagree
        day.wellness.hrv = Some(HrvReading {
            state: crate::hrv_trend::RecoveryState::Good,
            percent_from_baseline: 0.0,
        });

        let decision = engine.daily_decision(&day);

        assert_eq!(decision.overtraining.risk_level, OvertrainingRisk::High);
        assert!(decision.safety_capped);
        assert!(decision.applied_factor <= 0.85);
    }

    #[test]
    fn test_empty_history_degrades_gracefully() {
        let engine = TrainingLoadEngine::new();
        let day = AthleteDay {
            athlete_id: "new-athlete".to_string(),
            planned: Some(SessionPrescription::new(4, 8, dec!(8.0))),
            ..Default::default()
        };

        let decision = engine.daily_decision(&day);

        assert!(decision.assessment.insufficient_data);
        assert!(decision.readiness.is_default);
        assert!(decision.workload.is_default);
        assert!(decision.warnings.len() >= 3);
        let adjustment = decision.adjustment.unwrap();
        assert_eq!(adjustment.adjusted.sets, 4);
        assert_eq!(adjustment.adjusted.rpe, dec!(8.0));
    }

    #[test]
    fn test_batch_preserves_order() {
        let engine = TrainingLoadEngine::new();
        let days: Vec<AthleteDay> = (0..16)
            .map(|i| {
                let mut day = recovered_day(vec![100.0; 28]);
                day.athlete_id = format!("athlete-{}", i);
                day
            })
            .collect();

        let decisions = engine.evaluate_batch(&days);

        assert_eq!(decisions.len(), 16);
        for (i, decision) in decisions.iter().enumerate() {
            assert_eq!(decision.athlete_id, format!("athlete-{}", i));
            assert_eq!(decision, &engine.daily_decision(&days[i]));
        }
    }

    #[test]
    fn test_planned_session_from_plan() {
        let engine = TrainingLoadEngine::new();
        let plan = engine
            .planner()
            .generate(PeriodizationModel::Linear, TrainingGoal::Strength, 12, 4)
            .unwrap();

        let session = engine.planned_session(&plan, 1, false);
        assert_eq!(session, SessionPrescription::new(5, 10, dec!(7.25)));

        let deload = engine.planned_session(&plan, 4, false);
        assert_eq!(deload, SessionPrescription::new(3, 8, dec!(5.75)));

        let waved = engine.planned_session(&plan, 3, true);
        assert_eq!(waved.sets, 4);
        assert_eq!(waved.rpe, dec!(7.98));
    }

    #[test]
    fn test_planned_session_rounds_half_away_from_zero() {
        let engine = TrainingLoadEngine::new();
        let plan = engine
            .planner()
            .generate(PeriodizationModel::Linear, TrainingGoal::Strength, 12, 4)
            .unwrap();

        // Second week of the intensification block: RPE midpoint is 8.6625
        let waved = engine.planned_session(&plan, 7, true);
        assert_eq!(waved, SessionPrescription::new(4, 6, dec!(8.67)));
    }

    #[test]
    fn test_with_config_applies_safety_cap() {
        let mut config = EngineConfig::default();
        config.safety.flagged_adjustment_cap = 0.7;
        let engine = TrainingLoadEngine::with_config(&config);
        let mut loads = vec![50.0; 21];
        loads.extend(vec![150.0; 7]);

        let decision = engine.daily_decision(&recovered_day(loads));
        assert_eq!(decision.applied_factor, 0.7);
    }
}
