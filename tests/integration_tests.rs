use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

/// Integration tests that run complete daily and program workflows

#[cfg(test)]
mod integration_tests {
    use super::*;
    use loadrs::config::EngineConfig;
    use loadrs::engine::{AthleteDay, TrainingLoadEngine};
    use loadrs::models::{BiosignalSample, SessionPrescription};
    use loadrs::periodization::{BlockType, PeriodizationModel, TrainingGoal};
    use loadrs::readiness::ReadinessInputs;
    use loadrs::workload::AcwrZone;

    fn stable_samples(days: usize) -> Vec<BiosignalSample> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 6, 45, 0).unwrap();
        (0..days)
            .map(|i| {
                let rmssd = 55.0 + [0.0, 1.5, -1.0, 0.5, -1.5, 1.0, -0.5][i % 7];
                BiosignalSample::new(start + Duration::days(i as i64), rmssd)
            })
            .collect()
    }

    fn rested_wellness() -> ReadinessInputs {
        ReadinessInputs {
            sleep_quality: Some(8.0),
            sleep_hours: Some(8.0),
            subjective: Some(8.0),
            ..Default::default()
        }
    }

    /// Run the engine each morning as history accumulates
    #[test]
    fn test_daily_loop_as_history_grows() {
        let engine = TrainingLoadEngine::new();
        let all_samples = stable_samples(35);
        let all_loads: Vec<f64> = (0..35)
            .map(|i| if i % 7 == 6 { 0.0 } else { 120.0 })
            .collect();

        for day in 1..=35 {
            let athlete_day = AthleteDay {
                athlete_id: "athlete-7".to_string(),
                samples: all_samples[..day].to_vec(),
                daily_loads: all_loads[..day].to_vec(),
                wellness: rested_wellness(),
                planned: Some(SessionPrescription::new(4, 5, dec!(8.0))),
            };

            let decision = engine.daily_decision(&athlete_day);

            assert_eq!(decision.assessment.insufficient_data, day < 7, "day {}", day);
            assert_eq!(decision.workload.is_default, day < 7, "day {}", day);
            assert!((0.5..=1.2).contains(&decision.applied_factor));
            assert!((0.0..=100.0).contains(&decision.readiness.composite_score));

            let adjustment = decision.adjustment.expect("planned session supplied");
            assert!(adjustment.adjusted.sets >= 1);
            assert!(adjustment.adjusted.rpe <= dec!(10));

            if day >= 28 {
                // Steady weekly pattern keeps the ratio near 1.0
                assert_eq!(decision.workload.zone, AcwrZone::Optimal);
                assert!(!decision.safety_capped);
            }
        }
    }

    /// Plan a program, take each week's session and adjust it for readiness
    #[test]
    fn test_plan_to_adjusted_session_workflow() {
        let engine = TrainingLoadEngine::new();
        let plan = engine
            .planner()
            .generate(PeriodizationModel::Block, TrainingGoal::Hypertrophy, 10, 4)
            .unwrap();
        plan.validate().unwrap();

        let tired = engine.readiness_calculator().calculate(&ReadinessInputs {
            sleep_quality: Some(3.0),
            sleep_hours: Some(5.0),
            subjective: Some(3.0),
            ..Default::default()
        });
        assert!(tired.training_adjustment < 0.9);

        for week in 1..=plan.total_weeks {
            let planned = engine.planned_session(&plan, week, true);
            let adjustment = engine.load_adjuster().adjust_session(&planned, &tired);

            assert!(adjustment.adjusted.sets <= planned.sets, "week {}", week);
            assert!(adjustment.adjusted.sets >= 1);
            assert_eq!(adjustment.adjusted.reps, planned.reps);
            assert!(adjustment.adjusted.rpe < planned.rpe || planned.rpe <= dec!(5));
            assert!(adjustment.adjusted.rpe >= dec!(5));
        }

        // Deload weeks always prescribe less effort than the surrounding work
        for week in plan.deload_weeks() {
            let deload = engine.planned_session(&plan, week, false);
            let accumulation = BlockType::Accumulation.base_target();
            assert!(deload.rpe < accumulation.rpe.min);
        }
    }

    /// Settings from a config file reach every component
    #[test]
    fn test_config_file_drives_engine() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[safety]\nflagged_adjustment_cap = 0.75\n\n[workload]\ndanger_threshold = 1.4\n"
        )
        .unwrap();

        let config = EngineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.safety.flagged_adjustment_cap, 0.75);
        assert_eq!(config.workload.danger_threshold, 1.4);
        assert_eq!(config.workload.chronic_days, 28);

        let engine = TrainingLoadEngine::with_config(&config);

        // 21 days at 50 then 7 at 120: ACWR ≈ 1.75, danger under either threshold
        let mut loads = vec![50.0; 21];
        loads.extend(vec![120.0; 7]);
        let day = AthleteDay {
            athlete_id: "athlete-3".to_string(),
            samples: stable_samples(14),
            daily_loads: loads,
            wellness: ReadinessInputs {
                sleep_quality: Some(10.0),
                subjective: Some(10.0),
                ..Default::default()
            },
            planned: Some(SessionPrescription::new(4, 8, dec!(8.0))),
        };

        let decision = engine.daily_decision(&day);
        assert_eq!(decision.workload.zone, AcwrZone::Danger);
        assert!(decision.safety_capped);
        assert_eq!(decision.applied_factor, 0.75);
        assert_eq!(decision.adjustment.unwrap().adjusted.sets, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[workload]\nacute_days = 30\nchronic_days = 28\n").unwrap();

        assert!(EngineConfig::load_from_file(file.path()).is_err());
    }

    /// A squad evaluated in parallel matches sequential evaluation
    #[test]
    fn test_squad_batch_matches_sequential() {
        let engine = TrainingLoadEngine::new();
        let days: Vec<AthleteDay> = (0..40)
            .map(|i| AthleteDay {
                athlete_id: format!("athlete-{}", i),
                samples: stable_samples(7 + i % 14),
                daily_loads: vec![80.0 + i as f64; 28],
                wellness: rested_wellness(),
                planned: Some(SessionPrescription::new(3, 10, dec!(7.5))),
            })
            .collect();

        let batch = engine.evaluate_batch(&days);
        let sequential: Vec<_> = days.iter().map(|d| engine.daily_decision(d)).collect();

        assert_eq!(batch, sequential);
    }

    /// In-session tools used together: RPE-based load change, then velocity cut-off
    #[test]
    fn test_in_session_autoregulation() {
        let engine = TrainingLoadEngine::new();
        let adjuster = engine.load_adjuster();

        // First set felt harder than planned: drop the load
        let recommendation = adjuster.recalculate_load(dec!(8), dec!(9), dec!(140));
        assert_eq!(recommendation.recommended_load, dec!(136.50));

        // Second set: stop once velocity falls more than 20% below the best rep
        let velocities = [0.62, 0.64, 0.60, 0.57, 0.53, 0.50];
        let check = adjuster.check_velocity(&velocities);
        assert!(check.stop_now);
        assert_eq!(check.stop_index, Some(5));
        assert_eq!(check.reps_completed, 5);
    }
}
