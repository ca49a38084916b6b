use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::models::DailyLoad;
use crate::stats::{mean, population_std_dev};

/// Workload monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Acute window in days (default: 7)
    pub acute_days: usize,

    /// Chronic window in days (default: 28)
    pub chronic_days: usize,

    /// Lower bound of the safe ACWR zone
    pub safe_zone_low: f64,

    /// Upper bound of the safe ACWR zone
    pub safe_zone_high: f64,

    /// ACWR at or above which injury risk is high
    pub danger_threshold: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            acute_days: 7,
            chronic_days: 28,
            safe_zone_low: 0.8,
            safe_zone_high: 1.3,
            danger_threshold: 1.5,
        }
    }
}

/// ACWR interpretation ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcwrZone {
    Undertraining, // below 0.8
    Optimal,       // 0.8 to 1.3
    Caution,       // 1.3 to 1.5
    Danger,        // 1.5 and above
}

impl AcwrZone {
    /// Get zone from ACWR value
    pub fn from_acwr(acwr: f64, config: &WorkloadConfig) -> Self {
        if acwr >= config.danger_threshold {
            AcwrZone::Danger
        } else if acwr > config.safe_zone_high {
            AcwrZone::Caution
        } else if acwr >= config.safe_zone_low {
            AcwrZone::Optimal
        } else {
            AcwrZone::Undertraining
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AcwrZone::Undertraining => "Load well below recent norm (detraining risk)",
            AcwrZone::Optimal => "Load in the safe progression zone",
            AcwrZone::Caution => "Load rising faster than fitness (monitor closely)",
            AcwrZone::Danger => "Load spike with elevated injury risk",
        }
    }
}

impl fmt::Display for AcwrZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcwrZone::Undertraining => write!(f, "undertraining"),
            AcwrZone::Optimal => write!(f, "optimal"),
            AcwrZone::Caution => write!(f, "caution"),
            AcwrZone::Danger => write!(f, "danger"),
        }
    }
}

/// Acute/chronic workload metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueMetrics {
    /// Mean daily load over the acute window
    pub acute_load: f64,

    /// Mean daily load over the chronic window (or all available days)
    pub chronic_load: f64,

    /// Acute:chronic workload ratio
    pub acwr: f64,

    /// Acute mean / acute standard deviation
    pub monotony: f64,

    /// Acute weekly sum x monotony
    pub strain: f64,

    pub zone: AcwrZone,

    /// Number of daily values the chronic load was computed from
    pub chronic_days_used: usize,

    pub notes: Vec<String>,

    /// True when fewer than the acute window of values was supplied
    pub is_default: bool,
}

impl FatigueMetrics {
    /// Neutral metrics used when history is too short
    pub fn neutral(available: usize, required: usize) -> Self {
        FatigueMetrics {
            acute_load: 0.0,
            chronic_load: 0.0,
            acwr: 1.0,
            monotony: 1.0,
            strain: 0.0,
            zone: AcwrZone::Optimal,
            chronic_days_used: 0,
            notes: vec![format!(
                "Insufficient data: {} of {} daily loads needed; neutral workload assumed",
                available, required
            )],
            is_default: true,
        }
    }
}

/// Workload monitor computing ACWR, monotony and strain
#[derive(Debug, Clone, Default)]
pub struct WorkloadMonitor {
    config: WorkloadConfig,
}

impl WorkloadMonitor {
    /// Create new workload monitor with default configuration
    pub fn new() -> Self {
        WorkloadMonitor {
            config: WorkloadConfig::default(),
        }
    }

    /// Create new workload monitor with custom configuration
    pub fn with_config(config: WorkloadConfig) -> Self {
        WorkloadMonitor { config }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Calculate workload metrics from daily loads, oldest first
    pub fn calculate(&self, daily_loads: &[f64]) -> FatigueMetrics {
        let acute_days = self.config.acute_days.max(1);

        if daily_loads.len() < acute_days {
            warn!(
                available = daily_loads.len(),
                required = acute_days,
                "Insufficient load history, returning neutral workload"
            );
            return FatigueMetrics::neutral(daily_loads.len(), acute_days);
        }

        let acute_window = &daily_loads[daily_loads.len() - acute_days..];
        let chronic_days_used = daily_loads.len().min(self.config.chronic_days.max(acute_days));
        let chronic_window = &daily_loads[daily_loads.len() - chronic_days_used..];

        let acute_load = mean(acute_window);
        let chronic_load = mean(chronic_window);
        let acwr = if chronic_load > 0.0 {
            acute_load / chronic_load
        } else {
            1.0
        };

        let acute_std = population_std_dev(acute_window);
        let monotony = if acute_std > 0.0 {
            acute_load / acute_std
        } else {
            1.0
        };
        let strain = acute_window.iter().sum::<f64>() * monotony;
        let zone = AcwrZone::from_acwr(acwr, &self.config);

        let mut notes = Vec::new();
        if chronic_days_used < self.config.chronic_days {
            notes.push(format!(
                "Chronic load based on {} of {} days; ACWR is biased towards 1.0 early on",
                chronic_days_used, self.config.chronic_days
            ));
        }
        if zone == AcwrZone::Danger {
            warn!(acwr, "ACWR in danger zone");
        }

        debug!(
            acute = acute_load,
            chronic = chronic_load,
            acwr,
            monotony,
            strain,
            "Workload metrics calculated"
        );

        FatigueMetrics {
            acute_load,
            chronic_load,
            acwr,
            monotony,
            strain,
            zone,
            chronic_days_used,
            notes,
            is_default: false,
        }
    }

    /// Aggregate dated loads into a contiguous daily series (rest days = 0)
    pub fn aggregate_daily_loads(&self, loads: &[DailyLoad]) -> Vec<f64> {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for entry in loads {
            *by_date.entry(entry.date).or_insert(0.0) += entry.load;
        }

        let (Some(&first), Some(&last)) = (by_date.keys().next(), by_date.keys().next_back())
        else {
            return Vec::new();
        };

        first
            .iter_days()
            .take_while(|d| *d <= last)
            .map(|d| by_date.get(&d).copied().unwrap_or(0.0))
            .collect()
    }

    /// Calculate workload metrics from dated load records
    pub fn calculate_from_daily_loads(&self, loads: &[DailyLoad]) -> FatigueMetrics {
        let series = self.aggregate_daily_loads(loads);
        self.calculate(&series)
    }

    pub fn is_in_safe_zone(&self, metrics: &FatigueMetrics) -> bool {
        metrics.acwr >= self.config.safe_zone_low && metrics.acwr <= self.config.safe_zone_high
    }

    pub fn is_in_danger_zone(&self, metrics: &FatigueMetrics) -> bool {
        metrics.acwr >= self.config.danger_threshold
    }

    /// Generate load management recommendations
    pub fn recommendations(&self, metrics: &FatigueMetrics) -> Vec<String> {
        let mut recommendations = Vec::new();

        if metrics.is_default {
            recommendations
                .push("Log at least a week of training to enable load monitoring".to_string());
            return recommendations;
        }

        match metrics.zone {
            AcwrZone::Undertraining => recommendations
                .push("Load is well below your recent norm; build back up gradually".to_string()),
            AcwrZone::Optimal => {
                recommendations.push("Load is in the safe zone; continue progression".to_string())
            }
            AcwrZone::Caution => recommendations
                .push("Load is climbing quickly; hold volume steady this week".to_string()),
            AcwrZone::Danger => recommendations
                .push("Load spike detected; reduce volume until ACWR drops below 1.3".to_string()),
        }

        if metrics.monotony > 2.0 {
            recommendations.push(
                "Training is very monotonous; vary session difficulty across the week"
                    .to_string(),
            );
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_history() {
        let monitor = WorkloadMonitor::new();
        let loads = vec![100.0; 28];

        let metrics = monitor.calculate(&loads);

        assert_eq!(metrics.acute_load, 100.0);
        assert_eq!(metrics.chronic_load, 100.0);
        assert_eq!(metrics.acwr, 1.0);
        assert_eq!(metrics.monotony, 1.0);
        assert_eq!(metrics.strain, 700.0);
        assert_eq!(metrics.zone, AcwrZone::Optimal);
        assert!(!metrics.is_default);
        assert!(metrics.notes.is_empty());
    }

    #[test]
    fn test_insufficient_history() {
        let metrics = WorkloadMonitor::new().calculate(&[100.0, 120.0, 80.0]);

        assert!(metrics.is_default);
        assert_eq!(metrics.acwr, 1.0);
        assert!(metrics.notes[0].contains("3 of 7"));
    }

    #[test]
    fn test_zero_chronic_load() {
        let metrics = WorkloadMonitor::new().calculate(&[0.0; 14]);
        assert_eq!(metrics.acwr, 1.0);
        assert_eq!(metrics.monotony, 1.0);
        assert_eq!(metrics.strain, 0.0);
    }

    #[test]
    fn test_load_spike_danger() {
        let monitor = WorkloadMonitor::new();
        let mut loads = vec![50.0; 21];
        loads.extend(vec![150.0; 7]);

        let metrics = monitor.calculate(&loads);

        // acute 150, chronic (21*50 + 7*150)/28 = 75
        assert!((metrics.acwr - 2.0).abs() < 1e-9);
        assert_eq!(metrics.zone, AcwrZone::Danger);
        assert!(monitor.is_in_danger_zone(&metrics));
        assert!(!monitor.is_in_safe_zone(&metrics));
    }

    #[test]
    fn test_chronic_window_capped() {
        let monitor = WorkloadMonitor::new();
        let mut loads = vec![1000.0; 10]; // outside the 28-day window
        loads.extend(vec![100.0; 28]);

        let metrics = monitor.calculate(&loads);

        assert_eq!(metrics.chronic_days_used, 28);
        assert_eq!(metrics.chronic_load, 100.0);
    }

    #[test]
    fn test_short_history_flags_chronic_bias() {
        let monitor = WorkloadMonitor::new();
        let loads = vec![60.0, 80.0, 70.0, 90.0, 100.0, 50.0, 110.0, 120.0, 130.0, 140.0];

        let metrics = monitor.calculate(&loads);

        assert_eq!(metrics.chronic_days_used, 10);
        // With only 10 days the chronic mean includes most of the acute week
        assert!(metrics.acwr > 1.0 && metrics.acwr < 1.3);
        assert!(metrics.notes[0].contains("biased towards 1.0"));
    }

    #[test]
    fn test_monotony_and_strain() {
        let monitor = WorkloadMonitor::new();
        let loads = [100.0, 0.0, 100.0, 0.0, 100.0, 0.0, 100.0];

        let metrics = monitor.calculate(&loads);

        let acute_mean = 400.0 / 7.0;
        let std = population_std_dev(&loads);
        assert!((metrics.monotony - acute_mean / std).abs() < 1e-9);
        assert!((metrics.strain - 400.0 * metrics.monotony).abs() < 1e-9);
    }

    #[test]
    fn test_zone_boundaries() {
        let config = WorkloadConfig::default();
        assert_eq!(AcwrZone::from_acwr(0.79, &config), AcwrZone::Undertraining);
        assert_eq!(AcwrZone::from_acwr(0.8, &config), AcwrZone::Optimal);
        assert_eq!(AcwrZone::from_acwr(1.3, &config), AcwrZone::Optimal);
        assert_eq!(AcwrZone::from_acwr(1.31, &config), AcwrZone::Caution);
        assert_eq!(AcwrZone::from_acwr(1.5, &config), AcwrZone::Danger);
    }

    #[test]
    fn test_aggregate_daily_loads_fills_rest_days() {
        let monitor = WorkloadMonitor::new();
        let d = |day| NaiveDate::from_ymd_opt(2024, 9, day).unwrap();
        let loads = vec![
            DailyLoad::new(d(1), 50.0),
            DailyLoad::new(d(1), 30.0),
            DailyLoad::new(d(4), 100.0),
        ];

        let series = monitor.aggregate_daily_loads(&loads);

        assert_eq!(series, vec![80.0, 0.0, 0.0, 100.0]);
        assert!(monitor.aggregate_daily_loads(&[]).is_empty());
    }

    #[test]
    fn test_recommendations() {
        let monitor = WorkloadMonitor::new();
        let mut loads = vec![50.0; 21];
        loads.extend(vec![150.0; 7]);

        let recommendations = monitor.recommendations(&monitor.calculate(&loads));
        assert!(recommendations[0].contains("Load spike"));

        let neutral = monitor.recommendations(&FatigueMetrics::neutral(2, 7));
        assert_eq!(neutral.len(), 1);
    }
}
