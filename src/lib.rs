//! LoadRS: adaptive training load engine
//!
//! HRV trend analysis, composite readiness scoring, acute:chronic workload
//! monitoring, multi-week periodization and autoregulated session adjustment.

pub mod autoregulation;
pub mod config;
pub mod engine;
pub mod error;
pub mod hrv_trend;
pub mod import;
pub mod logging;
pub mod models;
pub mod periodization;
pub mod readiness;
pub mod stats;
pub mod workload;

// Re-export commonly used types for convenience
pub use autoregulation::{
    rpe_to_rir, LoadAdjuster, LoadDirection, LoadRecommendation, SessionAdjustment,
    VelocityCheck, VelocityDecision,
};
pub use config::EngineConfig;
pub use engine::{AthleteDay, DailyDecision, TrainingLoadEngine};
pub use error::{LoadRsError, PreconditionError, Result};
pub use hrv_trend::{
    Baseline, HrvTrendAnalyzer, OvertrainingMarkers, OvertrainingRisk, RecoveryAssessment,
    RecoveryState,
};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use periodization::{
    BlockType, PeriodizationBlock, PeriodizationModel, PeriodizationPlan, PeriodizationPlanner,
    TrainingGoal, VolumeIntensityTarget,
};
pub use readiness::{ReadinessCalculator, ReadinessInputs, RecoveryCategory, RecoveryScore};
pub use workload::{AcwrZone, FatigueMetrics, WorkloadMonitor};
