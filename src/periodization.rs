//! Multi-week periodization planning
//!
//! Partitions a training program into contiguous blocks (Accumulation,
//! Intensification, Realization, Deload), each carrying volume and intensity
//! targets. Planning is independent of day-to-day readiness: the plan says what
//! *should* happen, the load adjuster decides how much of it to deliver.
//!
//! # Models
//!
//! - **Linear**: phases follow the elapsed-week ratio (40% accumulation, 35%
//!   intensification, 25% realization) with a deload every `deload_frequency` weeks.
//! - **Block**: a goal-specific template repeated until the program is covered.
//! - **Undulating**: weekly alternation of accumulation and intensification, or
//!   daily variation inside intensification weeks, with a deload every 4th week.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LoadRsError, PreconditionError, Result};

/// Deload cadence used by the undulating models
const UNDULATING_DELOAD_FREQUENCY: u32 = 4;

/// Length of a wave-loading cycle in weeks
const WAVE_CYCLE_WEEKS: u32 = 3;

/// Training block phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Accumulation,
    Intensification,
    Realization,
    Deload,
}

impl BlockType {
    /// Base volume/intensity targets for this block type
    pub fn base_target(&self) -> VolumeIntensityTarget {
        match self {
            BlockType::Accumulation => VolumeIntensityTarget {
                sets: TargetRange::new(4, 6),
                reps: TargetRange::new(8, 12),
                percent_1rm: TargetRange::new(dec!(60), dec!(75)),
                rpe: TargetRange::new(dec!(6.5), dec!(8.0)),
            },
            BlockType::Intensification => VolumeIntensityTarget {
                sets: TargetRange::new(3, 5),
                reps: TargetRange::new(4, 8),
                percent_1rm: TargetRange::new(dec!(75), dec!(87)),
                rpe: TargetRange::new(dec!(7.5), dec!(9.0)),
            },
            BlockType::Realization => VolumeIntensityTarget {
                sets: TargetRange::new(2, 4),
                reps: TargetRange::new(1, 5),
                percent_1rm: TargetRange::new(dec!(85), dec!(95)),
                rpe: TargetRange::new(dec!(8.5), dec!(9.5)),
            },
            BlockType::Deload => VolumeIntensityTarget {
                sets: TargetRange::new(2, 3),
                reps: TargetRange::new(6, 10),
                percent_1rm: TargetRange::new(dec!(50), dec!(60)),
                rpe: TargetRange::new(dec!(5.0), dec!(6.5)),
            },
        }
    }

    pub fn focus(&self) -> &'static str {
        match self {
            BlockType::Accumulation => "Build work capacity with higher volume at moderate loads",
            BlockType::Intensification => "Raise intensity while trimming volume",
            BlockType::Realization => "Express peak strength with low volume and heavy loads",
            BlockType::Deload => "Reduce load to dissipate fatigue",
        }
    }

    /// Longest run of consecutive weeks in a linear-model block
    fn linear_max_weeks(&self) -> u32 {
        match self {
            BlockType::Accumulation | BlockType::Intensification => 3,
            BlockType::Realization => 2,
            BlockType::Deload => 1,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Accumulation => write!(f, "Accumulation"),
            BlockType::Intensification => write!(f, "Intensification"),
            BlockType::Realization => write!(f, "Realization"),
            BlockType::Deload => write!(f, "Deload"),
        }
    }
}

/// Training goal driving the block template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingGoal {
    Strength,
    Hypertrophy,
    Power,
}

impl TrainingGoal {
    /// Repeating block template as (block type, weeks)
    pub fn block_template(&self) -> &'static [(BlockType, u32)] {
        match self {
            TrainingGoal::Strength => &[
                (BlockType::Accumulation, 4),
                (BlockType::Intensification, 3),
                (BlockType::Realization, 2),
                (BlockType::Deload, 1),
            ],
            TrainingGoal::Hypertrophy => &[
                (BlockType::Accumulation, 5),
                (BlockType::Intensification, 2),
                (BlockType::Deload, 1),
            ],
            TrainingGoal::Power => &[
                (BlockType::Accumulation, 3),
                (BlockType::Intensification, 3),
                (BlockType::Realization, 2),
                (BlockType::Deload, 1),
            ],
        }
    }
}

impl FromStr for TrainingGoal {
    type Err = PreconditionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strength" => Ok(TrainingGoal::Strength),
            "hypertrophy" | "size" => Ok(TrainingGoal::Hypertrophy),
            "power" => Ok(TrainingGoal::Power),
            _ => Err(PreconditionError::UnknownGoal(s.to_string())),
        }
    }
}

impl fmt::Display for TrainingGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingGoal::Strength => write!(f, "strength"),
            TrainingGoal::Hypertrophy => write!(f, "hypertrophy"),
            TrainingGoal::Power => write!(f, "power"),
        }
    }
}

/// Periodization model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodizationModel {
    /// Accumulation → Intensification → Realization by elapsed-week ratio
    Linear,
    /// Goal-specific repeating block template
    Block,
    /// Accumulation and intensification alternate week by week
    UndulatingWeekly,
    /// Intensification weeks with heavy/moderate/light days
    UndulatingDaily,
}

impl PeriodizationModel {
    /// Whether the caller-supplied deload frequency drives the plan
    pub fn uses_deload_frequency(&self) -> bool {
        matches!(self, PeriodizationModel::Linear)
    }
}

impl FromStr for PeriodizationModel {
    type Err = PreconditionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "linear" => Ok(PeriodizationModel::Linear),
            "block" => Ok(PeriodizationModel::Block),
            "undulating" | "undulating-weekly" | "wup" => Ok(PeriodizationModel::UndulatingWeekly),
            "undulating-daily" | "dup" => Ok(PeriodizationModel::UndulatingDaily),
            _ => Err(PreconditionError::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for PeriodizationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodizationModel::Linear => write!(f, "linear"),
            PeriodizationModel::Block => write!(f, "block"),
            PeriodizationModel::UndulatingWeekly => write!(f, "undulating-weekly"),
            PeriodizationModel::UndulatingDaily => write!(f, "undulating-daily"),
        }
    }
}

/// Inclusive min/max range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRange<T> {
    pub min: T,
    pub max: T,
}

impl<T> TargetRange<T> {
    pub fn new(min: T, max: T) -> Self {
        TargetRange { min, max }
    }
}

impl<T: fmt::Display> fmt::Display for TargetRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Volume and intensity prescription for a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeIntensityTarget {
    pub sets: TargetRange<u32>,
    pub reps: TargetRange<u32>,
    pub percent_1rm: TargetRange<Decimal>,
    pub rpe: TargetRange<Decimal>,
}

impl VolumeIntensityTarget {
    /// Intensity and volume multipliers for a wave position (0, 1 or 2)
    pub fn wave_multipliers(position: u32) -> (Decimal, Decimal) {
        match position % WAVE_CYCLE_WEEKS {
            0 => (dec!(1.00), dec!(1.00)),
            1 => (dec!(1.05), dec!(0.95)),
            _ => (dec!(1.10), dec!(0.85)),
        }
    }

    /// Apply wave loading: intensity up, volume down
    ///
    /// RPE is capped at 10 and %1RM at 100. Set counts are rounded half away
    /// from zero and never drop below one.
    pub fn waved(&self, position: u32) -> Self {
        let (intensity, volume) = Self::wave_multipliers(position);

        let scale_sets = |sets: u32| -> u32 {
            (Decimal::from(sets) * volume)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u32()
                .unwrap_or(sets)
                .max(1)
        };

        VolumeIntensityTarget {
            sets: TargetRange::new(scale_sets(self.sets.min), scale_sets(self.sets.max)),
            reps: self.reps,
            percent_1rm: TargetRange::new(
                (self.percent_1rm.min * intensity).min(dec!(100)),
                (self.percent_1rm.max * intensity).min(dec!(100)),
            ),
            rpe: TargetRange::new(
                (self.rpe.min * intensity).min(dec!(10.0)),
                (self.rpe.max * intensity).min(dec!(10.0)),
            ),
        }
    }
}

/// One contiguous phase of a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodizationBlock {
    pub block_number: u32,
    pub block_type: BlockType,
    pub start_week: u32,
    pub duration_weeks: u32,
    pub volume_intensity_target: VolumeIntensityTarget,
    pub focus_text: String,
}

impl PeriodizationBlock {
    fn new(block_number: u32, block_type: BlockType, start_week: u32, duration_weeks: u32) -> Self {
        PeriodizationBlock {
            block_number,
            block_type,
            start_week,
            duration_weeks,
            volume_intensity_target: block_type.base_target(),
            focus_text: block_type.focus().to_string(),
        }
    }

    /// Last week covered by this block (inclusive)
    pub fn end_week(&self) -> u32 {
        self.start_week + self.duration_weeks - 1
    }

    pub fn contains_week(&self, week: u32) -> bool {
        week >= self.start_week && week <= self.end_week()
    }
}

/// A generated program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodizationPlan {
    pub id: Uuid,
    pub model: PeriodizationModel,
    pub goal: TrainingGoal,
    pub total_weeks: u32,
    pub deload_frequency: u32,
    pub blocks: Vec<PeriodizationBlock>,
    pub created_at: DateTime<Utc>,
}

impl PeriodizationPlan {
    /// Block covering a given week (1-based)
    pub fn block_for_week(&self, week: u32) -> Option<&PeriodizationBlock> {
        self.blocks.iter().find(|b| b.contains_week(week))
    }

    /// Targets for a week, falling back to Accumulation outside the program
    pub fn get_week_targets(&self, week: u32) -> VolumeIntensityTarget {
        match self.block_for_week(week) {
            Some(block) => block.volume_intensity_target.clone(),
            None => {
                warn!(
                    week,
                    total_weeks = self.total_weeks,
                    "Week outside program, using accumulation targets"
                );
                BlockType::Accumulation.base_target()
            }
        }
    }

    /// Targets for a week with wave loading applied inside its block
    pub fn get_week_targets_waved(&self, week: u32) -> VolumeIntensityTarget {
        match self.block_for_week(week) {
            Some(block) => block
                .volume_intensity_target
                .waved(week - block.start_week),
            None => self.get_week_targets(week),
        }
    }

    /// Weeks scheduled as deloads
    pub fn deload_weeks(&self) -> Vec<u32> {
        self.blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Deload)
            .flat_map(|b| b.start_week..=b.end_week())
            .collect()
    }

    /// Weeks assigned to each block type
    pub fn weeks_by_type(&self, block_type: BlockType) -> u32 {
        self.blocks
            .iter()
            .filter(|b| b.block_type == block_type)
            .map(|b| b.duration_weeks)
            .sum()
    }

    /// Check that blocks are contiguous and cover exactly 1..=total_weeks
    pub fn validate(&self) -> Result<()> {
        let mut expected_start = 1;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.duration_weeks == 0 {
                return Err(LoadRsError::Validation(format!(
                    "Block {} has zero duration",
                    block.block_number
                )));
            }
            if block.start_week != expected_start {
                return Err(LoadRsError::Validation(format!(
                    "Block {} starts at week {}, expected week {}",
                    block.block_number, block.start_week, expected_start
                )));
            }
            if block.block_number != index as u32 + 1 {
                return Err(LoadRsError::Validation(format!(
                    "Block at position {} is numbered {}",
                    index + 1,
                    block.block_number
                )));
            }
            expected_start = block.end_week() + 1;
        }

        if expected_start != self.total_weeks + 1 {
            return Err(LoadRsError::Validation(format!(
                "Blocks cover {} weeks, program has {}",
                expected_start - 1,
                self.total_weeks
            )));
        }

        Ok(())
    }
}

/// Periodization planner
#[derive(Debug, Clone, Default)]
pub struct PeriodizationPlanner;

impl PeriodizationPlanner {
    pub fn new() -> Self {
        PeriodizationPlanner
    }

    /// Generate a complete plan
    pub fn generate(
        &self,
        model: PeriodizationModel,
        goal: TrainingGoal,
        total_weeks: u32,
        deload_frequency: u32,
    ) -> Result<PeriodizationPlan> {
        let blocks = self.generate_blocks(model, goal, total_weeks, deload_frequency)?;

        let plan = PeriodizationPlan {
            id: Uuid::new_v4(),
            model,
            goal,
            total_weeks,
            deload_frequency,
            blocks,
            created_at: Utc::now(),
        };

        info!(
            plan_id = %plan.id,
            %model,
            %goal,
            total_weeks,
            blocks = plan.blocks.len(),
            "Generated periodization plan"
        );

        Ok(plan)
    }

    /// Generate the ordered block sequence for a model
    pub fn generate_blocks(
        &self,
        model: PeriodizationModel,
        goal: TrainingGoal,
        total_weeks: u32,
        deload_frequency: u32,
    ) -> Result<Vec<PeriodizationBlock>> {
        if total_weeks < 1 {
            return Err(PreconditionError::InvalidProgramLength { total_weeks }.into());
        }
        if model.uses_deload_frequency() && deload_frequency < 1 {
            return Err(PreconditionError::InvalidDeloadFrequency { deload_frequency }.into());
        }

        let blocks = match model {
            PeriodizationModel::Linear => Self::linear_blocks(total_weeks, deload_frequency),
            PeriodizationModel::Block => Self::template_blocks(goal, total_weeks),
            PeriodizationModel::UndulatingWeekly => Self::undulating_weekly_blocks(total_weeks),
            PeriodizationModel::UndulatingDaily => Self::undulating_daily_blocks(total_weeks),
        };

        debug!(%model, total_weeks, blocks = blocks.len(), "Block sequence built");
        Ok(blocks)
    }

    fn linear_phase(week: u32, total_weeks: u32) -> BlockType {
        let ratio = (week - 1) as f64 / total_weeks as f64;
        if ratio < 0.40 {
            BlockType::Accumulation
        } else if ratio < 0.75 {
            BlockType::Intensification
        } else {
            BlockType::Realization
        }
    }

    fn linear_blocks(total_weeks: u32, deload_frequency: u32) -> Vec<PeriodizationBlock> {
        let mut blocks: Vec<PeriodizationBlock> = Vec::new();

        for week in 1..=total_weeks {
            let block_type = if week % deload_frequency == 0 {
                BlockType::Deload
            } else {
                Self::linear_phase(week, total_weeks)
            };

            match blocks.last_mut() {
                Some(current)
                    if block_type != BlockType::Deload
                        && current.block_type == block_type
                        && current.duration_weeks < block_type.linear_max_weeks() =>
                {
                    current.duration_weeks += 1;
                }
                _ => {
                    let number = blocks.len() as u32 + 1;
                    blocks.push(PeriodizationBlock::new(number, block_type, week, 1));
                }
            }
        }

        blocks
    }

    fn template_blocks(goal: TrainingGoal, total_weeks: u32) -> Vec<PeriodizationBlock> {
        let mut blocks = Vec::new();
        let mut week = 1;

        for &(block_type, weeks) in goal.block_template().iter().cycle() {
            if week > total_weeks {
                break;
            }
            let duration = weeks.min(total_weeks - week + 1);
            let number = blocks.len() as u32 + 1;
            blocks.push(PeriodizationBlock::new(number, block_type, week, duration));
            week += duration;
        }

        blocks
    }

    fn undulating_weekly_blocks(total_weeks: u32) -> Vec<PeriodizationBlock> {
        (1..=total_weeks)
            .map(|week| {
                let block_type = if week % UNDULATING_DELOAD_FREQUENCY == 0 {
                    BlockType::Deload
                } else if week % 2 == 1 {
                    BlockType::Accumulation
                } else {
                    BlockType::Intensification
                };
                PeriodizationBlock::new(week, block_type, week, 1)
            })
            .collect()
    }

    fn undulating_daily_blocks(total_weeks: u32) -> Vec<PeriodizationBlock> {
        (1..=total_weeks)
            .map(|week| {
                if week % UNDULATING_DELOAD_FREQUENCY == 0 {
                    PeriodizationBlock::new(week, BlockType::Deload, week, 1)
                } else {
                    let mut block =
                        PeriodizationBlock::new(week, BlockType::Intensification, week, 1);
                    block.focus_text =
                        "Vary loading within the week: heavy, moderate and light sessions"
                            .to_string();
                    block
                }
            })
            .collect()
    }
}
