use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use loadrs::config::EngineConfig;
use loadrs::engine::{AthleteDay, DailyDecision, TrainingLoadEngine};
use loadrs::error::LoadRsError;
use loadrs::hrv_trend::{OvertrainingRisk, RecoveryAssessment, RecoveryState};
use loadrs::import::DataImporter;
use loadrs::logging::{init_logging, log_error};
use loadrs::models::{BiosignalSample, SessionPrescription};
use loadrs::periodization::{PeriodizationModel, PeriodizationPlan, TrainingGoal};
use loadrs::readiness::{ReadinessInputs, RecoveryCategory, RecoveryScore, RestingHeartRate};
use loadrs::workload::{AcwrZone, FatigueMetrics};

/// LoadRS - Adaptive Training Load CLI
///
/// Turns HRV, wellness and training-load history into today's training decision.
#[derive(Parser)]
#[command(name = "loadrs")]
#[command(version)]
#[command(about = "Adaptive training load engine", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of log output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Default)]
struct WellnessArgs {
    /// Sleep quality rating (0-10)
    #[arg(long)]
    sleep_quality: Option<f64>,

    /// Hours slept
    #[arg(long)]
    sleep_hours: Option<f64>,

    /// Resting heart rate this morning (bpm)
    #[arg(long, requires = "baseline_hr")]
    resting_hr: Option<f64>,

    /// Usual resting heart rate (bpm)
    #[arg(long, requires = "resting_hr")]
    baseline_hr: Option<f64>,

    /// Subjective readiness (1-10)
    #[arg(long)]
    subjective: Option<f64>,
}

impl WellnessArgs {
    fn to_inputs(&self) -> ReadinessInputs {
        ReadinessInputs {
            hrv: None,
            sleep_quality: self.sleep_quality,
            sleep_hours: self.sleep_hours,
            resting_hr: self.resting_hr.zip(self.baseline_hr).map(|(current, baseline)| {
                RestingHeartRate {
                    current_bpm: current,
                    baseline_bpm: baseline,
                }
            }),
            subjective: self.subjective,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze HRV trend and overtraining markers
    Trend {
        /// HRV samples (CSV or JSON)
        #[arg(short, long)]
        samples: PathBuf,
    },

    /// Compute the composite readiness score
    Readiness {
        /// HRV samples (CSV or JSON)
        #[arg(short, long)]
        samples: Option<PathBuf>,

        #[command(flatten)]
        wellness: WellnessArgs,
    },

    /// Acute:chronic workload ratio, monotony and strain
    Workload {
        /// Daily loads (CSV or JSON)
        #[arg(short, long)]
        loads: PathBuf,
    },

    /// Generate a periodized program
    Plan {
        /// Program length in weeks
        #[arg(short, long, default_value_t = 12)]
        weeks: u32,

        /// Periodization model (linear, block, undulating-weekly, undulating-daily)
        #[arg(short, long, default_value = "linear")]
        model: PeriodizationModel,

        /// Training goal (strength, hypertrophy, power)
        #[arg(short, long, default_value = "strength")]
        goal: TrainingGoal,

        /// Deload every N weeks (linear model)
        #[arg(short, long, default_value_t = 4)]
        deload_frequency: u32,
    },

    /// Adjust a planned session by a readiness factor
    Adjust {
        #[arg(long)]
        sets: u32,

        #[arg(long)]
        reps: u32,

        /// Planned RPE
        #[arg(long)]
        rpe: Decimal,

        /// Readiness adjustment factor (0.5-1.2)
        #[arg(long)]
        factor: f64,
    },

    /// Recalculate load from the RPE of a completed set
    Rpe {
        /// Planned RPE
        #[arg(long)]
        target: Decimal,

        /// RPE reported for the set
        #[arg(long)]
        actual: Decimal,

        /// Load used for the set
        #[arg(long)]
        load: Decimal,
    },

    /// Decide whether to end a set from rep velocities
    Velocity {
        /// Rep velocities in m/s, comma separated, first rep first
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        velocities: Vec<f64>,

        /// Velocity loss threshold in percent
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Full daily decision from HRV, wellness and load history
    Daily {
        /// HRV samples (CSV or JSON)
        #[arg(short, long)]
        samples: Option<PathBuf>,

        /// Daily loads (CSV or JSON)
        #[arg(short, long)]
        loads: Option<PathBuf>,

        #[command(flatten)]
        wellness: WellnessArgs,

        /// Planned sets
        #[arg(long, requires_all = ["reps", "rpe"])]
        sets: Option<u32>,

        /// Planned reps
        #[arg(long)]
        reps: Option<u32>,

        /// Planned RPE
        #[arg(long)]
        rpe: Option<Decimal>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    let engine = TrainingLoadEngine::with_config(&config);

    if let Err(e) = run(cli, &engine, config) {
        if let Some(load_error) = e.downcast_ref::<LoadRsError>() {
            log_error(load_error);
            eprintln!("{} {}", "Error:".red().bold(), load_error.user_message());
            std::process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}

fn run(cli: Cli, engine: &TrainingLoadEngine, mut config: EngineConfig) -> Result<()> {
    let importer = DataImporter::new();
    let json = cli.json;

    match cli.command {
        Commands::Trend { samples } => {
            let samples = importer.load_samples(&samples)?;
            let assessment = engine.trend_analyzer().analyze(&samples);
            let markers = engine.trend_analyzer().detect_overtraining(&samples);

            if json {
                print_json(&serde_json::json!({
                    "assessment": assessment,
                    "overtraining": markers,
                }))?;
            } else {
                print_assessment(&assessment);
                println!();
                println!("{}", "Overtraining markers".cyan().bold());
                println!("  Risk: {}", colorize_risk(markers.risk_level));
                if let Some(change) = markers.week_over_week_change_pct {
                    println!("  Week over week: {:+.1}%", change);
                }
                for note in &markers.notes {
                    println!("  • {}", note);
                }
            }
        }

        Commands::Readiness { samples, wellness } => {
            let mut inputs = wellness.to_inputs();
            if let Some(path) = samples {
                let samples = importer.load_samples(&path)?;
                let assessment = engine.trend_analyzer().analyze(&samples);
                inputs.hrv = loadrs::readiness::HrvReading::from_assessment(&assessment);
            }
            let score = engine.readiness_calculator().calculate(&inputs);

            if json {
                print_json(&score)?;
            } else {
                print_readiness(&score);
            }
        }

        Commands::Workload { loads } => {
            let series = importer
                .load_daily_loads(&loads)?
                .into_series(engine.workload_monitor());
            let metrics = engine.workload_monitor().calculate(&series);

            if json {
                print_json(&metrics)?;
            } else {
                print_workload(&metrics);
                for recommendation in engine.workload_monitor().recommendations(&metrics) {
                    println!("  → {}", recommendation);
                }
            }
        }

        Commands::Plan {
            weeks,
            model,
            goal,
            deload_frequency,
        } => {
            let plan = engine
                .planner()
                .generate(model, goal, weeks, deload_frequency)?;

            if json {
                print_json(&plan)?;
            } else {
                print_plan(&plan);
            }
        }

        Commands::Adjust {
            sets,
            reps,
            rpe,
            factor,
        } => {
            let planned = SessionPrescription::new(sets, reps, rpe);
            let adjustment = engine
                .load_adjuster()
                .adjust_session_with_factor(&planned, factor);

            if json {
                print_json(&adjustment)?;
            } else {
                println!("{}", "Session adjustment".green().bold());
                println!("  Planned:  {}", adjustment.planned);
                println!("  Adjusted: {}", adjustment.adjusted.to_string().bold());
                println!("  Reps in reserve: {}", adjustment.adjusted.reps_in_reserve());
                println!("  {}", adjustment.message.dimmed());
            }
        }

        Commands::Rpe {
            target,
            actual,
            load,
        } => {
            let recommendation = engine.load_adjuster().recalculate_load(target, actual, load);

            if json {
                print_json(&recommendation)?;
            } else {
                println!("{}", "Load recalculation".green().bold());
                println!(
                    "  Next set: {} ({})",
                    recommendation.recommended_load.to_string().bold(),
                    recommendation.direction
                );
                println!("  {}", recommendation.message.dimmed());
            }
        }

        Commands::Velocity {
            velocities,
            threshold,
        } => {
            let adjuster = engine.load_adjuster();
            let check = match threshold {
                Some(threshold) => adjuster.check_velocity_with_threshold(&velocities, threshold),
                None => adjuster.check_velocity(&velocities),
            };

            if json {
                print_json(&check)?;
            } else if check.stop_now {
                println!("{} {}", "STOP".red().bold(), check.message);
            } else {
                println!("{} {}", check.decision.to_string().green().bold(), check.message);
            }
        }

        Commands::Daily {
            samples,
            loads,
            wellness,
            sets,
            reps,
            rpe,
        } => {
            let samples: Vec<BiosignalSample> = match samples {
                Some(path) => importer.load_samples(&path)?,
                None => Vec::new(),
            };
            let daily_loads = match loads {
                Some(path) => importer
                    .load_daily_loads(&path)?
                    .into_series(engine.workload_monitor()),
                None => Vec::new(),
            };
            let planned = match (sets, reps, rpe) {
                (Some(sets), Some(reps), Some(rpe)) => {
                    Some(SessionPrescription::new(sets, reps, rpe))
                }
                _ => None,
            };

            let day = AthleteDay {
                athlete_id: "cli".to_string(),
                samples,
                daily_loads,
                wellness: wellness.to_inputs(),
                planned,
            };
            let decision = engine.daily_decision(&day);

            if json {
                print_json(&decision)?;
            } else {
                print_decision(&decision);
            }
        }

        Commands::InitConfig { force } => {
            let path = EngineConfig::default_config_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            config.save_to_file(&path)?;
            print_saved(&path);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_saved(path: &Path) {
    println!("{} {}", "✓ Configuration written to".green(), path.display());
}

fn colorize_state(state: RecoveryState) -> ColoredString {
    let text = state.to_string();
    match state {
        RecoveryState::Excellent | RecoveryState::Good => text.green(),
        RecoveryState::Normal => text.normal(),
        RecoveryState::Fatigued => text.yellow(),
        RecoveryState::VeryFatigued => text.red(),
    }
}

fn colorize_category(category: RecoveryCategory) -> ColoredString {
    let text = category.to_string();
    match category {
        RecoveryCategory::Excellent | RecoveryCategory::Good => text.green(),
        RecoveryCategory::Moderate => text.yellow(),
        RecoveryCategory::Poor | RecoveryCategory::Critical => text.red(),
    }
}

fn colorize_risk(risk: OvertrainingRisk) -> ColoredString {
    let text = risk.to_string();
    match risk {
        OvertrainingRisk::Low => text.green(),
        OvertrainingRisk::Moderate => text.yellow(),
        OvertrainingRisk::High => text.red().bold(),
    }
}

fn colorize_zone(zone: AcwrZone) -> ColoredString {
    let text = zone.to_string();
    match zone {
        AcwrZone::Optimal => text.green(),
        AcwrZone::Undertraining | AcwrZone::Caution => text.yellow(),
        AcwrZone::Danger => text.red().bold(),
    }
}

fn print_assessment(assessment: &RecoveryAssessment) {
    println!("{}", "HRV recovery assessment".cyan().bold());
    println!("  Current RMSSD: {:.1} ms", assessment.current_value);
    if let Some(baseline) = &assessment.baseline {
        println!(
            "  Baseline: {:.1} ± {:.1} ms ({:+.1}%)",
            baseline.mean, baseline.stddev, assessment.percent_from_baseline
        );
    }
    println!(
        "  State: {} for {} day(s), trend {}",
        colorize_state(assessment.state),
        assessment.days_in_state,
        assessment.trend_direction
    );
    println!("  Confidence: {:.0}%", assessment.confidence * 100.0);
    println!("  → {}", assessment.recommendation_text);
    for note in &assessment.notes {
        println!("  • {}", note.dimmed());
    }
}

fn print_readiness(score: &RecoveryScore) {
    println!("{}", "Readiness".cyan().bold());
    println!(
        "  Composite: {:.1} ({}) from {} component(s)",
        score.composite_score,
        colorize_category(score.category),
        score.components_present
    );
    println!("  Training adjustment: ×{:.2}", score.training_adjustment);
    println!("  Intensity: {}", score.intensity_recommendation);
    println!("  Volume: {}", score.volume_recommendation);
    for note in &score.notes {
        println!("  • {}", note.dimmed());
    }
}

fn print_workload(metrics: &FatigueMetrics) {
    println!("{}", "Workload".cyan().bold());
    println!(
        "  Acute: {:.1}  Chronic: {:.1}  ACWR: {:.2} ({})",
        metrics.acute_load,
        metrics.chronic_load,
        metrics.acwr,
        colorize_zone(metrics.zone)
    );
    println!("  Monotony: {:.2}  Strain: {:.0}", metrics.monotony, metrics.strain);
    for note in &metrics.notes {
        println!("  • {}", note.dimmed());
    }
}

#[derive(Tabled)]
struct BlockRow {
    #[tabled(rename = "#")]
    number: u32,
    #[tabled(rename = "Block")]
    block_type: String,
    #[tabled(rename = "Weeks")]
    weeks: String,
    #[tabled(rename = "Sets")]
    sets: String,
    #[tabled(rename = "Reps")]
    reps: String,
    #[tabled(rename = "%1RM")]
    percent_1rm: String,
    #[tabled(rename = "RPE")]
    rpe: String,
}

fn print_plan(plan: &PeriodizationPlan) {
    println!(
        "{} {} {} program, {} weeks",
        "Periodization:".cyan().bold(),
        plan.model,
        plan.goal,
        plan.total_weeks
    );

    let rows: Vec<BlockRow> = plan
        .blocks
        .iter()
        .map(|block| {
            let target = &block.volume_intensity_target;
            BlockRow {
                number: block.block_number,
                block_type: block.block_type.to_string(),
                weeks: if block.duration_weeks == 1 {
                    block.start_week.to_string()
                } else {
                    format!("{}-{}", block.start_week, block.end_week())
                },
                sets: target.sets.to_string(),
                reps: target.reps.to_string(),
                percent_1rm: target.percent_1rm.to_string(),
                rpe: target.rpe.to_string(),
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("Deload weeks: {:?}", plan.deload_weeks());
    println!("{}", format!("Plan id: {}", plan.id).dimmed());
}

fn print_decision(decision: &DailyDecision) {
    print_assessment(&decision.assessment);
    println!();
    print_readiness(&decision.readiness);
    println!();
    print_workload(&decision.workload);
    println!();

    println!("{}", "Today's session".green().bold());
    println!(
        "  Applied factor: ×{:.2}{}",
        decision.applied_factor,
        if decision.safety_capped {
            " (capped by safety check)".red().to_string()
        } else {
            String::new()
        }
    );
    match &decision.adjustment {
        Some(adjustment) => {
            println!("  Planned:  {}", adjustment.planned);
            println!("  Adjusted: {}", adjustment.adjusted.to_string().bold());
        }
        None => println!("  No planned session supplied"),
    }

    for warning in &decision.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }
}
