use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal_macros::dec;

use loadrs::engine::{AthleteDay, TrainingLoadEngine};
use loadrs::hrv_trend::HrvTrendAnalyzer;
use loadrs::models::{BiosignalSample, SessionPrescription};
use loadrs::periodization::{PeriodizationModel, PeriodizationPlanner, TrainingGoal};
use loadrs::readiness::ReadinessInputs;
use loadrs::workload::WorkloadMonitor;

/// Benchmarks for the daily decision pipeline
///
/// Sizes cover a single athlete's history up to a season of daily data,
/// and batches up to a full squad.

fn create_sample_series(days: usize) -> Vec<BiosignalSample> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 6, 30, 0).unwrap();
    (0..days)
        .map(|i| {
            let rmssd = 60.0 + 8.0 * ((i as f64) * 0.45).sin();
            BiosignalSample::new(start + Duration::days(i as i64), rmssd)
        })
        .collect()
}

fn create_load_series(days: usize) -> Vec<f64> {
    (0..days)
        .map(|i| if i % 7 == 6 { 0.0 } else { 80.0 + (i % 5) as f64 * 15.0 })
        .collect()
}

fn create_athlete_day(id: usize, days: usize) -> AthleteDay {
    AthleteDay {
        athlete_id: format!("athlete-{}", id),
        samples: create_sample_series(days),
        daily_loads: create_load_series(days),
        wellness: ReadinessInputs {
            sleep_quality: Some(7.0),
            sleep_hours: Some(7.5),
            subjective: Some(7.0),
            ..Default::default()
        },
        planned: Some(SessionPrescription::new(4, 6, dec!(8.0))),
    }
}

fn bench_trend_analysis(c: &mut Criterion) {
    let analyzer = HrvTrendAnalyzer::new();
    let mut group = c.benchmark_group("HRV Trend");

    for &days in &[7, 30, 90, 365] {
        let samples = create_sample_series(days);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("analyze", days), &samples, |b, samples| {
            b.iter(|| analyzer.analyze(black_box(samples)));
        });
        group.bench_with_input(
            BenchmarkId::new("detect_overtraining", days),
            &samples,
            |b, samples| {
                b.iter(|| analyzer.detect_overtraining(black_box(samples)));
            },
        );
    }

    group.finish();
}

fn bench_workload(c: &mut Criterion) {
    let monitor = WorkloadMonitor::new();
    let mut group = c.benchmark_group("Workload");

    for &days in &[28, 90, 365] {
        let loads = create_load_series(days);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("calculate", days), &loads, |b, loads| {
            b.iter(|| monitor.calculate(black_box(loads)));
        });
    }

    group.finish();
}

fn bench_daily_decision(c: &mut Criterion) {
    let engine = TrainingLoadEngine::new();
    let day = create_athlete_day(0, 60);

    c.bench_function("daily_decision_60_days", |b| {
        b.iter(|| engine.daily_decision(black_box(&day)));
    });
}

fn bench_batch_evaluation(c: &mut Criterion) {
    let engine = TrainingLoadEngine::new();
    let mut group = c.benchmark_group("Batch Evaluation");
    group.sample_size(20);

    for &athletes in &[10, 100, 500] {
        let days: Vec<AthleteDay> = (0..athletes).map(|i| create_athlete_day(i, 60)).collect();

        group.throughput(Throughput::Elements(athletes as u64));
        group.bench_with_input(
            BenchmarkId::new("evaluate_batch", athletes),
            &days,
            |b, days| {
                b.iter(|| engine.evaluate_batch(black_box(days)));
            },
        );
        group.bench_with_input(BenchmarkId::new("sequential", athletes), &days, |b, days| {
            b.iter(|| {
                days.iter()
                    .map(|day| engine.daily_decision(day))
                    .collect::<Vec<_>>()
            });
        });
    }

    group.finish();
}

fn bench_plan_generation(c: &mut Criterion) {
    let planner = PeriodizationPlanner::new();
    let mut group = c.benchmark_group("Plan Generation");

    for model in [
        PeriodizationModel::Linear,
        PeriodizationModel::Block,
        PeriodizationModel::UndulatingWeekly,
        PeriodizationModel::UndulatingDaily,
    ] {
        group.bench_function(BenchmarkId::new("generate_52_weeks", model), |b| {
            b.iter(|| planner.generate(model, TrainingGoal::Strength, black_box(52), 4));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_trend_analysis,
    bench_workload,
    bench_daily_decision,
    bench_batch_evaluation,
    bench_plan_generation
);
criterion_main!(benches);
