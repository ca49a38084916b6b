//! CSV and JSON loaders for HRV samples and daily training loads

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::models::{BiosignalSample, DailyLoad};
use crate::workload::WorkloadMonitor;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            other => Err(ImportError::UnsupportedFormat {
                format: if other.is_empty() {
                    "(none)".to_string()
                } else {
                    other.to_string()
                },
            }
            .into()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::Json => "json",
        }
    }
}

/// Training load history as found in a file
#[derive(Debug, Clone, PartialEq)]
pub enum LoadHistory {
    /// Dated records, possibly with gaps or several entries per day
    Dated(Vec<DailyLoad>),
    /// Already one value per consecutive day
    Series(Vec<f64>),
}

impl LoadHistory {
    /// Flatten into one value per day, rest days as 0
    pub fn into_series(self, monitor: &WorkloadMonitor) -> Vec<f64> {
        match self {
            LoadHistory::Dated(loads) => monitor.aggregate_daily_loads(&loads),
            LoadHistory::Series(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LoadHistory::Dated(loads) => loads.len(),
            LoadHistory::Series(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLoads {
    Series(Vec<f64>),
    Dated(Vec<DailyLoad>),
}

/// Loader with flexible CSV column naming
pub struct DataImporter {
    column_mapping: HashMap<String, String>,
}

impl Default for DataImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DataImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(
            &mut column_mapping,
            "timestamp",
            &["timestamp", "time", "datetime", "recorded_at", "measured_at"],
        );
        Self::add_mapping(&mut column_mapping, "date", &["date", "day"]);
        Self::add_mapping(&mut column_mapping, "rmssd_ms", &["rmssd_ms", "rmssd", "hrv"]);
        Self::add_mapping(&mut column_mapping, "sdnn_ms", &["sdnn_ms", "sdnn"]);
        Self::add_mapping(
            &mut column_mapping,
            "quality_score",
            &["quality_score", "quality", "signal_quality"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "load",
            &["load", "training_load", "tss", "srpe", "session_load"],
        );

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, standard: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    fn normalize_column_name(&self, name: &str) -> String {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");

        self.column_mapping
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    fn header_index(&self, headers: &StringRecord) -> HashMap<String, usize> {
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| (self.normalize_column_name(header), i))
            .collect()
    }

    /// Load HRV samples, sorted by timestamp
    pub fn load_samples(&self, path: &Path) -> Result<Vec<BiosignalSample>> {
        let format = InputFormat::from_path(path)?;
        let mut samples = match format {
            InputFormat::Csv => self.samples_from_csv(path)?,
            InputFormat::Json => {
                let content = fs::read_to_string(path)?;
                serde_json::from_str::<Vec<BiosignalSample>>(&content)
                    .map_err(|e| parse_error(format, path, e.to_string()))?
            }
        };

        if samples.is_empty() {
            return Err(ImportError::Empty {
                path: path.to_path_buf(),
            }
            .into());
        }

        // Stable sort keeps same-timestamp duplicates in file order
        samples.sort_by_key(|s| s.timestamp);
        info!(path = %path.display(), count = samples.len(), "Loaded HRV samples");
        Ok(samples)
    }

    /// Load daily training loads
    pub fn load_daily_loads(&self, path: &Path) -> Result<LoadHistory> {
        let format = InputFormat::from_path(path)?;
        let history = match format {
            InputFormat::Csv => self.loads_from_csv(path)?,
            InputFormat::Json => {
                let content = fs::read_to_string(path)?;
                match serde_json::from_str::<JsonLoads>(&content)
                    .map_err(|e| parse_error(format, path, e.to_string()))?
                {
                    JsonLoads::Series(values) => LoadHistory::Series(values),
                    JsonLoads::Dated(loads) => LoadHistory::Dated(loads),
                }
            }
        };

        if history.is_empty() {
            return Err(ImportError::Empty {
                path: path.to_path_buf(),
            }
            .into());
        }

        info!(path = %path.display(), count = history.len(), "Loaded training loads");
        Ok(history)
    }

    fn samples_from_csv(&self, path: &Path) -> Result<Vec<BiosignalSample>> {
        let format = InputFormat::Csv;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| parse_error(format, path, e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| parse_error(format, path, e.to_string()))?
            .clone();
        let columns = self.header_index(&headers);

        let (Some(&ts_col), Some(&rmssd_col)) =
            (columns.get("timestamp"), columns.get("rmssd_ms"))
        else {
            return Err(parse_error(
                format,
                path,
                "expected 'timestamp' and 'rmssd_ms' columns".to_string(),
            ));
        };
        let sdnn_col = columns.get("sdnn_ms").copied();
        let quality_col = columns.get("quality_score").copied();

        let mut samples = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| parse_error(format, path, e.to_string()))?;
            let line = row + 2;

            let timestamp = parse_datetime(record.get(ts_col).unwrap_or_default())
                .ok_or_else(|| parse_error(format, path, format!("line {}: bad timestamp", line)))?;
            let rmssd_ms = parse_number(record.get(rmssd_col))
                .ok_or_else(|| parse_error(format, path, format!("line {}: bad rmssd_ms", line)))?;

            let mut sample = BiosignalSample::new(timestamp, rmssd_ms);
            if let Some(sdnn) = sdnn_col.and_then(|c| parse_number(record.get(c))) {
                sample = sample.with_sdnn(sdnn);
            }
            if let Some(quality) = quality_col.and_then(|c| parse_number(record.get(c))) {
                sample = sample.with_quality(quality.clamp(0.0, 1.0));
            }
            samples.push(sample);
        }

        debug!(rows = samples.len(), "Parsed sample CSV");
        Ok(samples)
    }

    fn loads_from_csv(&self, path: &Path) -> Result<LoadHistory> {
        let format = InputFormat::Csv;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| parse_error(format, path, e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| parse_error(format, path, e.to_string()))?
            .clone();
        let columns = self.header_index(&headers);

        let Some(&load_col) = columns.get("load") else {
            return Err(parse_error(format, path, "expected a 'load' column".to_string()));
        };
        let date_col = columns
            .get("date")
            .or_else(|| columns.get("timestamp"))
            .copied();

        let mut dated = Vec::new();
        let mut series = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| parse_error(format, path, e.to_string()))?;
            let line = row + 2;

            // Blank load cells are rest days
            let load = match record.get(load_col).filter(|v| !v.is_empty()) {
                Some(_) => parse_number(record.get(load_col))
                    .ok_or_else(|| parse_error(format, path, format!("line {}: bad load", line)))?,
                None => 0.0,
            };

            match date_col {
                Some(col) => {
                    let date = parse_date(record.get(col).unwrap_or_default()).ok_or_else(|| {
                        parse_error(format, path, format!("line {}: bad date", line))
                    })?;
                    dated.push(DailyLoad::new(date, load));
                }
                None => series.push(load),
            }
        }

        Ok(match date_col {
            Some(_) => LoadHistory::Dated(dated),
            None => LoadHistory::Series(series),
        })
    }
}

fn parse_error(format: InputFormat, path: &Path, reason: String) -> crate::error::LoadRsError {
    ImportError::ParseError {
        format: format.name().to_string(),
        path: path.to_path_buf(),
        reason,
    }
    .into()
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    // A bare date is taken as midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    // Seconds since epoch
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| parse_datetime(value).map(|dt| dt.date_naive()))
}
