//! Reading data model
//!
//! The size categories form a closed set shared by ingestion, aggregation and
//! trend computation. The small/large split is derived from the label text by
//! [`classify_label`], so every consumer applies the same parsing rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::HubError;

/// Node name used when a payload omits `node`
pub const DEFAULT_NODE: &str = "unknown-node";

/// Status used when a payload omits `status`
pub const DEFAULT_STATUS: &str = "unknown";

/// Largest count accepted for one category in one report
///
/// Keeps every per-node and per-bucket sum far inside `i64`.
pub const MAX_COUNT: i64 = u32::MAX as i64;

/// Largest size (mm) still classified as small
pub const SMALL_THRESHOLD_MM: f64 = 50.0;

/// Measured size bucket reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeCategory {
    #[serde(rename = "<30mm")]
    Under30,
    #[serde(rename = "30-50mm")]
    From30To50,
    #[serde(rename = "50-80mm")]
    From50To80,
    #[serde(rename = "80-150mm")]
    From80To150,
    #[serde(rename = ">150mm")]
    Over150,
}

impl SizeCategory {
    /// Every category, smallest first
    pub const ALL: [SizeCategory; 5] = [
        SizeCategory::Under30,
        SizeCategory::From30To50,
        SizeCategory::From50To80,
        SizeCategory::From80To150,
        SizeCategory::Over150,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SizeCategory::Under30 => "<30mm",
            SizeCategory::From30To50 => "30-50mm",
            SizeCategory::From50To80 => "50-80mm",
            SizeCategory::From80To150 => "80-150mm",
            SizeCategory::Over150 => ">150mm",
        }
    }

    /// Small/large class of this category's label
    pub fn class(self) -> SizeClass {
        classify_label(self.as_str())
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeCategory {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| HubError::InvalidCategory(s.to_string()))
    }
}

/// Coarse classification used by the weekly trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Large,
}

/// Classify a free-text size label as small or large
///
/// All integers embedded in the label are extracted. One number is compared
/// directly against the threshold, several numbers by their mean. A label
/// without any number is `Large`.
pub fn classify_label(label: &str) -> SizeClass {
    let numbers: Vec<f64> = label
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<f64>().ok())
        .collect();

    if numbers.is_empty() {
        return SizeClass::Large;
    }

    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    if mean <= SMALL_THRESHOLD_MM {
        SizeClass::Small
    } else {
        SizeClass::Large
    }
}

/// One stored row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub batch_id: Uuid,
    pub node: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub size_category: SizeCategory,
    pub count: i64,
}

/// Body of an ingest call as sent by a node
///
/// Counts are kept as raw JSON so that negative, fractional or non-numeric
/// values surface as `InvalidPayload` instead of a generic decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rock_stats: Option<BTreeMap<String, serde_json::Value>>,
}

impl IngestRequest {
    /// Parse a raw request body
    pub fn from_json_slice(body: &[u8]) -> Result<Self, HubError> {
        serde_json::from_slice(body)
            .map_err(|e| HubError::InvalidPayload(format!("Invalid JSON: {}", e)))
    }
}

/// Validated set of rows sharing node, status and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingBatch {
    batch_id: Uuid,
    node: String,
    status: String,
    timestamp: DateTime<Utc>,
    counts: BTreeMap<SizeCategory, i64>,
}

impl ReadingBatch {
    /// Validate a request and stamp it with the ingestion time
    ///
    /// Category errors take precedence over count errors so that a payload
    /// mentioning an unknown size bucket is always reported as such.
    pub fn new(request: IngestRequest, timestamp: DateTime<Utc>) -> Result<Self, HubError> {
        let node = match request.node {
            Some(node) if node.trim().is_empty() => {
                return Err(HubError::InvalidPayload("node must not be empty".to_string()))
            }
            Some(node) => node,
            None => DEFAULT_NODE.to_string(),
        };
        let status = request
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());

        let stats = request
            .rock_stats
            .ok_or_else(|| HubError::InvalidPayload("rock_stats is required".to_string()))?;
        if stats.is_empty() {
            return Err(HubError::InvalidPayload("rock_stats is empty".to_string()));
        }

        let mut parsed = Vec::with_capacity(stats.len());
        for (label, value) in &stats {
            parsed.push((label.parse::<SizeCategory>()?, label, value));
        }

        let mut counts = BTreeMap::new();
        for (category, label, value) in parsed {
            let count = value
                .as_i64()
                .filter(|count| (0..=MAX_COUNT).contains(count))
                .ok_or_else(|| {
                    HubError::InvalidPayload(format!(
                        "count for {} must be an integer between 0 and {}, got {}",
                        label, MAX_COUNT, value
                    ))
                })?;
            counts.insert(category, count);
        }

        Ok(Self {
            batch_id: Uuid::new_v4(),
            node,
            status,
            timestamp,
            counts,
        })
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn counts(&self) -> &BTreeMap<SizeCategory, i64> {
        &self.counts
    }

    /// Rows this batch expands to, one per category
    pub fn readings(&self) -> impl Iterator<Item = Reading> + '_ {
        self.counts.iter().map(move |(category, count)| Reading {
            batch_id: self.batch_id,
            node: self.node.clone(),
            status: self.status.clone(),
            timestamp: self.timestamp,
            size_category: *category,
            count: *count,
        })
    }
}
