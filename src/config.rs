use std::str::FromStr;

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analyzer::bucket::BucketSpec;
use crate::analyzer::table::{Dimension, NumericField};
use crate::error::AppError;

/// What the load boundary does with a measure cell that is not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidNumericPolicy {
    /// Substitute 0. Lossy: lowers means when data is missing.
    #[default]
    Zero,
    /// Drop the whole row with a warning.
    Skip,
    /// Abort the load.
    Error,
}

/// Two profit-margin definitions coexist across schema variants.
/// `RatioOfSums` suits an absolute profit amount per order,
/// `MeanOfPercentages` a pre-computed percentage per order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitMarginStrategy {
    /// 100 × Σ Profit_Margin / total revenue
    #[default]
    RatioOfSums,
    /// mean(Profit_Margin)
    MeanOfPercentages,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationRule {
    /// `Order_Status` is "Cancelled"
    Status,
    /// `Cancelled` == 1
    Flag,
    #[default]
    Either,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueField {
    #[default]
    OrderValue,
    FinalAmount,
}

impl RevenueField {
    pub fn field(self) -> NumericField {
        match self {
            RevenueField::OrderValue => NumericField::OrderValue,
            RevenueField::FinalAmount => NumericField::FinalAmount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBuckets {
    pub column: String,
    pub boundaries: Vec<f64>,
    pub labels: Vec<String>,
}

impl Default for AgeBuckets {
    fn default() -> Self {
        AgeBuckets {
            column: "Age_Group".to_string(),
            boundaries: vec![0.0, 18.0, 25.0, 35.0, 45.0, 60.0, 100.0],
            labels: ["<18", "18-25", "26-35", "36-45", "46-60", "60+"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub on_invalid_numeric: InvalidNumericPolicy,
    pub revenue_field: RevenueField,
    pub profit_margin: ProfitMarginStrategy,
    pub cancellation: CancellationRule,
    pub age_buckets: AgeBuckets,
}

impl EngineConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &str) -> Result<EngineConfig, AppError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no aggregation could run with.
    pub fn validate(&self) -> Result<(), AppError> {
        self.age_bucket_spec()?;
        if self.age_buckets.column.trim().is_empty() {
            return Err(AppError::Configuration(
                "age bucket column name is empty".to_string(),
            ));
        }
        if Dimension::from_name(&self.age_buckets.column).is_some() {
            return Err(AppError::Configuration(format!(
                "age bucket column {:?} shadows a source column",
                self.age_buckets.column
            )));
        }
        Ok(())
    }

    pub fn age_bucket_spec(&self) -> Result<BucketSpec, AppError> {
        BucketSpec::new(
            self.age_buckets.boundaries.clone(),
            self.age_buckets.labels.clone(),
        )
    }
}

fn parse_enum<T: DeserializeOwned>(s: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_lowercase())).ok()
}

macro_rules! impl_from_str {
    ($($ty:ty),*) => {$(
        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_enum(s).ok_or_else(|| {
                    AppError::Configuration(format!(
                        "invalid value {:?} for {}",
                        s,
                        stringify!($ty)
                    ))
                })
            }
        }
    )*};
}

impl_from_str!(
    InvalidNumericPolicy,
    ProfitMarginStrategy,
    CancellationRule,
    RevenueField
);

/// Reads engine settings from an optional `dashboard_config(key, value)` table
/// shipped alongside the orders. Absent table → defaults.
pub fn get_config_from_db(conn: &Connection) -> Result<EngineConfig, rusqlite::Error> {
    let mut config = EngineConfig::default();

    let has_table: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'dashboard_config'",
        [],
        |row| row.get(0),
    )?;
    if has_table == 0 {
        return Ok(config);
    }

    let mut stmt = conn.prepare_cached("SELECT key, value FROM dashboard_config")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            "on_invalid_numeric" => {
                if let Some(v) = parse_enum(&value) {
                    config.on_invalid_numeric = v;
                }
            }
            "revenue_field" => {
                if let Some(v) = parse_enum(&value) {
                    config.revenue_field = v;
                }
            }
            "profit_margin" => {
                if let Some(v) = parse_enum(&value) {
                    config.profit_margin = v;
                }
            }
            "cancellation" => {
                if let Some(v) = parse_enum(&value) {
                    config.cancellation = v;
                }
            }
            "age_bucket_column" => config.age_buckets.column = value.trim().to_string(),
            "age_bucket_boundaries" => {
                if let Ok(v) = serde_json::from_str(&value) {
                    config.age_buckets.boundaries = v;
                }
            }
            "age_bucket_labels" => {
                if let Ok(v) = serde_json::from_str(&value) {
                    config.age_buckets.labels = v;
                }
            }
            other => log::debug!("Ignoring unknown config key {:?}", other),
        }
    }

    Ok(config)
}
