use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::analyzer::bucket::bucketize;
use crate::analyzer::dashboard::{build_dashboard, DashboardPayload};
use crate::analyzer::filter::FilterSpec;
use crate::analyzer::table::{Dimension, NumericField, OrderTable};
use crate::config::{get_config_from_db, EngineConfig};
use crate::db;
use crate::error::AppError;
use crate::parser::{parse_csv, LoadOutput, ParseWarning};

/// A loaded, immutable order table plus the settings it was loaded with.
///
/// The table is bucketized once here. Each `dashboard` call derives a fresh
/// payload from it; no filter state is kept between calls.
#[derive(Debug)]
pub struct DashboardSession {
    table: OrderTable,
    config: EngineConfig,
    warnings: Vec<ParseWarning>,
}

impl DashboardSession {
    pub fn new(table: OrderTable, config: EngineConfig) -> Result<Self, AppError> {
        config.validate()?;
        let spec = config.age_bucket_spec()?;
        let table = bucketize(
            &table,
            NumericField::CustomerAge,
            &config.age_buckets.column,
            &spec,
        );
        log::info!(
            "Session ready: {} orders, age buckets in {:?}",
            table.len(),
            config.age_buckets.column
        );
        Ok(DashboardSession {
            table,
            config,
            warnings: Vec::new(),
        })
    }

    pub fn from_load(output: LoadOutput, config: EngineConfig) -> Result<Self, AppError> {
        let mut session = DashboardSession::new(output.table, config)?;
        session.warnings = output.warnings;
        Ok(session)
    }

    pub fn from_csv(path: &str, config: EngineConfig) -> Result<Self, AppError> {
        config.validate()?;
        let output = parse_csv(path, &config, |rows, accepted| {
            log::debug!("{} rows read, {} orders accepted", rows, accepted)
        })?;
        DashboardSession::from_load(output, config)
    }

    /// Loads `table` from a SQLite file. Without an explicit `config`, settings
    /// come from the file's `dashboard_config` table, or the defaults.
    pub fn from_sqlite(
        path: &str,
        table: &str,
        config: Option<EngineConfig>,
    ) -> Result<Self, AppError> {
        let conn = db::open_source(path)?;
        let config = match config {
            Some(config) => config,
            None => get_config_from_db(&conn)?,
        };
        config.validate()?;
        let output = db::load_orders(&conn, table, &config)?;
        DashboardSession::from_load(output, config)
    }

    pub fn table(&self) -> &OrderTable {
        &self.table
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rows skipped or coerced during the load.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn dashboard(&self, filter: &FilterSpec) -> DashboardPayload {
        build_dashboard(&self.table, filter, &self.config)
    }

    /// Builds a `FilterSpec` from `Column=v1,v2` arguments. Repeated columns
    /// accumulate their values.
    pub fn parse_filter<S: AsRef<str>>(
        &self,
        constraints: &[S],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<FilterSpec, AppError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                log::warn!("Date range {} .. {} is empty", from, to);
            }
        }

        let mut merged: BTreeMap<Dimension, Vec<String>> = BTreeMap::new();
        for arg in constraints {
            let (dim, values) = FilterSpec::parse_constraint(&self.table, arg.as_ref())?;
            merged.entry(dim).or_default().extend(values);
        }

        let mut spec = FilterSpec::new().with_date_range(from, to);
        for (dim, values) in merged {
            spec.restrict(dim, values);
        }
        Ok(spec)
    }
}
