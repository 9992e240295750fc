//! Dashboard payload: headline KPIs plus the fixed chart set for the food-delivery view.
use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;

use super::filter::{apply_filter, filter_options, FilterSpec};
use super::group::{cross_aggregate, group_aggregate, AggOp, CrossAggregate, GroupedAggregate};
use super::kpi::{compute_kpis, KpiSummary};
use super::table::{Dimension, NumericField, OrderTable};
use crate::config::EngineConfig;

// ─── Data Structures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub meta: DashboardMeta,
    pub kpis: KpiSummary,
    pub charts: DashboardCharts,
    /// Observed values over the whole session, not only the filtered rows.
    pub filter_options: BTreeMap<Dimension, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    pub total_rows: usize,
    pub filtered_rows: usize,
    /// First and last `Order_Date` of the filtered rows.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub filter: FilterSpec,
    pub compute_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub revenue_by_weekday: GroupedAggregate,
    pub orders_by_age_group: GroupedAggregate,
    pub revenue_by_city: GroupedAggregate,
    pub orders_by_cuisine: GroupedAggregate,
    pub avg_delivery_time_by_peak_hour: GroupedAggregate,
    pub orders_by_payment_mode: GroupedAggregate,
    /// Cancelled orders only, under the configured cancellation rule.
    pub cancellations_by_reason: GroupedAggregate,
    pub orders_by_city_and_status: CrossAggregate,
}

// ─── Charts ──────────────────────────────────────────────────────────────────

// Count ignores the measure; any field will do.
const COUNTED: NumericField = NumericField::OrderValue;

fn build_charts(table: &OrderTable, config: &EngineConfig) -> DashboardCharts {
    let revenue = config.revenue_field.field();
    let age_group = Dimension::Derived(config.age_buckets.column.clone());

    let cancelled = table.derive(
        table
            .iter()
            .filter(|r| r.is_cancelled(config.cancellation))
            .cloned()
            .collect(),
    );

    DashboardCharts {
        revenue_by_weekday: group_aggregate(table, &Dimension::Weekday, revenue, AggOp::Sum),
        orders_by_age_group: group_aggregate(table, &age_group, COUNTED, AggOp::Count),
        revenue_by_city: group_aggregate(table, &Dimension::City, revenue, AggOp::Sum),
        orders_by_cuisine: group_aggregate(table, &Dimension::CuisineType, COUNTED, AggOp::Count),
        avg_delivery_time_by_peak_hour: group_aggregate(
            table,
            &Dimension::PeakHour,
            NumericField::DeliveryTimeMin,
            AggOp::Mean,
        ),
        orders_by_payment_mode: group_aggregate(
            table,
            &Dimension::PaymentMode,
            COUNTED,
            AggOp::Count,
        ),
        cancellations_by_reason: group_aggregate(
            &cancelled,
            &Dimension::CancellationReason,
            COUNTED,
            AggOp::Count,
        ),
        orders_by_city_and_status: cross_aggregate(
            table,
            &Dimension::City,
            &Dimension::OrderStatus,
            COUNTED,
            AggOp::Count,
        ),
    }
}

// ─── Main Entry Point ────────────────────────────────────────────────────────

/// Builds the complete dashboard for `full` restricted by `filter`.
///
/// `full` is expected to carry the age-bucket column already (the session
/// bucketizes once at load). Without it `ordersByAgeGroup` is empty.
pub fn build_dashboard(
    full: &OrderTable,
    filter: &FilterSpec,
    config: &EngineConfig,
) -> DashboardPayload {
    let start = Instant::now();

    let filtered = apply_filter(full, filter);
    let kpis = compute_kpis(&filtered, config);
    let charts = build_charts(&filtered, config);
    let filter_options = filter_options(full);

    let mut meta = DashboardMeta {
        total_rows: full.len(),
        filtered_rows: filtered.len(),
        date_range: filtered.date_range(),
        filter: filter.clone(),
        compute_duration_ms: 0, // filled below
    };
    meta.compute_duration_ms = start.elapsed().as_millis() as u64;

    log::debug!(
        "Dashboard built over {}/{} orders in {} ms",
        meta.filtered_rows,
        meta.total_rows,
        meta.compute_duration_ms
    );

    DashboardPayload {
        meta,
        kpis,
        charts,
        filter_options,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
