use serde::Serialize;

use crate::analyzer::stats::{mean, pct};
use crate::analyzer::table::OrderTable;
use crate::config::{EngineConfig, ProfitMarginStrategy};

/// Fixed-shape headline metrics. Plain numbers, formatting is left to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_orders: usize,
    pub cancelled_orders: usize,
    pub total_revenue: f64,
    pub average_order_value: f64,
    /// Minutes.
    pub average_delivery_time: f64,
    /// Percentage, 0 on an empty table.
    pub cancellation_rate: f64,
    pub average_delivery_rating: f64,
    /// Percentage, meaning depends on `profit_margin_strategy`.
    pub profit_margin: f64,
    pub profit_margin_strategy: ProfitMarginStrategy,
}

/// Headline KPIs over `table`.
///
/// Means include coerced zeros, so missing measures pull averages down.
/// An empty table yields zeros everywhere.
pub fn compute_kpis(table: &OrderTable, config: &EngineConfig) -> KpiSummary {
    let revenue_field = config.revenue_field.field();
    let revenue = || table.iter().filter_map(|r| r.numeric(revenue_field));

    let total_orders = table.len();
    let total_revenue: f64 = revenue().sum();
    let cancelled_orders = table
        .iter()
        .filter(|r| r.is_cancelled(config.cancellation))
        .count();

    let profit_margin = match config.profit_margin {
        ProfitMarginStrategy::RatioOfSums => {
            let total_profit: f64 = table.iter().map(|r| r.profit_margin).sum();
            pct(total_profit, total_revenue)
        }
        ProfitMarginStrategy::MeanOfPercentages => mean(table.iter().map(|r| r.profit_margin)),
    };

    KpiSummary {
        total_orders,
        cancelled_orders,
        total_revenue,
        average_order_value: mean(revenue()),
        average_delivery_time: mean(table.iter().map(|r| r.delivery_time_min)),
        cancellation_rate: pct(cancelled_orders as f64, total_orders as f64),
        average_delivery_rating: mean(table.iter().map(|r| r.delivery_rating)),
        profit_margin,
        profit_margin_strategy: config.profit_margin,
    }
}
