use serde::Serialize;

use crate::analyzer::table::OrderTable;

/// One source row as text, before coercion. `None` = column absent.
#[derive(Debug, Clone, Default)]
pub struct OrderRaw {
    pub order_id: Option<String>,
    pub city: Option<String>,
    pub cuisine_type: Option<String>,
    pub restaurant_name: Option<String>,
    pub order_date: Option<String>,
    pub order_day: Option<String>,
    pub order_time: Option<String>,
    pub order_value: Option<String>,
    pub final_amount: Option<String>,
    pub delivery_time_min: Option<String>,
    pub profit_margin: Option<String>,
    pub discount_applied: Option<String>,
    pub delivery_rating: Option<String>,
    pub restaurant_rating: Option<String>,
    pub distance_km: Option<String>,
    pub order_status: Option<String>,
    pub payment_mode: Option<String>,
    pub peak_hour: Option<String>,
    pub cancellation_reason: Option<String>,
    pub customer_age: Option<String>,
    pub cancelled: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

/// Output of a load: the normalized table plus import metadata.
#[derive(Debug)]
pub struct LoadOutput {
    pub table: OrderTable,
    pub warnings: Vec<ParseWarning>,
    pub total_rows_processed: usize,
    pub skipped_rows: usize,
    /// Measure cells replaced by 0 under the `zero` policy.
    pub coerced_cells: usize,
    pub detected_columns: Vec<String>,
    pub missing_optional_columns: Vec<String>,
    pub unique_statuses: Vec<String>,
    pub load_duration_ms: u64,
}
