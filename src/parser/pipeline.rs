use std::collections::BTreeSet;
use std::io::Read;
use std::time::Instant;

use crate::analyzer::table::{NumericField, OrderRecord, OrderTable};
use crate::config::{EngineConfig, InvalidNumericPolicy};
use crate::error::AppError;
use crate::parser::columns::{validate_columns, ColumnMap};
use crate::parser::deserializers::{parse_flag, parse_number, parse_order_date, parse_order_time};
use crate::parser::types::{LoadOutput, OrderRaw, ParseWarning};

/// Parse an orders CSV file from `path`.
/// `progress_cb(rows_processed, orders_accepted)` is called every 500 rows.
pub fn parse_csv(
    path: &str,
    config: &EngineConfig,
    progress_cb: impl Fn(usize, usize),
) -> Result<LoadOutput, AppError> {
    let file = std::fs::File::open(path)?;
    log::info!("Loading orders from CSV {}", path);
    parse_csv_reader(std::io::BufReader::new(file), config, progress_cb)
}

/// Core parsing logic. Accepts any `Read` source.
pub fn parse_csv_reader<R: Read>(
    reader: R,
    config: &EngineConfig,
    progress_cb: impl Fn(usize, usize),
) -> Result<LoadOutput, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .double_quote(true)
        .quoting(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(AppError::EmptyFile);
    }
    let col_map = ColumnMap::from_headers(&headers);

    // +1: the header occupies line 1
    let rows = rdr.records().map(|r| r.map_err(|e| e.to_string()));
    load_rows(&col_map, rows, 1, config, progress_cb)
}

/// Shared by every source: validates columns, then normalizes each row into
/// an `OrderRecord`. `line_offset` is added to the 1-based row index when
/// reporting warnings.
pub(crate) fn load_rows<I>(
    col_map: &ColumnMap,
    rows: I,
    line_offset: usize,
    config: &EngineConfig,
    progress_cb: impl Fn(usize, usize),
) -> Result<LoadOutput, AppError>
where
    I: IntoIterator<Item = Result<csv::StringRecord, String>>,
{
    let start = Instant::now();

    if col_map.is_empty() {
        return Err(AppError::EmptyFile);
    }
    let col_validation = validate_columns(col_map, config)?;
    if !col_validation.missing_optional.is_empty() {
        log::info!(
            "Optional columns absent, using defaults: {}",
            col_validation.missing_optional.join(", ")
        );
    }

    let header_len = col_map.all_headers().len();
    let mut records: Vec<OrderRecord> = Vec::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();
    let mut skipped = 0usize;
    let mut coerced = 0usize;
    let mut row_idx = 0usize;
    let mut unique_statuses: BTreeSet<String> = BTreeSet::new();

    for result in rows {
        row_idx += 1;
        let line = row_idx + line_offset;
        if row_idx % 500 == 0 {
            progress_cb(row_idx, records.len());
        }

        match result {
            Ok(record) => {
                if record.len() < header_len {
                    warnings.push(ParseWarning {
                        line,
                        message: format!(
                            "row has {} fields, header has {}; missing cells read as empty",
                            record.len(),
                            header_len
                        ),
                    });
                }
                let raw = record_to_raw(col_map, &record);
                match normalize_order(&raw, line, config) {
                    Ok((order, coercions)) => {
                        for (column, value) in coercions {
                            coerced += 1;
                            if !value.trim().is_empty() {
                                warnings.push(ParseWarning {
                                    line,
                                    message: format!(
                                        "{} is not a number ({:?}), using 0",
                                        column, value
                                    ),
                                });
                            }
                        }
                        if !order.order_status.is_empty() {
                            unique_statuses.insert(order.order_status.clone());
                        }
                        records.push(order);
                    }
                    Err(RowError::Skip(message)) => {
                        warnings.push(ParseWarning { line, message });
                        skipped += 1;
                    }
                    Err(RowError::Fatal(err)) => return Err(err),
                }
            }
            Err(message) => {
                warnings.push(ParseWarning { line, message });
                skipped += 1;
            }
        }
    }

    if row_idx == 0 {
        return Err(AppError::EmptyFile);
    }
    if skipped > 0 {
        log::warn!("{} of {} rows skipped", skipped, row_idx);
    }
    if coerced > 0 {
        log::warn!("{} measure cells were not numbers and count as 0", coerced);
    }

    let load_duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Loaded {} orders from {} rows in {} ms",
        records.len(),
        row_idx,
        load_duration_ms
    );

    Ok(LoadOutput {
        table: OrderTable::new(records),
        warnings,
        total_rows_processed: row_idx,
        skipped_rows: skipped,
        coerced_cells: coerced,
        detected_columns: col_validation.present,
        missing_optional_columns: col_validation.missing_optional,
        unique_statuses: unique_statuses.into_iter().collect(),
        load_duration_ms,
    })
}

/// A known column missing from a short row reads as an empty cell, so the
/// numeric policy still applies to it. Only absent columns are `None`.
fn record_to_raw(col_map: &ColumnMap, record: &csv::StringRecord) -> OrderRaw {
    let get = |col: &str| {
        col_map
            .has(col)
            .then(|| col_map.get(record, col).unwrap_or("").to_string())
    };
    OrderRaw {
        order_id: get("Order_ID"),
        city: get("City"),
        cuisine_type: get("Cuisine_Type"),
        restaurant_name: get("Restaurant_Name"),
        order_date: get("Order_Date"),
        order_day: get("Order_Day"),
        order_time: get("Order_Time"),
        order_value: get("Order_Value"),
        final_amount: get("Final_Amount"),
        delivery_time_min: get("Delivery_Time_Min"),
        profit_margin: get("Profit_Margin"),
        discount_applied: get("Discount_Applied"),
        delivery_rating: get("Delivery_Rating"),
        restaurant_rating: get("Restaurant_Rating"),
        distance_km: get("Distance_km"),
        order_status: get("Order_Status"),
        payment_mode: get("Payment_Mode"),
        peak_hour: get("Peak_Hour"),
        cancellation_reason: get("Cancellation_Reason"),
        customer_age: get("Customer_Age"),
        cancelled: get("Cancelled"),
    }
}

fn raw_measure(raw: &OrderRaw, field: NumericField) -> Option<&str> {
    let value = match field {
        NumericField::OrderValue => &raw.order_value,
        NumericField::FinalAmount => &raw.final_amount,
        NumericField::DeliveryTimeMin => &raw.delivery_time_min,
        NumericField::ProfitMargin => &raw.profit_margin,
        NumericField::DiscountApplied => &raw.discount_applied,
        NumericField::DeliveryRating => &raw.delivery_rating,
        NumericField::RestaurantRating => &raw.restaurant_rating,
        NumericField::DistanceKm => &raw.distance_km,
        NumericField::CustomerAge => &raw.customer_age,
    };
    value.as_deref()
}

enum RowError {
    /// Drop the row, keep loading.
    Skip(String),
    /// Abort the whole load.
    Fatal(AppError),
}

/// (column, original text) of each measure replaced by 0.
type Coercions = Vec<(&'static str, String)>;

fn normalize_order(
    raw: &OrderRaw,
    line: usize,
    config: &EngineConfig,
) -> Result<(OrderRecord, Coercions), RowError> {
    let text = |v: &Option<String>| v.as_deref().unwrap_or("").trim().to_string();

    // Order_ID (required)
    let order_id = text(&raw.order_id);
    if order_id.is_empty() {
        return Err(RowError::Skip("Missing Order_ID".to_string()));
    }

    // Order_Date (required)
    let date_str = raw.order_date.as_deref().unwrap_or("");
    let order_date = parse_order_date(date_str)
        .ok_or_else(|| RowError::Skip(format!("Invalid Order_Date: {:?}", date_str)))?;

    let mut order = OrderRecord::new(order_id, order_date);
    let mut coercions = Coercions::new();

    // Absent column → 0, present but not a number → policy
    for field in NumericField::MEASURES {
        let Some(cell) = raw_measure(raw, field) else {
            continue;
        };
        let value = match parse_number(cell) {
            Some(v) => v,
            None => match config.on_invalid_numeric {
                InvalidNumericPolicy::Zero => {
                    coercions.push((field.column(), cell.to_string()));
                    0.0
                }
                InvalidNumericPolicy::Skip => {
                    return Err(RowError::Skip(format!(
                        "{} is not a number: {:?}",
                        field.column(),
                        cell
                    )));
                }
                InvalidNumericPolicy::Error => {
                    return Err(RowError::Fatal(AppError::InvalidNumeric {
                        line,
                        column: field.column().to_string(),
                        value: cell.to_string(),
                    }));
                }
            },
        };
        order.set_measure(field, value);
    }

    order.city = text(&raw.city);
    order.cuisine_type = text(&raw.cuisine_type);
    order.restaurant_name = text(&raw.restaurant_name);
    order.order_day = text(&raw.order_day);
    order.order_time = raw.order_time.as_deref().and_then(parse_order_time);
    order.order_status = text(&raw.order_status);
    order.payment_mode = text(&raw.payment_mode);
    order.peak_hour = text(&raw.peak_hour);
    order.cancellation_reason = text(&raw.cancellation_reason);
    // Age only feeds bucketing; unreadable means "no bucket"
    order.customer_age = raw.customer_age.as_deref().and_then(parse_number);
    order.cancelled = raw.cancelled.as_deref().is_some_and(parse_flag);

    Ok((order, coercions))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HDR: &str = concat!(
        "Order_ID,City,Cuisine_Type,Restaurant_Name,Order_Date,Order_Day,Order_Time,",
        "Order_Value,Delivery_Time_Min,Profit_Margin,Discount_Applied,Delivery_Rating,",
        "Order_Status,Payment_Mode,Peak_Hour,Cancellation_Reason,Customer_Age"
    );

    fn parse_with(csv: &str, config: &EngineConfig) -> Result<LoadOutput, AppError> {
        parse_csv_reader(csv.as_bytes(), config, |_, _| {})
    }

    fn parse(csv: &str) -> LoadOutput {
        parse_with(csv, &EngineConfig::default()).unwrap()
    }

    fn policy(p: InvalidNumericPolicy) -> EngineConfig {
        EngineConfig {
            on_invalid_numeric: p,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_basic_row() {
        let csv = format!(
            "{HDR}\nO1,Delhi,Indian,Spice Hub,2024-01-15,Monday,19:30,450.5,32,45,10,4.5,Completed,UPI,Yes,,29"
        );
        let out = parse(&csv);
        assert_eq!(out.table.len(), 1);
        let o = &out.table.records()[0];
        assert_eq!(o.order_id, "O1");
        assert_eq!(o.city, "Delhi");
        assert_eq!(o.order_date.to_string(), "2024-01-15");
        assert_eq!(o.order_time.unwrap().to_string(), "19:30:00");
        assert_eq!(o.order_value, 450.5);
        assert_eq!(o.delivery_time_min, 32.0);
        assert_eq!(o.customer_age, Some(29.0));
        assert_eq!(o.cancellation_reason, "");
        assert!(!o.cancelled);
        assert_eq!(out.coerced_cells, 0);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_bom_utf8() {
        let csv = format!("\u{FEFF}{HDR}\nO1,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30");
        let out = parse(&csv);
        assert_eq!(out.table.len(), 1, "BOM must be ignored");
    }

    #[test]
    fn test_missing_cancelled_column_defaults_to_zero() {
        let csv = format!("{HDR}\nO1,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30");
        let out = parse(&csv);
        assert!(!out.table.records()[0].cancelled);
        assert!(out.missing_optional_columns.contains(&"Cancelled".to_string()));
        assert!(out.missing_optional_columns.contains(&"Final_Amount".to_string()));
    }

    #[test]
    fn test_cancelled_flag_column() {
        let csv = "Order_ID,Order_Date,Order_Value,Cancelled\nA,2024-01-01,10,1\nB,2024-01-01,10,0\nC,2024-01-01,10,";
        let out = parse(csv);
        let flags: Vec<bool> = out.table.iter().map(|r| r.cancelled).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_non_numeric_value_zero_policy() {
        let csv = format!(
            "{HDR}\n\
             O1,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30\n\
             O2,Delhi,Indian,R,2024-01-15,Monday,19:30,abc,30,5,0,4,Completed,UPI,No,,30\n\
             O3,Delhi,Indian,R,2024-01-15,Monday,19:30,,30,5,0,4,Completed,UPI,No,,30"
        );
        let out = parse(&csv);
        assert_eq!(out.table.len(), 3);
        assert_eq!(out.table.records()[1].order_value, 0.0);
        assert_eq!(out.table.records()[2].order_value, 0.0);
        assert_eq!(out.coerced_cells, 2);
        // Only the non-empty invalid cell is worth a warning
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 3);
    }

    #[test]
    fn test_non_numeric_value_skip_policy() {
        let csv = format!(
            "{HDR}\n\
             O1,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30\n\
             O2,Delhi,Indian,R,2024-01-15,Monday,19:30,abc,30,5,0,4,Completed,UPI,No,,30"
        );
        let out = parse_with(&csv, &policy(InvalidNumericPolicy::Skip)).unwrap();
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.skipped_rows, 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("Order_Value"));
    }

    #[test]
    fn test_non_numeric_value_error_policy() {
        let csv = format!(
            "{HDR}\n\
             O1,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30\n\
             O2,Delhi,Indian,R,2024-01-15,Monday,19:30,100,slow,5,0,4,Completed,UPI,No,,30"
        );
        match parse_with(&csv, &policy(InvalidNumericPolicy::Error)) {
            Err(AppError::InvalidNumeric { line, column, value }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "Delivery_Time_Min");
                assert_eq!(value, "slow");
            }
            other => panic!("Expected InvalidNumeric, got {:?}", other),
        }
    }

    const SHORT_ROW: &str = "Order_ID,Order_Date,Order_Value\nA,2024-01-01,10\nB,2024-01-02\n";

    #[test]
    fn test_short_row_zero_policy_counts_coercion() {
        let out = parse(SHORT_ROW);
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.table.records()[1].order_value, 0.0);
        assert_eq!(out.coerced_cells, 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].line, 3);
        assert!(out.warnings[0].message.contains("2 fields"));
    }

    #[test]
    fn test_short_row_skip_policy() {
        let out = parse_with(SHORT_ROW, &policy(InvalidNumericPolicy::Skip)).unwrap();
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.skipped_rows, 1);
        assert_eq!(out.table.records()[0].order_id, "A");
    }

    #[test]
    fn test_short_row_error_policy() {
        match parse_with(SHORT_ROW, &policy(InvalidNumericPolicy::Error)) {
            Err(AppError::InvalidNumeric { line, column, value }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "Order_Value");
                assert_eq!(value, "");
            }
            other => panic!("Expected InvalidNumeric, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_and_missing_id_skip() {
        let csv = format!(
            "{HDR}\n\
             O1,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30\n\
             O2,Delhi,Indian,R,not-a-date,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30\n\
             ,Delhi,Indian,R,2024-01-15,Monday,19:30,100,30,5,0,4,Completed,UPI,No,,30"
        );
        let out = parse(&csv);
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.skipped_rows, 2);
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.total_rows_processed, 3);
    }

    #[test]
    fn test_non_numeric_age_is_undefined() {
        let csv = "Order_ID,Order_Date,Order_Value,Customer_Age\nA,2024-01-01,10,unknown";
        let out = parse(csv);
        assert_eq!(out.table.records()[0].customer_age, None);
        assert_eq!(out.coerced_cells, 0);
    }

    #[test]
    fn test_unique_statuses() {
        let csv = "Order_ID,Order_Date,Order_Value,Order_Status\n\
                   A,2024-01-01,10,Completed\n\
                   B,2024-01-01,10,Cancelled\n\
                   C,2024-01-01,10,Completed\n\
                   D,2024-01-01,10,";
        let out = parse(csv);
        assert_eq!(out.unique_statuses, vec!["Cancelled", "Completed"]);
    }

    #[test]
    fn test_missing_required_column_error() {
        let csv = "City,Order_Status\nDelhi,Completed";
        match parse_with(csv, &EngineConfig::default()) {
            Err(AppError::MissingColumns(cols)) => {
                assert!(cols.contains(&"Order_ID".to_string()));
                assert!(cols.contains(&"Order_Date".to_string()));
            }
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty_file() {
        match parse_with("Order_ID,Order_Date,Order_Value\n", &EngineConfig::default()) {
            Err(AppError::EmptyFile) => {}
            other => panic!("Expected EmptyFile, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_error() {
        match parse_with("", &EngineConfig::default()) {
            Err(AppError::EmptyFile) | Err(AppError::MissingColumns(_)) | Err(AppError::Csv(_)) => {}
            other => panic!("Expected EmptyFile or related error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_csv_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "Order_ID,Order_Date,Order_Value\nA,2024-01-01,10\nB,2024-01-02,20\n").unwrap();
        let out = parse_csv(path.to_str().unwrap(), &EngineConfig::default(), |_, _| {}).unwrap();
        assert_eq!(out.table.len(), 2);
    }

    #[test]
    fn test_progress_callback_fires_every_500_rows() {
        use std::cell::Cell;
        let mut csv = String::from("Order_ID,Order_Date,Order_Value\n");
        for i in 0..1200 {
            csv.push_str(&format!("{i},2024-01-01,1\n"));
        }
        let calls = Cell::new(0);
        parse_csv_reader(csv.as_bytes(), &EngineConfig::default(), |_, _| {
            calls.set(calls.get() + 1)
        })
        .unwrap();
        assert_eq!(calls.get(), 2);
    }
}
