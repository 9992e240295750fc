use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::error::AppError;

/// Columns every source must carry, besides the configured revenue column.
const REQUIRED: &[&str] = &["Order_ID", "Order_Date"];

/// Known optional columns. Absent = default value, reported in the load result.
const OPTIONAL: &[&str] = &[
    "City",
    "Cuisine_Type",
    "Restaurant_Name",
    "Order_Day",
    "Order_Time",
    "Order_Value",
    "Final_Amount",
    "Delivery_Time_Min",
    "Profit_Margin",
    "Discount_Applied",
    "Delivery_Rating",
    "Restaurant_Rating",
    "Distance_km",
    "Order_Status",
    "Payment_Mode",
    "Peak_Hour",
    "Cancellation_Reason",
    "Customer_Age",
    "Cancelled",
];

/// Maps column names to their index in a record.
pub struct ColumnMap {
    indices: HashMap<String, usize>,
    headers: Vec<String>,
}

impl ColumnMap {
    /// Build a ColumnMap from the CSV header record.
    pub fn from_headers(headers: &csv::StringRecord) -> Self {
        ColumnMap::from_names(headers.iter())
    }

    /// Names are trimmed of surrounding whitespace and a leading BOM.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut indices = HashMap::new();
        let mut header_list = Vec::new();
        for (i, field) in names.into_iter().enumerate() {
            let name = field
                .as_ref()
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string();
            indices.entry(name.clone()).or_insert(i);
            header_list.push(name);
        }
        ColumnMap {
            indices,
            headers: header_list,
        }
    }

    /// Get the value of a named column from a record.
    pub fn get<'a>(&self, record: &'a csv::StringRecord, col: &str) -> Option<&'a str> {
        self.indices.get(col).and_then(|&i| record.get(i))
    }

    pub fn has(&self, col: &str) -> bool {
        self.indices.contains_key(col)
    }

    pub fn all_headers(&self) -> &[String] {
        &self.headers
    }

    pub fn is_empty(&self) -> bool {
        self.headers.iter().all(|h| h.is_empty())
    }
}

#[derive(Debug)]
pub struct ColumnValidation {
    /// All column names present in the source.
    pub present: Vec<String>,
    /// Known optional columns absent from the source.
    pub missing_optional: Vec<String>,
}

/// Validate that all required columns are present.
/// Returns `AppError::MissingColumns` if any required column is absent.
pub fn validate_columns(
    col_map: &ColumnMap,
    config: &EngineConfig,
) -> Result<ColumnValidation, AppError> {
    let revenue_column = config.revenue_field.field().column();

    let missing_required: Vec<String> = REQUIRED
        .iter()
        .copied()
        .chain(std::iter::once(revenue_column))
        .filter(|c| !col_map.has(c))
        .map(str::to_string)
        .collect();

    if !missing_required.is_empty() {
        return Err(AppError::MissingColumns(missing_required));
    }

    let missing_optional = OPTIONAL
        .iter()
        .filter(|&&c| c != revenue_column && !col_map.has(c))
        .map(|c| c.to_string())
        .collect();

    Ok(ColumnValidation {
        present: col_map.all_headers().to_vec(),
        missing_optional,
    })
}
