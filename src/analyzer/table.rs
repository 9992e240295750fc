use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};

use crate::config::CancellationRule;

/// Canonical weekday order used to reindex day-of-week aggregates.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// A categorical column that can be filtered or grouped on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    City,
    CuisineType,
    RestaurantName,
    OrderDay,
    OrderStatus,
    PaymentMode,
    PeakHour,
    CancellationReason,
    /// Day name derived from `Order_Date`.
    Weekday,
    /// A column added by `bucketize`.
    Derived(String),
}

impl Dimension {
    /// Dimensions present on every loaded table.
    pub fn builtin() -> Vec<Dimension> {
        vec![
            Dimension::City,
            Dimension::CuisineType,
            Dimension::RestaurantName,
            Dimension::OrderDay,
            Dimension::OrderStatus,
            Dimension::PaymentMode,
            Dimension::PeakHour,
            Dimension::CancellationReason,
            Dimension::Weekday,
        ]
    }

    pub fn name(&self) -> &str {
        match self {
            Dimension::City => "City",
            Dimension::CuisineType => "Cuisine_Type",
            Dimension::RestaurantName => "Restaurant_Name",
            Dimension::OrderDay => "Order_Day",
            Dimension::OrderStatus => "Order_Status",
            Dimension::PaymentMode => "Payment_Mode",
            Dimension::PeakHour => "Peak_Hour",
            Dimension::CancellationReason => "Cancellation_Reason",
            Dimension::Weekday => "Weekday",
            Dimension::Derived(name) => name,
        }
    }

    /// Resolves a built-in column name. Bucket columns are not known here,
    /// see `OrderTable::dimension`.
    pub fn from_name(name: &str) -> Option<Dimension> {
        Dimension::builtin()
            .into_iter()
            .find(|d| d.name() == name.trim())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Dimension {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// Numeric columns of an order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    OrderValue,
    FinalAmount,
    DeliveryTimeMin,
    ProfitMargin,
    DiscountApplied,
    DeliveryRating,
    RestaurantRating,
    DistanceKm,
    CustomerAge,
}

impl NumericField {
    /// Measures subject to the invalid-numeric policy at load time.
    pub const MEASURES: [NumericField; 8] = [
        NumericField::OrderValue,
        NumericField::FinalAmount,
        NumericField::DeliveryTimeMin,
        NumericField::ProfitMargin,
        NumericField::DiscountApplied,
        NumericField::DeliveryRating,
        NumericField::RestaurantRating,
        NumericField::DistanceKm,
    ];

    pub fn column(self) -> &'static str {
        match self {
            NumericField::OrderValue => "Order_Value",
            NumericField::FinalAmount => "Final_Amount",
            NumericField::DeliveryTimeMin => "Delivery_Time_Min",
            NumericField::ProfitMargin => "Profit_Margin",
            NumericField::DiscountApplied => "Discount_Applied",
            NumericField::DeliveryRating => "Delivery_Rating",
            NumericField::RestaurantRating => "Restaurant_Rating",
            NumericField::DistanceKm => "Distance_km",
            NumericField::CustomerAge => "Customer_Age",
        }
    }
}

/// One order row, normalized at the load boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub city: String,
    pub cuisine_type: String,
    pub restaurant_name: String,
    pub order_date: NaiveDate,
    pub order_day: String,
    pub order_time: Option<NaiveTime>,
    pub order_value: f64,
    pub final_amount: f64,
    pub delivery_time_min: f64,
    pub profit_margin: f64,
    pub discount_applied: f64,
    pub delivery_rating: f64,
    pub restaurant_rating: f64,
    pub distance_km: f64,
    pub order_status: String,
    pub payment_mode: String,
    pub peak_hour: String,
    pub cancellation_reason: String,
    pub customer_age: Option<f64>,
    pub cancelled: bool,
    /// Bucket column name → label, filled by `bucketize`.
    pub buckets: BTreeMap<String, String>,
}

impl OrderRecord {
    /// A record with every optional column at its default.
    pub fn new(order_id: impl Into<String>, order_date: NaiveDate) -> Self {
        OrderRecord {
            order_id: order_id.into(),
            city: String::new(),
            cuisine_type: String::new(),
            restaurant_name: String::new(),
            order_date,
            order_day: String::new(),
            order_time: None,
            order_value: 0.0,
            final_amount: 0.0,
            delivery_time_min: 0.0,
            profit_margin: 0.0,
            discount_applied: 0.0,
            delivery_rating: 0.0,
            restaurant_rating: 0.0,
            distance_km: 0.0,
            order_status: String::new(),
            payment_mode: String::new(),
            peak_hour: String::new(),
            cancellation_reason: String::new(),
            customer_age: None,
            cancelled: false,
            buckets: BTreeMap::new(),
        }
    }

    pub fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::OrderValue => Some(self.order_value),
            NumericField::FinalAmount => Some(self.final_amount),
            NumericField::DeliveryTimeMin => Some(self.delivery_time_min),
            NumericField::ProfitMargin => Some(self.profit_margin),
            NumericField::DiscountApplied => Some(self.discount_applied),
            NumericField::DeliveryRating => Some(self.delivery_rating),
            NumericField::RestaurantRating => Some(self.restaurant_rating),
            NumericField::DistanceKm => Some(self.distance_km),
            NumericField::CustomerAge => self.customer_age,
        }
    }

    pub(crate) fn set_measure(&mut self, field: NumericField, value: f64) {
        match field {
            NumericField::OrderValue => self.order_value = value,
            NumericField::FinalAmount => self.final_amount = value,
            NumericField::DeliveryTimeMin => self.delivery_time_min = value,
            NumericField::ProfitMargin => self.profit_margin = value,
            NumericField::DiscountApplied => self.discount_applied = value,
            NumericField::DeliveryRating => self.delivery_rating = value,
            NumericField::RestaurantRating => self.restaurant_rating = value,
            NumericField::DistanceKm => self.distance_km = value,
            NumericField::CustomerAge => self.customer_age = Some(value),
        }
    }

    pub fn weekday_name(&self) -> &'static str {
        WEEKDAYS[self.order_date.weekday().num_days_from_monday() as usize]
    }

    /// Categorical value of `dim`. Empty strings and absent bucket labels are `None`.
    pub fn dimension_value(&self, dim: &Dimension) -> Option<&str> {
        let value = match dim {
            Dimension::City => self.city.as_str(),
            Dimension::CuisineType => self.cuisine_type.as_str(),
            Dimension::RestaurantName => self.restaurant_name.as_str(),
            Dimension::OrderDay => self.order_day.as_str(),
            Dimension::OrderStatus => self.order_status.as_str(),
            Dimension::PaymentMode => self.payment_mode.as_str(),
            Dimension::PeakHour => self.peak_hour.as_str(),
            Dimension::CancellationReason => self.cancellation_reason.as_str(),
            Dimension::Weekday => self.weekday_name(),
            Dimension::Derived(name) => self.buckets.get(name)?.as_str(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn is_cancelled(&self, rule: CancellationRule) -> bool {
        let by_status = self.order_status.trim().eq_ignore_ascii_case("cancelled");
        match rule {
            CancellationRule::Status => by_status,
            CancellationRule::Flag => self.cancelled,
            CancellationRule::Either => by_status || self.cancelled,
        }
    }
}

/// Ordered, immutable set of orders sharing one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderTable {
    records: Vec<OrderRecord>,
    /// Bucket column name → labels in ascending bucket order.
    bucket_domains: BTreeMap<String, Vec<String>>,
}

impl OrderTable {
    pub fn new(records: Vec<OrderRecord>) -> Self {
        OrderTable {
            records,
            bucket_domains: BTreeMap::new(),
        }
    }

    /// Same schema, different rows.
    pub(crate) fn derive(&self, records: Vec<OrderRecord>) -> Self {
        OrderTable {
            records,
            bucket_domains: self.bucket_domains.clone(),
        }
    }

    pub(crate) fn with_bucket_domain(mut self, column: &str, labels: Vec<String>) -> Self {
        self.bucket_domains.insert(column.to_string(), labels);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrderRecord> {
        self.records.iter()
    }

    /// All dimensions of this table: built-ins plus bucket columns.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dims = Dimension::builtin();
        dims.extend(self.bucket_domains.keys().cloned().map(Dimension::Derived));
        dims
    }

    /// Resolves a column name against built-ins and this table's bucket columns.
    pub fn dimension(&self, name: &str) -> Option<Dimension> {
        let name = name.trim();
        Dimension::from_name(name).or_else(|| {
            self.bucket_domains
                .contains_key(name)
                .then(|| Dimension::Derived(name.to_string()))
        })
    }

    /// Fixed key order for `dim`, if it has one.
    pub fn canonical_domain(&self, dim: &Dimension) -> Option<Vec<String>> {
        match dim {
            Dimension::Weekday => Some(WEEKDAYS.iter().map(|d| d.to_string()).collect()),
            Dimension::Derived(name) => self.bucket_domains.get(name).cloned(),
            _ => None,
        }
    }

    /// Earliest and latest `Order_Date`, `None` on an empty table.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.order_date).min()?;
        let max = self.records.iter().map(|r| r.order_date).max()?;
        Some((min, max))
    }
}

impl<'a> IntoIterator for &'a OrderTable {
    type Item = &'a OrderRecord;
    type IntoIter = std::slice::Iter<'a, OrderRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
