use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analyzer::table::{Dimension, NumericField, OrderRecord, OrderTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOp {
    Sum,
    Mean,
    /// Number of records in the group; the measure is ignored.
    Count,
}

#[derive(Debug, Clone, Copy, Default)]
struct Acc {
    sum: f64,
    count: usize,
}

impl Acc {
    fn push(&mut self, record: &OrderRecord, measure: NumericField, op: AggOp) {
        match op {
            AggOp::Count => self.count += 1,
            AggOp::Sum | AggOp::Mean => {
                if let Some(v) = record.numeric(measure) {
                    self.sum += v;
                    self.count += 1;
                }
            }
        }
    }

    fn finish(self, op: AggOp) -> f64 {
        match op {
            AggOp::Sum => self.sum,
            AggOp::Count => self.count as f64,
            AggOp::Mean if self.count == 0 => 0.0,
            AggOp::Mean => self.sum / self.count as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    pub label: String,
    pub value: f64,
}

/// Ordered group key → aggregate, ready to feed a chart axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedAggregate {
    pub dimension: Dimension,
    pub measure: &'static str,
    pub op: AggOp,
    pub groups: Vec<GroupEntry>,
}

impl GroupedAggregate {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.groups
            .iter()
            .find(|g| g.label == label)
            .map(|g| g.value)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.groups.iter().map(|g| g.value).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Reduces `measure` per distinct value of `dim`, keys ascending.
///
/// Records with no value for `dim` are left out. When `dim` has a canonical
/// domain (weekdays, bucket labels) the result follows that order and absent
/// groups are reported as 0.
pub fn group_aggregate(
    table: &OrderTable,
    dim: &Dimension,
    measure: NumericField,
    op: AggOp,
) -> GroupedAggregate {
    let mut accs: BTreeMap<&str, Acc> = BTreeMap::new();
    for record in table {
        if let Some(key) = record.dimension_value(dim) {
            accs.entry(key).or_default().push(record, measure, op);
        }
    }

    let grouped = GroupedAggregate {
        dimension: dim.clone(),
        measure: measure.column(),
        op,
        groups: accs
            .into_iter()
            .map(|(label, acc)| GroupEntry {
                label: label.to_string(),
                value: acc.finish(op),
            })
            .collect(),
    };

    match table.canonical_domain(dim) {
        Some(domain) => reindex(&grouped, &domain),
        None => grouped,
    }
}

/// Reorders `grouped` to `domain`, filling missing keys with 0 and dropping
/// keys outside it.
pub fn reindex(grouped: &GroupedAggregate, domain: &[String]) -> GroupedAggregate {
    GroupedAggregate {
        groups: domain
            .iter()
            .map(|label| GroupEntry {
                label: label.clone(),
                value: grouped.get(label).unwrap_or(0.0),
            })
            .collect(),
        ..grouped.clone()
    }
}

/// Two-dimension reduction laid out as a matrix: `cells[i][j]` is the
/// aggregate for `rows[i]` × `columns[j]`, 0 where no record falls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossAggregate {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub measure: &'static str,
    pub op: AggOp,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl CrossAggregate {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.rows.iter().position(|r| r == row)?;
        let j = self.columns.iter().position(|c| c == column)?;
        Some(self.cells[i][j])
    }
}

pub fn cross_aggregate(
    table: &OrderTable,
    row_dim: &Dimension,
    column_dim: &Dimension,
    measure: NumericField,
    op: AggOp,
) -> CrossAggregate {
    let mut accs: BTreeMap<(&str, &str), Acc> = BTreeMap::new();
    let mut seen_rows: BTreeSet<&str> = BTreeSet::new();
    let mut seen_columns: BTreeSet<&str> = BTreeSet::new();

    for record in table {
        let (Some(r), Some(c)) = (
            record.dimension_value(row_dim),
            record.dimension_value(column_dim),
        ) else {
            continue;
        };
        seen_rows.insert(r);
        seen_columns.insert(c);
        accs.entry((r, c)).or_default().push(record, measure, op);
    }

    let axis = |dim: &Dimension, seen: BTreeSet<&str>| -> Vec<String> {
        table
            .canonical_domain(dim)
            .unwrap_or_else(|| seen.into_iter().map(str::to_string).collect())
    };
    let rows = axis(row_dim, seen_rows);
    let columns = axis(column_dim, seen_columns);

    let cells = rows
        .iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| {
                    accs.get(&(r.as_str(), c.as_str()))
                        .map_or(0.0, |acc| acc.finish(op))
                })
                .collect()
        })
        .collect();

    CrossAggregate {
        row_dimension: row_dim.clone(),
        column_dimension: column_dim.clone(),
        measure: measure.column(),
        op,
        rows,
        columns,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::bucket::{bucketize, BucketSpec};
    use crate::analyzer::table::WEEKDAYS;
    use chrono::NaiveDate;

    fn order(id: &str, city: &str, status: &str, day: u32, value: f64) -> OrderRecord {
        // January 2024: the 1st is a Monday
        let mut r = OrderRecord::new(id, NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
        r.city = city.to_string();
        r.order_status = status.to_string();
        r.order_value = value;
        r
    }

    fn sample_table() -> OrderTable {
        OrderTable::new(vec![
            order("1", "Delhi", "Completed", 1, 100.0),
            order("2", "Mumbai", "Cancelled", 3, 50.0),
            order("3", "Delhi", "Completed", 3, 200.0),
            order("4", "Pune", "Completed", 1, 40.0),
            order("5", "", "Completed", 8, 10.0),
        ])
    }

    #[test]
    fn test_sum_by_city_sorted() {
        let g = group_aggregate(&sample_table(), &Dimension::City, NumericField::OrderValue, AggOp::Sum);
        assert_eq!(g.labels(), vec!["Delhi", "Mumbai", "Pune"]);
        assert_eq!(g.values(), vec![300.0, 50.0, 40.0]);
        assert_eq!(g.measure, "Order_Value");
    }

    #[test]
    fn test_mean_and_count() {
        let table = sample_table();
        let mean = group_aggregate(&table, &Dimension::City, NumericField::OrderValue, AggOp::Mean);
        assert_eq!(mean.get("Delhi"), Some(150.0));
        let count = group_aggregate(&table, &Dimension::City, NumericField::OrderValue, AggOp::Count);
        assert_eq!(count.get("Delhi"), Some(2.0));
        assert_eq!(count.get("Pune"), Some(1.0));
    }

    #[test]
    fn test_group_sums_partition_total() {
        let table = sample_table();
        let g = group_aggregate(&table, &Dimension::OrderStatus, NumericField::OrderValue, AggOp::Sum);
        let grouped_total: f64 = g.values().iter().sum();
        let table_total: f64 = table.iter().map(|r| r.order_value).sum();
        assert!((grouped_total - table_total).abs() < 1e-10);
    }

    #[test]
    fn test_weekday_reindexed_to_seven_days() {
        // only Monday and Wednesday present
        let table = OrderTable::new(sample_table().records()[..4].to_vec());
        let g = group_aggregate(&table, &Dimension::Weekday, NumericField::OrderValue, AggOp::Sum);
        assert_eq!(g.len(), 7);
        assert_eq!(g.labels(), WEEKDAYS.to_vec());
        assert_eq!(g.get("Monday"), Some(140.0));
        assert_eq!(g.get("Wednesday"), Some(250.0));
        assert_eq!(g.get("Sunday"), Some(0.0));
    }

    #[test]
    fn test_empty_table_weekday_still_seven_zeroes() {
        let g = group_aggregate(&OrderTable::default(), &Dimension::Weekday, NumericField::OrderValue, AggOp::Mean);
        assert_eq!(g.len(), 7);
        assert!(g.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_bucket_column_reindexed_in_label_order() {
        let mut rows = sample_table().records().to_vec();
        rows[0].customer_age = Some(40.0);
        rows[1].customer_age = Some(20.0);
        rows[2].customer_age = Some(41.0);
        rows[3].customer_age = Some(99.0); // outside every bin
        let spec = BucketSpec::new(
            vec![0.0, 25.0, 50.0, 75.0],
            vec!["young".into(), "middle".into(), "senior".into()],
        )
        .unwrap();
        let table = bucketize(&OrderTable::new(rows), NumericField::CustomerAge, "Age_Group", &spec);
        let g = group_aggregate(
            &table,
            &Dimension::Derived("Age_Group".into()),
            NumericField::OrderValue,
            AggOp::Count,
        );
        assert_eq!(g.labels(), vec!["young", "middle", "senior"]);
        assert_eq!(g.values(), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_reindex_drops_foreign_keys() {
        let g = group_aggregate(&sample_table(), &Dimension::City, NumericField::OrderValue, AggOp::Sum);
        let r = reindex(&g, &["Pune".to_string(), "Chennai".to_string()]);
        assert_eq!(r.labels(), vec!["Pune", "Chennai"]);
        assert_eq!(r.values(), vec![40.0, 0.0]);
    }

    #[test]
    fn test_mean_over_undefined_measure_is_zero() {
        let g = group_aggregate(&sample_table(), &Dimension::City, NumericField::CustomerAge, AggOp::Mean);
        assert_eq!(g.get("Delhi"), Some(0.0));
    }

    #[test]
    fn test_cross_aggregate_fills_zero() {
        let c = cross_aggregate(
            &sample_table(),
            &Dimension::City,
            &Dimension::OrderStatus,
            NumericField::OrderValue,
            AggOp::Count,
        );
        assert_eq!(c.rows, vec!["Delhi", "Mumbai", "Pune"]);
        assert_eq!(c.columns, vec!["Cancelled", "Completed"]);
        assert_eq!(c.get("Delhi", "Completed"), Some(2.0));
        assert_eq!(c.get("Delhi", "Cancelled"), Some(0.0));
        assert_eq!(c.get("Mumbai", "Cancelled"), Some(1.0));
        assert_eq!(c.get("Chennai", "Completed"), None);
    }

    #[test]
    fn test_cross_aggregate_weekday_axis() {
        let c = cross_aggregate(
            &sample_table(),
            &Dimension::City,
            &Dimension::Weekday,
            NumericField::OrderValue,
            AggOp::Sum,
        );
        assert_eq!(c.columns.len(), 7);
        assert_eq!(c.get("Delhi", "Wednesday"), Some(200.0));
        assert_eq!(c.get("Pune", "Friday"), Some(0.0));
    }
}
