use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzer::table::{Dimension, OrderRecord, OrderTable};
use crate::error::AppError;

/// Declarative selection over an `OrderTable`.
///
/// A record matches when, for every constrained dimension, its value is
/// defined and in the accepted set, and its `Order_Date` falls inside the
/// optional inclusive range. Unconstrained dimensions accept everything;
/// a constraint with an empty set accepts nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    constraints: BTreeMap<Dimension, BTreeSet<String>>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        FilterSpec::default()
    }

    /// Replaces any previous constraint on `dim`.
    pub fn with<I, S>(mut self, dim: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrict(dim, values);
        self
    }

    pub fn restrict<I, S>(&mut self, dim: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints
            .insert(dim, values.into_iter().map(Into::into).collect());
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// True when the spec constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.date_from.is_none() && self.date_to.is_none()
    }

    pub fn constraints(&self) -> &BTreeMap<Dimension, BTreeSet<String>> {
        &self.constraints
    }

    pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    pub fn matches(&self, record: &OrderRecord) -> bool {
        if let Some(from) = self.date_from {
            if record.order_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.order_date > to {
                return false;
            }
        }
        self.constraints.iter().all(|(dim, accepted)| {
            record
                .dimension_value(dim)
                .is_some_and(|v| accepted.contains(v))
        })
    }

    /// Parses a `Column=value1,value2` argument against the columns of `table`.
    pub fn parse_constraint(
        table: &OrderTable,
        arg: &str,
    ) -> Result<(Dimension, Vec<String>), AppError> {
        let (name, values) = arg.split_once('=').ok_or_else(|| {
            AppError::Configuration(format!("filter {:?} is not of the form Column=v1,v2", arg))
        })?;
        let dim = table
            .dimension(name)
            .ok_or_else(|| AppError::UnknownDimension(name.trim().to_string()))?;
        let values = values
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        Ok((dim, values))
    }
}

/// Records of `table` matching `spec`, in their original order.
pub fn apply_filter(table: &OrderTable, spec: &FilterSpec) -> OrderTable {
    if spec.is_empty() {
        return table.clone();
    }
    let records = table
        .iter()
        .filter(|r| spec.matches(r))
        .cloned()
        .collect();
    table.derive(records)
}

/// Distinct observed values of every dimension, sorted. This is the default
/// "accept all" selection a UI starts from.
pub fn filter_options(table: &OrderTable) -> BTreeMap<Dimension, Vec<String>> {
    let mut options = BTreeMap::new();
    for dim in table.dimensions() {
        let distinct: BTreeSet<&str> = table
            .iter()
            .filter_map(|r| r.dimension_value(&dim))
            .collect();
        let values = match table.canonical_domain(&dim) {
            Some(domain) => domain
                .into_iter()
                .filter(|v| distinct.contains(v.as_str()))
                .collect(),
            None => distinct.into_iter().map(str::to_string).collect(),
        };
        options.insert(dim, values);
    }
    options
}
