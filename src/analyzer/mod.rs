pub mod bucket;
pub mod dashboard;
pub mod filter;
pub mod group;
pub mod kpi;
pub mod stats;
pub mod table;

pub use bucket::{bucketize, BucketSpec};
pub use dashboard::{build_dashboard, DashboardPayload};
pub use filter::{apply_filter, filter_options, FilterSpec};
pub use group::{cross_aggregate, group_aggregate, reindex, AggOp, CrossAggregate, GroupedAggregate};
pub use kpi::{compute_kpis, KpiSummary};
pub use table::{Dimension, NumericField, OrderRecord, OrderTable};
