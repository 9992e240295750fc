pub mod source;

pub use source::{load_orders, open_source};
