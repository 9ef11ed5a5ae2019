pub mod record;
pub mod rows;

pub use record::{OrderRecord, OrderRow};
pub use rows::{to_rows, FallbackFilter, OrderRows};
