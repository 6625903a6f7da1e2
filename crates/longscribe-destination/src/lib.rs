pub mod csv_dest;
pub mod row;

pub use csv_dest::CsvDestination;
pub use row::{format_confidence, format_timestamp, OutputRow};
