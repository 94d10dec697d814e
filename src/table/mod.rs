//! Table types and CSV boundaries.

pub mod io;
pub mod types;

pub use io::{decode_input, parse_table, read_table, write_table, write_tables_atomically};
pub use types::{format_value, ChatMessage, FeatureColumn, RawTable};
