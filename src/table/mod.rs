// Translation tables.
//
// - `entry`: byte/text pattern data model
// - `parser`: table source grammar and validation
// - `order`: per-direction ordering that makes first-match scanning unambiguous

pub mod entry;
pub mod order;
pub mod parser;

pub use entry::{ByteMatcher, PatternEntry, TableEntry, TextPattern, TextSegment};
pub use order::{Direction, PatternTable};
pub use parser::{MalformedReason, TableError, parse_table};
