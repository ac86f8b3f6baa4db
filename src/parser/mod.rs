pub mod expr;

pub use expr::{parse_clue, PResult};
