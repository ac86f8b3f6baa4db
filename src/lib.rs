// Reusable library API; the CLI in main.rs is a thin front end over it
pub mod cache;
pub mod clue;
pub mod derivation;
pub mod errors;
pub mod lexicon;
pub mod log;
pub mod parser;
pub mod shape;
pub mod solver;
pub mod transforms;
pub mod word_list;
