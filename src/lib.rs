pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod runner;
pub mod worker;

pub use error::{CodepadError, Result};
pub use language::Language;
