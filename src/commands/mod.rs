pub mod check;
pub mod input;
pub mod output;
pub mod parse;
pub mod stats;

pub use check::run_check;
pub use parse::run_parse;
pub use stats::run_stats;
