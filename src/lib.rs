pub mod error;
pub mod http;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use report::generate_report;
pub use runner::run_checks;
