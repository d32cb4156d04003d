//! CLI command implementations.

mod config;
mod doctor;
mod generate;
mod jobs;
mod list;
mod monitor;
mod report;

pub use config::run_config;
pub use doctor::run_doctor;
pub use generate::run_generate;
pub use jobs::{run_job, run_jobs};
pub use list::run_list;
pub use monitor::run_monitor;
pub use report::run_report;
