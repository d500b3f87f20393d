//! CLI command implementations.

mod config;
mod courses;
mod doctor;
mod serve;
mod wizard;

pub use config::run_config;
pub use courses::run_courses;
pub use doctor::run_doctor;
pub use serve::run_serve;
pub use wizard::run_wizard;
