//! annot8 Application
//!
//! Headless shell around the annotation engine: configuration loading and
//! replay of recorded interaction scripts.

mod app;
mod replay;
mod script;

pub use app::{AppConfig, AppError, AppResult, run};
pub use replay::{ReplayOutput, Replayer};
pub use script::{Command, ReplayScript, ScriptFile, ScriptStep};
