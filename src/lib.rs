// BrightPath - Handwriting trace validation core
// Module declarations

pub mod commands;
pub mod config;
pub mod judge;
pub mod pipeline;
pub mod render;
pub mod state;
pub mod trace;

pub use commands::{AppContext, CommandError, CommandResult, InitError};
pub use config::{AppConfig, ConfigError};
pub use judge::{HandwritingJudge, HttpJudge, JudgeConfig, JudgeError, JudgeVerdict};
pub use pipeline::{
    NoJudge, Resolution, TracePad, TraceSession, TwoStageValidator, ValidationResult,
};
pub use trace::{validate_letter_trace, Point, ShapeLibrary, Trace, ValidationError};

/// Build the app context, logging why startup failed if it does
///
/// The host shell installs its own `log` backend before calling this.
pub fn init() -> Result<AppContext, InitError> {
    AppContext::init().map_err(|e| {
        log::error!("Failed to initialize BrightPath: {}", e);
        e
    })
}
