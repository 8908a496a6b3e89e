// Validation pipeline module
// Two-stage orchestration and per-widget attempt sessions

pub mod session;
pub mod two_stage;

pub use session::{AttemptId, AttemptState, PendingCheck, Submission, TracePad, TraceSession};
pub use two_stage::{NoJudge, Resolution, TwoStageValidator, ValidationResult};
