// Handwriting judge module
// Optional semantic confirmation of geometrically accepted traces

pub mod http;

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::render::TraceImage;

pub use http::{HttpJudge, JudgeConfig};

/// Errors that can occur while consulting a judge
/// Never shown to the learner: the orchestrator fails open on all of them
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Judge not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Judge returned status {0}")]
    Status(u16),

    #[error("Judge unavailable after {0} attempts")]
    RetriesExhausted(u32),

    #[error("Malformed judge response: {0}")]
    MalformedResponse(String),
}

/// Judge decision on a rendered trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Whether the drawing reads as the target character
    pub valid: bool,

    /// Short encouragement or correction for the learner
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Image-based confirmation capability supplied by the host application
pub trait HandwritingJudge: Send + Sync {
    fn evaluate(
        &self,
        image: &TraceImage,
        letter: char,
    ) -> impl Future<Output = Result<JudgeVerdict, JudgeError>> + Send;
}
