// UI-facing commands
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, ConfigError};
use crate::judge::{HandwritingJudge, HttpJudge};
use crate::pipeline::{Resolution, TracePad, TwoStageValidator};
use crate::state::{self, DbConnection, DbError, LetterProgress, PracticeAttempt};
use crate::trace::{Point, Trace, TraceSample, ValidationError, Waypoint, WaypointValidator};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

// ==================== APP CONTEXT ====================

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Everything the commands need: settings, progress store, and validator
pub struct AppContext<J = HttpJudge> {
    config: AppConfig,
    db: DbConnection,
    validator: Arc<TwoStageValidator<J>>,
}

impl AppContext<HttpJudge> {
    /// Load config and open the progress database from the app data directory
    pub fn init() -> Result<Self, InitError> {
        let config = AppConfig::load_default()?;
        let db = state::init_db()?;
        Self::with_config(config, db)
    }

    /// Build with the HTTP judge when it is enabled and has credentials
    pub fn with_config(config: AppConfig, db: DbConnection) -> Result<Self, InitError> {
        let judge = if config.judge.enabled {
            match HttpJudge::new(config.judge.clone()) {
                Ok(judge) => {
                    log::info!("Judge enabled ({})", config.judge.model);
                    Some(judge)
                }
                Err(e) => {
                    log::warn!("Judge disabled: {}", e);
                    None
                }
            }
        } else {
            log::info!("Judge disabled by config; local validation only");
            None
        };

        Ok(Self::new(config, db, judge)?)
    }
}

impl<J> AppContext<J> {
    pub fn new(config: AppConfig, db: DbConnection, judge: Option<J>) -> Result<Self, ConfigError> {
        config.validate()?;
        let library = config.trace.load_shapes()?;
        let validator = TwoStageValidator::new(
            library,
            WaypointValidator::with_config(config.trace.validator_config()),
            judge,
        )
        .with_render_options(config.render.clone());

        log::info!(
            "Trace validation ready: {} glyphs, canvas {}px",
            validator.library().len(),
            config.trace.canvas_size
        );

        Ok(AppContext {
            config,
            db,
            validator: Arc::new(validator),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &DbConnection {
        &self.db
    }

    pub fn validator(&self) -> &Arc<TwoStageValidator<J>> {
        &self.validator
    }
}

impl<J: HandwritingJudge> AppContext<J> {
    /// A fresh trace widget for `letter` at the configured canvas size
    pub fn trace_pad(&self, letter: char) -> TracePad<J> {
        TracePad::new(letter, self.config.trace.canvas_size, Arc::clone(&self.validator))
    }
}

fn parse_letter(input: &str) -> CommandResult<char> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CommandError::from(format!(
            "Expected a single character, got {:?}",
            input
        ))),
    }
}

fn resolve_canvas_size<J>(ctx: &AppContext<J>, requested: Option<f32>) -> CommandResult<f32> {
    let size = requested.unwrap_or(ctx.config.trace.canvas_size);
    if !size.is_finite() || size <= 0.0 {
        return Err(CommandError::from(ConfigError::InvalidCanvasSize(size)));
    }
    Ok(size)
}

// ==================== SHAPE COMMANDS ====================

#[derive(Debug, Serialize)]
pub struct LetterShapeOutput {
    pub letter: char,
    pub waypoints: Vec<Waypoint>,
    /// Waypoints in canvas pixels, for drawing the guide
    pub path: Vec<Point>,
    pub canvas_size: f32,
}

/// Reference path for a letter, or `None` when no shape is defined
pub async fn get_letter_shape<J>(
    ctx: &AppContext<J>,
    letter: String,
    canvas_size: Option<f32>,
) -> CommandResult<Option<LetterShapeOutput>> {
    let letter = parse_letter(&letter)?;
    let canvas_size = resolve_canvas_size(ctx, canvas_size)?;

    Ok(ctx
        .validator
        .library()
        .get_shape_for(letter)
        .map(|shape| LetterShapeOutput {
            letter,
            waypoints: shape.waypoints().to_vec(),
            path: shape.canvas_path(canvas_size),
            canvas_size,
        }))
}

pub async fn list_available_letters<J>(ctx: &AppContext<J>) -> CommandResult<Vec<char>> {
    Ok(ctx.validator.library().letters())
}

// ==================== CHECK COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct CheckTraceInput {
    pub letter: String,
    pub samples: Vec<TraceSample>,
    #[serde(default)]
    pub canvas_size: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Accepted,
    Rejected,
    /// Letter has no reference shape; show "not available" instead of a result
    NoShape,
}

#[derive(Debug, Serialize)]
pub struct CheckTraceOutput {
    pub status: CheckStatus,
    pub feedback: Option<String>,
    pub resolution: Option<Resolution>,
    /// `None` when no shape exists or the attempt could not be stored
    pub attempt_id: Option<Uuid>,
}

/// Validate a finished trace and record the attempt
pub async fn check_trace<J: HandwritingJudge>(
    ctx: &AppContext<J>,
    input: CheckTraceInput,
) -> CommandResult<CheckTraceOutput> {
    let letter = parse_letter(&input.letter)?;
    let canvas_size = resolve_canvas_size(ctx, input.canvas_size)?;
    let trace = Trace::from_samples(input.samples);

    let result = match ctx.validator.validate(&trace, letter, canvas_size).await {
        Ok(result) => result,
        Err(ValidationError::NoShapeDefined(_)) => {
            log::warn!("No shape defined for '{}'", letter);
            return Ok(CheckTraceOutput {
                status: CheckStatus::NoShape,
                feedback: None,
                resolution: None,
                attempt_id: None,
            });
        }
        Err(e) => return Err(e.into()),
    };

    // Losing a history row must not cost the learner their result
    let attempt_id = match state::record_attempt(&ctx.db, letter, &trace, &result) {
        Ok(attempt) => Some(attempt.id),
        Err(e) => {
            log::error!("Failed to record attempt for '{}': {}", letter, e);
            None
        }
    };

    Ok(CheckTraceOutput {
        status: if result.accepted {
            CheckStatus::Accepted
        } else {
            CheckStatus::Rejected
        },
        feedback: result.feedback,
        resolution: Some(result.resolution),
        attempt_id,
    })
}

// ==================== PROGRESS COMMANDS ====================

pub async fn get_letter_progress<J>(
    ctx: &AppContext<J>,
    letter: String,
) -> CommandResult<LetterProgress> {
    let letter = parse_letter(&letter)?;
    Ok(state::letter_progress(&ctx.db, letter)?)
}

pub async fn list_letter_progress<J>(ctx: &AppContext<J>) -> CommandResult<Vec<LetterProgress>> {
    Ok(state::list_letter_progress(&ctx.db)?)
}

pub async fn list_recent_attempts<J>(
    ctx: &AppContext<J>,
    letter: String,
    limit: Option<usize>,
) -> CommandResult<Vec<PracticeAttempt>> {
    let letter = parse_letter(&letter)?;
    Ok(state::list_attempts_for_letter(
        &ctx.db,
        letter,
        limit.unwrap_or(20),
    )?)
}

/// Clear a letter's history; returns the number of attempts removed
pub async fn reset_letter_progress<J>(ctx: &AppContext<J>, letter: String) -> CommandResult<usize> {
    let letter = parse_letter(&letter)?;
    Ok(state::reset_letter(&ctx.db, letter)?)
}
