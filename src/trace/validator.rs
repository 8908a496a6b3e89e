// Waypoint proximity validator
// Decides from trace geometry alone whether a drawing follows a glyph's reference path

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::trace::shapes::{LetterShapeDefinition, ShapeLibrary};
use crate::trace::types::Point;

/// Errors that can occur during validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Content gap, distinct from a rejected drawing
    #[error("No shape defined for '{0}'")]
    NoShapeDefined(char),

    #[error("A check is already in flight for this trace")]
    CheckInFlight,
}

/// Proximity radius around each waypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Tolerance {
    /// Fixed radius in pixels regardless of canvas size
    Pixels(f32),

    /// Radius as a fraction of the canvas edge length
    CanvasFraction(f32),
}

impl Tolerance {
    /// Radius in pixels for a canvas of the given edge length
    pub fn radius(&self, canvas_size: f32) -> f32 {
        match *self {
            Tolerance::Pixels(px) => px,
            Tolerance::CanvasFraction(fraction) => fraction * canvas_size,
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        // One eighth of the edge: wide enough for a child's motor imprecision
        Tolerance::CanvasFraction(0.125)
    }
}

/// Configuration for the proximity validator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Radius within which a trace point counts as visiting a waypoint
    pub tolerance: Tolerance,
}

/// Ordered waypoint matcher
///
/// Each waypoint must be visited, in order, by some trace point within the
/// tolerance radius. The search for waypoint k+1 starts at the trace index
/// that matched waypoint k, so revisiting a region or drawing the path
/// backwards does not satisfy later waypoints.
#[derive(Debug, Clone, Default)]
pub struct WaypointValidator {
    config: ValidatorConfig,
}

impl WaypointValidator {
    /// Create a new validator with default configuration
    pub fn new() -> Self {
        WaypointValidator {
            config: ValidatorConfig::default(),
        }
    }

    /// Create a validator with custom configuration
    pub fn with_config(config: ValidatorConfig) -> Self {
        WaypointValidator { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Check flattened trace points against a shape on a square canvas
    pub fn validate(
        &self,
        points: &[Point],
        shape: &LetterShapeDefinition,
        canvas_size: f32,
    ) -> bool {
        let waypoints = shape.waypoints();

        if points.is_empty() || waypoints.is_empty() || points.len() < waypoints.len() {
            log::debug!(
                "Trace for '{}' rejected: {} points for {} waypoints",
                shape.letter(),
                points.len(),
                waypoints.len()
            );
            return false;
        }

        let radius = self.config.tolerance.radius(canvas_size);
        let radius_sq = radius * radius;
        let matched = Self::match_in_order(points, &shape.canvas_path(canvas_size), radius_sq);
        let accepted = matched == waypoints.len();

        log::debug!(
            "Trace for '{}': matched {}/{} waypoints (radius {:.1}px) -> {}",
            shape.letter(),
            matched,
            waypoints.len(),
            radius,
            if accepted { "accept" } else { "reject" }
        );

        accepted
    }

    /// Look up the glyph and validate against it
    pub fn validate_letter(
        &self,
        library: &ShapeLibrary,
        points: &[Point],
        letter: char,
        canvas_size: f32,
    ) -> Result<bool, ValidationError> {
        let shape = library
            .get_shape_for(letter)
            .ok_or(ValidationError::NoShapeDefined(letter))?;

        Ok(self.validate(points, shape, canvas_size))
    }

    /// Number of leading waypoints visited in sequence
    fn match_in_order(points: &[Point], path: &[Point], radius_sq: f32) -> usize {
        let mut start = 0;

        for (matched, target) in path.iter().enumerate() {
            let hit = points[start..]
                .iter()
                .position(|p| p.distance_sq(target) <= radius_sq);

            match hit {
                Some(offset) => start += offset,
                None => return matched,
            }
        }

        path.len()
    }
}

static BUILTIN_LIBRARY: OnceLock<ShapeLibrary> = OnceLock::new();

/// Built-in glyph table, built on first use and shared afterwards
pub fn builtin_library() -> &'static ShapeLibrary {
    BUILTIN_LIBRARY.get_or_init(ShapeLibrary::builtin)
}

/// Validate a trace against the built-in glyph table with default tolerance
pub fn validate_letter_trace(
    points: &[Point],
    letter: char,
    canvas_size: f32,
) -> Result<bool, ValidationError> {
    WaypointValidator::new().validate_letter(builtin_library(), points, letter, canvas_size)
}
