// Trace validation module
// Trace capture types, glyph reference shapes, and the geometric validator

pub mod shapes;
pub mod types;
pub mod validator;

pub use shapes::{LetterShapeDefinition, ShapeError, ShapeLibrary, Waypoint};
pub use types::{Point, Trace, TraceSample};
pub use validator::{
    builtin_library, validate_letter_trace, Tolerance, ValidationError, ValidatorConfig,
    WaypointValidator,
};
