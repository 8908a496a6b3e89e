// Letter shape definitions
// Reference waypoint paths for each traceable glyph, normalized to the unit square

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::trace::types::Point;

/// Errors that can occur while loading shape data
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Glyph key must be a single character, got {0:?}")]
    InvalidGlyphKey(String),

    #[error("Invalid waypoint for '{letter}': {reason}")]
    InvalidWaypoint { letter: char, reason: String },

    #[error("Shape for '{0}' has no waypoints")]
    EmptyShape(char),
}

/// A reference point on a glyph's canonical stroke path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Horizontal position in [0, 1], left to right
    pub x: f32,

    /// Vertical position in [0, 1], top to bottom
    pub y: f32,

    /// 1-based position along the stroke path
    pub order: u32,
}

impl Waypoint {
    pub fn new(x: f32, y: f32, order: u32) -> Self {
        Waypoint { x, y, order }
    }

    /// Position in pixel space on a square canvas of the given edge length
    pub fn to_canvas(&self, canvas_size: f32) -> Point {
        Point::new(self.x * canvas_size, self.y * canvas_size)
    }
}

/// Ordered waypoint path for one character
///
/// Waypoints are always sorted by `order`, unique per order value, and
/// numbered contiguously from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterShapeDefinition {
    letter: char,
    waypoints: Vec<Waypoint>,
}

impl LetterShapeDefinition {
    /// Build a definition from raw waypoint data
    ///
    /// Duplicate order values keep the first occurrence in input order.
    /// Orders are then renumbered 1..N, closing any gaps.
    pub fn from_raw(letter: char, raw: Vec<Waypoint>) -> Result<Self, ShapeError> {
        for wp in &raw {
            if !(wp.x.is_finite() && wp.y.is_finite()) {
                return Err(ShapeError::InvalidWaypoint {
                    letter,
                    reason: format!("non-finite coordinate at order {}", wp.order),
                });
            }
            if !(0.0..=1.0).contains(&wp.x) || !(0.0..=1.0).contains(&wp.y) {
                return Err(ShapeError::InvalidWaypoint {
                    letter,
                    reason: format!("({}, {}) outside the unit square", wp.x, wp.y),
                });
            }
            if wp.order == 0 {
                return Err(ShapeError::InvalidWaypoint {
                    letter,
                    reason: "order values start at 1".to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut waypoints: Vec<Waypoint> = raw
            .into_iter()
            .filter(|wp| seen.insert(wp.order))
            .collect();

        if waypoints.is_empty() {
            return Err(ShapeError::EmptyShape(letter));
        }

        waypoints.sort_by_key(|wp| wp.order);
        for (i, wp) in waypoints.iter_mut().enumerate() {
            wp.order = i as u32 + 1;
        }

        Ok(LetterShapeDefinition { letter, waypoints })
    }

    /// Build a definition from stroke paths, numbering waypoints in drawing order
    fn from_strokes(letter: char, strokes: &[&[(f32, f32)]]) -> Self {
        let waypoints = strokes
            .iter()
            .flat_map(|stroke| stroke.iter())
            .enumerate()
            .map(|(i, &(x, y))| Waypoint::new(x, y, i as u32 + 1))
            .collect();

        LetterShapeDefinition { letter, waypoints }
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    /// Waypoints in ascending order
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints de-normalized onto a canvas, in order
    pub fn canvas_path(&self, canvas_size: f32) -> Vec<Point> {
        self.waypoints
            .iter()
            .map(|wp| wp.to_canvas(canvas_size))
            .collect()
    }
}

/// On-disk form of a shape library: glyph -> raw waypoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ShapeDocument {
    glyphs: BTreeMap<String, Vec<Waypoint>>,
}

/// Lookup table of glyph shapes, keyed by exact character
///
/// Absence of a glyph is an expected outcome: callers must present
/// "not available" rather than treating every attempt as rejected.
#[derive(Debug, Clone, Default)]
pub struct ShapeLibrary {
    shapes: HashMap<char, LetterShapeDefinition>,
}

impl ShapeLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        ShapeLibrary {
            shapes: HashMap::new(),
        }
    }

    /// Library with the built-in uppercase, lowercase, and digit glyphs
    pub fn builtin() -> Self {
        let shapes = BUILTIN_GLYPHS
            .iter()
            .map(|(letter, strokes)| {
                (*letter, LetterShapeDefinition::from_strokes(*letter, strokes))
            })
            .collect();

        ShapeLibrary { shapes }
    }

    /// Case-sensitive lookup
    pub fn get_shape_for(&self, letter: char) -> Option<&LetterShapeDefinition> {
        self.shapes.get(&letter)
    }

    pub fn contains(&self, letter: char) -> bool {
        self.shapes.contains_key(&letter)
    }

    /// Add or replace a glyph
    pub fn insert(&mut self, shape: LetterShapeDefinition) {
        self.shapes.insert(shape.letter, shape);
    }

    /// All defined glyphs, sorted
    pub fn letters(&self) -> Vec<char> {
        let mut letters: Vec<char> = self.shapes.keys().copied().collect();
        letters.sort_unstable();
        letters
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Serialize library to JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ShapeError> {
        let glyphs = self
            .shapes
            .values()
            .map(|shape| (shape.letter.to_string(), shape.waypoints.clone()))
            .collect();

        Ok(serde_json::to_vec_pretty(&ShapeDocument { glyphs })?)
    }

    /// Deserialize library from JSON bytes, deduplicating raw waypoint orders
    pub fn from_json_bytes(data: &[u8]) -> Result<Self, ShapeError> {
        let document: ShapeDocument = serde_json::from_slice(data)?;
        let mut library = ShapeLibrary::new();

        for (key, raw) in document.glyphs {
            let mut chars = key.chars();
            let letter = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(ShapeError::InvalidGlyphKey(key)),
            };
            library.insert(LetterShapeDefinition::from_raw(letter, raw)?);
        }

        Ok(library)
    }

    /// Overlay another library on top of this one
    pub fn merge(&mut self, other: ShapeLibrary) {
        self.shapes.extend(other.shapes);
    }
}

/// Built-in glyph paths, one slice per stroke in writing order
/// Coordinates are normalized with y growing downward
const BUILTIN_GLYPHS: &[(char, &[&[(f32, f32)]])] = &[
    // Uppercase
    (
        'A',
        &[
            &[(0.5, 0.1), (0.3, 0.5), (0.15, 0.9)],
            &[(0.5, 0.1), (0.7, 0.5), (0.85, 0.9)],
            &[(0.3, 0.65), (0.7, 0.65)],
        ],
    ),
    (
        'B',
        &[
            &[(0.25, 0.1), (0.25, 0.9)],
            &[(0.25, 0.1), (0.65, 0.22), (0.45, 0.5), (0.75, 0.7), (0.25, 0.9)],
        ],
    ),
    ('C', &[&[(0.8, 0.2), (0.5, 0.1), (0.2, 0.5), (0.5, 0.9), (0.8, 0.8)]]),
    ('D', &[&[(0.25, 0.1), (0.25, 0.9)], &[(0.25, 0.1), (0.75, 0.5), (0.25, 0.9)]]),
    (
        'E',
        &[
            &[(0.75, 0.1), (0.25, 0.1), (0.25, 0.5), (0.25, 0.9), (0.75, 0.9)],
            &[(0.25, 0.5), (0.65, 0.5)],
        ],
    ),
    ('F', &[&[(0.75, 0.1), (0.25, 0.1), (0.25, 0.9)], &[(0.25, 0.5), (0.65, 0.5)]]),
    ('G', &[&[(0.8, 0.2), (0.5, 0.1), (0.2, 0.5), (0.5, 0.9), (0.8, 0.7), (0.55, 0.6)]]),
    ('H', &[&[(0.2, 0.1), (0.2, 0.9)], &[(0.8, 0.1), (0.8, 0.9)], &[(0.2, 0.5), (0.8, 0.5)]]),
    ('I', &[&[(0.5, 0.1), (0.5, 0.9)], &[(0.3, 0.1), (0.7, 0.1)], &[(0.3, 0.9), (0.7, 0.9)]]),
    ('J', &[&[(0.6, 0.1), (0.6, 0.7), (0.4, 0.9), (0.2, 0.75)]]),
    ('K', &[&[(0.25, 0.1), (0.25, 0.9)], &[(0.75, 0.1), (0.25, 0.55), (0.75, 0.9)]]),
    ('L', &[&[(0.25, 0.1), (0.25, 0.9), (0.75, 0.9)]]),
    ('M', &[&[(0.15, 0.9), (0.15, 0.1), (0.5, 0.6), (0.85, 0.1), (0.85, 0.9)]]),
    ('N', &[&[(0.2, 0.9), (0.2, 0.1), (0.8, 0.9), (0.8, 0.1)]]),
    ('O', &[&[(0.5, 0.1), (0.2, 0.5), (0.5, 0.9), (0.8, 0.5), (0.5, 0.1)]]),
    ('P', &[&[(0.25, 0.9), (0.25, 0.1), (0.7, 0.25), (0.25, 0.5)]]),
    (
        'Q',
        &[
            &[(0.5, 0.1), (0.2, 0.5), (0.5, 0.9), (0.8, 0.5), (0.5, 0.1)],
            &[(0.6, 0.7), (0.85, 0.95)],
        ],
    ),
    ('R', &[&[(0.25, 0.9), (0.25, 0.1), (0.7, 0.25), (0.25, 0.5), (0.75, 0.9)]]),
    ('S', &[&[(0.8, 0.2), (0.5, 0.1), (0.2, 0.3), (0.5, 0.5), (0.8, 0.7), (0.5, 0.9), (0.2, 0.8)]]),
    ('T', &[&[(0.15, 0.1), (0.85, 0.1)], &[(0.5, 0.1), (0.5, 0.9)]]),
    ('U', &[&[(0.2, 0.1), (0.2, 0.7), (0.5, 0.9), (0.8, 0.7), (0.8, 0.1)]]),
    ('V', &[&[(0.15, 0.1), (0.5, 0.9), (0.85, 0.1)]]),
    ('W', &[&[(0.1, 0.1), (0.3, 0.9), (0.5, 0.4), (0.7, 0.9), (0.9, 0.1)]]),
    ('X', &[&[(0.2, 0.1), (0.8, 0.9)], &[(0.8, 0.1), (0.2, 0.9)]]),
    ('Y', &[&[(0.2, 0.1), (0.5, 0.5), (0.8, 0.1)], &[(0.5, 0.5), (0.5, 0.9)]]),
    ('Z', &[&[(0.2, 0.1), (0.8, 0.1), (0.2, 0.9), (0.8, 0.9)]]),
    // Lowercase
    (
        'a',
        &[
            &[(0.7, 0.45), (0.4, 0.4), (0.25, 0.65), (0.45, 0.9), (0.7, 0.72)],
            &[(0.72, 0.4), (0.72, 0.9)],
        ],
    ),
    ('b', &[&[(0.3, 0.1), (0.3, 0.9)], &[(0.3, 0.6), (0.55, 0.42), (0.75, 0.68), (0.5, 0.9)]]),
    ('c', &[&[(0.7, 0.5), (0.45, 0.4), (0.25, 0.65), (0.45, 0.9), (0.7, 0.8)]]),
    (
        'd',
        &[
            &[(0.7, 0.5), (0.45, 0.4), (0.25, 0.65), (0.45, 0.9), (0.7, 0.75)],
            &[(0.7, 0.1), (0.7, 0.9)],
        ],
    ),
    ('e', &[&[(0.25, 0.65), (0.75, 0.65), (0.5, 0.4), (0.25, 0.65), (0.5, 0.9), (0.75, 0.82)]]),
    ('f', &[&[(0.7, 0.15), (0.5, 0.1), (0.4, 0.3), (0.4, 0.9)], &[(0.2, 0.45), (0.65, 0.45)]]),
    (
        'g',
        &[
            &[(0.7, 0.45), (0.45, 0.4), (0.3, 0.6), (0.5, 0.75), (0.7, 0.6)],
            &[(0.72, 0.4), (0.72, 0.85), (0.45, 0.98), (0.25, 0.88)],
        ],
    ),
    ('h', &[&[(0.3, 0.1), (0.3, 0.9)], &[(0.3, 0.6), (0.5, 0.4), (0.7, 0.55), (0.7, 0.9)]]),
    ('i', &[&[(0.5, 0.4), (0.5, 0.9)], &[(0.5, 0.2)]]),
    ('j', &[&[(0.55, 0.4), (0.55, 0.85), (0.4, 0.98), (0.25, 0.85)], &[(0.55, 0.2)]]),
    ('k', &[&[(0.3, 0.1), (0.3, 0.9)], &[(0.7, 0.4), (0.3, 0.65), (0.7, 0.9)]]),
    ('l', &[&[(0.5, 0.1), (0.5, 0.9)]]),
    (
        'm',
        &[
            &[(0.15, 0.4), (0.15, 0.9)],
            &[(0.15, 0.5), (0.32, 0.4), (0.5, 0.55), (0.5, 0.9)],
            &[(0.5, 0.55), (0.68, 0.4), (0.85, 0.55), (0.85, 0.9)],
        ],
    ),
    ('n', &[&[(0.25, 0.4), (0.25, 0.9)], &[(0.25, 0.55), (0.5, 0.4), (0.75, 0.55), (0.75, 0.9)]]),
    ('o', &[&[(0.5, 0.4), (0.25, 0.65), (0.5, 0.9), (0.75, 0.65), (0.5, 0.4)]]),
    (
        'p',
        &[
            &[(0.3, 0.4), (0.3, 1.0)],
            &[(0.3, 0.5), (0.55, 0.4), (0.75, 0.6), (0.5, 0.8), (0.3, 0.72)],
        ],
    ),
    (
        'q',
        &[
            &[(0.7, 0.5), (0.45, 0.4), (0.25, 0.6), (0.45, 0.8), (0.7, 0.72)],
            &[(0.72, 0.4), (0.72, 1.0)],
        ],
    ),
    ('r', &[&[(0.3, 0.4), (0.3, 0.9)], &[(0.3, 0.6), (0.5, 0.42), (0.72, 0.45)]]),
    (
        's',
        &[
            &[
                (0.7, 0.45),
                (0.45, 0.4),
                (0.3, 0.52),
                (0.5, 0.65),
                (0.7, 0.78),
                (0.5, 0.9),
                (0.28, 0.85),
            ],
        ],
    ),
    ('t', &[&[(0.5, 0.15), (0.5, 0.8), (0.65, 0.9)], &[(0.3, 0.4), (0.7, 0.4)]]),
    ('u', &[&[(0.25, 0.4), (0.25, 0.75), (0.45, 0.9), (0.7, 0.8)], &[(0.75, 0.4), (0.75, 0.9)]]),
    ('v', &[&[(0.25, 0.4), (0.5, 0.9), (0.75, 0.4)]]),
    ('w', &[&[(0.1, 0.4), (0.3, 0.9), (0.5, 0.55), (0.7, 0.9), (0.9, 0.4)]]),
    ('x', &[&[(0.25, 0.4), (0.75, 0.9)], &[(0.75, 0.4), (0.25, 0.9)]]),
    ('y', &[&[(0.25, 0.4), (0.5, 0.7)], &[(0.75, 0.4), (0.5, 0.7), (0.3, 0.98)]]),
    ('z', &[&[(0.25, 0.4), (0.75, 0.4), (0.25, 0.9), (0.75, 0.9)]]),
    // Digits
    ('0', &[&[(0.5, 0.1), (0.2, 0.5), (0.5, 0.9), (0.8, 0.5), (0.5, 0.1)]]),
    ('1', &[&[(0.3, 0.25), (0.5, 0.1), (0.5, 0.9)]]),
    ('2', &[&[(0.25, 0.25), (0.5, 0.1), (0.75, 0.3), (0.25, 0.9), (0.75, 0.9)]]),
    (
        '3',
        &[
            &[
                (0.25, 0.15),
                (0.6, 0.1),
                (0.7, 0.3),
                (0.45, 0.5),
                (0.75, 0.7),
                (0.55, 0.9),
                (0.25, 0.85),
            ],
        ],
    ),
    ('4', &[&[(0.6, 0.1), (0.2, 0.65), (0.8, 0.65)], &[(0.6, 0.35), (0.6, 0.9)]]),
    (
        '5',
        &[
            &[
                (0.75, 0.1),
                (0.3, 0.1),
                (0.25, 0.45),
                (0.6, 0.4),
                (0.75, 0.65),
                (0.5, 0.9),
                (0.25, 0.8),
            ],
        ],
    ),
    ('6', &[&[(0.7, 0.1), (0.35, 0.3), (0.25, 0.7), (0.5, 0.9), (0.75, 0.7), (0.5, 0.5)]]),
    ('7', &[&[(0.2, 0.1), (0.8, 0.1), (0.4, 0.9)]]),
    (
        '8',
        &[
            &[
                (0.5, 0.5),
                (0.25, 0.3),
                (0.5, 0.1),
                (0.75, 0.3),
                (0.5, 0.5),
                (0.25, 0.7),
                (0.5, 0.9),
                (0.75, 0.7),
                (0.5, 0.5),
            ],
        ],
    ),
    ('9', &[&[(0.75, 0.3), (0.5, 0.1), (0.25, 0.3), (0.5, 0.5), (0.75, 0.3), (0.7, 0.9)]]),
];
