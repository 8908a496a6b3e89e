// Data models for practice progress
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::Resolution;

/// One submitted trace and how it was judged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeAttempt {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub letter: char,
    pub accepted: bool,
    pub resolution: Resolution,
    pub feedback: Option<String>,
    pub point_count: i64,
    pub stroke_count: i64,
}

/// Aggregate practice history for one letter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterProgress {
    pub letter: char,
    pub attempts: i64,
    pub accepted: i64,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl LetterProgress {
    pub fn empty(letter: char) -> Self {
        LetterProgress {
            letter,
            attempts: 0,
            accepted: 0,
            last_practiced: None,
        }
    }

    /// Fraction of attempts accepted, 0.0 when never practiced
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempts as f64
        }
    }
}
