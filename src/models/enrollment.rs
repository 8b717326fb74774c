use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Course;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: u64,
    pub course: Course,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub progress_percentage: Option<u32>,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Percentage in 0..=100; missing values count as 0.
    pub fn progress(&self) -> u8 {
        self.progress_percentage.unwrap_or(0).min(100) as u8
    }
}

/// The lesson a progress row belongs to. Depending on the endpoint the
/// server sends either the bare id or the whole lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessonRef {
    Id(u64),
    Nested { id: u64 },
}

impl LessonRef {
    pub fn id(&self) -> u64 {
        match self {
            LessonRef::Id(id) | LessonRef::Nested { id } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: u64,
    #[serde(default)]
    pub enrollment: Option<u64>,
    pub lesson: LessonRef,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_position: u32,
}

/// Body of a progress write; the server upserts by (enrollment, lesson).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressWrite {
    pub enrollment: u64,
    pub lesson: u64,
    pub completed: bool,
}
