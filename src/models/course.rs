use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown level: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default = "free_price", deserialize_with = "super::string_or_number")]
    pub price: String,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub instructor: Option<Instructor>,
    #[serde(default)]
    pub category: Option<Category>,
    /// Ordered; only present on detail responses.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub lessons_count: Option<u32>,
    #[serde(default)]
    pub enrolled_count: Option<u32>,
    #[serde(default)]
    pub duration_hours: u32,
    #[serde(default)]
    pub is_enrolled: bool,
}

fn free_price() -> String {
    "0.00".to_string()
}

impl Course {
    /// "Free" or "$<price>".
    pub fn price_label(&self) -> String {
        if self.is_free {
            "Free".to_string()
        } else {
            format!("${}", self.price)
        }
    }

    pub fn lesson_index(&self, lesson_id: u64) -> Option<usize> {
        self.lessons.iter().position(|l| l.id == lesson_id)
    }

    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.lessons.first()
    }
}

/// Catalog filters. Empty values are left out of the request entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilters {
    pub category: String,
    pub level: Option<Level>,
    pub search: String,
}

impl CourseFilters {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.category.is_empty() {
            pairs.push(("category", self.category.clone()));
        }
        if let Some(level) = self.level {
            pairs.push(("level", level.as_str().to_string()));
        }
        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        pairs
    }
}
