pub mod course;
pub mod enrollment;

pub use course::{Category, Course, CourseFilters, Instructor, Lesson, Level};
pub use enrollment::{Enrollment, LessonRef, Progress, ProgressWrite};

use serde::{Deserialize, Deserializer};

/// Decimal fields arrive as strings ("49.99") or as bare numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
        None => "0.00".to_string(),
    })
}
