#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use learnhub::api::{Collection, LearningApi};
use learnhub::error::AppError;
use learnhub::models::{
    Category, Course, CourseFilters, Enrollment, LessonRef, Progress, ProgressWrite,
};
use learnhub::views::Notifier;
use serde_json::json;

pub fn course(id: u64, title: &str, lesson_ids: &[u64]) -> Course {
    let lessons: Vec<_> = lesson_ids
        .iter()
        .enumerate()
        .map(|(i, lesson_id)| {
            json!({
                "id": lesson_id,
                "title": format!("Lesson {}", lesson_id),
                "description": "",
                "video_url": null,
                "content": format!("<p>Body of lesson {}</p>", lesson_id),
                "order": i + 1,
                "duration_minutes": 10
            })
        })
        .collect();

    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "description": format!("All about {}", title),
        "level": "beginner",
        "price": "0.00",
        "is_free": true,
        "duration_hours": 3,
        "lessons_count": lesson_ids.len(),
        "enrolled_count": 1,
        "lessons": lessons
    }))
    .expect("valid course fixture")
}

pub fn enrollment(id: u64, course: &Course, progress: Option<u32>) -> Enrollment {
    Enrollment {
        id,
        course: course.clone(),
        is_completed: progress == Some(100),
        progress_percentage: progress,
        enrolled_at: None,
        completed_at: None,
    }
}

/// Scripted stand-in for the remote API.
#[derive(Default)]
pub struct FakeApi {
    pub courses: Mutex<HashMap<u64, Course>>,
    /// Keyed by course id.
    pub enrollments: Mutex<HashMap<u64, Enrollment>>,
    pub progress: Mutex<Vec<(u64, Progress)>>,
    pub categories: Vec<Category>,
    pub enroll_error: Option<String>,
    pub course_delays: HashMap<u64, Duration>,
    pub calls: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<ProgressWrite>>,
    pub filters_seen: Mutex<Vec<CourseFilters>>,
}

impl FakeApi {
    pub fn with_course(self, course: Course) -> Self {
        self.courses.lock().unwrap().insert(course.id, course);
        self
    }

    pub fn with_enrollment(self, enrollment: Enrollment) -> Self {
        self.enrollments
            .lock()
            .unwrap()
            .insert(enrollment.course.id, enrollment);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LearningApi for FakeApi {
    async fn list_courses(&self, filters: &CourseFilters) -> Result<Collection<Course>, AppError> {
        self.record("list_courses".to_string());
        self.filters_seen.lock().unwrap().push(filters.clone());
        let mut items: Vec<Course> = self
            .courses
            .lock()
            .unwrap()
            .values()
            .filter(|c| filters.search.is_empty() || c.title.contains(&filters.search))
            .cloned()
            .collect();
        items.sort_by_key(|c| c.id);
        Ok(Collection {
            total: items.len() as u64,
            next: None,
            items,
        })
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, AppError> {
        self.record(format!("get_course {}", course_id));
        if let Some(delay) = self.course_delays.get(&course_id) {
            tokio::time::sleep(*delay).await;
        }
        self.courses
            .lock()
            .unwrap()
            .get(&course_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn my_enrollment(&self, course_id: u64) -> Result<Option<Enrollment>, AppError> {
        self.record(format!("my_enrollment {}", course_id));
        Ok(self.enrollments.lock().unwrap().get(&course_id).cloned())
    }

    async fn enroll(&self, course_id: u64) -> Result<Enrollment, AppError> {
        self.record(format!("enroll {}", course_id));
        if let Some(message) = &self.enroll_error {
            return Err(AppError::Api {
                status: 400,
                message: Some(message.clone()),
            });
        }
        let course = self.get_course(course_id).await?;
        let created = enrollment(900 + course_id, &course, Some(0));
        self.enrollments
            .lock()
            .unwrap()
            .insert(course_id, created.clone());
        Ok(created)
    }

    async fn list_enrollments(&self) -> Result<Collection<Enrollment>, AppError> {
        self.record("list_enrollments".to_string());
        let mut items: Vec<Enrollment> =
            self.enrollments.lock().unwrap().values().cloned().collect();
        items.sort_by_key(|e| e.id);
        Ok(Collection {
            total: items.len() as u64,
            next: None,
            items,
        })
    }

    async fn find_progress(
        &self,
        enrollment_id: u64,
        lesson_id: u64,
    ) -> Result<Option<Progress>, AppError> {
        self.record(format!("find_progress {} {}", enrollment_id, lesson_id));
        Ok(self
            .progress
            .lock()
            .unwrap()
            .iter()
            .find(|(e, p)| *e == enrollment_id && p.lesson.id() == lesson_id)
            .map(|(_, p)| p.clone()))
    }

    async fn record_progress(&self, write: &ProgressWrite) -> Result<Progress, AppError> {
        self.record(format!("record_progress {} {}", write.enrollment, write.lesson));
        self.writes.lock().unwrap().push(write.clone());
        let progress = Progress {
            id: 500 + write.lesson,
            enrollment: Some(write.enrollment),
            lesson: LessonRef::Id(write.lesson),
            completed: write.completed,
            completed_at: None,
            last_position: 0,
        };
        self.progress
            .lock()
            .unwrap()
            .push((write.enrollment, progress.clone()));
        Ok(progress)
    }

    async fn list_categories(&self) -> Result<Collection<Category>, AppError> {
        self.record("list_categories".to_string());
        Ok(Collection {
            items: self.categories.clone(),
            total: self.categories.len() as u64,
            next: None,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
