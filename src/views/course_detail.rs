use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use super::{Generation, Notifier};
use crate::api::LearningApi;
use crate::content::plain_text;
use crate::error::AppError;
use crate::models::{Course, Enrollment};
use crate::routing::{Navigator, Route};
use crate::session::SessionManager;

struct DetailState {
    course_id: u64,
    loading: bool,
    course: Option<Course>,
    enrollment: Option<Enrollment>,
    enrolling: bool,
}

pub struct CourseDetailView {
    api: Arc<dyn LearningApi>,
    session: SessionManager,
    navigator: Navigator,
    notifier: Arc<dyn Notifier>,
    generation: Generation,
    state: Mutex<DetailState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryAction {
    Enroll { in_flight: bool },
    ContinueLearning { link: Route },
    /// Enrolled, but the course has nothing to open yet. Rendered disabled.
    NoLessonsAvailable,
}

impl PrimaryAction {
    pub fn label(&self) -> &'static str {
        match self {
            PrimaryAction::Enroll { in_flight: true } => "Enrolling...",
            PrimaryAction::Enroll { in_flight: false } => "Enroll Now",
            PrimaryAction::ContinueLearning { .. } => "Continue Learning",
            PrimaryAction::NoLessonsAvailable => "No Lessons Available",
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(
            self,
            PrimaryAction::Enroll { in_flight: true } | PrimaryAction::NoLessonsAvailable
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurriculumItem {
    pub number: usize,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub start: Option<Route>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseOverview {
    pub title: String,
    pub description: String,
    pub level: String,
    pub price: String,
    pub instructor: Option<String>,
    pub thumbnail: Option<String>,
    pub lessons: u32,
    pub hours: u32,
    pub students: u32,
    pub action: PrimaryAction,
    pub curriculum: Vec<CurriculumItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CourseDetailScreen {
    Loading,
    NotFound,
    Course(CourseOverview),
}

/// Result of pressing the enroll button.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Enrolled,
    RedirectedToLogin,
    Failed,
}

impl CourseDetailView {
    pub fn new(
        api: Arc<dyn LearningApi>,
        session: SessionManager,
        navigator: Navigator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            navigator,
            notifier,
            generation: Generation::default(),
            state: Mutex::new(DetailState {
                course_id: 0,
                loading: true,
                course: None,
                enrollment: None,
                enrolling: false,
            }),
        }
    }

    pub async fn load(&self, course_id: u64) {
        let ticket = self.generation.begin();
        {
            let mut state = self.state.lock().await;
            state.course_id = course_id;
            state.loading = true;
        }

        let (course, enrollment) = if self.session.is_authenticated() {
            let (course, enrollment) = tokio::join!(
                self.api.get_course(course_id),
                self.api.my_enrollment(course_id)
            );
            (course, enrollment)
        } else {
            (self.api.get_course(course_id).await, Ok(None))
        };

        let mut state = self.state.lock().await;
        if !self.generation.is_current(ticket) {
            return;
        }
        state.course = match course {
            Ok(course) => Some(course),
            Err(e) => {
                error!("Error fetching course {}: {}", course_id, e);
                None
            }
        };
        // not being enrolled is an ordinary answer here
        state.enrollment = enrollment.unwrap_or_else(|e| {
            info!("no enrollment for course {}: {}", course_id, e);
            None
        });
        state.loading = false;
    }

    pub async fn enroll(&self) -> EnrollOutcome {
        if !self.session.is_authenticated() {
            self.navigator.navigate(Route::Login);
            return EnrollOutcome::RedirectedToLogin;
        }

        // the course on screen, not one still loading
        let course_id = {
            let mut state = self.state.lock().await;
            let Some(course_id) = state.course.as_ref().map(|c| c.id) else {
                return EnrollOutcome::Failed;
            };
            state.enrolling = true;
            course_id
        };

        let result = self.api.enroll(course_id).await;

        let mut state = self.state.lock().await;
        state.enrolling = false;
        match result {
            Ok(enrollment) => {
                info!("enrolled in course {}", course_id);
                if state.course.as_ref().is_some_and(|c| c.id == course_id) {
                    state.enrollment = Some(enrollment);
                }
                EnrollOutcome::Enrolled
            }
            Err(AppError::Unauthorized) => EnrollOutcome::RedirectedToLogin,
            Err(e) => {
                error!("Failed to enroll in course {}: {}", course_id, e);
                let message = e.server_message().map(plain_text);
                self.notifier
                    .notify(message.as_deref().unwrap_or("Failed to enroll"));
                EnrollOutcome::Failed
            }
        }
    }

    pub async fn render(&self) -> CourseDetailScreen {
        let state = self.state.lock().await;
        if state.loading {
            return CourseDetailScreen::Loading;
        }
        let Some(course) = &state.course else {
            return CourseDetailScreen::NotFound;
        };

        let enrolled = state.enrollment.is_some();
        let action = if enrolled {
            match course.first_lesson() {
                Some(lesson) => PrimaryAction::ContinueLearning {
                    link: Route::Lesson {
                        course_id: course.id,
                        lesson_id: lesson.id,
                    },
                },
                None => PrimaryAction::NoLessonsAvailable,
            }
        } else {
            PrimaryAction::Enroll {
                in_flight: state.enrolling,
            }
        };

        let curriculum = course
            .lessons
            .iter()
            .enumerate()
            .map(|(index, lesson)| CurriculumItem {
                number: index + 1,
                title: plain_text(&lesson.title),
                description: plain_text(&lesson.description),
                duration_minutes: lesson.duration_minutes,
                start: enrolled.then_some(Route::Lesson {
                    course_id: course.id,
                    lesson_id: lesson.id,
                }),
            })
            .collect();

        CourseDetailScreen::Course(CourseOverview {
            title: plain_text(&course.title),
            description: plain_text(&course.description),
            level: course.level.to_string(),
            price: plain_text(&course.price_label()),
            instructor: course.instructor.as_ref().map(|i| plain_text(&i.username)),
            thumbnail: course.thumbnail.as_deref().map(plain_text),
            lessons: course.lessons_count.unwrap_or(0),
            hours: course.duration_hours,
            students: course.enrolled_count.unwrap_or(0),
            action,
            curriculum,
        })
    }
}

impl fmt::Display for CourseDetailScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let course = match self {
            CourseDetailScreen::Loading => return writeln!(f, "Loading course..."),
            CourseDetailScreen::NotFound => return writeln!(f, "Course not found"),
            CourseDetailScreen::Course(course) => course,
        };

        writeln!(f, "[{}] [{}]", course.level, course.price)?;
        writeln!(f, "{}", course.title)?;
        writeln!(f, "{}", course.description)?;
        writeln!(
            f,
            "👨‍🏫 {}  📚 {} lessons  ⏱️ {} hours  👥 {} students",
            course.instructor.as_deref().unwrap_or("unknown"),
            course.lessons,
            course.hours,
            course.students
        )?;

        match &course.action {
            PrimaryAction::ContinueLearning { link } => {
                writeln!(f, "[ {} ] → {}", course.action.label(), link)?
            }
            action if action.is_disabled() => writeln!(f, "[ {} ] (disabled)", action.label())?,
            action => writeln!(f, "[ {} ]", action.label())?,
        }

        writeln!(f)?;
        writeln!(f, "Course Curriculum")?;
        if course.curriculum.is_empty() {
            return writeln!(f, "No lessons available yet.");
        }
        for item in &course.curriculum {
            write!(f, "{:>3}. {} (⏱️ {} min)", item.number, item.title, item.duration_minutes)?;
            if let Some(start) = &item.start {
                write!(f, "  [Start → {}]", start)?;
            }
            writeln!(f)?;
            if !item.description.is_empty() {
                writeln!(f, "     {}", item.description)?;
            }
        }
        Ok(())
    }
}
