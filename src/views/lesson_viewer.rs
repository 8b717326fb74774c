use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::{Generation, Notifier};
use crate::api::LearningApi;
use crate::content::{self, Block, plain_text};
use crate::error::AppError;
use crate::models::{Course, Lesson, Progress, ProgressWrite};
use crate::routing::{Navigator, Route};

#[derive(Default)]
struct ViewerState {
    course_id: u64,
    loading: bool,
    course: Option<Course>,
    index: usize,
    lesson: Option<Lesson>,
    progress: Option<Progress>,
}

pub struct LessonViewer {
    api: Arc<dyn LearningApi>,
    navigator: Navigator,
    notifier: Arc<dyn Notifier>,
    generation: Generation,
    state: Mutex<ViewerState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidebarItem {
    pub number: usize,
    pub title: String,
    pub active: bool,
    pub link: Route,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextControl {
    Next(Route),
    /// Shown on the last lesson instead of a next button.
    Finish(Route),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompleteButton {
    pub label: &'static str,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonPage {
    pub sidebar: Vec<SidebarItem>,
    pub back: Route,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub body: Vec<Block>,
    pub previous: Option<Route>,
    pub complete: CompleteButton,
    pub next: NextControl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LessonScreen {
    Loading,
    CourseNotFound,
    NoLessons,
    Lesson(LessonPage),
}

impl LessonViewer {
    pub fn new(
        api: Arc<dyn LearningApi>,
        navigator: Navigator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            navigator,
            notifier,
            generation: Generation::default(),
            state: Mutex::new(ViewerState {
                loading: true,
                ..ViewerState::default()
            }),
        }
    }

    /// Load the course, place the cursor on `lesson_id` (first lesson when
    /// the id is not part of the course) and pick up any progress.
    pub async fn load(&self, course_id: u64, lesson_id: u64) {
        let ticket = self.generation.begin();
        {
            let mut state = self.state.lock().await;
            state.course_id = course_id;
            state.loading = true;
        }

        let course = match self.api.get_course(course_id).await {
            Ok(course) => Some(course),
            Err(e) => {
                error!("Error fetching course {}: {}", course_id, e);
                None
            }
        };

        let index = course
            .as_ref()
            .and_then(|c| c.lesson_index(lesson_id))
            .unwrap_or(0);
        let lesson = course.as_ref().and_then(|c| c.lessons.get(index).cloned());
        let progress = match &lesson {
            Some(lesson) => self.load_progress(course_id, lesson.id).await,
            None => None,
        };

        let mut state = self.state.lock().await;
        if !self.generation.is_current(ticket) {
            debug!("discarding stale lesson response for course {}", course_id);
            return;
        }
        state.course = course;
        state.index = index;
        state.lesson = lesson;
        state.progress = progress;
        state.loading = false;
    }

    /// Move to another lesson of the course already on screen.
    pub async fn select_lesson(&self, lesson_id: u64) {
        let ticket = self.generation.begin();
        let (course_id, target) = {
            let state = self.state.lock().await;
            let target = state.course.as_ref().and_then(|course| {
                course
                    .lesson_index(lesson_id)
                    .map(|index| (index, course.lessons[index].clone()))
            });
            let course_id = state.course.as_ref().map_or(state.course_id, |c| c.id);
            (course_id, target)
        };

        self.navigator.navigate(Route::Lesson {
            course_id,
            lesson_id,
        });

        let Some((index, lesson)) = target else {
            // not part of the loaded course, start over
            self.load(course_id, lesson_id).await;
            return;
        };

        let progress = self.load_progress(course_id, lesson.id).await;

        let mut state = self.state.lock().await;
        if !self.generation.is_current(ticket) {
            return;
        }
        state.index = index;
        state.lesson = Some(lesson);
        state.progress = progress;
    }

    /// Best effort: no enrollment or no progress row simply means no progress.
    async fn load_progress(&self, course_id: u64, lesson_id: u64) -> Option<Progress> {
        let enrollment = match self.api.my_enrollment(course_id).await {
            Ok(Some(enrollment)) => enrollment,
            Ok(None) => {
                debug!("Enrollment not found, continuing without progress data");
                return None;
            }
            Err(e) => {
                debug!("enrollment lookup failed: {}", e);
                return None;
            }
        };

        match self.api.find_progress(enrollment.id, lesson_id).await {
            Ok(progress) => progress,
            Err(e) => {
                debug!("progress lookup failed: {}", e);
                None
            }
        }
    }

    /// Mark the current lesson complete. Returns `Ok(false)` when it already
    /// was, in which case nothing is written.
    pub async fn mark_complete(&self) -> Result<bool, AppError> {
        let (course_id, lesson_id) = {
            let state = self.state.lock().await;
            if state.progress.as_ref().is_some_and(|p| p.completed) {
                return Ok(false);
            }
            let (Some(course), Some(lesson)) = (&state.course, &state.lesson) else {
                return Err(AppError::NotFound);
            };
            (course.id, lesson.id)
        };

        let result = self.submit_completion(course_id, lesson_id).await;
        let progress = match result {
            Ok(progress) => progress,
            Err(e) => {
                error!("Error marking lesson {} complete: {}", lesson_id, e);
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        if state.lesson.as_ref().is_some_and(|l| l.id == lesson_id) {
            state.progress = Some(Progress {
                completed: true,
                ..progress
            });
        }
        drop(state);

        info!("lesson {} marked complete", lesson_id);
        self.notifier.notify("Lesson marked as complete!");
        Ok(true)
    }

    async fn submit_completion(&self, course_id: u64, lesson_id: u64) -> Result<Progress, AppError> {
        let enrollment = self
            .api
            .my_enrollment(course_id)
            .await?
            .ok_or(AppError::NotEnrolled)?;

        let write = ProgressWrite {
            enrollment: enrollment.id,
            lesson: lesson_id,
            completed: true,
        };
        self.api.record_progress(&write).await
    }

    pub async fn render(&self) -> LessonScreen {
        let state = self.state.lock().await;
        if state.loading {
            return LessonScreen::Loading;
        }
        let Some(course) = &state.course else {
            return LessonScreen::CourseNotFound;
        };
        let Some(lesson) = &state.lesson else {
            return LessonScreen::NoLessons;
        };

        let link = |lesson: &Lesson| Route::Lesson {
            course_id: course.id,
            lesson_id: lesson.id,
        };
        let back = Route::CourseDetail {
            course_id: course.id,
        };

        let sidebar = course
            .lessons
            .iter()
            .enumerate()
            .map(|(i, l)| SidebarItem {
                number: i + 1,
                title: plain_text(&l.title),
                active: l.id == lesson.id,
                link: link(l),
            })
            .collect();

        let previous = state
            .index
            .checked_sub(1)
            .and_then(|i| course.lessons.get(i))
            .map(link);
        let next = match course.lessons.get(state.index + 1) {
            Some(next) => NextControl::Next(link(next)),
            None => NextControl::Finish(back),
        };

        let completed = state.progress.as_ref().is_some_and(|p| p.completed);
        let complete = CompleteButton {
            label: if completed {
                "✓ Completed"
            } else {
                "Mark as Complete"
            },
            disabled: completed,
        };

        let mut body = content::to_blocks(&lesson.content);
        if body.is_empty() {
            body.push(Block::Paragraph("No content available yet.".to_string()));
        }

        LessonScreen::Lesson(LessonPage {
            sidebar,
            back,
            title: plain_text(&lesson.title),
            description: plain_text(&lesson.description),
            video_url: lesson
                .video_url
                .as_deref()
                .map(plain_text)
                .filter(|url| !url.is_empty()),
            body,
            previous,
            complete,
            next,
        })
    }
}

impl fmt::Display for LessonScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = match self {
            LessonScreen::Loading => return writeln!(f, "Loading lesson..."),
            LessonScreen::CourseNotFound => return writeln!(f, "Course not found"),
            LessonScreen::NoLessons => return writeln!(f, "No lessons available yet."),
            LessonScreen::Lesson(page) => page,
        };

        writeln!(f, "Course Content")?;
        for item in &page.sidebar {
            let marker = if item.active { ">" } else { " " };
            writeln!(f, "{} {:>2}. {}", marker, item.number, item.title)?;
        }
        writeln!(f)?;
        writeln!(f, "← Back to Course ({})", page.back)?;
        writeln!(f, "{}", page.title)?;
        if !page.description.is_empty() {
            writeln!(f, "{}", page.description)?;
        }
        writeln!(f)?;
        match &page.video_url {
            Some(url) => writeln!(f, "▶ {}", url)?,
            None => writeln!(f, "Video content will be available here")?,
        }
        writeln!(f)?;
        writeln!(f, "Lesson Content")?;
        for block in &page.body {
            writeln!(f, "{}", block)?;
        }
        writeln!(f)?;

        if let Some(previous) = &page.previous {
            write!(f, "[← Previous Lesson → {}]  ", previous)?;
        }
        if page.complete.disabled {
            write!(f, "[{}] (disabled)", page.complete.label)?;
        } else {
            write!(f, "[{}]", page.complete.label)?;
        }
        match &page.next {
            NextControl::Next(route) => writeln!(f, "  [Next Lesson → {}]", route),
            NextControl::Finish(route) => writeln!(f, "  [Finish Course → {}]", route),
        }
    }
}
