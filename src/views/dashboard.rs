use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use super::{Generation, truncate};
use crate::api::LearningApi;
use crate::content::plain_text;
use crate::models::Enrollment;
use crate::routing::Route;

const EXCERPT_LIMIT: usize = 100;
const BAR_CELLS: usize = 20;

struct DashboardState {
    loading: bool,
    enrollments: Vec<Enrollment>,
}

pub struct DashboardView {
    api: Arc<dyn LearningApi>,
    generation: Generation,
    state: Mutex<DashboardState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Completed,
    InProgress,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Completed => "Completed",
            Badge::InProgress => "In Progress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBar {
    pub percent: u8,
}

impl ProgressBar {
    /// Width of the filled part, as a CSS length.
    pub fn width(&self) -> String {
        format!("{}%", self.percent)
    }

    fn cells(&self) -> usize {
        usize::from(self.percent) * BAR_CELLS / 100
    }
}

impl fmt::Display for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = self.cells();
        write!(
            f,
            "[{}{}] {}",
            "#".repeat(filled),
            "-".repeat(BAR_CELLS - filled),
            self.width()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentCard {
    pub title: String,
    pub thumbnail: Option<String>,
    pub excerpt: String,
    pub badge: Badge,
    pub progress: ProgressBar,
    pub action_label: &'static str,
    pub link: Route,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardScreen {
    Loading,
    Empty { browse: Route },
    Enrollments(Vec<EnrollmentCard>),
}

impl DashboardView {
    pub fn new(api: Arc<dyn LearningApi>) -> Self {
        Self {
            api,
            generation: Generation::default(),
            state: Mutex::new(DashboardState {
                loading: true,
                enrollments: Vec::new(),
            }),
        }
    }

    pub async fn load(&self) {
        let ticket = self.generation.begin();
        self.state.lock().await.loading = true;

        let result = self.api.list_enrollments().await;

        let mut state = self.state.lock().await;
        if !self.generation.is_current(ticket) {
            return;
        }
        state.enrollments = match result {
            Ok(collection) => collection.items,
            Err(e) => {
                error!("Error fetching enrollments: {}", e);
                Vec::new()
            }
        };
        state.loading = false;
    }

    pub async fn render(&self) -> DashboardScreen {
        let state = self.state.lock().await;
        if state.loading {
            return DashboardScreen::Loading;
        }
        if state.enrollments.is_empty() {
            return DashboardScreen::Empty {
                browse: Route::Courses,
            };
        }

        DashboardScreen::Enrollments(state.enrollments.iter().map(card).collect())
    }
}

fn card(enrollment: &Enrollment) -> EnrollmentCard {
    let course = &enrollment.course;
    let (badge, action_label) = if enrollment.is_completed {
        (Badge::Completed, "Review Course")
    } else {
        (Badge::InProgress, "Continue Learning")
    };

    EnrollmentCard {
        title: plain_text(&course.title),
        thumbnail: course.thumbnail.as_deref().map(plain_text),
        excerpt: truncate(&plain_text(&course.description), EXCERPT_LIMIT),
        badge,
        progress: ProgressBar {
            percent: enrollment.progress(),
        },
        action_label,
        link: Route::CourseDetail {
            course_id: course.id,
        },
    }
}

impl fmt::Display for DashboardScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardScreen::Loading => writeln!(f, "Loading dashboard..."),
            DashboardScreen::Empty { browse } => {
                writeln!(f, "You haven't enrolled in any courses yet")?;
                writeln!(f, "Browse our courses and start learning today!")?;
                writeln!(f, "[ Browse Courses ] → {}", browse)
            }
            DashboardScreen::Enrollments(cards) => {
                writeln!(f, "My Courses")?;
                for card in cards {
                    writeln!(f)?;
                    writeln!(f, "{}  ({})", card.title, card.badge.label())?;
                    if !card.excerpt.is_empty() {
                        writeln!(f, "    {}", card.excerpt)?;
                    }
                    writeln!(f, "    Progress: {}", card.progress)?;
                    writeln!(f, "    [ {} ] → {}", card.action_label, card.link)?;
                }
                Ok(())
            }
        }
    }
}
