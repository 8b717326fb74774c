pub mod catalog;
pub mod course_detail;
pub mod dashboard;
pub mod home;
pub mod lesson_viewer;

use std::sync::atomic::{AtomicU64, Ordering};

pub use catalog::{CatalogBody, CatalogScreen, CatalogView, CourseCard};
pub use course_detail::{CourseDetailScreen, CourseDetailView, EnrollOutcome, PrimaryAction};
pub use dashboard::{Badge, DashboardScreen, DashboardView, ProgressBar};
pub use home::{HomeScreen, HomeView};
pub use lesson_viewer::{LessonPage, LessonScreen, LessonViewer, NextControl};

/// Blocking user-facing message, the equivalent of an alert box.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Prints notifications to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("! {}", message);
    }
}

/// Request-generation counter owned by a view.
///
/// Each load takes a ticket; a response is applied only while its ticket
/// is still the newest one, so a slow answer for a previous id cannot
/// overwrite the state of the current one.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Generation {
    pub fn begin(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}

/// Shorten `text` to `max` characters for display, appending "...".
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
