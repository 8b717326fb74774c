use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Courses,
    CourseDetail { course_id: u64 },
    Lesson { course_id: u64, lesson_id: u64 },
    Dashboard,
    Login,
    Register,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Courses => "/courses".to_string(),
            Route::CourseDetail { course_id } => format!("/courses/{}", course_id),
            Route::Lesson { course_id, lesson_id } => {
                format!("/courses/{}/lessons/{}", course_id, lesson_id)
            }
            Route::Dashboard => "/dashboard".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["courses"] => Some(Route::Courses),
            ["courses", id] => Some(Route::CourseDetail {
                course_id: id.parse().ok()?,
            }),
            ["courses", course, "lessons", lesson] => Some(Route::Lesson {
                course_id: course.parse().ok()?,
                lesson_id: lesson.parse().ok()?,
            }),
            ["dashboard"] => Some(Route::Dashboard),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            _ => None,
        }
    }

    /// Screens an expired session must not bounce away from.
    pub fn is_public_auth(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Current location of the client.
#[derive(Clone)]
pub struct Navigator {
    current: Arc<watch::Sender<Route>>,
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        let (tx, _rx) = watch::channel(start);
        Self {
            current: Arc::new(tx),
        }
    }

    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    pub fn navigate(&self, route: Route) {
        info!("navigate to {}", route);
        self.current.send_replace(route);
    }

    /// Send the user to the login screen unless they are already on an
    /// auth screen. Returns whether navigation happened.
    pub fn redirect_to_login(&self) -> bool {
        self.current.send_if_modified(|route| {
            if route.is_public_auth() {
                false
            } else {
                info!("redirecting {} to login", route);
                *route = Route::Login;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}
