use std::fmt;

use crate::routing::Route;
use crate::session::SessionManager;

pub struct HomeView {
    session: SessionManager,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeScreen {
    pub actions: Vec<(&'static str, Route)>,
}

impl HomeView {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn render(&self) -> HomeScreen {
        let actions = if self.session.is_authenticated() {
            vec![("Go to Dashboard", Route::Dashboard)]
        } else {
            vec![("Get Started", Route::Register), ("Browse Courses", Route::Courses)]
        };
        HomeScreen { actions }
    }
}

impl fmt::Display for HomeScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Learn Anything, Anytime, Anywhere")?;
        writeln!(
            f,
            "Discover courses from expert instructors and advance your career"
        )?;
        writeln!(f)?;
        for (label, route) in &self.actions {
            writeln!(f, "[ {} ] → {}", label, route)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn actions_follow_session() {
        let session = SessionManager::in_memory();
        let home = HomeView::new(session.clone());
        assert_eq!(home.render().actions.len(), 2);

        session.set("t").await.unwrap();
        assert_eq!(home.render().actions, vec![("Go to Dashboard", Route::Dashboard)]);
    }
}
