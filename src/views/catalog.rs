use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use super::{Generation, truncate};
use crate::api::LearningApi;
use crate::content::plain_text;
use crate::models::{Category, Course, CourseFilters, Level};
use crate::routing::Route;

const DESCRIPTION_LIMIT: usize = 120;

#[derive(Default)]
struct CatalogState {
    filters: CourseFilters,
    loading: bool,
    courses: Vec<Course>,
    categories: Vec<Category>,
}

pub struct CatalogView {
    api: Arc<dyn LearningApi>,
    generation: Generation,
    state: Mutex<CatalogState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseCard {
    pub title: String,
    pub level: Level,
    pub price: String,
    pub excerpt: String,
    pub thumbnail: Option<String>,
    pub lessons: u32,
    pub students: u32,
    pub link: Route,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogBody {
    Loading,
    Empty,
    Courses(Vec<CourseCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogScreen {
    pub filters: CourseFilters,
    pub category_options: Vec<String>,
    pub body: CatalogBody,
}

impl CatalogView {
    pub fn new(api: Arc<dyn LearningApi>) -> Self {
        Self {
            api,
            generation: Generation::default(),
            state: Mutex::new(CatalogState {
                loading: true,
                ..CatalogState::default()
            }),
        }
    }

    pub async fn set_filters(&self, filters: CourseFilters) {
        self.state.lock().await.filters = filters;
        self.load().await;
    }

    /// Fetch courses for the current filters together with the category
    /// options. Failures leave an empty list behind.
    pub async fn load(&self) {
        let ticket = self.generation.begin();
        let filters = {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.filters.clone()
        };

        let (courses, categories) = tokio::join!(
            self.api.list_courses(&filters),
            self.api.list_categories()
        );

        let mut state = self.state.lock().await;
        if !self.generation.is_current(ticket) {
            return;
        }
        state.courses = match courses {
            Ok(collection) => collection.items,
            Err(e) => {
                error!("Error fetching courses: {}", e);
                Vec::new()
            }
        };
        state.categories = match categories {
            Ok(collection) => collection.items,
            Err(e) => {
                error!("Error fetching categories: {}", e);
                Vec::new()
            }
        };
        state.loading = false;
    }

    pub async fn render(&self) -> CatalogScreen {
        let state = self.state.lock().await;
        let body = if state.loading {
            CatalogBody::Loading
        } else if state.courses.is_empty() {
            CatalogBody::Empty
        } else {
            CatalogBody::Courses(state.courses.iter().map(card).collect())
        };

        CatalogScreen {
            filters: state.filters.clone(),
            category_options: state.categories.iter().map(|c| plain_text(&c.name)).collect(),
            body,
        }
    }
}

fn card(course: &Course) -> CourseCard {
    let description = plain_text(&course.description);
    let excerpt = if description.is_empty() {
        "No description available".to_string()
    } else {
        truncate(&description, DESCRIPTION_LIMIT)
    };

    CourseCard {
        title: plain_text(&course.title),
        level: course.level,
        price: plain_text(&course.price_label()),
        excerpt,
        thumbnail: course.thumbnail.as_deref().map(plain_text),
        lessons: course.lessons_count.unwrap_or(0),
        students: course.enrolled_count.unwrap_or(0),
        link: Route::CourseDetail {
            course_id: course.id,
        },
    }
}

impl fmt::Display for CatalogScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "All Courses")?;

        let category = if self.filters.category.is_empty() {
            "All Categories"
        } else {
            self.filters.category.as_str()
        };
        let level = self.filters.level.map(|l| l.label()).unwrap_or("All Levels");
        write!(f, "Filters: category={} level={}", category, level)?;
        if !self.filters.search.is_empty() {
            write!(f, " search=\"{}\"", self.filters.search)?;
        }
        writeln!(f)?;
        if !self.category_options.is_empty() {
            writeln!(f, "Categories: {}", self.category_options.join(", "))?;
        }
        writeln!(f)?;

        match &self.body {
            CatalogBody::Loading => writeln!(f, "Loading courses..."),
            CatalogBody::Empty => {
                writeln!(f, "No courses found. Try adjusting your filters.")
            }
            CatalogBody::Courses(cards) => {
                for card in cards {
                    writeln!(f, "[{}] {} ({})", card.level.label(), card.title, card.price)?;
                    writeln!(f, "    {}", card.excerpt)?;
                    writeln!(
                        f,
                        "    📚 {} lessons  👥 {} students  → {}",
                        card.lessons, card.students, card.link
                    )?;
                }
                Ok(())
            }
        }
    }
}
