use tracing::info;

use crate::error::AppError;
use crate::models::CourseFilters;
use crate::routing::Route;
use crate::state::AppState;
use crate::views::{
    CatalogView, CourseDetailView, DashboardView, EnrollOutcome, HomeView, LessonViewer,
};

const LOGIN_HINT: &str = "Sign in with `learnhub login --token <token>`.";

/// Mount the view behind `route`, let it load and render it as text.
pub async fn open(state: &AppState, route: Route) -> String {
    open_with_filters(state, route, CourseFilters::default()).await
}

pub async fn open_with_filters(state: &AppState, route: Route, filters: CourseFilters) -> String {
    state.navigator.navigate(route);

    let screen = match route {
        Route::Home => HomeView::new(state.session.clone()).render().to_string(),
        Route::Courses => {
            let view = CatalogView::new(state.api.clone());
            view.set_filters(filters).await;
            view.render().await.to_string()
        }
        Route::CourseDetail { course_id } => {
            let view = detail_view(state);
            view.load(course_id).await;
            view.render().await.to_string()
        }
        Route::Lesson {
            course_id,
            lesson_id,
        } => {
            let view = lesson_view(state);
            view.load(course_id, lesson_id).await;
            view.render().await.to_string()
        }
        Route::Dashboard => {
            let view = DashboardView::new(state.api.clone());
            view.load().await;
            view.render().await.to_string()
        }
        Route::Login | Route::Register => format!("{}\n", LOGIN_HINT),
    };

    with_redirect_notice(state, route, screen)
}

pub async fn enroll(state: &AppState, course_id: u64) -> String {
    let route = Route::CourseDetail { course_id };
    state.navigator.navigate(route);

    let view = detail_view(state);
    view.load(course_id).await;
    let outcome = view.enroll().await;
    info!("enroll outcome for course {}: {:?}", course_id, outcome);

    let screen = match outcome {
        EnrollOutcome::RedirectedToLogin => String::new(),
        _ => view.render().await.to_string(),
    };
    with_redirect_notice(state, route, screen)
}

pub async fn complete_lesson(
    state: &AppState,
    course_id: u64,
    lesson_id: u64,
) -> Result<String, AppError> {
    let route = Route::Lesson {
        course_id,
        lesson_id,
    };
    state.navigator.navigate(route);

    let view = lesson_view(state);
    view.load(course_id, lesson_id).await;
    let result = view.mark_complete().await;
    let screen = view.render().await.to_string();
    let screen = with_redirect_notice(state, route, screen);

    match result {
        Ok(_) => Ok(screen),
        Err(AppError::Unauthorized) => Ok(screen),
        Err(e) => Err(e),
    }
}

fn detail_view(state: &AppState) -> CourseDetailView {
    CourseDetailView::new(
        state.api.clone(),
        state.session.clone(),
        state.navigator.clone(),
        state.notifier.clone(),
    )
}

fn lesson_view(state: &AppState) -> LessonViewer {
    LessonViewer::new(
        state.api.clone(),
        state.navigator.clone(),
        state.notifier.clone(),
    )
}

fn with_redirect_notice(state: &AppState, requested: Route, mut screen: String) -> String {
    if state.navigator.current() == Route::Login && requested != Route::Login {
        screen.push_str("\nYou need to sign in to continue. ");
        screen.push_str(LOGIN_HINT);
        screen.push('\n');
    }
    screen
}
