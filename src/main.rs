use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learnhub::config::AppConfig;
use learnhub::error::AppError;
use learnhub::models::{CourseFilters, Level};
use learnhub::routes;
use learnhub::routing::Route;
use learnhub::state::AppState;

/// Terminal client for the learning platform
#[derive(Parser)]
#[command(name = "learnhub")]
#[command(version)]
#[command(about = "Browse courses, enroll and follow lessons", long_about = None)]
struct Cli {
    /// API base URL (overrides LEARNHUB_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session database URL (overrides LEARNHUB_SESSION_DB)
    #[arg(long, global = true)]
    session_db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a bearer token for subsequent requests
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored token
    Logout,
    /// Landing page
    Home,
    /// List courses
    Courses {
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        level: Option<Level>,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Show a course and your enrollment state
    Course { id: u64 },
    /// Enroll in a course
    Enroll { id: u64 },
    /// Open a lesson
    Lesson {
        course: u64,
        lesson: u64,
        /// Mark the lesson as complete
        #[arg(long)]
        complete: bool,
    },
    /// Your enrollments and progress
    Dashboard,
    /// Open any client path, e.g. /courses/3/lessons/7
    Open { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "learnhub=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::new_from_env()?.with_overrides(cli.api_url, cli.session_db);
    let state = AppState::bootstrap(config).await?;

    let output = match cli.command {
        Command::Login { token } => {
            state.session.set(token.trim()).await?;
            "Token stored.\n".to_string()
        }
        Command::Logout => {
            state.session.clear().await;
            "Signed out.\n".to_string()
        }
        Command::Home => routes::open(&state, Route::Home).await,
        Command::Courses {
            category,
            level,
            search,
        } => {
            let filters = CourseFilters {
                category,
                level,
                search,
            };
            routes::open_with_filters(&state, Route::Courses, filters).await
        }
        Command::Course { id } => {
            routes::open(&state, Route::CourseDetail { course_id: id }).await
        }
        Command::Enroll { id } => routes::enroll(&state, id).await,
        Command::Lesson {
            course,
            lesson,
            complete,
        } => {
            if complete {
                routes::complete_lesson(&state, course, lesson).await?
            } else {
                let route = Route::Lesson {
                    course_id: course,
                    lesson_id: lesson,
                };
                routes::open(&state, route).await
            }
        }
        Command::Dashboard => routes::open(&state, Route::Dashboard).await,
        Command::Open { path } => {
            let route = Route::parse(&path)
                .ok_or_else(|| AppError::Config(format!("unknown path: {}", path)))?;
            routes::open(&state, route).await
        }
    };

    print!("{}", output);
    Ok(())
}
