pub mod dto;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{Category, Course, CourseFilters, Enrollment, Progress, ProgressWrite};
use crate::routing::Navigator;
use crate::session::SessionManager;

pub use dto::Collection;

#[async_trait]
pub trait LearningApi: Send + Sync {
    async fn list_courses(&self, filters: &CourseFilters) -> Result<Collection<Course>, AppError>;
    async fn get_course(&self, course_id: u64) -> Result<Course, AppError>;
    /// `None` when the current user is not enrolled.
    async fn my_enrollment(&self, course_id: u64) -> Result<Option<Enrollment>, AppError>;
    async fn enroll(&self, course_id: u64) -> Result<Enrollment, AppError>;
    async fn list_enrollments(&self) -> Result<Collection<Enrollment>, AppError>;
    async fn find_progress(
        &self,
        enrollment_id: u64,
        lesson_id: u64,
    ) -> Result<Option<Progress>, AppError>;
    async fn record_progress(&self, write: &ProgressWrite) -> Result<Progress, AppError>;
    async fn list_categories(&self) -> Result<Collection<Category>, AppError>;
}

/// reqwest-backed client for the learning platform REST API.
///
/// Every request carries the session's bearer token when one is present.
/// A 401 clears the session and sends the navigator to the login screen
/// before the error is handed back to the caller.
pub struct HttpApiClient {
    client: Client,
    config: AppConfig,
    session: SessionManager,
    navigator: Navigator,
}

impl HttpApiClient {
    pub fn new(
        config: AppConfig,
        session: SessionManager,
        navigator: Navigator,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            config,
            session,
            navigator,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.config.endpoint(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.config.endpoint(path))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        debug!("{} <- {}", status, url);

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized().await;
            return Err(AppError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            if status != StatusCode::NOT_FOUND {
                warn!("API error {} from {}: {}", status, url, body);
            }
            return Err(AppError::from_response(status, &body));
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            tracing::error!("Failed to parse response from {}: {}", url, e);
            AppError::Decode(e)
        })
    }

    async fn handle_unauthorized(&self) {
        warn!("credential rejected, clearing session");
        self.session.clear().await;
        self.navigator.redirect_to_login();
    }

    async fn collection<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Collection<T>, AppError> {
        let response: dto::CollectionResponse<T> = self.execute(request).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl LearningApi for HttpApiClient {
    async fn list_courses(&self, filters: &CourseFilters) -> Result<Collection<Course>, AppError> {
        let pairs = filters.query_pairs();
        let mut request = self.get("/courses/");
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        self.collection(request).await
    }

    async fn get_course(&self, course_id: u64) -> Result<Course, AppError> {
        self.execute(self.get(&format!("/courses/{}/", course_id)))
            .await
    }

    async fn my_enrollment(&self, course_id: u64) -> Result<Option<Enrollment>, AppError> {
        let request = self.get(&format!("/courses/{}/my_enrollment/", course_id));
        match self.execute(request).await {
            Ok(enrollment) => Ok(Some(enrollment)),
            Err(AppError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn enroll(&self, course_id: u64) -> Result<Enrollment, AppError> {
        self.execute(self.post(&format!("/courses/{}/enroll/", course_id)))
            .await
    }

    async fn list_enrollments(&self) -> Result<Collection<Enrollment>, AppError> {
        self.collection(self.get("/enrollments/")).await
    }

    async fn find_progress(
        &self,
        enrollment_id: u64,
        lesson_id: u64,
    ) -> Result<Option<Progress>, AppError> {
        let request = self.get("/progress/").query(&[
            ("enrollment", enrollment_id.to_string()),
            ("lesson", lesson_id.to_string()),
        ]);
        let rows: Collection<Progress> = match self.collection(request).await {
            Ok(rows) => rows,
            Err(AppError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        // the server may ignore the lesson filter
        Ok(rows.items.into_iter().find(|p| p.lesson.id() == lesson_id))
    }

    async fn record_progress(&self, write: &ProgressWrite) -> Result<Progress, AppError> {
        self.execute(self.post("/progress/").json(write)).await
    }

    async fn list_categories(&self) -> Result<Collection<Category>, AppError> {
        self.collection(self.get("/categories/")).await
    }
}
