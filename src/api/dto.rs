use serde::Deserialize;

/// List endpoints answer either with a bare array or with a paginated
/// envelope, depending on server settings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CollectionResponse<T> {
    Page {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Plain(Vec<T>),
}

/// Normalized collection handed to views.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub next: Option<String>,
}

impl<T> Collection<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            next: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

impl<T> From<CollectionResponse<T>> for Collection<T> {
    fn from(response: CollectionResponse<T>) -> Self {
        match response {
            CollectionResponse::Page {
                count,
                next,
                previous: _,
                results,
            } => Collection {
                total: count.unwrap_or(results.len() as u64),
                next,
                items: results,
            },
            CollectionResponse::Plain(items) => Collection {
                total: items.len() as u64,
                next: None,
                items,
            },
        }
    }
}
