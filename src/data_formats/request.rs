use crate::models::{AdminStatus, ArticleStatus};

// ----------------- Admin Request -----------------

/// Input for a new admin. `password` is plaintext and gets hashed on insert.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub avatar: String,
    pub email: String,
    pub phone: String,
    pub status: AdminStatus,
}

impl NewAdmin {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            nickname: String::new(),
            avatar: String::new(),
            email: String::new(),
            phone: String::new(),
            status: AdminStatus::Enabled,
        }
    }
}

// ----------------- Article Request -----------------

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub summary: String,
    pub category_id: u64,
    pub tags: String,
    pub cover_image: String,
    pub author_id: u64,
    pub status: ArticleStatus,
    pub pinned: bool,
}

impl NewArticle {
    /// A draft with an empty body and no category.
    pub fn draft(title: impl Into<String>, slug: impl Into<String>, author_id: u64) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            content: String::new(),
            summary: String::new(),
            category_id: 0,
            tags: String::new(),
            cover_image: String::new(),
            author_id,
            status: ArticleStatus::Draft,
            pinned: false,
        }
    }
}
