use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i8)]
pub enum AdminStatus {
    Enabled = 1,
    Disabled = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i8)]
pub enum ArticleStatus {
    Draft = 1,
    Published = 2,
    Trashed = 3,
}

/// Row of the `admin` table. `password` holds an argon2 PHC string.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub avatar: String,
    pub email: String,
    pub phone: String,
    pub status: AdminStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub summary: String,
    pub category_id: u64,
    /// Comma separated, stored as given.
    pub tags: String,
    pub cover_image: String,
    pub author_id: u64,
    pub status: ArticleStatus,
    #[sqlx(rename = "is_top")]
    pub pinned: bool,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Admin {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Article {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags.split(',').map(str::trim).filter(|tag| !tag.is_empty())
    }
}
