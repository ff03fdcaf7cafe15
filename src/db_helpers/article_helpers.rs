use chrono::Utc;
use sqlx::MySqlPool;

use crate::data_formats::{ArticleFilter, NewArticle, Page, Pagination};
use crate::errors::{Error, Result};
use crate::models::{Article, ArticleStatus};

use super::{arguments, ensure_affected, like_pattern, live_rows_where, Param, QueryBuilder};

const ARTICLE_COLUMNS: &str = "id, title, slug, content, summary, category_id, tags, cover_image, \
     author_id, status, is_top, views, created_at, updated_at, published_at, deleted_at";

const LIST_ORDER: &str = "ORDER BY is_top DESC, created_at DESC, id DESC";
const SEARCH_ORDER: &str = "ORDER BY created_at DESC, id DESC";

// ----------------- Article Lookups -----------------

pub async fn get_article_by_id(pool: &MySqlPool, id: u64) -> Result<Article> {
    let query =
        format!("SELECT {ARTICLE_COLUMNS} FROM article WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, Article>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("article"))
}

/// Like [`get_article_by_id`], but also returns soft-deleted rows.
pub async fn get_article_by_id_with_deleted(pool: &MySqlPool, id: u64) -> Result<Article> {
    let query = format!("SELECT {ARTICLE_COLUMNS} FROM article WHERE id = ?");
    sqlx::query_as::<_, Article>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("article"))
}

pub async fn get_article_by_slug(pool: &MySqlPool, slug: &str) -> Result<Article> {
    let query =
        format!("SELECT {ARTICLE_COLUMNS} FROM article WHERE slug = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, Article>(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("article"))
}

/// Pinned articles first, then newest first.
pub async fn list_articles(
    pool: &MySqlPool,
    pagination: Pagination,
    ArticleFilter {
        category_id,
        status,
        author_id,
        pinned,
    }: &ArticleFilter,
) -> Result<Page<Article>> {
    let (conditions, params) = QueryBuilder::new(String::new(), Some(" AND "))
        .add_param("category_id", *category_id)
        .add_param("status", *status)
        .add_param("author_id", *author_id)
        .add_param("is_top", *pinned)
        .build();

    fetch_article_page(pool, &conditions, params, LIST_ORDER, pagination).await
}

/// Published articles in a category.
pub async fn get_articles_by_category(
    pool: &MySqlPool,
    category_id: u64,
    pagination: Pagination,
) -> Result<Page<Article>> {
    list_articles(
        pool,
        pagination,
        &ArticleFilter::published_in_category(category_id),
    )
    .await
}

/// Published articles whose title or content contains `keyword`, newest
/// first. Case sensitivity follows the column collation.
pub async fn search_articles(
    pool: &MySqlPool,
    keyword: &str,
    pagination: Pagination,
) -> Result<Page<Article>> {
    let pattern = like_pattern(keyword);
    let (conditions, params) = QueryBuilder::new(String::new(), Some(" AND "))
        .add_param("status", Some(ArticleStatus::Published))
        .add_condition(
            "(title LIKE ? OR content LIKE ?)",
            Some(vec![pattern.clone().into(), pattern.into()]),
        )
        .build();

    fetch_article_page(pool, &conditions, params, SEARCH_ORDER, pagination).await
}

/// Counts every article row, soft-deleted ones included.
pub async fn count_articles_with_deleted(pool: &MySqlPool) -> Result<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM article")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

async fn fetch_article_page(
    pool: &MySqlPool,
    conditions: &str,
    mut params: Vec<Param>,
    order: &str,
    pagination: Pagination,
) -> Result<Page<Article>> {
    let where_clause = live_rows_where(conditions);
    let mut tx = pool.begin().await?;

    let count_query = format!("SELECT COUNT(*) FROM article {where_clause}");
    let total: i64 = sqlx::query_scalar_with(&count_query, arguments(&params)?)
        .fetch_one(&mut *tx)
        .await?;

    // LIMIT/OFFSET bind as unsigned; both are clamped to >= 0
    params.push(Param::Unsigned(pagination.limit() as u64));
    params.push(Param::Unsigned(pagination.offset() as u64));
    let page_query =
        format!("SELECT {ARTICLE_COLUMNS} FROM article {where_clause} {order} LIMIT ? OFFSET ?");
    let articles = sqlx::query_as_with::<_, Article, _>(&page_query, arguments(&params)?)
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Page::new(articles, total))
}

// ----------------- Article Writes -----------------

/// Inserts the article. Articles created as published get `published_at`
/// set; a taken slug surfaces as `ConstraintViolation`.
pub async fn create_article(pool: &MySqlPool, article: NewArticle) -> Result<Article> {
    let NewArticle {
        title,
        slug,
        content,
        summary,
        category_id,
        tags,
        cover_image,
        author_id,
        status,
        pinned,
    } = article;
    let now = Utc::now();
    let published_at = (status == ArticleStatus::Published).then_some(now);

    let result = sqlx::query(
        r#"
        INSERT INTO article (title, slug, content, summary, category_id, tags, cover_image,
                             author_id, status, is_top, views, created_at, updated_at, published_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(&slug)
    .bind(content)
    .bind(summary)
    .bind(category_id)
    .bind(tags)
    .bind(cover_image)
    .bind(author_id)
    .bind(status)
    .bind(pinned)
    .bind(now)
    .bind(now)
    .bind(published_at)
    .execute(pool)
    .await?;

    let id = result.last_insert_id();
    tracing::debug!(id, %slug, "article created");
    get_article_by_id(pool, id).await
}

/// Saves every column of `article` by primary key, `deleted_at` included,
/// inserting the row when no article has that id. Soft-deleted rows are
/// overwritten too, so clearing `deleted_at` restores one.
pub async fn update_article(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let existing: Option<u64> =
        sqlx::query_scalar("SELECT id FROM article WHERE id = ? FOR UPDATE")
            .bind(article.id)
            .fetch_optional(&mut *tx)
            .await?;

    let id = if existing.is_some() {
        sqlx::query(
            r#"
            UPDATE article
            SET title = ?, slug = ?, content = ?, summary = ?, category_id = ?, tags = ?,
                cover_image = ?, author_id = ?, status = ?, is_top = ?, views = ?,
                published_at = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.content)
        .bind(&article.summary)
        .bind(article.category_id)
        .bind(&article.tags)
        .bind(&article.cover_image)
        .bind(article.author_id)
        .bind(article.status)
        .bind(article.pinned)
        .bind(article.views)
        .bind(article.published_at)
        .bind(now)
        .bind(article.deleted_at)
        .bind(article.id)
        .execute(&mut *tx)
        .await?;
        article.id
    } else {
        // id 0 lets MySQL assign one
        let result = sqlx::query(
            r#"
            INSERT INTO article (id, title, slug, content, summary, category_id, tags, cover_image,
                                 author_id, status, is_top, views, created_at, updated_at,
                                 published_at, deleted_at)
            VALUES (NULLIF(?, 0), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.content)
        .bind(&article.summary)
        .bind(article.category_id)
        .bind(&article.tags)
        .bind(&article.cover_image)
        .bind(article.author_id)
        .bind(article.status)
        .bind(article.pinned)
        .bind(article.views)
        .bind(now)
        .bind(now)
        .bind(article.published_at)
        .bind(article.deleted_at)
        .execute(&mut *tx)
        .await?;
        result.last_insert_id()
    };

    tx.commit().await?;
    tracing::debug!(id, "article saved");
    get_article_by_id_with_deleted(pool, id).await
}

/// Soft delete: stamps `deleted_at`, the row stays in the table.
pub async fn delete_article(pool: &MySqlPool, id: u64) -> Result<()> {
    let result =
        sqlx::query("UPDATE article SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
    ensure_affected(result, "article")?;
    tracing::debug!(id, "article soft-deleted");
    Ok(())
}

/// Publishing stamps `published_at` in the same statement; other statuses
/// leave it as it was.
pub async fn update_article_status(pool: &MySqlPool, id: u64, status: ArticleStatus) -> Result<()> {
    let now = Utc::now();
    let result = if status == ArticleStatus::Published {
        sqlx::query(
            "UPDATE article SET status = ?, published_at = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(status)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?
    } else {
        sqlx::query(
            "UPDATE article SET status = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?
    };
    ensure_affected(result, "article")?;
    tracing::debug!(id, ?status, "article status changed");
    Ok(())
}

/// Single-statement increment, so concurrent readers never lose a view.
pub async fn increment_views(pool: &MySqlPool, id: u64) -> Result<()> {
    let result =
        sqlx::query("UPDATE article SET views = views + 1 WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;
    ensure_affected(result, "article")
}
