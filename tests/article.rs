mod common;

use std::sync::Arc;

use nanoblog::db_helpers::*;
use nanoblog::models::ArticleStatus;
use nanoblog::{ArticleFilter, NewArticle, Pagination};

use common::{pool, unique, unique_category};

fn published(title: &str, category_id: u64) -> NewArticle {
    let mut article = NewArticle::draft(title, unique("slug"), 1);
    article.category_id = category_id;
    article.status = ArticleStatus::Published;
    article
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_and_fetch_article() {
    let pool = pool().await;
    let slug = unique("hello-world");

    let mut new_article = NewArticle::draft("Hello, world", &slug, 42);
    new_article.tags = "rust,mysql".into();
    let article = create_article(&pool, new_article).await.unwrap();

    assert_eq!(article.status, ArticleStatus::Draft);
    assert_eq!(article.views, 0);
    assert!(!article.pinned);
    assert!(article.published_at.is_none());

    let by_slug = get_article_by_slug(&pool, &slug).await.unwrap();
    assert_eq!(by_slug.id, article.id);
    assert_eq!(by_slug.author_id, 42);
    assert_eq!(by_slug.tag_list().collect::<Vec<_>>(), ["rust", "mysql"]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn duplicate_slug_is_rejected() {
    let pool = pool().await;
    let slug = unique("taken");

    create_article(&pool, NewArticle::draft("First", &slug, 1))
        .await
        .unwrap();
    let error = create_article(&pool, NewArticle::draft("Second", &slug, 1))
        .await
        .unwrap_err();
    assert!(error.is_constraint_violation(), "{error:?}");

    assert_eq!(get_article_by_slug(&pool, &slug).await.unwrap().title, "First");
}

#[tokio::test]
#[ignore = "requires database"]
async fn category_pages_split_results() {
    let pool = pool().await;
    let category = unique_category();
    for i in 0..25 {
        create_article(&pool, published(&format!("post {i}"), category))
            .await
            .unwrap();
    }
    // drafts in the same category are not part of the category listing
    let mut draft = NewArticle::draft("draft", unique("slug"), 1);
    draft.category_id = category;
    create_article(&pool, draft).await.unwrap();

    let first = get_articles_by_category(&pool, category, Pagination::new(1, 10))
        .await
        .unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first.total, 25);

    let third = get_articles_by_category(&pool, category, Pagination::new(3, 10))
        .await
        .unwrap();
    assert_eq!(third.len(), 5);
    assert_eq!(third.total, 25);

    let everything = ArticleFilter {
        category_id: Some(category),
        ..ArticleFilter::default()
    };
    let all = list_articles(&pool, Pagination::new(1, 100), &everything)
        .await
        .unwrap();
    assert_eq!(all.total, 26);
}

#[tokio::test]
#[ignore = "requires database"]
async fn pinned_articles_come_first() {
    let pool = pool().await;
    let category = unique_category();

    let old_pinned = {
        let mut article = published("pinned", category);
        article.pinned = true;
        create_article(&pool, article).await.unwrap()
    };
    create_article(&pool, published("newer", category))
        .await
        .unwrap();
    let newest = create_article(&pool, published("newest", category))
        .await
        .unwrap();

    let filter = ArticleFilter {
        category_id: Some(category),
        ..ArticleFilter::default()
    };
    let page = list_articles(&pool, Pagination::new(1, 10), &filter)
        .await
        .unwrap();
    assert_eq!(page.items[0].id, old_pinned.id);
    assert_eq!(page.items[1].id, newest.id);

    let pinned_only = ArticleFilter {
        pinned: Some(true),
        ..filter
    };
    let page = list_articles(&pool, Pagination::new(1, 10), &pinned_only)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn search_matches_published_title_or_content() {
    let pool = pool().await;
    let keyword = unique("needle");
    let category = unique_category();

    let in_title = create_article(&pool, published(&format!("about {keyword}"), category))
        .await
        .unwrap();
    let in_content = {
        let mut article = published("unrelated title", category);
        article.content = format!("somewhere in here: {keyword}.");
        create_article(&pool, article).await.unwrap()
    };
    let mut draft = NewArticle::draft(format!("{keyword} draft"), unique("slug"), 1);
    draft.category_id = category;
    create_article(&pool, draft).await.unwrap();
    create_article(&pool, published("no match", category))
        .await
        .unwrap();

    let page = search_articles(&pool, &keyword, Pagination::new(1, 10))
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page
        .items
        .iter()
        .all(|article| article.status == ArticleStatus::Published));
    assert!(page
        .items
        .iter()
        .all(|article| article.title.contains(&keyword) || article.content.contains(&keyword)));
    assert!(page
        .items
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
    assert_eq!(page.items[0].id, in_content.id);
    assert_eq!(page.items[1].id, in_title.id);

    // wildcards in the keyword are literal
    let page = search_articles(&pool, "%", Pagination::new(1, 10))
        .await
        .unwrap();
    assert!(page.items.iter().all(|article| {
        article.title.contains('%') || article.content.contains('%')
    }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn publishing_stamps_published_at() {
    let pool = pool().await;
    let article = create_article(&pool, NewArticle::draft("draft", unique("slug"), 1))
        .await
        .unwrap();
    assert!(article.published_at.is_none());

    update_article_status(&pool, article.id, ArticleStatus::Published)
        .await
        .unwrap();
    let published = get_article_by_id(&pool, article.id).await.unwrap();
    assert_eq!(published.status, ArticleStatus::Published);
    let published_at = published.published_at.expect("published_at not set");

    update_article_status(&pool, article.id, ArticleStatus::Draft)
        .await
        .unwrap();
    let unpublished = get_article_by_id(&pool, article.id).await.unwrap();
    assert_eq!(unpublished.status, ArticleStatus::Draft);
    assert_eq!(unpublished.published_at, Some(published_at));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "requires database"]
async fn concurrent_view_increments_are_not_lost() {
    let pool = Arc::new(pool().await);
    let article = create_article(&pool, NewArticle::draft("popular", unique("slug"), 1))
        .await
        .unwrap();

    let id = article.id;
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { increment_views(&pool, id).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task panicked").expect("increment failed");
    }

    let article = get_article_by_id(&pool, id).await.unwrap();
    assert_eq!(article.views, 50);
}

#[tokio::test]
#[ignore = "requires database"]
async fn soft_deleted_article_is_hidden() {
    let pool = pool().await;
    let category = unique_category();
    let article = create_article(&pool, published("short lived", category))
        .await
        .unwrap();

    delete_article(&pool, article.id).await.unwrap();

    assert!(get_article_by_id(&pool, article.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(increment_views(&pool, article.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(get_article_by_id_with_deleted(&pool, article.id)
        .await
        .unwrap()
        .is_deleted());
    assert!(count_articles_with_deleted(&pool).await.unwrap() >= 1);

    let page = get_articles_by_category(&pool, category, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn full_record_save_keeps_views() {
    let pool = pool().await;
    let article = create_article(&pool, NewArticle::draft("before", unique("slug"), 1))
        .await
        .unwrap();
    increment_views(&pool, article.id).await.unwrap();

    let mut article = get_article_by_id(&pool, article.id).await.unwrap();
    article.title = "after".into();
    article.summary = "edited".into();
    let saved = update_article(&pool, &article).await.unwrap();

    assert_eq!(saved.title, "after");
    assert_eq!(saved.summary, "edited");
    assert_eq!(saved.views, 1);
    assert!(saved.updated_at >= article.updated_at);
}

#[tokio::test]
#[ignore = "requires database"]
async fn saving_a_deleted_article_updates_it_in_place() {
    let pool = pool().await;
    let article = create_article(&pool, NewArticle::draft("removed", unique("slug"), 1))
        .await
        .unwrap();
    delete_article(&pool, article.id).await.unwrap();

    let mut deleted = get_article_by_id_with_deleted(&pool, article.id)
        .await
        .unwrap();
    deleted.title = "edited while deleted".into();
    let saved = update_article(&pool, &deleted).await.unwrap();
    assert_eq!(saved.id, article.id);
    assert_eq!(saved.title, "edited while deleted");
    assert!(saved.is_deleted());

    deleted.deleted_at = None;
    let restored = update_article(&pool, &deleted).await.unwrap();
    assert!(!restored.is_deleted());
    assert_eq!(get_article_by_id(&pool, article.id).await.unwrap().id, article.id);
}
