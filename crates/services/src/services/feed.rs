//! Categorized feed posts: creation, scoped retrieval, author-only edits.

use std::str::FromStr;

use chrono::NaiveDate;
use db::models::{
    feed_post::{FeedCategory, FeedPost, FeedPostWithAuthor},
    resident::Resident,
    user::{ApprovalStatus, User},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown feed category: {0}")]
    UnknownCategory(String),
    #[error("resident not found")]
    ResidentNotFound,
    #[error("post not found")]
    PostNotFound,
    #[error("author not found")]
    AuthorNotFound,
    #[error("author is not an approved staff member")]
    NotApproved,
    #[error("only the original author may modify a post")]
    NotAuthor,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Optional narrowing for feed listings; filters combine with AND.
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

pub struct FeedService;

impl FeedService {
    /// Create a post. The category tag must be one of the fixed enumeration;
    /// anything else is rejected before any row is written.
    pub async fn post(
        pool: &SqlitePool,
        resident_id: Uuid,
        author_id: Uuid,
        category: &str,
        message: &str,
    ) -> Result<FeedPost, FeedError> {
        let category = parse_category(category)?;
        Resident::find_by_id(pool, resident_id)
            .await?
            .ok_or(FeedError::ResidentNotFound)?;
        let author = User::find_by_id(pool, author_id)
            .await?
            .ok_or(FeedError::AuthorNotFound)?;
        if author.status != ApprovalStatus::Approved {
            return Err(FeedError::NotApproved);
        }

        let post =
            FeedPost::create(pool, Uuid::new_v4(), resident_id, category, message, author_id)
                .await?;
        info!(
            resident_id = %resident_id,
            post_id = %post.id,
            category = %category,
            "feed post created"
        );
        Ok(post)
    }

    /// Posts for a resident, newest first, optionally narrowed by category
    /// and calendar date.
    pub async fn list(
        pool: &SqlitePool,
        resident_id: Uuid,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedPostWithAuthor>, FeedError> {
        let category = filter.category.as_deref().map(parse_category).transpose()?;
        Resident::find_by_id(pool, resident_id)
            .await?
            .ok_or(FeedError::ResidentNotFound)?;
        Ok(FeedPost::list_for_resident(pool, resident_id, category, filter.date).await?)
    }

    /// Replace a post's message. Only the original author may edit.
    pub async fn update(
        pool: &SqlitePool,
        post_id: Uuid,
        editor_id: Uuid,
        new_message: &str,
    ) -> Result<FeedPost, FeedError> {
        let post = FeedPost::find_by_id(pool, post_id)
            .await?
            .ok_or(FeedError::PostNotFound)?;
        if post.posted_by != editor_id {
            return Err(FeedError::NotAuthor);
        }
        Ok(FeedPost::update_message(pool, post_id, new_message).await?)
    }

    /// Remove a post. Only the original author may delete.
    pub async fn delete(
        pool: &SqlitePool,
        post_id: Uuid,
        editor_id: Uuid,
    ) -> Result<(), FeedError> {
        let post = FeedPost::find_by_id(pool, post_id)
            .await?
            .ok_or(FeedError::PostNotFound)?;
        if post.posted_by != editor_id {
            return Err(FeedError::NotAuthor);
        }
        FeedPost::delete(pool, post_id).await?;
        Ok(())
    }
}

fn parse_category(raw: &str) -> Result<FeedCategory, FeedError> {
    FeedCategory::from_str(raw).map_err(|_| FeedError::UnknownCategory(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use db::models::user::UserRole;

    use super::*;
    use crate::services::test_support::{seed_resident, seed_user, test_db};

    #[tokio::test]
    async fn test_unknown_category_is_rejected_without_insert() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let author = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let result =
            FeedService::post(&db.pool, resident.id, author.id, "not_a_real_category", "msg").await;
        assert!(matches!(result, Err(FeedError::UnknownCategory(_))));

        let posts = FeedService::list(&db.pool, resident.id, &FeedFilter::default())
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_pending_author_cannot_post() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let pending = seed_user(&db.pool, "new@example.com", UserRole::Regular, ApprovalStatus::Pending).await;

        let result =
            FeedService::post(&db.pool, resident.id, pending.id, "weight", "82 kg").await;
        assert!(matches!(result, Err(FeedError::NotApproved)));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_scoped_by_category() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let author = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        FeedService::post(&db.pool, resident.id, author.id, "weight", "81 kg")
            .await
            .unwrap();
        FeedService::post(&db.pool, resident.id, author.id, "pulse_rate", "72 bpm")
            .await
            .unwrap();
        let newest = FeedService::post(&db.pool, resident.id, author.id, "weight", "82 kg")
            .await
            .unwrap();

        let weights = FeedService::list(
            &db.pool,
            resident.id,
            &FeedFilter {
                category: Some("weight".to_string()),
                date: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].post.id, newest.id);
        assert!(weights.iter().all(|p| p.post.category == FeedCategory::Weight));
        assert_eq!(weights[0].posted_by_name, "Test User");
    }

    #[tokio::test]
    async fn test_date_filter_matches_calendar_date_only() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let author = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        // Ten minutes to midnight and ten minutes past, either side of
        // 2024-01-02.
        for (ts, msg) in [
            ("2024-01-01 23:50:00", "before midnight"),
            ("2024-01-02 00:10:00", "after midnight"),
        ] {
            sqlx::query(
                "INSERT INTO feed_posts (id, resident_id, category, message, posted_by, created_at, updated_at)
                 VALUES ($1, $2, 'weight', $3, $4, $5, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(resident.id)
            .bind(msg)
            .bind(author.id)
            .bind(ts)
            .execute(&db.pool)
            .await
            .unwrap();
        }

        let posts = FeedService::list(
            &db.pool,
            resident.id,
            &FeedFilter {
                category: Some("weight".to_string()),
                date: NaiveDate::from_ymd_opt(2024, 1, 2),
            },
        )
        .await
        .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.message, "after midnight");
    }

    #[tokio::test]
    async fn test_only_author_may_update_or_delete() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let author = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;
        let other = seed_user(&db.pool, "other@example.com", UserRole::Admin, ApprovalStatus::Approved).await;

        let post = FeedService::post(&db.pool, resident.id, author.id, "temperature", "37.1 C")
            .await
            .unwrap();

        let update = FeedService::update(&db.pool, post.id, other.id, "36.5 C").await;
        assert!(matches!(update, Err(FeedError::NotAuthor)));
        let delete = FeedService::delete(&db.pool, post.id, other.id).await;
        assert!(matches!(delete, Err(FeedError::NotAuthor)));

        // Untouched after both rejected attempts.
        let posts = FeedService::list(&db.pool, resident.id, &FeedFilter::default())
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post.message, "37.1 C");
        assert_eq!(posts[0].post.created_at, posts[0].post.updated_at);
    }

    #[tokio::test]
    async fn test_author_update_refreshes_updated_at_only() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let author = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let post = FeedService::post(&db.pool, resident.id, author.id, "food_intake", "Ate well")
            .await
            .unwrap();
        let updated = FeedService::update(&db.pool, post.id, author.id, "Ate most of lunch")
            .await
            .unwrap();

        assert_eq!(updated.message, "Ate most of lunch");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at >= post.updated_at);
    }
}
