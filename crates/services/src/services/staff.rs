//! Staff approval lifecycle and profile maintenance.

use db::models::{
    feed_post::FeedPost,
    user::{ApprovalStatus, StaffMember, User},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct StaffService;

impl StaffService {
    /// All staff accounts except the caller's own, newest first.
    pub async fn list(pool: &SqlitePool, caller_id: Uuid) -> Result<Vec<StaffMember>, StaffError> {
        let users = User::find_all_except(pool, caller_id).await?;
        Ok(users.into_iter().map(StaffMember::from).collect())
    }

    /// Whether any registration is still awaiting an admin decision. Derived
    /// read, recomputed on demand.
    pub async fn pending_approvals(pool: &SqlitePool) -> Result<bool, StaffError> {
        Ok(User::has_pending(pool).await?)
    }

    pub async fn approve(pool: &SqlitePool, user_id: Uuid) -> Result<StaffMember, StaffError> {
        let user = User::set_status(pool, user_id, ApprovalStatus::Approved)
            .await?
            .ok_or(StaffError::NotFound)?;
        info!(user_id = %user_id, username = %user.username, "staff member approved");
        Ok(user.into())
    }

    /// Declining a registration removes the account outright.
    pub async fn decline(pool: &SqlitePool, user_id: Uuid) -> Result<(), StaffError> {
        Self::delete_account(pool, user_id).await?;
        info!(user_id = %user_id, "staff registration declined");
        Ok(())
    }

    /// Remove a staff member together with every feed post they authored.
    pub async fn remove(pool: &SqlitePool, user_id: Uuid) -> Result<(), StaffError> {
        Self::delete_account(pool, user_id).await?;
        info!(user_id = %user_id, "staff member removed");
        Ok(())
    }

    async fn delete_account(pool: &SqlitePool, user_id: Uuid) -> Result<(), StaffError> {
        let mut tx = pool.begin().await?;
        FeedPost::delete_by_author(&mut *tx, user_id).await?;
        if User::delete(&mut *tx, user_id).await? == 0 {
            return Err(StaffError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        user_id: Uuid,
        fullname: &str,
        icon: Option<&str>,
    ) -> Result<StaffMember, StaffError> {
        let user = User::update_profile(pool, user_id, fullname, icon)
            .await?
            .ok_or(StaffError::NotFound)?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use db::models::user::UserRole;

    use super::*;
    use crate::services::{
        feed::{FeedFilter, FeedService},
        test_support::{seed_resident, seed_user, test_db},
    };

    #[tokio::test]
    async fn test_pending_flag_follows_approvals() {
        let db = test_db().await;
        assert!(!StaffService::pending_approvals(&db.pool).await.unwrap());

        let newcomer = seed_user(&db.pool, "new@example.com", UserRole::Regular, ApprovalStatus::Pending).await;
        assert!(StaffService::pending_approvals(&db.pool).await.unwrap());

        let approved = StaffService::approve(&db.pool, newcomer.id).await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert!(!StaffService::pending_approvals(&db.pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_decline_removes_the_account() {
        let db = test_db().await;
        let newcomer = seed_user(&db.pool, "new@example.com", UserRole::Regular, ApprovalStatus::Pending).await;

        StaffService::decline(&db.pool, newcomer.id).await.unwrap();

        assert!(User::find_by_id(&db.pool, newcomer.id).await.unwrap().is_none());
        assert!(matches!(
            StaffService::decline(&db.pool, newcomer.id).await,
            Err(StaffError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_excludes_the_caller() {
        let db = test_db().await;
        let admin = seed_user(&db.pool, "admin@example.com", UserRole::Admin, ApprovalStatus::Approved).await;
        seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;

        let members = StaffService::list(&db.pool, admin.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "carer@example.com");
    }

    #[tokio::test]
    async fn test_remove_cascades_authored_posts() {
        let db = test_db().await;
        let resident = seed_resident(&db.pool, "Ada", 12).await;
        let carer = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;
        let other = seed_user(&db.pool, "other@example.com", UserRole::Regular, ApprovalStatus::Approved).await;
        FeedService::post(&db.pool, resident.id, carer.id, "weight", "82 kg")
            .await
            .unwrap();
        FeedService::post(&db.pool, resident.id, other.id, "pulse_rate", "72 bpm")
            .await
            .unwrap();

        StaffService::remove(&db.pool, carer.id).await.unwrap();

        let remaining = FeedService::list(&db.pool, resident.id, &FeedFilter::default())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].post.posted_by, other.id);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let db = test_db().await;
        let carer = seed_user(&db.pool, "carer@example.com", UserRole::Regular, ApprovalStatus::Approved).await;
        let updated = StaffService::update_profile(
            &db.pool,
            carer.id,
            "Grace Hopper",
            Some("user/images/grace.png"),
        )
        .await
        .unwrap();
        assert_eq!(updated.fullname, "Grace Hopper");
        assert_eq!(updated.icon.as_deref(), Some("user/images/grace.png"));
    }
}
