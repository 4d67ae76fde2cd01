//! Resident lifecycle: creation with an initial care plan, listing, soft
//! deletion with cascade.

use db::models::{
    care_plan::CarePlan,
    feed_post::FeedPost,
    resident::{CreateResident, Resident},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ResidentError {
    #[error("resident not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct ResidentService;

impl ResidentService {
    /// Create a resident together with its initial care plan, atomically.
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateResident,
    ) -> Result<Resident, ResidentError> {
        let mut tx = pool.begin().await?;
        let id = Uuid::new_v4();
        let resident = Resident::create(&mut *tx, id, data).await?;
        CarePlan::create_initial(
            &mut *tx,
            id,
            &resident.name,
            resident.birthday,
            resident.room_number,
        )
        .await?;
        tx.commit().await?;

        info!(resident_id = %resident.id, "resident created");
        Ok(resident)
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<Resident>, ResidentError> {
        Ok(Resident::find_all(pool).await?)
    }

    /// Soft-delete the resident and physically remove its care plan and feed
    /// posts, in one transaction.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ResidentError> {
        let mut tx = pool.begin().await?;
        if Resident::soft_delete(&mut *tx, id).await? == 0 {
            return Err(ResidentError::NotFound);
        }
        CarePlan::delete_by_resident_id(&mut *tx, id).await?;
        FeedPost::delete_by_resident_id(&mut *tx, id).await?;
        tx.commit().await?;

        info!(resident_id = %id, "resident deleted");
        Ok(())
    }

    pub async fn update_icon(
        pool: &SqlitePool,
        id: Uuid,
        icon: Option<&str>,
    ) -> Result<Resident, ResidentError> {
        Resident::update_icon(pool, id, icon)
            .await?
            .ok_or(ResidentError::NotFound)
    }
}
