//! Photo gallery repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::gallery::{PhotoGallery, GalleryPhoto, CreateGalleryRequest, UpdateGalleryRequest, AddPhotoRequest};
use crate::utils::errors::CampusEventsError;

const GALLERY_COLUMNS: &str = "id, event_id, title, description, is_public, created_by, created_at, updated_at";
const PHOTO_COLUMNS: &str = "id, gallery_id, url, caption, uploaded_by, created_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct GalleryRepository {
    pool: PgPool,
}

impl GalleryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a gallery for an event
    pub async fn create(&self, event_id: i64, created_by: i64, request: CreateGalleryRequest) -> Result<PhotoGallery, CampusEventsError> {
        let gallery = sqlx::query_as::<_, PhotoGallery>(&format!(
            r#"
            INSERT INTO photo_galleries (event_id, title, description, is_public, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {GALLERY_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(request.title.trim())
        .bind(request.description)
        .bind(request.is_public)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(gallery)
    }

    /// Find gallery by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<PhotoGallery>, CampusEventsError> {
        let gallery = sqlx::query_as::<_, PhotoGallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM photo_galleries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gallery)
    }

    /// Update gallery
    pub async fn update(&self, id: i64, request: UpdateGalleryRequest) -> Result<PhotoGallery, CampusEventsError> {
        let gallery = sqlx::query_as::<_, PhotoGallery>(&format!(
            r#"
            UPDATE photo_galleries
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                is_public = COALESCE($4, is_public),
                updated_at = $5
            WHERE id = $1
            RETURNING {GALLERY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title.map(|t| t.trim().to_string()))
        .bind(request.description)
        .bind(request.is_public)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CampusEventsError::not_found("Gallery", id))?;

        Ok(gallery)
    }

    /// Delete gallery and its photos
    pub async fn delete(&self, id: i64) -> Result<(), CampusEventsError> {
        let result = sqlx::query("DELETE FROM photo_galleries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CampusEventsError::not_found("Gallery", id));
        }
        Ok(())
    }

    /// Galleries of an event; private ones only when `include_private`
    pub async fn list_for_event(&self, event_id: i64, include_private: bool) -> Result<Vec<PhotoGallery>, CampusEventsError> {
        let galleries = sqlx::query_as::<_, PhotoGallery>(&format!(
            r#"
            SELECT {GALLERY_COLUMNS} FROM photo_galleries
            WHERE event_id = $1 AND (is_public OR $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(event_id)
        .bind(include_private)
        .fetch_all(&self.pool)
        .await?;

        Ok(galleries)
    }

    /// Add a photo to a gallery
    pub async fn add_photo(&self, gallery_id: i64, uploaded_by: i64, request: AddPhotoRequest) -> Result<GalleryPhoto, CampusEventsError> {
        let photo = sqlx::query_as::<_, GalleryPhoto>(&format!(
            r#"
            INSERT INTO gallery_photos (gallery_id, url, caption, uploaded_by, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PHOTO_COLUMNS}
            "#
        ))
        .bind(gallery_id)
        .bind(request.url.trim())
        .bind(request.caption)
        .bind(uploaded_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(photo)
    }

    /// Find a photo by ID
    pub async fn find_photo(&self, id: i64) -> Result<Option<GalleryPhoto>, CampusEventsError> {
        let photo = sqlx::query_as::<_, GalleryPhoto>(&format!("SELECT {PHOTO_COLUMNS} FROM gallery_photos WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    /// Remove a photo from a gallery
    pub async fn remove_photo(&self, gallery_id: i64, photo_id: i64) -> Result<(), CampusEventsError> {
        let result = sqlx::query("DELETE FROM gallery_photos WHERE id = $1 AND gallery_id = $2")
            .bind(photo_id)
            .bind(gallery_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CampusEventsError::not_found("Photo", photo_id));
        }
        Ok(())
    }

    /// Photos of a gallery in upload order
    pub async fn list_photos(&self, gallery_id: i64) -> Result<Vec<GalleryPhoto>, CampusEventsError> {
        let photos = sqlx::query_as::<_, GalleryPhoto>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM gallery_photos WHERE gallery_id = $1 ORDER BY created_at, id"
        ))
        .bind(gallery_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    /// Count photos across all galleries of an event
    pub async fn count_photos_for_event(&self, event_id: i64) -> Result<i64, CampusEventsError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM gallery_photos p
            INNER JOIN photo_galleries g ON g.id = p.gallery_id
            WHERE g.event_id = $1
            "#
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
