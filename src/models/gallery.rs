//! Photo gallery model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::helpers::validate_http_url;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhotoGallery {
    pub id: i64,
    pub event_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GalleryPhoto {
    pub id: i64,
    pub gallery_id: i64,
    pub url: String,
    pub caption: Option<String>,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryWithPhotos {
    #[serde(flatten)]
    pub gallery: PhotoGallery,
    pub photos: Vec<GalleryPhoto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGalleryRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl CreateGalleryRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Gallery title is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGalleryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// Photo already stored by the upload provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPhotoRequest {
    pub url: String,
    pub caption: Option<String>,
}

impl AddPhotoRequest {
    pub fn validate(&self) -> Result<()> {
        validate_http_url(&self.url)?;
        Ok(())
    }
}
