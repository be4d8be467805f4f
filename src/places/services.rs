use anyhow::Context;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationErrors};

use crate::{repos::DynPlaceRepo, storage::DynObjectStorage};

use super::domain::{NewPlace, NewPlaceData, PhotoData, Place, PlaceChanges, PlaceId};

#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("place not found")]
    NotFound,

    #[error("invalid data: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A service object providing functionality relating to places and their
/// photos.
#[derive(Clone)]
pub struct PlaceService {
    place_repo: DynPlaceRepo,
    storage: DynObjectStorage,
}

impl PlaceService {
    pub fn new(place_repo: DynPlaceRepo, storage: DynObjectStorage) -> Self {
        Self {
            place_repo,
            storage,
        }
    }

    async fn upload_photo(&self, photo: &PhotoData, key: Option<&str>) -> anyhow::Result<String> {
        let bytes = photo.decode().context("Photo data is not valid base64.")?;

        self.storage
            .upload(&photo.content_type, bytes, key)
            .await
            .context("Failed to upload photo.")
    }

    pub async fn list_places(&self) -> Result<Vec<Place>, PlaceError> {
        Ok(self.place_repo.list_places().await?)
    }

    pub async fn get_place(&self, place_id: PlaceId) -> Result<Place, PlaceError> {
        self.place_repo
            .get_place(place_id)
            .await?
            .ok_or(PlaceError::NotFound)
    }

    /// Create a place, uploading its photo first if one was provided.
    pub async fn create_place(&self, data: NewPlaceData) -> Result<Place, PlaceError> {
        data.validate()?;

        let photo_uri = match &data.photo {
            Some(photo) => self.upload_photo(photo, None).await?,
            None => String::new(),
        };

        let new_place = NewPlace {
            name: data.name,
            photo_uri,
            latitude: data.latitude,
            longitude: data.longitude,
        };

        match self.place_repo.insert_place(&new_place).await {
            Ok(place) => {
                info!(place_id = place.id, has_photo = place.has_photo(), "Created place.");

                Ok(place)
            }
            Err(persistence_error) => {
                // Don't leave an orphaned photo behind.
                if !new_place.photo_uri.is_empty() {
                    if let Err(error) = self.storage.remove(&new_place.photo_uri).await {
                        error!(
                            ?error,
                            uri = %new_place.photo_uri,
                            "Failed to remove orphaned photo."
                        );
                    }
                }

                Err(persistence_error.into())
            }
        }
    }

    /// Update a place. A new photo replaces the stored one under the same
    /// key.
    pub async fn update_place(
        &self,
        place_id: PlaceId,
        changes: PlaceChanges,
    ) -> Result<Place, PlaceError> {
        changes.validate()?;

        let mut place = self.get_place(place_id).await?;
        place.apply_changes(&changes);

        if let Some(photo) = &changes.photo {
            let key = self.storage.key_for(&place.photo_uri);
            place.photo_uri = self.upload_photo(photo, key.as_deref()).await?;
        }

        let place = self.place_repo.save_place(&place).await?;

        info!(place_id, "Updated place.");

        Ok(place)
    }

    /// Delete a place along with its photo.
    ///
    /// The place is removed first. A photo that cannot be removed afterwards
    /// is only logged, since the place no longer references it.
    pub async fn delete_place(&self, place_id: PlaceId) -> Result<(), PlaceError> {
        let place = self.get_place(place_id).await?;

        if !self.place_repo.delete_place(place_id).await? {
            return Err(PlaceError::NotFound);
        }

        info!(place_id, "Deleted place.");

        if place.has_photo() {
            if let Err(error) = self.storage.remove(&place.photo_uri).await {
                error!(
                    ?error,
                    place_id,
                    uri = %place.photo_uri,
                    "Failed to remove photo of deleted place."
                );
            }
        }

        Ok(())
    }
}
