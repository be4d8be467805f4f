use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    database::PostgresConnection,
    models,
    places::domain::{NewPlace, Place, PlaceId},
};

pub type DynPlaceRepo = Arc<dyn PlaceRepo + Send + Sync>;

#[async_trait]
pub trait PlaceRepo {
    async fn insert_place(&self, place: &NewPlace) -> anyhow::Result<Place>;

    async fn get_place(&self, place_id: PlaceId) -> anyhow::Result<Option<Place>>;

    async fn list_places(&self) -> anyhow::Result<Vec<Place>>;

    /// Persist every attribute of an existing place.
    async fn save_place(&self, place: &Place) -> anyhow::Result<Place>;

    /// Delete a place. Returns `false` if it does not exist.
    async fn delete_place(&self, place_id: PlaceId) -> anyhow::Result<bool>;
}

#[async_trait]
impl PlaceRepo for PostgresConnection {
    async fn insert_place(&self, place: &NewPlace) -> anyhow::Result<Place> {
        let model = sqlx::query_as::<_, models::places::Place>(
            r#"
            INSERT INTO place (name, photo_uri, latitude, longitude)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&place.name)
        .bind(&place.photo_uri)
        .bind(place.latitude)
        .bind(place.longitude)
        .fetch_one(&**self)
        .await?;

        Ok(model.into())
    }

    async fn get_place(&self, place_id: PlaceId) -> anyhow::Result<Option<Place>> {
        let model =
            sqlx::query_as::<_, models::places::Place>("SELECT * FROM place WHERE id = $1")
                .bind(place_id)
                .fetch_optional(&**self)
                .await?;

        Ok(model.map(Into::into))
    }

    async fn list_places(&self) -> anyhow::Result<Vec<Place>> {
        let models =
            sqlx::query_as::<_, models::places::Place>("SELECT * FROM place ORDER BY name, id")
                .fetch_all(&**self)
                .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn save_place(&self, place: &Place) -> anyhow::Result<Place> {
        let model = sqlx::query_as::<_, models::places::Place>(
            r#"
            UPDATE place
            SET name = $1, photo_uri = $2, latitude = $3, longitude = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&place.name)
        .bind(&place.photo_uri)
        .bind(place.latitude)
        .bind(place.longitude)
        .bind(place.id)
        .fetch_one(&**self)
        .await?;

        Ok(model.into())
    }

    async fn delete_place(&self, place_id: PlaceId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM place WHERE id = $1")
            .bind(place_id)
            .execute(&**self)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
