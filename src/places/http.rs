use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::{
    authentication::TokenClaims,
    authorization::require_admin,
    http_err::{ApiError, ApiResponse},
    server::AppState,
};

use super::{
    domain::{self, NewPlaceData, PlaceChanges, PlaceId},
    services::{PlaceError, PlaceService},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/places", get(get_places).post(create_place))
        .route(
            "/places/:place_id",
            get(get_place).put(update_place).delete(delete_place),
        )
}

#[derive(Serialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub photo_uri: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&domain::Place> for Place {
    fn from(place: &domain::Place) -> Self {
        Self {
            id: place.id,
            name: place.name.to_owned(),
            photo_uri: place.has_photo().then(|| place.photo_uri.to_owned()),
            latitude: place.latitude,
            longitude: place.longitude,
            created_at: place.created_at,
            updated_at: place.updated_at,
        }
    }
}

impl From<PlaceError> for ApiError {
    fn from(error: PlaceError) -> Self {
        match error {
            PlaceError::NotFound => Self::not_found("place"),
            PlaceError::Invalid(errors) => Self::BadRequest(errors),
            PlaceError::Other(error) => {
                error!(?error, "Place operation failed.");

                Self::InternalServerError
            }
        }
    }
}

async fn get_places(
    _claims: TokenClaims,
    State(place_service): State<PlaceService>,
) -> ApiResponse<Json<Vec<Place>>> {
    let places = place_service.list_places().await?;

    Ok(Json(places.iter().map(Place::from).collect()))
}

async fn get_place(
    _claims: TokenClaims,
    State(place_service): State<PlaceService>,
    Path(place_id): Path<PlaceId>,
) -> ApiResponse<Json<Place>> {
    let place = place_service.get_place(place_id).await?;

    Ok(Json((&place).into()))
}

async fn create_place(
    claims: TokenClaims,
    State(place_service): State<PlaceService>,
    Json(data): Json<NewPlaceData>,
) -> ApiResponse<(StatusCode, Json<Place>)> {
    require_admin(&claims)?;

    let place = place_service.create_place(data).await?;

    Ok((StatusCode::CREATED, Json((&place).into())))
}

async fn update_place(
    claims: TokenClaims,
    State(place_service): State<PlaceService>,
    Path(place_id): Path<PlaceId>,
    Json(changes): Json<PlaceChanges>,
) -> ApiResponse<Json<Place>> {
    require_admin(&claims)?;

    let place = place_service.update_place(place_id, changes).await?;

    Ok(Json((&place).into()))
}

async fn delete_place(
    claims: TokenClaims,
    State(place_service): State<PlaceService>,
    Path(place_id): Path<PlaceId>,
) -> ApiResponse<StatusCode> {
    require_admin(&claims)?;

    place_service.delete_place(place_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
