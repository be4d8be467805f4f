use chrono::{DateTime, Utc};

use crate::places::domain;

#[derive(Debug, sqlx::FromRow)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub photo_uri: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Place> for domain::Place {
    fn from(model: Place) -> Self {
        Self {
            id: model.id,
            name: model.name,
            photo_uri: model.photo_uri,
            latitude: model.latitude,
            longitude: model.longitude,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
