use std::{borrow::Cow, collections::HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

pub type PlaceId = i64;

/// A location transactions can be associated with.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    /// Where the place's photo is served from, or empty if it has none.
    pub photo_uri: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Place {
    pub fn has_photo(&self) -> bool {
        !self.photo_uri.is_empty()
    }

    /// Apply the non-photo fields of a set of changes.
    pub fn apply_changes(&mut self, changes: &PlaceChanges) {
        if let Some(name) = &changes.name {
            self.name = name.to_owned();
        }
        if let Some(latitude) = changes.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = changes.longitude {
            self.longitude = longitude;
        }
    }
}

/// A photo submitted inline with a place.
#[derive(Debug, Deserialize, Validate)]
pub struct PhotoData {
    #[validate(custom = "validate_image_type")]
    pub content_type: String,

    /// The photo's bytes, base64 encoded.
    #[validate(custom = "validate_base64")]
    pub data: String,
}

impl PhotoData {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::decode(&self.data)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPlaceData {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate]
    pub photo: Option<PhotoData>,
}

/// A place that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPlace {
    pub name: String,
    pub photo_uri: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A partial update of a place. Absent fields are left unchanged, and a
/// photo replaces the current one.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PlaceChanges {
    #[validate(length(min = 1))]
    pub name: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    #[validate]
    pub photo: Option<PhotoData>,
}

fn validate_image_type(content_type: &str) -> Result<(), ValidationError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(ValidationError {
            code: Cow::from("image"),
            message: Some(Cow::from("Photos must be images.")),
            params: HashMap::new(),
        })
    }
}

fn validate_base64(data: &str) -> Result<(), ValidationError> {
    match base64::decode(data) {
        Ok(bytes) if !bytes.is_empty() => Ok(()),
        _ => Err(ValidationError {
            code: Cow::from("base64"),
            message: Some(Cow::from("Photo data must be non-empty base64.")),
            params: HashMap::new(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn data(latitude: f64, longitude: f64) -> NewPlaceData {
        NewPlaceData {
            name: "Market".to_owned(),
            latitude,
            longitude,
            photo: None,
        }
    }

    #[test]
    fn coordinates_at_bounds_are_valid() {
        data(90.0, -180.0).validate().expect("bounds are inclusive");
        data(-90.0, 180.0).validate().expect("bounds are inclusive");
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        let errors = data(90.5, -181.0).validate().expect_err("out of range");
        let field_errors = errors.field_errors();

        assert_eq!("range", field_errors["latitude"][0].code);
        assert_eq!("range", field_errors["longitude"][0].code);
    }

    #[test]
    fn photo_must_be_an_encoded_image() {
        let errors = NewPlaceData {
            photo: Some(PhotoData {
                content_type: "text/plain".to_owned(),
                data: "not base64!".to_owned(),
            }),
            ..data(0.0, 0.0)
        }
        .validate()
        .expect_err("bad photo");

        assert!(errors.errors().contains_key("photo"));
    }

    #[test]
    fn photo_decodes() {
        let photo = PhotoData {
            content_type: "image/png".to_owned(),
            data: base64::encode([137, 80, 78, 71]),
        };

        photo.validate().expect("photo is valid");
        assert_eq!(vec![137, 80, 78, 71], photo.decode().unwrap());
    }

    #[test]
    fn changes_apply_to_present_fields() {
        let mut place = Place {
            id: 1,
            name: "Market".to_owned(),
            photo_uri: String::new(),
            latitude: 1.0,
            longitude: 2.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        place.apply_changes(&PlaceChanges {
            latitude: Some(0.0),
            ..Default::default()
        });

        assert_eq!("Market", place.name);
        assert_eq!(0.0, place.latitude);
        assert_eq!(2.0, place.longitude);
        assert!(!place.has_photo());
    }
}
