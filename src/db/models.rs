use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{StoreError, StoreResult};

/// A stored upload and the metadata of its derived renditions.
///
/// File fields hold bare filenames; the storage area they live in is implied by the field.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub original_name: String,

    pub original_file: String,
    pub thumb_file: String,
    pub large_file: String,

    pub width: Option<i64>,
    pub height: Option<i64>,

    pub original_bytes: Option<i64>,
    pub thumb_bytes: Option<i64>,
    pub large_bytes: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes accepted by [`Photo::create`]. The store assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPhoto {
    pub title: String,
    pub description: String,
    pub original_name: String,
    pub original_file: String,
    pub thumb_file: String,
    pub large_file: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub original_bytes: Option<i64>,
    pub thumb_bytes: Option<i64>,
    pub large_bytes: Option<i64>,
}

impl NewPhoto {
    /// Trims every text field and checks that the required ones are present.
    pub fn normalized(self) -> StoreResult<Self> {
        let normalized = NewPhoto {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            original_name: self.original_name.trim().to_string(),
            original_file: self.original_file.trim().to_string(),
            thumb_file: self.thumb_file.trim().to_string(),
            large_file: self.large_file.trim().to_string(),
            ..self
        };

        let required = [
            ("original_name", &normalized.original_name),
            ("original_file", &normalized.original_file),
            ("thumb_file", &normalized.thumb_file),
            ("large_file", &normalized.large_file),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(StoreError::Validation(*field));
        }

        Ok(normalized)
    }
}

impl Photo {
    /// Dimensions formatted for display, `None` when the probe could not read them.
    pub fn dimensions(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{} × {}", w, h)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> NewPhoto {
        NewPhoto {
            title: "  Sunset ".to_string(),
            description: "\tover the bay\n".to_string(),
            original_name: " IMG_0001.JPG ".to_string(),
            original_file: "1700000000000-img-0001.jpg".to_string(),
            thumb_file: "1700000000001-thumb.jpg".to_string(),
            large_file: "1700000000001-large.jpg".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalized_trims_text_fields() {
        let photo = complete().normalized().unwrap();
        assert_eq!(photo.title, "Sunset");
        assert_eq!(photo.description, "over the bay");
        assert_eq!(photo.original_name, "IMG_0001.JPG");
    }

    #[test]
    fn test_normalized_allows_empty_title_and_description() {
        let photo = NewPhoto {
            title: String::new(),
            description: "   ".to_string(),
            ..complete()
        }
        .normalized()
        .unwrap();
        assert_eq!(photo.title, "");
        assert_eq!(photo.description, "");
    }

    #[test]
    fn test_normalized_rejects_missing_required_fields() {
        let err = NewPhoto {
            thumb_file: "  ".to_string(),
            ..complete()
        }
        .normalized()
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation("thumb_file")));

        let err = NewPhoto {
            original_name: String::new(),
            ..complete()
        }
        .normalized()
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation("original_name")));
    }
}
