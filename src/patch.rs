//! Serde helper for clearable patch fields.
//!
//! Partial updates need three states for fields like `notes`, `description`
//! and `phone`: absent (keep), `null` (clear), value (replace). A plain
//! `Option<T>` collapses the first two, so clearable fields are declared as
//! `Option<Option<T>>` with this deserializer.

use serde::{Deserialize, Deserializer};

pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "super::double_option")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn absent_field_is_none() {
        let p: Patch = serde_json::from_str("{}").unwrap();
        assert!(p.notes.is_none());
    }

    #[test]
    fn null_field_is_some_none() {
        let p: Patch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(p.notes, Some(None));
    }

    #[test]
    fn value_field_is_some_some() {
        let p: Patch = serde_json::from_str(r#"{"notes": "bring keys"}"#).unwrap();
        assert_eq!(p.notes, Some(Some("bring keys".to_string())));
    }
}
