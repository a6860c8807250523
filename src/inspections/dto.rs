use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::{
    error::AppError,
    inspections::repo::{Inspection, InspectionChanges, InspectionWithRefs},
    pagination::PageInfo,
    patch::double_option,
};

/// Parses an RFC 3339 appointment date and requires it to be strictly in the
/// future.
pub fn parse_future_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    let date = OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|_| AppError::bad_request("Invalid date format"))?;
    if date <= OffsetDateTime::now_utc() {
        return Err(AppError::bad_request(
            "Inspection date cannot be in the past",
        ));
    }
    Ok(date)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspectionRequest {
    pub car_id: Uuid,
    pub date: String,
    pub notes: Option<String>,
}

/// Appointment patch; `notes: null` clears the text.
#[derive(Debug, Deserialize)]
pub struct UpdateInspectionRequest {
    pub date: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl UpdateInspectionRequest {
    /// Re-validates a present date with the same rule as creation.
    pub fn into_changes(self) -> Result<InspectionChanges, AppError> {
        let date = self.date.as_deref().map(parse_future_date).transpose()?;
        let changes = InspectionChanges {
            date,
            notes: self.notes,
        };
        if changes.is_empty() {
            return Err(AppError::bad_request("No valid fields to update"));
        }
        Ok(changes)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InspectionFilterQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct InspectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub inspection: Inspection,
}

#[derive(Debug, Serialize)]
pub struct InspectionDetailResponse {
    pub success: bool,
    pub inspection: InspectionWithRefs,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InspectionListResponse {
    pub success: bool,
    pub inspections: Vec<InspectionWithRefs>,
    pub pagination: PageInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn malformed_date_is_bad_request() {
        assert!(parse_future_date("next tuesday").is_err());
        assert!(parse_future_date("2025-13-40T00:00:00Z").is_err());
    }

    #[test]
    fn past_date_is_rejected() {
        let past = (OffsetDateTime::now_utc() - Duration::days(1))
            .format(&Rfc3339)
            .unwrap();
        assert!(parse_future_date(&past).is_err());
    }

    #[test]
    fn now_is_rejected_strictly() {
        let now = OffsetDateTime::now_utc().format(&Rfc3339).unwrap();
        assert!(parse_future_date(&now).is_err());
    }

    #[test]
    fn future_date_is_accepted() {
        let future = (OffsetDateTime::now_utc() + Duration::days(3))
            .format(&Rfc3339)
            .unwrap();
        let parsed = parse_future_date(&future).unwrap();
        assert!(parsed > OffsetDateTime::now_utc());
    }

    #[test]
    fn empty_patch_is_bad_request() {
        let req: UpdateInspectionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.into_changes().is_err());
    }

    #[test]
    fn clearing_notes_alone_is_a_valid_patch() {
        let req: UpdateInspectionRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.notes, Some(None));
        assert!(changes.date.is_none());
    }
}
