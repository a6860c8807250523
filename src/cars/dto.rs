use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    cars::repo::{Car, CarChanges, CarWithOwner},
    error::AppError,
    pagination::PageInfo,
    patch::double_option,
};

pub const MIN_YEAR: i32 = 1900;

/// Converts a decimal major-unit price to cents, rejecting non-positive or
/// out-of-range values before any write happens.
pub fn price_to_cents(price: f64) -> Result<i32, AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::bad_request("Price must be greater than 0"));
    }
    let cents = (price * 100.0).round();
    if cents > i32::MAX as f64 {
        return Err(AppError::bad_request("Price is too large"));
    }
    Ok(cents as i32)
}

pub fn validate_year(year: i32) -> Result<(), AppError> {
    let max_year = OffsetDateTime::now_utc().year() + 1;
    if year < MIN_YEAR || year > max_year {
        return Err(AppError::bad_request("Invalid year"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub title: String,
    pub price: f64,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
}

impl CreateCarRequest {
    pub fn validate(&self) -> Result<i32, AppError> {
        if self.title.trim().is_empty()
            || self.brand.trim().is_empty()
            || self.model.trim().is_empty()
        {
            return Err(AppError::bad_request(
                "Title, price, brand, model, and year are required",
            ));
        }
        validate_year(self.year)?;
        price_to_cents(self.price)
    }
}

/// Listing patch; `description: null` clears the text.
#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub images: Option<Vec<String>>,
}

impl UpdateCarRequest {
    /// Re-validates present fields with the same rules as creation.
    pub fn into_changes(self) -> Result<CarChanges, AppError> {
        let price = self.price.map(price_to_cents).transpose()?;
        if let Some(year) = self.year {
            validate_year(year)?;
        }
        let changes = CarChanges {
            title: self.title,
            price,
            brand: self.brand,
            model: self.model,
            year: self.year,
            description: self.description,
            images: self.images,
        };
        if changes.is_empty() {
            return Err(AppError::bad_request("No valid fields to update"));
        }
        Ok(changes)
    }
}

/// Query-string filters for the collection view.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarFilterQuery {
    pub status: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CarResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub car: Car,
}

#[derive(Debug, Serialize)]
pub struct CarDetailResponse {
    pub success: bool,
    pub car: CarWithOwner,
}

#[derive(Debug, Serialize)]
pub struct CarListResponse {
    pub success: bool,
    pub cars: Vec<CarWithOwner>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_converts_to_rounded_cents() {
        assert_eq!(price_to_cents(19999.99).unwrap(), 1_999_999);
        assert_eq!(price_to_cents(0.01).unwrap(), 1);
        assert_eq!(price_to_cents(12.34).unwrap(), 1234);
        assert_eq!(price_to_cents(100.0).unwrap(), 10_000);
    }

    #[test]
    fn non_positive_price_rejected() {
        assert!(price_to_cents(0.0).is_err());
        assert!(price_to_cents(-5.0).is_err());
        assert!(price_to_cents(f64::NAN).is_err());
    }

    #[test]
    fn year_bounds_follow_current_year() {
        let this_year = OffsetDateTime::now_utc().year();
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(this_year + 1).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(this_year + 2).is_err());
    }

    #[test]
    fn create_requires_non_blank_text_fields() {
        let req = CreateCarRequest {
            title: "  ".into(),
            price: 100.0,
            brand: "VW".into(),
            model: "Golf".into(),
            year: 2020,
            description: None,
            images: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_patch_is_bad_request() {
        let req: UpdateCarRequest = serde_json::from_str("{}").unwrap();
        assert!(req.into_changes().is_err());
    }

    #[test]
    fn patch_revalidates_present_fields() {
        let req: UpdateCarRequest = serde_json::from_str(r#"{"price": -1}"#).unwrap();
        assert!(req.into_changes().is_err());
        let req: UpdateCarRequest = serde_json::from_str(r#"{"year": 1850}"#).unwrap();
        assert!(req.into_changes().is_err());
        let req: UpdateCarRequest =
            serde_json::from_str(r#"{"price": 12.5, "description": null}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.price, Some(1250));
        assert_eq!(changes.description, Some(None));
    }
}
