use serde::{Deserialize, Serialize};

const MAX_LIMIT: i64 = 100;
const DEFAULT_LIMIT: i64 = 20;

/// Query-string pagination shared by every collection endpoint. Values come
/// in as raw strings and parse leniently: a non-numeric `limit` or `offset`
/// falls back to the default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    limit: Option<String>,
    offset: Option<String>,
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Pagination {
    /// Clamped values safe to hand to LIMIT/OFFSET.
    pub fn clamped(&self) -> (i64, i64) {
        let limit = parse_or(self.limit.as_deref(), DEFAULT_LIMIT);
        let offset = parse_or(self.offset.as_deref(), 0);
        (limit.clamp(1, MAX_LIMIT), offset.max(0))
    }
}

/// Pagination echo in collection responses. `total` is the number of rows
/// returned on this page.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    pub total: usize,
}

impl PageInfo {
    pub fn new(limit: i64, offset: i64, total: usize) -> Self {
        Self {
            limit,
            offset,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(limit: Option<&str>, offset: Option<&str>) -> Pagination {
        Pagination {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
        }
    }

    #[test]
    fn defaults_are_twenty_and_zero() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.clamped(), (20, 0));
    }

    #[test]
    fn limit_clamps_to_one_hundred() {
        assert_eq!(page(Some("500"), None).clamped(), (100, 0));
    }

    #[test]
    fn non_positive_values_are_sanitized() {
        assert_eq!(page(Some("-5"), Some("-10")).clamped(), (1, 0));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        assert_eq!(page(Some("abc"), Some("xyz")).clamped(), (20, 0));
        assert_eq!(page(Some("12.5"), None).clamped(), (20, 0));
        assert_eq!(page(Some("30"), Some("oops")).clamped(), (30, 0));
    }
}
