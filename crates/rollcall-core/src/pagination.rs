//! Page-based pagination for list endpoints.
//!
//! `limit` is clamped to `[1, 100]` (default 20) and `page` is 1-indexed.
//!
//! ```ignore
//! // GET /api/admin/students?class_key=2023-SE-IT-A-morning&page=2&limit=50
//! let offset = params.offset();
//! let rows = fetch(limit, offset).await?;
//! let meta = PaginationMeta::new(total, &params);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Accepts `?page=3`, `?page=` and a missing key alike; blank means unset.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| {
        serde::de::Error::custom(format!("expected a whole number, got '{}'", raw))
    })
}

/// Page controls as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Items per page (1-100, default: 20)
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<i64>,
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
}

impl PaginationParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.map_or(DEFAULT_LIMIT, |l| l.clamp(1, MAX_LIMIT))
    }

    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    /// Rows to skip, for `LIMIT $n OFFSET $m`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.limit() * (self.page() - 1)
    }
}

/// Returned next to each page so clients know whether to ask for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Matching rows across all pages
    pub total: i64,
    pub limit: i64,
    pub page: i64,
    pub has_more: bool,
}

impl PaginationMeta {
    pub fn new(total: i64, params: &PaginationParams) -> Self {
        let (limit, page) = (params.limit(), params.page());
        Self {
            total,
            limit,
            page,
            has_more: limit * page < total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 20);
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        for (input, expected) in [(Some(0), 1), (Some(-5), 1), (Some(50), 50), (Some(500), 100)] {
            let params = PaginationParams {
                limit: input,
                page: None,
            };
            assert_eq!(params.limit(), expected);
        }
    }

    #[test]
    fn test_offset_from_page() {
        let params = PaginationParams {
            limit: Some(25),
            page: Some(3),
        };
        assert_eq!(params.offset(), 50);

        let params = PaginationParams {
            limit: Some(25),
            page: Some(-2),
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_meta_has_more() {
        let params = PaginationParams {
            limit: Some(10),
            page: Some(2),
        };
        assert!(PaginationMeta::new(21, &params).has_more);
        assert!(!PaginationMeta::new(20, &params).has_more);
    }

    #[test]
    fn test_deserialize_empty_strings() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"limit":"","page":""}"#).unwrap();
        assert_eq!(params.limit(), 20);
        assert_eq!(params.page(), 1);

        let params: PaginationParams =
            serde_json::from_str(r#"{"limit":"5","page":" 4 "}"#).unwrap();
        assert_eq!(params.offset(), 15);

        assert!(serde_json::from_str::<PaginationParams>(r#"{"page":"two"}"#).is_err());
    }
}
