use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
// Upper bound keeps `(page - 1) * limit` far from i64 overflow.
pub const MAX_PAGE: i64 = 1_000_000;

/// Clamp raw `page`/`limit` query values and derive the row offset.
pub fn normalize_page(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;
    (page, limit, offset)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Catalog filters; everything combines with AND except `search`, which is an
/// OR across name and description.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(normalize_page(None, None), (1, 10, 0));
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(normalize_page(Some(3), Some(20)), (3, 20, 40));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(normalize_page(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(normalize_page(Some(-5), Some(1000)), (1, 100, 0));
    }

    #[test]
    fn huge_page_does_not_overflow_the_offset() {
        let (page, limit, offset) = normalize_page(Some(i64::MAX), Some(100));
        assert_eq!(page, MAX_PAGE);
        assert_eq!(offset, (MAX_PAGE - 1) * limit);
        assert!(offset > 0);
    }
}
