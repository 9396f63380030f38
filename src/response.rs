use serde::Serialize;
use utoipa::ToSchema;

/// Pagination block returned alongside paginated lists:
/// `{ total, page, limit, pages }`.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            total,
            page,
            limit,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(PageMeta::new(25, 1, 10).pages, 3);
        assert_eq!(PageMeta::new(30, 2, 10).pages, 3);
        assert_eq!(PageMeta::new(1, 1, 10).pages, 1);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        assert_eq!(PageMeta::new(0, 1, 10).pages, 0);
    }
}
