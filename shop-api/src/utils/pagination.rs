use serde::Serialize;

use crate::domain::validation::parse_integer;
use crate::error::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// 解析查询参数中的 `page` / `limit`，缺省时使用默认值
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, AppError> {
        let page = match page {
            None => DEFAULT_PAGE,
            Some(raw) => match parse_integer(raw) {
                Some(p) if p >= 1 => p as u64,
                _ => return Err(AppError::Validation("page must be a number greater than or equal to 1".to_string())),
            },
        };

        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(raw) => match parse_integer(raw) {
                Some(l) if (1..=MAX_LIMIT as i64).contains(&l) => l as u64,
                _ => {
                    return Err(AppError::Validation(format!(
                        "limit must be a number between 1 and {}",
                        MAX_LIMIT
                    )))
                }
            },
        };

        // OFFSET 必须能用 u64 表示
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::Validation("page is out of range".to_string()));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// 分页元数据，全部由总数推导，不落库
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.limit);
        Self {
            current_page: request.page,
            total_pages,
            total_items,
            items_per_page: request.limit,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        assert_eq!(PageRequest::parse(None, None).unwrap(), PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(PageRequest::parse(Some("0"), None).is_err());
        assert!(PageRequest::parse(None, Some("0")).is_err());
        assert!(PageRequest::parse(None, Some("101")).is_err());
        assert!(PageRequest::parse(Some("abc"), None).is_err());
        assert!(PageRequest::parse(None, Some("100")).is_ok());
    }

    #[test]
    fn huge_page_is_rejected_instead_of_overflowing() {
        let err = PageRequest::parse(Some("1000000000000000000"), Some("100")).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let request = PageRequest::parse(Some("1000000000000000000"), Some("1")).unwrap();
        assert_eq!(request.offset(), 999_999_999_999_999_999);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let request = PageRequest::parse(Some("3"), Some("20")).unwrap();
        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn total_pages_rounds_up() {
        let meta = Pagination::new(PageRequest { page: 2, limit: 10 }, 21);

        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);
    }

    #[test]
    fn last_page_has_no_next() {
        let meta = Pagination::new(PageRequest { page: 3, limit: 10 }, 30);

        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next_page);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let meta = Pagination::new(PageRequest::default(), 0);

        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }
}
