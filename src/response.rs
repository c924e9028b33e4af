/// Response envelopes and pagination
///
/// Every successful body is wrapped as `{success, message, data}`; list
/// endpoints add the paging totals.

use serde::{Deserialize, Serialize};

use crate::auth::AuthResult;

pub const DEFAULT_PAGE_NUMBER: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: Vec::new(),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            data: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub total_count: i64,
    pub page_number: i64,
    pub page_size: i64,
}

impl<T: Serialize> ApiListResponse<T> {
    pub fn page(message: impl Into<String>, data: Vec<T>, total_count: i64, page: Pagination) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            total_count,
            page_number: page.page_number,
            page_size: page.page_size,
        }
    }
}

/// Login and refresh body: the envelope with the tokens inlined
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub result: AuthResult,
}

impl AuthResponse {
    pub fn new(message: impl Into<String>, result: AuthResult) -> Self {
        Self {
            success: true,
            message: message.into(),
            result,
        }
    }
}

/// Raw `?pageNumber=&pageSize=` query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

/// Normalized paging window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_number: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Saturates instead of overflowing; a page far past the end is simply empty
    pub fn offset(&self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        let page_number = query
            .page_number
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_PAGE_NUMBER);
        let page_size = query
            .page_size
            .map(|s| s.clamp(1, MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Self {
            page_number,
            page_size,
        }
    }
}
