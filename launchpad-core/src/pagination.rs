use serde::{Deserialize, Serialize};

/// Requested page. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: usize,
    pub limit: usize,
}

impl PaginationParams {
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }

    /// Fills in defaults and clamps into the platform's page bounds.
    pub fn normalize(params: Option<Self>, default_limit: usize, max_limit: usize) -> Self {
        let max_limit = max_limit.max(1);
        match params {
            Some(p) => Self {
                page: p.page.max(1),
                limit: p.limit.clamp(1, max_limit),
            },
            None => Self {
                page: 1,
                limit: default_limit.clamp(1, max_limit),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> PaginatedResponse<T> {
    /// Slices an already ordered result set into the requested page.
    pub fn from_items(items: Vec<T>, params: PaginationParams) -> Self {
        let total = items.len();
        let page = params.page.max(1);
        let limit = params.limit.max(1);
        let offset = (page - 1).saturating_mul(limit);

        let data = items.into_iter().skip(offset).take(limit).collect();

        Self {
            data,
            total,
            page,
            limit,
            has_next: page.saturating_mul(limit) < total,
            has_prev: page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}
