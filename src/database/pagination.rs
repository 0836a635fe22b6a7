use serde::{Deserialize, Serialize};

/// One page of a listing. `next` and `previous` are 1-based page numbers.
#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

/// Resolved `page` / `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_size: i64, max_size: i64) -> Self {
        let page_size = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(default_size)
            .min(max_size);

        Self {
            page: page.filter(|page| *page > 0).unwrap_or(1),
            page_size,
        }
    }

    /// Saturates for absurd page numbers, which then simply read past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if total_rows <= 0 {
            return Self::no_rows();
        }

        let page_count = (total_rows + request.page_size - 1) / request.page_size;
        let next = (request.page < page_count).then_some(request.page + 1);
        let previous = (request.page > 1).then(|| (request.page - 1).min(page_count));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
