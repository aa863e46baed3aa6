//! Page-number pagination with `{count, next, previous, results}` bodies.
use crate::web::error::AppError;
use axum::http::Uri;
use serde::{Deserialize, Serialize};

pub const CLIENTS_PAGE_SIZE: i64 = 10;
pub const QUESTIONNAIRES_PAGE_SIZE: i64 = 10;
pub const MONTHLY_FEEDBACK_PAGE_SIZE: i64 = 10;
pub const RESPONSES_PAGE_SIZE: i64 = 1;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(i64),
    Last,
}

/// A page request before the total count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: PageNumber,
    pub size: i64,
}

impl PageRequest {
    /// Parses `?page=` (missing means 1, `last` means the final page); anything
    /// else that is not a positive integer is an invalid page.
    pub fn parse(query: &PageQuery, size: i64) -> Result<Self, AppError> {
        let number = match query.page.as_deref().map(str::trim) {
            None | Some("") => PageNumber::Number(1),
            Some("last") => PageNumber::Last,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .map(PageNumber::Number)
                .ok_or(AppError::InvalidPage)?,
        };
        Ok(Self { number, size })
    }

    /// Rejects pages past the end. An empty set still has page 1.
    pub fn resolve(self, count: i64) -> Result<PageWindow, AppError> {
        let pages = ((count + self.size - 1) / self.size).max(1);
        let number = match self.number {
            PageNumber::Last => pages,
            PageNumber::Number(n) if n <= pages => n,
            PageNumber::Number(_) => return Err(AppError::InvalidPage),
        };
        Ok(PageWindow { number, size: self.size })
    }
}

/// A resolved page: 1-based number within the result set, plus the SQL window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub size: i64,
}

impl PageWindow {
    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }

    pub fn into_page<T>(self, uri: &Uri, count: i64, results: Vec<T>) -> Page<T> {
        let has_next = self.number * self.size < count;
        Page {
            count,
            next: has_next.then(|| page_link(uri, Some(self.number + 1))),
            previous: (self.number > 1).then(|| {
                // page 1 is linked without the parameter
                page_link(uri, (self.number > 2).then_some(self.number - 1))
            }),
            results,
        }
    }
}

/// Rebuilds the request path with `page` replaced, keeping other parameters.
fn page_link(uri: &Uri, page: Option<i64>) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page=") && *p != "page")
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        params.push(format!("page={page}"));
    }
    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}
