use serde::Serialize;

use crate::comments::domain::Comment;
use crate::config::CommentsConfig;

/// A 1-based page of top-level comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page and limit must be positive integers")]
pub struct InvalidPage;

impl PageRequest {
    /// Parse raw query values. Missing values take the defaults, zero is
    /// raised to one and `limit` is capped at the configured maximum.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        limits: &CommentsConfig,
    ) -> Result<Self, InvalidPage> {
        let page = parse_number(page)?.unwrap_or(1).max(1);
        let limit = parse_number(limit)?
            .unwrap_or(limits.default_page_size)
            .clamp(1, limits.max_page_size.max(1));
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }

    pub fn has_more(&self, total: u64) -> bool {
        total > u64::from(self.page) * u64::from(self.limit)
    }
}

fn parse_number(raw: Option<&str>) -> Result<Option<u32>, InvalidPage> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<u32>().map(Some).map_err(|_| InvalidPage),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}
