//! Local pagination over list-shaped results. Upstream lists are fetched in
//! full and sliced here; nothing is paginated server-side.

use serde::Serialize;

/// One contiguous page of a collection.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Length of the full (filtered) collection, not of this page.
    pub total: usize,
    pub count: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

pub fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Page<T> {
    let total = items.len();
    let items: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    let count = items.len();
    let has_more = total > offset + count;
    Page {
        items,
        total,
        count,
        has_more,
        next_offset: has_more.then_some(offset + count),
    }
}
