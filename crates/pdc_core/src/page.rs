//! Page windows over list results.
//!
//! Backends apply the window themselves (`LIMIT`/`OFFSET` in Postgres) and
//! report the size of the whole filtered list next to it.

/// Rows `offset..offset + limit` of a filtered, ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Window of the 1-based page `number`.
    pub fn numbered(number: usize, size: usize) -> Self {
        Self {
            offset: number.saturating_sub(1).saturating_mul(size),
            limit: size,
        }
    }
}

/// One window of a list plus the length of the unwindowed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Paged<T> {
    /// Window over a list that is already in memory; `None` keeps all of it.
    pub fn slice(all: Vec<T>, page: Option<Page>) -> Self {
        let count = all.len();
        let items = match page {
            Some(page) => all
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect(),
            None => all,
        };
        Self { count, items }
    }
}
