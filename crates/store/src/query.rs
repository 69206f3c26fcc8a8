/// Page selection for list queries.
///
/// `page` is 1-based. Missing, unparsable, or non-positive values fall back
/// to the defaults instead of failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Creates a page request; zero values are replaced by the defaults.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: if page == 0 { Self::DEFAULT_PAGE } else { page },
            limit: if limit == 0 { Self::DEFAULT_LIMIT } else { limit },
        }
    }

    /// Parses raw `page` / `limit` query parameters.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        fn positive(raw: Option<&str>) -> u32 {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v > 0)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        }

        Self::new(positive(page), positive(limit))
    }

    /// Returns the 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE, Self::DEFAULT_LIMIT)
    }
}

/// One page of rows plus the total row count across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    /// Maps every row of the page, keeping the total.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
