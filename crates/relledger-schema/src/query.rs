//! Listing filters.

use crate::platform::normalize_all;

/// Filters and pagination for a ledger listing.
///
/// All supplied filters are AND-combined; `os` and `arch` are OR-combined
/// within themselves. An empty list means "no constraint on this dimension".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    /// Rows per page; `0` returns every matching row
    pub page_size: u32,
    /// Exact product match
    pub product: Option<String>,
    /// Exact version match
    pub version: Option<String>,
    /// Accepted operating systems
    pub os: Vec<String>,
    /// Accepted architectures
    pub arch: Vec<String>,
    /// Exact commit match
    pub commit: Option<String>,
    /// Only rows whose `tested` flag is unset
    pub exclude_tested: bool,
    /// Only rows whose `published` flag is unset
    pub exclude_published: bool,
    /// Only rows whose `packed` flag is unset
    pub exclude_packed: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 0,
            product: None,
            version: None,
            os: Vec::new(),
            arch: Vec::new(),
            commit: None,
            exclude_tested: false,
            exclude_published: false,
            exclude_packed: false,
        }
    }
}

impl ListQuery {
    /// Build a query from raw `key=value` pairs, as decoded from a URL query string.
    ///
    /// - `page` and `size` are read from their leading digits, so `2abc` is 2.
    /// - `page` falls back to 1 when absent, zero, or not a number.
    /// - `size` falls back to 0 (unpaginated) when absent or not a number.
    /// - `os` and `arch` may repeat; every value is normalized.
    /// - `notest`, `nopub`, `nopack` are enabled only by the literal `true`.
    /// - Empty values are treated as absent.
    /// - Unknown keys are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use relledger_schema::ListQuery;
    ///
    /// let query = ListQuery::from_pairs([("page", "2"), ("size", "3"), ("os", "MacOS")]);
    /// assert_eq!(query.window(), Some((3, 3)));
    /// assert_eq!(query.os, vec!["apple"]);
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();

        for (key, value) in pairs {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "page" => query.page = leading_number(value).filter(|p| *p > 0).unwrap_or(1),
                "size" => query.page_size = leading_number(value).unwrap_or(0),
                "product" => query.product = Some(value.to_string()),
                "version" => query.version = Some(value.to_string()),
                "commit" => query.commit = Some(value.to_string()),
                "os" => query.os.push(value.to_string()),
                "arch" => query.arch.push(value.to_string()),
                "notest" => query.exclude_tested = value == "true",
                "nopub" => query.exclude_published = value == "true",
                "nopack" => query.exclude_packed = value == "true",
                _ => {}
            }
        }

        query.normalized()
    }

    /// Fold `os` and `arch` filters to their canonical spelling.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.os = normalize_all(&self.os);
        self.arch = normalize_all(&self.arch);
        self
    }

    /// `(limit, offset)` for this page, or `None` when the listing is unpaginated.
    ///
    /// Both fit SQLite's signed 64-bit `LIMIT`/`OFFSET`. An offset past
    /// `i64::MAX` is clamped there, which still selects nothing.
    pub fn window(&self) -> Option<(i64, i64)> {
        if self.page_size == 0 {
            return None;
        }
        let size = i64::from(self.page_size);
        let offset = i64::from(self.page.max(1) - 1)
            .checked_mul(size)
            .unwrap_or(i64::MAX);
        Some((size, offset))
    }
}

/// Digits at the start of `value` after leading whitespace, if any.
fn leading_number(value: &str) -> Option<u32> {
    let value = value.trim_start();
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}
