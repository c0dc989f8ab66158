use serde::{Deserialize, Serialize};

/// `?page=&page_size=` query parameters, both optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// A resolved, clamped page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Page numbers start at 1; `page_size` is clamped to `1..=max_page_size`.
    pub fn resolve(query: PageQuery, default_page_size: u32, max_page_size: u32) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            page: query.page.unwrap_or(1).max(1),
            page_size: query
                .page_size
                .unwrap_or(default_page_size)
                .clamp(1, max_page_size),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, count: i64, results: Vec<T>) -> Self {
        let seen = request.offset() + results.len() as i64;
        Self {
            count,
            next: request.page.checked_add(1).filter(|_| seen < count),
            previous: request.page.checked_sub(1).filter(|&page| page > 0),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        let request = PageRequest::resolve(PageQuery::default(), 10, 100);
        assert_eq!(request, PageRequest { page: 1, page_size: 10 });
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn clamps_page_size_and_page() {
        let query = PageQuery { page: Some(0), page_size: Some(500) };
        let request = PageRequest::resolve(query, 10, 100);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 100);

        let query = PageQuery { page: Some(3), page_size: Some(0) };
        let request = PageRequest::resolve(query, 10, 100);
        assert_eq!(request.page_size, 1);
        assert_eq!(request.offset(), 2);
    }

    #[test]
    fn page_links() {
        let request = PageRequest { page: 2, page_size: 10 };
        let page = Page::new(request, 25, vec![0; 10]);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::new(PageRequest { page: 3, page_size: 10 }, 25, vec![0; 5]);
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));
    }

    #[test]
    fn last_possible_page_has_no_next() {
        let request = PageRequest { page: u32::MAX, page_size: 10 };
        let page = Page::new(request, 5, Vec::<i64>::new());
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(u32::MAX - 1));

        let query = PageQuery { page: Some(u32::MAX), page_size: None };
        let resolved = PageRequest::resolve(query, 10, 100);
        assert_eq!(resolved.offset(), i64::from(u32::MAX - 1) * 10);
    }

    #[test]
    fn unresolved_page_zero_does_not_underflow() {
        let request = PageRequest { page: 0, page_size: 10 };
        assert_eq!(request.offset(), 0);
        let page = Page::new(request, 0, Vec::<i64>::new());
        assert_eq!((page.next, page.previous), (None, None));
    }
}
