use crate::product::{Product, ProductCard};
use crate::Locale;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::{
    deserialize_number_from_string, deserialize_option_number_from_string,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination block of both listing endpoints. The category listing reports
/// `pages`, the search reports `totalPages`; both land in `pages`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    pub total: u64,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub page: Option<u32>,
    #[serde(
        default,
        alias = "totalPages",
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub pages: Option<u32>,
    #[serde(
        default,
        alias = "pageSize",
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub limit: Option<u32>,
}

impl Pagination {
    /// Total page count, derived from `total` and the page size when absent.
    pub fn total_pages(&self, page_size: u32) -> u32 {
        match self.pages {
            Some(pages) => pages,
            None => {
                let size = u64::from(self.limit.filter(|l| *l > 0).unwrap_or(page_size).max(1));
                u32::try_from(self.total.div_ceil(size)).unwrap_or(u32::MAX)
            }
        }
    }
}

/// `data` block of the listing endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub products: Vec<ProductCard>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl ProductListing {
    pub fn empty(cursor: &PaginationCursor) -> Self {
        Self {
            products: vec![],
            total: 0,
            page: cursor.current_page,
            page_size: cursor.page_size,
            total_pages: 0,
        }
    }

    pub fn from_page(page: ProductPage, cursor: &PaginationCursor, locale: &Locale) -> Self {
        let ProductPage {
            products,
            pagination,
        } = page;
        Self {
            products: products
                .iter()
                .map(|p| ProductCard::project(p, locale))
                .collect(),
            total: pagination.total,
            page: pagination.page.unwrap_or(cursor.current_page),
            page_size: pagination
                .limit
                .filter(|l| *l > 0)
                .unwrap_or(cursor.page_size),
            total_pages: pagination.total_pages(cursor.page_size),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    pub current_page: u32,
    pub page_size: u32,
}

impl PaginationCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Pages outside `1..=total_pages` are rejected.
    pub fn accepts(&self, page: u32, total_pages: u32) -> bool {
        (1..=total_pages).contains(&page)
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unifies_pagination_shapes() {
        let category: Pagination =
            serde_json::from_value(json!({"total": 45, "page": 3, "pages": 3, "limit": 20}))
                .unwrap();
        let search: Pagination = serde_json::from_value(
            json!({"total": "45", "page": "3", "totalPages": 3, "pageSize": 20}),
        )
        .unwrap();
        assert_eq!(category, search);
        assert_eq!(search.total_pages(20), 3);
    }

    #[test]
    fn derives_missing_page_count() {
        let p: Pagination = serde_json::from_value(json!({"total": 45, "limit": 20})).unwrap();
        assert_eq!(p.total_pages(10), 3);
        let p: Pagination = serde_json::from_value(json!({"total": 45})).unwrap();
        assert_eq!(p.total_pages(10), 5);
        assert_eq!(Pagination::default().total_pages(20), 0);
    }

    #[test]
    fn builds_listing_from_page() {
        let page: ProductPage = serde_json::from_value(json!({
            "products": [{"_id": "p1", "name": "Phone", "price": 10}],
            "pagination": {"total": 1, "pages": 1}
        }))
        .unwrap();
        let cursor = PaginationCursor::new(20);
        let listing = ProductListing::from_page(page, &cursor, &Locale::default());
        assert_eq!(listing.products.len(), 1);
        assert_eq!(listing.page, 1);
        assert_eq!(listing.page_size, 20);
        assert_eq!(listing.total_pages, 1);
    }

    #[test]
    fn cursor_bounds() {
        let cursor = PaginationCursor::new(0);
        assert_eq!(cursor.page_size, 1);
        assert!(cursor.accepts(3, 3));
        assert!(!cursor.accepts(4, 3));
        assert!(!cursor.accepts(0, 3));
        assert!(!cursor.accepts(1, 0));
    }
}
