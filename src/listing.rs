use crate::api::{CatalogApi, ProductSearch};
use crate::error::CatalogError;
use std::collections::BTreeMap;
use std::sync::Arc;
use storefront_types::category::Category;
use storefront_types::filter::{ActiveFilters, TransportValue};
use storefront_types::listing::{PaginationCursor, ProductListing};
use storefront_types::Locale;

/// One product request, keyed by everything that triggers a recomputation.
#[derive(Clone, Debug, PartialEq)]
pub enum ProductQuery {
    Category {
        category_path: String,
        page: u32,
        page_size: u32,
    },
    Search {
        category_id: String,
        page: u32,
        page_size: u32,
        attrs: BTreeMap<String, TransportValue>,
    },
}

impl ProductQuery {
    /// `None` for non-leaf categories: they list no products and issue no request.
    pub fn plan(
        category: &Category,
        cursor: &PaginationCursor,
        filters: &ActiveFilters,
    ) -> Option<Self> {
        if !category.is_leaf {
            return None;
        }
        // Filtered search is scoped by id; without one only the path listing applies.
        if filters.is_empty() || !category.accepts_filters() {
            Some(Self::Category {
                category_path: category.path.clone(),
                page: cursor.current_page,
                page_size: cursor.page_size,
            })
        } else {
            Some(Self::Search {
                category_id: category.id.clone(),
                page: cursor.current_page,
                page_size: cursor.page_size,
                attrs: filters.serialize_for_transport(),
            })
        }
    }

    pub fn cursor(&self) -> PaginationCursor {
        match self {
            Self::Category {
                page, page_size, ..
            }
            | Self::Search {
                page, page_size, ..
            } => PaginationCursor {
                current_page: *page,
                page_size: *page_size,
            },
        }
    }
}

#[derive(Clone)]
pub struct ProductQueryPipeline {
    api: Arc<dyn CatalogApi>,
    locale: Locale,
}

impl ProductQueryPipeline {
    pub fn new(api: Arc<dyn CatalogApi>, locale: Locale) -> Self {
        Self { api, locale }
    }

    pub async fn execute(&self, query: ProductQuery) -> Result<ProductListing, CatalogError> {
        let cursor = query.cursor();
        let page = match query {
            ProductQuery::Category {
                category_path,
                page,
                page_size,
            } => {
                self.api
                    .products_by_category(&category_path, page, page_size)
                    .await
            }
            ProductQuery::Search {
                category_id,
                page,
                page_size,
                attrs,
            } => {
                let search = ProductSearch {
                    category: Some(category_id),
                    page,
                    limit: page_size,
                    attrs,
                    ..Default::default()
                };
                self.api.search_products(&search).await
            }
        }
        .map_err(CatalogError::ListingFailure)?;
        Ok(ProductListing::from_page(page, &cursor, &self.locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockCatalogApi;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use storefront_types::category::ResolvedCategoryDto;
    use storefront_types::filter::RangeBound;

    fn category(is_leaf: bool) -> Category {
        let resolved: ResolvedCategoryDto = serde_json::from_value(json!({
            "category": {"_id": "10", "name": "Phones", "slug": "phones"},
            "isLeaf": is_leaf
        }))
        .unwrap();
        Category::from_resolved("electronics/phones", resolved)
    }

    fn api() -> Arc<MockCatalogApi> {
        let mut api = MockCatalogApi::default();
        api.categories.insert(
            "electronics/phones".to_string(),
            serde_json::from_value(json!({
                "category": {"_id": "10", "name": "Phones", "slug": "phones"},
                "isLeaf": true
            }))
            .unwrap(),
        );
        api.products.insert(
            "electronics/phones".to_string(),
            (0..45)
                .map(|i| {
                    serde_json::from_value(json!({
                        "_id": format!("p{i}"),
                        "name": format!("Phone {i}"),
                        "price": 100 + i
                    }))
                    .unwrap()
                })
                .collect(),
        );
        Arc::new(api)
    }

    #[test]
    fn non_leaf_plans_nothing() {
        let mut filters = ActiveFilters::new();
        filters.set_single("brand", "acme");
        assert_eq!(
            ProductQuery::plan(&category(false), &PaginationCursor::default(), &filters),
            None
        );
    }

    #[test]
    fn plain_listing_without_filters() {
        let query = ProductQuery::plan(
            &category(true),
            &PaginationCursor::default(),
            &ActiveFilters::new(),
        );
        assert_eq!(
            query,
            Some(ProductQuery::Category {
                category_path: "electronics/phones".to_string(),
                page: 1,
                page_size: 20,
            })
        );
    }

    #[test]
    fn search_with_filters() {
        let mut filters = ActiveFilters::new();
        filters.set_range("price", RangeBound::Max, "500");
        let query =
            ProductQuery::plan(&category(true), &PaginationCursor::default(), &filters);
        assert!(matches!(
            query,
            Some(ProductQuery::Search { ref category_id, ref attrs, .. })
                if category_id == "10" && attrs.contains_key("price")
        ));
    }

    #[test]
    fn blank_id_falls_back_to_category_listing() {
        let resolved: ResolvedCategoryDto = serde_json::from_value(json!({
            "category": {"_id": " ", "name": "Phones", "slug": "phones"},
            "isLeaf": true
        }))
        .unwrap();
        let category = Category::from_resolved("electronics/phones", resolved);
        let mut filters = ActiveFilters::new();
        filters.set_single("brand", "acme");
        let query = ProductQuery::plan(&category, &PaginationCursor::default(), &filters);
        assert!(matches!(
            query,
            Some(ProductQuery::Category { ref category_path, .. })
                if category_path == "electronics/phones"
        ));
    }

    #[actix_rt::test]
    async fn last_page_holds_remainder() {
        let api = api();
        let pipeline = ProductQueryPipeline::new(api.clone(), Locale::default());
        let listing = pipeline
            .execute(ProductQuery::Category {
                category_path: "electronics/phones".to_string(),
                page: 3,
                page_size: 20,
            })
            .await
            .unwrap();
        assert_eq!(listing.products.len(), 5);
        assert_eq!(listing.total, 45);
        assert_eq!(listing.total_pages, 3);
        assert_eq!(listing.page, 3);
        assert_eq!(listing.products[0].title, "Phone 40");
        assert_eq!(api.listing_calls.load(Ordering::SeqCst), 1);
    }

    #[actix_rt::test]
    async fn search_passes_transport_attrs() {
        let api = api();
        let pipeline = ProductQueryPipeline::new(api.clone(), Locale::default());
        let mut filters = ActiveFilters::new();
        filters.set_multi("color", "red", true);
        filters.set_multi("color", "blue", true);
        let query = ProductQuery::plan(&category(true), &PaginationCursor::default(), &filters)
            .unwrap();
        let listing = pipeline.execute(query).await.unwrap();
        assert_eq!(listing.products.len(), 20);
        let searches = api.searches.lock().unwrap();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].category.as_deref(), Some("10"));
        assert_eq!(
            searches[0].attrs.get("color"),
            Some(&TransportValue::Text("red,blue".to_string()))
        );
    }

    #[actix_rt::test]
    async fn failure_is_listing_failure() {
        let api = MockCatalogApi {
            failing_products: true,
            ..Default::default()
        };
        let pipeline = ProductQueryPipeline::new(Arc::new(api), Locale::default());
        let res = pipeline
            .execute(ProductQuery::Category {
                category_path: "electronics/phones".to_string(),
                page: 1,
                page_size: 20,
            })
            .await;
        assert!(matches!(res, Err(CatalogError::ListingFailure(_))));
    }
}
