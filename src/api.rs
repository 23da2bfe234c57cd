use async_trait::async_trait;
use derive_more::{Display, Error};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use storefront_types::attribute::CategoryAttributeDto;
use storefront_types::category::{CategoryDto, ResolvedCategoryDto};
use storefront_types::filter::{to_query_pairs, TransportValue};
use storefront_types::listing::ProductPage;
use storefront_types::Locale;
use url::Url;

static DEFAULT_ACCEPT_ENCODING: &str = "br;q=1.0, gzip;q=0.6, deflate;q=0.4, *;q=0.2";

#[derive(Debug, Display, Error)]
pub enum ApiError {
    #[display("Network error: {_0}")]
    Network(reqwest::Error),
    #[error(ignore)]
    #[display("Middleware error: {_0}")]
    Middleware(anyhow::Error),
    #[error(ignore)]
    #[display("Not found: {url}")]
    NotFound { url: String },
    #[error(ignore)]
    #[display("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error(ignore)]
    #[display("Backend rejected request with status {status}")]
    Rejected { status: String },
    #[display("Unable to decode response: {_0}")]
    Decode(serde_json::Error),
    #[display("Invalid url: {_0}")]
    InvalidUrl(url::ParseError),
    #[display("Unable to encode query: {_0}")]
    Query(serde_urlencoded::ser::Error),
    #[display("Base url cannot carry path segments")]
    BaseUrl,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err)
    }
}

impl From<reqwest_middleware::Error> for ApiError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Middleware(err) => ApiError::Middleware(err),
            reqwest_middleware::Error::Reqwest(err) => ApiError::Network(err),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err)
    }
}

impl From<serde_urlencoded::ser::Error> for ApiError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        ApiError::Query(err)
    }
}

/// Parameters of `GET /products`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: u32,
    pub limit: u32,
    pub sort: Option<String>,
    pub in_stock: Option<bool>,
    pub attrs: BTreeMap<String, TransportValue>,
}

impl ProductSearch {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![];
        let mut push = |k: &str, v: Option<String>| {
            if let Some(v) = v.filter(|v| !v.is_empty()) {
                pairs.push((k.to_string(), v));
            }
        };
        push("search", self.search.clone());
        push("category", self.category.clone());
        push("minPrice", self.min_price.map(|p| p.to_string()));
        push("maxPrice", self.max_price.map(|p| p.to_string()));
        push("page", Some(self.page.max(1).to_string()));
        push("limit", Some(self.limit.max(1).to_string()));
        push("sort", self.sort.clone());
        push("inStock", self.in_stock.map(|s| s.to_string()));
        pairs.extend(to_query_pairs(&self.attrs));
        pairs
    }

    pub fn query_string(&self) -> Result<String, ApiError> {
        Ok(serde_urlencoded::to_string(self.query_pairs())?)
    }
}

/// REST backend consumed by the catalog pipeline.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn root_categories(&self) -> Result<Vec<CategoryDto>, ApiError>;
    async fn category_by_path(&self, path: &str) -> Result<ResolvedCategoryDto, ApiError>;
    async fn category_filters(
        &self,
        category_id: &str,
    ) -> Result<Vec<CategoryAttributeDto>, ApiError>;
    async fn products_by_category(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, ApiError>;
    async fn search_products(&self, search: &ProductSearch) -> Result<ProductPage, ApiError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<serde_json::Value>,
    data: T,
}

#[derive(Deserialize)]
struct RootCategories {
    #[serde(default)]
    categories: Vec<CategoryDto>,
}

#[derive(Deserialize)]
struct CategoryFilters {
    #[serde(default)]
    filters: Vec<CategoryAttributeDto>,
}

fn status_ok(status: &serde_json::Value) -> bool {
    match status {
        serde_json::Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "error" | "fail" | "failed" | "failure"
        ),
        serde_json::Value::Number(n) => n.as_u64().is_some_and(|n| n < 400),
        serde_json::Value::Bool(b) => *b,
        _ => true,
    }
}

/// Unwraps the `{status, data}` envelope.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    match envelope.status {
        Some(status) if !status_ok(&status) => Err(ApiError::Rejected {
            status: status.to_string(),
        }),
        _ => Ok(envelope.data),
    }
}

#[derive(Clone)]
pub struct HttpCatalogApi {
    client: ClientWithMiddleware,
    base: Url,
}

impl HttpCatalogApi {
    pub fn new(base: Url, locale: &Locale) -> Result<Self, anyhow::Error> {
        let mut map = HeaderMap::new();
        map.append(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_str(DEFAULT_ACCEPT_ENCODING)?,
        );
        map.append(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        map.append(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(locale.as_str())?,
        );
        let client = reqwest::Client::builder()
            .default_headers(map)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;
        Ok(Self::with_client(ClientBuilder::new(client).build(), base))
    }

    pub fn with_client(client: ClientWithMiddleware, base: Url) -> Self {
        Self { client, base }
    }

    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, ApiError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn category_url(&self, path: &str) -> Result<Url, ApiError> {
        self.endpoint(["categories", "path"].into_iter().chain(path.split('/')))
    }

    fn products_by_category_url(&self, path: &str, page: u32, limit: u32) -> Result<Url, ApiError> {
        let mut url =
            self.endpoint(["products", "category"].into_iter().chain(path.split('/')))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    fn search_url(&self, search: &ProductSearch) -> Result<Url, ApiError> {
        let mut url = self.endpoint(["products"])?;
        url.set_query(Some(&search.query_string()?));
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        log::debug!("GET {url}");
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.bytes().await?;
        decode_envelope(&body)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn root_categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
        let url = self.endpoint(["categories", "root"])?;
        let data: RootCategories = self.get(url).await?;
        Ok(data.categories)
    }

    async fn category_by_path(&self, path: &str) -> Result<ResolvedCategoryDto, ApiError> {
        let url = self.category_url(path)?;
        self.get(url).await
    }

    async fn category_filters(
        &self,
        category_id: &str,
    ) -> Result<Vec<CategoryAttributeDto>, ApiError> {
        let url = self.endpoint(["category-attributes", category_id, "filters"])?;
        let data: CategoryFilters = self.get(url).await?;
        Ok(data.filters)
    }

    async fn products_by_category(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, ApiError> {
        let url = self.products_by_category_url(path, page, limit)?;
        self.get(url).await
    }

    async fn search_products(&self, search: &ProductSearch) -> Result<ProductPage, ApiError> {
        let url = self.search_url(search)?;
        self.get(url).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use storefront_types::listing::Pagination;
    use storefront_types::product::Product;
    use tokio::sync::Notify;

    /// In-memory backend with call counters and response gates.
    #[derive(Default)]
    pub struct MockCatalogApi {
        pub roots: Vec<CategoryDto>,
        pub categories: HashMap<String, ResolvedCategoryDto>,
        pub filters: HashMap<String, Vec<CategoryAttributeDto>>,
        pub failing_filters: bool,
        pub failing_products: bool,
        pub products: HashMap<String, Vec<Product>>,
        pub category_gates: Mutex<HashMap<String, Arc<Notify>>>,
        pub filter_gates: Mutex<HashMap<String, Arc<Notify>>>,
        pub page_gates: Mutex<HashMap<u32, Arc<Notify>>>,
        pub resolve_calls: AtomicUsize,
        pub filter_calls: AtomicUsize,
        pub listing_calls: AtomicUsize,
        pub search_calls: AtomicUsize,
        pub searches: Mutex<Vec<ProductSearch>>,
    }

    impl MockCatalogApi {
        pub fn gate_page(&self, page: u32) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            if let Ok(mut gates) = self.page_gates.lock() {
                gates.insert(page, notify.clone());
            }
            notify
        }

        pub fn gate_category(&self, path: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            if let Ok(mut gates) = self.category_gates.lock() {
                gates.insert(path.to_string(), notify.clone());
            }
            notify
        }

        pub fn gate_filters(&self, category_id: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            if let Ok(mut gates) = self.filter_gates.lock() {
                gates.insert(category_id.to_string(), notify.clone());
            }
            notify
        }

        pub fn product_calls(&self) -> usize {
            self.listing_calls.load(Ordering::SeqCst) + self.search_calls.load(Ordering::SeqCst)
        }

        async fn wait_page(&self, page: u32) {
            let gate = self
                .page_gates
                .lock()
                .ok()
                .and_then(|g| g.get(&page).cloned());
            if let Some(gate) = gate {
                gate.notified().await;
            }
        }

        fn page_of(&self, path: &str, page: u32, limit: u32) -> ProductPage {
            let all = self.products.get(path).cloned().unwrap_or_default();
            let limit = limit.max(1);
            let start = ((page.max(1) - 1) * limit) as usize;
            let total = all.len() as u64;
            ProductPage {
                products: all.into_iter().skip(start).take(limit as usize).collect(),
                pagination: Pagination {
                    total,
                    page: Some(page),
                    pages: Some(total.div_ceil(u64::from(limit)) as u32),
                    limit: Some(limit),
                },
            }
        }

        fn path_of_id(&self, id: &str) -> Option<String> {
            self.categories
                .iter()
                .find(|(_, c)| c.category.id == id)
                .map(|(path, _)| path.clone())
        }
    }

    #[async_trait]
    impl CatalogApi for MockCatalogApi {
        async fn root_categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
            Ok(self.roots.clone())
        }

        async fn category_by_path(&self, path: &str) -> Result<ResolvedCategoryDto, ApiError> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self
                .category_gates
                .lock()
                .ok()
                .and_then(|g| g.get(path).cloned());
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.categories
                .get(path)
                .cloned()
                .ok_or_else(|| ApiError::NotFound {
                    url: format!("/categories/path/{path}"),
                })
        }

        async fn category_filters(
            &self,
            category_id: &str,
        ) -> Result<Vec<CategoryAttributeDto>, ApiError> {
            self.filter_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self
                .filter_gates
                .lock()
                .ok()
                .and_then(|g| g.get(category_id).cloned());
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.failing_filters {
                return Err(ApiError::Status {
                    status: 500,
                    url: format!("/category-attributes/{category_id}/filters"),
                });
            }
            Ok(self.filters.get(category_id).cloned().unwrap_or_default())
        }

        async fn products_by_category(
            &self,
            path: &str,
            page: u32,
            limit: u32,
        ) -> Result<ProductPage, ApiError> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_page(page).await;
            if self.failing_products {
                return Err(ApiError::Status {
                    status: 502,
                    url: format!("/products/category/{path}"),
                });
            }
            Ok(self.page_of(path, page, limit))
        }

        async fn search_products(&self, search: &ProductSearch) -> Result<ProductPage, ApiError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut searches) = self.searches.lock() {
                searches.push(search.clone());
            }
            self.wait_page(search.page).await;
            if self.failing_products {
                return Err(ApiError::Status {
                    status: 502,
                    url: "/products".to_string(),
                });
            }
            let path = search
                .category
                .as_deref()
                .and_then(|id| self.path_of_id(id))
                .unwrap_or_default();
            Ok(self.page_of(&path, search.page, search.limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use storefront_types::filter::RangeFilter;

    fn api(base: &str) -> HttpCatalogApi {
        HttpCatalogApi::with_client(
            ClientBuilder::new(reqwest::Client::new()).build(),
            base.parse().unwrap(),
        )
    }

    #[test]
    fn decodes_envelope() {
        let categories: RootCategories = decode_envelope(
            br#"{"status": "success", "data": {"categories": [{"_id": "1", "name": "Books", "slug": "books"}]}}"#,
        )
        .unwrap();
        assert_eq!(categories.categories.len(), 1);
        assert_eq!(categories.categories[0].id, "1");
    }

    #[test]
    fn rejects_error_envelope() {
        let res: Result<RootCategories, _> =
            decode_envelope(br#"{"status": "error", "data": {"categories": []}}"#);
        assert!(matches!(res, Err(ApiError::Rejected { .. })));
        let res: Result<RootCategories, _> =
            decode_envelope(br#"{"status": 404, "data": {"categories": []}}"#);
        assert!(matches!(res, Err(ApiError::Rejected { .. })));
        let res: Result<RootCategories, _> = decode_envelope(br#"{"status": "success"}"#);
        assert!(matches!(res, Err(ApiError::Decode(_))));
    }

    #[test]
    fn builds_endpoints() {
        let api = api("http://localhost:3000/api/");
        assert_eq!(
            api.endpoint(["categories", "root"]).unwrap().as_str(),
            "http://localhost:3000/api/categories/root"
        );
        assert_eq!(
            api.category_url("electronics/phones").unwrap().as_str(),
            "http://localhost:3000/api/categories/path/electronics/phones"
        );
        assert_eq!(
            api.products_by_category_url("electronics/phones", 3, 20)
                .unwrap()
                .as_str(),
            "http://localhost:3000/api/products/category/electronics/phones?page=3&limit=20"
        );
        assert_eq!(
            api.endpoint(["category-attributes", "c 1", "filters"])
                .unwrap()
                .as_str(),
            "http://localhost:3000/api/category-attributes/c%201/filters"
        );
    }

    #[test]
    fn non_hierarchical_base_is_rejected() {
        let api = api("mailto:shop@example.com");
        assert!(matches!(api.endpoint(["products"]), Err(ApiError::BaseUrl)));
    }

    #[test]
    fn encodes_search_query() {
        let mut attrs = BTreeMap::new();
        attrs.insert("color".to_string(), TransportValue::Text("red,blue".into()));
        attrs.insert(
            "ram".to_string(),
            TransportValue::Range(RangeFilter {
                min: Some(4.0),
                max: None,
            }),
        );
        let search = ProductSearch {
            category: Some("10".into()),
            min_price: Some(dec!(9.99)),
            page: 2,
            limit: 20,
            in_stock: Some(true),
            attrs,
            ..Default::default()
        };
        assert_eq!(
            search.query_string().unwrap(),
            "category=10&minPrice=9.99&page=2&limit=20&inStock=true\
             &attrs%5Bcolor%5D=red%2Cblue&attrs%5Bram%5D%5Bmin%5D=4"
        );
        let url = api("http://localhost:3000/api").search_url(&search).unwrap();
        assert!(url.as_str().starts_with("http://localhost:3000/api/products?category=10"));
    }
}
