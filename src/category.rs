use crate::api::CatalogApi;
use crate::error::CatalogError;
use std::sync::Arc;
use storefront_types::category::Category;
use storefront_types::normalize_path;

#[derive(Clone)]
pub struct CategoryResolver {
    api: Arc<dyn CatalogApi>,
}

impl CategoryResolver {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    /// Maps a slash-delimited path to its category. The empty path yields the
    /// synthetic root whose children are the top-level categories.
    pub async fn resolve(&self, path: &str) -> Result<Category, CatalogError> {
        let path = normalize_path(path);
        if path.is_empty() {
            return match self.api.root_categories().await {
                Ok(children) => Ok(Category::root(children)),
                Err(err) => {
                    log::error!("Unable to load root categories: {err}");
                    Err(CatalogError::NotFound { path })
                }
            };
        }
        match self.api.category_by_path(&path).await {
            Ok(resolved) => Ok(Category::from_resolved(&path, resolved)),
            Err(err) if err.is_not_found() => {
                log::warn!("Category {path:?} not found");
                Err(CatalogError::NotFound { path })
            }
            Err(err) => {
                log::error!("Unable to resolve category {path:?}: {err}");
                Err(CatalogError::NotFound { path })
            }
        }
    }
}
