use crate::api::CatalogApi;
use crate::error::CatalogError;
use log_error::LogError;
use std::sync::Arc;
use storefront_types::attribute::{prepare_schema, CategoryAttribute};
use storefront_types::category::Category;

#[derive(Clone)]
pub struct AttributeSchemaLoader {
    api: Arc<dyn CatalogApi>,
}

impl AttributeSchemaLoader {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    pub async fn try_load_filters(
        &self,
        category_id: &str,
    ) -> Result<Vec<CategoryAttribute>, CatalogError> {
        let raw = self
            .api
            .category_filters(category_id)
            .await
            .map_err(CatalogError::SchemaLoadFailure)?;
        Ok(prepare_schema(raw))
    }

    /// Filter schema of a leaf category. Non-leaf categories and failed loads
    /// yield no filters.
    pub async fn load_filters(&self, category: &Category) -> Vec<CategoryAttribute> {
        if !category.accepts_filters() {
            return vec![];
        }
        self.try_load_filters(&category.id)
            .await
            .log_error(&format!("Filters of category {:?} unavailable", category.path))
            .unwrap_or_default()
    }
}
