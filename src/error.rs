use crate::api::ApiError;
use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum CatalogError {
    #[error(ignore)]
    #[display("Category {path:?} not found")]
    NotFound { path: String },
    #[display("Unable to load filters: {_0}")]
    SchemaLoadFailure(ApiError),
    #[display("Unable to load products: {_0}")]
    ListingFailure(ApiError),
    #[error(ignore)]
    #[display("Page {page} is outside 1..={total_pages}")]
    ValidationRejected { page: u32, total_pages: u32 },
}
