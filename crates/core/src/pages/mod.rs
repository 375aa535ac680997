//! Page generators: fetch from the catalog, map, render.

use crate::{catalog::CatalogError, mapper::MapError};

pub mod detail;
pub mod listing;

pub use detail::{DetailPage, generate_detail};
pub use listing::{ListingPage, generate_listing};

/// Why a page could not be generated
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Product {0} not found")]
    NotFound(String),

    #[error("Catalog request failed: {0}")]
    Catalog(#[source] CatalogError),

    #[error("Failed to build view model: {0}")]
    Map(#[from] MapError),

    /// The generation task ended without reporting a result
    #[error("Page generation was interrupted")]
    Interrupted,
}

impl From<CatalogError> for GenerateError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(id) => GenerateError::NotFound(id),
            other => GenerateError::Catalog(other),
        }
    }
}
