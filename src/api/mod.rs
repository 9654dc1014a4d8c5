//! Category Repository Client.
//!
//! [`CategoryRepository`] is the contract the rest of the crate talks to;
//! [`HttpCategoryRepository`] implements it over the REST boundary:
//!
//! - `GET    /categories`       → ordered collection
//! - `GET    /categories/{id}`  → single record
//! - `POST   /categories`       → multipart create, returns the record
//! - `PUT    /categories/{id}`  → multipart update, returns the record
//! - `DELETE /categories/{id}`  → acknowledgement
//!
//! Every call is fallible. A failed `list_all` means "no change", never
//! "empty collection".

mod client;
mod types;

use async_trait::async_trait;

pub use client::{ClientOptions, HttpCategoryRepository};
pub use types::{
    CategoryId, CategoryPayload, CategoryRecord, FieldUpdate, ImageUpload, PayloadPart,
    TransportError,
};

/// Fetch/create/update/delete contract for category storage.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories, in storage order.
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, TransportError>;

    /// A single category by id.
    async fn get(&self, id: &CategoryId) -> Result<CategoryRecord, TransportError>;

    async fn create(&self, payload: &CategoryPayload) -> Result<CategoryRecord, TransportError>;

    async fn update(
        &self,
        id: &CategoryId,
        payload: &CategoryPayload,
    ) -> Result<CategoryRecord, TransportError>;

    async fn delete(&self, id: &CategoryId) -> Result<(), TransportError>;
}
