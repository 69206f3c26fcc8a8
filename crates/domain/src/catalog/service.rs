//! Catalog service for categories and products.

use store::{CatalogStore, CategoryId, PageRequest, ProductChanges, ProductId, StoreError};

use crate::error::DomainError;
use crate::validation::Validate;
use crate::views::{CategoryView, Paginated, ProductView};

use super::{CatalogError, CategoryRequest, ProductRequest, StockRequest};

/// Result of replacing a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub product: ProductView,
    /// The image reference that was replaced and may now be removed.
    pub replaced_image: Option<String>,
}

/// Service for managing categories and products.
#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn create_category(
        &self,
        request: CategoryRequest,
    ) -> Result<CategoryView, DomainError> {
        let request = request.validated()?;
        let category = self
            .store
            .create_category(&request.name)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => CatalogError::DuplicateCategory(request.name.clone()).into(),
                other => DomainError::from(other),
            })?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(CategoryView::from(&category))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_categories(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<CategoryView>, DomainError> {
        let categories = self.store.list_categories(page).await?;
        Ok(Paginated::from_page(&categories, page))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_category(&self, id: CategoryId) -> Result<CategoryView, DomainError> {
        let category = self
            .store
            .get_category(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;
        Ok(CategoryView::from(&category))
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        request: CategoryRequest,
    ) -> Result<CategoryView, DomainError> {
        let request = request.validated()?;
        let category = self
            .store
            .update_category(id, &request.name)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => CatalogError::CategoryNotFound(id).into(),
                StoreError::Conflict(_) => CatalogError::DuplicateCategory(request.name.clone()).into(),
                other => DomainError::from(other),
            })?;
        Ok(CategoryView::from(&category))
    }

    /// Deletes a category together with all of its products. Returns the
    /// image references of the deleted products.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<Vec<String>, DomainError> {
        let images = self.store.delete_category(id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => CatalogError::CategoryNotFound(id).into(),
            other => DomainError::from(other),
        })?;

        tracing::info!(category_id = %id, images = images.len(), "category deleted");
        Ok(images)
    }

    #[tracing::instrument(skip(self, request, image_url))]
    pub async fn create_product(
        &self,
        request: ProductRequest,
        image_url: String,
    ) -> Result<ProductView, DomainError> {
        let request = request.validated()?;
        let category_id = request.category_id();
        self.require_category(category_id).await?;

        let product = self
            .store
            .create_product(request.into_new_product(image_url))
            .await
            .map_err(|e| product_write_error(e, category_id))?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(ProductView::from(&product))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<ProductView>, DomainError> {
        let products = self.store.list_products(page).await?;
        Ok(Paginated::from_page(&products, page))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductView, DomainError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;
        Ok(ProductView::from(&product))
    }

    /// Replaces every field of a product. Without a new image the old one is kept.
    #[tracing::instrument(skip(self, request, image_url))]
    pub async fn update_product(
        &self,
        id: ProductId,
        request: ProductRequest,
        image_url: Option<String>,
    ) -> Result<ProductUpdate, DomainError> {
        let request = request.validated()?;
        let existing = self
            .store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;
        let category_id = request.category_id();
        self.require_category(category_id).await?;

        let replaced_image = match &image_url {
            Some(new) if !existing.image_url.is_empty() && *new != existing.image_url => {
                Some(existing.image_url.clone())
            }
            _ => None,
        };

        let product = self
            .store
            .update_product(id, request.into_changes(image_url))
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => CatalogError::ProductNotFound(id).into(),
                other => product_write_error(other, category_id),
            })?;

        tracing::info!(product_id = %id, "product updated");
        Ok(ProductUpdate {
            product: ProductView::from(&product),
            replaced_image,
        })
    }

    /// Sets the stock level outside of order placement.
    #[tracing::instrument(skip(self, request))]
    pub async fn set_stock(
        &self,
        id: ProductId,
        request: StockRequest,
    ) -> Result<ProductView, DomainError> {
        let request = request.validated()?;
        let stock = request.stock.unwrap_or_default() as i32;

        let product = self
            .store
            .update_product(id, ProductChanges::stock(stock))
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => CatalogError::ProductNotFound(id).into(),
                StoreError::ConstraintViolation(reason) => CatalogError::UpdateFailed(reason).into(),
                other => DomainError::from(other),
            })?;

        tracing::info!(product_id = %id, stock, "stock corrected");
        Ok(ProductView::from(&product))
    }

    /// Deletes a product and returns it so its image can be removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<ProductView, DomainError> {
        let product = self.store.delete_product(id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => CatalogError::ProductNotFound(id).into(),
            other => DomainError::from(other),
        })?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(ProductView::from(&product))
    }

    async fn require_category(&self, id: CategoryId) -> Result<(), DomainError> {
        match self.store.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::CategoryNotFound(id).into()),
        }
    }
}

fn product_write_error(err: StoreError, category_id: CategoryId) -> DomainError {
    match err {
        // The category vanished between the check and the write.
        StoreError::InvalidReference(_) => CatalogError::CategoryNotFound(category_id).into(),
        StoreError::ConstraintViolation(reason) => CatalogError::UpdateFailed(reason).into(),
        other => other.into(),
    }
}
