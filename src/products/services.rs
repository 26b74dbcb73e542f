use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::ProductInput,
    repo_types::{NewProduct, Product, ProductPatch},
};
use crate::{
    auth::token::AuthUser,
    error::ServiceError,
    pagination::ListParams,
    state::AppState,
    store::{Paginated, Record, RecordStore},
    validation::required_text,
};

const ENTITY: &str = Product::KIND;

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn RecordStore<Product>>,
}

impl FromRef<AppState> for ProductService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.products.clone())
    }
}

impl ProductService {
    pub fn new(store: Arc<dyn RecordStore<Product>>) -> Self {
        Self { store }
    }

    /// Name, price and category are required; the owner comes from the session.
    #[instrument(skip(self, owner, input), fields(user_id = %owner.id))]
    pub async fn create(&self, owner: &AuthUser, input: ProductInput) -> Result<Product, ServiceError> {
        let name = required_text(input.name);
        let (Some(name), Some(price), Some(category_id)) = (name, input.price, input.category_id)
        else {
            return Err(ServiceError::validation(ENTITY, "Please fill in all required fields."));
        };
        let product = self
            .store
            .create(NewProduct {
                name,
                description: input.description,
                price,
                user_id: owner.id,
                category_id,
            })
            .await
            .map_err(ServiceError::store(ENTITY, "create"))?;
        info!(product_id = %product.id, %category_id, "product created");
        Ok(product)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(ServiceError::store(ENTITY, "load"))?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })
    }

    pub async fn list(&self, params: ListParams) -> Result<Paginated<Product>, ServiceError> {
        self.store
            .paginate(params.into_page_request())
            .await
            .map_err(ServiceError::store(ENTITY, "list"))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Product, ServiceError> {
        self.store
            .update(id, patch)
            .await
            .map_err(ServiceError::store(ENTITY, "update"))?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let deleted = self
            .store
            .delete(id)
            .await
            .map_err(ServiceError::store(ENTITY, "delete"))?;
        if !deleted {
            return Err(ServiceError::NotFound { entity: ENTITY, id });
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::MemoryRecordStore;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryRecordStore::<Product>::new()))
    }

    fn owner() -> AuthUser {
        AuthUser { id: Uuid::new_v4(), email: "owner@b.com".into() }
    }

    fn hammer() -> ProductInput {
        ProductInput {
            name: Some("Hammer".into()),
            description: Some("Claw hammer".into()),
            price: Some(Decimal::new(1999, 2)),
            category_id: Some(Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn create_keeps_exact_price_and_owner() {
        let svc = service();
        let owner = owner();
        let product = svc.create(&owner, hammer()).await.unwrap();
        assert_eq!(product.user_id, owner.id);
        assert_eq!(product.price, Decimal::new(1999, 2));
        assert_eq!(product.price.to_string(), "19.99");
    }

    #[tokio::test]
    async fn create_requires_name_price_and_category() {
        let svc = service();
        let missing = [
            ProductInput { name: None, ..hammer() },
            ProductInput { price: None, ..hammer() },
            ProductInput { category_id: None, ..hammer() },
        ];
        for input in missing {
            let err = svc.create(&owner(), input).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation { entity: "Product", .. }));
            assert!(err.to_string().starts_with("Failed to create Product"));
        }
    }

    #[tokio::test]
    async fn zero_price_is_present() {
        let svc = service();
        let input = ProductInput { price: Some(Decimal::ZERO), ..hammer() };
        assert!(svc.create(&owner(), input).await.is_ok());
    }

    #[tokio::test]
    async fn missing_ids_become_not_found() {
        let svc = service();
        let id = Uuid::new_v4();
        let err = svc.update(id, ProductPatch::default()).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Product with ID {id} not found"));
        assert!(matches!(svc.delete(id).await, Err(ServiceError::NotFound { .. })));
        assert!(matches!(svc.get_by_id(id).await, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn update_merges_partial_fields() {
        let svc = service();
        let created = svc.create(&owner(), hammer()).await.unwrap();
        let patch = ProductPatch { price: Some(Decimal::new(2450, 2)), ..ProductPatch::default() };
        let updated = svc.update(created.id, patch).await.unwrap();
        assert_eq!(updated.price, Decimal::new(2450, 2));
        assert_eq!(updated.name, "Hammer");
        assert_eq!(updated.description.as_deref(), Some("Claw hammer"));
    }
}
