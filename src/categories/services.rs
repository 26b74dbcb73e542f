use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::CategoryInput,
    repo_types::{Category, CategoryPatch, NewCategory},
};
use crate::{
    auth::token::AuthUser,
    error::ServiceError,
    pagination::ListParams,
    state::AppState,
    store::{Paginated, Record, RecordStore},
    validation::required_text,
};

const ENTITY: &str = Category::KIND;

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn RecordStore<Category>>,
}

impl FromRef<AppState> for CategoryService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.categories.clone())
    }
}

impl CategoryService {
    pub fn new(store: Arc<dyn RecordStore<Category>>) -> Self {
        Self { store }
    }

    /// Creates a category owned by `owner`; name and colour are required.
    #[instrument(skip(self, owner, input), fields(user_id = %owner.id))]
    pub async fn create(
        &self,
        owner: &AuthUser,
        input: CategoryInput,
    ) -> Result<Category, ServiceError> {
        let name = required_text(input.name);
        let color_hex = required_text(input.color_hex);
        let (Some(name), Some(color_hex)) = (name, color_hex) else {
            return Err(ServiceError::validation(ENTITY, "Please fill in all required fields."));
        };
        let category = self
            .store
            .create(NewCategory { name, color_hex, user_id: owner.id })
            .await
            .map_err(ServiceError::store(ENTITY, "create"))?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Category, ServiceError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(ServiceError::store(ENTITY, "load"))?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })
    }

    pub async fn list(&self, params: ListParams) -> Result<Paginated<Category>, ServiceError> {
        self.store
            .paginate(params.into_page_request())
            .await
            .map_err(ServiceError::store(ENTITY, "list"))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Category, ServiceError> {
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
        info!(category_id = %id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    fn service() -> CategoryService {
        CategoryService::new(Arc::new(MemoryRecordStore::<Category>::new()))
    }

    fn owner() -> AuthUser {
        AuthUser { id: Uuid::new_v4(), email: "owner@b.com".into() }
    }

    fn input(name: Option<&str>, color: Option<&str>) -> CategoryInput {
        CategoryInput {
            name: name.map(String::from),
            color_hex: color.map(String::from),
        }
    }

    #[tokio::test]
    async fn create_tags_owner_from_identity() {
        let svc = service();
        let owner = owner();
        let category = svc.create(&owner, input(Some("Tools"), Some("#fff"))).await.unwrap();
        assert_eq!(category.user_id, owner.id);
        assert_eq!(category.name, "Tools");
    }

    #[tokio::test]
    async fn create_requires_name_and_color() {
        let svc = service();
        for bad in [input(None, Some("#fff")), input(Some("Tools"), None), input(Some(" "), Some("#fff"))] {
            let err = svc.create(&owner(), bad).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation { entity: "Category", .. }));
        }
    }

    #[tokio::test]
    async fn missing_ids_become_not_found() {
        let svc = service();
        let id = Uuid::new_v4();
        assert!(matches!(svc.get_by_id(id).await, Err(ServiceError::NotFound { .. })));
        assert!(matches!(
            svc.update(id, CategoryPatch::default()).await,
            Err(ServiceError::NotFound { .. })
        ));
        let err = svc.delete(id).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Category with ID {id} not found"));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filters_by_name() {
        let svc = service();
        let owner = owner();
        let first = svc.create(&owner, input(Some("Tools"), Some("#fff"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = svc.create(&owner, input(Some("Garden"), Some("#0f0"))).await.unwrap();

        let page = svc.list(ListParams::default()).await.unwrap();
        let ids: Vec<_> = page.data.iter().map(|c| c.id).collect();
        assert_eq!(ids, [second.id, first.id]);

        let page = svc
            .list(ListParams { name: Some("Tools".into()), ..ListParams::default() })
            .await
            .unwrap();
        assert_eq!(page.pagination.total_items, 1);
        assert_eq!(page.data[0].id, first.id);
    }

    #[tokio::test]
    async fn update_and_delete_existing() {
        let svc = service();
        let created = svc.create(&owner(), input(Some("Tools"), Some("#fff"))).await.unwrap();
        let patch = CategoryPatch { color_hex: Some("#000".into()), ..CategoryPatch::default() };
        let updated = svc.update(created.id, patch).await.unwrap();
        assert_eq!(updated.color_hex, "#000");
        assert_eq!(updated.name, "Tools");
        svc.delete(created.id).await.unwrap();
        assert!(svc.get_by_id(created.id).await.is_err());
    }
}
