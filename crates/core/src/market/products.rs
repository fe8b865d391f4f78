use super::Marketplace;
use crate::{
    dispatch::Command,
    error::CommandError,
    models::{EntityId, NewProduct, Product, ProductPatch, Role},
    store::CommandKind,
};

impl Marketplace {
    /// Load the products of one storehouse into the scoped list.
    pub async fn fetch_products_by_storehouse(
        &self,
        storehouse_id: EntityId,
    ) -> Result<Vec<Product>, CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.products,
                Command::for_role(CommandKind::FetchByParent, Role::Owner),
                |session| async move { api.list_storehouse_products(&session, storehouse_id).await },
                |state, products| state.replace_scoped(storehouse_id, products.clone()),
            )
            .await
    }

    /// Load every listed product into the cross-cutting list.
    pub async fn fetch_all_products(&self) -> Result<Vec<Product>, CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.products,
                Command::for_role(CommandKind::FetchAll, Role::Buyer),
                |session| async move { api.list_all_products(&session).await },
                |state, products| state.replace_all(products.clone()),
            )
            .await
    }

    /// Add a product to one of the owner's storehouses.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.products,
                Command::for_role(CommandKind::Create, Role::Owner),
                |session| async move {
                    check_stock(product.total_quantity, product.quantity_sold)?;
                    api.create_product(&session, &product).await
                },
                |state, created| state.apply_created(created.clone()),
            )
            .await
    }

    /// Apply a partial update to a product.
    pub async fn update_product(
        &self,
        product_id: EntityId,
        patch: ProductPatch,
    ) -> Result<Product, CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.products,
                Command::for_role(CommandKind::Update, Role::Owner),
                |session| async move {
                    if patch.is_empty() {
                        return Err(CommandError::InvalidRequest(
                            "Nothing to update".to_string(),
                        ));
                    }
                    api.update_product(&session, product_id, &patch).await
                },
                |state, updated| {
                    state.apply_updated(updated.clone());
                },
            )
            .await
    }

    /// Delete a product; it disappears from every list.
    pub async fn delete_product(&self, product_id: EntityId) -> Result<(), CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.products,
                Command::for_role(CommandKind::Delete, Role::Owner),
                |session| async move { api.delete_product(&session, product_id).await },
                |state, _| {
                    state.apply_deleted(product_id);
                },
            )
            .await
    }

    /// Search products by text; replaces the cross-cutting list.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, CommandError> {
        let api = self.api.clone();
        let query = query.trim().to_string();
        self.dispatcher
            .dispatch(
                &self.products,
                Command::any(CommandKind::Search),
                |session| async move { api.search_products(&session, &query).await },
                |state, found| state.replace_all(found.clone()),
            )
            .await
    }
}

fn check_stock(total: i64, sold: i64) -> Result<(), CommandError> {
    if total < 0 || sold < 0 {
        return Err(CommandError::InvalidRequest(
            "Quantities cannot be negative".to_string(),
        ));
    }
    if sold > total {
        return Err(CommandError::InvalidRequest(
            "Quantity sold cannot exceed total quantity".to_string(),
        ));
    }
    Ok(())
}
