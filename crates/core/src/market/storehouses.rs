use super::Marketplace;
use crate::{
    dispatch::Command,
    error::CommandError,
    models::{NewStorehouse, Role, Storehouse},
    store::CommandKind,
};

impl Marketplace {
    /// Load the signed-in owner's storehouses.
    pub async fn fetch_storehouses(&self) -> Result<Vec<Storehouse>, CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.storehouses,
                Command::for_role(CommandKind::FetchAll, Role::Owner),
                |session| async move { api.list_storehouses(&session).await },
                |state, storehouses| state.replace(storehouses.clone()),
            )
            .await
    }

    /// Create a storehouse for the signed-in owner.
    pub async fn create_storehouse(
        &self,
        storehouse: NewStorehouse,
    ) -> Result<Storehouse, CommandError> {
        let api = self.api.clone();
        self.dispatcher
            .dispatch(
                &self.storehouses,
                Command::for_role(CommandKind::Create, Role::Owner),
                |session| async move {
                    if storehouse.name.trim().is_empty() {
                        return Err(CommandError::InvalidRequest(
                            "Storehouse name is required".to_string(),
                        ));
                    }
                    api.create_storehouse(&session, &storehouse).await
                },
                |state, created| state.apply_created(created.clone()),
            )
            .await
    }

    /// Search the signed-in owner's storehouses; replaces the collection.
    pub async fn search_storehouses(&self, query: &str) -> Result<Vec<Storehouse>, CommandError> {
        let api = self.api.clone();
        let query = query.trim().to_string();
        self.dispatcher
            .dispatch(
                &self.storehouses,
                Command::for_role(CommandKind::Search, Role::Owner),
                |session| async move { api.search_storehouses(&session, &query).await },
                |state, found| state.replace(found.clone()),
            )
            .await
    }
}
