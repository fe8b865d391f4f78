use super::merge;
use crate::models::{EntityId, Storehouse};

/// Storehouses visible to the signed-in owner, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorehouseState {
    /// Result of the last list or search, plus locally created entries.
    pub storehouses: Vec<Storehouse>,
}

impl StorehouseState {
    /// Replace the collection with a list or search response.
    pub fn replace(&mut self, storehouses: Vec<Storehouse>) {
        merge::replace_all(&mut self.storehouses, storehouses);
    }

    /// Append a newly created storehouse.
    pub fn apply_created(&mut self, storehouse: Storehouse) {
        merge::append(&mut self.storehouses, storehouse);
    }

    /// Look a storehouse up by id.
    pub fn find(&self, id: EntityId) -> Option<&Storehouse> {
        self.storehouses.iter().find(|storehouse| storehouse.id == id)
    }
}
