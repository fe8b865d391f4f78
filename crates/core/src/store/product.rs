use tracing::{debug, warn};

use super::merge::{self, MergeOutcome};
use crate::models::{EntityId, Product};

/// Product collections.
///
/// `products` holds the products of one storehouse (the scope of the last
/// fetch-by-parent); `all_products` is the cross-cutting list fed by
/// fetch-all and search. Every product entering either list has its
/// `available_quantity` re-derived from the stock counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductState {
    /// Products of the storehouse in [`scope`](Self::scope).
    pub products: Vec<Product>,
    /// Storehouse the `products` list belongs to.
    pub scope: Option<EntityId>,
    /// Every product from the last list-all or search.
    pub all_products: Vec<Product>,
}

impl ProductState {
    /// Replace the scoped list with the products of `storehouse_id`.
    pub fn replace_scoped(&mut self, storehouse_id: EntityId, products: Vec<Product>) {
        self.scope = Some(storehouse_id);
        merge::replace_all(&mut self.products, normalized(products));
    }

    /// Replace the cross-cutting list (list-all or search).
    pub fn replace_all(&mut self, products: Vec<Product>) {
        merge::replace_all(&mut self.all_products, normalized(products));
    }

    /// Append a created product to both lists.
    ///
    /// The scoped list only takes it when it belongs to the scoped storehouse.
    pub fn apply_created(&mut self, product: Product) {
        let product = normalize(product);
        match self.scope {
            Some(scope) if scope != product.storehouse_id => {
                debug!(
                    product_id = product.id,
                    scope, "created product belongs to another storehouse"
                );
            }
            _ => merge::append(&mut self.products, product.clone()),
        }
        merge::append(&mut self.all_products, product);
    }

    /// Replace the product in place in every list that holds it.
    pub fn apply_updated(&mut self, product: Product) -> MergeOutcome {
        let product = normalize(product);
        let id = product.id;
        let outcome = merge::update_in_place(&mut self.products, product.clone())
            .or(merge::update_in_place(&mut self.all_products, product));
        if outcome == MergeOutcome::Missing {
            warn!(product_id = id, "update for unknown product ignored");
        }
        outcome
    }

    /// Remove the product from every list.
    pub fn apply_deleted(&mut self, id: EntityId) -> MergeOutcome {
        let outcome = merge::remove_by_id(&mut self.products, id)
            .or(merge::remove_by_id(&mut self.all_products, id));
        if outcome == MergeOutcome::Missing {
            warn!(product_id = id, "delete for unknown product");
        }
        outcome
    }

    /// Look a product up in either list.
    pub fn find(&self, id: EntityId) -> Option<&Product> {
        self.products
            .iter()
            .chain(self.all_products.iter())
            .find(|product| product.id == id)
    }
}

fn normalize(mut product: Product) -> Product {
    if product.normalize() {
        warn!(
            product_id = product.id,
            available = product.available_quantity,
            "server available_quantity disagreed with stock counters"
        );
    }
    product
}

fn normalized(products: Vec<Product>) -> Vec<Product> {
    products.into_iter().map(normalize).collect()
}
