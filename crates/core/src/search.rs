//! Cross-domain search.
//!
//! Buyers search products only. Owners search products and their own
//! storehouses at the same time; both branches are awaited and a failed
//! branch simply contributes nothing. Products always come first.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::SearchError,
    market::Marketplace,
    models::{EntityId, Product, Role, Storehouse},
    navigation,
};

/// One tagged hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResult {
    /// Hit from the product search.
    Product(Product),
    /// Hit from the storehouse search.
    Storehouse(Storehouse),
}

impl SearchResult {
    /// Id of the underlying entity.
    pub fn id(&self) -> EntityId {
        match self {
            SearchResult::Product(product) => product.id,
            SearchResult::Storehouse(storehouse) => storehouse.id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            SearchResult::Product(product) => &product.name,
            SearchResult::Storehouse(storehouse) => &storehouse.name,
        }
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        match self {
            SearchResult::Product(product) => product.description.as_deref(),
            SearchResult::Storehouse(storehouse) => storehouse.description.as_deref(),
        }
    }

    /// View a front-end should open for this hit.
    pub fn route(&self) -> String {
        match self {
            SearchResult::Product(product) => navigation::product_path(product.id),
            SearchResult::Storehouse(storehouse) => {
                navigation::storehouse_products_path(storehouse.id)
            }
        }
    }
}

/// Results of one search; an empty list is a valid answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Trimmed query that was run.
    pub query: String,
    /// Products first, then storehouses, each in server order.
    pub results: Vec<SearchResult>,
}

impl SearchOutcome {
    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Fans a query out to the domain searches allowed for a role.
#[derive(Clone)]
pub struct SearchAggregator {
    market: Marketplace,
}

impl SearchAggregator {
    /// Aggregator running searches through `market`.
    pub fn new(market: Marketplace) -> Self {
        Self { market }
    }

    /// Search as the signed-in role.
    pub async fn search_current(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let role = self
            .market
            .current_session()
            .map(|session| session.role())
            .ok_or(SearchError::Unauthenticated)?;
        self.search(query, role).await
    }

    /// Search as `role`, which must be the signed-in role.
    ///
    /// A blank query is refused with [`SearchError::EmptyQuery`] before any
    /// request; callers go back to their default view instead.
    pub async fn search(&self, query: &str, role: Role) -> Result<SearchOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let actual = self
            .market
            .current_session()
            .map(|session| session.role())
            .ok_or(SearchError::Unauthenticated)?;
        if actual != role {
            return Err(SearchError::WrongRole {
                requested: role,
                actual,
            });
        }

        let results = match role {
            Role::Buyer => products_branch(self.market.search_products(query).await),
            Role::Owner => {
                let (products, storehouses) = tokio::join!(
                    self.market.search_products(query),
                    self.market.search_storehouses(query)
                );
                let mut results = products_branch(products);
                results.extend(storehouses_branch(storehouses));
                results
            }
        };

        debug!(%role, query, hits = results.len(), "search finished");
        Ok(SearchOutcome {
            query: query.to_string(),
            results,
        })
    }
}

fn products_branch<E: std::fmt::Display>(outcome: Result<Vec<Product>, E>) -> Vec<SearchResult> {
    match outcome {
        Ok(products) => products.into_iter().map(SearchResult::Product).collect(),
        Err(err) => {
            warn!(error = %err, "product search failed; contributing no results");
            Vec::new()
        }
    }
}

fn storehouses_branch<E: std::fmt::Display>(
    outcome: Result<Vec<Storehouse>, E>,
) -> Vec<SearchResult> {
    match outcome {
        Ok(storehouses) => storehouses.into_iter().map(SearchResult::Storehouse).collect(),
        Err(err) => {
            warn!(error = %err, "storehouse search failed; contributing no results");
            Vec::new()
        }
    }
}
