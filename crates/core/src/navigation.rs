//! Seam to the external router.

/// Landing view.
pub const HOME: &str = "/";
/// Login view; target for unauthenticated access.
pub const LOGIN: &str = "/login";
/// Shown when the signed-in role may not open a view.
pub const UNAUTHORIZED: &str = "/unauthorized";

/// External navigator the core asks to change views.
pub trait Navigator: Send + Sync {
    /// Go to `path`.
    fn navigate(&self, path: &str);
}

/// Path of a product's detail view.
pub fn product_path(product_id: i64) -> String {
    format!("/product/{product_id}")
}

/// Path of a storehouse's product list.
pub fn storehouse_products_path(storehouse_id: i64) -> String {
    format!("/storehouse/{storehouse_id}/products")
}
