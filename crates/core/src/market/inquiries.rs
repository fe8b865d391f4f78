use super::Marketplace;
use crate::{
    dispatch::Command,
    error::CommandError,
    models::{Inquiry, NewInquiry, Role},
    store::{CommandKind, ProductState},
};

impl Marketplace {
    /// Send an inquiry for a product.
    ///
    /// The quantity must be at least one and, when the product is loaded,
    /// no more than its `available_quantity`; otherwise nothing is sent.
    pub async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, CommandError> {
        let api = self.api.clone();
        let products = self.products.clone();
        self.dispatcher
            .dispatch(
                &self.inquiries,
                Command::for_role(CommandKind::Create, Role::Buyer),
                |session| async move {
                    products.read(|state| check_quantity(state, &inquiry))?;
                    api.create_inquiry(&session, &inquiry).await
                },
                |state, sent| state.apply_created(sent.clone()),
            )
            .await
    }
}

fn check_quantity(products: &ProductState, inquiry: &NewInquiry) -> Result<(), CommandError> {
    if inquiry.quantity < 1 {
        return Err(CommandError::InvalidRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    match products.find(inquiry.product_id) {
        Some(product) if inquiry.quantity > product.available_quantity => {
            Err(CommandError::InvalidRequest(format!(
                "Only {} units of {} are available",
                product.available_quantity, product.name
            )))
        }
        _ => Ok(()),
    }
}
