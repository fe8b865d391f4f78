use super::merge;
use crate::models::{EntityId, Inquiry};

/// Inquiries sent during this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryState {
    /// In creation order.
    pub inquiries: Vec<Inquiry>,
}

impl InquiryState {
    /// Append a sent inquiry.
    pub fn apply_created(&mut self, inquiry: Inquiry) {
        merge::append(&mut self.inquiries, inquiry);
    }

    /// Inquiries sent for one product.
    pub fn for_product(&self, product_id: EntityId) -> impl Iterator<Item = &Inquiry> {
        self.inquiries
            .iter()
            .filter(move |inquiry| inquiry.product_id == product_id)
    }
}
