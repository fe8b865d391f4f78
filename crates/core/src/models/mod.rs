#![allow(missing_docs)]

//! Shared domain models mirrored from the marketplace API.

pub mod timestamp;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier shared by every entity.
pub type EntityId = i64;

/// Anything stored in a domain collection and addressed by id.
pub trait Entity {
    /// Server-assigned identifier.
    fn id(&self) -> EntityId;
}

/// The two account kinds of the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Runs storehouses and lists products.
    Owner,
    /// Browses products and sends inquiries.
    Buyer,
}

impl Role {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Buyer => "buyer",
        }
    }

    /// Path segment of the role's auth endpoints (`/owners/...`, `/buyers/...`).
    pub fn collection(self) -> &'static str {
        match self {
            Role::Owner => "owners",
            Role::Buyer => "buyers",
        }
    }

    /// Capitalised label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Buyer => "Buyer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "buyer" => Ok(Role::Buyer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Authenticated account as returned by login and signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: EntityId,
    pub email: String,
    pub role: Role,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Email/password pair supplied by the form collaborator.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A storage site owned by exactly one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storehouse {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub owner_id: EntityId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Storehouse {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Body of the create-storehouse call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewStorehouse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A stocked product inside one storehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub total_quantity: i64,
    #[serde(default)]
    pub quantity_sold: i64,
    pub price_per_unit: f64,
    /// Computed by the server; never derived locally.
    #[serde(default)]
    pub revenue: f64,
    pub storehouse_id: EntityId,
    pub owner_id: EntityId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub available_quantity: i64,
    /// Present on list-all and search responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storehouse: Option<Storehouse>,
}

impl Product {
    /// Stock left to sell, never negative.
    pub fn expected_available(&self) -> i64 {
        (self.total_quantity - self.quantity_sold).max(0)
    }

    /// Re-derive `available_quantity` from the stock counters.
    ///
    /// Returns `true` when the received value disagreed and was corrected.
    pub fn normalize(&mut self) -> bool {
        let expected = self.expected_available();
        if self.available_quantity == expected {
            return false;
        }
        self.available_quantity = expected;
        true
    }
}

impl Entity for Product {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Body of the create-product call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub total_quantity: i64,
    pub quantity_sold: i64,
    pub price_per_unit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub storehouse_id: EntityId,
}

/// Partial update; only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_sold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.total_quantity.is_none()
            && self.quantity_sold.is_none()
            && self.price_per_unit.is_none()
            && self.description.is_none()
    }
}

/// A buyer's request for a quantity of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: EntityId,
    pub product_id: EntityId,
    pub buyer_id: EntityId,
    pub message: String,
    pub quantity: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Inquiry {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Body of the create-inquiry call; the product id travels in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewInquiry {
    #[serde(skip)]
    pub product_id: EntityId,
    pub message: String,
    pub quantity: i64,
}
