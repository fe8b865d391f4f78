//! Fixtures shared by the unit tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use serde_json::{json, Value};

use crate::{
    api::{ApiRequest, ApiResponse, Backend, Method, TransportError},
    models::{EntityId, Identity, Product, Role},
    session::{AuthSession, SessionStore},
};

enum Scripted {
    Respond(ApiResponse),
    Fail(String),
}

/// In-memory [`Backend`] answering from a route table and recording every request.
///
/// Routes without a script answer `404 {"detail": "Not Found"}`.
#[derive(Default)]
pub(crate) struct FakeBackend {
    routes: Mutex<HashMap<(String, String), Scripted>>,
    gates: Mutex<HashMap<(String, String), Arc<Notify>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        let response = ApiResponse {
            status,
            body: Some(body),
        };
        self.routes
            .lock()
            .insert(route(method, path), Scripted::Respond(response));
    }

    pub(crate) fn fail(&self, method: Method, path: &str, message: &str) {
        self.routes
            .lock()
            .insert(route(method, path), Scripted::Fail(message.to_string()));
    }

    /// Hold requests to a route until the returned gate is notified.
    ///
    /// The answer is read after release, so it may be rescripted meanwhile.
    pub(crate) fn hold(&self, method: Method, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(route(method, path), gate.clone());
        gate
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

fn route(method: Method, path: &str) -> (String, String) {
    (method.to_string(), path.to_string())
}

#[async_trait]
impl Backend for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let key = route(request.method, &request.path);
        self.requests.lock().push(request);
        let gate = self.gates.lock().remove(&key);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.routes.lock().get(&key) {
            Some(Scripted::Respond(response)) => Ok(response.clone()),
            Some(Scripted::Fail(message)) => Err(TransportError(message.clone())),
            None => Ok(ApiResponse {
                status: 404,
                body: Some(json!({"detail": "Not Found"})),
            }),
        }
    }
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
        .single()
        .unwrap_or_default()
}

fn identity(id: EntityId, role: Role) -> Identity {
    Identity {
        id,
        email: format!("{}{id}@farm.test", role.as_str()),
        role,
        created_at: fixed_time(),
    }
}

pub(crate) fn owner_identity() -> Identity {
    identity(1, Role::Owner)
}

pub(crate) fn owner_session() -> AuthSession {
    AuthSession::new(owner_identity(), "owner-token")
}

pub(crate) fn buyer_session() -> AuthSession {
    AuthSession::new(identity(2, Role::Buyer), "buyer-token")
}

/// Put a session straight into `store`, as if a login had just succeeded.
pub(crate) fn seed_session(store: &SessionStore, role: Role) {
    let session = match role {
        Role::Owner => owner_session(),
        Role::Buyer => buyer_session(),
    };
    store.seed(session);
}

/// A consistent product of storehouse 1: 100 in stock, 40 sold.
pub(crate) fn product(id: EntityId, name: &str) -> Product {
    Product {
        id,
        name: name.to_string(),
        description: None,
        total_quantity: 100,
        quantity_sold: 40,
        price_per_unit: 2.5,
        revenue: 100.0,
        storehouse_id: 1,
        owner_id: 1,
        created_at: fixed_time(),
        updated_at: fixed_time(),
        available_quantity: 60,
        owner: None,
        storehouse: None,
    }
}

pub(crate) fn product_json(id: EntityId, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "total_quantity": 100,
        "quantity_sold": 40,
        "price_per_unit": 2.5,
        "revenue": 100.0,
        "storehouse_id": 1,
        "owner_id": 1,
        "created_at": "2024-03-01T09:30:00",
        "updated_at": "2024-03-01T09:30:00",
        "available_quantity": 60
    })
}

pub(crate) fn storehouse_json(id: EntityId, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "location": "Nashik",
        "owner_id": 1,
        "created_at": "2024-03-01T09:30:00"
    })
}

pub(crate) fn login_json(id: EntityId, role: &str, token: &str) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "user": {
            "id": id,
            "email": format!("{role}{id}@farm.test"),
            "role": role,
            "created_at": "2024-03-01T09:30:00"
        }
    })
}
