//! Typed access to the marketplace REST API.
//!
//! [`Backend`] is the transport seam: it moves one [`ApiRequest`] to the
//! server and hands back the raw status and JSON body. [`ApiClient`] sits on
//! top and owns the route table, bearer-token attachment and the mapping of
//! non-2xx answers onto [`CommandError`].

/// `reqwest` implementation of [`Backend`].
pub mod http;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::CommandError,
    models::{
        Credentials, EntityId, Identity, Inquiry, NewInquiry, NewProduct, NewStorehouse, Product,
        ProductPatch, Role, Storehouse,
    },
    session::AuthSession,
};

pub use http::HttpBackend;

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// One outbound call, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Verb.
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`.
    pub path: String,
    /// Query parameters, encoded by the backend.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Bearer token for protected routes.
    pub bearer: Option<String>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    fn json(mut self, body: &impl Serialize) -> Result<Self, CommandError> {
        let value = serde_json::to_value(body)
            .map_err(|err| CommandError::InvalidRequest(format!("unencodable body: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    fn bearer(mut self, session: &AuthSession) -> Self {
        self.bearer = Some(session.token().to_string());
        self
    }
}

/// Raw answer from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body; `None` for an empty body.
    pub body: Option<Value>,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Moves requests to the marketplace server.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Issue exactly one request.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent calls.
    pub access_token: String,
    /// Usually `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// The authenticated account.
    pub user: Identity,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InquiryResponse {
    Full(Inquiry),
    Receipt { inquiry_id: EntityId },
}

/// Route table and response decoding on top of a [`Backend`].
#[derive(Clone)]
pub struct ApiClient {
    backend: Arc<dyn Backend>,
}

impl ApiClient {
    /// Wrap a transport.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// `POST /{owners|buyers}/signup`
    pub async fn signup(&self, role: Role, credentials: &Credentials) -> Result<Identity, CommandError> {
        let request =
            ApiRequest::new(Method::Post, format!("/{}/signup", role.collection())).json(credentials)?;
        self.fetch(request).await
    }

    /// `POST /{owners|buyers}/login`
    pub async fn login(
        &self,
        role: Role,
        credentials: &Credentials,
    ) -> Result<LoginResponse, CommandError> {
        let request =
            ApiRequest::new(Method::Post, format!("/{}/login", role.collection())).json(credentials)?;
        self.fetch(request).await
    }

    /// `GET /owners/{id}/storehouses`
    pub async fn list_storehouses(&self, session: &AuthSession) -> Result<Vec<Storehouse>, CommandError> {
        let path = format!("/owners/{}/storehouses", session.identity().id);
        self.fetch(ApiRequest::new(Method::Get, path).bearer(session)).await
    }

    /// `POST /owners/{id}/storehouses`
    pub async fn create_storehouse(
        &self,
        session: &AuthSession,
        storehouse: &NewStorehouse,
    ) -> Result<Storehouse, CommandError> {
        let path = format!("/owners/{}/storehouses", session.identity().id);
        let request = ApiRequest::new(Method::Post, path).bearer(session).json(storehouse)?;
        self.fetch(request).await
    }

    /// `GET /owners/{id}/storehouses/search?q=`
    pub async fn search_storehouses(
        &self,
        session: &AuthSession,
        query: &str,
    ) -> Result<Vec<Storehouse>, CommandError> {
        let path = format!("/owners/{}/storehouses/search", session.identity().id);
        let request = ApiRequest::new(Method::Get, path).bearer(session).query("q", query);
        self.fetch(request).await
    }

    /// `GET /storehouses/{id}/products`
    pub async fn list_storehouse_products(
        &self,
        session: &AuthSession,
        storehouse_id: EntityId,
    ) -> Result<Vec<Product>, CommandError> {
        let path = format!("/storehouses/{storehouse_id}/products");
        self.fetch(ApiRequest::new(Method::Get, path).bearer(session)).await
    }

    /// `GET /products`
    pub async fn list_all_products(&self, session: &AuthSession) -> Result<Vec<Product>, CommandError> {
        self.fetch(ApiRequest::new(Method::Get, "/products").bearer(session)).await
    }

    /// `POST /storehouses/{id}/products`
    pub async fn create_product(
        &self,
        session: &AuthSession,
        product: &NewProduct,
    ) -> Result<Product, CommandError> {
        let path = format!("/storehouses/{}/products", product.storehouse_id);
        let request = ApiRequest::new(Method::Post, path).bearer(session).json(product)?;
        self.fetch(request).await
    }

    /// `PUT /products/{id}`
    pub async fn update_product(
        &self,
        session: &AuthSession,
        product_id: EntityId,
        patch: &ProductPatch,
    ) -> Result<Product, CommandError> {
        let path = format!("/products/{product_id}");
        let request = ApiRequest::new(Method::Put, path).bearer(session).json(patch)?;
        self.fetch(request).await
    }

    /// `DELETE /products/{id}`
    pub async fn delete_product(
        &self,
        session: &AuthSession,
        product_id: EntityId,
    ) -> Result<(), CommandError> {
        let path = format!("/products/{product_id}");
        self.execute(ApiRequest::new(Method::Delete, path).bearer(session))
            .await
            .map(|_| ())
    }

    /// `GET /products/search?q=`
    pub async fn search_products(
        &self,
        session: &AuthSession,
        query: &str,
    ) -> Result<Vec<Product>, CommandError> {
        let request = ApiRequest::new(Method::Get, "/products/search")
            .bearer(session)
            .query("q", query);
        self.fetch(request).await
    }

    /// `POST /products/{id}/inquiry`
    ///
    /// The server may answer with the stored inquiry or with a short receipt;
    /// a receipt is expanded from the request and the session identity.
    pub async fn create_inquiry(
        &self,
        session: &AuthSession,
        inquiry: &NewInquiry,
    ) -> Result<Inquiry, CommandError> {
        let path = format!("/products/{}/inquiry", inquiry.product_id);
        let request = ApiRequest::new(Method::Post, path).bearer(session).json(inquiry)?;
        match self.fetch::<InquiryResponse>(request).await? {
            InquiryResponse::Full(stored) => Ok(stored),
            InquiryResponse::Receipt { inquiry_id } => Ok(Inquiry {
                id: inquiry_id,
                product_id: inquiry.product_id,
                buyer_id: session.identity().id,
                message: inquiry.message.clone(),
                quantity: inquiry.quantity,
                created_at: Utc::now(),
            }),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, CommandError> {
        let body = self.execute(request).await?.unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|err| CommandError::MalformedResponse(err.to_string()))
    }

    async fn execute(&self, request: ApiRequest) -> Result<Option<Value>, CommandError> {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "sending request");

        let response = self.backend.send(request).await.map_err(|err| {
            warn!(%method, %path, error = %err, "request failed without a response");
            CommandError::NetworkFailure { detail: err.0 }
        })?;

        if response.is_success() {
            return Ok(response.body);
        }

        let message = rejection_message(response.status, response.body.as_ref());
        debug!(%method, %path, status = response.status, %message, "request rejected");
        Err(CommandError::RemoteRejected {
            status: response.status,
            message,
        })
    }
}

/// Extract the user-facing message from an error body.
///
/// FastAPI reports `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": ...}, ...]}` for validation failures.
fn rejection_message(status: u16, body: Option<&Value>) -> String {
    let detail = body.and_then(|body| body.get("detail"));
    match detail {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                generic_rejection(status)
            } else {
                messages.join("; ")
            }
        }
        _ => generic_rejection(status),
    }
}

fn generic_rejection(status: u16) -> String {
    format!("Request failed with status code {status}")
}
