use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{DeliveryStatus, OrderId, PaymentId, ProductId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        CreatedResponse, ErrorBody, MessageResponse, NewOrder, NewPayment, NewProduct, NewUser,
        Order, OrderUpdate, Payment, PaymentUpdate, Product, ProductUpdate, Resource, User,
        UserUpdate,
    },
};
use thiserror::Error;
use tracing::{debug, warn};

pub mod dashboard;
pub mod dispatch;
pub mod screens;
pub mod session;

pub use dashboard::{load_dashboard, DashboardSnapshot};
pub use dispatch::{DispatchEvent, DispatchHandle, DispatchOutcome, Dispatcher};
pub use session::{AdminCredentials, AdminSession, SessionError, SessionGuard};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid gateway url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("no response from gateway for {resource}: {source}")]
    Transport {
        resource: &'static str,
        source: reqwest::Error,
    },
    #[error("gateway returned {status}: {}", .error.message)]
    Api { status: u16, error: ApiError },
    #[error("malformed gateway response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Api { error, .. } => error.code,
            Self::Transport { .. } => ErrorCode::Unavailable,
            Self::InvalidBaseUrl { .. } | Self::Build(_) | Self::Malformed(_) => {
                ErrorCode::Internal
            }
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.code() == ErrorCode::Conflict
    }

    /// The `error` field the gateway put in its reply, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { error, .. } => Some(error.message.as_str()),
            _ => None,
        }
    }
}

/// HTTP client for the gateway's four resource groups.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|source| ClientError::InvalidBaseUrl {
            url: base_url.clone(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, resource: Resource) -> String {
        format!("{}/{}/", self.base_url, resource.path())
    }

    fn item_url(&self, resource: Resource, id: i64) -> String {
        format!("{}/{}/{id}/", self.base_url, resource.path())
    }

    async fn send(
        &self,
        request: RequestBuilder,
        resource: Resource,
        action: &'static str,
    ) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|source| {
            warn!(resource = resource.path(), action, error = %source, "no response from gateway");
            ClientError::Transport {
                resource: resource.path(),
                source,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(resource = resource.path(), action, status = status.as_u16(), "gateway ok");
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        warn!(
            resource = resource.path(),
            action,
            status = status.as_u16(),
            %message,
            "gateway rejected request"
        );
        Err(ClientError::Api {
            status: status.as_u16(),
            error: ApiError::new(ErrorCode::from_status(status.as_u16()), message),
        })
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        resource: Resource,
    ) -> Result<T, ClientError> {
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                resource: resource.path(),
                source,
            })?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        search: &str,
    ) -> Result<Vec<T>, ClientError> {
        let request = self
            .http
            .get(self.collection_url(resource))
            .query(&[("search", search)]);
        let response = self.send(request, resource, "list").await?;
        Self::read_json(response, resource).await
    }

    async fn create<B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        body: &B,
    ) -> Result<CreatedResponse, ClientError> {
        let request = self.http.post(self.collection_url(resource)).json(body);
        let response = self.send(request, resource, "create").await?;
        Self::read_json(response, resource).await
    }

    async fn update<B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        id: i64,
        body: &B,
    ) -> Result<MessageResponse, ClientError> {
        let request = self.http.put(self.item_url(resource, id)).json(body);
        let response = self.send(request, resource, "update").await?;
        Self::read_message(response, resource).await
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<MessageResponse, ClientError> {
        let request = self.http.delete(self.item_url(resource, id));
        let response = self.send(request, resource, "delete").await?;
        Self::read_message(response, resource).await
    }

    // Update and delete replies are informational; tolerate an empty body.
    async fn read_message(
        response: Response,
        resource: Resource,
    ) -> Result<MessageResponse, ClientError> {
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                resource: resource.path(),
                source,
            })?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(MessageResponse::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn list_users(&self, search: &str) -> Result<Vec<User>, ClientError> {
        self.list(Resource::Users, search).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<CreatedResponse, ClientError> {
        self.create(Resource::Users, user).await
    }

    pub async fn update_user(
        &self,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<MessageResponse, ClientError> {
        self.update(Resource::Users, id.0, update).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<MessageResponse, ClientError> {
        self.delete(Resource::Users, id.0).await
    }

    pub async fn list_products(&self, search: &str) -> Result<Vec<Product>, ClientError> {
        self.list(Resource::Products, search).await
    }

    pub async fn create_product(
        &self,
        product: &NewProduct,
    ) -> Result<CreatedResponse, ClientError> {
        self.create(Resource::Products, product).await
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<MessageResponse, ClientError> {
        self.update(Resource::Products, id.0, update).await
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<MessageResponse, ClientError> {
        self.delete(Resource::Products, id.0).await
    }

    pub async fn list_orders(&self, search: &str) -> Result<Vec<Order>, ClientError> {
        self.list(Resource::Orders, search).await
    }

    /// Finds a single order. The gateway's search matches order id or user id,
    /// so the result is narrowed to the exact order id.
    pub async fn find_order(&self, id: OrderId) -> Result<Option<Order>, ClientError> {
        let orders = self.list_orders(&id.to_string()).await?;
        Ok(orders.into_iter().find(|order| order.id == id))
    }

    pub async fn create_order(&self, order: &NewOrder) -> Result<CreatedResponse, ClientError> {
        self.create(Resource::Orders, order).await
    }

    pub async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<MessageResponse, ClientError> {
        self.update(Resource::Orders, id.0, update).await
    }

    pub async fn delete_order(&self, id: OrderId) -> Result<MessageResponse, ClientError> {
        self.delete(Resource::Orders, id.0).await
    }

    pub async fn list_payments(&self, search: &str) -> Result<Vec<Payment>, ClientError> {
        self.list(Resource::Payments, search).await
    }

    pub async fn create_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<CreatedResponse, ClientError> {
        self.create(Resource::Payments, payment).await
    }

    pub async fn update_payment(
        &self,
        id: PaymentId,
        update: &PaymentUpdate,
    ) -> Result<MessageResponse, ClientError> {
        self.update(Resource::Payments, id.0, update).await
    }

    pub async fn delete_payment(&self, id: PaymentId) -> Result<MessageResponse, ClientError> {
        self.delete(Resource::Payments, id.0).await
    }
}

/// The slice of the gateway the dispatch flow needs.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: DeliveryStatus,
    ) -> Result<(), ClientError>;
    async fn list_orders(&self, search: &str) -> Result<Vec<Order>, ClientError>;
}

#[async_trait]
impl OrderGateway for GatewayClient {
    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: DeliveryStatus,
    ) -> Result<(), ClientError> {
        self.update_order(order_id, &OrderUpdate::status(status))
            .await
            .map(|_| ())
    }

    async fn list_orders(&self, search: &str) -> Result<Vec<Order>, ClientError> {
        GatewayClient::list_orders(self, search).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
