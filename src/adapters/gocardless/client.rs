//! Tenant-scoped GoCardless API client.
//!
//! A client instance is bound to one tenant's connection: its access token
//! is decrypted once at construction and every request carries it as a
//! bearer credential together with the pinned API version header. Error
//! responses are reduced to their redacted fields before they touch a log
//! line or an error value.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::adapters::vault::CredentialVault;
use crate::domain::connection::GcEnvironment;
use crate::domain::foundation::TenantId;
use crate::ports::ConnectionRepository;

use super::error::{ApiError, ApiErrorCode, ProviderErrorBody};
use super::types::{
    BillingRequestEnvelope, BillingRequestFlowEnvelope, CreditorListEnvelope, CustomerEnvelope,
    GcBillingRequest, GcBillingRequestFlow, GcCreditor, GcCustomer, GcMandate, GcPayment,
    GcSubscription, MandateEnvelope, MandateListEnvelope, NewBillingRequest, NewBillingRequestFlow,
    NewCustomer, NewSubscription, PaymentEnvelope, PaymentListEnvelope, SubscriptionEnvelope,
};

/// API version every request is pinned to.
const API_VERSION: &str = "2015-07-06";

/// Generates a fresh idempotency key for a create request.
///
/// Callers retrying a failed create reuse the key from the first attempt;
/// a new key belongs to a new logical operation.
pub fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// GoCardless REST client scoped to a single tenant connection.
pub struct GoCardlessClient {
    http: reqwest::Client,
    base_url: String,
    access_token: SecretString,
    tenant_id: TenantId,
    environment: GcEnvironment,
}

impl GoCardlessClient {
    /// Creates a client from an already-decrypted token.
    pub fn new(access_token: SecretString, tenant_id: TenantId, environment: GcEnvironment) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: environment.api_base_url().to_string(),
            access_token,
            tenant_id,
            environment,
        }
    }

    /// Builds a client for a tenant by loading and decrypting its stored
    /// connection.
    ///
    /// Fails with `NoActiveConnection` when the tenant has never connected
    /// or the connection is revoked, and with `CredentialDecryption` when
    /// the stored blob cannot be opened.
    pub async fn for_tenant(
        connections: &Arc<dyn ConnectionRepository>,
        vault: &CredentialVault,
        tenant_id: TenantId,
    ) -> Result<Self, ApiError> {
        let connection = connections
            .find_active(&tenant_id)
            .await
            .map_err(|e| ApiError::new(ApiErrorCode::NoActiveConnection, e.to_string()))?
            .ok_or_else(|| {
                ApiError::new(
                    ApiErrorCode::NoActiveConnection,
                    format!("tenant {} has no active connection", tenant_id),
                )
            })?;

        let access_token = vault
            .decrypt(&connection.encrypted_access_token)
            .map_err(|e| {
                tracing::error!(
                    tenant_id = %tenant_id,
                    error = %e,
                    "Stored access token failed to decrypt"
                );
                ApiError::new(
                    ApiErrorCode::CredentialDecryption,
                    "stored access token failed to decrypt",
                )
            })?;

        Ok(Self::new(access_token, tenant_id, connection.environment))
    }

    /// Tenant this client acts for.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Environment this client talks to.
    pub fn environment(&self) -> GcEnvironment {
        self.environment
    }

    /// Override the base URL (for tests against a local server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sends one request and decodes the enveloped response.
    ///
    /// Applies bearer auth, the pinned version header, and an optional
    /// idempotency key. Non-2xx responses are reduced to `ApiError` with
    /// only the redacted error fields logged.
    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
        idempotency_key: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(self.access_token.expose_secret())
            .header("GoCardless-Version", API_VERSION);

        if let Some(key) = idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        if !status.is_success() {
            let extracted = ProviderErrorBody::extract(&text);
            let error = ApiError::provider(status.as_u16(), extracted);
            tracing::warn!(
                tenant_id = %self.tenant_id,
                method = %method,
                path = %path,
                status = status.as_u16(),
                request_id = error.request_id.as_deref().unwrap_or(""),
                error = %error.message,
                "GoCardless request failed"
            );
            return Err(error);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(
                tenant_id = %self.tenant_id,
                path = %path,
                error = %e,
                "GoCardless response did not match expected shape"
            );
            ApiError::new(
                ApiErrorCode::InvalidResponse,
                format!("unexpected response shape: {}", e),
            )
        })
    }

    /// Fetches a customer by id.
    pub async fn get_customer(&self, customer_id: &str) -> Result<GcCustomer, ApiError> {
        let envelope: CustomerEnvelope = self
            .request(
                reqwest::Method::GET,
                &format!("/customers/{}", customer_id),
                None,
                None,
            )
            .await?;
        Ok(envelope.customers)
    }

    /// Creates a customer.
    pub async fn create_customer(
        &self,
        new: NewCustomer,
        idempotency_key: Option<&str>,
    ) -> Result<GcCustomer, ApiError> {
        let body = serde_json::json!({ "customers": new });
        let envelope: CustomerEnvelope = self
            .request(reqwest::Method::POST, "/customers", Some(body), idempotency_key)
            .await?;
        Ok(envelope.customers)
    }

    /// Creates a billing request (mandate and/or payment setup).
    pub async fn create_billing_request(
        &self,
        new: NewBillingRequest,
        idempotency_key: Option<&str>,
    ) -> Result<GcBillingRequest, ApiError> {
        let body = serde_json::json!({ "billing_requests": new });
        let envelope: BillingRequestEnvelope = self
            .request(
                reqwest::Method::POST,
                "/billing_requests",
                Some(body),
                idempotency_key,
            )
            .await?;
        Ok(envelope.billing_requests)
    }

    /// Fetches a billing request by id.
    pub async fn get_billing_request(&self, id: &str) -> Result<GcBillingRequest, ApiError> {
        let envelope: BillingRequestEnvelope = self
            .request(
                reqwest::Method::GET,
                &format!("/billing_requests/{}", id),
                None,
                None,
            )
            .await?;
        Ok(envelope.billing_requests)
    }

    /// Creates a hosted flow for a billing request and returns it with the
    /// payer-facing authorisation URL.
    pub async fn create_billing_request_flow(
        &self,
        new: NewBillingRequestFlow,
    ) -> Result<GcBillingRequestFlow, ApiError> {
        let body = serde_json::json!({ "billing_request_flows": new });
        let envelope: BillingRequestFlowEnvelope = self
            .request(
                reqwest::Method::POST,
                "/billing_request_flows",
                Some(body),
                None,
            )
            .await?;
        Ok(envelope.billing_request_flows)
    }

    /// Fetches a mandate by id.
    pub async fn get_mandate(&self, mandate_id: &str) -> Result<GcMandate, ApiError> {
        let envelope: MandateEnvelope = self
            .request(
                reqwest::Method::GET,
                &format!("/mandates/{}", mandate_id),
                None,
                None,
            )
            .await?;
        Ok(envelope.mandates)
    }

    /// Lists mandates for a customer.
    pub async fn list_mandates(&self, customer_id: &str) -> Result<Vec<GcMandate>, ApiError> {
        let envelope: MandateListEnvelope = self
            .request(
                reqwest::Method::GET,
                &format!("/mandates?customer={}", customer_id),
                None,
                None,
            )
            .await?;
        Ok(envelope.mandates)
    }

    /// Creates a subscription against a mandate.
    ///
    /// An idempotency key is mandatory here: a retried create without one
    /// would double-bill the payer.
    pub async fn create_subscription(
        &self,
        new: NewSubscription,
        idempotency_key: &str,
    ) -> Result<GcSubscription, ApiError> {
        let body = serde_json::json!({ "subscriptions": new });
        let envelope: SubscriptionEnvelope = self
            .request(
                reqwest::Method::POST,
                "/subscriptions",
                Some(body),
                Some(idempotency_key),
            )
            .await?;
        Ok(envelope.subscriptions)
    }

    /// Fetches a payment by id.
    pub async fn get_payment(&self, payment_id: &str) -> Result<GcPayment, ApiError> {
        let envelope: PaymentEnvelope = self
            .request(
                reqwest::Method::GET,
                &format!("/payments/{}", payment_id),
                None,
                None,
            )
            .await?;
        Ok(envelope.payments)
    }

    /// Lists payments collected under a mandate.
    pub async fn list_payments(&self, mandate_id: &str) -> Result<Vec<GcPayment>, ApiError> {
        let envelope: PaymentListEnvelope = self
            .request(
                reqwest::Method::GET,
                &format!("/payments?mandate={}", mandate_id),
                None,
                None,
            )
            .await?;
        Ok(envelope.payments)
    }

    /// Fetches the connected organisation's creditor.
    ///
    /// The creditors endpoint lists the organisation's own creditors; a
    /// freshly connected organisation has exactly one. Also doubles as a
    /// cheap liveness probe for the stored token.
    pub async fn get_creditor(&self) -> Result<GcCreditor, ApiError> {
        let envelope: CreditorListEnvelope = self
            .request(reqwest::Method::GET, "/creditors", None, None)
            .await?;
        envelope.creditors.into_iter().next().ok_or_else(|| {
            ApiError::new(
                ApiErrorCode::InvalidResponse,
                "creditors list was empty for connected organisation",
            )
        })
    }
}

impl std::fmt::Debug for GoCardlessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoCardlessClient")
            .field("tenant_id", &self.tenant_id)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
