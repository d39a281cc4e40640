//! A tenant's connection to GoCardless.
//!
//! At most one active connection exists per tenant; completing the OAuth
//! flow again for a connected tenant rotates the stored credentials under
//! the same tenant key rather than creating a second row.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp, ValidationError};

/// Which GoCardless environment a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcEnvironment {
    /// Sandbox environment for testing.
    Sandbox,
    /// Live environment moving real money.
    Live,
}

impl GcEnvironment {
    /// Base URL of the REST API for this environment.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            GcEnvironment::Sandbox => "https://api-sandbox.gocardless.com",
            GcEnvironment::Live => "https://api.gocardless.com",
        }
    }

    /// Base URL of the OAuth (connect) host for this environment.
    pub fn connect_base_url(&self) -> &'static str {
        match self {
            GcEnvironment::Sandbox => "https://connect-sandbox.gocardless.com",
            GcEnvironment::Live => "https://connect.gocardless.com",
        }
    }

    /// Returns the storage representation of the environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            GcEnvironment::Sandbox => "sandbox",
            GcEnvironment::Live => "live",
        }
    }

    /// Parses the storage representation of the environment.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "sandbox" => Ok(GcEnvironment::Sandbox),
            "live" => Ok(GcEnvironment::Live),
            other => Err(ValidationError::invalid_format(
                "environment",
                format!("expected 'sandbox' or 'live', got '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for GcEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Credentials are current and usable.
    Active,
    /// The tenant (or the provider) disconnected; credentials are dead.
    Revoked,
}

impl ConnectionStatus {
    /// Returns the storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Active => "active",
            ConnectionStatus::Revoked => "revoked",
        }
    }

    /// Parses the storage representation of the status.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "active" => Ok(ConnectionStatus::Active),
            "revoked" => Ok(ConnectionStatus::Revoked),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("expected 'active' or 'revoked', got '{}'", other),
            )),
        }
    }
}

/// One tenant's link to GoCardless.
///
/// The access token is stored only in encrypted form; decryption happens
/// in the credential vault when the API client is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Owning tenant; unique key for the record set.
    pub tenant_id: TenantId,

    /// Which GoCardless environment this connection targets.
    pub environment: GcEnvironment,

    /// Access token, encrypted by the credential vault (opaque blob).
    pub encrypted_access_token: String,

    /// GoCardless organisation id returned by the token exchange.
    pub organisation_id: String,

    /// Lifecycle status.
    pub status: ConnectionStatus,

    /// Cached provider-side verification status, if ever checked.
    pub verification_status: Option<String>,

    /// When the verification status was last refreshed.
    pub verification_checked_at: Option<Timestamp>,

    /// When the connection was first established.
    pub created_at: Timestamp,

    /// When the connection record last changed.
    pub updated_at: Timestamp,
}

impl Connection {
    /// Creates an active connection as produced by a completed OAuth flow.
    pub fn established(
        tenant_id: TenantId,
        environment: GcEnvironment,
        encrypted_access_token: String,
        organisation_id: String,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            tenant_id,
            environment,
            encrypted_access_token,
            organisation_id,
            status: ConnectionStatus::Active,
            verification_status: None,
            verification_checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the connection can serve API calls.
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }

    /// Records a freshly fetched verification status.
    pub fn cache_verification(&mut self, status: impl Into<String>, checked_at: Timestamp) {
        self.verification_status = Some(status.into());
        self.verification_checked_at = Some(checked_at);
        self.updated_at = checked_at;
    }

    /// Marks the connection revoked after an external disconnect.
    pub fn revoke(&mut self) {
        self.status = ConnectionStatus::Revoked;
        self.updated_at = Timestamp::now();
    }
}
