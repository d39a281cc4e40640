//! Wire types for the GoCardless REST API.
//!
//! Every resource is wrapped in a singular envelope on the way in and out
//! (`{"customers": {...}}`), and list endpoints answer with a plural array
//! envelope (`{"mandates": [...]}`). Response fields we do not consume are
//! simply not modeled; unknown fields are ignored on deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Customer resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Parameters for creating a customer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCustomer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Billing request resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcBillingRequest {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub mandate_request: Option<GcMandateRequest>,
    #[serde(default)]
    pub payment_request: Option<GcPaymentRequest>,
    #[serde(default)]
    pub links: GcResourceLinks,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Mandate half of a billing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcMandateRequest {
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Payment half of a billing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcPaymentRequest {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parameters for creating a billing request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewBillingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandate_request: Option<GcMandateRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_request: Option<GcPaymentRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<NewBillingRequestLinks>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Links attachable at billing request creation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewBillingRequestLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

/// Billing request flow resource (the hosted-page session).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcBillingRequestFlow {
    pub id: String,
    /// URL the payer is sent to.
    pub authorisation_url: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub exit_uri: Option<String>,
    #[serde(default)]
    pub links: GcResourceLinks,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Parameters for creating a billing request flow.
#[derive(Debug, Clone, Serialize)]
pub struct NewBillingRequestFlow {
    pub links: NewBillingRequestFlowLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_uri: Option<String>,
}

/// Link to the billing request the flow fulfils.
#[derive(Debug, Clone, Serialize)]
pub struct NewBillingRequestFlowLinks {
    pub billing_request: String,
}

/// Mandate resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcMandate {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub links: GcResourceLinks,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Subscription resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcSubscription {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub interval_unit: Option<String>,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub day_of_month: Option<i32>,
    #[serde(default)]
    pub links: GcResourceLinks,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Parameters for creating a subscription against a mandate.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubscription {
    pub amount: i64,
    pub currency: String,
    pub interval_unit: String,
    pub links: NewSubscriptionLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i32>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Link to the mandate a subscription collects against.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubscriptionLinks {
    pub mandate: String,
}

/// Payment resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub charge_date: Option<String>,
    #[serde(default)]
    pub links: GcResourceLinks,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Creditor resource (the connected organisation's collecting entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcCreditor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub verification_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Cross-resource links common to several resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcResourceLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creditor: Option<String>,
}

// Singular envelopes. Each resource travels as `{"<name>": {...}}` in both
// requests and responses.

#[derive(Debug, Deserialize)]
pub struct CustomerEnvelope {
    pub customers: GcCustomer,
}

#[derive(Debug, Deserialize)]
pub struct BillingRequestEnvelope {
    pub billing_requests: GcBillingRequest,
}

#[derive(Debug, Deserialize)]
pub struct BillingRequestFlowEnvelope {
    pub billing_request_flows: GcBillingRequestFlow,
}

#[derive(Debug, Deserialize)]
pub struct MandateEnvelope {
    pub mandates: GcMandate,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionEnvelope {
    pub subscriptions: GcSubscription,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEnvelope {
    pub payments: GcPayment,
}

// List envelopes.

#[derive(Debug, Deserialize)]
pub struct MandateListEnvelope {
    #[serde(default)]
    pub mandates: Vec<GcMandate>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListEnvelope {
    #[serde(default)]
    pub payments: Vec<GcPayment>,
}

#[derive(Debug, Deserialize)]
pub struct CreditorListEnvelope {
    #[serde(default)]
    pub creditors: Vec<GcCreditor>,
}
