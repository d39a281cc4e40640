//! Webhook authentication and safe event parsing.
//!
//! GoCardless signs each webhook delivery with HMAC-SHA256 over the raw
//! request body, hex-encoded into the `Webhook-Signature` header.
//! Verification operates on the **exact bytes received** — re-serializing
//! a parsed body (different key order, whitespace) would desynchronize the
//! digest and reject genuine deliveries.
//!
//! # Security
//!
//! - Header format is checked before any crypto work
//! - Digest comparison is constant-time (`subtle`), so timing cannot leak
//!   the correct digest byte by byte
//! - Payload logging redacts by default; full payloads only on explicit
//!   opt-in outside production-like environments

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::RuntimeEnvironment;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of an HMAC-SHA256 digest.
const SIGNATURE_HEX_LEN: usize = 64;

// ════════════════════════════════════════════════════════════════════════════════
// Signature Verification
// ════════════════════════════════════════════════════════════════════════════════

/// Why a signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRejection {
    /// Header is not exactly 64 lowercase hex characters.
    MalformedHeader,
    /// Header is well-formed but does not match the computed digest.
    Mismatch,
}

impl std::fmt::Display for SignatureRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "Malformed signature header"),
            Self::Mismatch => write!(f, "Signature mismatch"),
        }
    }
}

/// Outcome of a signature check: an explicit verdict, never a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVerdict {
    /// The signature matches the raw bytes.
    Valid,
    /// The signature was rejected for the given reason.
    Invalid(SignatureRejection),
}

impl SignatureVerdict {
    /// Returns true for a valid signature.
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureVerdict::Valid)
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<SignatureRejection> {
        match self {
            SignatureVerdict::Valid => None,
            SignatureVerdict::Invalid(reason) => Some(*reason),
        }
    }
}

/// Verifies an inbound webhook signature against the raw body bytes.
///
/// The header must be exactly 64 lowercase hex characters; anything else
/// is rejected before any HMAC is computed. The digest comparison is
/// constant-time.
pub fn verify_signature(raw_body: &[u8], signature_hex: &str, secret: &str) -> SignatureVerdict {
    let Some(provided) = decode_signature_header(signature_hex) else {
        tracing::warn!(
            header_len = signature_hex.len(),
            "Rejected webhook with malformed signature header"
        );
        return SignatureVerdict::Invalid(SignatureRejection::MalformedHeader);
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
        tracing::warn!("Rejected webhook with invalid signature");
        return SignatureVerdict::Invalid(SignatureRejection::Mismatch);
    }

    SignatureVerdict::Valid
}

/// Strict decode of the signature header: 64 lowercase hex chars, or None.
fn decode_signature_header(header: &str) -> Option<Vec<u8>> {
    if header.len() != SIGNATURE_HEX_LEN {
        return None;
    }
    if !header
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return None;
    }
    hex_decode(header)
}

/// Decode a hex string to bytes.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// One event from a webhook delivery, as received.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GcEvent {
    /// Unique event identifier (EV...).
    pub id: String,

    /// Resource class the event concerns (e.g. "mandates", "payments").
    pub resource_type: String,

    /// What happened to the resource (e.g. "created", "cancelled").
    pub action: String,

    /// Relationship identifiers for the affected resources.
    #[serde(default)]
    pub links: GcEventLinks,

    /// Cause/description details, passed through untyped.
    #[serde(default)]
    pub details: Option<serde_json::Value>,

    /// Provider creation time, as transmitted.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Relationship fields of an event.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GcEventLinks {
    /// Organisation the event belongs to; the multi-tenant routing key.
    #[serde(default)]
    pub organisation: Option<String>,
    #[serde(default)]
    pub mandate: Option<String>,
    #[serde(default)]
    pub billing_request: Option<String>,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
}

impl GcEvent {
    /// The routing identifier for multi-tenant dispatch.
    ///
    /// Returns `None` when the event carries no organisation link; the
    /// caller decides how to handle unroutable events — guessing here
    /// would risk cross-tenant dispatch.
    pub fn routing_key(&self) -> Option<&str> {
        self.links.organisation.as_deref()
    }
}

/// Structured parse failures, so callers can choose a deterministic
/// response (accept-and-drop vs reject) without a stack unwind.
#[derive(Debug, thiserror::Error)]
pub enum WebhookParseError {
    /// The body is not valid JSON at all.
    #[error("webhook body is not valid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON, but the top-level `events` list is missing.
    #[error("webhook body has no top-level 'events' list")]
    MissingEvents,

    /// An entry in the events list is not event-shaped.
    #[error("webhook event entry malformed: {0}")]
    MalformedEvent(String),
}

/// Parses a webhook body into its event list.
///
/// Validates the top-level shape (an object with an `events` array) and
/// returns a structured error instead of panicking on anything else.
pub fn parse_payload(raw_text: &str) -> Result<Vec<GcEvent>, WebhookParseError> {
    let value: serde_json::Value = serde_json::from_str(raw_text)
        .map_err(|e| WebhookParseError::InvalidJson(e.to_string()))?;

    let events = value
        .get("events")
        .and_then(|v| v.as_array())
        .ok_or(WebhookParseError::MissingEvents)?;

    events
        .iter()
        .map(|entry| {
            serde_json::from_value(entry.clone())
                .map_err(|e| WebhookParseError::MalformedEvent(e.to_string()))
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Logging
// ════════════════════════════════════════════════════════════════════════════════

/// Controls what `log_event` emits.
#[derive(Debug, Clone, Copy)]
pub struct EventLogOptions {
    /// Emit the full payload. Ignored in production-like environments.
    pub include_payload: bool,

    /// The runtime environment the connector is running in.
    pub environment: RuntimeEnvironment,
}

impl EventLogOptions {
    /// Redacting defaults for the given environment.
    pub fn redacted(environment: RuntimeEnvironment) -> Self {
        Self {
            include_payload: false,
            environment,
        }
    }

    fn payload_allowed(&self) -> bool {
        self.include_payload && !self.environment.is_production_like()
    }
}

/// Logs a verified event.
///
/// Always logs id, resource type, action, and routing key. The full
/// payload is included only when explicitly opted in, and never in a
/// production-like environment.
pub fn log_event(event: &GcEvent, opts: &EventLogOptions) {
    if opts.payload_allowed() {
        tracing::info!(
            event_id = %event.id,
            resource_type = %event.resource_type,
            action = %event.action,
            routing_key = event.routing_key().unwrap_or("-"),
            payload = %serde_json::to_string(event).unwrap_or_default(),
            "Webhook event received"
        );
    } else {
        tracing::info!(
            event_id = %event.id,
            resource_type = %event.resource_type,
            action = %event.action,
            routing_key = event.routing_key().unwrap_or("-"),
            "Webhook event received"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "whsec_test";

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex_encode(&mac.finalize().into_bytes())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn accepts_correct_signature_over_exact_bytes() {
        let body = br#"{"events":[{"id":"EV1","resource_type":"mandates","action":"created"}]}"#;
        let signature = sign(body, SECRET);

        assert_eq!(signature.len(), 64);
        assert!(verify_signature(body, &signature, SECRET).is_valid());
    }

    #[test]
    fn altering_one_digest_character_rejects_with_mismatch() {
        let body = br#"{"events":[{"id":"EV1","resource_type":"mandates","action":"created"}]}"#;
        let mut signature = sign(body, SECRET);

        // Swap one hex character for a different one.
        let original = signature.remove(10);
        let replacement = if original == '0' { '1' } else { '0' };
        signature.insert(10, replacement);

        let verdict = verify_signature(body, &signature, SECRET);
        assert_eq!(verdict.reason(), Some(SignatureRejection::Mismatch));
        assert_eq!(verdict.reason().unwrap().to_string(), "Signature mismatch");
    }

    #[test]
    fn altering_body_bytes_rejects() {
        let body = br#"{"events":[]}"#.to_vec();
        let signature = sign(&body, SECRET);

        let mut altered = body.clone();
        altered[3] ^= 0x01;
        assert!(!verify_signature(&altered, &signature, SECRET).is_valid());
    }

    #[test]
    fn reserialized_body_would_not_verify() {
        // Same JSON meaning, different bytes: signatures are over the
        // transmitted byte stream, not the parsed value.
        let transmitted = br#"{"events": []}"#;
        let reserialized = br#"{"events":[]}"#;
        let signature = sign(transmitted, SECRET);

        assert!(verify_signature(transmitted, &signature, SECRET).is_valid());
        assert!(!verify_signature(reserialized, &signature, SECRET).is_valid());
    }

    #[test]
    fn wrong_secret_rejects() {
        let body = br#"{"events":[]}"#;
        let signature = sign(body, "other_secret");
        assert!(!verify_signature(body, &signature, SECRET).is_valid());
    }

    #[test]
    fn short_header_is_malformed_before_crypto() {
        let verdict = verify_signature(b"{}", "abc123", SECRET);
        assert_eq!(verdict.reason(), Some(SignatureRejection::MalformedHeader));
    }

    #[test]
    fn uppercase_hex_is_malformed() {
        let body = br#"{"events":[]}"#;
        let signature = sign(body, SECRET).to_uppercase();
        let verdict = verify_signature(body, &signature, SECRET);
        assert_eq!(verdict.reason(), Some(SignatureRejection::MalformedHeader));
    }

    #[test]
    fn non_hex_alphabet_is_malformed() {
        let header = "g".repeat(64);
        let verdict = verify_signature(b"{}", &header, SECRET);
        assert_eq!(verdict.reason(), Some(SignatureRejection::MalformedHeader));
    }

    #[test]
    fn verification_is_deterministic() {
        let body = br#"{"events":[{"id":"EV1","resource_type":"mandates","action":"created"}]}"#;
        let signature = sign(body, SECRET);
        for _ in 0..5 {
            assert!(verify_signature(body, &signature, SECRET).is_valid());
        }
    }

    #[test]
    fn mismatch_at_first_and_last_byte_report_identically() {
        // Both go through the constant-time comparison and produce the
        // same rejection, whether the first or the last digest byte is off.
        let body = br#"{"events":[]}"#;
        let signature = sign(body, SECRET);
        let mut first_off: Vec<char> = signature.chars().collect();
        let mut last_off: Vec<char> = signature.chars().collect();
        first_off[0] = if first_off[0] == 'a' { 'b' } else { 'a' };
        last_off[63] = if last_off[63] == 'a' { 'b' } else { 'a' };

        let first: String = first_off.into_iter().collect();
        let last: String = last_off.into_iter().collect();

        assert_eq!(
            verify_signature(body, &first, SECRET).reason(),
            Some(SignatureRejection::Mismatch)
        );
        assert_eq!(
            verify_signature(body, &last, SECRET).reason(),
            Some(SignatureRejection::Mismatch)
        );
    }

    proptest! {
        #[test]
        fn any_body_bit_flip_invalidates(body in proptest::collection::vec(any::<u8>(), 1..256), byte_index in 0usize..256, bit in 0u8..8) {
            let signature = sign(&body, SECRET);
            prop_assert!(verify_signature(&body, &signature, SECRET).is_valid());

            let mut altered = body.clone();
            let index = byte_index % altered.len();
            altered[index] ^= 1 << bit;
            prop_assert!(!verify_signature(&altered, &signature, SECRET).is_valid());
        }

        #[test]
        fn any_digest_hex_change_invalidates(position in 0usize..64, replacement in "[0-9a-f]") {
            let body = br#"{"events":[]}"#;
            let signature = sign(body, SECRET);
            let replacement_char = replacement.chars().next().unwrap();
            prop_assume!(signature.as_bytes()[position] != replacement_char as u8);

            let mut altered: Vec<char> = signature.chars().collect();
            altered[position] = replacement_char;
            let altered: String = altered.into_iter().collect();
            prop_assert_eq!(
                verify_signature(body, &altered, SECRET).reason(),
                Some(SignatureRejection::Mismatch)
            );
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payload Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parses_event_list() {
        let body = r#"{"events":[
            {"id":"EV1","resource_type":"mandates","action":"created",
             "links":{"mandate":"MD1","organisation":"OR1"}},
            {"id":"EV2","resource_type":"payments","action":"confirmed"}
        ]}"#;

        let events = parse_payload(body).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "EV1");
        assert_eq!(events[0].routing_key(), Some("OR1"));
        assert_eq!(events[1].routing_key(), None);
    }

    #[test]
    fn minimal_event_parses_without_links() {
        let body = r#"{"events":[{"id":"EV1","resource_type":"mandates","action":"created"}]}"#;
        let events = parse_payload(body).unwrap();
        assert_eq!(events[0].resource_type, "mandates");
        assert!(events[0].links.mandate.is_none());
    }

    #[test]
    fn invalid_json_is_a_structured_error() {
        assert!(matches!(
            parse_payload("not json"),
            Err(WebhookParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn missing_events_list_is_distinguished() {
        assert!(matches!(
            parse_payload(r#"{"deliveries":[]}"#),
            Err(WebhookParseError::MissingEvents)
        ));
        assert!(matches!(
            parse_payload(r#"{"events":"nope"}"#),
            Err(WebhookParseError::MissingEvents)
        ));
    }

    #[test]
    fn malformed_entry_is_reported() {
        assert!(matches!(
            parse_payload(r#"{"events":[{"id":"EV1"}]}"#),
            Err(WebhookParseError::MalformedEvent(_))
        ));
    }

    #[test]
    fn empty_event_list_is_valid() {
        assert!(parse_payload(r#"{"events":[]}"#).unwrap().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Logging Option Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn payload_logging_requires_opt_in() {
        let opts = EventLogOptions::redacted(RuntimeEnvironment::Development);
        assert!(!opts.payload_allowed());
    }

    #[test]
    fn payload_logging_suppressed_in_production() {
        let opts = EventLogOptions {
            include_payload: true,
            environment: RuntimeEnvironment::Production,
        };
        assert!(!opts.payload_allowed());

        let opts = EventLogOptions {
            include_payload: true,
            environment: RuntimeEnvironment::Development,
        };
        assert!(opts.payload_allowed());
    }
}
