//! GoCardless connector core.
//!
//! This crate is the payment-processor boundary of a larger line-of-business
//! application: encrypted credential storage, webhook signature
//! authentication, rate limiting, a tenant-scoped API client, and the
//! CSRF-safe OAuth flow that connects a tenant to GoCardless. HTTP routing,
//! persistence schema, and business workflows live in the host application
//! and call in through the ports defined here.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
