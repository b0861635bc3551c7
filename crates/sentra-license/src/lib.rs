//! Sentra License — key generation, entitlement resolution, and the
//! validation engine.
//!
//! The [`service::LicenseService`] is generic over repository
//! implementations so this crate has no dependency on the database
//! crate.

pub mod entitlements;
pub mod keygen;
pub mod service;
