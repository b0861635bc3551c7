//! Sentra Telemetry — agent registry, metric ingestion with synchronous
//! alert evaluation, and the remote command queue.

pub mod commands;
pub mod registry;
pub mod service;
pub mod thresholds;
