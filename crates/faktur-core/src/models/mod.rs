//! Data models: the normalized invoice record and configuration.

pub mod config;
pub mod invoice;
