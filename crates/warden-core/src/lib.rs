//! Core types, policy loading, and knowledge-store access for warden.
//!
//! This crate provides the foundational data structures used across all warden crates:
//! - [`types`]: Severity, violations, policy rules, and engine results
//! - [`policy`]: Loading declarative policy documents from `.warden/policies`
//! - [`config`]: Configuration loading from `.warden/warden.json`
//! - [`store`]: The [`KnowledgeStore`](store::KnowledgeStore) trait and the physical-name shim
//! - [`sqlite`]: SQLite-backed implementation of `KnowledgeStore`
//! - [`hash`]: Deterministic content digests (base62 of xxhash64)

pub mod config;
pub mod hash;
pub mod policy;
pub mod sqlite;
pub mod store;
pub mod types;
