//! Governance engine for warden.
//!
//! Evaluates file targets against declarative policy and reports, blocks,
//! or annotates non-compliant material:
//! - [`matcher`]: compiled rule patterns, deterministic rule order
//! - [`invariant`]: hard invariants evaluated before any policy rule
//! - [`validator`]: `check_paths` over candidate writes
//! - [`engines`]: the engine trait, registry, and the structural, content
//!   and knowledge engines
//! - [`dispatch`]: routes engine rules and normalizes results, fail-closed
//! - [`rule_check`] / [`audit`]: grouped checks and the audit coordinator
//! - [`actions`]: registration-time contract checks for write-capable actions

pub mod types;
pub mod matcher;
pub mod invariant;
pub mod engines;
pub mod dispatch;
pub mod validator;
pub mod rule_check;
pub mod audit;
pub mod actions;
