//! Checks against the external knowledge store.
//!
//! Every query failure becomes a finding: absence of evidence is never
//! compliance. A missing table is reported separately from an empty one
//! because the remediation differs (run a migration vs. run a sync).

use std::sync::Arc;

use warden_core::store::{ColumnFilter, KnowledgeStore, StoreError, TableShim};
use warden_core::types::{EngineResult, RawFinding, RuleParams};

use super::{check_type, Engine, EngineError, EngineScope, Target};

pub const ENGINE_ID: &str = "knowledge";

const CHECKS: &[&str] = &["min_rows", "unique_key", "required_reference"];

pub struct KnowledgeEngine {
    store: Option<Arc<dyn KnowledgeStore>>,
    shim: TableShim,
}

impl KnowledgeEngine {
    pub fn new(store: Option<Arc<dyn KnowledgeStore>>, shim: TableShim) -> Self {
        Self { store, shim }
    }
}

impl Engine for KnowledgeEngine {
    fn id(&self) -> &str {
        ENGINE_ID
    }

    fn supported_checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    fn scope(&self) -> EngineScope {
        EngineScope::Repository
    }

    fn verify(&self, _target: &Target, params: &RuleParams) -> Result<EngineResult, EngineError> {
        let check = check_type(self, params)?;
        let logical = required_str(params, "table")?;
        let table = self.shim.resolve(logical);

        let Some(store) = &self.store else {
            return Ok(fail(vec![RawFinding::new(
                "knowledge store unavailable: no database configured",
            )]));
        };

        let outcome = ensure_table(store.as_ref(), table).and_then(|()| match check {
            "min_rows" => min_rows(store.as_ref(), table, params),
            "unique_key" => unique_key(store.as_ref(), table, params),
            "required_reference" => required_reference(store.as_ref(), table, params),
            other => Err(Failure::Params(EngineError::UnsupportedCheck {
                engine: ENGINE_ID.to_string(),
                check: other.to_string(),
            })),
        });
        match outcome {
            Ok(findings) => Ok(EngineResult::from_findings(ENGINE_ID, findings)),
            Err(Failure::Store(e)) => store_failure(e, logical, table),
            Err(Failure::Params(e)) => Err(e),
        }
    }
}

enum Failure {
    Store(StoreError),
    Params(EngineError),
}

impl From<StoreError> for Failure {
    fn from(e: StoreError) -> Self {
        Failure::Store(e)
    }
}

impl From<EngineError> for Failure {
    fn from(e: EngineError) -> Self {
        Failure::Params(e)
    }
}

fn fail(findings: Vec<RawFinding>) -> EngineResult {
    EngineResult::fail(ENGINE_ID, "knowledge check failed", findings)
}

fn table_label(logical: &str, physical: &str) -> String {
    if logical == physical {
        format!("'{logical}'")
    } else {
        format!("'{logical}' (physical '{physical}')")
    }
}

/// Store errors degrade to findings; only a bad identifier is a
/// configuration error in the rule itself.
fn store_failure(e: StoreError, logical: &str, physical: &str) -> Result<EngineResult, EngineError> {
    let message = match e {
        StoreError::TableMissing(_) => format!("table missing: {}", table_label(logical, physical)),
        StoreError::Unavailable(reason) => format!("knowledge store unavailable: {reason}"),
        StoreError::Query(reason) => format!("knowledge query failed: {reason}"),
        e @ StoreError::InvalidIdentifier(_) => return Err(EngineError::InvalidParams(e.to_string())),
    };
    Ok(fail(vec![RawFinding::new(message)]))
}

fn required_str<'p>(params: &'p RuleParams, key: &str) -> Result<&'p str, EngineError> {
    params
        .get_str(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::InvalidParams(format!("'{key}' is required")))
}

/// Probe for the table before querying it, so a missing relation is
/// never mistaken for an empty one.
fn ensure_table(store: &dyn KnowledgeStore, table: &str) -> Result<(), Failure> {
    if store.table_exists(table)? {
        Ok(())
    } else {
        Err(StoreError::TableMissing(table.to_string()).into())
    }
}

fn min_rows(store: &dyn KnowledgeStore, table: &str, params: &RuleParams) -> Result<Vec<RawFinding>, Failure> {
    let min = params.get_u64("min").unwrap_or(1);
    let count = store.count_rows(table)?;
    let logical = params.get_str("table").unwrap_or(table);
    Ok(if count >= min {
        Vec::new()
    } else if count == 0 {
        vec![RawFinding::new(format!("table empty: {}", table_label(logical, table)))]
    } else {
        vec![RawFinding::new(format!(
            "table {} has {count} row(s), expected at least {min}",
            table_label(logical, table)
        ))]
    })
}

fn unique_key(store: &dyn KnowledgeStore, table: &str, params: &RuleParams) -> Result<Vec<RawFinding>, Failure> {
    let key = required_str(params, "key")?;
    Ok(store
        .duplicate_keys(table, key)?
        .into_iter()
        .map(|d| RawFinding::new(format!("duplicate {key} '{}' ({} rows)", d.key, d.count)))
        .collect())
}

/// Every row (optionally filtered) must carry a non-empty `column`.
fn required_reference(
    store: &dyn KnowledgeStore,
    table: &str,
    params: &RuleParams,
) -> Result<Vec<RawFinding>, Failure> {
    let key = required_str(params, "key")?;
    let column = required_str(params, "column")?;
    let filter = match (params.get_str("filter_column"), params.get("filter_value")) {
        (Some(c), Some(v)) => Some(ColumnFilter {
            column: c.to_string(),
            value: match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }),
        (None, None) => None,
        _ => {
            return Err(EngineError::InvalidParams(
                "'filter_column' and 'filter_value' must be given together".to_string(),
            )
            .into())
        }
    };
    Ok(store
        .missing_values(table, key, column, filter.as_ref())?
        .into_iter()
        .map(|k| RawFinding::new(format!("{key} '{k}' has no {column}")))
        .collect())
}
