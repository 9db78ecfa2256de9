use std::path::PathBuf;

use warden_enforce::actions::builtin::builtin_registry;
use warden_enforce::actions::{ActionCategory, ActionContext, ActionInfo, ActionRegistry};
use warden_output::OutputFormatter;

use super::{Workspace, EXIT_ERROR};

fn registry() -> Result<std::sync::Arc<ActionRegistry>, i32> {
    builtin_registry().map(ActionRegistry::freeze).map_err(|e| {
        eprintln!("warden actions: {}", e);
        EXIT_ERROR
    })
}

/// Run `warden actions list`.
pub fn list(formatter: &dyn OutputFormatter, category: Option<String>) -> i32 {
    let registry = match registry() {
        Ok(r) => r,
        Err(code) => return code,
    };
    let defs = match category.as_deref() {
        None => registry.list_all(),
        Some(name) => match ActionCategory::parse(name) {
            Some(c) => registry.list_by_category(c),
            None => {
                eprintln!("warden actions: unknown category '{}'", name);
                return EXIT_ERROR;
            }
        },
    };
    let infos: Vec<ActionInfo> = defs.iter().map(|d| d.info()).collect();
    print!("{}", formatter.format_actions(&infos));
    0
}

/// Run `warden actions run <id>`. Exit 0 when the action reports success.
pub fn run(formatter: &dyn OutputFormatter, root: Option<PathBuf>, id: String, params: String, write: bool) -> i32 {
    let registry = match registry() {
        Ok(r) => r,
        Err(code) => return code,
    };
    let params: serde_json::Value = match serde_json::from_str(&params) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("warden actions: --params is not valid JSON: {}", e);
            return EXIT_ERROR;
        }
    };
    let ws = match Workspace::open(root) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("warden actions: {}", e);
            return EXIT_ERROR;
        }
    };
    let ctx = ActionContext {
        root: ws.root,
        config: ws.config,
        write,
    };
    match registry.dispatch(&id, &ctx, &params) {
        Ok(result) => {
            print!("{}", formatter.format_action_result(&result));
            if result.ok {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("warden actions: {}", e);
            EXIT_ERROR
        }
    }
}
