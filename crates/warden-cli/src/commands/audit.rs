use std::path::PathBuf;

use warden_enforce::audit::AuditRunner;
use warden_output::OutputFormatter;

use super::{Workspace, EXIT_ERROR};

/// Run `warden audit`. Exit code is the audit's three-tier decision.
pub fn run(
    formatter: &dyn OutputFormatter,
    root: Option<PathBuf>,
    timeout: Option<u64>,
    workers: Option<usize>,
) -> i32 {
    let mut ws = match Workspace::open(root) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("warden audit: {}", e);
            return EXIT_ERROR;
        }
    };
    if let Some(t) = timeout {
        ws.config.audit.timeout_seconds = t;
    }
    if let Some(w) = workers {
        ws.config.audit.max_workers = w;
    }

    let report = AuditRunner::new(&ws.root, ws.config, ws.engines).run();
    print!("{}", formatter.format_audit(&report));
    report.exit_code()
}
