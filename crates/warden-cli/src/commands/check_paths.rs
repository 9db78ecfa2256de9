use std::path::PathBuf;

use warden_enforce::dispatch::EngineDispatcher;
use warden_enforce::types::ExitStatus;
use warden_enforce::validator::{PathValidator, ProposedWrite};
use warden_output::OutputFormatter;

use super::{Workspace, EXIT_ERROR};

/// Run `warden check-paths`. Violations block (1), warnings alone are
/// advisory (2).
pub fn run(
    formatter: &dyn OutputFormatter,
    root: Option<PathBuf>,
    paths: Vec<String>,
    content_from: Option<PathBuf>,
) -> i32 {
    let ws = match Workspace::open(root) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("warden check-paths: {}", e);
            return EXIT_ERROR;
        }
    };

    let validator = PathValidator::for_policies(
        &ws.root,
        &ws.config,
        ws.load_policies(),
        EngineDispatcher::new(ws.engines.clone()),
    );
    tracing::info!(rules = validator.rule_count(), paths = paths.len(), "validating paths");

    let result = match content_from {
        None => validator.check_paths(&paths),
        Some(file) => {
            if paths.len() != 1 {
                eprintln!("warden check-paths: --content-from takes exactly one path");
                return EXIT_ERROR;
            }
            let content = match std::fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("warden check-paths: cannot read {}: {}", file.display(), e);
                    return EXIT_ERROR;
                }
            };
            validator.check_writes(&[ProposedWrite {
                path: paths[0].clone(),
                content,
            }])
        }
    };

    print!("{}", formatter.format_path_check(&result));
    let highest = result
        .violations
        .iter()
        .chain(&result.warnings)
        .map(|v| v.severity)
        .max();
    ExitStatus::from_highest(highest).code()
}
