use std::path::PathBuf;

use warden_enforce::engines::structural::{verify_metadata_only, MetadataOptions};
use warden_output::OutputFormatter;
use warden_parsers::metadata::EditCategory;
use warden_parsers::treesitter::grammar_for_path;

use super::{Workspace, EXIT_ERROR};

/// Run `warden verify-edit`. Exit 0 for a metadata-only edit, 1 otherwise.
pub fn run(
    formatter: &dyn OutputFormatter,
    root: Option<PathBuf>,
    original: PathBuf,
    modified: PathBuf,
    path: Option<String>,
    max_comment_length: Option<usize>,
    allow: Vec<String>,
) -> i32 {
    let default_max = Workspace::open(root)
        .map(|ws| ws.config.structural.max_comment_length)
        .unwrap_or_else(|_| warden_core::config::WardenConfig::default().structural.max_comment_length);

    let path = path.unwrap_or_else(|| original.to_string_lossy().into_owned());
    let Some(grammar) = grammar_for_path(std::path::Path::new(&path)) else {
        eprintln!("warden verify-edit: no grammar for '{}'", path);
        return EXIT_ERROR;
    };

    let read = |p: &PathBuf| {
        std::fs::read_to_string(p).map_err(|e| format!("cannot read {}: {}", p.display(), e))
    };
    let (before, after) = match (read(&original), read(&modified)) {
        (Ok(b), Ok(a)) => (b, a),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("warden verify-edit: {}", e);
            return EXIT_ERROR;
        }
    };

    let allowed = if allow.is_empty() {
        None
    } else {
        let mut set = std::collections::BTreeSet::new();
        for name in &allow {
            match EditCategory::parse(name) {
                Some(c) => {
                    set.insert(c);
                }
                None => {
                    let known: Vec<_> = EditCategory::all().iter().map(|c| c.as_str()).collect();
                    eprintln!(
                        "warden verify-edit: unknown edit category '{}' (expected one of {})",
                        name,
                        known.join(", ")
                    );
                    return EXIT_ERROR;
                }
            }
        }
        Some(set)
    };
    let options = MetadataOptions {
        max_comment_length: Some(max_comment_length.unwrap_or(default_max)),
        allowed,
    };

    let verdict = verify_metadata_only(grammar, &path, &before, &after, &options);
    print!("{}", formatter.format_edit(&verdict));
    if verdict.is_allowed() {
        0
    } else {
        1
    }
}
