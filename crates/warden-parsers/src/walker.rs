use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::treesitter::detect_language;

pub struct WalkEntry {
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub rel_path: String,
    /// Managed language, if the extension maps to a grammar.
    pub language: Option<&'static str>,
}

pub struct FileWalker {
    root: PathBuf,
    exclude: GlobSet,
}

impl FileWalker {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            exclude: GlobSet::empty(),
        }
    }

    /// Exclude files whose relative path matches any of `patterns`.
    /// Invalid patterns are skipped with a warning.
    pub fn with_excludes(mut self, patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for p in patterns {
            match Glob::new(p) {
                Ok(g) => {
                    builder.add(g);
                }
                Err(e) => tracing::warn!(pattern = %p, error = %e, "skipping invalid ignore pattern"),
            }
        }
        self.exclude = builder.build().unwrap_or_else(|_| GlobSet::empty());
        self
    }

    /// All files under the root honouring `.gitignore` and `.wardenignore`,
    /// sorted by relative path.
    pub fn walk(&self) -> Vec<WalkEntry> {
        let mut entries = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(".wardenignore")
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "walk entry skipped");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.into_path();
            let rel_path = relative(&self.root, &path);
            if self.exclude.is_match(&rel_path) {
                continue;
            }
            entries.push(WalkEntry {
                language: detect_language(&path),
                path,
                rel_path,
            });
        }

        entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        entries
    }
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walker_finds_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("src/lib.py"), "def f(): pass").unwrap();
        fs::write(dir.path().join("README.md"), "# Hello").unwrap();

        let entries = FileWalker::new(dir.path()).walk();
        let rels: Vec<_> = entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["README.md", "src/lib.py", "src/main.rs"]);
        assert_eq!(entries[0].language, None);
        assert_eq!(entries[1].language, Some("python"));
        assert_eq!(entries[2].language, Some("rust"));
    }

    #[test]
    fn test_walker_respects_wardenignore_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("src/app.py"), "x = 1").unwrap();
        fs::write(dir.path().join("vendor/lib.py"), "y = 2").unwrap();
        fs::write(dir.path().join("build/out.py"), "z = 3").unwrap();
        fs::write(dir.path().join(".wardenignore"), "vendor/\n").unwrap();

        let entries = FileWalker::new(dir.path())
            .with_excludes(&["build/**".to_string()])
            .walk();
        let rels: Vec<_> = entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["src/app.py"]);
    }
}
