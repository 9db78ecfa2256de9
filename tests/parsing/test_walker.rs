// Tests for repository discovery used by the audit

use warden_parsers::walker::FileWalker;

use super::common::create_repo;

#[test]
fn test_wardenignore_and_excludes() {
    let (_dir, root) = create_repo(&[
        (".wardenignore", "build/\n"),
        ("build/out.py", "x = 1\n"),
        ("gen/api.py", "x = 1\n"),
        ("src/a.py", "x = 1\n"),
        ("src/b.rs", "fn b() {}\n"),
        ("notes.txt", "hi"),
    ]);
    let entries = FileWalker::new(&root).with_excludes(&["gen/**".to_string()]).walk();
    let seen: Vec<_> = entries.iter().map(|e| (e.rel_path.as_str(), e.language)).collect();
    assert_eq!(
        seen,
        vec![
            ("notes.txt", None),
            ("src/a.py", Some("python")),
            ("src/b.rs", Some("rust")),
        ]
    );
}
