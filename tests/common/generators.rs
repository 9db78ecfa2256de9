/// Source generators for benchmarks and property tests.
use std::fmt::Write;

/// Generate a Python module with `count` functions, each `lines_per_fn` lines long.
#[allow(dead_code)]
pub fn generate_python(count: usize, lines_per_fn: usize) -> String {
    let mut source = String::from("\"\"\"Generated module.\"\"\"\n\nimport os\n\n");
    let body_lines = lines_per_fn.saturating_sub(3);
    for i in 0..count {
        writeln!(source, "# helper number {i}").unwrap();
        writeln!(source, "def func_{i}(arg: str) -> str:").unwrap();
        writeln!(source, "    \"\"\"Return arg for case {i}.\"\"\"").unwrap();
        for j in 0..body_lines {
            writeln!(source, "    val_{j} = arg + \"{j}\"  # step {j}").unwrap();
        }
        writeln!(source, "    return arg\n").unwrap();
    }
    source
}

/// Generate `count` repository-relative paths spread over a few directories.
#[allow(dead_code)]
pub fn generate_paths(count: usize) -> Vec<String> {
    let dirs = ["src/core", "src/api", "tests", "docs", ".intent"];
    (0..count)
        .map(|i| format!("{}/file_{i}.py", dirs[i % dirs.len()]))
        .collect()
}
