use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Creates a throwaway assignment root holding the resources every working
/// directory links to: `gradebook.db`, `nbgrader_config.py`, `source/<name>/`
/// and `release/<name>/<name>.ipynb`.
///
/// The gradebook is an empty placeholder file; tests that need scores write a
/// real database over it. Keep the returned `TempDir` in scope for as long as
/// you need the files.
pub fn setup_assignment_root(assignment: &str, release_notebook: &str) -> TempDir {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let root = tmp.path();

    fs::write(root.join("gradebook.db"), b"").expect("write gradebook");
    fs::write(root.join("nbgrader_config.py"), b"c = get_config()\n").expect("write config");

    let source = root.join("source").join(assignment);
    fs::create_dir_all(&source).expect("create source dir");
    fs::write(source.join(format!("{assignment}.ipynb")), release_notebook)
        .expect("write source notebook");

    let release = root.join("release").join(assignment);
    fs::create_dir_all(&release).expect("create release dir");
    fs::write(release.join(format!("{assignment}.ipynb")), release_notebook)
        .expect("write release notebook");

    tmp
}

/// Writes `contents` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write file");
}
