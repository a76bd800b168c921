//! Fixed relative layout of a grading working directory.
//!
//! The external grading engine finds its inputs and writes its outputs at these
//! locations, so every crate builds paths through here instead of joining by hand.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Template scoring database, copied per request.
pub const GRADEBOOK_FILE: &str = "gradebook.db";
/// Engine configuration, linked read-only.
pub const ENGINE_CONFIG_FILE: &str = "nbgrader_config.py";
/// Instructor source notebooks, linked read-only.
pub const SOURCE_DIR: &str = "source";
/// Released (canonical) notebooks, linked read-only.
pub const RELEASE_DIR: &str = "release";

/// Create a directory (and all parents) if it doesn't exist, and return the path.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let p = path.as_ref();
    fs::create_dir_all(p)?;
    Ok(p.to_path_buf())
}

/// Ensure the parent directory of a *file path* exists (no-op if none).
pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> io::Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Resolve a possibly relative root against the current working directory.
pub fn absolute(root: &Path) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(root)
    }
}

fn notebook_name(assignment: &str) -> String {
    format!("{assignment}.ipynb")
}

/// {WORKDIR}/submitted/{student}/{assignment}
pub fn submitted_dir(workdir: &Path, student: &str, assignment: &str) -> PathBuf {
    workdir.join("submitted").join(student).join(assignment)
}

/// {WORKDIR}/submitted/{student}/{assignment}/{assignment}.ipynb
pub fn submitted_notebook(workdir: &Path, student: &str, assignment: &str) -> PathBuf {
    submitted_dir(workdir, student, assignment).join(notebook_name(assignment))
}

/// {WORKDIR}/autograded/{student}/{assignment}/{assignment}.ipynb
pub fn autograded_notebook(workdir: &Path, student: &str, assignment: &str) -> PathBuf {
    workdir
        .join("autograded")
        .join(student)
        .join(assignment)
        .join(notebook_name(assignment))
}

/// {WORKDIR}/release/{assignment}/{assignment}.ipynb
pub fn release_notebook(workdir: &Path, assignment: &str) -> PathBuf {
    workdir
        .join(RELEASE_DIR)
        .join(assignment)
        .join(notebook_name(assignment))
}

/// {WORKDIR}/gradebook.db
pub fn gradebook(workdir: &Path) -> PathBuf {
    workdir.join(GRADEBOOK_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_engine_expectations() {
        let w = Path::new("/tmp/w");
        assert_eq!(
            submitted_notebook(w, "student", "lab1"),
            PathBuf::from("/tmp/w/submitted/student/lab1/lab1.ipynb")
        );
        assert_eq!(
            autograded_notebook(w, "student", "lab1"),
            PathBuf::from("/tmp/w/autograded/student/lab1/lab1.ipynb")
        );
        assert_eq!(
            release_notebook(w, "lab1"),
            PathBuf::from("/tmp/w/release/lab1/lab1.ipynb")
        );
        assert_eq!(gradebook(w), PathBuf::from("/tmp/w/gradebook.db"));
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        assert_eq!(absolute(Path::new("/a/b")), PathBuf::from("/a/b"));
        assert!(absolute(Path::new("rel")).is_absolute());
    }
}
