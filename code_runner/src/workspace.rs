//! Per-request working directory.
//!
//! Each request gets its own temporary directory laid out the way the grading engine expects:
//! a private copy of the template gradebook, read-only links to the shared assignment resources,
//! and an empty `submitted/<student>/<assignment>/` folder for the download. The directory is
//! removed when the [`GradingWorkspace`] is dropped, whichever way the request ends.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;
use util::paths;

/// Name prefix of every per-request working directory.
pub const WORKDIR_PREFIX: &str = "notebook-grader-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("cannot create working directory: {0}")]
    Create(#[source] io::Error),

    #[error("cannot prepare {}: {source}", path.display())]
    Seed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct GradingWorkspace {
    dir: TempDir,
    assignment: String,
    student: String,
}

fn seed_err(path: &Path) -> impl FnOnce(io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError::Seed {
        path: path.to_path_buf(),
        source,
    }
}

impl GradingWorkspace {
    /// Creates and seeds a working directory for `assignment` under `work_root`.
    ///
    /// `assignment` must already be sanitised; it is used as a path component. A directory that
    /// fails to seed is removed before the error is returned.
    pub fn prepare(
        work_root: &Path,
        assignment_root: &Path,
        assignment: &str,
        student: &str,
    ) -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(work_root)
            .map_err(WorkspaceError::Create)?;
        let root = dir.path();

        let submitted = paths::submitted_dir(root, student, assignment);
        paths::ensure_dir(&submitted).map_err(seed_err(&submitted))?;

        let template = assignment_root.join(paths::GRADEBOOK_FILE);
        fs::copy(&template, paths::gradebook(root)).map_err(seed_err(&template))?;

        for shared in [paths::ENGINE_CONFIG_FILE, paths::SOURCE_DIR, paths::RELEASE_DIR] {
            let target = assignment_root.join(shared);
            symlink(&target, root.join(shared)).map_err(seed_err(&target))?;
        }

        debug!(workdir = %root.display(), assignment, "Prepared working directory");
        Ok(Self {
            dir,
            assignment: assignment.to_string(),
            student: student.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn assignment(&self) -> &str {
        &self.assignment
    }

    pub fn student(&self) -> &str {
        &self.student
    }

    /// Where the downloaded submission is stored.
    pub fn submission_path(&self) -> PathBuf {
        paths::submitted_notebook(self.path(), &self.student, &self.assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use util::test_helpers::setup_assignment_root;

    #[test]
    fn test_prepare_seeds_layout() {
        let root = setup_assignment_root("lab1", r#"{"cells": []}"#);
        let ws =
            GradingWorkspace::prepare(&std::env::temp_dir(), root.path(), "lab1", "student")
                .unwrap();
        let w = ws.path();

        assert!(w.join("submitted/student/lab1").is_dir());
        assert!(w.join("gradebook.db").is_file());
        assert!(!fs::symlink_metadata(w.join("gradebook.db")).unwrap().file_type().is_symlink());
        for shared in ["nbgrader_config.py", "source", "release"] {
            let meta = fs::symlink_metadata(w.join(shared)).unwrap();
            assert!(meta.file_type().is_symlink(), "{shared} should be linked");
        }
        assert!(w.join("release/lab1/lab1.ipynb").is_file());
        assert_eq!(
            ws.submission_path(),
            w.join("submitted/student/lab1/lab1.ipynb")
        );
    }

    #[test]
    fn test_gradebook_copy_is_private() {
        let root = setup_assignment_root("lab1", "{}");
        let ws =
            GradingWorkspace::prepare(&std::env::temp_dir(), root.path(), "lab1", "student")
                .unwrap();
        fs::write(ws.path().join("gradebook.db"), b"changed").unwrap();
        assert_eq!(fs::read(root.path().join("gradebook.db")).unwrap(), b"");
    }

    #[test]
    fn test_directory_removed_on_drop() {
        let root = setup_assignment_root("lab1", "{}");
        let ws =
            GradingWorkspace::prepare(&std::env::temp_dir(), root.path(), "lab1", "student")
                .unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
        assert!(root.path().join("release/lab1/lab1.ipynb").exists());
    }

    #[test]
    fn test_missing_template_gradebook() {
        let root = tempfile::tempdir().unwrap();
        let work_root = tempfile::tempdir().unwrap();
        let err = GradingWorkspace::prepare(work_root.path(), root.path(), "lab1", "student")
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Seed { .. }));
        assert_eq!(fs::read_dir(work_root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_created_under_work_root() {
        let root = setup_assignment_root("lab1", "{}");
        let work_root = tempfile::tempdir().unwrap();
        let ws =
            GradingWorkspace::prepare(work_root.path(), root.path(), "lab1", "student").unwrap();
        assert_eq!(ws.path().parent(), Some(work_root.path()));
        let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(WORKDIR_PREFIX));
    }
}
