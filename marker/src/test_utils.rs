//! Builders for gradebook databases used by tests across the workspace.
//!
//! The schema is the subset of the nbgrader gradebook that score lookup reads.

use sea_orm::{ConnectionTrait, Database, DbBackend, Statement, Value};
use std::path::Path;

const SCHEMA: [&str; 7] = [
    "CREATE TABLE assignment (id TEXT PRIMARY KEY, name TEXT NOT NULL UNIQUE)",
    "CREATE TABLE student (id TEXT PRIMARY KEY)",
    "CREATE TABLE notebook (id TEXT PRIMARY KEY, name TEXT NOT NULL, assignment_id TEXT NOT NULL)",
    "CREATE TABLE grade_cells (id TEXT PRIMARY KEY, name TEXT NOT NULL, max_score REAL NOT NULL, \
     cell_type TEXT NOT NULL, notebook_id TEXT NOT NULL)",
    "CREATE TABLE submitted_assignment (id TEXT PRIMARY KEY, assignment_id TEXT NOT NULL, \
     student_id TEXT NOT NULL)",
    "CREATE TABLE submitted_notebook (id TEXT PRIMARY KEY, assignment_id TEXT NOT NULL, \
     notebook_id TEXT NOT NULL, student_id TEXT NOT NULL)",
    "CREATE TABLE grade (id TEXT PRIMARY KEY, cell_id TEXT NOT NULL, notebook_id TEXT NOT NULL, \
     auto_score REAL, manual_score REAL, extra_credit REAL)",
];

/// One grade cell and the grade recorded for it.
#[derive(Debug, Clone)]
pub struct GradeRow {
    pub name: String,
    pub cell_type: &'static str,
    pub max_score: f64,
    pub auto_score: Option<f64>,
    pub manual_score: Option<f64>,
}

impl GradeRow {
    pub fn code(name: &str, max_score: f64, auto: Option<f64>, manual: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            cell_type: "code",
            max_score,
            auto_score: auto,
            manual_score: manual,
        }
    }

    pub fn markdown(name: &str, max_score: f64, manual: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            cell_type: "markdown",
            max_score,
            auto_score: None,
            manual_score: manual,
        }
    }
}

/// Writes a fresh gradebook at `path` holding one graded submission of `assignment` by `student`.
pub async fn create_gradebook(path: &Path, assignment: &str, student: &str, grades: &[GradeRow]) {
    if path.exists() {
        std::fs::remove_file(path).expect("remove old gradebook");
    }
    let db = Database::connect(format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("open gradebook");

    for sql in SCHEMA {
        db.execute(Statement::from_string(DbBackend::Sqlite, sql))
            .await
            .expect("create gradebook table");
    }

    let insert = |sql: &str, values: Vec<Value>| {
        Statement::from_sql_and_values(DbBackend::Sqlite, sql, values)
    };

    let statements = vec![
        insert(
            "INSERT INTO assignment (id, name) VALUES (?, ?)",
            vec!["a1".into(), assignment.into()],
        ),
        insert("INSERT INTO student (id) VALUES (?)", vec![student.into()]),
        insert(
            "INSERT INTO notebook (id, name, assignment_id) VALUES (?, ?, ?)",
            vec!["n1".into(), assignment.into(), "a1".into()],
        ),
        insert(
            "INSERT INTO submitted_assignment (id, assignment_id, student_id) VALUES (?, ?, ?)",
            vec!["sa1".into(), "a1".into(), student.into()],
        ),
        insert(
            "INSERT INTO submitted_notebook (id, assignment_id, notebook_id, student_id) \
             VALUES (?, ?, ?, ?)",
            vec!["sn1".into(), "sa1".into(), "n1".into(), student.into()],
        ),
    ];
    for stmt in statements {
        db.execute(stmt).await.expect("seed gradebook");
    }

    for (i, row) in grades.iter().enumerate() {
        let cell_id = format!("gc{i}");
        db.execute(insert(
            "INSERT INTO grade_cells (id, name, max_score, cell_type, notebook_id) \
             VALUES (?, ?, ?, ?, ?)",
            vec![
                cell_id.clone().into(),
                row.name.clone().into(),
                row.max_score.into(),
                row.cell_type.into(),
                "n1".into(),
            ],
        ))
        .await
        .expect("insert grade cell");
        db.execute(insert(
            "INSERT INTO grade (id, cell_id, notebook_id, auto_score, manual_score, extra_credit) \
             VALUES (?, ?, ?, ?, ?, NULL)",
            vec![
                format!("g{i}").into(),
                cell_id.into(),
                "sn1".into(),
                row.auto_score.into(),
                row.manual_score.into(),
            ],
        ))
        .await
        .expect("insert grade");
    }

    db.close().await.expect("close gradebook");
}
