use crate::session::QuizResult;
use chrono::Local;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// One finished attempt as logged to history.csv.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub date: String,
    pub subject: String,
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
    pub rating: String,
}

impl HistoryEntry {
    pub fn from_result(result: &QuizResult) -> Self {
        Self {
            date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            subject: result.subject.name.clone(),
            correct: result.correct_answers,
            total: result.total_questions,
            percentage: result.percentage,
            rating: result.rating.to_string(),
        }
    }
}

/// History file path under $HOME/.local/state/kwiz
pub fn default_history_path() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        Some(
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("kwiz")
                .join("history.csv"),
        )
    } else if let Some(proj_dirs) = ProjectDirs::from("", "", "kwiz") {
        Some(proj_dirs.data_local_dir().join("history.csv"))
    } else {
        None
    }
}

/// Append one result row, emitting the header on first write.
pub fn append_result(path: &Path, result: &QuizResult) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let needs_header = !path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer
        .serialize(HistoryEntry::from_result(result))
        .map_err(io::Error::other)?;
    writer.flush()
}

/// Past attempts in file order (oldest first). Missing file reads as
/// an empty history.
pub fn load_history(path: &Path) -> io::Result<Vec<HistoryEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path).map_err(io::Error::other)?;
    reader
        .deserialize()
        .map(|row| row.map_err(io::Error::other))
        .collect()
}
