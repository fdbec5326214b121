use crate::engine::QuestionSource;
use crate::question::{Question, QuestionKind, ValidationError};
use crate::session::Subject;
use directories::ProjectDirs;
use rand::seq::SliceRandom;
use rusqlite::{params, Connection, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// SQLite store for subjects, questions, options, and correct answers.
#[derive(Debug)]
pub struct QuizDb {
    conn: Connection,
}

impl QuizDb {
    /// Open (or create) the database at the default state-dir location.
    pub fn new() -> Result<Self> {
        let db_path = Self::get_db_path().unwrap_or_else(|| PathBuf::from("kwiz.db"));
        Self::open_at(&db_path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(QuizDb { conn })
    }

    /// In-memory database, used by tests and the import dry-run.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(QuizDb { conn })
    }

    /// Get the database file path under $HOME/.local/state/kwiz
    fn get_db_path() -> Option<PathBuf> {
        // Try to use the XDG-compliant ~/.local/state directory first
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join("kwiz");
            Some(state_dir.join("quiz.db"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "kwiz") {
            // Fallback to system-specific directory
            let state_dir = proj_dirs.data_local_dir();
            Some(state_dir.join("quiz.db"))
        } else {
            None
        }
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
                question_text TEXT NOT NULL,
                question_type TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS options (
                question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                option_key TEXT NOT NULL,
                option_text TEXT NOT NULL,
                PRIMARY KEY (question_id, option_key)
            );

            CREATE TABLE IF NOT EXISTS correct_answers (
                question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                answer_key TEXT NOT NULL,
                PRIMARY KEY (question_id, answer_key)
            );

            CREATE INDEX IF NOT EXISTS idx_questions_subject ON questions(subject_id);
            "#,
        )
    }

    pub fn list_subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM subjects ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(Subject::new(
                Some(row.get::<_, i64>(0)?),
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        rows.collect()
    }

    pub fn subject_by_name(&self, name: &str) -> Result<Option<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM subjects WHERE name = ?1")?;

        let mut rows = stmt.query_map([name], |row| {
            Ok(Subject::new(
                Some(row.get::<_, i64>(0)?),
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        rows.next().transpose()
    }

    pub fn add_subject(&self, name: &str, description: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO subjects (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert the subject if it is new, returning its id either way.
    pub fn ensure_subject(&self, name: &str, description: &str) -> Result<i64> {
        if let Some(existing) = self.subject_by_name(name)? {
            return Ok(existing.id.unwrap_or_default());
        }
        self.add_subject(name, description)
    }

    /// Rename or redescribe a subject. False when no row has that id.
    pub fn update_subject(&self, subject_id: i64, name: &str, description: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE subjects SET name = ?1, description = ?2 WHERE id = ?3",
            params![name, description, subject_id],
        )?;
        Ok(changed > 0)
    }

    /// Drops the subject and, via cascade, its questions and answers.
    pub fn delete_subject(&self, subject_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM subjects WHERE id = ?1", params![subject_id])?;
        Ok(())
    }

    pub fn question_count(&self, subject_id: i64) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE subject_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )
    }

    pub fn add_question(&mut self, subject_id: i64, question: &Question) -> Result<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO questions (subject_id, question_text, question_type) VALUES (?1, ?2, ?3)",
            params![subject_id, question.text, question.kind.db_value()],
        )?;
        let question_id = tx.last_insert_rowid();

        for (key, text) in &question.options {
            tx.execute(
                "INSERT INTO options (question_id, option_key, option_text) VALUES (?1, ?2, ?3)",
                params![question_id, key, text],
            )?;
        }

        for key in question.correct_keys() {
            tx.execute(
                "INSERT INTO correct_answers (question_id, answer_key) VALUES (?1, ?2)",
                params![question_id, key],
            )?;
        }

        tx.commit()?;
        Ok(question_id)
    }

    /// Replace a question's text, kind, options, and correct keys in
    /// one transaction. Options and answers are rewritten wholesale;
    /// the question keeps its id. False when no row has that id.
    pub fn update_question(&mut self, question_id: i64, question: &Question) -> Result<bool> {
        let tx = self.conn.transaction()?;

        let changed = tx.execute(
            "UPDATE questions SET question_text = ?1, question_type = ?2 WHERE id = ?3",
            params![question.text, question.kind.db_value(), question_id],
        )?;
        if changed == 0 {
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM options WHERE question_id = ?1",
            params![question_id],
        )?;
        tx.execute(
            "DELETE FROM correct_answers WHERE question_id = ?1",
            params![question_id],
        )?;

        for (key, text) in &question.options {
            tx.execute(
                "INSERT INTO options (question_id, option_key, option_text) VALUES (?1, ?2, ?3)",
                params![question_id, key, text],
            )?;
        }
        for key in question.correct_keys() {
            tx.execute(
                "INSERT INTO correct_answers (question_id, answer_key) VALUES (?1, ?2)",
                params![question_id, key],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn delete_question(&self, question_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM questions WHERE id = ?1", params![question_id])?;
        Ok(())
    }

    /// Questions for a subject with their row ids, in insertion order.
    /// Used by the management screens and the bank exporter.
    pub fn questions_with_ids(&self, subject_id: i64) -> Result<Vec<(i64, Question)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, question_text, question_type
            FROM questions
            WHERE subject_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![subject_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, text, type_tag) = row?;
            out.push((id, self.assemble_question(id, text, &type_tag)?));
        }
        Ok(out)
    }

    /// Questions ready for a session, shuffled here when asked so the
    /// session always receives an already-permuted list.
    pub fn questions_for_subject(&self, subject_id: i64, shuffle: bool) -> Result<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .questions_with_ids(subject_id)?
            .into_iter()
            .map(|(_, q)| q)
            .collect();

        if shuffle {
            questions.shuffle(&mut rand::thread_rng());
        }
        Ok(questions)
    }

    fn assemble_question(&self, question_id: i64, text: String, type_tag: &str) -> Result<Question> {
        let mut stmt = self.conn.prepare(
            "SELECT option_key, option_text FROM options WHERE question_id = ?1 ORDER BY option_key",
        )?;
        let options: BTreeMap<String, String> = stmt
            .query_map(params![question_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<_>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT answer_key FROM correct_answers WHERE question_id = ?1 ORDER BY answer_key",
        )?;
        let correct_keys: Vec<String> = stmt
            .query_map(params![question_id], |row| row.get(0))?
            .collect::<Result<_>>()?;

        let kind = QuestionKind::from_db_value(type_tag).ok_or_else(|| {
            invalid_row(question_id, ValidationError::UnknownKind(type_tag.to_string()))
        })?;

        // A row that fails validation is a corrupt bank entry; surface
        // it instead of silently dropping the question.
        Question::new(text, kind, options, correct_keys).map_err(|e| invalid_row(question_id, e))
    }
}

fn invalid_row(question_id: i64, err: ValidationError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        question_id as usize,
        rusqlite::types::Type::Text,
        Box::new(err),
    )
}

impl QuestionSource for QuizDb {
    fn subjects(&self) -> Result<Vec<Subject>> {
        self.list_subjects()
    }

    fn questions_for(&self, subject_id: i64, shuffle: bool) -> Result<Vec<Question>> {
        self.questions_for_subject(subject_id, shuffle)
    }
}
