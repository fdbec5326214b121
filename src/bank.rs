use crate::question::{Question, QuestionKind, ValidationError};
use crate::store::QuizDb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read bank file: {0}")]
    Io(#[from] std::io::Error),
    #[error("bank file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid question in bank: {0}")]
    Validation(#[from] ValidationError),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("no subject named `{0}` in the database")]
    UnknownSubject(String),
}

/// Legacy bank files write `correct_answer` either as one key or as a
/// list of keys. The ambiguity is absorbed here, at the boundary; the
/// rest of the crate only ever sees a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_keys(self) -> Vec<String> {
        match self {
            OneOrMany::One(key) => vec![key],
            OneOrMany::Many(keys) => keys,
        }
    }
}

/// One record of the on-disk bank format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: BTreeMap<String, String>,
    pub correct_answer: OneOrMany,
}

#[derive(Debug, Serialize, Deserialize)]
struct BankFile {
    quiz: Vec<BankQuestion>,
}

impl TryFrom<BankQuestion> for Question {
    type Error = ValidationError;

    fn try_from(raw: BankQuestion) -> Result<Self, Self::Error> {
        Question::new(
            raw.question,
            raw.kind,
            raw.options,
            raw.correct_answer.into_keys(),
        )
    }
}

/// Parse a bank file's JSON into validated questions. An invalid
/// record fails the whole parse; partial imports would hide bad data.
pub fn parse_bank(json: &str) -> Result<Vec<Question>, BankError> {
    let file: BankFile = serde_json::from_str(json)?;
    file.quiz
        .into_iter()
        .map(|raw| Question::try_from(raw).map_err(BankError::from))
        .collect()
}

/// Import a bank file into the store under `subject_name`, creating
/// the subject if needed. Returns the number of imported questions.
pub fn import_bank(
    db: &mut QuizDb,
    subject_name: &str,
    path: &Path,
) -> Result<usize, BankError> {
    let json = std::fs::read_to_string(path)?;
    let questions = parse_bank(&json)?;

    let subject_id = db.ensure_subject(subject_name, "")?;
    for question in &questions {
        db.add_question(subject_id, question)?;
    }
    Ok(questions.len())
}

/// Serialize a subject's questions back to the bank format. Correct
/// answers are always written as lists.
pub fn export_bank(db: &QuizDb, subject_name: &str) -> Result<String, BankError> {
    let subject = db
        .subject_by_name(subject_name)?
        .ok_or_else(|| BankError::UnknownSubject(subject_name.to_string()))?;
    let subject_id = subject.id.unwrap_or_default();

    let quiz = db
        .questions_with_ids(subject_id)?
        .into_iter()
        .map(|(_, q)| BankQuestion {
            question: q.text.clone(),
            kind: q.kind,
            options: q.options.clone(),
            correct_answer: OneOrMany::Many(q.correct_keys().to_vec()),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&BankFile { quiz })?)
}

/// Write `export_bank` output to a file.
pub fn export_bank_to_file(
    db: &QuizDb,
    subject_name: &str,
    path: &Path,
) -> Result<(), BankError> {
    let json = export_bank(db, subject_name)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn scalar_correct_answer_becomes_one_element_list() {
        let json = r#"
        {
            "quiz": [
                {
                    "question": "What does ownership prevent?",
                    "type": "multiple_choice",
                    "options": {"A": "data races", "B": "typos"},
                    "correct_answer": "A"
                }
            ]
        }
        "#;

        let questions = parse_bank(json).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_keys(), &["A".to_string()]);
        assert_eq!(questions[0].kind, QuestionKind::Single);
    }

    #[test]
    fn list_correct_answer_is_normalized() {
        let json = r#"
        {
            "quiz": [
                {
                    "question": "Pick the integer types",
                    "type": "multi_select",
                    "options": {"A": "i32", "B": "f64", "C": "u8"},
                    "correct_answer": ["C", "A", "C"]
                }
            ]
        }
        "#;

        let questions = parse_bank(json).unwrap();
        assert_eq!(
            questions[0].correct_keys(),
            &["A".to_string(), "C".to_string()]
        );
        assert_eq!(questions[0].kind, QuestionKind::Multi);
    }

    #[test]
    fn invalid_record_fails_the_parse() {
        let json = r#"
        {
            "quiz": [
                {
                    "question": "Broken",
                    "type": "multiple_choice",
                    "options": {"A": "one"},
                    "correct_answer": "Z"
                }
            ]
        }
        "#;

        assert_matches!(parse_bank(json), Err(BankError::Validation(_)));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let json = r#"
        {
            "quiz": [
                {
                    "question": "Essay time",
                    "type": "essay",
                    "options": {"A": "one"},
                    "correct_answer": "A"
                }
            ]
        }
        "#;

        assert_matches!(parse_bank(json), Err(BankError::Json(_)));
    }

    #[test]
    fn import_then_export_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let bank_path = dir.path().join("rust.json");
        std::fs::write(
            &bank_path,
            r#"
            {
                "quiz": [
                    {
                        "question": "Pick two",
                        "type": "multi_select",
                        "options": {"A": "one", "B": "two", "C": "three"},
                        "correct_answer": ["C", "A"]
                    },
                    {
                        "question": "Pick one",
                        "type": "multiple_choice",
                        "options": {"A": "one", "B": "two"},
                        "correct_answer": "B"
                    }
                ]
            }
            "#,
        )
        .unwrap();

        let mut db = QuizDb::open_in_memory().unwrap();
        let imported = import_bank(&mut db, "Rust", &bank_path).unwrap();
        assert_eq!(imported, 2);

        let exported = export_bank(&db, "Rust").unwrap();
        let reparsed = parse_bank(&exported).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].text, "Pick two");
        assert_eq!(
            reparsed[0].correct_keys(),
            &["A".to_string(), "C".to_string()]
        );
        assert_eq!(reparsed[1].correct_keys(), &["B".to_string()]);
    }

    #[test]
    fn export_unknown_subject_is_an_error() {
        let db = QuizDb::open_in_memory().unwrap();
        assert_matches!(
            export_bank(&db, "Nope"),
            Err(BankError::UnknownSubject(_))
        );
    }
}
