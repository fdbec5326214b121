use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when constructing a [`Question`] from raw data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("question text is empty")]
    EmptyText,
    #[error("question has no options")]
    NoOptions,
    #[error("question has no correct answers")]
    NoCorrectAnswers,
    #[error("correct answer `{0}` does not match any option")]
    UnknownCorrectKey(String),
    #[error("unknown question type `{0}`")]
    UnknownKind(String),
}

/// How a question is presented: one selectable answer or several.
///
/// The kind drives rendering (radio vs. checkbox); scoring always goes
/// by the stored correct keys, so the two are kept independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum QuestionKind {
    #[serde(rename = "multiple_choice")]
    #[strum(serialize = "single choice")]
    Single,
    #[serde(rename = "multi_select")]
    #[strum(serialize = "multi select")]
    Multi,
}

impl QuestionKind {
    /// Tag stored in the questions table.
    pub fn db_value(&self) -> &'static str {
        match self {
            QuestionKind::Single => "multiple_choice",
            QuestionKind::Multi => "multi_select",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "multiple_choice" => Some(QuestionKind::Single),
            "multi_select" => Some(QuestionKind::Multi),
            _ => None,
        }
    }
}

/// Sort and deduplicate a set of answer keys into canonical form.
pub fn normalize_keys(keys: &[String]) -> Vec<String> {
    keys.iter().cloned().sorted().dedup().collect()
}

/// One quiz item: prompt, option set, and the canonical correct keys.
/// Immutable once constructed; a session only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub kind: QuestionKind,
    pub options: BTreeMap<String, String>,
    correct_keys: Vec<String>,
}

impl Question {
    /// Build a validated question. Correct keys are normalized (sorted,
    /// deduplicated) here so all later comparisons are order-independent.
    pub fn new(
        text: impl Into<String>,
        kind: QuestionKind,
        options: BTreeMap<String, String>,
        correct_keys: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if options.is_empty() {
            return Err(ValidationError::NoOptions);
        }
        let correct_keys = normalize_keys(&correct_keys);
        if correct_keys.is_empty() {
            return Err(ValidationError::NoCorrectAnswers);
        }
        if let Some(stray) = correct_keys.iter().find(|k| !options.contains_key(*k)) {
            return Err(ValidationError::UnknownCorrectKey(stray.clone()));
        }

        Ok(Self {
            text,
            kind,
            options,
            correct_keys,
        })
    }

    /// Canonical (sorted, deduplicated) correct answer keys.
    pub fn correct_keys(&self) -> &[String] {
        &self.correct_keys
    }

    /// Whether more than one key scores as correct, regardless of kind.
    pub fn is_multi_select(&self) -> bool {
        self.correct_keys.len() > 1
    }

    /// Set equality against the correct keys; an empty submission is
    /// never correct, and duplicate selections collapse.
    pub fn is_answer_correct(&self, submitted: &[String]) -> bool {
        if submitted.is_empty() {
            return false;
        }
        normalize_keys(submitted) == self.correct_keys
    }

    /// Question text cut down for list displays, with a trailing
    /// ellipsis when it does not fit.
    pub fn truncated_text(&self, max_length: usize) -> String {
        if self.text.chars().count() <= max_length {
            return self.text.clone();
        }
        let keep = max_length.saturating_sub(3);
        let head: String = self.text.chars().take(keep).collect();
        format!("{}...", head)
    }
}
