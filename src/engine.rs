use crate::question::Question;
use crate::session::{QuizResult, QuizSession, Subject};

/// Where questions come from. The SQLite store implements this for the
/// app; tests swap in an in-memory fixture.
pub trait QuestionSource {
    fn subjects(&self) -> rusqlite::Result<Vec<Subject>>;

    /// Questions for one subject, shuffled at the source when asked so
    /// the session always receives an already-permuted list.
    fn questions_for(&self, subject_id: i64, shuffle: bool) -> rusqlite::Result<Vec<Question>>;
}

/// Facade over an optional session plus its question source.
///
/// Adds no quiz logic of its own; every operation guards against the
/// no-session case (queries go empty, mutations return false) so the
/// UI never has to special-case startup.
pub struct QuizEngine<S: QuestionSource> {
    source: S,
    session: Option<QuizSession>,
}

impl<S: QuestionSource> QuizEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            session: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// Start a fresh attempt for `subject`. False when the subject has
    /// no id or no questions; load failures from the store propagate.
    pub fn load_quiz(&mut self, subject: Subject, shuffle: bool) -> rusqlite::Result<bool> {
        let Some(subject_id) = subject.id else {
            return Ok(false);
        };
        let questions = self.source.questions_for(subject_id, shuffle)?;
        if questions.is_empty() {
            return Ok(false);
        }
        self.session = Some(QuizSession::new(subject, questions));
        Ok(true)
    }

    /// Rebuild the session from a freshly loaded (and optionally
    /// reshuffled) question sequence. The old session is discarded
    /// whole; its question list is never mutated in place.
    pub fn restart(&mut self, shuffle: bool) -> rusqlite::Result<bool> {
        let Some(subject) = self.session.as_ref().map(|s| s.subject.clone()) else {
            return Ok(false);
        };
        self.load_quiz(subject, shuffle)
    }

    pub fn end_quiz(&mut self) {
        self.session = None;
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.as_ref()?.current_question()
    }

    /// (1-based current number, total); (0, 0) with no session.
    pub fn question_number(&self) -> (usize, usize) {
        match &self.session {
            Some(s) if !s.is_empty() => (s.current_index() + 1, s.total_questions()),
            _ => (0, 0),
        }
    }

    pub fn total_questions(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.total_questions())
    }

    /// Record an answer for the question the cursor is on.
    pub fn save_answer(&mut self, submitted: &[String]) -> bool {
        match &mut self.session {
            Some(s) => {
                let idx = s.current_index();
                s.save_answer(idx, submitted)
            }
            None => false,
        }
    }

    pub fn current_answer(&self) -> Option<&[String]> {
        self.session.as_ref()?.current_answer()
    }

    pub fn answer_at(&self, index: usize) -> Option<&[String]> {
        self.session.as_ref()?.answer_at(index)
    }

    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.session.as_ref()?.question_at(index)
    }

    pub fn next_question(&mut self) -> bool {
        self.session.as_mut().is_some_and(|s| s.advance())
    }

    pub fn previous_question(&mut self) -> bool {
        self.session.as_mut().is_some_and(|s| s.retreat())
    }

    pub fn go_to_question(&mut self, index: usize) -> bool {
        self.session.as_mut().is_some_and(|s| s.go_to(index))
    }

    pub fn is_first_question(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_first())
    }

    pub fn is_last_question(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_last())
    }

    pub fn unanswered_questions(&self) -> Vec<usize> {
        self.session
            .as_ref()
            .map_or_else(Vec::new, |s| s.unanswered_question_numbers())
    }

    pub fn has_unanswered_questions(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.has_unanswered())
    }

    pub fn progress_percentage(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.progress_percentage())
    }

    pub fn calculate_results(&mut self) -> Option<QuizResult> {
        self.session.as_mut().map(|s| s.build_result())
    }
}
