use crate::question::{normalize_keys, Question};
use std::fmt;

/// A named question category, as stored in the subjects table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
}

impl Subject {
    pub fn new(id: Option<i64>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Qualitative tier for a final percentage, inclusive on the lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Rating {
    #[strum(serialize = "Excellent work! 🌟")]
    Excellent,
    #[strum(serialize = "Good job! 👍")]
    Good,
    #[strum(serialize = "Not bad! Keep practicing! 📚")]
    Fair,
    #[strum(serialize = "Keep studying! You can do better! 💪")]
    NeedsWork,
}

impl Rating {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Rating::Excellent
        } else if percentage >= 70.0 {
            Rating::Good
        } else if percentage >= 50.0 {
            Rating::Fair
        } else {
            Rating::NeedsWork
        }
    }
}

/// Outcome of one question within a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResult {
    pub question: Question,
    pub submitted: Vec<String>,
    pub is_correct: bool,
}

/// Immutable summary of a completed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub subject: Subject,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub percentage: f64,
    pub rating: Rating,
    pub question_results: Vec<QuestionResult>,
}

impl fmt::Display for QuizResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quiz Results - {}\nScore: {}/{} ({:.1}%)\n{}",
            self.subject.name,
            self.correct_answers,
            self.total_questions,
            self.percentage,
            self.rating
        )
    }
}

/// One in-progress attempt at a subject's question set.
///
/// Owns the question order as supplied by the loader (already shuffled
/// if shuffling was requested), the cursor, and one recorded answer
/// slot per question. Navigation clamps to the question range and
/// reports whether a move happened; out-of-range writes are refused
/// with `false` rather than an error. The question list never changes
/// for the lifetime of the session; restarting means building a new
/// one.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub subject: Subject,
    questions: Vec<Question>,
    current: usize,
    answers: Vec<Option<Vec<String>>>,
    score: usize,
}

impl QuizSession {
    pub fn new(subject: Subject, questions: Vec<Question>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            subject,
            questions,
            current: 0,
            answers,
            score: 0,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 0-based cursor position.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Last computed score; 0 until `compute_score` has run.
    pub fn score(&self) -> usize {
        self.score
    }

    /// Record the submitted keys for question `index`, normalized to
    /// sorted deduplicated form. An empty submission clears the slot
    /// back to unanswered. Returns false for an out-of-range index.
    pub fn save_answer(&mut self, index: usize, submitted: &[String]) -> bool {
        if index >= self.answers.len() {
            return false;
        }
        self.answers[index] = if submitted.is_empty() {
            None
        } else {
            Some(normalize_keys(submitted))
        };
        true
    }

    /// The stored answer for question `index`, if any.
    pub fn answer_at(&self, index: usize) -> Option<&[String]> {
        self.answers.get(index).and_then(|a| a.as_deref())
    }

    pub fn current_answer(&self) -> Option<&[String]> {
        self.answer_at(self.current)
    }

    /// Move forward one question. False when already on the last.
    pub fn advance(&mut self) -> bool {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Move back one question. False when already on the first.
    pub fn retreat(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jump straight to `index`; false leaves the cursor untouched.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index < self.questions.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        !self.questions.is_empty() && self.current == self.questions.len() - 1
    }

    /// 1-based positions still missing an answer, in question order.
    pub fn unanswered_question_numbers(&self) -> Vec<usize> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(i, _)| i + 1)
            .collect()
    }

    pub fn has_unanswered(&self) -> bool {
        self.answers.iter().any(|a| a.is_none())
    }

    /// Recount correct answers from scratch. Unanswered questions score
    /// as incorrect; they are never dropped from the denominator.
    pub fn compute_score(&mut self) -> usize {
        self.score = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| match a {
                Some(keys) => q.is_answer_correct(keys),
                None => false,
            })
            .count();
        self.score
    }

    pub fn percentage(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.score as f64 / self.questions.len() as f64) * 100.0
    }

    pub fn performance_rating(&self) -> Rating {
        Rating::from_percentage(self.percentage())
    }

    /// How far through the quiz the cursor is, as a percentage.
    pub fn progress_percentage(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.current as f64 / self.questions.len() as f64) * 100.0
    }

    /// Score the session and snapshot the full per-question outcome in
    /// original question order. Leaves the cursor where it is.
    pub fn build_result(&mut self) -> QuizResult {
        let score = self.compute_score();
        let percentage = self.percentage();
        let rating = self.performance_rating();

        let question_results = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| {
                let submitted = a.clone().unwrap_or_default();
                let is_correct = q.is_answer_correct(&submitted);
                QuestionResult {
                    question: q.clone(),
                    submitted,
                    is_correct,
                }
            })
            .collect();

        QuizResult {
            subject: self.subject.clone(),
            total_questions: self.questions.len(),
            correct_answers: score,
            percentage,
            rating,
            question_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::QuestionKind;
    use std::collections::BTreeMap;

    fn question(text: &str, correct: &[&str]) -> Question {
        let options: BTreeMap<String, String> = [("A", "one"), ("B", "two"), ("C", "three")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let kind = if correct.len() > 1 {
            QuestionKind::Multi
        } else {
            QuestionKind::Single
        };
        Question::new(
            text,
            kind,
            options,
            correct.iter().map(|k| k.to_string()).collect(),
        )
        .unwrap()
    }

    fn session(n: usize) -> QuizSession {
        let questions = (0..n)
            .map(|i| question(&format!("q{}", i), &["A"]))
            .collect();
        QuizSession::new(Subject::new(Some(1), "Rust", ""), questions)
    }

    fn answer(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn new_session_starts_at_first_question_unanswered() {
        let s = session(3);
        assert_eq!(s.current_index(), 0);
        assert!(s.is_first());
        assert!(!s.is_last());
        assert_eq!(s.score(), 0);
        assert_eq!(s.unanswered_question_numbers(), vec![1, 2, 3]);
        assert_eq!(s.current_question().unwrap().text, "q0");
    }

    #[test]
    fn empty_session_queries_are_harmless() {
        let mut s = session(0);
        assert!(s.current_question().is_none());
        assert!(!s.advance());
        assert!(!s.retreat());
        assert!(!s.go_to(0));
        assert!(!s.is_last());
        assert_eq!(s.compute_score(), 0);
        assert_eq!(s.percentage(), 0.0);
        assert_eq!(s.progress_percentage(), 0.0);
        let result = s.build_result();
        assert_eq!(result.total_questions, 0);
        assert_eq!(result.percentage, 0.0);
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut s = session(5);

        assert!(!s.retreat());
        assert_eq!(s.current_index(), 0);

        for _ in 0..4 {
            assert!(s.advance());
        }
        assert_eq!(s.current_index(), 4);
        assert!(s.is_last());
        assert!(!s.advance());
        assert_eq!(s.current_index(), 4);
    }

    #[test]
    fn go_to_rejects_out_of_range() {
        let mut s = session(3);
        assert!(s.go_to(2));
        assert_eq!(s.current_index(), 2);
        assert!(!s.go_to(3));
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn save_answer_normalizes_and_round_trips() {
        let mut s = session(3);
        assert!(s.save_answer(0, &answer(&["C", "A", "C"])));
        assert_eq!(
            s.answer_at(0).unwrap(),
            &["A".to_string(), "C".to_string()][..]
        );
    }

    #[test]
    fn save_answer_empty_clears_slot() {
        let mut s = session(2);
        assert!(s.save_answer(1, &answer(&["A"])));
        assert_eq!(s.unanswered_question_numbers(), vec![1]);
        assert!(s.save_answer(1, &[]));
        assert_eq!(s.unanswered_question_numbers(), vec![1, 2]);
    }

    #[test]
    fn save_answer_out_of_range_is_refused() {
        let mut s = session(2);
        assert!(!s.save_answer(2, &answer(&["A"])));
        assert_eq!(s.unanswered_question_numbers(), vec![1, 2]);
    }

    #[test]
    fn unanswered_numbers_are_one_based() {
        let mut s = session(3);
        s.save_answer(1, &answer(&["A"]));
        assert_eq!(s.unanswered_question_numbers(), vec![1, 3]);
        assert!(s.has_unanswered());
    }

    #[test]
    fn score_counts_correct_answers_only() {
        let mut s = session(4);
        s.save_answer(0, &answer(&["A"])); // correct
        s.save_answer(1, &answer(&["B"])); // wrong
        s.save_answer(2, &answer(&["A"])); // correct
        s.save_answer(3, &answer(&["A"])); // correct

        assert_eq!(s.compute_score(), 3);
        assert_eq!(s.percentage(), 75.0);
        assert!(s.score() <= s.total_questions());
    }

    #[test]
    fn score_is_idempotent() {
        let mut s = session(3);
        s.save_answer(0, &answer(&["A"]));
        let first = s.compute_score();
        let second = s.compute_score();
        assert_eq!(first, second);
        assert_eq!(first, 1);
    }

    #[test]
    fn unanswered_questions_score_as_incorrect() {
        let mut s = session(2);
        s.save_answer(0, &answer(&["A"]));
        assert_eq!(s.compute_score(), 1);
        assert_eq!(s.percentage(), 50.0);
    }

    #[test]
    fn rating_boundaries_are_inclusive() {
        assert_eq!(Rating::from_percentage(90.0), Rating::Excellent);
        assert_eq!(Rating::from_percentage(100.0), Rating::Excellent);
        assert_eq!(Rating::from_percentage(89.999), Rating::Good);
        assert_eq!(Rating::from_percentage(70.0), Rating::Good);
        assert_eq!(Rating::from_percentage(50.0), Rating::Fair);
        assert_eq!(Rating::from_percentage(49.999), Rating::NeedsWork);
        assert_eq!(Rating::from_percentage(0.0), Rating::NeedsWork);
    }

    #[test]
    fn build_result_snapshots_every_question_in_order() {
        let mut s = session(3);
        s.save_answer(0, &answer(&["A"]));
        s.save_answer(2, &answer(&["B"]));
        s.go_to(1);

        let result = s.build_result();

        assert_eq!(result.total_questions, 3);
        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.rating, Rating::NeedsWork);
        assert_eq!(result.question_results.len(), 3);
        assert!(result.question_results[0].is_correct);
        assert!(result.question_results[1].submitted.is_empty());
        assert!(!result.question_results[1].is_correct);
        assert!(!result.question_results[2].is_correct);
        // cursor untouched
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn result_display_summarizes_score() {
        let mut s = session(2);
        s.save_answer(0, &answer(&["A"]));
        s.save_answer(1, &answer(&["A"]));
        let result = s.build_result();
        let text = result.to_string();
        assert!(text.contains("Rust"));
        assert!(text.contains("2/2"));
        assert!(text.contains("100.0%"));
    }

    #[test]
    fn progress_tracks_cursor() {
        let mut s = session(4);
        assert_eq!(s.progress_percentage(), 0.0);
        s.advance();
        assert_eq!(s.progress_percentage(), 25.0);
        s.go_to(3);
        assert_eq!(s.progress_percentage(), 75.0);
    }
}
