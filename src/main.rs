mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use kwiz::{
    bank,
    config::{Config, ConfigStore, FileConfigStore},
    engine::{QuestionSource, QuizEngine},
    history,
    question::{Question, QuestionKind},
    runtime::{CrosstermEventSource, QuizEvent, Runner},
    session::{QuizResult, Subject},
    store::QuizDb,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    collections::BTreeSet,
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// terminal quiz runner with subject banks and score review
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal quiz runner: pick a subject, answer single- and multi-select questions, get a scored review. Question banks live in a local SQLite database and can be imported from JSON."
)]
pub struct Cli {
    /// database file to use instead of the default state directory
    #[clap(short = 'd', long)]
    database: Option<PathBuf>,

    /// start directly in this subject
    #[clap(short = 's', long)]
    subject: Option<String>,

    /// keep questions in stored order instead of shuffling
    #[clap(long)]
    no_shuffle: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// import a JSON question bank into a subject
    Import {
        subject: String,
        file: PathBuf,
    },
    /// export a subject's questions as a JSON bank
    Export {
        subject: String,
        /// write here instead of stdout
        file: Option<PathBuf>,
    },
    /// list subjects and their question counts
    Subjects,
    /// create a subject
    AddSubject {
        name: String,
        #[clap(long, default_value = "")]
        description: String,
    },
    /// rename or redescribe a subject
    EditSubject {
        name: String,
        /// new subject name
        #[clap(long)]
        rename: Option<String>,
        /// new description
        #[clap(long)]
        description: Option<String>,
    },
    /// remove a subject and all of its questions
    RemoveSubject {
        name: String,
    },
    /// list a subject's questions with their ids
    Questions {
        subject: String,
    },
    /// add one question to a subject
    AddQuestion {
        subject: String,
        /// question text
        #[clap(long)]
        text: String,
        /// option as KEY=LABEL, repeatable
        #[clap(long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
        /// correct option key, repeatable
        #[clap(long = "correct")]
        correct: Vec<String>,
        /// present as multi select (checkboxes)
        #[clap(long)]
        multi: bool,
    },
    /// replace a question's text, options, and correct keys by id
    EditQuestion {
        id: i64,
        /// question text
        #[clap(long)]
        text: String,
        /// option as KEY=LABEL, repeatable
        #[clap(long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
        /// correct option key, repeatable
        #[clap(long = "correct")]
        correct: Vec<String>,
        /// present as multi select (checkboxes)
        #[clap(long)]
        multi: bool,
    },
    /// remove a question by id
    RemoveQuestion {
        id: i64,
    },
    /// show past quiz results
    History,
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, label)) if !key.is_empty() && !label.is_empty() => {
            Ok((key.to_string(), label.to_string()))
        }
        _ => Err(format!("expected KEY=LABEL, got `{}`", s)),
    }
}

/// Which screen the app is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    SubjectSelect,
    Taking,
    ConfirmSubmit,
    Results,
    Review,
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub engine: QuizEngine<QuizDb>,
    pub screen: Screen,
    /// Subjects with their question counts, for the picker.
    pub subjects: Vec<(Subject, i64)>,
    pub subject_cursor: usize,
    pub option_cursor: usize,
    /// Working selection for the question under the cursor; committed
    /// into the session on navigation and submission.
    pub selected: BTreeSet<String>,
    pub result: Option<QuizResult>,
    pub review_index: usize,
    pub shuffle: bool,
    pub status: Option<String>,
    /// Where finished results get logged; None disables the log.
    pub history_path: Option<PathBuf>,
    config: Config,
    config_store: FileConfigStore,
}

impl App {
    pub fn new(
        db: QuizDb,
        config: Config,
        config_store: FileConfigStore,
        shuffle: bool,
    ) -> rusqlite::Result<Self> {
        let mut app = Self {
            engine: QuizEngine::new(db),
            screen: Screen::SubjectSelect,
            subjects: Vec::new(),
            subject_cursor: 0,
            option_cursor: 0,
            selected: BTreeSet::new(),
            result: None,
            review_index: 0,
            shuffle,
            status: None,
            history_path: history::default_history_path(),
            config,
            config_store,
        };
        app.reload_subjects()?;
        Ok(app)
    }

    pub fn reload_subjects(&mut self) -> rusqlite::Result<()> {
        let subjects = self.engine.source().subjects()?;
        let mut with_counts = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let count = match subject.id {
                Some(id) => self.engine.source().question_count(id)?,
                None => 0,
            };
            with_counts.push((subject, count));
        }
        self.subjects = with_counts;
        if self.subject_cursor >= self.subjects.len() {
            self.subject_cursor = self.subjects.len().saturating_sub(1);
        }
        Ok(())
    }

    /// Move the picker cursor to `name`, if that subject exists.
    pub fn preselect_subject(&mut self, name: &str) {
        if let Some(pos) = self.subjects.iter().position(|(s, _)| s.name == name) {
            self.subject_cursor = pos;
        }
    }

    fn start_quiz(&mut self) {
        let Some((subject, _)) = self.subjects.get(self.subject_cursor).cloned() else {
            return;
        };
        match self.engine.load_quiz(subject.clone(), self.shuffle) {
            Ok(true) => {
                self.screen = Screen::Taking;
                self.result = None;
                self.sync_selection();
                self.config.last_subject = Some(subject.name);
                let _ = self.config_store.save(&self.config);
            }
            Ok(false) => {
                self.status = Some(format!("`{}` has no questions yet", subject.name));
            }
            Err(e) => {
                self.status = Some(format!("failed to load quiz: {}", e));
            }
        }
    }

    /// Pull the stored answer for the current question into the
    /// working selection and reset the option cursor.
    fn sync_selection(&mut self) {
        self.selected = self
            .engine
            .current_answer()
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        self.option_cursor = 0;
    }

    fn commit_selection(&mut self) {
        let keys: Vec<String> = self.selected.iter().cloned().collect();
        self.engine.save_answer(&keys);
    }

    fn option_key_at_cursor(&self) -> Option<String> {
        let question = self.engine.current_question()?;
        question.options.keys().nth(self.option_cursor).cloned()
    }

    fn toggle_current_option(&mut self) {
        let Some(key) = self.option_key_at_cursor() else {
            return;
        };
        let Some(question) = self.engine.current_question() else {
            return;
        };
        if self.selected.contains(&key) {
            self.selected.remove(&key);
        } else {
            if question.kind == QuestionKind::Single {
                // radio semantics: one selection at a time
                self.selected.clear();
            }
            self.selected.insert(key);
        }
    }

    fn go_next(&mut self) {
        self.commit_selection();
        if self.engine.next_question() {
            self.sync_selection();
        }
    }

    fn go_previous(&mut self) {
        self.commit_selection();
        if self.engine.previous_question() {
            self.sync_selection();
        }
    }

    fn request_submit(&mut self) {
        self.commit_selection();
        if self.engine.has_unanswered_questions() {
            self.screen = Screen::ConfirmSubmit;
        } else {
            self.submit();
        }
    }

    fn submit(&mut self) {
        self.commit_selection();
        if let Some(result) = self.engine.calculate_results() {
            if let Some(path) = self.history_path.as_deref() {
                if let Err(e) = history::append_result(path, &result) {
                    self.status = Some(format!("could not record history: {}", e));
                }
            }
            self.result = Some(result);
            self.review_index = 0;
            self.screen = Screen::Results;
        }
    }

    fn restart(&mut self) {
        match self.engine.restart(self.shuffle) {
            Ok(true) => {
                self.result = None;
                self.screen = Screen::Taking;
                self.sync_selection();
            }
            Ok(false) => {}
            Err(e) => self.status = Some(format!("failed to restart: {}", e)),
        }
    }

    fn back_to_subjects(&mut self) {
        self.engine.end_quiz();
        self.result = None;
        self.screen = Screen::SubjectSelect;
        let _ = self.reload_subjects();
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        self.status = None;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        match self.screen {
            Screen::SubjectSelect => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.subject_cursor = self.subject_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.subject_cursor + 1 < self.subjects.len() {
                        self.subject_cursor += 1;
                    }
                }
                KeyCode::Enter => self.start_quiz(),
                _ => {}
            },
            Screen::Taking => match key.code {
                KeyCode::Esc => self.back_to_subjects(),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.option_cursor = self.option_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let count = self
                        .engine
                        .current_question()
                        .map_or(0, |q| q.options.len());
                    if self.option_cursor + 1 < count {
                        self.option_cursor += 1;
                    }
                }
                KeyCode::Char(' ') => self.toggle_current_option(),
                KeyCode::Left | KeyCode::Char('p') => self.go_previous(),
                KeyCode::Right | KeyCode::Char('n') => self.go_next(),
                KeyCode::Enter => {
                    if self.engine.is_last_question() {
                        self.request_submit();
                    } else {
                        self.go_next();
                    }
                }
                KeyCode::Char('s') => self.request_submit(),
                _ => {}
            },
            Screen::ConfirmSubmit => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.submit(),
                KeyCode::Char('n') | KeyCode::Esc => self.screen = Screen::Taking,
                _ => {}
            },
            Screen::Results => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.back_to_subjects(),
                KeyCode::Char('r') => self.restart(),
                KeyCode::Char('v') => {
                    if self
                        .result
                        .as_ref()
                        .is_some_and(|r| !r.question_results.is_empty())
                    {
                        self.review_index = 0;
                        self.screen = Screen::Review;
                    }
                }
                _ => {}
            },
            Screen::Review => match key.code {
                KeyCode::Esc | KeyCode::Char('b') => self.screen = Screen::Results,
                KeyCode::Left | KeyCode::Char('p') => {
                    self.review_index = self.review_index.saturating_sub(1);
                }
                KeyCode::Right | KeyCode::Char('n') => {
                    let total = self.result.as_ref().map_or(0, |r| r.question_results.len());
                    if self.review_index + 1 < total {
                        self.review_index += 1;
                    }
                }
                KeyCode::Char('r') => self.restart(),
                _ => {}
            },
        }
        Flow::Continue
    }
}

fn open_db(cli: &Cli, config: &Config) -> rusqlite::Result<QuizDb> {
    match cli.database.as_ref().or(config.database_path.as_ref()) {
        Some(path) => QuizDb::open_at(path),
        None => QuizDb::new(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let config = config_store.load();

    if let Some(command) = cli.command.clone() {
        let db = open_db(&cli, &config)?;
        return run_command(command, db);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let db = open_db(&cli, &config)?;
    let shuffle = !cli.no_shuffle && config.shuffle;
    let mut app = App::new(db, config, config_store, shuffle)?;
    if let Some(name) = cli
        .subject
        .clone()
        .or_else(|| app.config.last_subject.clone())
    {
        app.preselect_subject(&name);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    loop {
        terminal.draw(|f| ui::ui(app, f))?;

        match runner.step() {
            QuizEvent::Tick | QuizEvent::Resize => {}
            QuizEvent::Key(key) => {
                if app.handle_key(key) == Flow::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn run_command(command: Command, mut db: QuizDb) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Import { subject, file } => {
            let imported = bank::import_bank(&mut db, &subject, &file)?;
            println!("imported {} questions into `{}`", imported, subject);
        }
        Command::Export { subject, file } => {
            match file {
                Some(path) => {
                    bank::export_bank_to_file(&db, &subject, &path)?;
                    println!("exported `{}` to {}", subject, path.display());
                }
                None => println!("{}", bank::export_bank(&db, &subject)?),
            }
        }
        Command::Subjects => {
            let subjects = db.list_subjects()?;
            if subjects.is_empty() {
                println!("no subjects; add one with `kwiz add-subject` or `kwiz import`");
            }
            for subject in subjects {
                let count = subject.id.map_or(0, |id| db.question_count(id).unwrap_or(0));
                if subject.description.is_empty() {
                    println!("{} ({} questions)", subject.name, count);
                } else {
                    println!("{} ({} questions) - {}", subject.name, count, subject.description);
                }
            }
        }
        Command::AddSubject { name, description } => {
            db.add_subject(&name, &description)?;
            println!("added subject `{}`", name);
        }
        Command::EditSubject {
            name,
            rename,
            description,
        } => {
            let Some(subject) = db.subject_by_name(&name)? else {
                return Err(format!("no subject named `{}`", name).into());
            };
            let new_name = rename.unwrap_or(subject.name);
            let new_description = description.unwrap_or(subject.description);
            db.update_subject(subject.id.unwrap_or_default(), &new_name, &new_description)?;
            println!("updated subject `{}`", new_name);
        }
        Command::RemoveSubject { name } => {
            let Some(subject) = db.subject_by_name(&name)? else {
                return Err(format!("no subject named `{}`", name).into());
            };
            db.delete_subject(subject.id.unwrap_or_default())?;
            println!("removed subject `{}`", name);
        }
        Command::Questions { subject } => {
            let Some(found) = db.subject_by_name(&subject)? else {
                return Err(format!("no subject named `{}`", subject).into());
            };
            for (id, question) in db.questions_with_ids(found.id.unwrap_or_default())? {
                println!("{:>5}  [{}]  {}", id, question.kind, question.truncated_text(60));
            }
        }
        Command::AddQuestion {
            subject,
            text,
            options,
            correct,
            multi,
        } => {
            let kind = if multi {
                QuestionKind::Multi
            } else {
                QuestionKind::Single
            };
            let question = Question::new(text, kind, options.into_iter().collect(), correct)?;
            let subject_id = db.ensure_subject(&subject, "")?;
            let id = db.add_question(subject_id, &question)?;
            println!("added question {} to `{}`", id, subject);
        }
        Command::EditQuestion {
            id,
            text,
            options,
            correct,
            multi,
        } => {
            let kind = if multi {
                QuestionKind::Multi
            } else {
                QuestionKind::Single
            };
            let question = Question::new(text, kind, options.into_iter().collect(), correct)?;
            if !db.update_question(id, &question)? {
                return Err(format!("no question with id {}", id).into());
            }
            println!("updated question {}", id);
        }
        Command::RemoveQuestion { id } => {
            db.delete_question(id)?;
            println!("removed question {}", id);
        }
        Command::History => {
            let Some(path) = history::default_history_path() else {
                return Err("cannot locate the history file".into());
            };
            let entries = history::load_history(&path)?;
            if entries.is_empty() {
                println!("no quiz history yet");
            }
            for entry in entries {
                println!(
                    "{}  {:<20} {}/{} ({:.1}%)  {}",
                    entry.date, entry.subject, entry.correct, entry.total, entry.percentage,
                    entry.rating
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    // Each test gets its own config dir; the TempDir guard keeps it
    // alive (and isolated) for the app's lifetime.
    fn seeded_app() -> (App, tempfile::TempDir) {
        let mut db = QuizDb::open_in_memory().unwrap();
        let subject_id = db.add_subject("Rust", "").unwrap();
        for i in 0..3 {
            let options: BTreeMap<String, String> = [("A", "one"), ("B", "two")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let q = Question::new(
                format!("q{}", i),
                QuestionKind::Single,
                options,
                vec!["A".to_string()],
            )
            .unwrap();
            db.add_question(subject_id, &q).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        // shuffle off so tests see stored question order
        let mut app = App::new(db, Config::default(), store, false).unwrap();
        app.history_path = None;
        (app, dir)
    }

    #[test]
    fn enter_on_subject_starts_a_quiz() {
        let (mut app, _dir) = seeded_app();
        assert_eq!(app.screen, Screen::SubjectSelect);
        assert_eq!(app.subjects.len(), 1);
        assert_eq!(app.subjects[0].1, 3);

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Taking);
        assert_eq!(app.engine.question_number(), (1, 3));
    }

    #[test]
    fn space_selects_and_enter_advances() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.selected.contains("A"));

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.engine.question_number(), (2, 3));
        assert_eq!(app.engine.answer_at(0).unwrap(), &["A".to_string()][..]);
    }

    #[test]
    fn radio_selection_replaces_previous_choice() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char(' '))); // select A
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Char(' '))); // select B, drops A

        assert!(!app.selected.contains("A"));
        assert!(app.selected.contains("B"));
    }

    #[test]
    fn left_arrow_preserves_answer_when_returning() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Left));

        assert_eq!(app.engine.question_number(), (1, 3));
        assert!(app.selected.contains("A"));
    }

    #[test]
    fn submit_with_gaps_asks_for_confirmation() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.screen, Screen::ConfirmSubmit);

        app.handle_key(key(KeyCode::Char('n')));
        assert_eq!(app.screen, Screen::Taking);

        app.handle_key(key(KeyCode::Char('s')));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.screen, Screen::Results);
        assert_eq!(app.result.as_ref().unwrap().correct_answers, 0);
    }

    #[test]
    fn full_run_scores_and_reviews() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));

        // answer all three with A (correct), Enter past each
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Char(' ')));
            app.handle_key(key(KeyCode::Enter));
        }
        assert_eq!(app.screen, Screen::Results);
        let result = app.result.as_ref().unwrap();
        assert_eq!(result.correct_answers, 3);
        assert_eq!(result.percentage, 100.0);

        app.handle_key(key(KeyCode::Char('v')));
        assert_eq!(app.screen, Screen::Review);
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.review_index, 1);
        app.handle_key(key(KeyCode::Char('b')));
        assert_eq!(app.screen, Screen::Results);
    }

    #[test]
    fn restart_from_results_clears_answers() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Char(' ')));
            app.handle_key(key(KeyCode::Enter));
        }
        assert_eq!(app.screen, Screen::Results);

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.screen, Screen::Taking);
        assert_eq!(app.engine.question_number(), (1, 3));
        assert_eq!(app.engine.unanswered_questions(), vec![1, 2, 3]);
    }

    #[test]
    fn escape_from_quiz_returns_to_subjects() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::SubjectSelect);
        assert!(!app.engine.has_session());
    }

    #[test]
    fn starting_a_quiz_remembers_the_subject() {
        let (mut app, _dir) = seeded_app();
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.config.last_subject.as_deref(), Some("Rust"));
        // persisted through this app's own store, not a shared path
        assert_eq!(
            app.config_store.load().last_subject.as_deref(),
            Some("Rust")
        );
    }

    #[test]
    fn parse_option_accepts_key_value_pairs() {
        assert_eq!(
            parse_option("A=first option").unwrap(),
            ("A".to_string(), "first option".to_string())
        );
        assert!(parse_option("A").is_err());
        assert!(parse_option("=label").is_err());
    }
}
