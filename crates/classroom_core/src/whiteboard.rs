//! crates/classroom_core/src/whiteboard.rs
//!
//! The visual aids the tutor draws on the blackboard.
//!
//! Tool arguments come straight from the model and are never trusted: every
//! payload is read field by field and anything missing, mistyped or unparsable
//! falls back to an empty default. Text is revealed progressively; each call to
//! [`Board::tick`] advances the animation by one step.

use serde_json::Value;
use std::fmt;
use tracing::warn;

//=========================================================================================
// Payload Parsing
//=========================================================================================

fn parse_arguments(raw: Option<&str>) -> Value {
    let raw = raw.unwrap_or("{}");
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!("Tool arguments are not an object: {}", other);
            Value::Null
        }
        Err(e) => {
            warn!("Failed to parse tool arguments, using defaults: {}", e);
            Value::Null
        }
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn str_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Arguments of `display_explanation_text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplanationPayload {
    pub title: String,
    pub bullets: Vec<String>,
    pub notes: String,
}

impl ExplanationPayload {
    pub fn from_arguments(raw: Option<&str>) -> Self {
        let value = parse_arguments(raw);
        let mut bullets = str_list(&value, "bullets");
        // Older tool schemas sent a single `text` line instead of bullets.
        let text = str_field(&value, "text");
        if bullets.is_empty() && !text.is_empty() {
            bullets.push(text);
        }
        Self {
            title: str_field(&value, "title"),
            bullets,
            notes: str_field(&value, "notes"),
        }
    }

    /// Notes turn a plain explanation into the detailed variant.
    pub fn is_detailed(&self) -> bool {
        !self.notes.trim().is_empty()
    }
}

/// Arguments of `display_multiple_choice`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipleChoicePayload {
    pub title: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub feedback: String,
}

impl MultipleChoicePayload {
    pub fn from_arguments(raw: Option<&str>) -> Self {
        let value = parse_arguments(raw);
        Self {
            title: str_field(&value, "title"),
            question: str_field(&value, "question"),
            options: str_list(&value, "options"),
            correct_answer: str_field(&value, "correctAnswer"),
            feedback: str_field(&value, "feedback"),
        }
    }
}

/// Arguments of `display_openended_question`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenendedPayload {
    pub question: String,
}

impl OpenendedPayload {
    pub fn from_arguments(raw: Option<&str>) -> Self {
        let value = parse_arguments(raw);
        Self {
            question: str_field(&value, "question"),
        }
    }
}

//=========================================================================================
// Reveal Animations
//=========================================================================================

/// Outcome of one animation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing left to reveal.
    Idle,
    Advanced,
    /// A bullet, the notes or the feedback finished on this step.
    Completed,
}

impl Tick {
    fn merge(self, other: Tick) -> Tick {
        match (self, other) {
            (Tick::Completed, _) | (_, Tick::Completed) => Tick::Completed,
            (Tick::Advanced, _) | (_, Tick::Advanced) => Tick::Advanced,
            _ => Tick::Idle,
        }
    }
}

/// Reveals a text one word per step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordReveal {
    words: Vec<String>,
    visible: usize,
}

impl WordReveal {
    pub fn new(text: &str) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            visible: 0,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.is_done() {
            return Tick::Idle;
        }
        self.visible += 1;
        if self.is_done() {
            Tick::Completed
        } else {
            Tick::Advanced
        }
    }

    pub fn is_done(&self) -> bool {
        self.visible >= self.words.len()
    }

    pub fn visible_text(&self) -> String {
        self.words[..self.visible].join(" ")
    }
}

/// Reveals bullets one after another; a bullet starts only once the previous
/// one is fully shown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulletReveal {
    bullets: Vec<WordReveal>,
    active: usize,
}

impl BulletReveal {
    pub fn new(bullets: &[String]) -> Self {
        Self {
            bullets: bullets.iter().map(|b| WordReveal::new(b)).collect(),
            active: 0,
        }
    }

    pub fn tick(&mut self) -> Tick {
        while let Some(bullet) = self.bullets.get_mut(self.active) {
            if bullet.is_done() {
                self.active += 1;
                continue;
            }
            return bullet.tick();
        }
        Tick::Idle
    }

    pub fn is_done(&self) -> bool {
        self.bullets.iter().all(WordReveal::is_done)
    }

    /// Bullets that have started revealing, with their visible text.
    pub fn visible(&self) -> Vec<String> {
        self.bullets
            .iter()
            .take(self.active + 1)
            .filter(|b| b.visible > 0)
            .map(WordReveal::visible_text)
            .collect()
    }
}

/// Reveals a text one character per step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharReveal {
    chars: Vec<char>,
    visible: usize,
}

impl CharReveal {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            visible: 0,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.is_done() {
            return Tick::Idle;
        }
        self.visible += 1;
        if self.is_done() {
            Tick::Completed
        } else {
            Tick::Advanced
        }
    }

    pub fn is_done(&self) -> bool {
        self.visible >= self.chars.len()
    }

    pub fn visible_text(&self) -> String {
        self.chars[..self.visible].iter().collect()
    }
}

//=========================================================================================
// Boards
//=========================================================================================

/// Which view the whiteboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Empty,
    Explanation,
    DetailedExplanation,
    MultipleChoice,
    OpenendedQuestion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationBoard {
    pub title: String,
    bullets: BulletReveal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedExplanationBoard {
    pub title: String,
    bullets: BulletReveal,
    notes: WordReveal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenendedBoard {
    pub question: String,
}

/// The user's answer to a multiple-choice question, addressed to the tool
/// call that asked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceReport {
    pub choice: String,
    pub call_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipleChoiceBoard {
    pub call_id: String,
    pub title: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    selected: Option<usize>,
    feedback: CharReveal,
}

impl MultipleChoiceBoard {
    pub fn new(payload: MultipleChoicePayload, call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            feedback: CharReveal::new(&payload.feedback),
            title: payload.title,
            question: payload.question,
            options: payload.options,
            correct_answer: payload.correct_answer,
            selected: None,
        }
    }

    /// Picks option `index`. Only the first valid selection counts; it locks
    /// the board and returns the report for the originating tool call.
    pub fn select(&mut self, index: usize) -> Option<ChoiceReport> {
        if self.selected.is_some() {
            return None;
        }
        let choice = self.options.get(index)?.clone();
        self.selected = Some(index);
        Some(ChoiceReport {
            choice,
            call_id: self.call_id.clone(),
        })
    }

    pub fn is_locked(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.selected().map(|choice| choice == self.correct_answer)
    }

    fn tick(&mut self) -> Tick {
        if self.is_locked() {
            self.feedback.tick()
        } else {
            Tick::Idle
        }
    }
}

/// What is currently drawn on the whiteboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Board {
    #[default]
    Empty,
    Explanation(ExplanationBoard),
    DetailedExplanation(DetailedExplanationBoard),
    MultipleChoice(MultipleChoiceBoard),
    OpenendedQuestion(OpenendedBoard),
}

impl Board {
    /// The plain or detailed explanation view, depending on the notes.
    pub fn explanation(payload: ExplanationPayload) -> Self {
        if payload.is_detailed() {
            Board::DetailedExplanation(DetailedExplanationBoard {
                bullets: BulletReveal::new(&payload.bullets),
                notes: WordReveal::new(&payload.notes),
                title: payload.title,
            })
        } else {
            Board::Explanation(ExplanationBoard {
                bullets: BulletReveal::new(&payload.bullets),
                title: payload.title,
            })
        }
    }

    pub fn openended(payload: OpenendedPayload) -> Self {
        Board::OpenendedQuestion(OpenendedBoard {
            question: payload.question,
        })
    }

    pub fn multiple_choice(payload: MultipleChoicePayload, call_id: impl Into<String>) -> Self {
        Board::MultipleChoice(MultipleChoiceBoard::new(payload, call_id))
    }

    pub fn ui_state(&self) -> UiState {
        match self {
            Board::Empty => UiState::Empty,
            Board::Explanation(_) => UiState::Explanation,
            Board::DetailedExplanation(_) => UiState::DetailedExplanation,
            Board::MultipleChoice(_) => UiState::MultipleChoice,
            Board::OpenendedQuestion(_) => UiState::OpenendedQuestion,
        }
    }

    /// Advances every running animation on the board by one step.
    /// Notes reveal alongside the bullets, not after them.
    pub fn tick(&mut self) -> Tick {
        match self {
            Board::Explanation(board) => board.bullets.tick(),
            Board::DetailedExplanation(board) => board.bullets.tick().merge(board.notes.tick()),
            Board::MultipleChoice(board) => board.tick(),
            Board::Empty | Board::OpenendedQuestion(_) => Tick::Idle,
        }
    }

    /// Forwards a selection to a multiple-choice board.
    pub fn select(&mut self, index: usize) -> Option<ChoiceReport> {
        match self {
            Board::MultipleChoice(board) => board.select(index),
            _ => None,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Board::Empty => writeln!(f, "(blackboard is empty)"),
            Board::Explanation(board) => {
                writeln!(f, "== {} ==", board.title)?;
                for bullet in board.bullets.visible() {
                    writeln!(f, "  * {}", bullet)?;
                }
                Ok(())
            }
            Board::DetailedExplanation(board) => {
                writeln!(f, "== {} ==", board.title)?;
                for bullet in board.bullets.visible() {
                    writeln!(f, "  * {}", bullet)?;
                }
                let notes = board.notes.visible_text();
                if !notes.is_empty() {
                    writeln!(f, "  notes: {}", notes)?;
                }
                Ok(())
            }
            Board::OpenendedQuestion(board) => writeln!(f, "?? {}", board.question),
            Board::MultipleChoice(board) => {
                writeln!(f, "== {} ==", board.title)?;
                writeln!(f, "{}", board.question)?;
                for (i, option) in board.options.iter().enumerate() {
                    let mark = match (board.is_locked(), board.selected) {
                        (false, _) => "",
                        (true, _) if *option == board.correct_answer => "  <- correct answer",
                        (true, Some(chosen)) if chosen == i => "  <- your answer",
                        _ => "",
                    };
                    writeln!(f, "  {}) {}{}", i + 1, option, mark)?;
                }
                match board.is_correct() {
                    Some(true) => writeln!(f, "Correct!")?,
                    Some(false) => writeln!(f, "Incorrect")?,
                    None => {}
                }
                let feedback = board.feedback.visible_text();
                if !feedback.is_empty() {
                    writeln!(f, "{}", feedback)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(board: &mut Board) -> usize {
        let mut steps = 0;
        while board.tick() != Tick::Idle {
            steps += 1;
            assert!(steps < 1_000, "animation never settles");
        }
        steps
    }

    #[test]
    fn malformed_arguments_fall_back_to_defaults() {
        for raw in [Some("{"), Some("[1,2]"), Some("null"), None] {
            assert_eq!(ExplanationPayload::from_arguments(raw), ExplanationPayload::default());
            assert_eq!(
                MultipleChoicePayload::from_arguments(raw),
                MultipleChoicePayload::default()
            );
            assert_eq!(OpenendedPayload::from_arguments(raw), OpenendedPayload::default());
        }
        let mut board = Board::explanation(ExplanationPayload::from_arguments(Some("{")));
        assert_eq!(board.ui_state(), UiState::Explanation);
        assert_eq!(run_to_end(&mut board), 0);
        assert_eq!(board.to_string(), "==  ==\n");
    }

    #[test]
    fn mistyped_fields_are_dropped_individually() {
        let payload = ExplanationPayload::from_arguments(Some(
            r#"{"title": 3, "bullets": ["one", 2, "three"], "notes": null}"#,
        ));
        assert_eq!(payload.title, "");
        assert_eq!(payload.bullets, vec!["one", "three"]);
        assert!(!payload.is_detailed());
    }

    #[test]
    fn notes_select_the_detailed_view() {
        let payload = ExplanationPayload::from_arguments(Some(
            r#"{"title":"Cells","bullets":["a b"],"notes":"more detail here"}"#,
        ));
        assert_eq!(Board::explanation(payload).ui_state(), UiState::DetailedExplanation);
    }

    #[test]
    fn bullets_reveal_word_by_word_in_sequence() {
        let mut board = Board::explanation(ExplanationPayload {
            title: "T".into(),
            bullets: vec!["one two".into(), "three".into()],
            notes: String::new(),
        });
        assert_eq!(board.tick(), Tick::Advanced);
        assert_eq!(board.to_string(), "== T ==\n  * one\n");
        assert_eq!(board.tick(), Tick::Completed);
        assert_eq!(board.tick(), Tick::Completed);
        assert_eq!(board.to_string(), "== T ==\n  * one two\n  * three\n");
        assert_eq!(board.tick(), Tick::Idle);
    }

    #[test]
    fn notes_reveal_concurrently_with_bullets() {
        let mut board = Board::explanation(ExplanationPayload {
            title: "T".into(),
            bullets: vec!["a b c".into()],
            notes: "x y".into(),
        });
        board.tick();
        assert_eq!(board.to_string(), "== T ==\n  * a\n  notes: x\n");
        assert_eq!(run_to_end(&mut board), 2);
    }

    #[test]
    fn multiple_choice_locks_after_the_first_selection() {
        let payload = MultipleChoicePayload::from_arguments(Some(
            r#"{"title":"Quiz","question":"2+2?","options":["3","4"],"correctAnswer":"4","feedback":"ok"}"#,
        ));
        let mut board = Board::multiple_choice(payload, "call_7");
        assert_eq!(board.tick(), Tick::Idle, "feedback waits for a selection");

        let report = board.select(0).unwrap();
        assert_eq!(
            report,
            ChoiceReport {
                choice: "3".into(),
                call_id: "call_7".into()
            }
        );
        assert_eq!(board.select(1), None);

        let Board::MultipleChoice(ref mc) = board else {
            unreachable!()
        };
        assert_eq!(mc.selected(), Some("3"));
        assert_eq!(mc.is_correct(), Some(false));

        assert_eq!(run_to_end(&mut board), 2);
        let text = board.to_string();
        assert!(text.contains("2) 4  <- correct answer"));
        assert!(text.contains("1) 3  <- your answer"));
        assert!(text.contains("Incorrect\nok"));
    }

    #[test]
    fn out_of_range_selection_does_not_lock() {
        let mut board = Board::multiple_choice(
            MultipleChoicePayload {
                options: vec!["a".into()],
                ..Default::default()
            },
            "c",
        );
        assert_eq!(board.select(5), None);
        assert!(board.select(0).is_some());
    }

    #[test]
    fn openended_shows_only_the_question() {
        let board = Board::openended(OpenendedPayload::from_arguments(Some(
            r#"{"question":"Why is the sky blue?"}"#,
        )));
        assert_eq!(board.ui_state(), UiState::OpenendedQuestion);
        assert_eq!(board.to_string(), "?? Why is the sky blue?\n");
    }
}
