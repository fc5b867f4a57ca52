//! Practice sessions: flashcards, the fill-in-the-blank word bank and the quiz.
//!
//! These hold only selection and checking state. Generating the exercises is
//! the AI gateway's job; recording the outcome goes through the library.

use rand::seq::SliceRandom;

use crate::ai::{FillInBlanks, Quiz};
use crate::models::display_text;

/// Split text on a blank marker. `n` blanks give `n + 1` parts.
pub fn split_blanks<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    text.split(marker).collect()
}

/// [`split_blanks`] with each part broken into phrases for display.
pub fn phrased_parts(text: &str, marker: &str) -> Vec<String> {
    split_blanks(text, marker).into_iter().map(display_text).collect()
}

// ══════════════════════════════════════════════════════════════════════════
// Flashcards
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Flashcards {
    ids: Vec<String>,
    index: usize,
    flipped: bool,
}

impl Flashcards {
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            index: 0,
            flipped: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.ids.get(self.index).map(String::as_str)
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn next(&mut self) {
        if !self.ids.is_empty() {
            self.index = (self.index + 1) % self.ids.len();
            self.flipped = false;
        }
    }

    pub fn prev(&mut self) {
        if !self.ids.is_empty() {
            self.index = (self.index + self.ids.len() - 1) % self.ids.len();
            self.flipped = false;
        }
    }

    /// Drop an id that no longer exists in the collection.
    pub fn remove(&mut self, id: &str) {
        self.ids.retain(|i| i != id);
        if self.index >= self.ids.len() {
            self.index = 0;
        }
        self.flipped = false;
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Fill in the blanks
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct FillInBlanksSession {
    exercise: FillInBlanks,
    answers: Vec<String>,
    result: Option<bool>,
}

impl FillInBlanksSession {
    pub fn new(exercise: FillInBlanks) -> Self {
        Self {
            exercise,
            answers: Vec::new(),
            result: None,
        }
    }

    pub fn exercise(&self) -> &FillInBlanks {
        &self.exercise
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn blank_count(&self) -> usize {
        self.exercise.correct_words.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.blank_count()
    }

    pub fn result(&self) -> Option<bool> {
        self.result
    }

    /// Choices still in the bank: every choice minus those already placed,
    /// counting duplicates.
    pub fn available(&self) -> Vec<&str> {
        let mut placed: Vec<&str> = self.answers.iter().map(String::as_str).collect();
        let mut out = Vec::new();
        for choice in &self.exercise.all_choices {
            if let Some(pos) = placed.iter().position(|p| *p == choice.as_str()) {
                placed.swap_remove(pos);
            } else {
                out.push(choice.as_str());
            }
        }
        out
    }

    /// Place the `index`-th available word into the next blank.
    pub fn pick(&mut self, index: usize) -> bool {
        if self.result.is_some() || self.is_complete() {
            return false;
        }
        let Some(word) = self.available().get(index).map(|w| w.to_string()) else {
            return false;
        };
        self.answers.push(word);
        true
    }

    /// Take a placed word back out of blank `index`.
    pub fn unpick(&mut self, index: usize) -> bool {
        if self.result.is_some() || index >= self.answers.len() {
            return false;
        }
        self.answers.remove(index);
        true
    }

    /// Check the answers. Only possible once every blank is filled.
    pub fn check(&mut self) -> Option<bool> {
        if !self.is_complete() {
            return None;
        }
        let correct = self.answers == self.exercise.correct_words;
        self.result = Some(correct);
        self.result
    }

    /// Whether the word in blank `index` matches, once checked.
    pub fn blank_correct(&self, index: usize) -> Option<bool> {
        self.result?;
        Some(self.answers.get(index) == self.exercise.correct_words.get(index))
    }

    pub fn reset(&mut self) {
        self.answers.clear();
        self.result = None;
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Quiz
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub word: String,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    slots: Vec<Option<String>>,
    choices: Vec<Choice>,
    confirmed: bool,
}

impl QuizSession {
    pub fn new(quiz: Quiz) -> Self {
        let mut session = Self {
            slots: vec![None; quiz.answers.len()],
            choices: Vec::new(),
            quiz,
            confirmed: false,
        };
        session.shuffle_choices();
        session
    }

    fn shuffle_choices(&mut self) {
        let mut words: Vec<String> = self
            .quiz
            .answers
            .iter()
            .chain(self.quiz.distractors.iter())
            .cloned()
            .collect();
        words.shuffle(&mut rand::rng());
        self.choices = words
            .into_iter()
            .map(|word| Choice { word, used: false })
            .collect();
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn all_filled(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Put choice `index` in the first empty slot.
    pub fn choose(&mut self, index: usize) -> bool {
        if self.confirmed {
            return false;
        }
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            return false;
        };
        let Some(choice) = self.choices.get_mut(index) else {
            return false;
        };
        if choice.used {
            return false;
        }
        choice.used = true;
        self.slots[slot] = Some(choice.word.clone());
        true
    }

    /// Empty slot `index`, returning its word to the bank.
    pub fn clear(&mut self, index: usize) -> bool {
        if self.confirmed {
            return false;
        }
        let Some(word) = self.slots.get_mut(index).and_then(Option::take) else {
            return false;
        };
        if let Some(choice) = self.choices.iter_mut().find(|c| c.used && c.word == word) {
            choice.used = false;
        }
        true
    }

    pub fn confirm(&mut self) -> bool {
        if !self.all_filled() {
            return false;
        }
        self.confirmed = true;
        true
    }

    pub fn is_correct(&self) -> Option<bool> {
        if !self.confirmed {
            return None;
        }
        Some(
            self.slots
                .iter()
                .zip(&self.quiz.answers)
                .all(|(slot, answer)| slot.as_deref() == Some(answer.as_str())),
        )
    }

    pub fn slot_correct(&self, index: usize) -> Option<bool> {
        if !self.confirmed {
            return None;
        }
        Some(self.slots.get(index).cloned().flatten().as_ref() == self.quiz.answers.get(index))
    }

    /// Try the same quiz again with a fresh shuffle.
    pub fn retry(&mut self) {
        self.slots = vec![None; self.quiz.answers.len()];
        self.confirmed = false;
        self.shuffle_choices();
    }

    /// Answers to avoid when asking for a new quiz on the same text.
    pub fn used_answers(&self) -> Vec<String> {
        self.quiz.answers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise() -> FillInBlanks {
        FillInBlanks {
            text_with_blanks: "For ____ so ____ the ____".into(),
            correct_words: vec!["God".into(), "loved".into(), "world".into()],
            all_choices: vec![
                "world".into(),
                "God".into(),
                "hated".into(),
                "loved".into(),
                "God".into(),
            ],
        }
    }

    fn quiz() -> Quiz {
        Quiz {
            quiz_text: "__BLANK__ is the __BLANK__".into(),
            answers: vec!["faith".into(), "substance".into()],
            distractors: vec!["hope".into()],
        }
    }

    fn index_of(session: &QuizSession, word: &str) -> usize {
        session
            .choices()
            .iter()
            .position(|c| c.word == word && !c.used)
            .unwrap()
    }

    #[test]
    fn split_gives_one_more_part_than_blanks() {
        assert_eq!(split_blanks("a ____ b ____", "____"), vec!["a ", " b ", ""]);
        assert_eq!(split_blanks("none", "____"), vec!["none"]);
    }

    #[test]
    fn phrased_parts_break_between_blanks() {
        let parts = phrased_parts("태초에 ____ 천지를 창조하시니라, 땅이 ____", "____");
        assert_eq!(parts, vec!["태초에 ", " 천지를 창조하시니라,\n땅이\n", ""]);
    }

    #[test]
    fn flashcards_wrap_and_unflip() {
        let mut cards = Flashcards::new(vec!["a".into(), "b".into(), "c".into()]);
        cards.flip();
        assert!(cards.is_flipped());
        cards.prev();
        assert_eq!(cards.current(), Some("c"));
        assert!(!cards.is_flipped());
        cards.next();
        cards.next();
        assert_eq!(cards.current(), Some("b"));

        cards.remove("b");
        assert_eq!(cards.len(), 2);
        cards.remove("a");
        cards.remove("c");
        assert!(cards.is_empty());
        cards.next();
        assert_eq!(cards.current(), None);
    }

    #[test]
    fn word_bank_counts_duplicates() {
        let mut session = FillInBlanksSession::new(exercise());
        // available: world, God, hated, loved, God
        assert!(session.pick(1));
        assert_eq!(session.available(), vec!["world", "hated", "loved", "God"]);
        assert!(session.pick(2));
        assert_eq!(session.answers(), &["God", "loved"]);
        assert_eq!(session.check(), None);
    }

    #[test]
    fn correct_answers_check_out() {
        let mut session = FillInBlanksSession::new(exercise());
        session.pick(1); // God
        session.pick(2); // loved
        session.pick(0); // world
        assert!(!session.pick(0));
        assert_eq!(session.check(), Some(true));
        assert_eq!(session.blank_correct(2), Some(true));
        assert!(!session.unpick(0));
    }

    #[test]
    fn wrong_order_fails_and_reset_clears() {
        let mut session = FillInBlanksSession::new(exercise());
        session.pick(0); // world
        session.pick(0); // God
        session.pick(1); // loved
        assert_eq!(session.check(), Some(false));
        assert_eq!(session.blank_correct(1), Some(false));

        session.reset();
        assert!(session.answers().is_empty());
        assert_eq!(session.result(), None);
        assert_eq!(session.available().len(), 5);
    }

    #[test]
    fn unpick_returns_word_to_bank() {
        let mut session = FillInBlanksSession::new(exercise());
        session.pick(2); // hated
        assert!(session.unpick(0));
        assert!(!session.unpick(0));
        assert!(session.available().contains(&"hated"));
    }

    #[test]
    fn quiz_fills_first_empty_slot() {
        let mut session = QuizSession::new(quiz());
        assert_eq!(session.choices().len(), 3);

        let i = index_of(&session, "faith");
        assert!(session.choose(i));
        assert!(!session.choose(i));
        let j = index_of(&session, "hope");
        assert!(session.choose(j));
        assert!(session.all_filled());

        assert!(session.clear(0));
        assert_eq!(session.slots()[0], None);
        let k = index_of(&session, "substance");
        session.choose(k);
        assert_eq!(session.slots()[0].as_deref(), Some("substance"));
    }

    #[test]
    fn quiz_confirm_needs_all_slots() {
        let mut session = QuizSession::new(quiz());
        assert!(!session.confirm());
        assert_eq!(session.is_correct(), None);

        let i = index_of(&session, "faith");
        session.choose(i);
        let j = index_of(&session, "substance");
        session.choose(j);
        assert!(session.confirm());
        assert_eq!(session.is_correct(), Some(true));
        assert_eq!(session.slot_correct(1), Some(true));
        assert!(!session.clear(0));
    }

    #[test]
    fn quiz_retry_starts_over() {
        let mut session = QuizSession::new(quiz());
        let i = index_of(&session, "substance");
        session.choose(i);
        let j = index_of(&session, "faith");
        session.choose(j);
        session.confirm();
        assert_eq!(session.is_correct(), Some(false));

        session.retry();
        assert!(!session.is_confirmed());
        assert!(session.slots().iter().all(Option::is_none));
        assert!(session.choices().iter().all(|c| !c.used));
        assert_eq!(session.used_answers(), vec!["faith", "substance"]);
    }
}
