//! Main application state and logic.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::theme::{icons, Theme};
use super::widgets::{
    blank_lines, choice_index, truncate_to_width, FlashcardWidget, GoalWidget, KeyHints, Logo,
    SummaryBar, WordBank,
};
use crate::ai::{
    spawn_request, AiContext, AiError, AiReply, AiRequest, ExerciseSource, EXERCISE_BLANK,
    QUIZ_BLANK,
};
use crate::config::Config;
use crate::creeds::CREEDS;
use crate::library::{load_api_key, save_api_key, Library};
use crate::models::{display_text, Item, ItemDraft, Status};
use crate::practice::{phrased_parts, Flashcards, FillInBlanksSession, QuizSession};
use crate::scheduler;
use crate::storage::Store;

// ══════════════════════════════════════════════════════════════════════════
// Application State
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    List,
    Add,
    Flashcards,
    Practice,
    Quiz,
    Settings,
    Goal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTab {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddTab {
    Lookup,
    Manual,
    Creeds,
}

impl AddTab {
    const ALL: [AddTab; 3] = [AddTab::Lookup, AddTab::Manual, AddTab::Creeds];

    fn title(&self) -> &'static str {
        match self {
            AddTab::Lookup => "Look up",
            AddTab::Manual => "Type it in",
            AddTab::Creeds => "Creeds & prayers",
        }
    }

    fn index(&self) -> usize {
        match self {
            AddTab::Lookup => 0,
            AddTab::Manual => 1,
            AddTab::Creeds => 2,
        }
    }

    fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// An AI request in flight, owned by the screen that started it.
struct Pending {
    rx: Receiver<Result<AiReply, AiError>>,
    screen: Screen,
}

pub struct App {
    pub screen: Screen,
    pub running: bool,

    // Config and theme
    pub config: Config,
    pub theme: Theme,

    library: Library,
    source: Arc<dyn ExerciseSource>,
    pending: Option<Pending>,

    // Item list
    list_tab: ListTab,
    list_state: ListState,
    delete_pending: Option<String>,

    // Add screen
    add_tab: AddTab,
    add_focus: usize,
    add_error: Option<String>,
    lookup_input: String,
    lookup_results: Vec<(ItemDraft, bool)>,
    lookup_state: ListState,
    manual_reference: String,
    manual_text: String,
    creed_state: ListState,
    creed_selected: Vec<bool>,

    // Practice views
    flashcards: Flashcards,
    practice_id: Option<String>,
    exercise: Option<FillInBlanksSession>,
    quiz: Option<QuizSession>,
    quiz_exclude: Vec<String>,
    review_recorded: bool,
    view_error: Option<String>,

    // Settings and goal
    api_key_input: String,
    goal_input: String,
    form_error: Option<String>,
    return_screen: Screen,

    // Status message (shown temporarily)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(library: Library, config: Config, source: Arc<dyn ExerciseSource>) -> Self {
        let theme = Theme::from_name(&config.theme);

        let mut app = Self {
            screen: Screen::List,
            running: true,
            config,
            theme,
            library,
            source,
            pending: None,
            list_tab: ListTab::InProgress,
            list_state: ListState::default(),
            delete_pending: None,
            add_tab: AddTab::Lookup,
            add_focus: 0,
            add_error: None,
            lookup_input: String::new(),
            lookup_results: Vec::new(),
            lookup_state: ListState::default(),
            manual_reference: String::new(),
            manual_text: String::new(),
            creed_state: ListState::default().with_selected(Some(0)),
            creed_selected: vec![false; CREEDS.len()],
            flashcards: Flashcards::new(Vec::new()),
            practice_id: None,
            exercise: None,
            quiz: None,
            quiz_exclude: Vec::new(),
            review_recorded: false,
            view_error: None,
            api_key_input: String::new(),
            goal_input: String::new(),
            form_error: None,
            return_screen: Screen::List,
            status_message: None,
        };
        app.clamp_selection();
        app
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    pub fn cycle_theme(&mut self) {
        let new_theme_name = self.theme.name.next();
        self.theme = Theme::new(new_theme_name);
        self.config.theme = new_theme_name.as_str().to_string();
        if let Err(e) = self.config.save() {
            log::warn!("Could not save config: {:#}", e);
        }
    }

    pub fn export_backup(&mut self) {
        let path = Store::default_backup_path();
        match self.library.store().export_backup(&path) {
            Ok(count) => {
                self.set_status(format!("Exported {} items to {}", count, path.display()));
            }
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                self.set_status(format!("Export failed: {}", e));
            }
        }
    }

    /// Leave the current screen. Any request it started is abandoned.
    fn go_to(&mut self, screen: Screen) {
        if self.pending.as_ref().is_some_and(|p| p.screen != screen) {
            log::debug!("Dropping AI request for {:?}", self.screen);
            self.pending = None;
        }
        self.view_error = None;
        self.form_error = None;
        self.screen = screen;
        if screen == Screen::List {
            self.clamp_selection();
        }
    }

    // ── Item list ────────────────────────────────────────────────────────

    fn visible_items(&self) -> Vec<&Item> {
        match self.list_tab {
            ListTab::InProgress => self.library.in_progress(),
            ListTab::Completed => self.library.completed(),
        }
    }

    fn selected_id(&self) -> Option<String> {
        let i = self.list_state.selected()?;
        self.visible_items().get(i).map(|item| item.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_items().len();
        if len == 0 {
            self.list_state.select(None);
        } else {
            let i = self.list_state.selected().unwrap_or(0).min(len - 1);
            self.list_state.select(Some(i));
        }
    }

    fn switch_list_tab(&mut self) {
        self.list_tab = match self.list_tab {
            ListTab::InProgress => ListTab::Completed,
            ListTab::Completed => ListTab::InProgress,
        };
        self.list_state.select(Some(0));
        self.clamp_selection();
    }

    fn move_selection(&mut self, down: bool) {
        let len = self.visible_items().len();
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        let new_i = if down {
            if i >= len - 1 { 0 } else { i + 1 }
        } else if i == 0 {
            len - 1
        } else {
            i - 1
        };
        self.list_state.select(Some(new_i));
    }

    /// Request `target` for an item and report the outcome.
    fn change_status(&mut self, id: &str, target: Status) -> Option<Status> {
        match self.library.set_status(id, target, Local::now()) {
            Ok(Some(item)) => {
                let (status, interval) = (item.status, item.interval);
                let message = match status {
                    Status::Mastered => format!("{} {} mastered", icons::CHECK, item.reference),
                    Status::InProgress => {
                        format!("{}: next review in {} days", item.reference, interval)
                    }
                    Status::NotStarted => format!("{} reset", item.reference),
                };
                self.set_status(message);
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Status change failed: {:#}", e);
                self.set_status(format!("Save failed: {}", e));
                None
            }
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if self.delete_pending.as_deref() != Some(id.as_str()) {
            self.delete_pending = Some(id);
            self.set_status("Press d again to delete".to_string());
            return;
        }
        self.delete_pending = None;
        match self.library.delete(&id) {
            Ok(true) => {
                self.flashcards.remove(&id);
                self.set_status("Deleted".to_string());
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("Delete failed: {:#}", e);
                self.set_status(format!("Delete failed: {}", e));
            }
        }
        self.clamp_selection();
    }

    // ── Add screen ───────────────────────────────────────────────────────

    fn open_add(&mut self) {
        self.add_error = None;
        self.add_focus = 0;
        self.go_to(Screen::Add);
    }

    fn add_drafts(&mut self, drafts: Vec<ItemDraft>) -> bool {
        match self.library.add_items(drafts, Local::now()) {
            Ok(count) => {
                self.set_status(format!("Added {} item{}", count, if count == 1 { "" } else { "s" }));
                true
            }
            Err(e) => {
                log::error!("Add failed: {:#}", e);
                self.add_error = Some(format!("Save failed: {}", e));
                false
            }
        }
    }

    fn lookup(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let reference = self.lookup_input.trim().to_string();
        if reference.is_empty() {
            self.add_error = Some("Enter a reference to look up".to_string());
            return;
        }
        self.add_error = None;
        self.lookup_results.clear();
        self.send(AiRequest::Lookup(reference));
    }

    fn add_lookup_results(&mut self) {
        let drafts: Vec<ItemDraft> = self
            .lookup_results
            .iter()
            .filter(|(_, selected)| *selected)
            .map(|(draft, _)| draft.clone())
            .collect();
        if drafts.is_empty() {
            self.add_error = Some("Select at least one verse".to_string());
            return;
        }
        if self.add_drafts(drafts) {
            self.lookup_results.clear();
            self.lookup_input.clear();
            self.add_focus = 0;
        }
    }

    fn add_manual(&mut self) {
        let reference = self.manual_reference.trim();
        let text = self.manual_text.trim();
        if reference.is_empty() || text.is_empty() {
            self.add_error = Some("Both reference and text are required".to_string());
            return;
        }
        let draft = ItemDraft::new(reference, text);
        if self.add_drafts(vec![draft]) {
            self.manual_reference.clear();
            self.manual_text.clear();
            self.add_focus = 0;
        }
    }

    fn add_creeds(&mut self) {
        let mut picked: Vec<usize> = (0..CREEDS.len()).filter(|&i| self.creed_selected[i]).collect();
        if picked.is_empty() {
            picked.extend(self.creed_state.selected());
        }
        let drafts: Vec<ItemDraft> = picked
            .into_iter()
            .filter_map(|i| CREEDS.get(i))
            .map(|creed| creed.to_draft())
            .collect();
        if self.add_drafts(drafts) {
            self.creed_selected.iter_mut().for_each(|s| *s = false);
        }
    }

    // ── Practice ─────────────────────────────────────────────────────────

    fn practice_item(&self) -> Option<&Item> {
        self.practice_id.as_deref().and_then(|id| self.library.get(id))
    }

    fn start_flashcards(&mut self) {
        let ids: Vec<String> = self.visible_items().iter().map(|i| i.id.clone()).collect();
        let cards = Flashcards::new(ids);
        if cards.is_empty() {
            self.set_status("No items to study".to_string());
            return;
        }
        self.flashcards = cards;
        self.go_to(Screen::Flashcards);
    }

    fn start_practice(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        self.practice_id = Some(id);
        self.exercise = None;
        self.go_to(Screen::Practice);
        self.request_exercise();
    }

    fn start_quiz(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        self.practice_id = Some(id);
        self.quiz = None;
        self.quiz_exclude.clear();
        self.go_to(Screen::Quiz);
        self.request_quiz();
    }

    fn request_exercise(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let Some(text) = self.practice_item().map(|i| i.text.clone()) else {
            return;
        };
        self.view_error = None;
        self.exercise = None;
        self.review_recorded = false;
        self.send(AiRequest::Exercise(text));
    }

    fn request_quiz(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let Some(item) = self.practice_item().cloned() else {
            return;
        };
        self.view_error = None;
        self.quiz = None;
        self.send(AiRequest::Quiz {
            item,
            exclude: self.quiz_exclude.clone(),
        });
    }

    fn on_exercise_checked(&mut self, correct: bool) {
        if !correct {
            return;
        }
        let Some(item) = self.practice_item() else {
            return;
        };
        if item.status == Status::InProgress {
            let id = item.id.clone();
            self.change_status(&id, Status::InProgress);
            self.review_recorded = true;
        }
    }

    fn record_review(&mut self) {
        if self.review_recorded {
            return;
        }
        if let Some(id) = self.practice_id.clone() {
            self.change_status(&id, Status::InProgress);
            self.review_recorded = true;
        }
    }

    fn mark_practice_mastered(&mut self) {
        if let Some(id) = self.practice_id.clone() {
            self.change_status(&id, Status::Mastered);
        }
        self.close_practice();
    }

    fn close_practice(&mut self) {
        self.exercise = None;
        self.quiz = None;
        self.practice_id = None;
        self.go_to(Screen::List);
    }

    // ── AI requests ──────────────────────────────────────────────────────

    fn ai_context(&self) -> AiContext {
        AiContext::new(load_api_key(self.library.store()))
    }

    fn send(&mut self, request: AiRequest) {
        let ctx = self.ai_context();
        if !ctx.has_key() {
            self.handle_ai_error(AiError::MissingApiKey);
            return;
        }
        let rx = spawn_request(Arc::clone(&self.source), ctx, request);
        self.pending = Some(Pending {
            rx,
            screen: self.screen,
        });
    }

    /// Collect a finished request, if any.
    fn poll_pending(&mut self) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        if pending.screen != self.screen {
            self.pending = None;
            return;
        }
        match pending.rx.try_recv() {
            Ok(reply) => {
                self.pending = None;
                match reply {
                    Ok(reply) => self.apply_reply(reply),
                    Err(e) => self.handle_ai_error(e),
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.handle_ai_error(AiError::Request("worker stopped".to_string()));
            }
        }
    }

    fn apply_reply(&mut self, reply: AiReply) {
        match reply {
            AiReply::Verses(drafts) => {
                log::info!("Lookup returned {} verses", drafts.len());
                self.lookup_results = drafts.into_iter().map(|d| (d, true)).collect();
                self.lookup_state.select(Some(0));
                self.add_focus = 1;
            }
            AiReply::Exercise(exercise) => {
                self.exercise = Some(FillInBlanksSession::new(exercise));
            }
            AiReply::Quiz(quiz) => {
                self.quiz = Some(QuizSession::new(quiz));
            }
        }
    }

    fn handle_ai_error(&mut self, error: AiError) {
        if error == AiError::MissingApiKey {
            let back = match self.screen {
                Screen::Add => Screen::Add,
                _ => Screen::List,
            };
            self.open_settings(back);
            self.form_error = Some(error.to_string());
            return;
        }
        match self.screen {
            Screen::Add => self.add_error = Some(error.to_string()),
            _ => self.view_error = Some(error.to_string()),
        }
    }

    // ── Settings and goal ────────────────────────────────────────────────

    fn open_settings(&mut self, back: Screen) {
        self.api_key_input.clear();
        self.return_screen = back;
        self.go_to(Screen::Settings);
    }

    fn save_settings(&mut self) {
        let key = self.api_key_input.trim().to_string();
        if key.is_empty() {
            self.form_error = Some("Enter an API key".to_string());
            return;
        }
        match save_api_key(self.library.store(), &key) {
            Ok(()) => {
                log::info!("API key updated");
                self.api_key_input.clear();
                self.set_status("API key saved".to_string());
                let back = self.return_screen;
                self.go_to(back);
            }
            Err(e) => {
                log::error!("Saving API key failed: {:#}", e);
                self.form_error = Some(format!("Save failed: {}", e));
            }
        }
    }

    fn open_goal(&mut self) {
        self.goal_input = self.library.goal().to_string();
        self.go_to(Screen::Goal);
    }

    fn save_goal(&mut self) {
        let goal = match self.goal_input.trim().parse::<u32>() {
            Ok(goal) if goal >= 1 => goal,
            _ => {
                self.form_error = Some("The goal must be a whole number of at least 1".to_string());
                return;
            }
        };
        match self.library.set_goal(goal) {
            Ok(()) => {
                self.set_status(format!("Monthly goal set to {}", goal));
                self.go_to(Screen::List);
            }
            Err(e) => self.form_error = Some(e.to_string()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Event Handling
    // ══════════════════════════════════════════════════════════════════════

    pub fn handle_events(&mut self) -> anyhow::Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key_event(key);
                }
            }
        }
        self.poll_pending();
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Alt+Enter, or Ctrl+J where the terminal reports it, breaks a line
        let line_break = match key.code {
            KeyCode::Enter => key.modifiers.contains(KeyModifiers::ALT),
            KeyCode::Char('j') => key.modifiers.contains(KeyModifiers::CONTROL),
            _ => false,
        };
        if line_break && self.screen == Screen::Add && self.add_tab == AddTab::Manual {
            self.manual_line_break();
            return;
        }
        self.handle_key(key.code);
    }

    fn handle_key(&mut self, key: KeyCode) {
        match self.screen {
            Screen::List => self.handle_list_keys(key),
            Screen::Add => self.handle_add_keys(key),
            Screen::Flashcards => self.handle_flashcard_keys(key),
            Screen::Practice => self.handle_practice_keys(key),
            Screen::Quiz => self.handle_quiz_keys(key),
            Screen::Settings => self.handle_settings_keys(key),
            Screen::Goal => self.handle_goal_keys(key),
        }
    }

    fn handle_list_keys(&mut self, key: KeyCode) {
        if key != KeyCode::Char('d') {
            self.delete_pending = None;
        }
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => self.switch_list_tab(),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Char('a') => self.open_add(),
            KeyCode::Char('f') => self.start_flashcards(),
            KeyCode::Char('p') => self.start_practice(),
            KeyCode::Char('z') => self.start_quiz(),
            KeyCode::Char('s') => {
                if let Some(id) = self.selected_id() {
                    if let Some(status) = self.library.get(&id).map(|i| i.status) {
                        self.change_status(&id, status.next());
                        self.clamp_selection();
                    }
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = self.selected_id() {
                    self.change_status(&id, Status::InProgress);
                    self.clamp_selection();
                }
            }
            KeyCode::Char('m') => {
                if let Some(id) = self.selected_id() {
                    self.change_status(&id, Status::Mastered);
                    self.clamp_selection();
                }
            }
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Char('g') => self.open_goal(),
            KeyCode::Char('o') => self.open_settings(Screen::List),
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Char('x') => self.export_backup(),
            _ => {}
        }
    }

    fn handle_add_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.go_to(Screen::List);
                return;
            }
            KeyCode::Left => {
                self.add_tab = self.add_tab.prev();
                self.add_focus = 0;
                self.add_error = None;
                return;
            }
            KeyCode::Right => {
                self.add_tab = self.add_tab.next();
                self.add_focus = 0;
                self.add_error = None;
                return;
            }
            _ => {}
        }

        match self.add_tab {
            AddTab::Lookup => self.handle_lookup_keys(key),
            AddTab::Manual => self.handle_manual_keys(key),
            AddTab::Creeds => self.handle_creed_keys(key),
        }
    }

    fn handle_lookup_keys(&mut self, key: KeyCode) {
        if key == KeyCode::Tab {
            if !self.lookup_results.is_empty() {
                self.add_focus = (self.add_focus + 1) % 2;
            }
            return;
        }

        if self.add_focus == 0 {
            match key {
                KeyCode::Enter => self.lookup(),
                KeyCode::Char(c) => {
                    self.lookup_input.push(c);
                    self.add_error = None;
                }
                KeyCode::Backspace => {
                    self.lookup_input.pop();
                }
                _ => {}
            }
            return;
        }

        let len = self.lookup_results.len();
        let i = self.lookup_state.selected().unwrap_or(0);
        match key {
            KeyCode::Up | KeyCode::Char('k') if len > 0 => {
                self.lookup_state.select(Some(if i == 0 { len - 1 } else { i - 1 }));
            }
            KeyCode::Down | KeyCode::Char('j') if len > 0 => {
                self.lookup_state.select(Some((i + 1) % len));
            }
            KeyCode::Char(' ') => {
                if let Some((_, selected)) = self.lookup_results.get_mut(i) {
                    *selected = !*selected;
                }
            }
            KeyCode::Enter => self.add_lookup_results(),
            _ => {}
        }
    }

    fn handle_manual_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Tab => self.add_focus = (self.add_focus + 1) % 2,
            KeyCode::Enter => {
                if self.add_focus == 0 {
                    self.add_focus = 1;
                } else {
                    self.add_manual();
                }
            }
            KeyCode::Char(c) => {
                self.add_error = None;
                if self.add_focus == 0 {
                    self.manual_reference.push(c);
                } else {
                    self.manual_text.push(c);
                }
            }
            KeyCode::Backspace => {
                if self.add_focus == 0 {
                    self.manual_reference.pop();
                } else {
                    self.manual_text.pop();
                }
            }
            _ => {}
        }
    }

    fn manual_line_break(&mut self) {
        if self.add_focus == 0 {
            self.add_focus = 1;
        } else {
            self.add_error = None;
            self.manual_text.push('\n');
        }
    }

    fn handle_creed_keys(&mut self, key: KeyCode) {
        let len = CREEDS.len();
        let i = self.creed_state.selected().unwrap_or(0);
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.creed_state.select(Some(if i == 0 { len - 1 } else { i - 1 }));
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.creed_state.select(Some((i + 1) % len));
            }
            KeyCode::Char(' ') => {
                if let Some(selected) = self.creed_selected.get_mut(i) {
                    *selected = !*selected;
                }
            }
            KeyCode::Enter => self.add_creeds(),
            _ => {}
        }
    }

    fn handle_flashcard_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.go_to(Screen::List),
            KeyCode::Char(' ') | KeyCode::Enter => self.flashcards.flip(),
            KeyCode::Char('h') | KeyCode::Left => self.flashcards.prev(),
            KeyCode::Char('l') | KeyCode::Right => self.flashcards.next(),
            KeyCode::Char('r') => {
                if let Some(id) = self.flashcards.current().map(str::to_string) {
                    self.change_status(&id, Status::InProgress);
                    self.flashcards.next();
                }
            }
            KeyCode::Char('m') => {
                if let Some(id) = self.flashcards.current().map(str::to_string) {
                    self.change_status(&id, Status::Mastered);
                    self.flashcards.next();
                }
            }
            KeyCode::Char('t') => self.cycle_theme(),
            _ => {}
        }
    }

    fn handle_practice_keys(&mut self, key: KeyCode) {
        if key == KeyCode::Esc {
            self.close_practice();
            return;
        }
        if self.view_error.is_some() {
            if key == KeyCode::Enter {
                self.request_exercise();
            }
            return;
        }
        let Some(session) = self.exercise.as_mut() else {
            return;
        };

        match session.result() {
            None => match key {
                KeyCode::Char(c) => {
                    if let Some(i) = choice_index(c) {
                        session.pick(i);
                    }
                }
                KeyCode::Backspace => {
                    let filled = session.answers().len();
                    if filled > 0 {
                        session.unpick(filled - 1);
                    }
                }
                KeyCode::Enter => {
                    if let Some(correct) = session.check() {
                        self.on_exercise_checked(correct);
                    }
                }
                _ => {}
            },
            Some(false) => match key {
                KeyCode::Enter => session.reset(),
                KeyCode::Char('n') => self.request_exercise(),
                _ => {}
            },
            Some(true) => match key {
                KeyCode::Char('n') => self.request_exercise(),
                KeyCode::Char('r') => self.record_review(),
                KeyCode::Char('m') => self.mark_practice_mastered(),
                _ => {}
            },
        }
    }

    fn handle_quiz_keys(&mut self, key: KeyCode) {
        if key == KeyCode::Esc {
            self.close_practice();
            return;
        }
        if self.view_error.is_some() {
            if key == KeyCode::Enter {
                self.request_quiz();
            }
            return;
        }
        let Some(session) = self.quiz.as_mut() else {
            return;
        };

        match session.is_correct() {
            None => match key {
                KeyCode::Char(c) => {
                    if let Some(i) = choice_index(c) {
                        session.choose(i);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(last) = session.slots().iter().rposition(Option::is_some) {
                        session.clear(last);
                    }
                }
                KeyCode::Enter => {
                    session.confirm();
                }
                _ => {}
            },
            Some(false) => {
                if key == KeyCode::Enter {
                    session.retry();
                }
            }
            Some(true) => match key {
                KeyCode::Char('n') => {
                    self.quiz_exclude = session.used_answers();
                    self.request_quiz();
                }
                KeyCode::Char('m') => self.mark_practice_mastered(),
                _ => {}
            },
        }
    }

    fn handle_settings_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                let back = self.return_screen;
                self.go_to(back);
            }
            KeyCode::Enter => self.save_settings(),
            KeyCode::Char(c) => {
                self.form_error = None;
                self.api_key_input.push(c);
            }
            KeyCode::Backspace => {
                self.api_key_input.pop();
            }
            _ => {}
        }
    }

    fn handle_goal_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.go_to(Screen::List),
            KeyCode::Enter => self.save_goal(),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.form_error = None;
                self.goal_input.push(c);
            }
            KeyCode::Backspace => {
                self.goal_input.pop();
            }
            _ => {}
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Rendering
    // ══════════════════════════════════════════════════════════════════════

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Clear with background
        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.colors.bg_dark)),
            area,
        );

        match self.screen {
            Screen::List => self.render_list(frame, area),
            Screen::Add => self.render_add(frame, area),
            Screen::Flashcards => self.render_flashcards(frame, area),
            Screen::Practice => self.render_practice(frame, area),
            Screen::Quiz => self.render_quiz(frame, area),
            Screen::Settings => self.render_settings(frame, area),
            Screen::Goal => self.render_goal(frame, area),
        }

        self.render_status_message(frame, area);
    }

    fn render_status_message(&self, frame: &mut Frame, area: Rect) {
        // Show status message if recent (within 5 seconds)
        if let Some((ref msg, time)) = self.status_message {
            if time.elapsed().as_secs() < 5 {
                let status = Paragraph::new(msg.as_str())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.colors.success));
                // Render above the hints
                let status_area = Rect {
                    x: area.x,
                    y: area.bottom().saturating_sub(3),
                    width: area.width,
                    height: 1,
                };
                frame.render_widget(status, status_area);
            }
        }
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect) {
        let now = Local::now();
        let chunks = Layout::vertical([
            Constraint::Length(1),   // Top padding
            Constraint::Length(5),   // Logo
            Constraint::Length(1),   // Spacing
            Constraint::Length(1),   // Summary
            Constraint::Length(4),   // Goal
            Constraint::Length(1),   // Tabs
            Constraint::Min(5),      // Item list
            Constraint::Length(1),   // Status line
            Constraint::Length(2),   // Help
        ])
        .split(area);

        Logo::render_to(&self.theme, chunks[1], frame.buffer_mut());

        frame.render_widget(
            SummaryBar::new(self.library.summary(), self.library.due_count(now), &self.theme),
            centered_rect(90, 100, chunks[3]),
        );

        let streak = self.library.streak();
        let streak_days = if streak.is_active(now.date_naive()) { streak.count } else { 0 };
        frame.render_widget(
            GoalWidget::new(
                self.library.goal(),
                self.library.completed_this_month(now),
                self.library.summary().mastered,
                streak_days,
                &self.theme,
            ),
            centered_rect(60, 100, chunks[4]),
        );

        let tab_titles = vec![
            format!(" In progress ({}) ", self.library.in_progress().len()),
            format!(" Completed ({}) ", self.library.completed().len()),
        ];
        let selected_tab = match self.list_tab {
            ListTab::InProgress => 0,
            ListTab::Completed => 1,
        };
        let tabs = Tabs::new(tab_titles)
            .select(selected_tab)
            .style(Style::default().fg(self.theme.colors.text_muted))
            .highlight_style(self.theme.highlight().add_modifier(Modifier::UNDERLINED))
            .divider("│");
        let tabs_area = centered_rect(80, 100, chunks[5]);
        frame.render_widget(tabs, tabs_area);

        let list_area = centered_rect(80, 100, chunks[6]);
        let row_width = list_area.width.saturating_sub(6) as usize;
        let items: Vec<ListItem> = self
            .visible_items()
            .into_iter()
            .map(|item| self.item_row(item, row_width, now))
            .collect();

        let empty = items.is_empty();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.colors.primary))
                    .title(format!(" {} items ", self.library.summary().total))
                    .title_style(Style::default().fg(self.theme.colors.text_muted)),
            )
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, list_area, &mut self.list_state);

        if empty {
            let message = match self.list_tab {
                ListTab::InProgress => "Nothing here yet. Press a to add a verse.",
                ListTab::Completed => "No mastered items yet.",
            };
            let inner = centered_rect(90, 30, list_area);
            frame.render_widget(
                Paragraph::new(message)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.colors.text_dim)),
                inner,
            );
        }

        let theme_hint = format!("[{}]", self.theme.name.display_name());
        let hints_data: [(&str, &str); 13] = [
            ("j/k", "nav"),
            ("Tab", "tab"),
            ("a", "add"),
            ("f", "cards"),
            ("p", "practice"),
            ("z", "quiz"),
            ("s", "status"),
            ("r/m", "review/master"),
            ("d", "del"),
            ("g", "goal"),
            ("o", "settings"),
            ("t", &theme_hint),
            ("q", "quit"),
        ];
        frame.render_widget(KeyHints::new(&hints_data, &self.theme), chunks[8]);
    }

    fn item_row(&self, item: &Item, width: usize, now: chrono::DateTime<Local>) -> ListItem<'static> {
        let color = item.status.color_for_theme(&self.theme);

        let badge = if item.is_mastered() {
            item.completed_at
                .map(|at| format!("  {} {}", icons::CHECK, at.format("%Y-%m-%d")))
                .unwrap_or_default()
        } else if scheduler::is_due(item, now) {
            format!("  {} due", icons::BELL)
        } else {
            item.due_date
                .map(|due| format!("  in {}d", (due.date_naive() - now.date_naive()).num_days()))
                .unwrap_or_default()
        };

        let used = 2 + item.reference.width() + 2 + badge.width();
        let preview = truncate_to_width(&item.text, width.saturating_sub(used));

        let badge_style = if badge.contains("due") {
            self.theme.stats_due()
        } else {
            Style::default().fg(self.theme.colors.text_dim)
        };

        ListItem::new(Line::from(vec![
            Span::styled("● ", Style::default().fg(color)),
            Span::styled(
                item.reference.clone(),
                Style::default().fg(self.theme.colors.text).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(preview, Style::default().fg(self.theme.colors.text_muted)),
            Span::styled(badge, badge_style),
        ]))
    }

    fn render_add(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Length(1),   // Tabs
            Constraint::Length(1),   // Spacing
            Constraint::Min(8),      // Body
            Constraint::Length(1),   // Error
            Constraint::Length(1),   // Status line
            Constraint::Length(2),   // Hints
        ])
        .split(centered_rect(70, 100, area));

        let title = Paragraph::new("Add to your collection")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let tabs = Tabs::new(AddTab::ALL.iter().map(|t| format!(" {} ", t.title())).collect::<Vec<_>>())
            .select(self.add_tab.index())
            .style(Style::default().fg(self.theme.colors.text_muted))
            .highlight_style(self.theme.highlight().add_modifier(Modifier::UNDERLINED))
            .divider("│");
        frame.render_widget(tabs, chunks[1]);

        match self.add_tab {
            AddTab::Lookup => self.render_lookup(frame, chunks[3]),
            AddTab::Manual => self.render_manual(frame, chunks[3]),
            AddTab::Creeds => self.render_creeds(frame, chunks[3]),
        }

        if let Some(ref error) = self.add_error {
            frame.render_widget(
                Paragraph::new(error.as_str())
                    .alignment(Alignment::Center)
                    .style(self.theme.error_text()),
                chunks[4],
            );
        }

        let hints: &[(&str, &str)] = match self.add_tab {
            AddTab::Lookup if self.add_focus == 1 => &[
                ("←/→", "tab"),
                ("j/k", "nav"),
                ("Space", "select"),
                ("Enter", "add selected"),
                ("Tab", "edit reference"),
                ("Esc", "back"),
            ],
            AddTab::Lookup => &[("←/→", "tab"), ("Enter", "look up"), ("Tab", "results"), ("Esc", "back")],
            AddTab::Manual => &[
                ("←/→", "tab"),
                ("Tab", "switch field"),
                ("Alt+Enter", "new line"),
                ("Enter", "add"),
                ("Esc", "back"),
            ],
            AddTab::Creeds => &[
                ("←/→", "tab"),
                ("j/k", "nav"),
                ("Space", "select"),
                ("Enter", "add"),
                ("Esc", "back"),
            ],
        };
        frame.render_widget(KeyHints::new(hints, &self.theme), chunks[6]);
    }

    fn input_block<'a>(&self, title: &'a str, focused: bool) -> Block<'a> {
        let style = if focused {
            Style::default().fg(self.theme.colors.accent)
        } else {
            Style::default().fg(self.theme.colors.text_muted)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(style)
            .title(title)
            .title_style(style)
    }

    fn render_lookup(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).split(area);

        let input = Paragraph::new(self.lookup_input.as_str())
            .block(self.input_block(" Reference (e.g. 요한복음 3:16 or Ps 23:1-6) ", self.add_focus == 0));
        frame.render_widget(input, chunks[0]);
        if self.add_focus == 0 {
            place_cursor(frame, chunks[0], &self.lookup_input);
        }

        let body_area = chunks[1];
        if self.pending.is_some() {
            frame.render_widget(
                Paragraph::new("Looking up…")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.colors.text_muted)),
                centered_rect(100, 30, body_area),
            );
            return;
        }

        let width = body_area.width.saturating_sub(8) as usize;
        let rows: Vec<ListItem> = self
            .lookup_results
            .iter()
            .map(|(draft, selected)| {
                let mark = if *selected { "[x] " } else { "[ ] " };
                let used = mark.width() + draft.reference.width() + 2;
                ListItem::new(Line::from(vec![
                    Span::styled(mark, self.theme.key_highlight()),
                    Span::styled(draft.reference.clone(), self.theme.title()),
                    Span::raw("  "),
                    Span::styled(
                        truncate_to_width(&draft.text, width.saturating_sub(used)),
                        Style::default().fg(self.theme.colors.text_muted),
                    ),
                ]))
            })
            .collect();

        let list = List::new(rows)
            .block(self.input_block(" Results ", self.add_focus == 1))
            .highlight_style(if self.add_focus == 1 {
                self.theme.selected()
            } else {
                Style::default()
            });
        frame.render_stateful_widget(list, body_area, &mut self.lookup_state);
    }

    fn render_manual(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([Constraint::Length(3), Constraint::Length(1), Constraint::Min(5)]).split(area);

        let reference = Paragraph::new(self.manual_reference.as_str())
            .block(self.input_block(" Reference or title ", self.add_focus == 0));
        frame.render_widget(reference, chunks[0]);

        let text = Paragraph::new(self.manual_text.as_str())
            .wrap(Wrap { trim: false })
            .block(self.input_block(" Text ", self.add_focus == 1));
        frame.render_widget(text, chunks[2]);

        if self.add_focus == 0 {
            place_cursor(frame, chunks[0], &self.manual_reference);
        }
    }

    fn render_creeds(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).split(area);

        let rows: Vec<ListItem> = CREEDS
            .iter()
            .zip(&self.creed_selected)
            .map(|(creed, selected)| {
                let mark = if *selected { "[x] " } else { "[ ] " };
                ListItem::new(Line::from(vec![
                    Span::styled(mark, self.theme.key_highlight()),
                    Span::styled(creed.title, self.theme.title()),
                ]))
            })
            .collect();
        let list = List::new(rows)
            .block(self.input_block(" Creeds ", true))
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], &mut self.creed_state);

        let preview = self
            .creed_state
            .selected()
            .and_then(|i| CREEDS.get(i))
            .map(|c| c.text)
            .unwrap_or("");
        frame.render_widget(
            Paragraph::new(preview)
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(self.theme.colors.text_muted))
                .block(self.input_block(" Preview ", false)),
            chunks[1],
        );
    }

    fn render_flashcards(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Header
            Constraint::Min(10),     // Card
            Constraint::Length(1),   // Spacing
            Constraint::Length(1),   // Status line
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let Some(item) = self.flashcards.current().and_then(|id| self.library.get(id)) else {
            frame.render_widget(
                Paragraph::new("No cards left")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.colors.text_dim)),
                chunks[1],
            );
            frame.render_widget(KeyHints::new(&[("Esc", "back")], &self.theme), chunks[4]);
            return;
        };

        let header = Paragraph::new(Line::from(vec![
            Span::styled("Flashcards ", self.theme.title()),
            Span::styled(
                format!("{} / {}", self.flashcards.position() + 1, self.flashcards.len()),
                Style::default().fg(self.theme.colors.text_muted),
            ),
            Span::styled(
                format!("   ● {}", item.status.name()),
                Style::default().fg(item.status.color_for_theme(&self.theme)),
            ),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);

        let back = display_text(&item.text);
        let (content, is_front) = if self.flashcards.is_flipped() {
            (back.as_str(), false)
        } else {
            (item.reference.as_str(), true)
        };
        frame.render_widget(
            FlashcardWidget::new(content, is_front, &self.theme),
            centered_rect(80, 100, chunks[1]),
        );

        let review_hint = format!("review ({}d)", scheduler::preview_interval(item));
        let hints_data: [(&str, &str); 5] = [
            ("Space", "flip"),
            ("h/l", "prev/next"),
            ("r", &review_hint),
            ("m", "mastered"),
            ("Esc", "back"),
        ];
        frame.render_widget(KeyHints::new(&hints_data, &self.theme), chunks[4]);
    }

    fn practice_layout(&self, frame: &mut Frame, area: Rect, title: &str) -> std::rc::Rc<[Rect]> {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Header
            Constraint::Min(6),      // Text
            Constraint::Length(5),   // Word bank
            Constraint::Length(1),   // Result
            Constraint::Length(1),   // Status line
            Constraint::Length(2),   // Hints
        ])
        .split(centered_rect(80, 100, area));

        let reference = self.practice_item().map(|i| i.reference.as_str()).unwrap_or("");
        let header = Paragraph::new(Line::from(vec![
            Span::styled(format!("{} ", title), self.theme.title()),
            Span::styled(reference.to_string(), self.theme.highlight()),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);
        chunks
    }

    /// Loading or error state shared by the practice and quiz views.
    fn render_practice_placeholder(&self, frame: &mut Frame, chunks: &[Rect], loading: &str) {
        if let Some(ref error) = self.view_error {
            frame.render_widget(
                Paragraph::new(error.as_str())
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .style(self.theme.error_text()),
                centered_rect(90, 40, chunks[1]),
            );
            frame.render_widget(
                KeyHints::new(&[("Enter", "try again"), ("Esc", "back")], &self.theme),
                chunks[5],
            );
        } else {
            frame.render_widget(
                Paragraph::new(loading)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.colors.text_muted)),
                centered_rect(90, 30, chunks[1]),
            );
            frame.render_widget(KeyHints::new(&[("Esc", "cancel")], &self.theme), chunks[5]);
        }
    }

    fn render_result_line(&self, frame: &mut Frame, area: Rect, result: Option<bool>) {
        let line = match result {
            Some(true) => Line::from(Span::styled(
                format!("{} Correct!", icons::CHECK),
                Style::default().fg(self.theme.colors.success).add_modifier(Modifier::BOLD),
            )),
            Some(false) => Line::from(Span::styled(
                format!("{} Not quite. Try again.", icons::CROSS),
                self.theme.error_text(),
            )),
            None => return,
        };
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
    }

    fn render_practice(&self, frame: &mut Frame, area: Rect) {
        let chunks = self.practice_layout(frame, area, "Fill in the blanks");

        let Some(ref session) = self.exercise else {
            self.render_practice_placeholder(frame, &chunks, "Preparing an exercise…");
            return;
        };

        let phrased = phrased_parts(&session.exercise().text_with_blanks, EXERCISE_BLANK);
        let parts: Vec<&str> = phrased.iter().map(String::as_str).collect();
        let blanks = parts.len().saturating_sub(1);
        let filled: Vec<Option<String>> = (0..blanks).map(|i| session.answers().get(i).cloned()).collect();
        let checked: Vec<Option<bool>> = (0..blanks).map(|i| session.blank_correct(i)).collect();

        frame.render_widget(
            Paragraph::new(blank_lines(&parts, &filled, &checked, &self.theme))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[1],
        );

        let words = session.available().into_iter().map(|w| (w, false)).collect();
        frame.render_widget(
            WordBank::new(words, session.result().is_none(), &self.theme),
            chunks[2],
        );

        self.render_result_line(frame, chunks[3], session.result());

        let hints: &[(&str, &str)] = match session.result() {
            None => &[("1-9", "pick"), ("Backspace", "undo"), ("Enter", "check"), ("Esc", "back")],
            Some(false) => &[("Enter", "try again"), ("n", "new exercise"), ("Esc", "back")],
            Some(true) if self.review_recorded => {
                &[("n", "new exercise"), ("m", "mastered"), ("Esc", "back")]
            }
            Some(true) => &[("n", "new exercise"), ("r", "record review"), ("m", "mastered"), ("Esc", "back")],
        };
        frame.render_widget(KeyHints::new(hints, &self.theme), chunks[5]);
    }

    fn render_quiz(&self, frame: &mut Frame, area: Rect) {
        let chunks = self.practice_layout(frame, area, "Quiz");

        let Some(ref session) = self.quiz else {
            self.render_practice_placeholder(frame, &chunks, "Writing a quiz…");
            return;
        };

        let phrased = phrased_parts(&session.quiz().quiz_text, QUIZ_BLANK);
        let parts: Vec<&str> = phrased.iter().map(String::as_str).collect();
        let checked: Vec<Option<bool>> = (0..session.slots().len()).map(|i| session.slot_correct(i)).collect();

        frame.render_widget(
            Paragraph::new(blank_lines(&parts, session.slots(), &checked, &self.theme))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[1],
        );

        let words = session.choices().iter().map(|c| (c.word.as_str(), c.used)).collect();
        frame.render_widget(
            WordBank::new(words, !session.is_confirmed(), &self.theme),
            chunks[2],
        );

        self.render_result_line(frame, chunks[3], session.is_correct());

        let hints: &[(&str, &str)] = match session.is_correct() {
            None => &[("1-9", "choose"), ("Backspace", "clear"), ("Enter", "confirm"), ("Esc", "back")],
            Some(false) => &[("Enter", "try again"), ("Esc", "back")],
            Some(true) => &[("n", "new quiz"), ("m", "mastered"), ("Esc", "back")],
        };
        frame.render_widget(KeyHints::new(hints, &self.theme), chunks[5]);
    }

    fn render_settings(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Length(2),   // Current key
            Constraint::Length(3),   // Input
            Constraint::Length(1),   // Error
            Constraint::Length(1),   // Spacing
            Constraint::Min(4),      // Info
            Constraint::Length(1),   // Status line
            Constraint::Length(2),   // Hints
        ])
        .split(centered_rect(60, 100, area));

        frame.render_widget(
            Paragraph::new("Settings").alignment(Alignment::Center).style(self.theme.title()),
            chunks[0],
        );

        let current = if self.ai_context().has_key() {
            Span::styled(format!("{} An API key is saved", icons::CHECK), Style::default().fg(self.theme.colors.success))
        } else {
            Span::styled(format!("{} No API key saved", icons::CROSS), Style::default().fg(self.theme.colors.warning))
        };
        frame.render_widget(Paragraph::new(Line::from(current)).alignment(Alignment::Center), chunks[1]);

        let masked = "•".repeat(self.api_key_input.chars().count());
        frame.render_widget(
            Paragraph::new(masked.as_str()).block(self.input_block(" Gemini API key ", true)),
            chunks[2],
        );
        place_cursor(frame, chunks[2], &masked);

        if let Some(ref error) = self.form_error {
            frame.render_widget(
                Paragraph::new(error.as_str()).alignment(Alignment::Center).style(self.theme.error_text()),
                chunks[3],
            );
        }

        let muted = Style::default().fg(self.theme.colors.text_muted);
        let info = vec![
            Line::from(Span::styled(format!("Model: {}", self.config.model), muted)),
            Line::from(Span::styled(format!("Translation: {}", self.config.translation), muted)),
            Line::from(Span::styled(format!("Data: {}", self.library.store().dir().display()), muted)),
            Line::from(Span::styled(format!("Config: {}", Config::default_path().display()), muted)),
        ];
        frame.render_widget(Paragraph::new(info).alignment(Alignment::Center), chunks[5]);

        frame.render_widget(
            KeyHints::new(&[("Enter", "save"), ("Esc", "back")], &self.theme),
            chunks[7],
        );
    }

    fn render_goal(&self, frame: &mut Frame, area: Rect) {
        let now = Local::now();
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Length(4),   // Progress
            Constraint::Length(1),   // Spacing
            Constraint::Length(3),   // Input
            Constraint::Length(1),   // Error
            Constraint::Min(1),      // Spacer
            Constraint::Length(1),   // Status line
            Constraint::Length(2),   // Hints
        ])
        .split(centered_rect(50, 100, area));

        frame.render_widget(
            Paragraph::new("Monthly goal").alignment(Alignment::Center).style(self.theme.title()),
            chunks[0],
        );

        let preview_goal = self.goal_input.parse::<u32>().ok().filter(|g| *g >= 1).unwrap_or(self.library.goal());
        let streak = self.library.streak();
        frame.render_widget(
            GoalWidget::new(
                preview_goal,
                self.library.completed_this_month(now),
                self.library.summary().mastered,
                if streak.is_active(now.date_naive()) { streak.count } else { 0 },
                &self.theme,
            ),
            chunks[1],
        );

        frame.render_widget(
            Paragraph::new(self.goal_input.as_str())
                .block(self.input_block(" Items to master this month ", true)),
            chunks[3],
        );
        place_cursor(frame, chunks[3], &self.goal_input);

        if let Some(ref error) = self.form_error {
            frame.render_widget(
                Paragraph::new(error.as_str()).alignment(Alignment::Center).style(self.theme.error_text()),
                chunks[4],
            );
        }

        frame.render_widget(
            KeyHints::new(&[("0-9", "edit"), ("Enter", "save"), ("Esc", "back")], &self.theme),
            chunks[7],
        );
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helper Functions
// ══════════════════════════════════════════════════════════════════════════

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

/// Put the terminal cursor after `text` inside a bordered single-line input.
fn place_cursor(frame: &mut Frame, area: Rect, text: &str) {
    let max_x = area.right().saturating_sub(2);
    let x = (area.x + 1).saturating_add(text.width() as u16).min(max_x);
    frame.set_cursor_position(Position::new(x, area.y + 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::ai::{FillInBlanks, Quiz};

    struct Scripted;

    impl ExerciseSource for Scripted {
        fn lookup_verses(&self, _ctx: &AiContext, reference: &str) -> Result<Vec<ItemDraft>, AiError> {
            if reference == "nowhere" {
                return Err(AiError::NotFound { reference: reference.into() });
            }
            Ok(vec![
                ItemDraft::new("Ps 23:1", "The Lord is my shepherd"),
                ItemDraft::new("Ps 23:2", "He makes me lie down"),
            ])
        }

        fn generate_exercise(&self, _ctx: &AiContext, _text: &str) -> Result<FillInBlanks, AiError> {
            Ok(FillInBlanks {
                text_with_blanks: "The ____ is my ____".into(),
                correct_words: vec!["Lord".into(), "shepherd".into()],
                all_choices: vec!["shepherd".into(), "Lord".into()],
            })
        }

        fn generate_quiz(&self, _ctx: &AiContext, _item: &Item, exclude: &[String]) -> Result<Quiz, AiError> {
            let answer = if exclude.is_empty() { "shepherd" } else { "Lord" };
            Ok(Quiz {
                quiz_text: "__BLANK__".into(),
                answers: vec![answer.into()],
                distractors: vec![],
            })
        }
    }

    fn app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().to_path_buf()).unwrap();
        let library = Library::open(store, Local::now().date_naive());
        (dir, App::new(library, Config::default(), Arc::new(Scripted)))
    }

    fn app_with_item(status: Status) -> (TempDir, App) {
        let (dir, mut app) = app();
        save_api_key(app.library.store(), "test-key").unwrap();
        app.library
            .add_items(vec![ItemDraft::new("Ps 23:1", "The Lord is my shepherd")], Local::now())
            .unwrap();
        let id = app.library.items()[0].id.clone();
        if status != Status::NotStarted {
            app.library.set_status(&id, status, Local::now()).unwrap();
        }
        app.clamp_selection();
        (dir, app)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    fn settle(app: &mut App) {
        for _ in 0..500 {
            app.poll_pending();
            if app.pending.is_none() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("AI request never finished");
    }

    #[test]
    fn manual_add_creates_item() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Char('a'));
        app.handle_key(KeyCode::Right);
        type_str(&mut app, "Note 1");
        app.handle_key(KeyCode::Enter);
        type_str(&mut app, "Be still");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.library.items().len(), 1);
        assert_eq!(app.library.items()[0].reference, "Note 1");
        assert!(app.manual_text.is_empty());
    }

    #[test]
    fn manual_text_takes_line_breaks() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Char('a'));
        app.handle_key(KeyCode::Right);
        type_str(&mut app, "Psalm 46");
        app.handle_key(KeyCode::Enter);
        type_str(&mut app, "Be still,");
        app.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_str(&mut app, "and know");
        app.handle_key_event(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL));
        type_str(&mut app, "that I am God");
        assert!(app.library.items().is_empty());

        app.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.library.items().len(), 1);
        assert_eq!(app.library.items()[0].text, "Be still,\nand know\nthat I am God");
    }

    #[test]
    fn manual_add_rejects_blank_fields() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Char('a'));
        app.handle_key(KeyCode::Right);
        type_str(&mut app, "   ");
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Enter);

        assert!(app.library.items().is_empty());
        assert!(app.add_error.is_some());
    }

    #[test]
    fn creed_is_added_from_highlight() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Char('a'));
        app.handle_key(KeyCode::Left);
        assert_eq!(app.add_tab, AddTab::Creeds);
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.library.items().len(), 1);
        assert_eq!(app.library.items()[0].reference, CREEDS[0].title);
    }

    #[test]
    fn lookup_without_key_opens_settings() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Char('a'));
        type_str(&mut app, "Ps 23:1-2");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.screen, Screen::Settings);
        assert!(app.form_error.is_some());

        type_str(&mut app, " secret ");
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.screen, Screen::Add);
        assert_eq!(load_api_key(app.library.store()), "secret");
    }

    #[test]
    fn lookup_results_can_be_deselected_before_adding() {
        let (_dir, mut app) = app();
        save_api_key(app.library.store(), "k").unwrap();
        app.handle_key(KeyCode::Char('a'));
        type_str(&mut app, "Ps 23:1-2");
        app.handle_key(KeyCode::Enter);
        settle(&mut app);

        assert_eq!(app.lookup_results.len(), 2);
        assert_eq!(app.add_focus, 1);
        app.handle_key(KeyCode::Char('j'));
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.library.items().len(), 1);
        assert_eq!(app.library.items()[0].reference, "Ps 23:1");
    }

    #[test]
    fn lookup_error_stays_in_view() {
        let (_dir, mut app) = app();
        save_api_key(app.library.store(), "k").unwrap();
        app.handle_key(KeyCode::Char('a'));
        type_str(&mut app, "nowhere");
        app.handle_key(KeyCode::Enter);
        settle(&mut app);

        assert_eq!(app.screen, Screen::Add);
        assert!(app.add_error.as_deref().unwrap().contains("nowhere"));
    }

    #[test]
    fn correct_practice_counts_as_review() {
        let (_dir, mut app) = app_with_item(Status::InProgress);
        assert_eq!(app.library.items()[0].interval, 3);

        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.screen, Screen::Practice);
        settle(&mut app);

        // bank: shepherd, Lord
        app.handle_key(KeyCode::Char('2'));
        app.handle_key(KeyCode::Char('1'));
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.exercise.as_ref().unwrap().result(), Some(true));
        assert_eq!(app.library.items()[0].interval, 6);

        // Already recorded; a second review must not double again.
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.library.items()[0].interval, 6);

        app.handle_key(KeyCode::Char('m'));
        assert_eq!(app.screen, Screen::List);
        assert_eq!(app.library.items()[0].status, Status::Mastered);
    }

    #[test]
    fn wrong_practice_can_be_retried() {
        let (_dir, mut app) = app_with_item(Status::InProgress);
        app.handle_key(KeyCode::Char('p'));
        settle(&mut app);

        app.handle_key(KeyCode::Char('1'));
        app.handle_key(KeyCode::Char('1'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.exercise.as_ref().unwrap().result(), Some(false));
        assert_eq!(app.library.items()[0].interval, 3);

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.exercise.as_ref().unwrap().result(), None);
        assert!(app.exercise.as_ref().unwrap().answers().is_empty());
    }

    #[test]
    fn leaving_practice_discards_request() {
        let (_dir, mut app) = app_with_item(Status::InProgress);
        app.handle_key(KeyCode::Char('p'));
        app.handle_key(KeyCode::Esc);

        assert_eq!(app.screen, Screen::List);
        assert!(app.pending.is_none());
        std::thread::sleep(Duration::from_millis(50));
        app.poll_pending();
        assert!(app.exercise.is_none());
    }

    #[test]
    fn next_quiz_excludes_previous_answers() {
        let (_dir, mut app) = app_with_item(Status::InProgress);
        app.handle_key(KeyCode::Char('z'));
        settle(&mut app);
        assert_eq!(app.quiz.as_ref().unwrap().quiz().answers, vec!["shepherd"]);

        app.handle_key(KeyCode::Char('1'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.quiz.as_ref().unwrap().is_correct(), Some(true));

        app.handle_key(KeyCode::Char('n'));
        settle(&mut app);
        assert_eq!(app.quiz_exclude, vec!["shepherd"]);
        assert_eq!(app.quiz.as_ref().unwrap().quiz().answers, vec!["Lord"]);
    }

    #[test]
    fn delete_needs_confirmation() {
        let (_dir, mut app) = app_with_item(Status::NotStarted);
        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.library.items().len(), 1);
        app.handle_key(KeyCode::Char('j'));
        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.library.items().len(), 1);
        app.handle_key(KeyCode::Char('d'));
        assert!(app.library.items().is_empty());
        assert_eq!(app.list_state.selected(), None);
    }

    #[test]
    fn cycling_status_moves_item_between_tabs() {
        let (_dir, mut app) = app_with_item(Status::InProgress);
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.library.items()[0].status, Status::Mastered);
        assert_eq!(app.list_state.selected(), None);

        app.handle_key(KeyCode::Tab);
        assert_eq!(app.list_tab, ListTab::Completed);
        assert!(app.selected_id().is_some());
    }

    #[test]
    fn goal_rejects_zero() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Char('g'));
        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Char('0'));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.screen, Screen::Goal);
        assert!(app.form_error.is_some());

        app.handle_key(KeyCode::Backspace);
        type_str(&mut app, "12");
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.screen, Screen::List);
        assert_eq!(app.library.goal(), 12);
    }
}
