//! Data models for memorized items and engagement records.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an item is in its memorization lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    #[serde(alias = "시작 안 함")]
    NotStarted,
    #[serde(alias = "진행 중")]
    InProgress,
    // "completed" is the terminal state of older collections
    #[serde(alias = "completed", alias = "완료")]
    Mastered,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::Mastered];

    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::InProgress => "In progress",
            Self::Mastered => "Mastered",
        }
    }

    /// Next status in list order, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            Self::NotStarted => Self::InProgress,
            Self::InProgress => Self::Mastered,
            Self::Mastered => Self::NotStarted,
        }
    }

    pub fn color_for_theme(&self, theme: &crate::ui::theme::Theme) -> ratatui::style::Color {
        match self {
            Self::NotStarted => theme.colors.status_not_started,
            Self::InProgress => theme.colors.status_in_progress,
            Self::Mastered => theme.colors.status_mastered,
        }
    }
}

/// A single memorizable text: a verse, a creed, a prayer or a free-form note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredItem")]
pub struct Item {
    pub id: String,
    pub reference: String,
    pub text: String,
    pub status: Status,

    // Scheduling
    pub interval: u32,
    pub last_reviewed: Option<DateTime<Local>>,
    pub due_date: Option<DateTime<Local>>,
    pub completed_at: Option<DateTime<Local>>,

    pub created_at: DateTime<Local>,
}

/// On-disk item as any version of the collection wrote it. Two-state
/// collections locate a verse by book, chapter and verse instead of a
/// reference string.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    book_name: Option<String>,
    #[serde(default)]
    korean_book_name: Option<String>,
    #[serde(default)]
    chapter: Option<u32>,
    #[serde(default)]
    verse: Option<u32>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    status: Status,
    #[serde(default)]
    interval: u32,
    #[serde(default)]
    last_reviewed: Option<DateTime<Local>>,
    #[serde(default)]
    due_date: Option<DateTime<Local>>,
    #[serde(default)]
    completed_at: Option<DateTime<Local>>,
    #[serde(default = "Local::now")]
    created_at: DateTime<Local>,
}

impl StoredItem {
    fn locator(&self) -> String {
        let book = self
            .korean_book_name
            .as_deref()
            .or(self.book_name.as_deref())
            .unwrap_or_default();
        let place = match (self.chapter, self.verse) {
            (Some(chapter), Some(verse)) => format!("{}:{}", chapter, verse),
            (Some(chapter), None) => chapter.to_string(),
            _ => String::new(),
        };
        format!("{} {}", book, place).trim().to_string()
    }
}

impl From<StoredItem> for Item {
    fn from(stored: StoredItem) -> Self {
        let reference = match stored.reference.clone() {
            Some(reference) => reference,
            None => stored.locator(),
        };
        Self {
            id: stored.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            reference,
            text: stored.text,
            status: stored.status,
            interval: stored.interval,
            last_reviewed: stored.last_reviewed,
            due_date: stored.due_date,
            completed_at: stored.completed_at,
            created_at: stored.created_at,
        }
    }
}

impl Item {
    pub fn new(reference: String, text: String, now: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reference,
            text,
            status: Status::NotStarted,
            interval: 0,
            last_reviewed: None,
            due_date: None,
            completed_at: None,
            created_at: now,
        }
    }

    pub fn from_draft(draft: ItemDraft, now: DateTime<Local>) -> Self {
        Self::new(draft.reference, draft.text, now)
    }

    pub fn is_mastered(&self) -> bool {
        self.status == Status::Mastered
    }
}

/// An entry that has been looked up, typed in or picked from the creeds
/// but not yet added to the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub reference: String,
    pub text: String,
}

impl ItemDraft {
    pub fn new(reference: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            text: text.into(),
        }
    }
}

/// Consecutive days with at least one review or addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub count: u32,
    pub last_date: Option<NaiveDate>,
}

/// Item counts per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub mastered: usize,
}

impl ProgressSummary {
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::NotStarted => self.not_started,
            Status::InProgress => self.in_progress,
            Status::Mastered => self.mastered,
        }
    }
}

/// Characters that close a clause: punctuation and common Korean
/// connective or sentence endings.
const CLAUSE_ENDINGS: &[char] = &[
    ',', ';', '고', '며', '니', '데', '서', '요', '다', '까', '라', '자', '네', '으', '이', '하',
    '여', '나', '되', '므', '로',
];

/// Break text after clause endings so long verses read in phrases.
pub fn display_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if CLAUSE_ENDINGS.contains(&c) {
            if let Some(next) = chars.peek() {
                if next.is_whitespace() && *next != '\n' {
                    chars.next();
                    out.push('\n');
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_completed_status_loads_as_mastered() {
        let json = r#"{"id":"a","reference":"John 3:16","text":"For God","status":"completed"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.status, Status::Mastered);
        assert_eq!(item.interval, 0);
        assert!(item.due_date.is_none());
    }

    #[test]
    fn two_state_records_get_a_reference() {
        let json = r#"[
            {"id":"1","bookName":"Romans","koreanBookName":"로마서","chapter":1,"verse":16,
             "text":"내가 복음을 부끄러워하지 아니하노니","status":"completed",
             "completedAt":"2024-05-01T09:30:00Z"},
            {"id":"2","bookName":"Romans","chapter":8,"verse":28,
             "text":"And we know","status":"in-progress"}
        ]"#;
        let items: Vec<Item> = serde_json::from_str(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].reference, "로마서 1:16");
        assert_eq!(items[0].status, Status::Mastered);
        assert!(items[0].completed_at.is_some());
        assert_eq!(items[1].reference, "Romans 8:28");
        assert_eq!(items[1].status, Status::InProgress);
    }

    #[test]
    fn stored_reference_wins_over_locator() {
        let json = r#"{"id":"a","reference":"Rom 1:1","bookName":"Romans","chapter":2,"verse":3,"text":"x","status":"not-started"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.reference, "Rom 1:1");
    }

    #[test]
    fn korean_labels_are_accepted() {
        let status: Status = serde_json::from_str("\"진행 중\"").unwrap();
        assert_eq!(status, Status::InProgress);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"in-progress\"");
    }

    #[test]
    fn item_serializes_camel_case() {
        let item = Item::new("Ps 23:1".into(), "The Lord".into(), Local::now());
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("lastReviewed").is_some());
        assert!(value.get("completedAt").is_some());
        assert_eq!(value["status"], "not-started");
    }

    #[test]
    fn new_items_get_distinct_ids() {
        let now = Local::now();
        let a = Item::new("Rom 1:1".into(), "x".into(), now);
        let b = Item::new("Rom 1:1".into(), "x".into(), now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn display_text_breaks_after_commas() {
        assert_eq!(display_text("a, b; c"), "a,\nb;\nc");
        assert_eq!(display_text("a,b"), "a,b");
        assert_eq!(display_text("a,\nb"), "a,\nb");
    }

    #[test]
    fn display_text_breaks_after_korean_endings() {
        assert_eq!(
            display_text("믿음은 바라는 것들의 실상이요 보이지 않는 것들의 증거니"),
            "믿음은 바라는 것들의 실상이요\n보이지 않는 것들의 증거니"
        );
        assert_eq!(display_text("사랑하고 섬기라"), "사랑하고\n섬기라");
    }

    #[test]
    fn status_cycle_visits_every_state() {
        let mut s = Status::NotStarted;
        for _ in 0..3 {
            s = s.next();
        }
        assert_eq!(s, Status::NotStarted);
    }
}
