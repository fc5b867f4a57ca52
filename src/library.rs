//! The item collection and the singleton records that travel with it.
//!
//! `Library` is the only place that mutates items. Every mutation replaces the
//! whole collection slot in the [`Store`], so a crash never leaves a partially
//! written collection behind.

use anyhow::Result;
use chrono::{DateTime, Datelike, Local, NaiveDate};

use crate::models::{Item, ItemDraft, ProgressSummary, Status, Streak};
use crate::scheduler;
use crate::storage::{Backup, Store, API_KEY_KEY, DEFAULT_GOAL, GOAL_KEY, ITEMS_KEY, STREAK_KEY};

pub struct Library {
    store: Store,
    items: Vec<Item>,
    goal: u32,
    streak: Streak,
}

impl Library {
    pub fn open(store: Store, today: NaiveDate) -> Self {
        let items: Vec<Item> = store.load(ITEMS_KEY, Vec::new());
        let goal = store.load(GOAL_KEY, DEFAULT_GOAL).max(1);
        let streak = store.load(STREAK_KEY, Streak::default()).expire(today);

        log::info!("Loaded {} items from {:?}", items.len(), store.dir());

        Self {
            store,
            items,
            goal,
            streak,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Add accepted drafts, each under a fresh id.
    pub fn add_items(&mut self, drafts: Vec<ItemDraft>, now: DateTime<Local>) -> Result<usize> {
        let count = drafts.len();
        if count == 0 {
            return Ok(0);
        }
        self.items
            .extend(drafts.into_iter().map(|d| Item::from_draft(d, now)));
        log::info!("Added {} items", count);

        self.record_engagement(now.date_naive())?;
        self.save_items()?;
        Ok(count)
    }

    /// Remove exactly the item with `id`.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        if self.items.len() == before {
            return Ok(false);
        }
        log::info!("Deleted item {}", id);
        self.save_items()?;
        Ok(true)
    }

    /// Request a status for an item and reschedule it.
    pub fn set_status(&mut self, id: &str, target: Status, now: DateTime<Local>) -> Result<Option<&Item>> {
        let Some(idx) = self.items.iter().position(|i| i.id == id) else {
            return Ok(None);
        };

        let next = scheduler::transition(&self.items[idx], target, now);
        self.items[idx] = next;
        self.record_engagement(now.date_naive())?;
        self.save_items()?;
        Ok(self.items.get(idx))
    }

    pub fn set_goal(&mut self, goal: u32) -> Result<()> {
        anyhow::ensure!(goal >= 1, "Monthly goal must be at least 1");
        self.goal = goal;
        self.store.save(GOAL_KEY, &goal)
    }

    /// Merge items from a backup, skipping ids already present.
    /// Returns (imported, skipped).
    pub fn restore(&mut self, backup: Backup) -> Result<(usize, usize)> {
        let mut imported = 0;
        let mut skipped = 0;

        for item in backup.items {
            if self.items.iter().any(|i| i.id == item.id) {
                skipped += 1;
            } else {
                self.items.push(item);
                imported += 1;
            }
        }

        if imported > 0 {
            self.save_items()?;
        }
        Ok((imported, skipped))
    }

    fn record_engagement(&mut self, today: NaiveDate) -> Result<()> {
        let next = self.streak.record(today);
        if next != self.streak {
            self.streak = next;
            self.store.save(STREAK_KEY, &self.streak)?;
        }
        Ok(())
    }

    fn save_items(&self) -> Result<()> {
        self.store.save(ITEMS_KEY, &self.items)
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn in_progress(&self) -> Vec<&Item> {
        self.items.iter().filter(|i| !i.is_mastered()).collect()
    }

    /// Mastered items, most recently completed first.
    pub fn completed(&self) -> Vec<&Item> {
        let mut done: Vec<&Item> = self.items.iter().filter(|i| i.is_mastered()).collect();
        done.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        done
    }

    pub fn due_count(&self, now: DateTime<Local>) -> usize {
        scheduler::due_items(&self.items, now).len()
    }

    pub fn summary(&self) -> ProgressSummary {
        let mut summary = ProgressSummary {
            total: self.items.len(),
            ..Default::default()
        };
        for item in &self.items {
            match item.status {
                Status::NotStarted => summary.not_started += 1,
                Status::InProgress => summary.in_progress += 1,
                Status::Mastered => summary.mastered += 1,
            }
        }
        summary
    }

    pub fn completed_this_month(&self, now: DateTime<Local>) -> usize {
        self.items
            .iter()
            .filter(|i| i.is_mastered())
            .filter_map(|i| i.completed_at)
            .filter(|at| at.year() == now.year() && at.month() == now.month())
            .count()
    }

    pub fn goal(&self) -> u32 {
        self.goal
    }

    pub fn streak(&self) -> Streak {
        self.streak
    }
}

/// The stored AI credential.
pub fn load_api_key(store: &Store) -> String {
    store.load(API_KEY_KEY, String::new())
}

pub fn save_api_key(store: &Store, key: &str) -> Result<()> {
    store.save(API_KEY_KEY, key.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    fn library() -> (TempDir, Library) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().to_path_buf()).unwrap();
        (dir, Library::open(store, now().date_naive()))
    }

    fn drafts() -> Vec<ItemDraft> {
        vec![
            ItemDraft::new("Rom 1:1", "Paul, a servant"),
            ItemDraft::new("Rom 1:2", "which he promised"),
            ItemDraft::new("Rom 1:2", "which he promised"),
        ]
    }

    #[test]
    fn bulk_add_assigns_distinct_ids() {
        let (_dir, mut lib) = library();
        assert_eq!(lib.add_items(drafts(), now()).unwrap(), 3);

        let ids: std::collections::HashSet<_> = lib.items().iter().map(|i| &i.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(lib.items().iter().all(|i| i.status == Status::NotStarted));
    }

    #[test]
    fn delete_removes_only_that_item() {
        let (_dir, mut lib) = library();
        lib.add_items(drafts(), now()).unwrap();
        let before = lib.items().to_vec();

        assert!(lib.delete(&before[1].id).unwrap());
        assert_eq!(lib.items(), &[before[0].clone(), before[2].clone()]);
        assert!(!lib.delete(&before[1].id).unwrap());
    }

    #[test]
    fn mutations_are_persisted() {
        let (dir, mut lib) = library();
        lib.add_items(drafts(), now()).unwrap();
        let id = lib.items()[0].id.clone();
        lib.set_status(&id, Status::InProgress, now()).unwrap();
        lib.set_goal(9).unwrap();

        let reopened = Library::open(Store::new(dir.path().to_path_buf()).unwrap(), now().date_naive());
        assert_eq!(reopened.items(), lib.items());
        assert_eq!(reopened.goal(), 9);
        assert_eq!(reopened.streak().count, 1);
    }

    #[test]
    fn two_state_collection_survives_an_add() {
        let dir = TempDir::new().unwrap();
        let legacy = r#"[
            {"id":"1","bookName":"Romans","koreanBookName":"로마서","chapter":1,"verse":16,
             "text":"내가 복음을 부끄러워하지 아니하노니","status":"completed",
             "completedAt":"2024-05-01T09:30:00Z"},
            {"id":"2","bookName":"Romans","koreanBookName":"로마서","chapter":8,"verse":28,
             "text":"우리가 알거니와","status":"in-progress"}
        ]"#;
        std::fs::write(dir.path().join("items.json"), legacy).unwrap();

        let store = Store::new(dir.path().to_path_buf()).unwrap();
        let mut lib = Library::open(store, now().date_naive());
        assert_eq!(lib.items().len(), 2);
        assert_eq!(lib.completed()[0].reference, "로마서 1:16");

        lib.add_items(vec![ItemDraft::new("Heb 11:1", "Now faith")], now()).unwrap();
        assert_eq!(lib.items().len(), 3);

        let on_disk = std::fs::read_to_string(dir.path().join("items.json")).unwrap();
        let saved: Vec<Item> = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(saved.len(), 3);
        assert!(saved.iter().any(|i| i.id == "1" && i.reference == "로마서 1:16"));
        assert!(saved.iter().any(|i| i.id == "2" && i.status == Status::InProgress));
    }

    #[test]
    fn review_walkthrough() {
        let (_dir, mut lib) = library();
        lib.add_items(vec![ItemDraft::new("Heb 11:1", "Now faith")], now()).unwrap();
        let id = lib.items()[0].id.clone();

        let first = lib.set_status(&id, Status::InProgress, now()).unwrap().unwrap().clone();
        assert_eq!(first.interval, 3);
        assert_eq!(first.due_date, Some(now() + Duration::days(3)));
        assert_eq!(first.last_reviewed, Some(now()));

        let mut intervals = Vec::new();
        for _ in 0..6 {
            let item = lib.set_status(&id, Status::InProgress, now()).unwrap().unwrap();
            intervals.push((item.interval, item.status));
        }
        assert_eq!(
            intervals,
            vec![
                (6, Status::InProgress),
                (12, Status::InProgress),
                (24, Status::InProgress),
                (48, Status::InProgress),
                (96, Status::InProgress),
                (180, Status::Mastered),
            ]
        );
        let item = lib.get(&id).unwrap();
        assert!(item.due_date.is_none());
        assert_eq!(lib.completed_this_month(now()), 1);
        assert_eq!(lib.completed().len(), 1);
        assert!(lib.in_progress().is_empty());
    }

    #[test]
    fn unknown_id_is_ignored() {
        let (_dir, mut lib) = library();
        assert!(lib.set_status("nope", Status::Mastered, now()).unwrap().is_none());
        assert_eq!(lib.streak(), Streak::default());
    }

    #[test]
    fn completed_is_newest_first() {
        let (_dir, mut lib) = library();
        lib.add_items(drafts(), now()).unwrap();
        let ids: Vec<String> = lib.items().iter().map(|i| i.id.clone()).collect();
        lib.set_status(&ids[0], Status::Mastered, now()).unwrap();
        lib.set_status(&ids[2], Status::Mastered, now() + Duration::hours(1)).unwrap();

        let done: Vec<&str> = lib.completed().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(done, vec![ids[2].as_str(), ids[0].as_str()]);
        assert_eq!(lib.in_progress().len(), 1);
    }

    #[test]
    fn summary_and_due_count() {
        let (_dir, mut lib) = library();
        lib.add_items(drafts(), now()).unwrap();
        let ids: Vec<String> = lib.items().iter().map(|i| i.id.clone()).collect();
        lib.set_status(&ids[0], Status::InProgress, now()).unwrap();
        lib.set_status(&ids[1], Status::Mastered, now()).unwrap();

        let summary = lib.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.count(Status::NotStarted), 1);
        assert_eq!(summary.count(Status::InProgress), 1);
        assert_eq!(summary.count(Status::Mastered), 1);

        // The unscheduled not-started item is due; the in-progress one is three days out.
        assert_eq!(lib.due_count(now()), 1);
        assert_eq!(lib.due_count(now() + Duration::days(3)), 2);
    }

    #[test]
    fn goal_must_be_positive() {
        let (_dir, mut lib) = library();
        assert!(lib.set_goal(0).is_err());
        assert_eq!(lib.goal(), DEFAULT_GOAL);
    }

    #[test]
    fn restore_skips_known_ids() {
        let (_dir, mut lib) = library();
        lib.add_items(drafts(), now()).unwrap();
        let mut items = lib.items()[..1].to_vec();
        items.push(Item::new("Jude 1:24".into(), "Now unto him".into(), now()));
        let backup = Backup {
            version: 1,
            created_at: now(),
            items,
            monthly_goal: 5,
            streak: Streak::default(),
        };

        assert_eq!(lib.restore(backup).unwrap(), (1, 1));
        assert_eq!(lib.items().len(), 4);
    }

    #[test]
    fn stale_streak_expires_on_open() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().to_path_buf()).unwrap();
        let old = Streak {
            count: 7,
            last_date: Some(now().date_naive() - Duration::days(3)),
        };
        store.save(STREAK_KEY, &old).unwrap();

        let lib = Library::open(store, now().date_naive());
        assert_eq!(lib.streak(), Streak::default());
    }

    #[test]
    fn api_key_is_trimmed() {
        let (_dir, lib) = library();
        save_api_key(lib.store(), "  abc \n").unwrap();
        assert_eq!(load_api_key(lib.store()), "abc");
    }
}
