//! Storage module: named JSON slots on disk, plus backup and CSV import.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Item, ItemDraft, Streak};

pub const ITEMS_KEY: &str = "items";
pub const GOAL_KEY: &str = "monthly-goal";
pub const STREAK_KEY: &str = "streak";
pub const API_KEY_KEY: &str = "api-key";

pub const DEFAULT_GOAL: u32 = 5;

/// Key-value persistence: one JSON file per key.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    /// Get default storage location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recite")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read a slot. Missing, unreadable or unparsable slots yield `default`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let path = self.slot_path(key);
        if !path.exists() {
            return default;
        }

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Could not read slot '{}': {}", key, e);
                return default;
            }
        };

        match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not parse slot '{}', using default: {}", key, e);
                default
            }
        }
    }

    /// Replace a slot's whole value.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.slot_path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize slot '{}'", key))?;
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {:?}", path))?;
        Ok(())
    }

    /// Get default backup path.
    pub fn default_backup_path() -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!("recite_backup_{}.json", timestamp))
    }

    /// Export every slot except the credential to a backup file.
    pub fn export_backup(&self, path: &Path) -> Result<usize> {
        let backup = Backup {
            version: 1,
            created_at: chrono::Local::now(),
            items: self.load(ITEMS_KEY, Vec::new()),
            monthly_goal: self.load(GOAL_KEY, DEFAULT_GOAL),
            streak: self.load(STREAK_KEY, Streak::default()),
        };

        let json = serde_json::to_string_pretty(&backup)?;
        fs::write(path, json).with_context(|| format!("Failed to write backup: {:?}", path))?;

        Ok(backup.items.len())
    }

    /// Read a backup file written by [`Store::export_backup`].
    pub fn read_backup(path: &Path) -> Result<Backup> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read backup: {:?}", path))?;
        let backup = serde_json::from_str(&json).with_context(|| "Backup file is not valid")?;
        Ok(backup)
    }
}

/// Backup format containing the collection and its singletons.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Local>,
    pub items: Vec<Item>,
    #[serde(default = "default_goal")]
    pub monthly_goal: u32,
    #[serde(default)]
    pub streak: Streak,
}

fn default_goal() -> u32 {
    DEFAULT_GOAL
}

/// Read `reference,text` rows from a CSV file.
///
/// A first row mentioning "reference" is treated as a header. The text column
/// may be double-quoted to contain commas; `""` inside quotes is a literal quote.
pub fn import_csv(csv_path: &Path) -> Result<Vec<ItemDraft>> {
    let content = fs::read_to_string(csv_path)
        .with_context(|| format!("Failed to read CSV file: {:?}", csv_path))?;
    Ok(parse_csv(&content))
}

fn parse_csv(content: &str) -> Vec<ItemDraft> {
    let mut drafts = Vec::new();

    for (i, line) in content.lines().enumerate() {
        // Skip header
        if i == 0 && line.to_lowercase().contains("reference") {
            continue;
        }

        let fields = split_csv_line(line);
        if fields.len() >= 2 {
            let reference = fields[0].trim().to_string();
            let text = fields[1..].join(",").trim().to_string();

            if !reference.is_empty() && !text.is_empty() {
                drafts.push(ItemDraft { reference, text });
            }
        }
    }

    drafts
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("data")).unwrap();
        (dir, store)
    }

    #[test]
    fn missing_slot_returns_default() {
        let (_dir, store) = store();
        assert_eq!(store.load(GOAL_KEY, 5u32), 5);
    }

    #[test]
    fn saved_value_is_loaded_back() {
        let (_dir, store) = store();
        store.save(GOAL_KEY, &12u32).unwrap();
        assert_eq!(store.load(GOAL_KEY, 5u32), 12);
        assert!(!store.dir().join("monthly-goal.json.tmp").exists());
    }

    #[test]
    fn corrupt_slot_falls_back_to_default() {
        let (_dir, store) = store();
        fs::write(store.dir().join("items.json"), "{not json").unwrap();
        let items: Vec<Item> = store.load(ITEMS_KEY, Vec::new());
        assert!(items.is_empty());
    }

    #[test]
    fn backup_round_trip_excludes_credential() {
        let (dir, store) = store();
        let item = Item::new("Ps 1:1".into(), "Blessed".into(), chrono::Local::now());
        store.save(ITEMS_KEY, &vec![item.clone()]).unwrap();
        store.save(GOAL_KEY, &8u32).unwrap();
        store.save(API_KEY_KEY, "secret").unwrap();

        let path = dir.path().join("backup.json");
        assert_eq!(store.export_backup(&path).unwrap(), 1);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));

        let backup = Store::read_backup(&path).unwrap();
        assert_eq!(backup.items, vec![item]);
        assert_eq!(backup.monthly_goal, 8);
    }

    #[test]
    fn csv_rows_become_drafts() {
        let csv = "reference,text\n\
                   John 11:35,Jesus wept.\n\
                   Rom 12:2,\"Do not conform, but be transformed\"\n\
                   ,missing reference\n\
                   Eph 2:8,\"say \"\"grace\"\"\"\n";
        let drafts = parse_csv(csv);
        assert_eq!(
            drafts,
            vec![
                ItemDraft::new("John 11:35", "Jesus wept."),
                ItemDraft::new("Rom 12:2", "Do not conform, but be transformed"),
                ItemDraft::new("Eph 2:8", "say \"grace\""),
            ]
        );
    }

    #[test]
    fn unquoted_commas_stay_in_text() {
        let drafts = parse_csv("Gen 1:1,In the beginning, God created");
        assert_eq!(drafts[0].text, "In the beginning, God created");
    }
}
