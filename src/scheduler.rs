//! Review scheduling: how a status change moves an item's interval and due date.
//!
//! Reviewing an item that is already in progress doubles its interval (never
//! below [`MIN_INTERVAL`]). Starting or restarting an item seeds the interval at
//! [`RESTART_INTERVAL`]. Once the interval reaches [`MAX_INTERVAL`] the item is
//! promoted to mastered in the same step and is no longer scheduled.

use chrono::{DateTime, Duration, Local};

use crate::models::{Item, Status};

pub const MIN_INTERVAL: u32 = 2;
pub const RESTART_INTERVAL: u32 = 3;
pub const MAX_INTERVAL: u32 = 180;

/// Apply a requested status to `item` at time `now`.
///
/// Pure: the result depends only on the arguments.
pub fn transition(item: &Item, target: Status, now: DateTime<Local>) -> Item {
    let (status, interval) = next_state(item, target);

    let due_date = if interval > 0 && status != Status::Mastered {
        Some(now + Duration::days(interval as i64))
    } else {
        None
    };

    let completed_at = match (item.status, status) {
        (Status::Mastered, Status::Mastered) => item.completed_at.or(Some(now)),
        (_, Status::Mastered) => Some(now),
        _ => None,
    };

    Item {
        status,
        interval,
        last_reviewed: Some(now),
        due_date,
        completed_at,
        ..item.clone()
    }
}

/// Interval the item would get if reviewed again as in-progress.
pub fn preview_interval(item: &Item) -> u32 {
    next_state(item, Status::InProgress).1
}

fn next_state(item: &Item, target: Status) -> (Status, u32) {
    match target {
        Status::InProgress => {
            let interval = if item.status == Status::InProgress {
                item.interval
                    .saturating_mul(2)
                    .clamp(MIN_INTERVAL, MAX_INTERVAL)
            } else {
                RESTART_INTERVAL
            };
            if interval >= MAX_INTERVAL {
                (Status::Mastered, MAX_INTERVAL)
            } else {
                (Status::InProgress, interval)
            }
        }
        Status::Mastered => (Status::Mastered, MAX_INTERVAL),
        Status::NotStarted => (Status::NotStarted, 0),
    }
}

/// Whether an item should be surfaced for review today.
pub fn is_due(item: &Item, now: DateTime<Local>) -> bool {
    if item.is_mastered() {
        return false;
    }
    match item.due_date {
        None => true,
        Some(due) => due.date_naive() <= now.date_naive(),
    }
}

pub fn due_items<'a>(items: &'a [Item], now: DateTime<Local>) -> Vec<&'a Item> {
    items.iter().filter(|i| is_due(i, now)).collect()
}
