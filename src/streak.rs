//! Daily engagement streak.

use chrono::NaiveDate;

use crate::models::Streak;

impl Streak {
    /// Record engagement on `today`.
    pub fn record(self, today: NaiveDate) -> Streak {
        match self.last_date {
            Some(last) if last == today => self,
            Some(last) if last.succ_opt() == Some(today) => Streak {
                count: self.count + 1,
                last_date: Some(today),
            },
            _ => Streak {
                count: 1,
                last_date: Some(today),
            },
        }
    }

    /// Drop a streak that lapsed while the app was closed.
    pub fn expire(self, today: NaiveDate) -> Streak {
        match self.last_date {
            Some(last) if (today - last).num_days() > 1 => Streak::default(),
            _ => self,
        }
    }

    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.count > 0 && self.expire(today).count > 0
    }
}
