use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

/// A one-to-one session booked between a trainer and a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(slot = "sessions")]
pub struct TrainingSession {
    pub id: RecordId,
    pub client_name: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[record(default)]
    #[serde(default)]
    pub status: SessionStatus,
}

impl TrainingSession {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether two sessions overlap in time. Cancelled sessions never do.
    pub fn overlaps(&self, other: &TrainingSession) -> bool {
        if self.status == SessionStatus::Cancelled || other.status == SessionStatus::Cancelled {
            return false;
        }
        self.starts_at < other.ends_at() && other.starts_at < self.ends_at()
    }
}
