use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    #[default]
    Open,
    Full,
    Cancelled,
}

/// A recurring group class on a gym's timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(slot = "classes")]
pub struct FitnessClass {
    pub id: RecordId,
    pub title: String,
    pub instructor: String,
    pub weekday: Weekday,
    pub starts_at: NaiveTime,
    pub duration_minutes: u32,
    pub capacity: u32,
    #[record(default)]
    #[serde(default)]
    pub enrolled: u32,
    #[record(default)]
    #[serde(default)]
    pub status: ClassStatus,
}

impl FitnessClass {
    pub fn spots_left(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }

    pub fn has_capacity(&self) -> bool {
        self.status == ClassStatus::Open && self.spots_left() > 0
    }
}
