use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Record, RecordId};

/// Membership state of a gym member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    #[default]
    Active,
    Paused,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipPlan {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

/// A member enrolled at a gym.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(slot = "members")]
pub struct Member {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[record(default)]
    #[serde(default)]
    pub plan: MembershipPlan,
    pub joined_on: NaiveDate,
    #[record(default)]
    #[serde(default)]
    pub status: MemberStatus,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}
