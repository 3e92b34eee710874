//! Profiles - who is signed in and which hat they are wearing.
//!
//! An [`Account`] owns any number of [`Profile`]s, one per role the user has
//! registered (trainee, trainer, gym, store). The account's
//! `current_profile` pointer selects the active one. [`ProfileStore`] loads
//! this from storage and is the only thing that moves the pointer.

mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::storage::Storage;

pub use store::ProfileStore;
pub(crate) use store::WeakProfileStore;
#[cfg(feature = "emitter")]
pub use store::{ProfileSwitched, PROFILE_SWITCHED_EVENT};

/// Slot holding the signed-in [`Account`].
pub const USER_SLOT: &str = "user";
/// Optional slot holding the account's profiles when they are not embedded.
pub const PROFILES_SLOT: &str = "profiles";
/// Slot holding the access credential.
pub const ACCESS_SLOT: &str = "access";
/// Slot holding the refresh credential.
pub const REFRESH_SLOT: &str = "refresh";

/// Every slot the session is derived from.
pub const SESSION_SLOTS: [&str; 4] = [USER_SLOT, PROFILES_SLOT, ACCESS_SLOT, REFRESH_SLOT];

/// Role of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileType {
    Trainee,
    Trainer,
    Gym,
    Store,
}

impl ProfileType {
    pub const ALL: [ProfileType; 4] = [
        ProfileType::Trainee,
        ProfileType::Trainer,
        ProfileType::Gym,
        ProfileType::Store,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Trainee => "trainee",
            ProfileType::Trainer => "trainer",
            ProfileType::Gym => "gym",
            ProfileType::Store => "store",
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown profile type `{0}`")]
pub struct UnknownProfileType(pub String);

/// Parses case-insensitively: `"Trainer"`, `"TRAINER"` and `"trainer"` agree.
impl FromStr for ProfileType {
    type Err = UnknownProfileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProfileType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownProfileType(s.to_string()))
    }
}

impl Serialize for ProfileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProfileType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A role-scoped sub-identity of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
    /// Role-specific fields (bio, gym name, store address, ...), kept as-is.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Profile {
    pub fn new(id: i64, profile_type: ProfileType) -> Self {
        Self {
            id,
            profile_type,
            details: Map::new(),
        }
    }
}

/// The signed-in identity.
///
/// Fields the core does not know about are preserved through `extra`, so
/// writing the account back after a profile switch changes nothing but
/// `current_profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub current_profile: Option<i64>,
    /// Profiles embedded in the account record, if the backend sends them that way.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_profiles"
    )]
    pub profiles: Option<Vec<Profile>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    pub fn new(id: i64, email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            username: username.into(),
            first_name: None,
            last_name: None,
            current_profile: None,
            profiles: None,
            extra: Map::new(),
        }
    }

    /// "First Last" when known, otherwise the username.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.username.clone(),
        }
    }
}

fn lenient_profiles<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Profile>>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw.map(parse_profiles))
}

/// Keep every entry that parses as a [`Profile`]; log and drop the rest.
pub(crate) fn parse_profiles(raw: Vec<Value>) -> Vec<Profile> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<Profile>(value) {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unparsable profile");
                None
            }
        })
        .collect()
}

/// Opaque auth credentials, stored raw in their own slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl Credentials {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    /// Read both credential slots. Unreadable slots count as absent.
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        let read = |key: &str| match storage.get_item(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(slot = key, error = %err, "credential read failed");
                None
            }
        };
        Self {
            access: read(ACCESS_SLOT),
            refresh: read(REFRESH_SLOT),
        }
    }

    /// True when a non-empty access credential is present.
    pub fn is_present(&self) -> bool {
        self.access.as_deref().is_some_and(|token| !token.trim().is_empty())
    }
}

/// Where the store is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing loaded yet.
    #[default]
    Uninitialized,
    /// A load is in progress.
    Loading,
    /// The snapshot reflects storage as of the last load or mutation.
    Ready,
}

/// Derived view of the session at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub account: Option<Account>,
    pub profiles: Vec<Profile>,
    pub current_profile: Option<Profile>,
}

impl SessionSnapshot {
    pub fn current_type(&self) -> Option<ProfileType> {
        self.current_profile.as_ref().map(|p| p.profile_type)
    }

    pub fn has_access(&self, required: ProfileType) -> bool {
        self.current_type() == Some(required)
    }

    pub fn has_profile_type(&self, profile_type: ProfileType) -> bool {
        self.profiles.iter().any(|p| p.profile_type == profile_type)
    }
}
