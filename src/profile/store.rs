use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

#[cfg(feature = "emitter")]
use std::sync::Mutex;

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;
#[cfg(feature = "emitter")]
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{Storage, StorageError, StorageExt};
use crate::subscription::{Listener, Listeners, Subscribable, Subscription};

use super::{
    parse_profiles, Account, Credentials, Profile, ProfileType, SessionPhase, SessionSnapshot,
    ACCESS_SLOT, PROFILES_SLOT, REFRESH_SLOT, USER_SLOT,
};

/// Event name emitted on the detached channel after a successful switch.
#[cfg(feature = "emitter")]
pub const PROFILE_SWITCHED_EVENT: &str = "profile:switched";

/// Payload of [`PROFILE_SWITCHED_EVENT`].
#[cfg(feature = "emitter")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSwitched {
    pub account_id: i64,
    pub profile_id: i64,
    pub profile_type: ProfileType,
}

struct StoreState {
    phase: SessionPhase,
    snapshot: SessionSnapshot,
}

struct Shared {
    state: RwLock<StoreState>,
    listeners: Listeners<SessionSnapshot>,
    #[cfg(feature = "emitter")]
    emitter: Mutex<EventEmitter>,
}

/// Single source of truth for the signed-in account and its active profile.
///
/// Clone-friendly: clones are handles onto the same state, so a guard, a
/// cross-context sync and any number of views can share one store.
///
/// Two notification channels:
/// - [`Subscribable<SessionSnapshot>`]: synchronous, fired on every load and
///   every mutation made through this store.
/// - [`on_profile_switched`](Self::on_profile_switched) (feature `emitter`):
///   detached listeners, delivered asynchronously after a switch.
pub struct ProfileStore<S> {
    storage: S,
    shared: Arc<Shared>,
}

/// Weak counterpart of [`ProfileStore`].
pub(crate) struct WeakProfileStore<S> {
    storage: S,
    shared: Weak<Shared>,
}

impl<S: Clone> WeakProfileStore<S> {
    pub(crate) fn upgrade(&self) -> Option<ProfileStore<S>> {
        self.shared.upgrade().map(|shared| ProfileStore {
            storage: self.storage.clone(),
            shared,
        })
    }
}

impl<S: Clone> Clone for ProfileStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Storage> ProfileStore<S> {
    /// Create an uninitialized store over `storage`. Nothing is read until
    /// [`load_profile_data`](Self::load_profile_data).
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            shared: Arc::new(Shared {
                state: RwLock::new(StoreState {
                    phase: SessionPhase::Uninitialized,
                    snapshot: SessionSnapshot::default(),
                }),
                listeners: Listeners::new(),
                #[cfg(feature = "emitter")]
                emitter: Mutex::new(EventEmitter::new()),
            }),
        }
    }

    /// Create a store and load it immediately.
    pub fn open(storage: S) -> Self {
        let store = Self::new(storage);
        store.load_profile_data();
        store
    }

    /// A handle that does not keep the store's state alive.
    pub(crate) fn downgrade(&self) -> WeakProfileStore<S>
    where
        S: Clone,
    {
        WeakProfileStore {
            storage: self.storage.clone(),
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Re-derive the session from storage.
    ///
    /// Reads never fail: a missing or corrupt `user` slot yields a signed-out
    /// snapshot. Moves the phase through `Loading` to `Ready` and notifies
    /// subscribers with the new snapshot.
    pub fn load_profile_data(&self) -> SessionSnapshot {
        self.write_state().phase = SessionPhase::Loading;

        let snapshot = read_session(&self.storage);
        tracing::debug!(
            authenticated = snapshot.is_authenticated,
            profiles = snapshot.profiles.len(),
            current = ?snapshot.current_type(),
            "profile data loaded"
        );

        {
            let mut state = self.write_state();
            state.phase = SessionPhase::Ready;
            state.snapshot = snapshot.clone();
        }
        self.shared.listeners.notify(&snapshot);
        snapshot
    }

    /// Make `profile_id` the active profile.
    ///
    /// Returns `Ok(false)` without touching anything when the id is not one
    /// of the loaded profiles. On success the account is written back to
    /// storage before memory changes; a write failure propagates and leaves
    /// the store as it was.
    pub fn switch_profile(&self, profile_id: i64) -> Result<bool, StorageError> {
        let (account, profile) = {
            let state = self.read_state();
            let snapshot = &state.snapshot;
            let profile = snapshot.profiles.iter().find(|p| p.id == profile_id).cloned();
            match (snapshot.account.clone(), profile) {
                (Some(account), Some(profile)) => (account, profile),
                _ => {
                    tracing::debug!(profile_id, "switch rejected, profile not found");
                    return Ok(false);
                }
            }
        };

        let mut account = account;
        account.current_profile = Some(profile_id);
        self.storage.save_json(USER_SLOT, &account)?;

        let snapshot = {
            let mut state = self.write_state();
            state.snapshot.account = Some(account.clone());
            state.snapshot.current_profile = Some(profile.clone());
            state.phase = SessionPhase::Ready;
            state.snapshot.clone()
        };

        tracing::info!(
            account_id = account.id,
            profile_id,
            profile_type = %profile.profile_type,
            "switched active profile"
        );
        self.shared.listeners.notify(&snapshot);

        #[cfg(feature = "emitter")]
        self.emit_switched(ProfileSwitched {
            account_id: account.id,
            profile_id,
            profile_type: profile.profile_type,
        });

        Ok(true)
    }

    /// True iff there is an active profile and it has the `required` type.
    ///
    /// Parse route parameters with [`ProfileType::from_str`](std::str::FromStr),
    /// which is case-insensitive.
    pub fn has_access(&self, required: ProfileType) -> bool {
        self.read_state().snapshot.has_access(required)
    }

    /// True iff any loaded profile, active or not, has `profile_type`.
    pub fn has_profile_type(&self, profile_type: ProfileType) -> bool {
        self.read_state().snapshot.has_profile_type(profile_type)
    }

    /// True when an access credential is present in storage.
    ///
    /// Read straight from storage so that it is meaningful before the first
    /// load completes.
    pub fn is_authenticated(&self) -> bool {
        Credentials::load(&self.storage).is_present()
    }

    pub fn phase(&self) -> SessionPhase {
        self.read_state().phase
    }

    /// True until the first load has finished, and during any reload.
    pub fn is_loading(&self) -> bool {
        self.phase() != SessionPhase::Ready
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read_state().snapshot.clone()
    }

    pub fn account(&self) -> Option<Account> {
        self.read_state().snapshot.account.clone()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.read_state().snapshot.current_profile.clone()
    }

    pub fn profiles(&self) -> Vec<Profile> {
        self.read_state().snapshot.profiles.clone()
    }

    /// Every loaded profile of `profile_type`. Accounts may hold more than one.
    pub fn profiles_of_type(&self, profile_type: ProfileType) -> Vec<Profile> {
        self.read_state()
            .snapshot
            .profiles
            .iter()
            .filter(|p| p.profile_type == profile_type)
            .cloned()
            .collect()
    }

    /// Store what the login collaborator received and reload.
    pub fn login(
        &self,
        account: &Account,
        credentials: &Credentials,
    ) -> Result<SessionSnapshot, StorageError> {
        write_optional(&self.storage, ACCESS_SLOT, credentials.access.as_deref())?;
        write_optional(&self.storage, REFRESH_SLOT, credentials.refresh.as_deref())?;
        self.storage.save_json(USER_SLOT, account)?;
        tracing::info!(account_id = account.id, "session established");
        Ok(self.load_profile_data())
    }

    /// Drop the account, its profiles and the credentials, then reload.
    pub fn logout(&self) -> Result<SessionSnapshot, StorageError> {
        for slot in [USER_SLOT, PROFILES_SLOT, ACCESS_SLOT, REFRESH_SLOT] {
            self.storage.remove_item(slot)?;
        }
        tracing::info!("session cleared");
        Ok(self.load_profile_data())
    }

    /// Register a detached listener for successful profile switches.
    ///
    /// Delivery is asynchronous (each call runs on its own thread). Returns an
    /// id for [`remove_switch_listener`](Self::remove_switch_listener).
    #[cfg(feature = "emitter")]
    pub fn on_profile_switched<F>(&self, listener: F) -> String
    where
        F: Fn(ProfileSwitched) + Send + Sync + 'static,
    {
        self.shared
            .emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on(PROFILE_SWITCHED_EVENT, listener)
    }

    #[cfg(feature = "emitter")]
    pub fn remove_switch_listener(&self, id: &str) -> bool {
        self.shared
            .emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_listener(id)
            .is_some()
    }

    #[cfg(feature = "emitter")]
    fn emit_switched(&self, payload: ProfileSwitched) {
        self.shared
            .emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(PROFILE_SWITCHED_EVENT, payload);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Storage> Subscribable<SessionSnapshot> for ProfileStore<S> {
    fn subscribe(&self, listener: Listener<SessionSnapshot>) -> Subscription {
        self.shared.listeners.add(listener)
    }
}

fn write_optional<S: Storage>(storage: &S, key: &str, value: Option<&str>) -> Result<(), StorageError> {
    match value {
        Some(value) => storage.set_item(key, value),
        None => storage.remove_item(key),
    }
}

/// Derive a snapshot from the session slots.
fn read_session<S: Storage>(storage: &S) -> SessionSnapshot {
    let credentials = Credentials::load(storage);
    let Some(account) = storage.load_json::<Account>(USER_SLOT) else {
        return SessionSnapshot::default();
    };

    let profiles = match &account.profiles {
        Some(embedded) => embedded.clone(),
        None => storage
            .load_json::<Vec<Value>>(PROFILES_SLOT)
            .map(parse_profiles)
            .unwrap_or_default(),
    };

    let current_profile = account.current_profile.and_then(|id| {
        let found = profiles.iter().find(|p| p.id == id).cloned();
        if found.is_none() {
            tracing::warn!(profile_id = id, "current profile is not among the account's profiles");
        }
        found
    });

    SessionSnapshot {
        is_authenticated: credentials.is_present(),
        account: Some(account),
        profiles,
        current_profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use serde_json::json;
    use std::sync::Mutex;

    fn seeded(user: Value) -> (InMemoryStorage, ProfileStore<InMemoryStorage>) {
        let storage = InMemoryStorage::new();
        storage.set_item(ACCESS_SLOT, "token").unwrap();
        storage.save_json(USER_SLOT, &user).unwrap();
        let store = ProfileStore::open(storage.clone());
        (storage, store)
    }

    fn trainee_and_trainer() -> Value {
        json!({
            "id": 10,
            "email": "sam@example.com",
            "username": "sam",
            "current_profile": 1,
            "profiles": [
                {"id": 1, "type": "trainee"},
                {"id": 2, "type": "trainer", "bio": "HIIT"}
            ]
        })
    }

    #[test]
    fn phases() {
        let store = ProfileStore::new(InMemoryStorage::new());
        assert_eq!(store.phase(), SessionPhase::Uninitialized);
        assert!(store.is_loading());

        store.load_profile_data();
        assert_eq!(store.phase(), SessionPhase::Ready);
        assert!(!store.is_loading());
    }

    #[test]
    fn loads_embedded_profiles() {
        let (_, store) = seeded(trainee_and_trainer());
        let snapshot = store.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.profiles.len(), 2);
        assert_eq!(snapshot.current_type(), Some(ProfileType::Trainee));
    }

    #[test]
    fn loads_profiles_from_separate_slot() {
        let storage = InMemoryStorage::new();
        storage
            .save_json(USER_SLOT, &json!({"id": 1, "email": "e", "username": "u", "current_profile": 5}))
            .unwrap();
        storage
            .save_json(PROFILES_SLOT, &json!([{"id": 5, "type": "gym"}, {"id": 6, "type": "nope"}]))
            .unwrap();

        let store = ProfileStore::open(storage);
        assert_eq!(store.profiles().len(), 1);
        assert!(store.has_access(ProfileType::Gym));
        // No access credential: the account is known but not authenticated.
        assert!(!store.snapshot().is_authenticated);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn dangling_current_profile_is_ignored() {
        let mut user = trainee_and_trainer();
        user["current_profile"] = json!(99);
        let (_, store) = seeded(user);
        assert_eq!(store.current_profile(), None);
        assert!(store.has_profile_type(ProfileType::Trainee));
        assert!(!store.has_access(ProfileType::Trainee));
    }

    #[test]
    fn corrupt_user_slot_is_signed_out() {
        let storage = InMemoryStorage::new();
        storage.set_item(ACCESS_SLOT, "token").unwrap();
        storage.set_item(USER_SLOT, "{\"id\":").unwrap();
        let store = ProfileStore::open(storage);

        assert_eq!(store.snapshot(), SessionSnapshot::default());
        assert_eq!(store.phase(), SessionPhase::Ready);
    }

    #[test]
    fn switch_persists_and_notifies() {
        let (storage, store) = seeded(trainee_and_trainer());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(Arc::new(move |snapshot: &SessionSnapshot| {
            sink.lock().unwrap().push(snapshot.current_type());
        }));

        assert!(store.switch_profile(2).unwrap());
        assert!(store.has_access(ProfileType::Trainer));

        let stored: Account = storage.load_json(USER_SLOT).unwrap();
        assert_eq!(stored.current_profile, Some(2));
        assert_eq!(stored.profiles.as_ref().map(Vec::len), Some(2));
        assert_eq!(*seen.lock().unwrap(), vec![Some(ProfileType::Trainer)]);
    }

    /// Storage whose writes always fail, as if the area were full.
    #[derive(Clone)]
    struct FullStorage(InMemoryStorage);

    impl Subscribable<crate::StorageEvent> for FullStorage {
        fn subscribe(&self, listener: Listener<crate::StorageEvent>) -> Subscription {
            self.0.subscribe(listener)
        }
    }

    impl Storage for FullStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed: value.len(),
                quota: 0,
            })
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove_item(key)
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.0.clear()
        }

        fn keys(&self) -> Result<Vec<String>, StorageError> {
            self.0.keys()
        }
    }

    #[test]
    fn failed_switch_write_leaves_state() {
        let (storage, _) = seeded(trainee_and_trainer());
        let store = ProfileStore::open(FullStorage(storage.clone()));
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(Arc::new(move |_: &SessionSnapshot| {
            *sink.lock().unwrap() += 1;
        }));

        let err = store.switch_profile(2).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(store.current_profile().map(|p| p.id), Some(1));
        assert_eq!(*seen.lock().unwrap(), 0);

        let stored: Account = storage.load_json(USER_SLOT).unwrap();
        assert_eq!(stored.current_profile, Some(1));
    }

    #[test]
    fn login_and_logout() {
        let storage = InMemoryStorage::new();
        let store = ProfileStore::open(storage.clone());
        assert!(!store.is_authenticated());

        let mut account = Account::new(3, "kim@example.com", "kim");
        account.profiles = Some(vec![Profile::new(8, ProfileType::Store)]);
        account.current_profile = Some(8);

        let snapshot = store.login(&account, &Credentials::new("a", "r")).unwrap();
        assert!(snapshot.is_authenticated);
        assert!(store.has_access(ProfileType::Store));

        let snapshot = store.logout().unwrap();
        assert!(!snapshot.is_authenticated);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn profiles_of_type_keeps_duplicates() {
        let (_, store) = seeded(json!({
            "id": 1, "email": "e", "username": "u", "current_profile": 2,
            "profiles": [{"id": 1, "type": "trainee"}, {"id": 2, "type": "trainee"}]
        }));
        assert_eq!(store.profiles_of_type(ProfileType::Trainee).len(), 2);
        assert!(store.has_access(ProfileType::Trainee));
    }

    #[cfg(feature = "emitter")]
    #[test]
    fn switch_emits_detached_event() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (_, store) = seeded(trainee_and_trainer());
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        store.on_profile_switched(move |event: ProfileSwitched| {
            let _ = tx.lock().unwrap().send(event);
        });

        store.switch_profile(2).unwrap();

        // EventEmitter delivers on its own thread.
        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            event,
            ProfileSwitched {
                account_id: 10,
                profile_id: 2,
                profile_type: ProfileType::Trainer,
            }
        );
    }
}
