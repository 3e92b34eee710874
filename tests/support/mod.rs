#![allow(dead_code)]

use fitdash::{Account, Credentials, InMemoryStorage, Profile, ProfileStore, ProfileType};

pub fn account_with(profiles: &[(i64, ProfileType)], current: Option<i64>) -> Account {
    let mut account = Account::new(42, "riley@example.com", "riley");
    account.first_name = Some("Riley".to_string());
    account.current_profile = current;
    account.profiles = Some(
        profiles
            .iter()
            .map(|(id, profile_type)| Profile::new(*id, *profile_type))
            .collect(),
    );
    account
}

/// A signed-in store over a fresh in-memory area.
pub fn signed_in(
    profiles: &[(i64, ProfileType)],
    current: Option<i64>,
) -> (InMemoryStorage, ProfileStore<InMemoryStorage>) {
    let storage = InMemoryStorage::new();
    let store = ProfileStore::open(storage.clone());
    store
        .login(&account_with(profiles, current), &Credentials::new("access-token", "refresh-token"))
        .expect("login writes fit in an unbounded area");
    (storage, store)
}

/// A trainee who also owns a trainer profile, with the trainee profile active.
pub fn trainee_with_trainer() -> (InMemoryStorage, ProfileStore<InMemoryStorage>) {
    signed_in(&[(1, ProfileType::Trainee), (2, ProfileType::Trainer)], Some(1))
}
