mod support;

use fitdash::profile::USER_SLOT;
use fitdash::{
    CrossTabSync, ProfileStore, ProfileType, SessionPhase, SessionSnapshot, Storage, StorageExt,
    Subscribable,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use support::{account_with, signed_in, trainee_with_trainer};

#[test]
fn switching_twice_is_idempotent() {
    let (_, store) = trainee_with_trainer();

    assert!(store.switch_profile(2).unwrap());
    let after_first = store.current_profile();
    assert!(store.switch_profile(2).unwrap());

    assert_eq!(store.current_profile(), after_first);
    assert_eq!(store.current_profile().map(|p| p.id), Some(2));
}

#[test]
fn switching_to_unknown_id_is_rejected() {
    let (storage, store) = trainee_with_trainer();
    let before = store.current_profile();
    let stored_before = storage.get_item(USER_SLOT).unwrap();

    assert!(!store.switch_profile(9999).unwrap());
    assert_eq!(store.current_profile(), before);
    assert_eq!(storage.get_item(USER_SLOT).unwrap(), stored_before);
}

#[test]
fn owning_a_profile_is_not_having_it_active() {
    let (storage, store) = signed_in(&[(1, ProfileType::Trainee)], Some(1));
    assert!(!store.has_access(ProfileType::Trainer));
    assert!(!store.has_profile_type(ProfileType::Trainer));

    // The trainer profile is registered elsewhere; the active one stays put.
    let account = account_with(&[(1, ProfileType::Trainee), (2, ProfileType::Trainer)], Some(1));
    storage.save_json(USER_SLOT, &account).unwrap();
    store.load_profile_data();

    assert!(store.has_profile_type(ProfileType::Trainer));
    assert!(!store.has_access(ProfileType::Trainer));
    assert!(store.has_access(ProfileType::Trainee));
}

#[test]
fn reload_goes_through_loading_and_never_back_to_uninitialized() {
    let (_, store) = trainee_with_trainer();
    let phases = Arc::new(std::sync::Mutex::new(Vec::new()));

    let seen = Arc::clone(&phases);
    let observed = store.clone();
    let _sub = store.subscribe(Arc::new(move |_: &SessionSnapshot| {
        seen.lock().unwrap().push(observed.phase());
    }));

    store.load_profile_data();
    assert_eq!(*phases.lock().unwrap(), vec![SessionPhase::Ready]);
    assert_eq!(store.phase(), SessionPhase::Ready);
}

#[test]
fn other_context_converges_after_switch() {
    let (tab_a, store_a) = trainee_with_trainer();
    let tab_b = tab_a.new_context();
    let store_b = ProfileStore::open(tab_b.clone());
    let _sync = CrossTabSync::attach(&tab_b, &store_b);

    let renders = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&renders);
    let _sub = store_b.subscribe(Arc::new(move |_: &SessionSnapshot| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    store_a.switch_profile(2).unwrap();

    assert!(store_b.has_access(ProfileType::Trainer));
    assert_eq!(store_b.snapshot(), store_a.snapshot());
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[test]
fn login_in_other_context_signs_this_one_in() {
    let tab_a = fitdash::InMemoryStorage::new();
    let tab_b = tab_a.new_context();
    let store_a = ProfileStore::open(tab_a.clone());
    let store_b = ProfileStore::open(tab_b.clone());
    let _sync = CrossTabSync::attach(&tab_b, &store_b);
    assert!(!store_b.snapshot().is_authenticated);

    store_a
        .login(
            &account_with(&[(5, ProfileType::Gym)], Some(5)),
            &fitdash::Credentials::new("a", "r"),
        )
        .unwrap();

    let snapshot = store_b.snapshot();
    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.current_type(), Some(ProfileType::Gym));
}
