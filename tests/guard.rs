mod support;

use fitdash::profile::{ACCESS_SLOT, USER_SLOT};
use fitdash::{
    AccessGuard, Denial, GuardOutcome, InMemoryStorage, NoticeLevel, Notifier, ProfileStore,
    ProfileType, Storage, StorageExt,
};
use std::sync::{Arc, Mutex};
use support::{signed_in, trainee_with_trainer};

#[derive(Default)]
struct Toasts(Mutex<Vec<String>>);

impl Notifier for Toasts {
    fn notify(&self, _level: NoticeLevel, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

#[test]
fn unauthenticated_is_redirected_before_any_profile_check() {
    let toasts = Arc::new(Toasts::default());
    let guard = AccessGuard::new(ProfileStore::open(InMemoryStorage::new()))
        .with_notifier(toasts.clone());

    let outcome = guard.check("/trainer/schedule", Some(ProfileType::Trainer));
    assert_eq!(
        outcome,
        GuardOutcome::Redirect {
            to: "/login".to_string(),
            from: "/trainer/schedule".to_string(),
        }
    );
    assert_eq!(toasts.0.lock().unwrap().len(), 1);
}

#[test]
fn owned_but_inactive_profile_is_wrong_active_profile() {
    let (_, store) = trainee_with_trainer();
    let guard = AccessGuard::new(store);

    match guard.check("/trainer/schedule", Some(ProfileType::Trainer)) {
        GuardOutcome::Deny(denial) => {
            assert_eq!(denial.reason(), "wrong active profile");
            assert_eq!(
                denial,
                Denial::WrongActiveProfile {
                    required: ProfileType::Trainer,
                    current: Some(ProfileType::Trainee),
                }
            );
        }
        other => panic!("expected a denial, got {:?}", other),
    }
}

#[test]
fn missing_profile_type_is_its_own_denial() {
    let (_, store) = signed_in(&[(1, ProfileType::Trainee)], Some(1));
    let guard = AccessGuard::new(store);

    let outcome = guard.check("/store/products", Some(ProfileType::Store));
    assert_eq!(
        outcome,
        GuardOutcome::Deny(Denial::MissingProfile {
            required: ProfileType::Store
        })
    );
}

#[test]
fn no_active_profile_reports_none() {
    let (_, store) = signed_in(&[(3, ProfileType::Gym)], None);
    let guard = AccessGuard::new(store);

    let GuardOutcome::Deny(denial) = guard.check("/gym", Some(ProfileType::Gym)) else {
        panic!("expected a denial");
    };
    assert!(denial.to_string().contains("none"));
}

#[test]
fn renders_after_switching_to_the_required_profile() {
    let (_, store) = trainee_with_trainer();
    let guard = AccessGuard::new(store.clone());

    store.switch_profile(2).unwrap();
    assert!(guard.check("/trainer/schedule", Some(ProfileType::Trainer)).is_render());
}

#[test]
fn signing_out_prompts_again() {
    let toasts = Arc::new(Toasts::default());
    let (_, store) = trainee_with_trainer();
    let guard = AccessGuard::new(store.clone()).with_notifier(toasts.clone());

    assert!(guard.check("/", None).is_render());
    store.logout().unwrap();
    guard.check("/", None);
    guard.check("/", None);
    store
        .login(
            &support::account_with(&[(1, ProfileType::Trainee)], Some(1)),
            &fitdash::Credentials::new("a", "r"),
        )
        .unwrap();
    assert!(guard.check("/", None).is_render());
    store.logout().unwrap();
    guard.check("/", None);

    assert_eq!(toasts.0.lock().unwrap().len(), 2);
}

#[test]
fn store_not_loaded_yet_shows_loading() {
    let storage = InMemoryStorage::new();
    storage
        .save_json(USER_SLOT, &support::account_with(&[(1, ProfileType::Trainee)], Some(1)))
        .unwrap();
    storage.set_item(ACCESS_SLOT, "token").unwrap();

    let guard = AccessGuard::new(ProfileStore::new(storage));
    assert_eq!(guard.check("/", Some(ProfileType::Trainee)), GuardOutcome::Loading);
    guard.store().load_profile_data();
    assert!(guard.check("/", Some(ProfileType::Trainee)).is_render());
}
