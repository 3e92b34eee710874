//! Access guard - what a protected route should show.
//!
//! The guard turns the store's state plus a route's required profile type
//! into one [`GuardOutcome`]. The checks run in a fixed order:
//!
//! 1. not signed in: redirect to the login route, remembering where the user was going
//! 2. store still loading: show a placeholder
//! 3. no profile of the required type: deny (the user must register one)
//! 4. the profile exists but is not active: deny (the user must switch)
//! 5. render
//!
//! Steps 3 and 4 are separate outcomes because they lead to different
//! remediation screens.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::profile::{ProfileStore, ProfileType};
use crate::storage::Storage;

/// Default path of the login route.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Presentation-layer sink for short user-facing notices (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// A [`Notifier`] that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!(notice = message),
            NoticeLevel::Warning => tracing::warn!(notice = message),
            NoticeLevel::Error => tracing::error!(notice = message),
        }
    }
}

/// Why a route was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The account has no profile of the required type.
    MissingProfile { required: ProfileType },
    /// The account has one, but a different profile (or none) is active.
    WrongActiveProfile {
        required: ProfileType,
        current: Option<ProfileType>,
    },
}

impl Denial {
    /// Short machine-friendly reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::MissingProfile { .. } => "no such profile type",
            Denial::WrongActiveProfile { .. } => "wrong active profile",
        }
    }

    pub fn required(&self) -> ProfileType {
        match self {
            Denial::MissingProfile { required } | Denial::WrongActiveProfile { required, .. } => {
                *required
            }
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::MissingProfile { required } => write!(
                f,
                "You need a {} profile to view this page. Register one to continue.",
                required
            ),
            Denial::WrongActiveProfile { required, current } => write!(
                f,
                "This page needs your {} profile, but your active profile is {}. Switch profiles to continue.",
                required,
                current.map_or("none", |t| t.as_str())
            ),
        }
    }
}

/// Decision for a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Navigate to `to`; `from` is the originally requested location, to be
    /// restored after login.
    Redirect { to: String, from: String },
    /// Show a loading placeholder.
    Loading,
    /// Show the denial screen.
    Deny(Denial),
    /// Show the protected content.
    Render,
}

impl GuardOutcome {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render)
    }
}

/// Route guard over a [`ProfileStore`].
pub struct AccessGuard<S> {
    store: ProfileStore<S>,
    login_path: String,
    notifier: Arc<dyn Notifier>,
    // Set once the "please login" notice went out; cleared on the next
    // authenticated check so a later sign-out prompts again.
    login_prompted: AtomicBool,
}

impl<S: Storage> AccessGuard<S> {
    pub fn new(store: ProfileStore<S>) -> Self {
        Self {
            store,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            notifier: Arc::new(TracingNotifier),
            login_prompted: AtomicBool::new(false),
        }
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn store(&self) -> &ProfileStore<S> {
        &self.store
    }

    /// Decide what the route at `location` shows. `allowed` of `None` admits
    /// any signed-in user.
    pub fn check(&self, location: &str, allowed: Option<ProfileType>) -> GuardOutcome {
        if !self.store.is_authenticated() {
            if !self.login_prompted.swap(true, Ordering::SeqCst) {
                self.notifier
                    .notify(NoticeLevel::Warning, "Please login to access this page.");
            }
            tracing::debug!(location, "redirecting unauthenticated request to login");
            return GuardOutcome::Redirect {
                to: self.login_path.clone(),
                from: location.to_string(),
            };
        }
        self.login_prompted.store(false, Ordering::SeqCst);

        if self.store.is_loading() {
            return GuardOutcome::Loading;
        }

        let Some(required) = allowed else {
            return GuardOutcome::Render;
        };

        let snapshot = self.store.snapshot();
        if !snapshot.has_profile_type(required) {
            tracing::debug!(location, %required, "denied, no such profile type");
            return GuardOutcome::Deny(Denial::MissingProfile { required });
        }
        if !snapshot.has_access(required) {
            let current = snapshot.current_type();
            tracing::debug!(location, %required, current = ?current, "denied, wrong active profile");
            return GuardOutcome::Deny(Denial::WrongActiveProfile { required, current });
        }

        GuardOutcome::Render
    }
}
