extern crate self as fitdash;

pub mod collection;
pub mod config;
pub mod domain;
pub mod guard;
pub mod profile;
pub mod storage;
pub mod subscription;
pub mod sync;

pub use collection::{CollectionError, PersistedCollection, Record, RecordId};
pub use config::{ConfigError, DashboardConfig, StorageBackend, StorageConfig};
pub use domain::{
    ClassStatus, DomainStores, FitnessClass, FitnessClassDraft, FitnessClassPatch, Member,
    MemberDraft, MemberPatch, MemberStatus, MembershipPlan, Order, OrderDraft, OrderLine,
    OrderPatch, OrderStatus, Product, ProductDraft, ProductPatch, ProductStatus, SessionStatus,
    TrainingSession, TrainingSessionDraft, TrainingSessionPatch,
};
pub use guard::{AccessGuard, Denial, GuardOutcome, NoticeLevel, Notifier, TracingNotifier};
pub use profile::{
    Account, Credentials, Profile, ProfileStore, ProfileType, SessionPhase, SessionSnapshot,
    UnknownProfileType,
};
#[cfg(feature = "emitter")]
pub use profile::{ProfileSwitched, PROFILE_SWITCHED_EVENT};
pub use storage::{FileStorage, InMemoryStorage, Storage, StorageError, StorageEvent, StorageExt};
pub use subscription::{Listener, Listeners, Subscribable, Subscription};
pub use sync::CrossTabSync;

// Derive macro for `Record`; lives in the macro namespace next to the trait.
pub use fitdash_macros::Record;
