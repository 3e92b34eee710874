//! Domain records managed by the dashboard's collections.
//!
//! | Record | Slot | Initial status |
//! |---|---|---|
//! | [`Member`] | `members` | `active` |
//! | [`TrainingSession`] | `sessions` | `scheduled` |
//! | [`FitnessClass`] | `classes` | `open` |
//! | [`Product`] | `products` | `draft` |
//! | [`Order`] | `orders` | `pending` |

mod fitness_class;
mod member;
mod order;
mod product;
mod training_session;

pub use fitness_class::{ClassStatus, FitnessClass, FitnessClassDraft, FitnessClassPatch};
pub use member::{Member, MemberDraft, MemberPatch, MemberStatus, MembershipPlan};
pub use order::{Order, OrderDraft, OrderLine, OrderPatch, OrderStatus};
pub use product::{Product, ProductDraft, ProductPatch, ProductStatus};
pub use training_session::{
    SessionStatus, TrainingSession, TrainingSessionDraft, TrainingSessionPatch,
};

use crate::collection::PersistedCollection;
use crate::storage::Storage;

/// The five domain collections over one storage context.
#[derive(Clone)]
pub struct DomainStores<S> {
    pub members: PersistedCollection<S, Member>,
    pub sessions: PersistedCollection<S, TrainingSession>,
    pub classes: PersistedCollection<S, FitnessClass>,
    pub products: PersistedCollection<S, Product>,
    pub orders: PersistedCollection<S, Order>,
}

impl<S: Storage + Clone> DomainStores<S> {
    /// Open and hydrate every collection.
    pub fn open(storage: S) -> Self {
        Self {
            members: PersistedCollection::open(storage.clone()),
            sessions: PersistedCollection::open(storage.clone()),
            classes: PersistedCollection::open(storage.clone()),
            products: PersistedCollection::open(storage.clone()),
            orders: PersistedCollection::open(storage),
        }
    }

    /// Re-read every collection from storage.
    pub fn reload(&self) {
        self.members.reload();
        self.sessions.reload();
        self.classes.reload();
        self.products.reload();
        self.orders.reload();
    }
}
