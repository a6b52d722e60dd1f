//! Role-based access rules.
//!
//! Every service resolves the caller to an [`Actor`] (done once per request by the
//! auth extractor) and asks [`authorize`] before it reads scoped data or mutates
//! anything. Customers are users holding neither staff role.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    DeliveryCrew,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Manager, Role::DeliveryCrew];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::DeliveryCrew => "delivery_crew",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manager" => Some(Role::Manager),
            "delivery_crew" => Some(Role::DeliveryCrew),
            _ => None,
        }
    }

    /// Staff roles are handed out exclusively: a manager is never also on the crew.
    pub fn conflicting(&self) -> Role {
        match self {
            Role::Manager => Role::DeliveryCrew,
            Role::DeliveryCrew => Role::Manager,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn is_customer(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub roles: RoleSet,
}

impl Actor {
    pub fn new(user_id: Uuid, roles: RoleSet) -> Self {
        Self { user_id, roles }
    }

    pub fn is_manager(&self) -> bool {
        self.roles.contains(Role::Manager)
    }

    pub fn is_delivery_crew(&self) -> bool {
        self.roles.contains(Role::DeliveryCrew)
    }

    /// Which orders show up in this actor's listing.
    pub fn order_scope(&self) -> OrderScope {
        if self.is_manager() {
            OrderScope::All
        } else if self.is_delivery_crew() {
            OrderScope::AssignedTo(self.user_id)
        } else {
            OrderScope::OwnedBy(self.user_id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    AssignedTo(Uuid),
    OwnedBy(Uuid),
}

/// Ownership facts of an order needed to decide per-order access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAccess {
    pub owner: Uuid,
    pub delivery_crew: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadCatalog,
    WriteCatalog,
    PatchCatalog,
    SetItemOfTheDay,
    UseCart,
    PlaceOrder,
    ListOrders,
    ReadOrder(OrderAccess),
    AssignDeliveryCrew,
    UpdateOrderStatus(OrderAccess),
    DeleteOrder,
    ManageGroup(Role),
}

pub fn is_allowed(actor: &Actor, action: Action) -> bool {
    match action {
        Action::ReadCatalog | Action::UseCart | Action::PlaceOrder | Action::ListOrders => true,
        Action::WriteCatalog
        | Action::PatchCatalog
        | Action::SetItemOfTheDay
        | Action::AssignDeliveryCrew
        | Action::DeleteOrder
        | Action::ManageGroup(_) => actor.is_manager(),
        Action::ReadOrder(order) => {
            order.owner == actor.user_id
                || actor.is_manager()
                || (actor.is_delivery_crew() && order.delivery_crew == Some(actor.user_id))
        }
        Action::UpdateOrderStatus(order) => {
            actor.is_manager()
                || (actor.is_delivery_crew() && order.delivery_crew == Some(actor.user_id))
        }
    }
}

pub fn authorize(actor: &Actor, action: Action) -> AppResult<()> {
    if is_allowed(actor, action) {
        Ok(())
    } else {
        tracing::debug!(user_id = %actor.user_id, ?action, "permission denied");
        Err(AppError::Forbidden)
    }
}
