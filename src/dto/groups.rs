use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::User, policy::Role};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupMembers {
    pub group: Role,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Membership {
    pub group: Role,
    pub user: User,
    /// False when the user already belonged to the group.
    pub added: bool,
}
