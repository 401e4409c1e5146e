use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Committee roles.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Chairperson,
    Member,
    Alumni,
    DataOwner,
    Admin,
}

impl Role {
    /// Roles that receive a standing ballot on committee review elections.
    pub const VOTING: [Role; 2] = [Role::Chairperson, Role::Member];
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleStatus {
    Active,
    Inactive,
}

impl From<RoleStatus> for Bson {
    fn from(status: RoleStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// A role held by a committee member.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRole {
    pub role: Role,
    pub status: RoleStatus,
}

impl MemberRole {
    pub fn active(role: Role) -> Self {
        Self {
            role,
            status: RoleStatus::Active,
        }
    }
}
