use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    common::member::{MemberRole, Role, RoleStatus},
    mongodb::Id,
};

/// Core committee member data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCore {
    pub display_name: String,
    pub email: String,
    pub roles: Vec<MemberRole>,
    /// Datasets this member owns, if they are a data owner.
    #[serde(default)]
    pub datasets: Vec<String>,
}

impl MemberCore {
    /// Does this member hold `role` with an active status?
    pub fn has_active_role(&self, role: Role) -> bool {
        self.roles
            .iter()
            .any(|r| r.role == role && r.status == RoleStatus::Active)
    }

    /// Does this member get a standing ballot on committee review rounds?
    pub fn can_vote(&self) -> bool {
        Role::VOTING.iter().any(|role| self.has_active_role(*role))
    }

    pub fn owns_dataset(&self, dataset_id: &str) -> bool {
        self.has_active_role(Role::DataOwner) && self.datasets.iter().any(|d| d == dataset_id)
    }

    /// Grant `role`, reactivating it if it is already held.
    pub fn grant(&mut self, role: Role) {
        match self.roles.iter_mut().find(|r| r.role == role) {
            Some(existing) => existing.status = RoleStatus::Active,
            None => self.roles.push(MemberRole::active(role)),
        }
    }

    /// Drop `role` entirely.
    pub fn revoke(&mut self, role: Role) {
        self.roles.retain(|r| r.role != role);
    }
}

/// A committee member without an ID.
pub type NewMember = MemberCore;

/// A committee member from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub member: MemberCore,
}

impl Deref for Member {
    type Target = MemberCore;

    fn deref(&self) -> &Self::Target {
        &self.member
    }
}

impl DerefMut for Member {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.member
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke() {
        let mut member = MemberCore::example("Ada", &[Role::Member]);
        assert!(member.can_vote());

        member.revoke(Role::Member);
        member.grant(Role::Alumni);
        assert!(!member.can_vote());
        assert!(member.has_active_role(Role::Alumni));

        member.roles[0].status = RoleStatus::Inactive;
        assert!(!member.has_active_role(Role::Alumni));
        member.grant(Role::Alumni);
        assert_eq!(member.roles.len(), 1);
        assert!(member.has_active_role(Role::Alumni));
    }

    #[test]
    fn inactive_roles_do_not_vote() {
        let mut member = MemberCore::example("Bob", &[Role::Chairperson]);
        member.roles[0].status = RoleStatus::Inactive;
        assert!(!member.can_vote());
    }

    #[test]
    fn dataset_ownership_needs_active_role() {
        let mut member = MemberCore::example("Owner", &[Role::DataOwner]);
        member.datasets.push("DS-1".to_string());
        assert!(member.owns_dataset("DS-1"));
        assert!(!member.owns_dataset("DS-2"));

        member.revoke(Role::DataOwner);
        assert!(!member.owns_dataset("DS-1"));
    }
}
