use serde::{Deserialize, Serialize};

use crate::model::{
    api::{election::ElectionDescription, id::ApiId},
    common::member::MemberRole,
    db::member::{Member, NewMember},
};

/// Request to add a committee member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSpec {
    pub display_name: String,
    pub email: String,
    pub roles: Vec<MemberRole>,
    #[serde(default)]
    pub datasets: Vec<String>,
}

impl From<MemberSpec> for NewMember {
    fn from(spec: MemberSpec) -> Self {
        Self {
            display_name: spec.display_name,
            email: spec.email,
            roles: spec.roles,
            datasets: spec.datasets,
        }
    }
}

/// An API-friendly committee member description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDescription {
    pub id: ApiId,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<MemberRole>,
    pub datasets: Vec<String>,
}

impl From<Member> for MemberDescription {
    fn from(member: Member) -> Self {
        let Member { id, member } = member;
        Self {
            id: id.into(),
            display_name: member.display_name,
            email: member.email,
            roles: member.roles,
            datasets: member.datasets,
        }
    }
}

/// The outcome of appointing a chairperson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessionDescription {
    pub chair: MemberDescription,
    pub previous_chair: Option<MemberDescription>,
    pub reopened: Vec<ElectionDescription>,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::common::member::Role;

    impl MemberSpec {
        pub fn example(name: &str, roles: &[Role]) -> Self {
            NewMember::example(name, roles).into()
        }
    }

    impl From<NewMember> for MemberSpec {
        fn from(member: NewMember) -> Self {
            Self {
                display_name: member.display_name,
                email: member.email,
                roles: member.roles,
                datasets: member.datasets,
            }
        }
    }
}
