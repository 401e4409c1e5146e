//! A seeded committee for engine and route tests.

use super::Engine;
use crate::model::{
    common::member::Role,
    db::{
        member::{Member, NewMember},
        subject::{Consent, DataAccessRequest},
    },
    mongodb::Id,
};

/// The committee every `#[backend_test(committee)]` starts with. The store also
/// holds consent `C1` and requests `D1` (structured, dataset `DS-1`) and `D2`.
#[derive(Debug, Clone)]
pub struct Committee {
    pub chair: Member,
    pub members: Vec<Member>,
    pub alumni: Member,
    pub data_owner: Member,
}

impl Committee {
    pub async fn seed(engine: &Engine) -> Self {
        let chair = engine
            .create_member(NewMember::example("Chair Person", &[Role::Chairperson]))
            .await
            .unwrap();
        let mut members = Vec::new();
        for name in ["Member One", "Member Two"] {
            members.push(
                engine
                    .create_member(NewMember::example(name, &[Role::Member]))
                    .await
                    .unwrap(),
            );
        }
        let alumni = engine
            .create_member(NewMember::example("Former Member", &[Role::Alumni]))
            .await
            .unwrap();
        let mut owner = NewMember::example("Data Owner", &[Role::DataOwner]);
        owner.datasets.push("DS-1".to_string());
        let data_owner = engine.create_member(owner).await.unwrap();

        engine.create_consent(Consent::example()).await.unwrap();
        engine
            .create_data_access_request(DataAccessRequest::structured_example())
            .await
            .unwrap();
        engine
            .create_data_access_request(DataAccessRequest::unstructured_example())
            .await
            .unwrap();

        Self {
            chair,
            members,
            alumni,
            data_owner,
        }
    }

    /// Everyone who gets a `Member` ballot on committee reviews, sorted.
    pub fn voters(&self) -> Vec<Id> {
        let mut voters: Vec<Id> = self.members.iter().map(|m| m.id).collect();
        voters.push(self.chair.id);
        voters.sort();
        voters
    }
}
