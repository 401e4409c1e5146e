//! Transactional storage for elections, ballots, the committee and review subjects.
//!
//! Every engine operation runs inside one [`Transaction`]. Writes become visible to
//! other transactions only on [`Transaction::commit`]; dropping an uncommitted
//! transaction discards them.

use mongodb::bson::{doc, Bson, Document};

use crate::error::Result;
use crate::model::{
    common::{
        election::{ElectionStatus, ElectionType},
        member::{Role, RoleStatus},
        vote::VoteType,
    },
    db::{
        election::{Election, ElectionLink, NewElection},
        member::{Member, NewMember},
        subject::{Consent, DataAccessRequest},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A source of transactions.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// One serializable unit of work against the store.
#[rocket::async_trait]
pub trait Transaction: Send {
    /// Insert an election, assigning its ID. Fails with `DuplicateOpenElection`
    /// if it would be a second open round for the same subject, type and dataset.
    async fn insert_election(&mut self, election: NewElection) -> Result<Election>;

    async fn election(&mut self, id: Id) -> Result<Option<Election>>;

    /// Matching elections, newest first.
    async fn find_elections(&mut self, filter: &ElectionFilter) -> Result<Vec<Election>>;

    async fn replace_election(&mut self, election: &Election) -> Result<()>;

    /// Delete an election together with its ballots and companion links.
    /// Returns false if there was no such election.
    async fn delete_election(&mut self, id: Id) -> Result<bool>;

    async fn link_companion(&mut self, link: ElectionLink) -> Result<()>;

    /// The research purpose review paired with an access review.
    async fn companion_of(&mut self, access_election_id: Id) -> Result<Option<Id>>;

    /// The access review a research purpose review belongs to.
    async fn access_of(&mut self, research_purpose_election_id: Id) -> Result<Option<Id>>;

    /// Insert a batch of ballots, assigning IDs in order.
    async fn insert_votes(&mut self, votes: Vec<NewVote>) -> Result<Vec<Vote>>;

    async fn vote(&mut self, id: Id) -> Result<Option<Vote>>;

    /// Matching ballots, oldest first.
    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>>;

    async fn replace_vote(&mut self, vote: &Vote) -> Result<()>;

    /// Returns the number of ballots deleted.
    async fn delete_votes(&mut self, ids: &[Id]) -> Result<u64>;

    async fn insert_member(&mut self, member: NewMember) -> Result<Member>;

    async fn member(&mut self, id: Id) -> Result<Option<Member>>;

    /// Matching members, oldest first.
    async fn find_members(&mut self, filter: &MemberFilter) -> Result<Vec<Member>>;

    async fn replace_member(&mut self, member: &Member) -> Result<()>;

    async fn insert_consent(&mut self, consent: Consent) -> Result<()>;

    async fn consent(&mut self, id: &str) -> Result<Option<Consent>>;

    async fn insert_data_access_request(&mut self, dar: DataAccessRequest) -> Result<()>;

    async fn data_access_request(&mut self, id: &str) -> Result<Option<DataAccessRequest>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Which elections to return. Empty lists match anything.
#[derive(Debug, Clone, Default)]
pub struct ElectionFilter {
    pub subject_id: Option<String>,
    pub statuses: Vec<ElectionStatus>,
    pub types: Vec<ElectionType>,
    pub dataset_id: Option<String>,
}

impl ElectionFilter {
    pub fn for_subject(subject_id: &str) -> Self {
        Self {
            subject_id: Some(subject_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ElectionStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_type(mut self, election_type: ElectionType) -> Self {
        self.types.push(election_type);
        self
    }

    pub fn matches(&self, election: &Election) -> bool {
        self.subject_id
            .as_ref()
            .map_or(true, |subject| subject == &election.subject_id)
            && (self.statuses.is_empty() || self.statuses.contains(&election.status))
            && (self.types.is_empty() || self.types.contains(&election.election_type))
            && self
                .dataset_id
                .as_ref()
                .map_or(true, |dataset| Some(dataset) == election.dataset_id.as_ref())
    }

    pub fn as_doc(&self) -> Document {
        let mut filter = doc! {};
        if let Some(ref subject_id) = self.subject_id {
            filter.insert("subject_id", subject_id.as_str());
        }
        if !self.statuses.is_empty() {
            filter.insert("status", doc! { "$in": in_list(&self.statuses) });
        }
        if !self.types.is_empty() {
            filter.insert("election_type", doc! { "$in": in_list(&self.types) });
        }
        if let Some(ref dataset_id) = self.dataset_id {
            filter.insert("dataset_id", dataset_id.as_str());
        }
        filter
    }
}

/// Which ballots to return. `None` and empty lists match anything.
#[derive(Debug, Clone, Default)]
pub struct VoteFilter {
    pub election_ids: Option<Vec<Id>>,
    pub voter_id: Option<Id>,
    pub vote_types: Vec<VoteType>,
}

impl VoteFilter {
    pub fn for_elections(election_ids: impl IntoIterator<Item = Id>) -> Self {
        Self {
            election_ids: Some(election_ids.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn for_voter(voter_id: Id) -> Self {
        Self {
            voter_id: Some(voter_id),
            ..Default::default()
        }
    }

    pub fn by_voter(mut self, voter_id: Id) -> Self {
        self.voter_id = Some(voter_id);
        self
    }

    pub fn of_type(mut self, vote_type: VoteType) -> Self {
        self.vote_types.push(vote_type);
        self
    }

    pub fn matches(&self, vote: &Vote) -> bool {
        self.election_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&vote.election_id))
            && self.voter_id.map_or(true, |voter| voter == vote.voter_id)
            && (self.vote_types.is_empty() || self.vote_types.contains(&vote.vote_type))
    }

    pub fn as_doc(&self) -> Document {
        let mut filter = doc! {};
        if let Some(ref ids) = self.election_ids {
            filter.insert("election_id", doc! { "$in": in_list(ids) });
        }
        if let Some(voter_id) = self.voter_id {
            filter.insert("voter_id", voter_id);
        }
        if !self.vote_types.is_empty() {
            filter.insert("vote_type", doc! { "$in": in_list(&self.vote_types) });
        }
        filter
    }
}

/// Which committee members to return: those holding any of `roles` actively,
/// and owning `dataset_id` if given.
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub roles: Vec<Role>,
    pub dataset_id: Option<String>,
}

impl MemberFilter {
    pub fn with_roles(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
            dataset_id: None,
        }
    }

    pub fn data_owners(dataset_id: &str) -> Self {
        Self {
            roles: vec![Role::DataOwner],
            dataset_id: Some(dataset_id.to_string()),
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        (self.roles.is_empty() || self.roles.iter().any(|role| member.has_active_role(*role)))
            && self
                .dataset_id
                .as_ref()
                .map_or(true, |dataset| member.datasets.contains(dataset))
    }

    pub fn as_doc(&self) -> Document {
        let mut filter = doc! {};
        if !self.roles.is_empty() {
            filter.insert(
                "roles",
                doc! {
                    "$elemMatch": {
                        "role": { "$in": in_list(&self.roles) },
                        "status": RoleStatus::Active,
                    }
                },
            );
        }
        if let Some(ref dataset_id) = self.dataset_id {
            filter.insert("datasets", dataset_id.as_str());
        }
        filter
    }
}

fn in_list<T: Copy + Into<Bson>>(values: &[T]) -> Vec<Bson> {
    values.iter().map(|value| (*value).into()).collect()
}
