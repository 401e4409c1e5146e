use std::collections::BTreeMap;
use std::sync::Arc;

use rocket::tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ElectionFilter, MemberFilter, Store, Transaction, VoteFilter};
use crate::error::{Error, Result};
use crate::model::{
    db::{
        election::{Election, ElectionLink, NewElection},
        member::{Member, NewMember},
        subject::{Consent, DataAccessRequest},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    elections: BTreeMap<Id, Election>,
    links: Vec<ElectionLink>,
    votes: BTreeMap<Id, Vote>,
    members: BTreeMap<Id, Member>,
    consents: BTreeMap<String, Consent>,
    dars: BTreeMap<String, DataAccessRequest>,
}

/// An in-process store. Transactions are fully serialized: one holds the lock
/// from `begin` until it is committed or dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    /// Uncommitted copy of the state.
    working: MemoryState,
}

#[rocket::async_trait]
impl Transaction for MemoryTransaction {
    async fn insert_election(&mut self, election: NewElection) -> Result<Election> {
        let clash = self.working.elections.values().any(|existing| {
            existing.is_open()
                && election.is_open()
                && existing.subject_id == election.subject_id
                && existing.election_type == election.election_type
                && existing.dataset_id == election.dataset_id
        });
        if clash {
            return Err(Error::DuplicateOpenElection(format!(
                "{:?} for subject {}",
                election.election_type, election.subject_id
            )));
        }
        let election = Election {
            id: Id::new(),
            election,
        };
        self.working.elections.insert(election.id, election.clone());
        Ok(election)
    }

    async fn election(&mut self, id: Id) -> Result<Option<Election>> {
        Ok(self.working.elections.get(&id).cloned())
    }

    async fn find_elections(&mut self, filter: &ElectionFilter) -> Result<Vec<Election>> {
        let mut elections: Vec<Election> = self
            .working
            .elections
            .values()
            .filter(|election| filter.matches(election))
            .cloned()
            .collect();
        elections.sort_by_key(|election| std::cmp::Reverse(election.recency()));
        Ok(elections)
    }

    async fn replace_election(&mut self, election: &Election) -> Result<()> {
        match self.working.elections.get_mut(&election.id) {
            Some(existing) => {
                *existing = election.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("Election {}", election.id))),
        }
    }

    async fn delete_election(&mut self, id: Id) -> Result<bool> {
        if self.working.elections.remove(&id).is_none() {
            return Ok(false);
        }
        self.working.votes.retain(|_, vote| vote.election_id != id);
        self.working.links.retain(|link| {
            link.access_election_id != id && link.research_purpose_election_id != id
        });
        Ok(true)
    }

    async fn link_companion(&mut self, link: ElectionLink) -> Result<()> {
        if self
            .working
            .links
            .iter()
            .any(|existing| existing.access_election_id == link.access_election_id)
        {
            return Err(Error::invalid(format!(
                "Election {} already has a companion",
                link.access_election_id
            )));
        }
        self.working.links.push(link);
        Ok(())
    }

    async fn companion_of(&mut self, access_election_id: Id) -> Result<Option<Id>> {
        Ok(self
            .working
            .links
            .iter()
            .find(|link| link.access_election_id == access_election_id)
            .map(|link| link.research_purpose_election_id))
    }

    async fn access_of(&mut self, research_purpose_election_id: Id) -> Result<Option<Id>> {
        Ok(self
            .working
            .links
            .iter()
            .find(|link| link.research_purpose_election_id == research_purpose_election_id)
            .map(|link| link.access_election_id))
    }

    async fn insert_votes(&mut self, votes: Vec<NewVote>) -> Result<Vec<Vote>> {
        let mut inserted = Vec::with_capacity(votes.len());
        for vote in votes {
            let duplicate = self
                .working
                .votes
                .values()
                .chain(inserted.iter())
                .any(|existing| {
                    existing.election_id == vote.election_id
                        && existing.voter_id == vote.voter_id
                        && existing.vote_type == vote.vote_type
                });
            if duplicate {
                return Err(Error::invalid(format!(
                    "{:?} ballot for voter {} already exists on election {}",
                    vote.vote_type, vote.voter_id, vote.election_id
                )));
            }
            inserted.push(Vote { id: Id::new(), vote });
        }
        for vote in &inserted {
            self.working.votes.insert(vote.id, vote.clone());
        }
        Ok(inserted)
    }

    async fn vote(&mut self, id: Id) -> Result<Option<Vote>> {
        Ok(self.working.votes.get(&id).cloned())
    }

    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>> {
        // Keys are ObjectIds, so map order is insertion order.
        Ok(self
            .working
            .votes
            .values()
            .filter(|vote| filter.matches(vote))
            .cloned()
            .collect())
    }

    async fn replace_vote(&mut self, vote: &Vote) -> Result<()> {
        match self.working.votes.get_mut(&vote.id) {
            Some(existing) => {
                *existing = vote.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("Vote {}", vote.id))),
        }
    }

    async fn delete_votes(&mut self, ids: &[Id]) -> Result<u64> {
        let deleted = ids
            .iter()
            .filter(|id| self.working.votes.remove(*id).is_some())
            .count();
        Ok(deleted as u64)
    }

    async fn insert_member(&mut self, member: NewMember) -> Result<Member> {
        if self
            .working
            .members
            .values()
            .any(|existing| existing.email == member.email)
        {
            return Err(Error::invalid(format!(
                "Email already in use: {}",
                member.email
            )));
        }
        let member = Member {
            id: Id::new(),
            member,
        };
        self.working.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn member(&mut self, id: Id) -> Result<Option<Member>> {
        Ok(self.working.members.get(&id).cloned())
    }

    async fn find_members(&mut self, filter: &MemberFilter) -> Result<Vec<Member>> {
        Ok(self
            .working
            .members
            .values()
            .filter(|member| filter.matches(member))
            .cloned()
            .collect())
    }

    async fn replace_member(&mut self, member: &Member) -> Result<()> {
        match self.working.members.get_mut(&member.id) {
            Some(existing) => {
                *existing = member.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("Member {}", member.id))),
        }
    }

    async fn insert_consent(&mut self, consent: Consent) -> Result<()> {
        if self.working.consents.contains_key(&consent.id) {
            return Err(Error::invalid(format!("Consent {} already exists", consent.id)));
        }
        self.working.consents.insert(consent.id.clone(), consent);
        Ok(())
    }

    async fn consent(&mut self, id: &str) -> Result<Option<Consent>> {
        Ok(self.working.consents.get(id).cloned())
    }

    async fn insert_data_access_request(&mut self, dar: DataAccessRequest) -> Result<()> {
        if self.working.dars.contains_key(&dar.id) {
            return Err(Error::invalid(format!(
                "Data access request {} already exists",
                dar.id
            )));
        }
        self.working.dars.insert(dar.id.clone(), dar);
        Ok(())
    }

    async fn data_access_request(&mut self, id: &str) -> Result<Option<DataAccessRequest>> {
        Ok(self.working.dars.get(id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
