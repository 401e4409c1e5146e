use mongodb::{
    bson::{doc, Document},
    error::UNKNOWN_TRANSACTION_COMMIT_RESULT,
    options::FindOptions,
    Client, ClientSession, Database, SessionCursor,
};
use serde::de::DeserializeOwned;

use super::{ElectionFilter, MemberFilter, Store, Transaction, VoteFilter};
use crate::error::{Error, Result};
use crate::model::{
    db::{
        election::{Election, ElectionLink, NewElection},
        member::{Member, NewMember},
        subject::{Consent, DataAccessRequest},
        vote::{NewVote, Vote},
    },
    mongodb::{Coll, Id},
};

/// How many times to try a commit whose outcome the server could not confirm.
const COMMIT_ATTEMPTS: usize = 3;

/// MongoDB-backed storage. Each transaction is a multi-document transaction
/// on its own session, so the server must be a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(Box::new(MongoTransaction {
            session,
            elections: Coll::from_db(&self.db),
            links: Coll::from_db(&self.db),
            votes: Coll::from_db(&self.db),
            members: Coll::from_db(&self.db),
            consents: Coll::from_db(&self.db),
            dars: Coll::from_db(&self.db),
        }))
    }
}

/// Dropping the session without committing aborts the transaction.
struct MongoTransaction {
    session: ClientSession,
    elections: Coll<Election>,
    links: Coll<ElectionLink>,
    votes: Coll<Vote>,
    members: Coll<Member>,
    consents: Coll<Consent>,
    dars: Coll<DataAccessRequest>,
}

/// Drain a session cursor.
async fn collect<T: DeserializeOwned>(
    mut cursor: SessionCursor<T>,
    session: &mut ClientSession,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    while let Some(item) = cursor.next(session).await {
        items.push(item?);
    }
    Ok(items)
}

fn oldest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "_id": 1 }).build()
}

#[rocket::async_trait]
impl Transaction for MongoTransaction {
    async fn insert_election(&mut self, election: NewElection) -> Result<Election> {
        // Clashes with the open-election index surface as `DuplicateOpenElection`.
        let election = Election {
            id: Id::new(),
            election,
        };
        self.elections
            .insert_one_with_session(&election, None, &mut self.session)
            .await?;
        Ok(election)
    }

    async fn election(&mut self, id: Id) -> Result<Option<Election>> {
        Ok(self
            .elections
            .find_one_with_session(id.as_doc(), None, &mut self.session)
            .await?)
    }

    async fn find_elections(&mut self, filter: &ElectionFilter) -> Result<Vec<Election>> {
        let options = FindOptions::builder()
            .sort(doc! { "create_date": -1, "_id": -1 })
            .build();
        let cursor = self
            .elections
            .find_with_session(filter.as_doc(), options, &mut self.session)
            .await?;
        collect(cursor, &mut self.session).await
    }

    async fn replace_election(&mut self, election: &Election) -> Result<()> {
        let result = self
            .elections
            .replace_one_with_session(election.id.as_doc(), election, None, &mut self.session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Election {}", election.id)));
        }
        Ok(())
    }

    async fn delete_election(&mut self, id: Id) -> Result<bool> {
        let result = self
            .elections
            .delete_one_with_session(id.as_doc(), None, &mut self.session)
            .await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        self.votes
            .delete_many_with_session(doc! { "election_id": id }, None, &mut self.session)
            .await?;
        let links_filter = doc! {
            "$or": [{"access_election_id": id}, {"research_purpose_election_id": id}],
        };
        self.links
            .delete_many_with_session(links_filter, None, &mut self.session)
            .await?;
        Ok(true)
    }

    async fn link_companion(&mut self, link: ElectionLink) -> Result<()> {
        self.links
            .insert_one_with_session(&link, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn companion_of(&mut self, access_election_id: Id) -> Result<Option<Id>> {
        let link = self
            .links
            .find_one_with_session(
                doc! { "access_election_id": access_election_id },
                None,
                &mut self.session,
            )
            .await?;
        Ok(link.map(|link| link.research_purpose_election_id))
    }

    async fn access_of(&mut self, research_purpose_election_id: Id) -> Result<Option<Id>> {
        let link = self
            .links
            .find_one_with_session(
                doc! { "research_purpose_election_id": research_purpose_election_id },
                None,
                &mut self.session,
            )
            .await?;
        Ok(link.map(|link| link.access_election_id))
    }

    async fn insert_votes(&mut self, votes: Vec<NewVote>) -> Result<Vec<Vote>> {
        if votes.is_empty() {
            return Ok(Vec::new());
        }
        let votes: Vec<Vote> = votes
            .into_iter()
            .map(|vote| Vote { id: Id::new(), vote })
            .collect();
        self.votes
            .insert_many_with_session(&votes, None, &mut self.session)
            .await?;
        Ok(votes)
    }

    async fn vote(&mut self, id: Id) -> Result<Option<Vote>> {
        Ok(self
            .votes
            .find_one_with_session(id.as_doc(), None, &mut self.session)
            .await?)
    }

    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>> {
        let cursor = self
            .votes
            .find_with_session(filter.as_doc(), oldest_first(), &mut self.session)
            .await?;
        collect(cursor, &mut self.session).await
    }

    async fn replace_vote(&mut self, vote: &Vote) -> Result<()> {
        let result = self
            .votes
            .replace_one_with_session(vote.id.as_doc(), vote, None, &mut self.session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Vote {}", vote.id)));
        }
        Ok(())
    }

    async fn delete_votes(&mut self, ids: &[Id]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let filter: Document = doc! { "_id": { "$in": ids.to_vec() } };
        let result = self
            .votes
            .delete_many_with_session(filter, None, &mut self.session)
            .await?;
        Ok(result.deleted_count)
    }

    async fn insert_member(&mut self, member: NewMember) -> Result<Member> {
        let member = Member {
            id: Id::new(),
            member,
        };
        self.members
            .insert_one_with_session(&member, None, &mut self.session)
            .await?;
        Ok(member)
    }

    async fn member(&mut self, id: Id) -> Result<Option<Member>> {
        Ok(self
            .members
            .find_one_with_session(id.as_doc(), None, &mut self.session)
            .await?)
    }

    async fn find_members(&mut self, filter: &MemberFilter) -> Result<Vec<Member>> {
        let cursor = self
            .members
            .find_with_session(filter.as_doc(), oldest_first(), &mut self.session)
            .await?;
        collect(cursor, &mut self.session).await
    }

    async fn replace_member(&mut self, member: &Member) -> Result<()> {
        let result = self
            .members
            .replace_one_with_session(member.id.as_doc(), member, None, &mut self.session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("Member {}", member.id)));
        }
        Ok(())
    }

    async fn insert_consent(&mut self, consent: Consent) -> Result<()> {
        self.consents
            .insert_one_with_session(&consent, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn consent(&mut self, id: &str) -> Result<Option<Consent>> {
        Ok(self
            .consents
            .find_one_with_session(doc! { "_id": id }, None, &mut self.session)
            .await?)
    }

    async fn insert_data_access_request(&mut self, dar: DataAccessRequest) -> Result<()> {
        self.dars
            .insert_one_with_session(&dar, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn data_access_request(&mut self, id: &str) -> Result<Option<DataAccessRequest>> {
        Ok(self
            .dars
            .find_one_with_session(doc! { "_id": id }, None, &mut self.session)
            .await?)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        // A commit whose outcome is unknown is safe to repeat.
        let mut attempt = 1;
        loop {
            match self.session.commit_transaction().await {
                Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) && attempt < COMMIT_ATTEMPTS => {
                    warn!("Commit outcome unknown, retrying: {e}");
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }
}
