use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::{
    common::election::ElectionStatus,
    db::{
        election::{Election, ElectionLink},
        member::Member,
        subject::{Consent, DataAccessRequest},
        vote::Vote,
    },
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Election {
    const NAME: &'static str = "elections";
}

impl MongoCollection for ElectionLink {
    const NAME: &'static str = "election_links";
}

impl MongoCollection for Vote {
    const NAME: &'static str = "votes";
}

impl MongoCollection for Member {
    const NAME: &'static str = "members";
}

impl MongoCollection for Consent {
    const NAME: &'static str = "consents";
}

impl MongoCollection for DataAccessRequest {
    const NAME: &'static str = "data_access_requests";
}

/// Name of the unique index guarding against concurrent open rounds.
pub const OPEN_ELECTION_INDEX: &str = "single_open_election";

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // At most one open round per subject, election type and dataset.
    // Closed, canceled and final rounds are history and may repeat.
    let open_only = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(doc! { "status": ElectionStatus::Open })
        .name(OPEN_ELECTION_INDEX.to_string())
        .build();
    let election_index = IndexModel::builder()
        .keys(doc! {"subject_id": 1, "election_type": 1, "dataset_id": 1})
        .options(open_only)
        .build();
    Coll::<Election>::from_db(db)
        .create_index(election_index, None)
        .await?;

    let link_index = IndexModel::builder()
        .keys(doc! {"access_election_id": 1})
        .options(unique.clone())
        .build();
    Coll::<ElectionLink>::from_db(db)
        .create_index(link_index, None)
        .await?;

    // One ballot of each type per voter per election.
    let vote_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "voter_id": 1, "vote_type": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db).create_index(vote_index, None).await?;

    let member_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique)
        .build();
    Coll::<Member>::from_db(db)
        .create_index(member_index, None)
        .await?;

    Ok(())
}
