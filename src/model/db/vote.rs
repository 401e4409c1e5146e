use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::vote::{VoteStatus, VoteType},
    mongodb::{option_chrono_datetime_as_bson_datetime, Id},
};

/// Core ballot data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub election_id: Id,
    pub voter_id: Id,
    pub vote_type: VoteType,
    /// `None` until the ballot is cast.
    pub value: Option<bool>,
    pub rationale: Option<String>,
    /// Data owners may flag concerns instead of (or as well as) voting.
    pub has_concerns: Option<bool>,
    #[serde(default, with = "option_chrono_datetime_as_bson_datetime")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default, with = "option_chrono_datetime_as_bson_datetime")]
    pub update_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_sent: bool,
}

impl VoteCore {
    /// A blank ballot awaiting the voter.
    pub fn blank(election_id: Id, voter_id: Id, vote_type: VoteType) -> Self {
        Self {
            election_id,
            voter_id,
            vote_type,
            value: None,
            rationale: None,
            has_concerns: None,
            create_date: None,
            update_date: None,
            reminder_sent: false,
        }
    }

    /// Has the voter given any answer yet?
    pub fn is_cast(&self) -> bool {
        self.value.is_some() || self.has_concerns == Some(true)
    }

    /// A ballot stays pending until it holds a value, even if concerns were flagged.
    pub fn status(&self) -> VoteStatus {
        if self.value.is_some() {
            VoteStatus::Editable
        } else {
            VoteStatus::Pending
        }
    }
}

/// A ballot without an ID.
pub type NewVote = VoteCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}
