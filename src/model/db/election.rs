use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{ElectionStatus, ElectionType},
    mongodb::{option_chrono_datetime_as_bson_datetime, Id},
};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub election_type: ElectionType,
    /// Consent id or data access request id under review.
    pub subject_id: String,
    /// Only set for dataset reviews.
    pub dataset_id: Option<String>,
    pub status: ElectionStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub create_date: DateTime<Utc>,
    #[serde(default, with = "option_chrono_datetime_as_bson_datetime")]
    pub last_update: Option<DateTime<Utc>>,
    /// The binding outcome, once recorded.
    pub final_vote: Option<bool>,
    pub final_rationale: Option<String>,
    /// Access decision, once the chair's closing ballot (or the data owners) have decided.
    pub final_access_vote: Option<bool>,
    /// Snapshot of the subject's restriction when the round opened.
    pub use_restriction: Option<String>,
    pub translated_use_restriction: Option<String>,
}

impl ElectionCore {
    /// A fresh open round with no outcome.
    pub fn open(
        election_type: ElectionType,
        subject_id: String,
        dataset_id: Option<String>,
        use_restriction: Option<String>,
        translated_use_restriction: Option<String>,
    ) -> Self {
        Self {
            election_type,
            subject_id,
            dataset_id,
            status: ElectionStatus::Open,
            create_date: Utc::now(),
            last_update: None,
            final_vote: None,
            final_rationale: None,
            final_access_vote: None,
            use_restriction,
            translated_use_restriction,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ElectionStatus::Open
    }

    /// Move to `status`, stamping the update time. Legality is the caller's concern.
    pub fn set_status(&mut self, status: ElectionStatus) {
        self.status = status;
        self.last_update = Some(Utc::now());
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Election {
    /// The ordering used for "newest first": creation time, then ID.
    pub fn recency(&self) -> (DateTime<Utc>, Id) {
        (self.create_date, self.id)
    }
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Correlates a data access review with its companion research purpose review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionLink {
    pub access_election_id: Id,
    pub research_purpose_election_id: Id,
}
