use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, vote::VoteDescription},
    common::election::{ElectionStatus, ElectionType},
    db::election::Election,
};

/// Request to open a review round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionRequest {
    #[serde(rename = "type")]
    pub election_type: ElectionType,
    pub subject_id: String,
    /// Required for dataset reviews, rejected otherwise.
    #[serde(default)]
    pub dataset_id: Option<String>,
}

/// Request to move an election to a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: ElectionStatus,
    #[serde(default)]
    pub final_vote: Option<bool>,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    pub id: ApiId,
    #[serde(rename = "type")]
    pub election_type: ElectionType,
    pub subject_id: String,
    pub dataset_id: Option<String>,
    pub status: ElectionStatus,
    pub create_date: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
    pub final_vote: Option<bool>,
    pub final_rationale: Option<String>,
    pub final_access_vote: Option<bool>,
    pub use_restriction: Option<String>,
    pub translated_use_restriction: Option<String>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        let Election { id, election } = election;
        Self {
            id: id.into(),
            election_type: election.election_type,
            subject_id: election.subject_id,
            dataset_id: election.dataset_id,
            status: election.status,
            create_date: election.create_date,
            last_update: election.last_update,
            final_vote: election.final_vote,
            final_rationale: election.final_rationale,
            final_access_vote: election.final_access_vote,
            use_restriction: election.use_restriction,
            translated_use_restriction: election.translated_use_restriction,
        }
    }
}

/// A freshly opened round: the election, its companion, and every ballot materialized for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedElection {
    pub election: ElectionDescription,
    pub companion: Option<ElectionDescription>,
    pub votes: Vec<VoteDescription>,
}

/// The combined data owner verdict on the datasets an access request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetApproval {
    /// None of the requested datasets has an owner to approve it.
    ApprovalNotNeeded,
    Pending,
    Denied,
    Approved,
}

/// How many member ballots have been cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub cast: usize,
    pub total: usize,
}

impl Tally {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.cast == self.total
    }

    /// The `cast/total` ratio shown to voters.
    pub fn logged(&self) -> String {
        format!("{}/{}", self.cast, self.total)
    }
}
