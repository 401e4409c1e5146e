use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::vote::{VoteStatus, VoteType},
    db::vote::Vote,
};

/// An API-friendly ballot description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub voter_id: ApiId,
    #[serde(rename = "type")]
    pub vote_type: VoteType,
    pub value: Option<bool>,
    pub rationale: Option<String>,
    pub has_concerns: Option<bool>,
    pub create_date: Option<DateTime<Utc>>,
    pub update_date: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub status: VoteStatus,
}

impl From<Vote> for VoteDescription {
    fn from(vote: Vote) -> Self {
        let status = vote.status();
        let Vote { id, vote } = vote;
        Self {
            id: id.into(),
            election_id: vote.election_id.into(),
            voter_id: vote.voter_id.into(),
            vote_type: vote.vote_type,
            value: vote.value,
            rationale: vote.rationale,
            has_concerns: vote.has_concerns,
            create_date: vote.create_date,
            update_date: vote.update_date,
            reminder_sent: vote.reminder_sent,
            status,
        }
    }
}
