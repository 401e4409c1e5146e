use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::{election::ElectionType, vote::VoteStatus},
};

/// One open election awaiting (or still editable by) a voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCase {
    pub election_id: ApiId,
    pub vote_id: ApiId,
    pub subject_id: String,
    #[serde(rename = "type")]
    pub election_type: ElectionType,
    pub dataset_id: Option<String>,
    pub votes_logged: usize,
    pub total_votes: usize,
    /// `votes_logged/total_votes`.
    pub logged: String,
    pub already_voted: bool,
    pub status: VoteStatus,
    pub reminder_sent: bool,
    pub create_date: DateTime<Utc>,
    /// Whether the chair's closing ballot is already cast. Only meaningful for access reviews.
    pub is_final_vote: Option<bool>,
    pub companion_election_id: Option<ApiId>,
    pub has_concerns: Option<bool>,
}
