use mongodb::bson::{to_bson, Bson};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

/// The role a ballot plays within its election.
#[derive(
    Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, FromFormField,
)]
pub enum VoteType {
    /// An ordinary committee (or data owner) ballot.
    Member,
    /// The chairperson's binding outcome.
    ChairFinal,
    /// The chairperson's agreement with the companion research purpose round.
    ChairAgreement,
}

impl VoteType {
    /// Chair-only ballots are only ever materialized for the current chairperson.
    pub fn is_chair_only(self) -> bool {
        !matches!(self, Self::Member)
    }
}

impl From<VoteType> for Bson {
    fn from(vote_type: VoteType) -> Self {
        to_bson(&vote_type).expect("Serialisation is infallible")
    }
}

/// Whether a voter's ballot still awaits their input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteStatus {
    Pending,
    Editable,
}

/// A voter's answer, as submitted when casting or editing a ballot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotInput {
    #[serde(default)]
    pub value: Option<bool>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub has_concerns: Option<bool>,
}

impl BallotInput {
    pub fn new(value: bool, rationale: Option<&str>) -> Self {
        Self {
            value: Some(value),
            rationale: rationale.map(str::to_string),
            has_concerns: None,
        }
    }

    /// The rationale, with blank text treated as absent.
    pub fn rationale(&self) -> Option<String> {
        self.rationale
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}
