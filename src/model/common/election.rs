use mongodb::bson::{to_bson, Bson};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

/// The kind of review an election runs.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, FromFormField)]
pub enum ElectionType {
    /// Review of a consent's data use limitations.
    ConsentReview,
    /// Review of a data access request.
    DataAccessReview,
    /// Companion round reviewing the research purpose of a structured access request.
    ResearchPurposeReview,
    /// Data-owner approval of a single dataset requested by an access request.
    DatasetReview,
}

impl ElectionType {
    /// Does this kind of election review a data access request (rather than a consent)?
    pub fn reviews_access_request(self) -> bool {
        !matches!(self, Self::ConsentReview)
    }

    /// Can a voter list pending cases for this kind of election?
    pub fn is_case_family(self) -> bool {
        !matches!(self, Self::ResearchPurposeReview)
    }
}

impl From<ElectionType> for Bson {
    fn from(election_type: ElectionType) -> Self {
        to_bson(&election_type).expect("Serialisation is infallible")
    }
}

/// States in the election lifecycle.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
pub enum ElectionStatus {
    /// Accepting ballots.
    Open,
    /// Member ballots are frozen; the outcome is recorded or awaiting the chair.
    Closed,
    /// Abandoned, e.g. because the committee changed under it.
    Canceled,
    /// The chair's binding outcome has been recorded.
    Final,
}

impl ElectionStatus {
    /// Is moving from this status to `next` a legal transition for the given kind of election?
    pub fn can_transition_to(self, next: ElectionStatus, election_type: ElectionType) -> bool {
        match (self, next) {
            (Self::Open, Self::Closed) | (Self::Open, Self::Canceled) => true,
            (Self::Closed, Self::Final) => election_type == ElectionType::DataAccessReview,
            _ => false,
        }
    }

    /// Closed or finalized. Historical elections are never touched by delegation.
    pub fn is_historical(self) -> bool {
        matches!(self, Self::Closed | Self::Final)
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ElectionStatus::*;
    use ElectionType::*;

    #[test]
    fn open_can_close_or_cancel() {
        for election_type in [ConsentReview, DataAccessReview, ResearchPurposeReview, DatasetReview] {
            assert!(Open.can_transition_to(Closed, election_type));
            assert!(Open.can_transition_to(Canceled, election_type));
            assert!(!Open.can_transition_to(Open, election_type));
            assert!(!Open.can_transition_to(Final, election_type));
        }
    }

    #[test]
    fn only_access_reviews_become_final() {
        assert!(Closed.can_transition_to(Final, DataAccessReview));
        assert!(!Closed.can_transition_to(Final, ConsentReview));
        assert!(!Closed.can_transition_to(Final, ResearchPurposeReview));
        assert!(!Closed.can_transition_to(Final, DatasetReview));
    }

    #[test]
    fn terminal_states_stay_put() {
        for next in [Open, Closed, Canceled, Final] {
            assert!(!Canceled.can_transition_to(next, DataAccessReview));
            assert!(!Final.can_transition_to(next, DataAccessReview));
        }
        assert!(!Closed.can_transition_to(Open, ConsentReview));
        assert!(!Closed.can_transition_to(Canceled, ConsentReview));
    }

    #[test]
    fn serialises_as_variant_name() {
        assert_eq!(Bson::from(Open), Bson::String("Open".to_string()));
        assert_eq!(
            Bson::from(DataAccessReview),
            Bson::String("DataAccessReview".to_string())
        );
    }
}
