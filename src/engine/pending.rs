use std::collections::BTreeMap;

use super::Engine;
use crate::error::{Error, Result};
use crate::model::{
    api::pending::PendingCase,
    common::{
        election::{ElectionStatus, ElectionType},
        vote::VoteType,
    },
    db::vote::Vote,
    mongodb::Id,
};
use crate::store::{ElectionFilter, VoteFilter};

/// What every ballot on one election adds up to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CaseVotes {
    cast: usize,
    total: usize,
    chair_final_cast: bool,
}

fn fold_by_election(votes: &[Vote]) -> BTreeMap<Id, CaseVotes> {
    votes.iter().fold(BTreeMap::new(), |mut cases, vote| {
        let case: &mut CaseVotes = cases.entry(vote.election_id).or_default();
        match vote.vote_type {
            VoteType::Member => {
                case.total += 1;
                if vote.is_cast() {
                    case.cast += 1;
                }
            }
            VoteType::ChairFinal => case.chair_final_cast |= vote.value.is_some(),
            VoteType::ChairAgreement => {}
        }
        cases
    })
}

impl Engine {
    /// Open `family` elections on which `voter_id` holds a ballot, newest first.
    pub async fn pending_cases(&self, voter_id: Id, family: ElectionType) -> Result<Vec<PendingCase>> {
        if !family.is_case_family() {
            return Err(Error::invalid(format!(
                "{family:?} rounds are listed with their access review"
            )));
        }
        let mut session = self.begin().await?;

        let open = session
            .find_elections(
                &ElectionFilter::default()
                    .with_status(ElectionStatus::Open)
                    .with_type(family),
            )
            .await?;
        if open.is_empty() {
            return Ok(Vec::new());
        }
        let votes = session
            .find_votes(&VoteFilter::for_elections(open.iter().map(|e| e.id)))
            .await?;
        let cases = fold_by_election(&votes);

        let mut pending = Vec::new();
        for election in open {
            let Some(ballot) = votes.iter().find(|v| {
                v.election_id == election.id
                    && v.voter_id == voter_id
                    && v.vote_type == VoteType::Member
            }) else {
                continue;
            };
            let case = cases.get(&election.id).copied().unwrap_or_default();
            let access = election.election_type == ElectionType::DataAccessReview;
            let companion = if access {
                session.companion_of(election.id).await?
            } else {
                None
            };

            pending.push(PendingCase {
                election_id: election.id.into(),
                vote_id: ballot.id.into(),
                subject_id: election.subject_id.clone(),
                election_type: election.election_type,
                dataset_id: election.dataset_id.clone(),
                votes_logged: case.cast,
                total_votes: case.total,
                logged: format!("{}/{}", case.cast, case.total),
                already_voted: ballot.value.is_some(),
                status: ballot.status(),
                reminder_sent: ballot.reminder_sent,
                create_date: election.create_date,
                is_final_vote: access.then_some(case.chair_final_cast),
                companion_election_id: companion.map(Into::into),
                has_concerns: ballot.has_concerns,
            });
        }
        debug!("{} pending {family:?} case(s) for {voter_id}", pending.len());
        Ok(pending)
    }
}
