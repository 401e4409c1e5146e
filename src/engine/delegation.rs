use super::{eligibility, ledger, lifecycle, Engine, Session};
use crate::error::{Error, Result};
use crate::model::{
    common::{
        election::{ElectionStatus, ElectionType},
        member::Role,
    },
    db::{election::Election, member::Member},
    mongodb::Id,
};
use crate::notify::Notification;
use crate::store::{ElectionFilter, Transaction, VoteFilter};

/// The outcome of appointing a new chairperson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Succession {
    pub chair: Member,
    /// The outgoing chair, now an alumnus.
    pub previous_chair: Option<Member>,
    /// Fresh rounds replacing the ones the outgoing chair was voting on.
    pub reopened: Vec<Election>,
}

async fn get_member(txn: &mut dyn Transaction, id: Id) -> Result<Member> {
    txn.member(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Member {id}")))
}

/// Move a member off the voting committee.
fn retire(member: &mut Member) {
    member.revoke(Role::Chairperson);
    member.revoke(Role::Member);
    member.grant(Role::Alumni);
}

/// Delete `voter_id`'s ballots on open elections of `types`, returning the
/// elections that lost a ballot.
async fn void_ballots(txn: &mut dyn Transaction, voter_id: Id, types: &[ElectionType]) -> Result<Vec<Id>> {
    let filter = ElectionFilter {
        statuses: vec![ElectionStatus::Open],
        types: types.to_vec(),
        ..Default::default()
    };
    let open = txn.find_elections(&filter).await?;
    if open.is_empty() {
        return Ok(Vec::new());
    }
    let ballots = txn
        .find_votes(&VoteFilter::for_elections(open.iter().map(|e| e.id)).by_voter(voter_id))
        .await?;

    let mut affected: Vec<Id> = Vec::new();
    for ballot in &ballots {
        if !affected.contains(&ballot.election_id) {
            affected.push(ballot.election_id);
        }
    }
    let ids: Vec<Id> = ballots.iter().map(|b| b.id).collect();
    let deleted = txn.delete_votes(&ids).await?;
    debug!("Voided {deleted} ballot(s) of {voter_id} on {} election(s)", affected.len());
    Ok(affected)
}

pub(super) async fn promote_chair(session: &mut Session, member_id: Id) -> Result<Succession> {
    let mut chair = get_member(&mut **session, member_id).await?;
    if chair.has_active_role(Role::Chairperson) {
        return Err(Error::invalid(format!("Member {member_id} is already the chairperson")));
    }
    let previous = eligibility::current_chair(&mut **session).await?;

    chair.grant(Role::Chairperson);
    chair.revoke(Role::Alumni);
    session.replace_member(&chair).await?;

    let Some(mut previous) = previous else {
        // Nobody was chairing, so open rounds only need the new chair's ballots.
        let filter = ElectionFilter {
            statuses: vec![ElectionStatus::Open],
            types: vec![
                ElectionType::ConsentReview,
                ElectionType::DataAccessReview,
                ElectionType::ResearchPurposeReview,
            ],
            ..Default::default()
        };
        let open = session.find_elections(&filter).await?;
        for election in open.iter().rev() {
            let added = ledger::materialize(&mut **session, election.id).await?;
            if !added.is_empty() {
                session.notify(Notification::new_round(
                    &[member_id],
                    &election.subject_id,
                    election.election_type,
                ));
            }
        }
        info!("Member {member_id} is now chairperson, topped up {} open election(s)", open.len());
        return Ok(Succession {
            chair,
            previous_chair: None,
            reopened: Vec::new(),
        });
    };

    retire(&mut previous);
    session.replace_member(&previous).await?;
    void_ballots(
        &mut **session,
        previous.id,
        &[
            ElectionType::ConsentReview,
            ElectionType::DataAccessReview,
            ElectionType::ResearchPurposeReview,
        ],
    )
    .await?;
    let reopened = lifecycle::reopen_canceled(session).await?;
    info!(
        "Member {member_id} succeeded {} as chairperson, {} round(s) reopened",
        previous.id,
        reopened.len()
    );

    Ok(Succession {
        chair,
        previous_chair: Some(previous),
        reopened,
    })
}

/// Drop a member's data owner role and void their open dataset review ballots.
/// Reviews left with only cast ballots close as usual.
pub(super) async fn remove_data_owner(session: &mut Session, member_id: Id) -> Result<Member> {
    let mut member = get_member(&mut **session, member_id).await?;
    if !member.has_active_role(Role::DataOwner) {
        return Err(Error::invalid(format!("Member {member_id} is not a data owner")));
    }
    member.revoke(Role::DataOwner);
    member.datasets.clear();
    session.replace_member(&member).await?;

    let affected = void_ballots(&mut **session, member_id, &[ElectionType::DatasetReview]).await?;
    for election_id in affected {
        ledger::close_dataset_review(session, election_id).await?;
    }
    info!("Member {member_id} is no longer a data owner");
    Ok(member)
}

/// Retire a committee member to alumni and void their open committee ballots.
pub(super) async fn remove_member(session: &mut Session, member_id: Id) -> Result<Member> {
    let mut member = get_member(&mut **session, member_id).await?;
    if !member.can_vote() {
        return Err(Error::invalid(format!("Member {member_id} is not on the committee")));
    }
    let was_chair = member.has_active_role(Role::Chairperson);
    retire(&mut member);
    session.replace_member(&member).await?;

    let affected = void_ballots(
        &mut **session,
        member_id,
        &[
            ElectionType::ConsentReview,
            ElectionType::DataAccessReview,
            ElectionType::ResearchPurposeReview,
        ],
    )
    .await?;
    for election_id in affected {
        let tally = ledger::tally(&mut **session, election_id).await?;
        if tally.is_complete() {
            session.notify(Notification::collect_ready(election_id));
        }
    }
    if was_chair {
        warn!("Chairperson {member_id} removed, the committee has no chair");
    } else {
        info!("Member {member_id} removed from the committee");
    }
    Ok(member)
}

impl Engine {
    /// Appoint a new chairperson. The outgoing chair becomes an alumnus and every open
    /// committee round is canceled and reopened against the new committee.
    pub async fn promote_chair(&self, member_id: Id) -> Result<Succession> {
        transact!(self, |session| promote_chair(&mut session, member_id).await?)
    }

    pub async fn remove_data_owner(&self, member_id: Id) -> Result<Member> {
        transact!(self, |session| remove_data_owner(&mut session, member_id).await?)
    }

    pub async fn remove_member(&self, member_id: Id) -> Result<Member> {
        transact!(self, |session| remove_member(&mut session, member_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::examples::Committee;
    use crate::model::common::vote::{BallotInput, VoteType};
    use crate::model::db::member::NewMember;

    #[backend_test(committee)]
    async fn chair_succession_reopens_rounds(engine: Engine, committee: Committee) {
        let consent = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let access = engine
            .start_review(ElectionType::DataAccessReview, "D1", None)
            .await
            .unwrap();
        let successor = committee.members[0].id;

        let succession = engine.promote_chair(successor).await.unwrap();
        assert_eq!(succession.chair.id, successor);
        assert!(succession.chair.has_active_role(Role::Chairperson));
        let previous = succession.previous_chair.unwrap();
        assert_eq!(previous.id, committee.chair.id);
        assert!(previous.has_active_role(Role::Alumni));
        assert!(!previous.can_vote());
        assert_eq!(succession.reopened.len(), 2);

        let old = engine.election(consent.election.id).await.unwrap();
        assert_eq!(old.status, ElectionStatus::Canceled);
        let old_companion = engine.companion(access.election.id).await.unwrap().unwrap();
        assert_eq!(old_companion.status, ElectionStatus::Canceled);

        let current = engine
            .current_election("C1", ElectionStatus::Open, None)
            .await
            .unwrap();
        assert_ne!(current.id, consent.election.id);

        // The outgoing chair holds no ballot anywhere any more.
        assert!(engine
            .votes_for_voter(committee.chair.id)
            .await
            .unwrap()
            .is_empty());
        let fresh = engine.votes_for_voter(successor).await.unwrap();
        let access_now = engine
            .current_election("D1", ElectionStatus::Open, Some(ElectionType::DataAccessReview))
            .await
            .unwrap();
        assert!(fresh
            .iter()
            .any(|v| v.election_id == access_now.id && v.vote_type == VoteType::ChairFinal));
        assert!(fresh
            .iter()
            .any(|v| v.election_id == current.id && v.vote_type == VoteType::Member));
    }

    #[backend_test(committee)]
    async fn succession_leaves_history_alone(engine: Engine, committee: Committee) {
        let consent = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let chair_ballot = consent
            .votes
            .iter()
            .find(|v| v.voter_id == committee.chair.id)
            .unwrap()
            .id;
        engine
            .cast_first(chair_ballot, BallotInput::new(true, None))
            .await
            .unwrap();
        engine
            .update_status(consent.election.id, ElectionStatus::Closed, Some(true), None)
            .await
            .unwrap();

        let succession = engine.promote_chair(committee.members[1].id).await.unwrap();
        assert!(succession.reopened.is_empty());
        let kept = engine.vote(chair_ballot).await.unwrap();
        assert_eq!(kept.value, Some(true));
        assert_eq!(
            engine.election(consent.election.id).await.unwrap().status,
            ElectionStatus::Closed
        );
    }

    #[backend_test(committee)]
    async fn promoting_the_chair_again_is_invalid(engine: Engine, committee: Committee) {
        let err = engine.promote_chair(committee.chair.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = engine.promote_chair(Id::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[backend_test]
    async fn first_chair_tops_up_open_rounds(engine: Engine) {
        let member = engine
            .create_member(NewMember::example("Only Member", &[Role::Member]))
            .await
            .unwrap();
        let hopeful = engine
            .create_member(NewMember::example("Hopeful", &[Role::Alumni]))
            .await
            .unwrap();
        engine
            .create_data_access_request(crate::model::db::subject::DataAccessRequest::unstructured_example())
            .await
            .unwrap();
        let opened = engine
            .start_review(ElectionType::DataAccessReview, "D2", None)
            .await
            .unwrap();
        assert_eq!(opened.votes.len(), 1);
        assert_eq!(opened.votes[0].voter_id, member.id);

        let succession = engine.promote_chair(hopeful.id).await.unwrap();
        assert_eq!(succession.previous_chair, None);
        assert!(succession.reopened.is_empty());

        let ballots = engine.votes_for_subject("D2").await.unwrap();
        assert_eq!(ballots.len(), 4);
        let mut chair_types: Vec<VoteType> = ballots
            .iter()
            .filter(|v| v.voter_id == hopeful.id)
            .map(|v| v.vote_type)
            .collect();
        chair_types.sort();
        assert_eq!(
            chair_types,
            vec![VoteType::Member, VoteType::ChairFinal, VoteType::ChairAgreement]
        );
        assert_eq!(
            engine.election(opened.election.id).await.unwrap().status,
            ElectionStatus::Open
        );
    }

    #[backend_test(committee)]
    async fn data_owner_removal_voids_dataset_ballots(engine: Engine, committee: Committee) {
        let review = engine
            .start_review(ElectionType::DatasetReview, "D1", Some("DS-1"))
            .await
            .unwrap();
        assert_eq!(review.votes.len(), 1);

        let member = engine
            .remove_data_owner(committee.data_owner.id)
            .await
            .unwrap();
        assert!(!member.has_active_role(Role::DataOwner));
        assert!(engine
            .votes_for_subject("D1")
            .await
            .unwrap()
            .is_empty());
        // Nobody is left to answer, so the review stays open.
        assert_eq!(
            engine.election(review.election.id).await.unwrap().status,
            ElectionStatus::Open
        );

        let err = engine
            .remove_data_owner(committee.data_owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[backend_test(committee)]
    async fn member_removal_voids_open_ballots(engine: Engine, committee: Committee) {
        let consent = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let leaving = committee.members[1].id;
        for vote in consent.votes.iter().filter(|v| v.voter_id != leaving) {
            engine
                .cast_first(vote.id, BallotInput::new(true, None))
                .await
                .unwrap();
        }
        assert!(!engine.tally(consent.election.id).await.unwrap().is_complete());

        let member = engine.remove_member(leaving).await.unwrap();
        assert!(member.has_active_role(Role::Alumni));
        assert!(engine.votes_for_voter(leaving).await.unwrap().is_empty());
        assert!(engine.tally(consent.election.id).await.unwrap().is_complete());

        let err = engine.remove_member(leaving).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = engine.remove_member(committee.alumni.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
