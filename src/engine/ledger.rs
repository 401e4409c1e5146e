use chrono::Utc;

use super::{datasets, eligibility, lifecycle, Engine, Session};
use crate::error::{Error, Result};
use crate::model::{
    api::election::Tally,
    common::{
        election::{ElectionStatus, ElectionType},
        vote::{BallotInput, VoteType},
    },
    db::{
        election::Election,
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};
use crate::notify::Notification;
use crate::store::{ElectionFilter, Transaction, VoteFilter};

/// Insert the ballots missing from an open election.
///
/// Every eligible voter gets a `Member` ballot; on access reviews the chair also gets
/// the `ChairFinal` and `ChairAgreement` ballots. Ballots that already exist are left
/// alone, so this also tops up an election after the committee grows. Returns the
/// ballots inserted.
pub(super) async fn materialize(txn: &mut dyn Transaction, election_id: Id) -> Result<Vec<Vote>> {
    let election = lifecycle::get(txn, election_id).await?;
    if !election.is_open() {
        return Err(Error::illegal(format!(
            "Election {election_id} is {:?}, ballots can only be added while it is open",
            election.status
        )));
    }

    let electorate = eligibility::resolve_voters(
        txn,
        election.election_type,
        election.dataset_id.as_deref(),
    )
    .await?;
    let existing = txn
        .find_votes(&VoteFilter::for_elections([election_id]))
        .await?;
    let has = |voter_id: Id, vote_type: VoteType| {
        existing
            .iter()
            .any(|v| v.voter_id == voter_id && v.vote_type == vote_type)
    };

    let mut missing: Vec<NewVote> = electorate
        .members
        .iter()
        .filter(|voter| !has(**voter, VoteType::Member))
        .map(|voter| NewVote::blank(election_id, *voter, VoteType::Member))
        .collect();
    if election.election_type == ElectionType::DataAccessReview {
        if let Some(chair) = electorate.chair {
            for vote_type in [VoteType::ChairFinal, VoteType::ChairAgreement] {
                if !has(chair, vote_type) {
                    missing.push(NewVote::blank(election_id, chair, vote_type));
                }
            }
        }
    }

    let inserted = txn.insert_votes(missing).await?;
    debug!(
        "Materialized {} ballot(s) on election {election_id}",
        inserted.len()
    );
    Ok(inserted)
}

/// Count cast `Member` ballots.
pub(super) async fn tally(txn: &mut dyn Transaction, election_id: Id) -> Result<Tally> {
    let votes = txn
        .find_votes(&VoteFilter::for_elections([election_id]).of_type(VoteType::Member))
        .await?;
    Ok(Tally {
        cast: votes.iter().filter(|v| v.is_cast()).count(),
        total: votes.len(),
    })
}

async fn get_vote(txn: &mut dyn Transaction, id: Id) -> Result<Vote> {
    txn.vote(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vote {id}")))
}

/// Check an answer makes sense for this kind of ballot.
fn validate(input: &BallotInput, election: &Election) -> Result<()> {
    let dataset_review = election.election_type == ElectionType::DatasetReview;
    if input.has_concerns.is_some() && !dataset_review {
        return Err(Error::invalid("Only data owners can flag concerns"));
    }
    if input.value.is_none() && !(dataset_review && input.has_concerns == Some(true)) {
        return Err(Error::invalid("A ballot needs a value"));
    }
    Ok(())
}

/// Cast a ballot that has not been cast yet.
///
/// Member ballots are frozen once their election leaves `Open`. The chair's closing
/// ballots stay castable while the election is `Closed`, and casting them may
/// finalize it.
pub(super) async fn cast_first(session: &mut Session, vote_id: Id, input: BallotInput) -> Result<Vote> {
    let mut vote = get_vote(&mut **session, vote_id).await?;
    let election = lifecycle::get(&mut **session, vote.election_id).await?;
    if vote.is_cast() {
        return Err(Error::illegal(format!("Vote {vote_id} has already been cast")));
    }
    let castable = match vote.vote_type {
        VoteType::Member => election.is_open(),
        VoteType::ChairFinal | VoteType::ChairAgreement => {
            matches!(election.status, ElectionStatus::Open | ElectionStatus::Closed)
        }
    };
    if !castable {
        return Err(Error::illegal(format!(
            "Election {} is {:?}",
            election.id, election.status
        )));
    }
    validate(&input, &election)?;

    vote.value = input.value;
    vote.rationale = input.rationale();
    vote.has_concerns = input.has_concerns;
    vote.create_date = Some(Utc::now());
    session.replace_vote(&vote).await?;
    debug!("Vote {vote_id} cast on election {}", election.id);

    after_cast(session, &election, &vote, true).await?;
    Ok(vote)
}

/// Edit a ballot while its election is open.
///
/// Clearing the value also clears the rationale and the update date, and withdraws
/// any concerns unless they are flagged again. Otherwise the rationale is kept
/// unless a new one is supplied.
pub(super) async fn cast_update(
    session: &mut Session,
    vote_id: Id,
    subject_id: &str,
    input: BallotInput,
) -> Result<Vote> {
    let mut vote = get_vote(&mut **session, vote_id).await?;
    let election = lifecycle::get(&mut **session, vote.election_id).await?;
    if election.subject_id != subject_id {
        return Err(Error::not_found(format!(
            "Vote {vote_id} for subject {subject_id}"
        )));
    }
    if !election.is_open() {
        return Err(Error::illegal(format!(
            "Election {} is {:?}, ballots can no longer change",
            election.id, election.status
        )));
    }
    if input.has_concerns.is_some() && election.election_type != ElectionType::DatasetReview {
        return Err(Error::invalid("Only data owners can flag concerns"));
    }

    let was_cast = vote.is_cast();
    vote.value = input.value;
    match input.has_concerns {
        Some(has_concerns) => vote.has_concerns = Some(has_concerns),
        None if input.value.is_none() => vote.has_concerns = None,
        None => {}
    }
    if vote.value.is_some() {
        if let Some(rationale) = input.rationale() {
            vote.rationale = Some(rationale);
        }
        vote.update_date = Some(Utc::now());
        vote.create_date.get_or_insert_with(Utc::now);
    } else {
        vote.rationale = None;
        vote.update_date = None;
    }
    vote.reminder_sent = false;
    session.replace_vote(&vote).await?;
    debug!("Vote {vote_id} updated on election {}", election.id);

    if vote.is_cast() {
        after_cast(session, &election, &vote, !was_cast).await?;
    }
    Ok(vote)
}

/// Follow-up once a ballot holds an answer.
async fn after_cast(session: &mut Session, election: &Election, vote: &Vote, newly_cast: bool) -> Result<()> {
    match vote.vote_type {
        VoteType::Member if newly_cast => {
            let tally = tally(&mut **session, election.id).await?;
            if tally.is_complete() {
                info!("All member ballots cast on election {}", election.id);
                session.notify(Notification::collect_ready(election.id));
                if election.election_type == ElectionType::DatasetReview {
                    close_dataset_review(session, election.id).await?;
                }
            }
        }
        VoteType::Member => {}
        VoteType::ChairFinal | VoteType::ChairAgreement => {
            try_finalize(session, election.id).await?;
        }
    }
    Ok(())
}

/// Close a dataset review once every data owner has answered. Access is granted
/// only if nobody said no or flagged concerns.
pub(super) async fn close_dataset_review(session: &mut Session, election_id: Id) -> Result<Option<Election>> {
    let mut election = lifecycle::get(&mut **session, election_id).await?;
    if !election.is_open() || election.election_type != ElectionType::DatasetReview {
        return Ok(None);
    }
    let votes = session
        .find_votes(&VoteFilter::for_elections([election_id]))
        .await?;
    if votes.is_empty() || !votes.iter().all(|v| v.is_cast()) {
        return Ok(None);
    }
    let approved = votes
        .iter()
        .all(|v| v.value != Some(false) && v.has_concerns != Some(true));
    election.final_access_vote = Some(approved);
    election.final_vote = Some(approved);
    lifecycle::leave_open(&mut **session, &mut election, ElectionStatus::Closed).await?;
    info!("Dataset review {election_id} closed, approved: {approved}");
    datasets::announce_if_all_closed(session, &election.subject_id).await?;
    Ok(Some(election))
}

/// The single cast ballot of `vote_type` on an election, if any.
async fn chair_ballot(txn: &mut dyn Transaction, election_id: Id, vote_type: VoteType) -> Result<Option<Vote>> {
    let votes = txn
        .find_votes(&VoteFilter::for_elections([election_id]).of_type(vote_type))
        .await?;
    Ok(votes.into_iter().find(|v| v.value.is_some()))
}

/// Finalize an access review once the chair has decided.
///
/// The chair's `ChairFinal` ballot decides the election; when there is a research
/// purpose companion, the `ChairAgreement` ballot must be cast too and decides the
/// companion. Returns the election if it is `Final` afterwards. Calling this again on
/// a final election changes nothing.
pub(super) async fn try_finalize(session: &mut Session, election_id: Id) -> Result<Option<Election>> {
    let mut election = lifecycle::get(&mut **session, election_id).await?;
    if election.election_type != ElectionType::DataAccessReview {
        return Ok(None);
    }
    match election.status {
        ElectionStatus::Final => return Ok(Some(election)),
        ElectionStatus::Canceled => return Ok(None),
        ElectionStatus::Open | ElectionStatus::Closed => {}
    }

    let Some(decision) = chair_ballot(&mut **session, election_id, VoteType::ChairFinal).await? else {
        return Ok(None);
    };
    let companion = lifecycle::companion(&mut **session, &election).await?;
    let agreement = match companion {
        Some(_) => match chair_ballot(&mut **session, election_id, VoteType::ChairAgreement).await? {
            Some(agreement) => Some(agreement),
            None => return Ok(None),
        },
        None => None,
    };

    if election.is_open() {
        lifecycle::leave_open(&mut **session, &mut election, ElectionStatus::Closed).await?;
    }
    election.final_vote = decision.value;
    election.final_access_vote = decision.value;
    if decision.rationale.is_some() {
        election.final_rationale = decision.rationale.clone();
    }
    election.set_status(ElectionStatus::Final);
    session.replace_election(&election).await?;

    if let (Some(mut companion), Some(agreement)) = (companion, agreement) {
        companion.final_vote = agreement.value;
        companion.final_rationale = agreement.vote.rationale;
        companion.set_status(ElectionStatus::Final);
        session.replace_election(&companion).await?;
    }

    let approved = decision.value == Some(true);
    info!("Election {election_id} is final, approved: {approved}");
    session.notify(Notification::final_decision(election_id, approved));
    Ok(Some(election))
}

/// Mark an uncast ballot as reminded and nudge its voter.
pub(super) async fn send_reminder(session: &mut Session, vote_id: Id) -> Result<Vote> {
    let mut vote = get_vote(&mut **session, vote_id).await?;
    let election = lifecycle::get(&mut **session, vote.election_id).await?;
    if !election.is_open() {
        return Err(Error::illegal(format!("Election {} is not open", election.id)));
    }
    if vote.is_cast() {
        return Err(Error::illegal(format!("Vote {vote_id} has already been cast")));
    }
    if !vote.reminder_sent {
        vote.reminder_sent = true;
        session.replace_vote(&vote).await?;
    }
    session.notify(Notification::reminder(vote_id));
    Ok(vote)
}

/// Every ballot on every election of a subject.
pub(super) async fn for_subject(txn: &mut dyn Transaction, subject_id: &str) -> Result<Vec<Vote>> {
    let elections = txn
        .find_elections(&ElectionFilter::for_subject(subject_id))
        .await?;
    if elections.is_empty() {
        return Ok(Vec::new());
    }
    txn.find_votes(&VoteFilter::for_elections(elections.iter().map(|e| e.id)))
        .await
}

impl Engine {
    /// Insert any ballots missing from an open election.
    pub async fn materialize_votes(&self, election_id: Id) -> Result<Vec<Vote>> {
        transact!(self, |session| materialize(&mut *session, election_id).await?)
    }

    /// Cast a ballot for the first time. Chair-only ballots may finalize their election.
    pub async fn cast_first(&self, vote_id: Id, input: BallotInput) -> Result<Vote> {
        transact!(self, |session| {
            cast_first(&mut session, vote_id, input.clone()).await?
        })
    }

    /// Edit a ballot belonging to `subject_id`.
    pub async fn cast_update(&self, vote_id: Id, subject_id: &str, input: BallotInput) -> Result<Vote> {
        transact!(self, |session| {
            cast_update(&mut session, vote_id, subject_id, input.clone()).await?
        })
    }

    pub async fn tally(&self, election_id: Id) -> Result<Tally> {
        let mut session = self.begin().await?;
        lifecycle::get(&mut *session, election_id).await?;
        tally(&mut *session, election_id).await
    }

    pub async fn vote(&self, id: Id) -> Result<Vote> {
        let mut session = self.begin().await?;
        get_vote(&mut *session, id).await
    }

    pub async fn votes_for_subject(&self, subject_id: &str) -> Result<Vec<Vote>> {
        let mut session = self.begin().await?;
        for_subject(&mut *session, subject_id).await
    }

    pub async fn votes_for_voter(&self, voter_id: Id) -> Result<Vec<Vote>> {
        let mut session = self.begin().await?;
        session.find_votes(&VoteFilter::for_voter(voter_id)).await
    }

    /// Ballots of one type on an election.
    pub async fn votes_of_type(&self, election_id: Id, vote_type: VoteType) -> Result<Vec<Vote>> {
        let mut session = self.begin().await?;
        lifecycle::get(&mut *session, election_id).await?;
        session
            .find_votes(&VoteFilter::for_elections([election_id]).of_type(vote_type))
            .await
    }

    pub async fn delete_vote(&self, id: Id) -> Result<()> {
        transact!(self, |session| {
            if session.delete_votes(&[id]).await? == 0 {
                return Err(Error::not_found(format!("Vote {id}")));
            }
        })
    }

    /// Delete every ballot of a subject. Returns how many were deleted.
    pub async fn delete_votes_for_subject(&self, subject_id: &str) -> Result<u64> {
        let deleted = transact!(self, |session| {
            let ids: Vec<Id> = for_subject(&mut *session, subject_id)
                .await?
                .into_iter()
                .map(|v| v.id)
                .collect();
            session.delete_votes(&ids).await?
        })?;
        info!("Deleted {deleted} vote(s) of {subject_id}");
        Ok(deleted)
    }

    pub async fn send_reminder(&self, vote_id: Id) -> Result<Vote> {
        transact!(self, |session| send_reminder(&mut session, vote_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::examples::Committee;
    use crate::model::common::{member::Role, vote::VoteStatus};
    use crate::model::db::member::NewMember;
    use crate::notify::RecordingNotifier;

    fn member_ballot<'a>(votes: &'a [Vote], voter_id: Id) -> &'a Vote {
        votes
            .iter()
            .find(|v| v.voter_id == voter_id && v.vote_type == VoteType::Member)
            .unwrap()
    }

    fn chair_ballot_of(votes: &[Vote], vote_type: VoteType) -> Id {
        votes.iter().find(|v| v.vote_type == vote_type).unwrap().id
    }

    #[backend_test(committee)]
    async fn first_cast_then_update(engine: Engine, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let ballot = member_ballot(&opened.votes, committee.members[0].id).id;

        let cast = engine
            .cast_first(ballot, BallotInput::new(false, Some("concern")))
            .await
            .unwrap();
        assert_eq!(cast.value, Some(false));
        assert_eq!(cast.rationale.as_deref(), Some("concern"));
        assert!(cast.create_date.is_some());
        assert_eq!(cast.update_date, None);

        let err = engine
            .cast_first(ballot, BallotInput::new(true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalTransition(_)));

        let updated = engine
            .cast_update(ballot, "C1", BallotInput::new(true, None))
            .await
            .unwrap();
        assert_eq!(updated.value, Some(true));
        assert_eq!(updated.rationale.as_deref(), Some("concern"));
        assert!(updated.update_date.is_some());
        assert_eq!(updated.create_date, cast.create_date);

        let cleared = engine
            .cast_update(ballot, "C1", BallotInput::default())
            .await
            .unwrap();
        assert_eq!(cleared.value, None);
        assert_eq!(cleared.rationale, None);
        assert_eq!(cleared.update_date, None);
    }

    #[backend_test(committee)]
    async fn update_checks_subject_and_status(engine: Engine, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let ballot = member_ballot(&opened.votes, committee.members[1].id).id;

        let err = engine
            .cast_update(ballot, "D1", BallotInput::new(true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let err = engine
            .cast_update(Id::new(), "C1", BallotInput::new(true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        engine
            .update_status(opened.election.id, ElectionStatus::Closed, None, None)
            .await
            .unwrap();
        let err = engine
            .cast_update(ballot, "C1", BallotInput::new(true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalTransition(_)));
        let err = engine
            .cast_first(ballot, BallotInput::new(true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalTransition(_)));
    }

    #[backend_test(committee)]
    async fn cast_needs_a_value(engine: Engine, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let ballot = member_ballot(&opened.votes, committee.chair.id).id;
        let err = engine
            .cast_first(ballot, BallotInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let concerns = BallotInput {
            has_concerns: Some(true),
            ..Default::default()
        };
        let err = engine.cast_first(ballot, concerns).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = engine
            .cast_first(Id::new(), BallotInput::new(true, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Blank rationales are dropped.
        let cast = engine
            .cast_first(ballot, BallotInput::new(true, Some("  ")))
            .await
            .unwrap();
        assert_eq!(cast.rationale, None);
    }

    #[backend_test(committee)]
    async fn materialize_is_a_top_up(engine: Engine) {
        let (election, companion) = engine
            .open_election(ElectionType::DataAccessReview, "D1", None)
            .await
            .unwrap();
        let votes = engine.materialize_votes(election.id).await.unwrap();
        assert_eq!(
            votes.iter().filter(|v| v.vote_type == VoteType::Member).count(),
            3
        );
        assert_eq!(
            votes.iter().filter(|v| v.vote_type == VoteType::ChairFinal).count(),
            1
        );
        assert_eq!(
            votes.iter().filter(|v| v.vote_type == VoteType::ChairAgreement).count(),
            1
        );
        assert!(votes.iter().all(|v| v.value.is_none()));
        assert!(engine.materialize_votes(election.id).await.unwrap().is_empty());

        let companion_votes = engine
            .materialize_votes(companion.unwrap().id)
            .await
            .unwrap();
        assert_eq!(companion_votes.len(), 3);
        assert!(companion_votes.iter().all(|v| v.vote_type == VoteType::Member));

        engine
            .update_status(election.id, ElectionStatus::Canceled, None, None)
            .await
            .unwrap();
        let err = engine.materialize_votes(election.id).await.unwrap_err();
        assert!(matches!(err, Error::IllegalTransition(_)));
    }

    #[backend_test(committee)]
    async fn collect_ready_when_members_done(
        engine: Engine,
        notifier: RecordingNotifier,
        committee: Committee,
    ) {
        let opened = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        for (i, voter) in committee.voters().into_iter().enumerate() {
            let tally = engine.tally(opened.election.id).await.unwrap();
            assert_eq!(tally, Tally { cast: i, total: 3 });
            let ballot = member_ballot(&opened.votes, voter).id;
            engine
                .cast_first(ballot, BallotInput::new(true, None))
                .await
                .unwrap();
        }
        assert!(engine.tally(opened.election.id).await.unwrap().is_complete());
        let sent = notifier.wait_for(2).await;
        assert_eq!(sent[1], Notification::collect_ready(opened.election.id));
    }

    #[backend_test(committee)]
    async fn chair_ballots_finalize(engine: Engine, notifier: RecordingNotifier) {
        let opened = engine
            .start_review(ElectionType::DataAccessReview, "D1", None)
            .await
            .unwrap();
        let id = opened.election.id;
        let final_ballot = chair_ballot_of(&opened.votes, VoteType::ChairFinal);
        let agreement = chair_ballot_of(&opened.votes, VoteType::ChairAgreement);

        // One chair ballot is not enough while there is a companion.
        engine
            .cast_first(final_ballot, BallotInput::new(true, Some("Approved")))
            .await
            .unwrap();
        assert_eq!(engine.election(id).await.unwrap().status, ElectionStatus::Open);

        engine
            .cast_first(agreement, BallotInput::new(false, Some("Purpose mismatch")))
            .await
            .unwrap();
        let election = engine.election(id).await.unwrap();
        assert_eq!(election.status, ElectionStatus::Final);
        assert_eq!(election.final_access_vote, Some(true));
        assert_eq!(election.final_vote, Some(true));
        assert_eq!(election.final_rationale.as_deref(), Some("Approved"));
        let companion = engine.companion(id).await.unwrap().unwrap();
        assert_eq!(companion.status, ElectionStatus::Final);
        assert_eq!(companion.final_vote, Some(false));

        // Asking again is harmless.
        let mut session = engine.begin().await.unwrap();
        let again = try_finalize(&mut session, id).await.unwrap().unwrap();
        assert_eq!(again, election);
        drop(session);

        let sent = notifier.wait_for(2).await;
        assert_eq!(sent[1], Notification::final_decision(id, true));
    }

    #[backend_test(committee)]
    async fn single_chair_ballot_without_companion(engine: Engine) {
        let opened = engine
            .start_review(ElectionType::DataAccessReview, "D2", None)
            .await
            .unwrap();
        let id = opened.election.id;
        engine
            .update_status(id, ElectionStatus::Closed, None, None)
            .await
            .unwrap();
        let final_ballot = chair_ballot_of(&opened.votes, VoteType::ChairFinal);
        engine
            .cast_first(final_ballot, BallotInput::new(false, None))
            .await
            .unwrap();
        let election = engine.election(id).await.unwrap();
        assert_eq!(election.status, ElectionStatus::Final);
        assert_eq!(election.final_access_vote, Some(false));
    }

    #[backend_test(committee)]
    async fn dataset_review_closes_itself(engine: Engine, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::DatasetReview, "D1", Some("DS-1"))
            .await
            .unwrap();
        assert_eq!(opened.votes.len(), 1);
        assert_eq!(opened.votes[0].voter_id, committee.data_owner.id);

        let concerns = BallotInput {
            value: Some(true),
            rationale: None,
            has_concerns: Some(true),
        };
        engine.cast_first(opened.votes[0].id, concerns).await.unwrap();
        let election = engine.election(opened.election.id).await.unwrap();
        assert_eq!(election.status, ElectionStatus::Closed);
        assert_eq!(election.final_access_vote, Some(false));
    }

    #[backend_test(committee)]
    async fn clearing_a_flagged_ballot_withdraws_everything(engine: Engine, committee: Committee) {
        let mut second = NewMember::example("Second Owner", &[Role::DataOwner]);
        second.datasets.push("DS-1".to_string());
        engine.create_member(second).await.unwrap();
        let opened = engine
            .start_review(ElectionType::DatasetReview, "D1", Some("DS-1"))
            .await
            .unwrap();
        assert_eq!(opened.votes.len(), 2);
        let ballot = member_ballot(&opened.votes, committee.data_owner.id).id;

        let worried = BallotInput {
            value: Some(true),
            rationale: Some("worried".to_string()),
            has_concerns: Some(true),
        };
        engine.cast_first(ballot, worried).await.unwrap();
        let cleared = engine
            .cast_update(ballot, "D1", BallotInput::default())
            .await
            .unwrap();
        assert_eq!(cleared.value, None);
        assert_eq!(cleared.rationale, None);
        assert_eq!(cleared.update_date, None);
        assert_eq!(cleared.has_concerns, None);

        // Concerns alone count towards the tally but leave the ballot pending.
        let concerns_only = BallotInput {
            value: None,
            rationale: Some("unsure".to_string()),
            has_concerns: Some(true),
        };
        let flagged = engine.cast_update(ballot, "D1", concerns_only).await.unwrap();
        assert_eq!(flagged.rationale, None);
        assert_eq!(flagged.update_date, None);
        let cases = engine
            .pending_cases(committee.data_owner.id, ElectionType::DatasetReview)
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].logged, "1/2");
        assert!(!cases[0].already_voted);
        assert_eq!(cases[0].status, VoteStatus::Pending);
    }

    #[backend_test(committee)]
    async fn reminders(engine: Engine, notifier: RecordingNotifier, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let ballot = member_ballot(&opened.votes, committee.members[0].id).id;
        let reminded = engine.send_reminder(ballot).await.unwrap();
        assert!(reminded.reminder_sent);
        assert!(engine.send_reminder(ballot).await.unwrap().reminder_sent);
        let sent = notifier.wait_for(3).await;
        assert_eq!(sent[1], Notification::reminder(ballot));

        engine
            .cast_first(ballot, BallotInput::new(true, None))
            .await
            .unwrap();
        let err = engine.send_reminder(ballot).await.unwrap_err();
        assert!(matches!(err, Error::IllegalTransition(_)));
        let updated = engine
            .cast_update(ballot, "C1", BallotInput::new(false, None))
            .await
            .unwrap();
        assert!(!updated.reminder_sent);
    }

    #[backend_test(committee)]
    async fn read_and_delete_ballots(engine: Engine, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::DataAccessReview, "D1", None)
            .await
            .unwrap();
        assert_eq!(engine.votes_for_subject("D1").await.unwrap().len(), 8);
        assert_eq!(
            engine
                .votes_of_type(opened.election.id, VoteType::ChairFinal)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            engine.votes_for_voter(committee.chair.id).await.unwrap().len(),
            4
        );

        let first = opened.votes[0].id;
        assert_eq!(engine.vote(first).await.unwrap().id, first);
        engine.delete_vote(first).await.unwrap();
        let err = engine.delete_vote(first).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        assert_eq!(engine.delete_votes_for_subject("D1").await.unwrap(), 7);
        assert!(engine.votes_for_subject("D1").await.unwrap().is_empty());
    }
}
