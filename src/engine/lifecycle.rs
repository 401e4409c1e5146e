use super::{ledger, Engine, Session};
use crate::error::{Error, Result};
use crate::model::{
    common::election::{ElectionStatus, ElectionType},
    db::{
        election::{Election, ElectionLink, NewElection},
        vote::Vote,
    },
    mongodb::Id,
};
use crate::notify::Notification;
use crate::store::{ElectionFilter, Transaction};

/// A freshly opened round with its companion and materialized ballots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub election: Election,
    pub companion: Option<Election>,
    pub votes: Vec<Vote>,
}

/// The restriction text under review, snapshotted onto each new election.
struct Snapshot {
    use_restriction: Option<String>,
    translated: Option<String>,
    /// Only data access requests with a structured restriction get a companion.
    needs_companion: bool,
}

async fn snapshot_subject(
    txn: &mut dyn Transaction,
    election_type: ElectionType,
    subject_id: &str,
    dataset_id: Option<&str>,
) -> Result<Snapshot> {
    if !election_type.reviews_access_request() {
        let consent = txn
            .consent(subject_id)
            .await?
            .ok_or_else(|| Error::InvalidSubject(format!("Consent {subject_id}")))?;
        return Ok(Snapshot {
            use_restriction: consent.use_restriction,
            translated: consent.translated_use_restriction,
            needs_companion: false,
        });
    }

    let dar = txn
        .data_access_request(subject_id)
        .await?
        .ok_or_else(|| Error::InvalidSubject(format!("Data access request {subject_id}")))?;
    if let Some(dataset_id) = dataset_id {
        if !dar.requests_dataset(dataset_id) {
            return Err(Error::invalid(format!(
                "Data access request {subject_id} does not request dataset {dataset_id}"
            )));
        }
    }
    Ok(Snapshot {
        needs_companion: election_type == ElectionType::DataAccessReview
            && dar.has_structured_restriction(),
        use_restriction: dar.restriction,
        translated: dar.translated_restriction,
    })
}

/// Open a round for a subject, plus its research purpose companion where needed.
///
/// The store rejects a second open round for the same subject and type.
pub(super) async fn open(
    txn: &mut dyn Transaction,
    election_type: ElectionType,
    subject_id: &str,
    dataset_id: Option<&str>,
) -> Result<(Election, Option<Election>)> {
    match (election_type, dataset_id) {
        (ElectionType::ResearchPurposeReview, _) => {
            return Err(Error::invalid(
                "Research purpose reviews are only opened alongside a data access review",
            ))
        }
        (ElectionType::DatasetReview, None) => {
            return Err(Error::invalid("Dataset reviews need a dataset"))
        }
        (ElectionType::DatasetReview, Some(_)) | (_, None) => {}
        (_, Some(_)) => {
            return Err(Error::invalid(format!(
                "{election_type:?} elections are not scoped to a dataset"
            )))
        }
    }

    let snapshot = snapshot_subject(txn, election_type, subject_id, dataset_id).await?;
    let election = txn
        .insert_election(NewElection::open(
            election_type,
            subject_id.to_string(),
            dataset_id.map(str::to_string),
            snapshot.use_restriction.clone(),
            snapshot.translated.clone(),
        ))
        .await?;
    info!(
        "Opened {election_type:?} election {} for {subject_id}",
        election.id
    );

    let companion = if snapshot.needs_companion {
        let companion = txn
            .insert_election(NewElection::open(
                ElectionType::ResearchPurposeReview,
                subject_id.to_string(),
                None,
                snapshot.use_restriction,
                snapshot.translated,
            ))
            .await?;
        txn.link_companion(ElectionLink {
            access_election_id: election.id,
            research_purpose_election_id: companion.id,
        })
        .await?;
        info!(
            "Opened research purpose election {} alongside {}",
            companion.id, election.id
        );
        Some(companion)
    } else {
        None
    };

    Ok((election, companion))
}

/// Open a round and materialize every ballot on it and its companion,
/// telling the voters about it.
pub(super) async fn start(
    session: &mut Session,
    election_type: ElectionType,
    subject_id: &str,
    dataset_id: Option<&str>,
) -> Result<Opened> {
    let (election, companion) = open(&mut **session, election_type, subject_id, dataset_id).await?;
    let mut votes = ledger::materialize(&mut **session, election.id).await?;
    if let Some(ref companion) = companion {
        votes.extend(ledger::materialize(&mut **session, companion.id).await?);
    }

    let mut voters: Vec<Id> = Vec::new();
    for vote in &votes {
        if !voters.contains(&vote.voter_id) {
            voters.push(vote.voter_id);
        }
    }
    if !voters.is_empty() {
        session.notify(Notification::new_round(&voters, subject_id, election_type));
    }

    Ok(Opened {
        election,
        companion,
        votes,
    })
}

/// Fetch an election or fail with `NotFound`.
pub(super) async fn get(txn: &mut dyn Transaction, id: Id) -> Result<Election> {
    txn.election(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))
}

/// The other half of an access/research purpose pair, if any.
pub(super) async fn companion(txn: &mut dyn Transaction, election: &Election) -> Result<Option<Election>> {
    let other = match election.election_type {
        ElectionType::DataAccessReview => txn.companion_of(election.id).await?,
        ElectionType::ResearchPurposeReview => txn.access_of(election.id).await?,
        _ => None,
    };
    match other {
        Some(id) => Ok(Some(get(txn, id).await?)),
        None => Ok(None),
    }
}

/// Move an election out of `Open` and apply the same move to its companion.
pub(super) async fn leave_open(
    txn: &mut dyn Transaction,
    election: &mut Election,
    status: ElectionStatus,
) -> Result<()> {
    if !election.status.can_transition_to(status, election.election_type) {
        return Err(Error::illegal(format!(
            "Election {} cannot move from {:?} to {:?}",
            election.id, election.status, status
        )));
    }
    election.set_status(status);
    txn.replace_election(election).await?;

    if let Some(mut companion) = companion(txn, election).await? {
        if companion.is_open() {
            companion.set_status(status);
            txn.replace_election(&companion).await?;
            debug!("Companion {} of {} is now {status:?}", companion.id, election.id);
        }
    }
    Ok(())
}

/// Apply a status change requested by a caller.
pub(super) async fn update_status(
    session: &mut Session,
    id: Id,
    status: ElectionStatus,
    final_vote: Option<bool>,
    rationale: Option<String>,
) -> Result<Election> {
    if rationale.is_some() && final_vote.is_none() {
        return Err(Error::invalid("A rationale needs a final vote"));
    }
    let mut election = get(&mut **session, id).await?;

    if status == ElectionStatus::Final {
        if !matches!(election.status, ElectionStatus::Open | ElectionStatus::Closed)
            || election.election_type != ElectionType::DataAccessReview
        {
            return Err(Error::illegal(format!(
                "Election {id} cannot move from {:?} to Final",
                election.status
            )));
        }
        let decided = ledger::try_finalize(session, id).await?.ok_or_else(|| {
            Error::illegal(format!("The chair has not decided election {id} yet"))
        })?;
        if final_vote.map_or(false, |vote| Some(vote) != decided.final_vote) {
            return Err(Error::invalid(
                "Final vote does not match the chair's closing ballot",
            ));
        }
        return Ok(decided);
    }

    if let Some(vote) = final_vote {
        election.final_vote = Some(vote);
        election.final_rationale = rationale;
    }
    leave_open(&mut **session, &mut election, status).await?;
    info!("Election {id} is now {status:?}");
    Ok(election)
}

/// Elections for a subject, newest first.
pub(super) async fn for_subject(
    txn: &mut dyn Transaction,
    subject_id: &str,
    status: Option<ElectionStatus>,
    election_type: Option<ElectionType>,
) -> Result<Vec<Election>> {
    let mut filter = ElectionFilter::for_subject(subject_id);
    filter.statuses.extend(status);
    filter.types.extend(election_type);
    txn.find_elections(&filter).await
}

/// Delete an election of `subject_id`, its companion, and all of their ballots.
pub(super) async fn delete(txn: &mut dyn Transaction, subject_id: &str, id: Id) -> Result<()> {
    let election = get(txn, id).await?;
    if election.subject_id != subject_id {
        return Err(Error::not_found(format!(
            "Election {id} for subject {subject_id}"
        )));
    }
    if election.election_type == ElectionType::DataAccessReview {
        if let Some(companion) = txn.companion_of(id).await? {
            txn.delete_election(companion).await?;
        }
    }
    txn.delete_election(id).await?;
    info!("Deleted election {id} of {subject_id}");
    Ok(())
}

/// Cancel every open consent and access review and open a fresh round in its place,
/// materialized against the current committee.
pub(super) async fn reopen_canceled(session: &mut Session) -> Result<Vec<Election>> {
    let filter = ElectionFilter {
        statuses: vec![ElectionStatus::Open],
        types: vec![ElectionType::ConsentReview, ElectionType::DataAccessReview],
        ..Default::default()
    };
    let mut open = session.find_elections(&filter).await?;
    // Oldest first, so the fresh rounds keep the original order.
    open.reverse();

    for election in open.iter_mut() {
        leave_open(&mut **session, election, ElectionStatus::Canceled).await?;
    }

    let mut reopened = Vec::with_capacity(open.len());
    for election in &open {
        let fresh = start(session, election.election_type, &election.subject_id, None).await?;
        info!(
            "Replaced canceled election {} of {} with {}",
            election.id, election.subject_id, fresh.election.id
        );
        reopened.push(fresh.election);
    }
    Ok(reopened)
}

impl Engine {
    /// Open a round for a subject without materializing ballots.
    pub async fn open_election(
        &self,
        election_type: ElectionType,
        subject_id: &str,
        dataset_id: Option<&str>,
    ) -> Result<(Election, Option<Election>)> {
        transact!(self, |session| {
            open(&mut *session, election_type, subject_id, dataset_id).await?
        })
    }

    /// Open a round, materialize its ballots and notify the voters.
    pub async fn start_review(
        &self,
        election_type: ElectionType,
        subject_id: &str,
        dataset_id: Option<&str>,
    ) -> Result<Opened> {
        transact!(self, |session| {
            start(&mut session, election_type, subject_id, dataset_id).await?
        })
    }

    pub async fn update_status(
        &self,
        id: Id,
        status: ElectionStatus,
        final_vote: Option<bool>,
        rationale: Option<String>,
    ) -> Result<Election> {
        transact!(self, |session| {
            update_status(&mut session, id, status, final_vote, rationale.clone()).await?
        })
    }

    pub async fn election(&self, id: Id) -> Result<Election> {
        let mut session = self.begin().await?;
        get(&mut *session, id).await
    }

    /// The research purpose companion of an access review, or vice versa.
    pub async fn companion(&self, id: Id) -> Result<Option<Election>> {
        let mut session = self.begin().await?;
        let election = get(&mut *session, id).await?;
        companion(&mut *session, &election).await
    }

    pub async fn elections_for_subject(
        &self,
        subject_id: &str,
        status: Option<ElectionStatus>,
        election_type: Option<ElectionType>,
    ) -> Result<Vec<Election>> {
        let mut session = self.begin().await?;
        for_subject(&mut *session, subject_id, status, election_type).await
    }

    /// The newest election for a subject with the given status.
    pub async fn current_election(
        &self,
        subject_id: &str,
        status: ElectionStatus,
        election_type: Option<ElectionType>,
    ) -> Result<Election> {
        self.elections_for_subject(subject_id, Some(status), election_type)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("{status:?} election for {subject_id}")))
    }

    /// Decided elections of one type across every subject, newest first.
    pub async fn closed_elections(&self, election_type: ElectionType) -> Result<Vec<Election>> {
        let mut session = self.begin().await?;
        let elections = session
            .find_elections(&ElectionFilter::default().with_type(election_type))
            .await?;
        Ok(elections
            .into_iter()
            .filter(|e| e.status.is_historical())
            .filter(|e| e.final_vote.is_some() || e.final_access_vote.is_some())
            .collect())
    }

    pub async fn delete_election(&self, subject_id: &str, id: Id) -> Result<()> {
        transact!(self, |session| delete(&mut *session, subject_id, id).await?)
    }
}
