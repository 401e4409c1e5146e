//! Data owner review of the datasets an access request asks for.

use super::{lifecycle, Engine, Opened, Session};
use crate::error::{Error, Result};
use crate::model::{
    api::election::DatasetApproval,
    common::{
        election::{ElectionStatus, ElectionType},
        member::Role,
    },
    db::{election::Election, subject::DataAccessRequest},
};
use crate::notify::Notification;
use crate::store::{ElectionFilter, MemberFilter, Transaction};

async fn get_request(txn: &mut dyn Transaction, dar_id: &str) -> Result<DataAccessRequest> {
    txn.data_access_request(dar_id)
        .await?
        .ok_or_else(|| Error::InvalidSubject(format!("Data access request {dar_id}")))
}

/// The requested datasets that have an owner to approve them, in request order.
async fn needing_approval(txn: &mut dyn Transaction, dar: &DataAccessRequest) -> Result<Vec<String>> {
    let owners = txn
        .find_members(&MemberFilter::with_roles(&[Role::DataOwner]))
        .await?;
    Ok(dar
        .datasets
        .iter()
        .filter(|dataset| owners.iter().any(|owner| owner.owns_dataset(dataset)))
        .cloned()
        .collect())
}

/// The newest open or closed dataset review per dataset of a request.
pub(super) async fn latest_reviews(txn: &mut dyn Transaction, dar_id: &str) -> Result<Vec<Election>> {
    let filter = ElectionFilter::for_subject(dar_id)
        .with_type(ElectionType::DatasetReview)
        .with_status(ElectionStatus::Open)
        .with_status(ElectionStatus::Closed);
    let mut latest: Vec<Election> = Vec::new();
    for election in txn.find_elections(&filter).await? {
        if !latest.iter().any(|e| e.dataset_id == election.dataset_id) {
            latest.push(election);
        }
    }
    Ok(latest)
}

/// Once every dataset review of a request is closed, tell whoever runs its access review.
pub(super) async fn announce_if_all_closed(session: &mut Session, dar_id: &str) -> Result<()> {
    let latest = latest_reviews(&mut **session, dar_id).await?;
    if latest.is_empty() || latest.iter().any(|e| e.status != ElectionStatus::Closed) {
        return Ok(());
    }
    let access = session
        .find_elections(&ElectionFilter::for_subject(dar_id).with_type(ElectionType::DataAccessReview))
        .await?
        .into_iter()
        .next();
    info!("Every dataset review of {dar_id} has closed");
    session.notify(Notification::dataset_reviews_closed(dar_id, access.map(|e| e.id)));
    Ok(())
}

/// Open a dataset review for every owned dataset of a request that has none open.
pub(super) async fn start_all(session: &mut Session, dar_id: &str) -> Result<Vec<Opened>> {
    let dar = get_request(&mut **session, dar_id).await?;
    let datasets = needing_approval(&mut **session, &dar).await?;

    let mut opened = Vec::new();
    for dataset in &datasets {
        let open = session
            .find_elections(&ElectionFilter {
                dataset_id: Some(dataset.clone()),
                ..ElectionFilter::for_subject(dar_id)
                    .with_type(ElectionType::DatasetReview)
                    .with_status(ElectionStatus::Open)
            })
            .await?;
        if !open.is_empty() {
            debug!("Dataset {dataset} of {dar_id} is already under review");
            continue;
        }
        opened.push(lifecycle::start(session, ElectionType::DatasetReview, dar_id, Some(dataset.as_str())).await?);
    }
    info!(
        "Opened {} dataset review(s) for {dar_id} out of {} owned dataset(s)",
        opened.len(),
        datasets.len()
    );
    Ok(opened)
}

/// Combine the data owner reviews of a request into one verdict.
pub(super) async fn approval(txn: &mut dyn Transaction, dar_id: &str) -> Result<DatasetApproval> {
    let dar = get_request(txn, dar_id).await?;
    let datasets = needing_approval(txn, &dar).await?;
    if datasets.is_empty() {
        return Ok(DatasetApproval::ApprovalNotNeeded);
    }
    let access_open = !txn
        .find_elections(
            &ElectionFilter::for_subject(dar_id)
                .with_type(ElectionType::DataAccessReview)
                .with_status(ElectionStatus::Open),
        )
        .await?
        .is_empty();
    if access_open {
        return Ok(DatasetApproval::Pending);
    }

    let latest = latest_reviews(txn, dar_id).await?;
    for dataset in &datasets {
        let review = latest
            .iter()
            .find(|e| e.dataset_id.as_deref() == Some(dataset.as_str()));
        match review {
            None => return Ok(DatasetApproval::Pending),
            Some(review) if review.is_open() => return Ok(DatasetApproval::Pending),
            Some(review) if review.final_access_vote != Some(true) => {
                return Ok(DatasetApproval::Denied)
            }
            Some(_) => {}
        }
    }
    Ok(DatasetApproval::Approved)
}

impl Engine {
    /// Open a dataset review for every owned dataset a request asks for, skipping
    /// datasets already under review.
    pub async fn start_dataset_reviews(&self, dar_id: &str) -> Result<Vec<Opened>> {
        transact!(self, |session| start_all(&mut session, dar_id).await?)
    }

    pub async fn dataset_approval(&self, dar_id: &str) -> Result<DatasetApproval> {
        let mut session = self.begin().await?;
        approval(&mut *session, dar_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::examples::Committee;
    use crate::model::common::vote::BallotInput;
    use crate::model::db::member::NewMember;
    use crate::notify::RecordingNotifier;

    /// D3 asks for DS-1 and DS-3, each with its own owner, and the unowned DS-9.
    async fn two_dataset_request(engine: &Engine) {
        let mut owner = NewMember::example("Other Owner", &[Role::DataOwner]);
        owner.datasets.push("DS-3".to_string());
        engine.create_member(owner).await.unwrap();
        let mut dar = DataAccessRequest::structured_example();
        dar.id = "D3".to_string();
        dar.datasets = vec!["DS-1".to_string(), "DS-3".to_string(), "DS-9".to_string()];
        engine.create_data_access_request(dar).await.unwrap();
    }

    #[backend_test(committee)]
    async fn opens_one_review_per_owned_dataset(engine: Engine) {
        two_dataset_request(&engine).await;
        let opened = engine.start_dataset_reviews("D3").await.unwrap();
        let datasets: Vec<Option<String>> = opened
            .iter()
            .map(|o| o.election.dataset_id.clone())
            .collect();
        assert_eq!(
            datasets,
            vec![Some("DS-1".to_string()), Some("DS-3".to_string())]
        );
        assert!(opened.iter().all(|o| o.votes.len() == 1));

        // Running it again finds both already under review.
        assert!(engine.start_dataset_reviews("D3").await.unwrap().is_empty());

        let err = engine.start_dataset_reviews("nope").await.unwrap_err();
        assert!(matches!(err, Error::InvalidSubject(_)));
    }

    #[backend_test(committee)]
    async fn approval_follows_the_reviews(engine: Engine, notifier: RecordingNotifier) {
        // D2 asks only for DS-2, which nobody owns.
        assert_eq!(
            engine.dataset_approval("D2").await.unwrap(),
            DatasetApproval::ApprovalNotNeeded
        );

        two_dataset_request(&engine).await;
        assert_eq!(
            engine.dataset_approval("D3").await.unwrap(),
            DatasetApproval::Pending
        );
        let access = engine
            .start_review(ElectionType::DataAccessReview, "D3", None)
            .await
            .unwrap();
        let opened = engine.start_dataset_reviews("D3").await.unwrap();
        assert_eq!(
            engine.dataset_approval("D3").await.unwrap(),
            DatasetApproval::Pending
        );
        engine
            .update_status(access.election.id, ElectionStatus::Canceled, None, None)
            .await
            .unwrap();

        engine
            .cast_first(opened[0].votes[0].id, BallotInput::new(true, None))
            .await
            .unwrap();
        assert_eq!(
            engine.dataset_approval("D3").await.unwrap(),
            DatasetApproval::Pending
        );
        engine
            .cast_first(opened[1].votes[0].id, BallotInput::new(false, Some("no")))
            .await
            .unwrap();
        assert_eq!(
            engine.dataset_approval("D3").await.unwrap(),
            DatasetApproval::Denied
        );

        // Three new rounds, two collect-ready and the closing notice.
        let sent = notifier.wait_for(6).await;
        let expected = Notification::dataset_reviews_closed("D3", Some(access.election.id));
        assert_eq!(sent.iter().filter(|n| **n == expected).count(), 1);
    }

    #[backend_test(committee)]
    async fn all_owners_agreeing_approves(engine: Engine, committee: Committee) {
        let opened = engine.start_dataset_reviews("D1").await.unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].votes[0].voter_id, committee.data_owner.id);
        engine
            .cast_first(opened[0].votes[0].id, BallotInput::new(true, None))
            .await
            .unwrap();
        assert_eq!(
            engine.dataset_approval("D1").await.unwrap(),
            DatasetApproval::Approved
        );
    }
}
