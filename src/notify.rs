//! The mail collaborator. Notifications are fire-and-forget: they are sent
//! after the triggering transaction commits, and a failure is only logged.

use std::sync::Arc;

use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::model::{api::id::ApiId, common::election::ElectionType, mongodb::Id};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Notification endpoint rejected the message with status {0}")]
    Rejected(StatusCode),
}

/// Something that tells people about workflow events.
#[rocket::async_trait]
pub trait Notifier: Send + Sync {
    /// A new round opened and `voter_ids` have ballots to cast.
    async fn notify_new_round(
        &self,
        voter_ids: &[Id],
        subject_id: &str,
        election_type: ElectionType,
    ) -> Result<(), NotifyError>;

    /// Every member ballot on the election has been cast.
    async fn notify_collect_ready(&self, election_id: Id) -> Result<(), NotifyError>;

    /// The voter holding this ballot should be nudged.
    async fn notify_reminder(&self, vote_id: Id) -> Result<(), NotifyError>;

    /// The chair's binding outcome has been recorded.
    async fn notify_final_decision(&self, election_id: Id, approved: bool)
        -> Result<(), NotifyError>;

    /// Every data owner review of an access request has closed.
    async fn notify_dataset_reviews_closed(
        &self,
        subject_id: &str,
        access_election_id: Option<Id>,
    ) -> Result<(), NotifyError>;
}

/// A notification waiting for its transaction to commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    NewRound {
        voter_ids: Vec<ApiId>,
        subject_id: String,
        election_type: ElectionType,
    },
    #[serde(rename_all = "camelCase")]
    CollectReady { election_id: ApiId },
    #[serde(rename_all = "camelCase")]
    Reminder { vote_id: ApiId },
    #[serde(rename_all = "camelCase")]
    FinalDecision { election_id: ApiId, approved: bool },
    #[serde(rename_all = "camelCase")]
    DatasetReviewsClosed {
        subject_id: String,
        access_election_id: Option<ApiId>,
    },
}

impl Notification {
    pub fn new_round(voter_ids: &[Id], subject_id: &str, election_type: ElectionType) -> Self {
        Self::NewRound {
            voter_ids: voter_ids.iter().copied().map(ApiId::from).collect(),
            subject_id: subject_id.to_string(),
            election_type,
        }
    }

    pub fn collect_ready(election_id: Id) -> Self {
        Self::CollectReady {
            election_id: election_id.into(),
        }
    }

    pub fn reminder(vote_id: Id) -> Self {
        Self::Reminder {
            vote_id: vote_id.into(),
        }
    }

    pub fn final_decision(election_id: Id, approved: bool) -> Self {
        Self::FinalDecision {
            election_id: election_id.into(),
            approved,
        }
    }

    pub fn dataset_reviews_closed(subject_id: &str, access_election_id: Option<Id>) -> Self {
        Self::DatasetReviewsClosed {
            subject_id: subject_id.to_string(),
            access_election_id: access_election_id.map(ApiId::from),
        }
    }

    /// Hand this notification to `notifier`.
    async fn send(&self, notifier: &dyn Notifier) -> Result<(), NotifyError> {
        match self {
            Self::NewRound {
                voter_ids,
                subject_id,
                election_type,
            } => {
                let ids = voter_ids.iter().map(|id| **id).collect::<Vec<Id>>();
                notifier
                    .notify_new_round(&ids, subject_id, *election_type)
                    .await
            }
            Self::CollectReady { election_id } => notifier.notify_collect_ready(**election_id).await,
            Self::Reminder { vote_id } => notifier.notify_reminder(**vote_id).await,
            Self::FinalDecision {
                election_id,
                approved,
            } => {
                notifier
                    .notify_final_decision(**election_id, *approved)
                    .await
            }
            Self::DatasetReviewsClosed {
                subject_id,
                access_election_id,
            } => {
                notifier
                    .notify_dataset_reviews_closed(subject_id, access_election_id.map(|id| *id))
                    .await
            }
        }
    }
}

/// Send `notifications` in the background, logging and swallowing failures.
pub fn dispatch(notifier: Arc<dyn Notifier>, notifications: Vec<Notification>) {
    if notifications.is_empty() {
        return;
    }
    rocket::tokio::spawn(async move {
        for notification in notifications {
            if let Err(e) = notification.send(notifier.as_ref()).await {
                warn!("Failed to send notification {notification:?}: {e}");
            }
        }
    });
}

/// Posts each event as JSON to the mail service.
pub struct WebhookNotifier {
    client: HttpClient,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: HttpClient::new(),
            url,
        }
    }

    async fn post(&self, notification: Notification) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(&notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status));
        }
        debug!("Delivered {notification:?}");
        Ok(())
    }
}

#[rocket::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_new_round(
        &self,
        voter_ids: &[Id],
        subject_id: &str,
        election_type: ElectionType,
    ) -> Result<(), NotifyError> {
        self.post(Notification::new_round(voter_ids, subject_id, election_type))
            .await
    }

    async fn notify_collect_ready(&self, election_id: Id) -> Result<(), NotifyError> {
        self.post(Notification::collect_ready(election_id)).await
    }

    async fn notify_reminder(&self, vote_id: Id) -> Result<(), NotifyError> {
        self.post(Notification::reminder(vote_id)).await
    }

    async fn notify_final_decision(
        &self,
        election_id: Id,
        approved: bool,
    ) -> Result<(), NotifyError> {
        self.post(Notification::final_decision(election_id, approved))
            .await
    }

    async fn notify_dataset_reviews_closed(
        &self,
        subject_id: &str,
        access_election_id: Option<Id>,
    ) -> Result<(), NotifyError> {
        self.post(Notification::dataset_reviews_closed(subject_id, access_election_id))
            .await
    }
}

/// Used when no mail service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[rocket::async_trait]
impl Notifier for LogNotifier {
    async fn notify_new_round(
        &self,
        voter_ids: &[Id],
        subject_id: &str,
        election_type: ElectionType,
    ) -> Result<(), NotifyError> {
        info!(
            "New {election_type:?} round for {subject_id}, {} voter(s) notified",
            voter_ids.len()
        );
        Ok(())
    }

    async fn notify_collect_ready(&self, election_id: Id) -> Result<(), NotifyError> {
        info!("Election {election_id} is ready to collect");
        Ok(())
    }

    async fn notify_reminder(&self, vote_id: Id) -> Result<(), NotifyError> {
        info!("Reminder sent for vote {vote_id}");
        Ok(())
    }

    async fn notify_final_decision(
        &self,
        election_id: Id,
        approved: bool,
    ) -> Result<(), NotifyError> {
        info!("Election {election_id} decided, approved: {approved}");
        Ok(())
    }

    async fn notify_dataset_reviews_closed(
        &self,
        subject_id: &str,
        _access_election_id: Option<Id>,
    ) -> Result<(), NotifyError> {
        info!("Every dataset review of {subject_id} has closed");
        Ok(())
    }
}

/// Records every notification so tests can inspect them.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<std::sync::Mutex<Vec<Notification>>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait for background dispatch to deliver at least `count` notifications.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            rocket::tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.sent()
    }

    fn record(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

#[cfg(test)]
#[rocket::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_new_round(
        &self,
        voter_ids: &[Id],
        subject_id: &str,
        election_type: ElectionType,
    ) -> Result<(), NotifyError> {
        self.record(Notification::new_round(voter_ids, subject_id, election_type))
    }

    async fn notify_collect_ready(&self, election_id: Id) -> Result<(), NotifyError> {
        self.record(Notification::collect_ready(election_id))
    }

    async fn notify_reminder(&self, vote_id: Id) -> Result<(), NotifyError> {
        self.record(Notification::reminder(vote_id))
    }

    async fn notify_final_decision(
        &self,
        election_id: Id,
        approved: bool,
    ) -> Result<(), NotifyError> {
        self.record(Notification::final_decision(election_id, approved))
    }

    async fn notify_dataset_reviews_closed(
        &self,
        subject_id: &str,
        access_election_id: Option<Id>,
    ) -> Result<(), NotifyError> {
        self.record(Notification::dataset_reviews_closed(subject_id, access_election_id))
    }
}
