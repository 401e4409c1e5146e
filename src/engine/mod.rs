//! The election and vote workflow engine.
//!
//! [`Engine`] is built once at launch and placed in Rocket's managed state. Each
//! public operation runs in a single store transaction; notifications raised
//! along the way are held back until that transaction commits.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::Result;
use crate::notify::{dispatch, Notification, Notifier};
use crate::store::{MemoryStore, Store, Transaction};

/// How many times an operation is run before a transaction conflict is reported.
pub(crate) const MAX_ATTEMPTS: usize = 3;

/// Run `$body` in a fresh session of `$engine` and commit it, running it again
/// from scratch while it fails with a transient conflict. `$body` must evaluate
/// to the operation's value and may use `?`.
macro_rules! transact {
    ($engine:expr, |$session:ident| $body:expr) => {{
        let engine = &$engine;
        let mut attempt = 1;
        loop {
            let result = async {
                #[allow(unused_mut)]
                let mut $session = engine.begin().await?;
                let value = $body;
                engine.finish($session).await?;
                Ok::<_, $crate::error::Error>(value)
            }
            .await;
            match result {
                Err(e) if e.is_transient() && attempt < $crate::engine::MAX_ATTEMPTS => {
                    warn!("Retrying after a transaction conflict (attempt {attempt}): {e}");
                    attempt += 1;
                }
                result => break result,
            }
        }
    }};
}

mod datasets;
mod delegation;
mod eligibility;
#[cfg(test)]
pub(crate) mod examples;
mod ledger;
mod lifecycle;
mod pending;
mod subjects;

pub use delegation::Succession;
pub use eligibility::Electorate;
pub use lifecycle::Opened;

/// The workflow engine service.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// An engine over a fresh, empty in-memory store.
    pub fn in_memory(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), notifier)
    }

    async fn begin(&self) -> Result<Session> {
        Ok(Session {
            txn: self.store.begin().await?,
            outbox: Vec::new(),
        })
    }

    /// Commit the session, then send its notifications.
    async fn finish(&self, session: Session) -> Result<()> {
        let Session { txn, outbox } = session;
        txn.commit().await?;
        dispatch(self.notifier.clone(), outbox);
        Ok(())
    }
}

/// A transaction plus the notifications to send if it commits.
pub(crate) struct Session {
    txn: Box<dyn Transaction>,
    outbox: Vec<Notification>,
}

impl Session {
    pub(crate) fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }
}

impl Deref for Session {
    type Target = dyn Transaction;

    fn deref(&self) -> &Self::Target {
        self.txn.as_ref()
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.txn.as_mut()
    }
}
