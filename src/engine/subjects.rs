//! Thin reads and writes for the committee and the subjects under review.

use super::{eligibility, Engine};
use crate::error::{Error, Result};
use crate::model::{
    common::member::Role,
    db::{
        member::{Member, NewMember},
        subject::{Consent, DataAccessRequest},
    },
    mongodb::Id,
};
use crate::store::MemberFilter;

impl Engine {
    /// Add a committee member. New chairs must be appointed with
    /// [`Engine::promote_chair`] so the outgoing chair is retired.
    pub async fn create_member(&self, member: NewMember) -> Result<Member> {
        if member.display_name.trim().is_empty() || member.email.trim().is_empty() {
            return Err(Error::invalid("Members need a name and an email"));
        }
        let member = transact!(self, |session| {
            if member.has_active_role(Role::Chairperson)
                && eligibility::current_chair(&mut *session).await?.is_some()
            {
                return Err(Error::invalid(
                    "There is already a chairperson, promote the new one instead",
                ));
            }
            session.insert_member(member.clone()).await?
        })?;
        info!("Added member {} ({})", member.id, member.email);
        Ok(member)
    }

    pub async fn member(&self, id: Id) -> Result<Member> {
        let mut session = self.begin().await?;
        session
            .member(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Member {id}")))
    }

    /// Active chairpersons and members.
    pub async fn voting_members(&self) -> Result<Vec<Member>> {
        let mut session = self.begin().await?;
        session
            .find_members(&MemberFilter::with_roles(&Role::VOTING))
            .await
    }

    pub async fn current_chair(&self) -> Result<Option<Member>> {
        let mut session = self.begin().await?;
        eligibility::current_chair(&mut *session).await
    }

    pub async fn data_owners(&self, dataset_id: &str) -> Result<Vec<Member>> {
        let mut session = self.begin().await?;
        session
            .find_members(&MemberFilter::data_owners(dataset_id))
            .await
    }

    pub async fn create_consent(&self, consent: Consent) -> Result<Consent> {
        if consent.id.trim().is_empty() {
            return Err(Error::invalid("Consents need an id"));
        }
        transact!(self, |session| session.insert_consent(consent.clone()).await?)?;
        Ok(consent)
    }

    pub async fn consent(&self, id: &str) -> Result<Consent> {
        let mut session = self.begin().await?;
        session
            .consent(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Consent {id}")))
    }

    pub async fn create_data_access_request(&self, dar: DataAccessRequest) -> Result<DataAccessRequest> {
        if dar.id.trim().is_empty() {
            return Err(Error::invalid("Data access requests need an id"));
        }
        transact!(self, |session| session.insert_data_access_request(dar.clone()).await?)?;
        Ok(dar)
    }

    pub async fn data_access_request(&self, id: &str) -> Result<DataAccessRequest> {
        let mut session = self.begin().await?;
        session
            .data_access_request(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Data access request {id}")))
    }
}
