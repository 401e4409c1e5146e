use mongodb::{bson::oid::Error as OidError, error::Error as DbError};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::mongodb::{is_duplicate_key_error, is_transient_error, OPEN_ELECTION_INDEX};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Db(DbError),
    #[error(transparent)]
    OidParse(#[from] OidError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Open election already exists: {0}")]
    DuplicateOpenElection(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No such subject: {0}")]
    InvalidSubject(String),
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),
    #[error("Transaction conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(why: impl Into<String>) -> Self {
        Self::InvalidArgument(why.into())
    }

    pub fn illegal(why: impl Into<String>) -> Self {
        Self::IllegalTransition(why.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::OidParse(_) | Self::InvalidArgument(_) => Status::BadRequest,
            Self::NotFound(_) | Self::InvalidSubject(_) => Status::NotFound,
            Self::DuplicateOpenElection(_) | Self::Conflict(_) => Status::Conflict,
            Self::IllegalTransition(_) => Status::UnprocessableEntity,
            Self::Db(_) => Status::InternalServerError,
        }
    }

    /// Did a concurrent transaction get in the way? The operation can be run again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        if is_transient_error(&err) {
            return Self::Conflict(err.to_string());
        }
        if !is_duplicate_key_error(&err) {
            return Self::Db(err);
        }
        let message = err.to_string();
        if message.contains(OPEN_ELECTION_INDEX) {
            Self::DuplicateOpenElection(message)
        } else {
            Self::InvalidArgument(message)
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(Error::invalid("x").status(), Status::BadRequest);
        assert_eq!(Error::not_found("x").status(), Status::NotFound);
        assert_eq!(
            Error::DuplicateOpenElection("x".to_string()).status(),
            Status::Conflict
        );
        assert_eq!(Error::illegal("x").status(), Status::UnprocessableEntity);
        assert_eq!(Error::Conflict("x".to_string()).status(), Status::Conflict);
        assert!(Error::Conflict("x".to_string()).is_transient());
        assert!(!Error::DuplicateOpenElection("x".to_string()).is_transient());
        let parse = "zz".parse::<crate::model::mongodb::Id>().unwrap_err();
        assert_eq!(Error::from(parse).status(), Status::BadRequest);
    }
}
