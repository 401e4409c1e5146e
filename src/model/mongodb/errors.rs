//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};

pub const DUPLICATE_KEY: i32 = 11000;
pub const WRITE_CONFLICT: i32 = 112;

/// Return true if the given error is a duplicate key write error.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(ref failure) => failure
            .write_errors
            .iter()
            .flatten()
            .any(|e| e.code == DUPLICATE_KEY),
        _ => false,
    }
}

/// Return true if the whole transaction should be run again, e.g. because a
/// concurrent transaction wrote the same documents first.
pub fn is_transient_error(err: &DbError) -> bool {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        return true;
    }
    match *err.kind {
        ErrorKind::Command(ref e) => e.code == WRITE_CONFLICT,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == WRITE_CONFLICT,
        _ => false,
    }
}
