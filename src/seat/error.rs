//! Request validation errors.

use super::ObjectId;

/// A request the seat refused to act on.
///
/// Stale requests (a dead source behind an offer, destroying an object
/// twice) are not errors; they are absorbed where they happen. These
/// variants cover requests that name objects the connection cannot use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("object {0} does not exist")]
    NoSuchObject(ObjectId),
    #[error("object {id} is not a {expected}")]
    WrongKind { id: ObjectId, expected: &'static str },
    #[error("object id {0} is already in use")]
    IdInUse(ObjectId),
    #[error("object id {0} is outside the client id range")]
    InvalidId(ObjectId),
    #[error("object {0} belongs to another connection")]
    ForeignObject(ObjectId),
}

impl RequestError {
    /// Machine-readable reason for the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            RequestError::NoSuchObject(_)
            | RequestError::WrongKind { .. }
            | RequestError::ForeignObject(_) => "invalid_object",
            RequestError::IdInUse(_) => "id_in_use",
            RequestError::InvalidId(_) => "invalid_id",
        }
    }
}
