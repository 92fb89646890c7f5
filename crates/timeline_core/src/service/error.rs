//! Error taxonomy surfaced by the grouping engine and controller.

use crate::model::validation::ValidationError;
use crate::model::RecordRef;
use crate::repo::timeline_repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TimelineResult<T> = Result<T, TimelineError>;

#[derive(Debug)]
pub enum TimelineError {
    /// Precondition failed; raised before any store write.
    Validation(ValidationError),
    /// Unknown activity or group.
    NotFound(RecordRef),
    /// Reserved for version-checked writes. Never raised today.
    Conflict(String),
    /// Store or network failure. No partial local state was applied.
    Transport(StoreError),
}

impl TimelineError {
    /// Stable short code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Transport(_) => "transport",
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl Display for TimelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(target) => write!(f, "{target} not found"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Transport(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for TimelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) => None,
        }
    }
}

impl From<ValidationError> for TimelineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for TimelineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(target) => Self::NotFound(target),
            StoreError::AlreadyGrouped {
                activity_id,
                group_id,
            } => Self::Validation(ValidationError::AlreadyGrouped {
                activity_id,
                group_id,
            }),
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Transport(other),
        }
    }
}
