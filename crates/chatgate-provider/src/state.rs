//! Caller-owned request state.
//!
//! The dispatcher is stateless. A chat surface that wants to prevent
//! overlapping requests from one session tracks them with a [`RequestSession`].

use crate::error::SessionError;
use crate::result::DispatchResult;

/// Lifecycle of the latest request from one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing has been sent yet.
    #[default]
    Idle,
    /// A request has been sent and has not finished.
    InFlight,
    /// The last request succeeded.
    Completed,
    /// The last request failed.
    Failed,
}

/// One chat session's in-flight guard.
///
/// # Examples
///
/// ```
/// use chatgate_provider::{DispatchResult, RequestSession, RequestState};
///
/// let mut session = RequestSession::new();
/// session.try_begin().unwrap();
/// assert!(session.try_begin().is_err());
/// session.finish(&DispatchResult::failure("Network error"));
/// assert_eq!(session.state(), RequestState::Failed);
/// session.try_begin().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestSession {
    state: RequestState,
}

impl RequestSession {
    /// A session with nothing sent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state == RequestState::InFlight
    }

    /// Mark a new request as sent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyInFlight`] if the previous request has
    /// not finished.
    pub fn try_begin(&mut self) -> Result<(), SessionError> {
        if self.is_in_flight() {
            return Err(SessionError::AlreadyInFlight);
        }
        self.state = RequestState::InFlight;
        Ok(())
    }

    /// Record the outcome of the outstanding request.
    pub fn finish(&mut self, result: &DispatchResult) {
        self.state = if result.is_success() {
            RequestState::Completed
        } else {
            RequestState::Failed
        };
    }
}
