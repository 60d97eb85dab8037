//! Page initialization state machine

use openapi_client::models::Repository;
use serde::Deserialize;

use crate::errors::WatchError;

/// Everything the page can be showing. Rendering reads this value only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Waiting for the signed-in identity
    Initializing,

    /// Fetching the GitHub connection status
    CheckingConnection,

    /// GitHub is not connected; waiting for the user to connect it
    NotConnected,

    /// Connected; fetching importable repositories
    LoadingRepos,

    /// Repositories loaded
    Ready(Vec<Repository>),

    /// A step failed; the user may retry
    Error(String),
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Identity became available (or changed)
    IdentityReady,

    /// User asked to try again
    Retry,

    /// External auth flow reported success
    ExternalConnected,

    /// External auth flow reported failure
    ExternalConnectionFailed,

    /// Connection status fetched
    ConnectionChecked { connected: bool },

    /// Repository list fetched
    ReposLoaded(Vec<Repository>),

    /// A fetch failed because the credential is no longer valid
    AuthExpired,

    /// A fetch failed for any other reason
    Failed(String),
}

/// Work the driver has to perform after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    FetchConnection,
    FetchRepos,
    SignOut,
}

/// Message posted by the external auth popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthMessage {
    Connected,
    ConnectionFailed,
}

impl AuthMessage {
    pub fn event(self) -> PageEvent {
        match self {
            AuthMessage::Connected => PageEvent::ExternalConnected,
            AuthMessage::ConnectionFailed => PageEvent::ExternalConnectionFailed,
        }
    }
}

impl PageState {
    /// Apply `event`, returning the next state and the effect to run
    pub fn next(&self, event: PageEvent) -> Result<(PageState, Option<Effect>), WatchError> {
        let transition = match (self, event) {
            (PageState::Initializing, PageEvent::IdentityReady) => {
                (PageState::CheckingConnection, Some(Effect::FetchConnection))
            }

            // Re-entry always restarts at the connection check
            (
                _,
                PageEvent::IdentityReady | PageEvent::Retry | PageEvent::ExternalConnected,
            ) if *self != PageState::Initializing => {
                (PageState::CheckingConnection, Some(Effect::FetchConnection))
            }

            (PageState::CheckingConnection, PageEvent::ConnectionChecked { connected: false }) => {
                (PageState::NotConnected, None)
            }
            (PageState::CheckingConnection, PageEvent::ConnectionChecked { connected: true }) => {
                (PageState::LoadingRepos, Some(Effect::FetchRepos))
            }

            (PageState::LoadingRepos, PageEvent::ReposLoaded(repos)) => {
                (PageState::Ready(repos), None)
            }

            // An expired credential signs out instead of showing an error
            (
                state @ (PageState::CheckingConnection | PageState::LoadingRepos),
                PageEvent::AuthExpired,
            ) => (state.clone(), Some(Effect::SignOut)),

            (
                PageState::CheckingConnection | PageState::LoadingRepos,
                PageEvent::Failed(message),
            ) => (PageState::Error(message), None),

            (PageState::NotConnected, PageEvent::ExternalConnectionFailed) => (
                PageState::Error("GitHub connection failed".to_string()),
                None,
            ),

            (state, event) => {
                return Err(WatchError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        Ok(transition)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PageState::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let (state, effect) = PageState::Initializing.next(PageEvent::IdentityReady).unwrap();
        assert_eq!(state, PageState::CheckingConnection);
        assert_eq!(effect, Some(Effect::FetchConnection));

        let (state, effect) = state
            .next(PageEvent::ConnectionChecked { connected: true })
            .unwrap();
        assert_eq!(state, PageState::LoadingRepos);
        assert_eq!(effect, Some(Effect::FetchRepos));

        let (state, effect) = state.next(PageEvent::ReposLoaded(vec![])).unwrap();
        assert_eq!(state, PageState::Ready(vec![]));
        assert_eq!(effect, None);
    }

    #[test]
    fn test_auth_message_payloads() {
        let msg: AuthMessage = serde_json::from_str(r#"{"type": "connected"}"#).unwrap();
        assert_eq!(msg, AuthMessage::Connected);
        let msg: AuthMessage = serde_json::from_str(r#"{"type": "connection-failed"}"#).unwrap();
        assert_eq!(msg.event(), PageEvent::ExternalConnectionFailed);
        assert!(serde_json::from_str::<AuthMessage>(r#"{"type": "other"}"#).is_err());
    }
}
