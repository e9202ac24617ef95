//! Connection lifecycle states.
//!
//! ```text
//! Idle -> Connecting -> Handshaking -> Status
//!                                   \-> Login -> Play
//! any -> Disconnected (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol phase of a connection. Determines which packet ids are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Handshaking,
    Status,
    Login,
    Play,
    Disconnected,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Disconnected
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// The handshake is accepted from `Idle` and `Connecting` as well as
    /// `Handshaking`, because sends made before the socket is up are queued
    /// and the handshake choice is recorded immediately.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, next) {
            (Disconnected, _) => false,
            (_, Disconnected) => true,
            (Idle, Connecting) => true,
            (Connecting, Handshaking) => true,
            (Idle | Connecting | Handshaking, Status | Login) => true,
            (Login, Play) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Status => "status",
            ConnectionState::Login => "login",
            ConnectionState::Play => "play",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// State requested by the handshake packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextState {
    Status,
    Login,
}

impl NextState {
    /// Wire value of the handshake's next-state field.
    pub fn id(self) -> i32 {
        match self {
            NextState::Status => 1,
            NextState::Login => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(NextState::Status),
            2 => Some(NextState::Login),
            _ => None,
        }
    }
}

impl From<NextState> for ConnectionState {
    fn from(next: NextState) -> Self {
        match next {
            NextState::Status => ConnectionState::Status,
            NextState::Login => ConnectionState::Login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Handshaking));
        assert!(Handshaking.can_transition_to(Login));
        assert!(Handshaking.can_transition_to(Status));
        assert!(Login.can_transition_to(Play));
    }

    #[test]
    fn test_disconnected_is_terminal() {
        for next in [Idle, Connecting, Handshaking, Status, Login, Play, Disconnected] {
            assert!(!Disconnected.can_transition_to(next));
        }
        for from in [Idle, Connecting, Handshaking, Status, Login, Play] {
            assert!(from.can_transition_to(Disconnected));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Play.can_transition_to(Login));
        assert!(!Status.can_transition_to(Play));
        assert!(!Idle.can_transition_to(Play));
        assert!(!Handshaking.can_transition_to(Connecting));
    }

    #[test]
    fn test_next_state_ids() {
        assert_eq!(NextState::Status.id(), 1);
        assert_eq!(NextState::Login.id(), 2);
        assert_eq!(NextState::from_id(3), None);
        assert_eq!(ConnectionState::from(NextState::Login), Login);
    }
}
