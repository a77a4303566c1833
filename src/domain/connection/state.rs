//! Connection lifecycle states.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle of the live event channel.
///
/// Owned by the connection manager. `Failed` only exits through an explicit
/// `connect()` (to `Connecting`) or `disconnect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// True while a connection is live or being worked towards.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }
}

impl StateMachine for ConnectionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Reconnecting)
                | (Connecting, Failed)
                | (Connecting, Disconnected)
                | (Connected, Reconnecting)
                | (Connected, Failed)
                | (Connected, Disconnected)
                | (Reconnecting, Connecting)
                | (Reconnecting, Disconnected)
                | (Failed, Connecting)
                | (Failed, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Connected, Reconnecting, Failed, Disconnected],
            Connected => vec![Reconnecting, Failed, Disconnected],
            Reconnecting => vec![Connecting, Disconnected],
            Failed => vec![Connecting, Disconnected],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConnectionState; 5] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Reconnecting,
        ConnectionState::Failed,
    ];

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn reconnecting_only_moves_to_connecting_or_disconnected() {
        assert!(ConnectionState::Reconnecting
            .transition_to(ConnectionState::Connected)
            .is_err());
        assert_eq!(
            ConnectionState::Reconnecting.transition_to(ConnectionState::Connecting),
            Ok(ConnectionState::Connecting)
        );
    }

    #[test]
    fn failed_requires_explicit_connect() {
        let exits = ConnectionState::Failed.valid_transitions();
        assert_eq!(exits, vec![ConnectionState::Connecting, ConnectionState::Disconnected]);
        assert!(!ConnectionState::Failed.is_active());
    }

    #[test]
    fn every_state_can_reach_disconnected_except_itself() {
        for state in ALL {
            if state != ConnectionState::Disconnected {
                assert!(state.can_transition_to(&ConnectionState::Disconnected));
            }
        }
    }

    #[test]
    fn serializes_in_wire_case() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).unwrap();
        assert_eq!(json, "\"RECONNECTING\"");
        assert_eq!(ConnectionState::Failed.to_string(), "FAILED");
    }
}
