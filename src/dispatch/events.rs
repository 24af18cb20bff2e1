use serde::{Deserialize, Serialize};

use crate::coordinator::{AccountName, Role};

/// A chat command already parsed by the transport bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    Join {
        role: Role,
    },
    /// Left the channel or asked to be removed
    Leave,
    /// Disconnected from the network; leaves every lobby
    Quit,
    Ready,
    Vote {
        map: String,
    },
    Status,
    Maps,
    Servers,
    CloseVote,
    Ban {
        account: AccountName,
        days: u32,
        #[serde(default)]
        reason: Option<String>,
    },
    Unban {
        account: AccountName,
    },
    Unlock {
        server_id: u32,
    },
    Reset,
}

impl ChannelEvent {
    /// Events that unauthenticated users may send
    pub fn is_public(&self) -> bool {
        matches!(self, ChannelEvent::Status | ChannelEvent::Maps)
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            ChannelEvent::CloseVote
                | ChannelEvent::Ban { .. }
                | ChannelEvent::Unban { .. }
                | ChannelEvent::Unlock { .. }
                | ChannelEvent::Reset
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::Join { .. } => "join",
            ChannelEvent::Leave => "leave",
            ChannelEvent::Quit => "quit",
            ChannelEvent::Ready => "ready",
            ChannelEvent::Vote { .. } => "vote",
            ChannelEvent::Status => "status",
            ChannelEvent::Maps => "maps",
            ChannelEvent::Servers => "servers",
            ChannelEvent::CloseVote => "close_vote",
            ChannelEvent::Ban { .. } => "ban",
            ChannelEvent::Unban { .. } => "unban",
            ChannelEvent::Unlock { .. } => "unlock",
            ChannelEvent::Reset => "reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"type":"join","role":"medic"}"#, ChannelEvent::Join { role: Role::from("medic") })]
    #[case(r#"{"type":"leave"}"#, ChannelEvent::Leave)]
    #[case(r#"{"type":"vote","map":"badlands"}"#, ChannelEvent::Vote { map: "badlands".to_string() })]
    #[case(r#"{"type":"close_vote"}"#, ChannelEvent::CloseVote)]
    #[case(
        r#"{"type":"ban","account":"griefer","days":3}"#,
        ChannelEvent::Ban { account: AccountName::from("griefer"), days: 3, reason: None }
    )]
    #[case(r#"{"type":"unlock","server_id":2}"#, ChannelEvent::Unlock { server_id: 2 })]
    fn test_parse_event(#[case] json: &str, #[case] expected: ChannelEvent) {
        let event: ChannelEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, expected);
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        assert!(serde_json::from_str::<ChannelEvent>(r#"{"type":"mumble"}"#).is_err());
    }

    #[test]
    fn test_permission_classes() {
        assert!(ChannelEvent::Status.is_public());
        assert!(!ChannelEvent::Ready.is_public());
        assert!(ChannelEvent::Reset.is_admin());
        assert!(!ChannelEvent::Quit.is_admin());
    }
}
