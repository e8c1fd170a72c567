//! Fan-Out Hub wire messages (JSON text frames)

use serde::{Deserialize, Serialize};

use super::GroupId;

/// Messages carried by the Fan-Out Hub
///
/// Server → clients: `{"type":"FILE_MOVED","fileName":"...","groupId":"..."}`
///
/// Client → server: `{"type":"SET_ACTIVE_GROUP","groupId":"..."|null}`
///
/// Transient: exists only on the wire, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HubEvent {
    /// A capture file was post-processed and relocated into a group
    #[serde(rename_all = "camelCase")]
    FileMoved {
        /// Name of the relocated file (identical to the source name)
        file_name: String,
        /// Group the file was attributed to at arrival
        group_id: GroupId,
    },

    /// Control message: overwrite the active group (`None` clears it)
    #[serde(rename_all = "camelCase")]
    SetActiveGroup {
        #[serde(default)]
        group_id: Option<GroupId>,
    },
}

impl HubEvent {
    /// Get event type as the wire tag
    pub fn event_type(&self) -> &'static str {
        match self {
            HubEvent::FileMoved { .. } => "FILE_MOVED",
            HubEvent::SetActiveGroup { .. } => "SET_ACTIVE_GROUP",
        }
    }

    /// Parse one inbound text frame
    pub fn from_frame(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Encode as one outbound text frame
    pub fn to_frame(&self) -> String {
        // Serializing a tagged enum of strings cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_moved_wire_format() {
        let event = HubEvent::FileMoved {
            file_name: "photo1.jpg".to_string(),
            group_id: GroupId::new("G1").unwrap(),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(
            value,
            json!({"type": "FILE_MOVED", "fileName": "photo1.jpg", "groupId": "G1"})
        );
    }

    #[test]
    fn test_set_active_group_parses_string_and_null() {
        let set = HubEvent::from_frame(r#"{"type":"SET_ACTIVE_GROUP","groupId":"G2"}"#).unwrap();
        assert_eq!(
            set,
            HubEvent::SetActiveGroup { group_id: Some(GroupId::new("G2").unwrap()) }
        );

        let clear = HubEvent::from_frame(r#"{"type":"SET_ACTIVE_GROUP","groupId":null}"#).unwrap();
        assert_eq!(clear, HubEvent::SetActiveGroup { group_id: None });

        let missing = HubEvent::from_frame(r#"{"type":"SET_ACTIVE_GROUP"}"#).unwrap();
        assert_eq!(missing, HubEvent::SetActiveGroup { group_id: None });
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(HubEvent::from_frame("not json").is_err());
        assert!(HubEvent::from_frame(r#"{"groupId":"G1"}"#).is_err());
        assert!(HubEvent::from_frame(r#"{"type":"REBOOT"}"#).is_err());
        assert!(HubEvent::from_frame(r#"{"type":"SET_ACTIVE_GROUP","groupId":"a/b"}"#).is_err());
    }

    #[test]
    fn test_event_type_matches_tag() {
        let event = HubEvent::SetActiveGroup { group_id: None };
        assert!(event.to_frame().contains(event.event_type()));
    }
}
