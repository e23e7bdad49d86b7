/// WebSocket message types for client-server communication
use serde::{Deserialize, Serialize};

use crate::directory::SourceInfo;
use crate::loader::LoadProgress;
use crate::query::Query;
use crate::view::{RecordDetail, ViewSnapshot};

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// List the sources that can be loaded
    ListSources,

    /// Load a source and show it
    SelectSource { source: String },

    /// Fetch the current source again
    Reload,

    /// Abandon the load in flight
    CancelLoad,

    SetQuery { query: Query },

    ClearQuery,

    /// Sort by a column, flipping direction on repeat
    SetSort { column: String },

    SetPage { page: usize },

    NextPage,

    PreviousPage,

    SetSelectedColumns { columns: Vec<String> },

    /// Every field of one record of the active view
    RecordDetail { index: usize },
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Sources {
        sources: Vec<SourceInfo>,
    },

    /// A chunk of the running load arrived
    Progress {
        source: String,
        progress: LoadProgress,
        percent: u32,
    },

    /// Current page and view state
    View {
        view: Box<ViewSnapshot>,
    },

    Detail {
        detail: RecordDetail,
    },

    /// Error occurred
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn progress(source: &str, progress: LoadProgress) -> Self {
        ServerMessage::Progress {
            source: source.to_string(),
            percent: progress.percent(),
            progress,
        }
    }

    pub fn view(snapshot: ViewSnapshot) -> Self {
        ServerMessage::View {
            view: Box::new(snapshot),
        }
    }

    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }

    /// Wire form of the message.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({"type": "Error", "message": e.to_string()}).to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::MatchMode;
    use crate::view::ViewCoordinator;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_client_messages() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "SelectSource", "source": "inmates"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SelectSource { ref source } if source == "inmates"));

        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "SetQuery",
            "query": {"kind": "advanced", "mode": "or", "criteria": [
                {"column": "Age", "operator": "greater", "value": "40"}
            ]}
        }))
        .unwrap();
        match msg {
            ClientMessage::SetQuery { query: Query::Advanced { criteria, mode } } => {
                assert_eq!(mode, MatchMode::Or);
                assert_eq!(criteria[0].column, "Age");
            }
            other => panic!("unexpected message {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "NextPage"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::NextPage));
    }

    #[test]
    fn test_unknown_message_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "DropTable"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "SetPage"}"#).is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let progress = LoadProgress {
            fetched: 1000,
            total: 2500,
            chunks_done: 1,
            chunk_count: 3,
        };
        let value: Value = serde_json::from_str(&ServerMessage::progress("inmates", progress).to_json()).unwrap();
        assert_eq!(value["type"], "Progress");
        assert_eq!(value["percent"], 33);
        assert_eq!(value["progress"]["fetched"], 1000);

        let value: Value =
            serde_json::from_str(&ServerMessage::view(ViewCoordinator::new().snapshot()).to_json()).unwrap();
        assert_eq!(value["type"], "View");
        assert_eq!(value["view"]["status"]["state"], "idle");
        assert_eq!(value["view"]["page_size"], 50);

        let value: Value = serde_json::from_str(&ServerMessage::error("Unknown column 'x'").to_json()).unwrap();
        assert_eq!(value, json!({"type": "Error", "message": "Unknown column 'x'"}));
    }
}
