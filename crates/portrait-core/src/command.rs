// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message types exchanged between the scheduler context and the page context.
//!
//! Every message is a closed tagged enum; handlers match on it exhaustively,
//! so adding a command is a compile-checked change.
//!
//! Control surface (JSON, tag `action`):
//! ```json
//! {"action": "generateFromBase", "numImages": 5}
//! {"action": "updateSettings", "settings": {"enabled": true, ...}}
//! ```
//!
//! Tab bridge (JSON, tag `type`):
//! ```json
//! {"type": "hello", "url": "https://www.linkedin.com/in/me/"}
//! {"type": "command", "requestId": "...", "command": {"action": "updateProfilePicture", ...}}
//! {"type": "ack", "requestId": "...", "success": true}
//! ```

use serde::{Deserialize, Serialize};

use crate::types::Settings;

/// Commands accepted by the scheduler-context control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlCommand {
    /// Apply a specific image to the target page right now.
    UpdateProfilePicture { image_path: String, image_name: String },
    /// Generate variations from a data-URL encoded base photo.
    GenerateImages { base_photo: String, num_images: u32 },
    /// Generate variations from the base photo in the configured folder.
    GenerateFromBase { num_images: u32 },
    /// Read the persisted settings.
    GetSettings {},
    /// Replace the persisted settings and re-arm the scheduler.
    UpdateSettings { settings: Settings },
    /// Run one rotation tick immediately.
    ForceUpdate {},
}

impl ControlCommand {
    /// Wire name of the command, used for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::UpdateProfilePicture { .. } => "updateProfilePicture",
            Self::GenerateImages { .. } => "generateImages",
            Self::GenerateFromBase { .. } => "generateFromBase",
            Self::GetSettings {} => "getSettings",
            Self::UpdateSettings { .. } => "updateSettings",
            Self::ForceUpdate {} => "forceUpdate",
        }
    }
}

/// Replies produced by the control surface.
///
/// Variant order matters for untagged deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlReply {
    Settings { settings: Settings },
    Generated { success: bool, count: usize },
    Failed { success: bool, error: String },
    Ack { success: bool },
}

impl ControlReply {
    pub fn ok() -> Self {
        Self::Ack { success: true }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            success: false,
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Settings { .. } => true,
            Self::Generated { success, .. }
            | Self::Failed { success, .. }
            | Self::Ack { success } => *success,
        }
    }
}

/// Commands delivered to a page automator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PageCommand {
    /// Upload the referenced image as the new profile picture.
    UpdateProfilePicture { image_path: String, image_name: String },
}

/// Acknowledgement sent back by a page automator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageAck {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Frames sent from a page context to the tab bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PageFrame {
    /// First frame after connecting; reports the current document URL.
    Hello { url: String },
    /// Navigation finished loading.
    Loaded { url: String },
    /// Answer to a previously received command.
    Ack {
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Frames sent from the tab bridge to a page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeFrame {
    /// Execute a command and answer with an `ack` frame carrying `request_id`.
    Command {
        request_id: String,
        command: PageCommand,
    },
    /// Navigate the tab to `url`; the page answers with `loaded`.
    Navigate { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_command_uses_action_tag() {
        let json = r#"{"action": "generateFromBase", "numImages": 5}"#;
        let cmd: ControlCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, ControlCommand::GenerateFromBase { num_images: 5 });
        assert_eq!(cmd.action(), "generateFromBase");

        let json = r#"{"action": "forceUpdate"}"#;
        let cmd: ControlCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, ControlCommand::ForceUpdate {});
    }

    #[test]
    fn unknown_action_is_rejected() {
        let json = r#"{"action": "launchRockets"}"#;
        assert!(serde_json::from_str::<ControlCommand>(json).is_err());
    }

    #[test]
    fn control_reply_shapes() {
        let json = serde_json::to_value(ControlReply::Generated {
            success: true,
            count: 3,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "count": 3}));

        let failed = ControlReply::failed("boom");
        assert!(!failed.is_success());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));

        let parsed: ControlReply = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, failed);
    }

    #[test]
    fn bridge_frames_use_camel_case_fields() {
        let frame = BridgeFrame::Command {
            request_id: "r1".into(),
            command: PageCommand::UpdateProfilePicture {
                image_path: "http://127.0.0.1:3000/images/a.png".into(),
                image_name: "a.png".into(),
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "command");
        assert_eq!(json["requestId"], "r1");
        assert_eq!(json["command"]["action"], "updateProfilePicture");
        assert_eq!(json["command"]["imageName"], "a.png");

        let ack: PageFrame =
            serde_json::from_str(r#"{"type":"ack","requestId":"r1","success":false,"error":"x"}"#)
                .unwrap();
        assert_eq!(
            ack,
            PageFrame::Ack {
                request_id: "r1".into(),
                success: false,
                error: Some("x".into())
            }
        );
    }
}
