// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scheduler-context message surface, as seen by transports.

use async_trait::async_trait;

use crate::command::{ControlCommand, ControlReply};

/// Answers control commands. Failures are reported inside the reply.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    async fn handle(&self, command: ControlCommand) -> ControlReply;
}
