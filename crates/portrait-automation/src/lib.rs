// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page-context automation for portrait.
//!
//! [`PageAutomator`] drives a [`Page`] through the profile-picture editor;
//! [`PageAgent`] connects it to the gateway's tab bridge.

pub mod agent;
pub mod automator;
pub mod dom;
pub mod page;
pub mod selectors;

pub use agent::PageAgent;
pub use automator::{ApplyOutcome, PageAutomator};
pub use dom::{Document, Element, NodeId};
pub use page::{FileBlob, Page, PollConfig, fetch_file};
pub use selectors::find_profile_picture_edit_button;
