// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory profile page for driving `PageAutomator` without a browser.
//!
//! The page renders a fresh [`Document`] on every snapshot from its state:
//! a top card with the current photo and an "Edit photo" control, and once
//! the editor is open a dialog with a file input, an upload spinner that
//! stays visible for a configurable number of snapshots, and a save button.
//! Image fetches go over real HTTP.

use std::sync::Mutex;

use async_trait::async_trait;
use portrait_automation::{Document, Element, FileBlob, NodeId, Page, fetch_file};
use portrait_core::PortraitError;

const EDIT_ID: &str = "edit-photo";
const SAVE_ID: &str = "save-photo";

#[derive(Default)]
struct PageState {
    url: String,
    editor_open: bool,
    staged: Option<FileBlob>,
    upload_polls: u32,
    busy_left: u32,
    photo: Option<FileBlob>,
    events: Vec<String>,
}

pub struct SimulatedPage {
    client: reqwest::Client,
    state: Mutex<PageState>,
}

impl SimulatedPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            state: Mutex::new(PageState {
                url: url.into(),
                ..PageState::default()
            }),
        }
    }

    /// Keeps the upload spinner visible for `polls` snapshots after a file
    /// is staged.
    pub fn with_upload_polls(self, polls: u32) -> Self {
        self.lock().upload_polls = polls;
        self
    }

    /// The photo committed by the last save, if any.
    pub fn profile_photo(&self) -> Option<FileBlob> {
        self.lock().photo.clone()
    }

    /// Events dispatched on the file input, in order.
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn render(state: &mut PageState) -> Document {
    let photo_alt = match &state.photo {
        Some(photo) => format!("Profile photo ({})", photo.name),
        None => "Profile photo".to_string(),
    };
    let top_card = Element::new("section")
        .attr("class", "top-card")
        .child(
            Element::new("div").child(
                Element::new("img")
                    .attr("class", "top-card__profile-picture")
                    .attr("alt", photo_alt),
            ),
        )
        .child(
            Element::new("div")
                .attr("role", "button")
                .attr("id", EDIT_ID)
                .child(Element::new("span").text("Edit photo")),
        );

    let mut body = Element::new("body")
        .child(Element::new("nav").child(Element::new("a").text("Home")))
        .child(Element::new("main").child(top_card));

    if state.editor_open {
        let mut dialog = Element::new("div")
            .attr("role", "dialog")
            .child(Element::new("input").attr("type", "file").attr("accept", "image/*"));
        if state.staged.is_some() && state.busy_left > 0 {
            state.busy_left -= 1;
            dialog = dialog.child(Element::new("div").attr("role", "progressbar"));
        }
        dialog = dialog.child(
            Element::new("button")
                .attr("id", SAVE_ID)
                .attr("aria-label", "Save photo")
                .text("Save"),
        );
        body = body.child(dialog);
    }
    Document::new(Element::new("html").child(body))
}

#[async_trait]
impl Page for SimulatedPage {
    fn url(&self) -> String {
        self.lock().url.clone()
    }

    async fn snapshot(&self) -> Document {
        render(&mut self.lock())
    }

    async fn click(&self, node: NodeId) -> Result<(), PortraitError> {
        let mut state = self.lock();
        // Resolve the node against the document the caller saw.
        let busy_left = state.busy_left;
        let doc = render(&mut state);
        state.busy_left = busy_left;

        let target = doc
            .ids()
            .filter(|id| *id == node || doc.descendants(*id).any(|d| d == node))
            .filter_map(|id| doc.attr(id, "id"))
            .last()
            .map(str::to_string);
        match target.as_deref() {
            Some(EDIT_ID) => state.editor_open = true,
            Some(SAVE_ID) => {
                state.photo = state.staged.take();
                state.editor_open = false;
            }
            _ => {
                return Err(PortraitError::ElementNotFound(format!(
                    "node {} is not clickable",
                    node.0
                )));
            }
        }
        Ok(())
    }

    async fn set_input_files(&self, _node: NodeId, file: FileBlob) -> Result<(), PortraitError> {
        let mut state = self.lock();
        if !state.editor_open {
            return Err(PortraitError::ElementNotFound("file input".into()));
        }
        state.busy_left = state.upload_polls;
        state.staged = Some(file);
        Ok(())
    }

    async fn dispatch_event(&self, _node: NodeId, event: &str) -> Result<(), PortraitError> {
        self.lock().events.push(event.to_string());
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<FileBlob, PortraitError> {
        fetch_file(&self.client, url).await
    }

    async fn navigate(&self, url: &str) -> Result<(), PortraitError> {
        let mut state = self.lock();
        state.url = url.to_string();
        state.editor_open = false;
        Ok(())
    }
}
