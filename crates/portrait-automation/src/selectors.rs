// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Element lookup heuristics for the profile page.
//!
//! Each lookup is a pure function of a [`Document`] snapshot. The edit
//! control is found by trying [`EDIT_BUTTON_STRATEGIES`] in order; the first
//! visible match wins.

use portrait_core::PortraitError;
use tracing::debug;

use crate::dom::{AttrMatch, Document, NodeId, Selector};

/// Button texts that open the photo editor (compared normalized).
pub const EDIT_TEXTS: &[&str] = &[
    "edit photo",
    "change photo",
    "edit picture",
    "change picture",
];

/// Words identifying a control that commits or dismisses the editor.
pub const SAVE_WORDS: &[&str] = &["save", "apply", "done", "close"];

/// Attribute/ARIA selectors for the edit control, most specific first.
pub const EDIT_BUTTON_SELECTORS: &[Selector] = &[
    Selector::any().with_attr("data-control-name", AttrMatch::Equals("edit_profile_photo")),
    Selector::tag("button").with_attr("aria-label", AttrMatch::Contains("edit photo")),
    Selector::tag("button").with_attr("aria-label", AttrMatch::Contains("change photo")),
    Selector::tag("button").with_attr("aria-label", AttrMatch::Contains("profile photo")),
    Selector::tag("button").with_attr("aria-label", AttrMatch::Contains("profile picture")),
    Selector::any().with_attr("class", AttrMatch::Token("profile-photo-edit__edit-btn")),
];

/// Images recognized as the member's current profile photo.
pub const PROFILE_PHOTO_SELECTORS: &[Selector] = &[
    Selector::tag("img").with_attr("class", AttrMatch::Contains("profile-picture")),
    Selector::tag("img").with_attr("class", AttrMatch::Contains("profile-photo")),
    Selector::tag("img").with_attr("alt", AttrMatch::Contains("profile photo")),
    Selector::tag("img").with_attr("alt", AttrMatch::Contains("profile picture")),
];

/// How many ancestor levels the proximity search climbs from the photo.
pub const PROXIMITY_DEPTH: usize = 4;

pub const FILE_INPUT_SELECTOR: Selector =
    Selector::tag("input").with_attr("type", AttrMatch::Equals("file"));

/// Visible while an upload is still being processed.
pub const UPLOAD_INDICATOR_SELECTORS: &[Selector] = &[
    Selector::any().with_attr("role", AttrMatch::Equals("progressbar")),
    Selector::any().with_attr("aria-busy", AttrMatch::Equals("true")),
    Selector::any().with_attr("class", AttrMatch::Contains("loader")),
    Selector::any().with_attr("class", AttrMatch::Contains("upload-progress")),
];

/// Attribute selectors for save-like controls, tried before class and text.
pub const SAVE_ATTR_SELECTORS: &[Selector] = &[
    Selector::any().with_attr("data-control-name", AttrMatch::Contains("save")),
    Selector::tag("button").with_attr("aria-label", AttrMatch::Contains("save")),
    Selector::tag("button").with_attr("aria-label", AttrMatch::Contains("apply")),
    Selector::tag("button").with_attr("type", AttrMatch::Equals("submit")),
];

/// Lowercases and collapses runs of whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `button`, `[role=button]` and `a` elements.
pub fn is_button_like(doc: &Document, id: NodeId) -> bool {
    matches!(doc.tag(id), "button" | "a") || doc.attr(id, "role") == Some("button")
}

/// Visible text, falling back to the ARIA label.
fn label_of(doc: &Document, id: NodeId) -> String {
    let text = normalize(&doc.text_content(id));
    if text.is_empty() {
        doc.attr(id, "aria-label").map(normalize).unwrap_or_default()
    } else {
        text
    }
}

fn has_edit_text(doc: &Document, id: NodeId) -> bool {
    let label = label_of(doc, id);
    EDIT_TEXTS.iter().any(|t| label.contains(t))
}

fn is_visible_edit_button(doc: &Document, id: NodeId) -> bool {
    is_button_like(doc, id) && doc.is_visible(id) && has_edit_text(doc, id)
}

/// One way of locating the edit control.
pub type Strategy = fn(&Document) -> Option<NodeId>;

/// Fixed attribute/ARIA selector list.
pub fn by_attribute_selectors(doc: &Document) -> Option<NodeId> {
    EDIT_BUTTON_SELECTORS
        .iter()
        .find_map(|selector| doc.select_visible(selector))
}

/// Buttons near a recognized profile photo whose text names the edit action.
pub fn by_photo_proximity(doc: &Document) -> Option<NodeId> {
    let photos = PROFILE_PHOTO_SELECTORS
        .iter()
        .flat_map(|selector| doc.select_all(selector));
    for photo in photos {
        let mut scope = doc.parent(photo);
        for _ in 0..PROXIMITY_DEPTH {
            let Some(container) = scope else { break };
            if let Some(found) = doc
                .descendants(container)
                .find(|id| is_visible_edit_button(doc, *id))
            {
                return Some(found);
            }
            scope = doc.parent(container);
        }
    }
    None
}

/// Every button-like element on the page, by text.
pub fn by_text_scan(doc: &Document) -> Option<NodeId> {
    doc.ids().find(|id| is_visible_edit_button(doc, *id))
}

pub const EDIT_BUTTON_STRATEGIES: [(&str, Strategy); 3] = [
    ("attribute selectors", by_attribute_selectors),
    ("photo proximity", by_photo_proximity),
    ("text scan", by_text_scan),
];

/// Locates the control that opens the profile-photo editor.
pub fn find_profile_picture_edit_button(doc: &Document) -> Result<NodeId, PortraitError> {
    for (name, strategy) in EDIT_BUTTON_STRATEGIES {
        if let Some(id) = strategy(doc) {
            debug!(strategy = name, node = id.0, "edit control located");
            return Ok(id);
        }
    }
    Err(PortraitError::ElementNotFound(
        "profile picture edit control".into(),
    ))
}

pub fn find_file_input(doc: &Document) -> Option<NodeId> {
    doc.select_visible(&FILE_INPUT_SELECTOR)
}

pub fn upload_in_progress(doc: &Document) -> bool {
    UPLOAD_INDICATOR_SELECTORS
        .iter()
        .any(|selector| doc.select_visible(selector).is_some())
}

/// Which rule located a save control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMatch {
    Attribute,
    Class,
    Text,
}

/// Finds a save/apply/done/close control: attribute, then class, then text.
pub fn find_save_control(doc: &Document) -> Option<(SaveMatch, NodeId)> {
    if let Some(id) = SAVE_ATTR_SELECTORS
        .iter()
        .find_map(|selector| doc.select_visible(selector))
    {
        return Some((SaveMatch::Attribute, id));
    }

    let visible_buttons = || {
        doc.ids()
            .filter(|id| is_button_like(doc, *id) && doc.is_visible(*id))
    };

    let by_class = visible_buttons().find(|id| {
        doc.attr(*id, "class").is_some_and(|class| {
            let class = class.to_ascii_lowercase();
            SAVE_WORDS.iter().any(|w| class.contains(w))
        })
    });
    if let Some(id) = by_class {
        return Some((SaveMatch::Class, id));
    }

    visible_buttons()
        .find(|id| {
            let label = label_of(doc, *id);
            SAVE_WORDS
                .iter()
                .any(|w| label == *w || label.starts_with(&format!("{w} ")))
        })
        .map(|id| (SaveMatch::Text, id))
}
