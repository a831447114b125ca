// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt table cycled through by the remote strategy.

/// Prompts sent to the generation provider, one per item, cycling by index.
pub const PROMPTS: &[&str] = &[
    "Professional headshot with soft studio lighting and a neutral grey backdrop",
    "Professional headshot in warm golden-hour light with a blurred city background",
    "Professional headshot with cool blue tones and a clean modern office background",
    "Professional headshot in natural daylight with a softly blurred green park behind",
    "Professional headshot with dramatic side lighting and a dark charcoal backdrop",
    "Professional headshot with bright high-key lighting and a white background",
    "Professional headshot with a subtle teal-to-navy gradient background",
    "Professional headshot in a library setting with shelves softly out of focus",
    "Professional headshot with warm amber tones and a minimal beige wall",
    "Professional headshot with crisp contrast and a muted pastel gradient",
];

/// Prompt for item `index`.
pub fn prompt_for(index: u32) -> &'static str {
    PROMPTS[index as usize % PROMPTS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_cycle_by_index() {
        assert_eq!(prompt_for(0), PROMPTS[0]);
        assert_eq!(prompt_for(PROMPTS.len() as u32), PROMPTS[0]);
        assert_eq!(prompt_for(PROMPTS.len() as u32 + 3), PROMPTS[3]);
    }
}
