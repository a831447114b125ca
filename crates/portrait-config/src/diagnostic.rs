// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration errors as miette diagnostics.
//!
//! Figment reports a bad key as a table path plus a field name. Here that
//! becomes a dotted key (`scheduler.advance_policy`), a label on the line of
//! `portrait.toml` it came from, and a hint. Misspelt keys and enum values get
//! a Jaro-Winkler suggestion; a known key placed under the wrong table is
//! pointed at the table it belongs to.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::SECTION_KEYS;

/// Catches typos like `prot` -> `port` and `advance-on-confrim`.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key or table portrait does not know.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(portrait::config::unknown_key), help("{hint}"))]
    UnknownKey {
        /// Dotted path as written, e.g. `server.prot`.
        key: String,
        /// Dotted path of the key that was probably meant.
        suggestion: Option<String>,
        hint: String,
        #[label("not a portrait setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, or an enum value outside its variants.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(portrait::config::invalid_value), help("{hint}"))]
    InvalidValue {
        key: String,
        detail: String,
        hint: String,
        #[label("rejected here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A well-typed value that breaks a semantic rule.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(portrait::config::validation))]
    Validation {
        /// Dotted path, e.g. `generation.max_requests`.
        key: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(portrait::config::other))]
    Other(String),
}

/// Converts every error inside `err` into a [`ConfigError`].
///
/// `sources` holds `(path, content)` of the TOML files that were merged, used
/// to attach labels.
pub fn collect_figment_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let origin = origin_file(&error);
            match &error.kind {
                Kind::UnknownField(field, _) => {
                    let (suggestion, hint) = unknown_key_hint(&error.path, field);
                    let (span, src) = locate(sources, origin.as_deref(), &error.path, field);
                    ConfigError::UnknownKey {
                        key: dotted(&error.path, Some(field.as_str())),
                        suggestion,
                        hint,
                        span,
                        src,
                    }
                }
                Kind::UnknownVariant(variant, expected) => {
                    let hint = match suggest(variant, expected) {
                        Some(best) => format!(
                            "did you mean `{best}`? expected one of: {}",
                            expected.join(", ")
                        ),
                        None => format!("expected one of: {}", expected.join(", ")),
                    };
                    invalid_value(
                        &error,
                        origin.as_deref(),
                        sources,
                        format!("unknown variant `{variant}`"),
                        hint,
                    )
                }
                Kind::InvalidType(actual, expected) | Kind::InvalidValue(actual, expected) => {
                    invalid_value(
                        &error,
                        origin.as_deref(),
                        sources,
                        format!("found {actual}"),
                        format!("expected {expected}"),
                    )
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn invalid_value(
    error: &figment::Error,
    origin: Option<&str>,
    sources: &[(String, String)],
    detail: String,
    hint: String,
) -> ConfigError {
    let (table, field) = match error.path.split_last() {
        Some((field, table)) => (table, field.as_str()),
        None => (&[][..], ""),
    };
    let (span, src) = locate(sources, origin, table, field);
    ConfigError::InvalidValue {
        key: error.path.join("."),
        detail,
        hint,
        span,
        src,
    }
}

fn dotted(table: &[String], field: Option<&str>) -> String {
    table
        .iter()
        .map(String::as_str)
        .chain(field)
        .collect::<Vec<_>>()
        .join(".")
}

fn origin_file(error: &figment::Error) -> Option<String> {
    match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => Some(path.display().to_string()),
        _ => None,
    }
}

/// Builds the suggestion and help text for an unknown `field` under `table`.
fn unknown_key_hint(table: &[String], field: &str) -> (Option<String>, String) {
    let sections: Vec<&str> = SECTION_KEYS.iter().map(|(name, _)| *name).collect();

    let Some(section) = table.first() else {
        // An unknown top-level table, or a setting written outside any table.
        if let Some(home) = section_of(field) {
            return (
                Some(format!("{home}.{field}")),
                format!("`{field}` belongs under [{home}]"),
            );
        }
        let listing = format!("sections: {}", sections.join(", "));
        return match suggest(field, &sections) {
            Some(best) => (
                Some(best.to_string()),
                format!("did you mean [{best}]? {listing}"),
            ),
            None => (None, listing),
        };
    };

    let valid = keys_of(section);
    let listing = format!("valid keys in [{section}]: {}", valid.join(", "));
    if let Some(best) = suggest(field, valid) {
        return (
            Some(format!("{section}.{best}")),
            format!("did you mean `{best}`? {listing}"),
        );
    }
    match section_of(field) {
        Some(home) => (
            Some(format!("{home}.{field}")),
            format!("`{field}` belongs under [{home}], not [{section}]"),
        ),
        None => (None, listing),
    }
}

fn keys_of(section: &str) -> &'static [&'static str] {
    SECTION_KEYS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
        .unwrap_or_default()
}

/// The section that owns `field`, if exactly one does.
fn section_of(field: &str) -> Option<&'static str> {
    let mut owners = SECTION_KEYS
        .iter()
        .filter(|(_, keys)| keys.contains(&field))
        .map(|(name, _)| *name);
    match (owners.next(), owners.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Closest candidate to `input` by Jaro-Winkler similarity, if close enough.
pub fn suggest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (strsim::jaro_winkler(input, candidate), *candidate))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate)
}

/// Finds the label for `field` under `table`, preferring the file figment
/// attributed the error to.
fn locate(
    sources: &[(String, String)],
    origin: Option<&str>,
    table: &[String],
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let ordered = sources
        .iter()
        .filter(|(path, _)| origin == Some(path.as_str()))
        .chain(sources.iter().filter(|(path, _)| origin != Some(path.as_str())));

    for (path, content) in ordered {
        if let Some(offset) = key_offset(content, table, field) {
            let span = SourceSpan::new(offset.into(), field.len());
            return (Some(span), Some(NamedSource::new(path, content.clone())));
        }
    }
    (None, None)
}

/// Byte offset of `field` in `content`, either as a key inside the `[table]`
/// block or, for a top-level field, as a table header of its own.
pub fn key_offset(content: &str, table: &[String], field: &str) -> Option<usize> {
    let wanted = table.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split(']').next())
        {
            current = header.trim().to_string();
            if wanted.is_empty() && (current == field || current.starts_with(&format!("{field}.")))
            {
                return line.find(field).map(|col| offset + col);
            }
        } else if current == wanted
            && trimmed
                .strip_prefix(field)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Prints every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
    eprintln!(
        "portrait: {} configuration error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
}
