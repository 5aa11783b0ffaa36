use crate::{ParseError, Rule};
use divzero_core::SourceLocation;
use pest::iterators::Pair;
use std::collections::HashMap;

/// `!DILocation` nodes of a module, keyed by their reference (`!17`).
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    locations: HashMap<String, SourceLocation>,
}

impl LocationTable {
    /// Collects every `!N = !DILocation(...)` among the module's top-level items.
    pub fn collect<'i>(items: &[Pair<'i, Rule>]) -> Result<Self, ParseError> {
        let mut table = Self::default();
        for item in items.iter().filter(|p| p.as_rule() == Rule::metadata_def) {
            let mut reference = None;
            let mut location = None;
            for part in item.clone().into_inner() {
                match part.as_rule() {
                    Rule::metadata_ref => reference = Some(part.as_str().to_string()),
                    Rule::di_location => location = Some(extract_location(&part)?),
                    _ => {}
                }
            }
            if let (Some(reference), Some(location)) = (reference, location) {
                table.locations.insert(reference, location);
            }
        }
        Ok(table)
    }

    pub fn get(&self, reference: &str) -> Option<SourceLocation> {
        self.locations.get(reference).copied()
    }

    /// Location for `reference`, failing when the module never defines it.
    pub fn resolve(&self, reference: &str, line: usize) -> Result<SourceLocation, ParseError> {
        self.get(reference)
            .ok_or_else(|| ParseError::UndefinedMetadata {
                reference: reference.to_string(),
                line,
            })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// `line` and `column` fields of a `!DILocation`; absent fields are 0.
pub fn extract_location(pair: &Pair<Rule>) -> Result<SourceLocation, ParseError> {
    let mut location = SourceLocation::new(0, 0);
    for field in pair.clone().into_inner() {
        let mut parts = field.into_inner();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let slot = match key.as_str() {
            "line" => &mut location.line,
            "column" => &mut location.column,
            _ => continue,
        };
        let text = value.as_str().trim();
        *slot = text.parse().map_err(|_| ParseError::InvalidInteger {
            text: text.to_string(),
            line: value.line_col().0,
        })?;
    }
    Ok(location)
}

/// The `!N` following `!dbg` in raw instruction text.
pub fn dbg_reference(text: &str) -> Option<&str> {
    let start = text.find("!dbg")? + "!dbg".len();
    let rest = text[start..].trim_start();
    let end = rest
        .char_indices()
        .skip(1)
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '_'))
        .map_or(rest.len(), |(i, _)| i);
    rest.starts_with('!').then(|| &rest[..end])
}
