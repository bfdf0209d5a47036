//! Normalization of raw validation reports
//!
//! Raw reports look like
//! `The property '#/services/2' did not contain a required property of 'state' in schema <uuid>#`.
//! The pointer is absolute within the validated scope and may contain
//! `type` segments introduced by `$ref`/`oneOf` resolution. Normalized
//! messages name the affected element by index and its attribute path.

const PROPERTY_PREFIX: &str = "The property '";
const SCHEMA_MARKER: &str = " in schema ";
const INDIRECTION_SEGMENT: &str = "type";

/// A raw report split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValidationError {
    /// Pointer segments as reported, empty for the scope root
    pub path: Vec<String>,
    /// Description following the pointer
    pub tail: String,
    /// Whether a ` in schema <id>#` suffix was stripped
    pub schema_suffix: bool,
}

impl RawValidationError {
    /// Returns `None` for messages that do not start with a property pointer.
    pub fn parse(message: &str) -> Option<Self> {
        let (body, schema_suffix) = strip_schema_suffix(message);
        let rest = body.strip_prefix(PROPERTY_PREFIX)?;
        let (pointer, tail) = rest.split_once('\'')?;
        let pointer = pointer.strip_prefix('#')?;

        let path = pointer
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            path,
            tail: tail.trim().to_string(),
            schema_suffix,
        })
    }

    /// Pointer segments that address data. `type` segments are schema
    /// indirection, unless the pointer ends in one: then it names an
    /// attribute called `type`.
    pub fn data_segments(&self) -> Vec<&str> {
        let last = self.path.len().saturating_sub(1);
        self.path
            .iter()
            .enumerate()
            .filter(|(position, segment)| segment.as_str() != INDIRECTION_SEGMENT || *position == last)
            .map(|(_, segment)| segment.as_str())
            .collect()
    }

    pub fn render(&self) -> String {
        let segments = self.data_segments();
        let index = segments.iter().rev().find(|segment| is_index(segment));
        let attributes = segments
            .iter()
            .copied()
            .filter(|segment| !is_index(segment))
            .collect::<Vec<_>>();

        let mut message = String::from("The property");
        if let Some(index) = index {
            message.push_str(" #");
            message.push_str(index);
        }
        if !attributes.is_empty() {
            message.push_str(&format!(" ({})", attributes.join("/")));
        }
        if !self.tail.is_empty() {
            message.push(' ');
            message.push_str(self.tail.trim_end_matches('.'));
        }
        message.push('.');
        message
    }
}

/// Rewrites a raw validator report into a compact, scope-relative message.
pub fn cleanup_json_error_message(message: &str) -> String {
    match RawValidationError::parse(message) {
        Some(raw) => raw.render(),
        None => match strip_schema_suffix(message) {
            (body, true) => format!("{}.", body),
            (body, false) => body.to_string(),
        },
    }
}

fn strip_schema_suffix(message: &str) -> (&str, bool) {
    match message.rfind(SCHEMA_MARKER) {
        Some(position) if message.ends_with('#') => (&message[..position], true),
        _ => (message, false),
    }
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit())
}
