//! Reply clean-up and `Label: value` field extraction

use insight_types::{AccidentFields, NOT_AVAILABLE};
use regex::Regex;

pub const VEHICLES_INVOLVED: &str = "Vehicles Involved";
pub const ACCIDENT_DETAILS: &str = "Accident Details";
pub const SURROUNDINGS: &str = "Surroundings";
pub const CONDITION: &str = "Condition";
pub const OVERALL_ASSESSMENT: &str = "Overall Assessment";

/// Misspelled label emitted by replies produced with the older batch prompt
pub const OVERALL_ASSESSMENT_LEGACY: &str = "Overall Assesment";

/// Labels requested from the model, in table column order
pub const ACCIDENT_FIELD_LABELS: [&str; 5] = [
    VEHICLES_INVOLVED,
    ACCIDENT_DETAILS,
    SURROUNDINGS,
    CONDITION,
    OVERALL_ASSESSMENT,
];

/// Strip markdown emphasis and heading markers
pub fn sanitize_response(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '*' | '#')).collect()
}

/// Text after `<label>:` up to the end of that line, trimmed.
///
/// The label must open its line, optionally after indentation or a list
/// marker (`-`, `1.`). The match is case-insensitive. Returns `"NA"` when
/// the label is missing or its value is blank.
pub fn extract_field(text: &str, label: &str) -> String {
    let pattern = format!(
        r"(?im)^[ \t]*(?:[-•]|\d+[.)])?[ \t]*{}:([^\n]*)",
        regex::escape(label)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return NOT_AVAILABLE.to_string();
    };

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Try each label in turn; first one with a value wins
pub fn extract_field_any(text: &str, labels: &[&str]) -> String {
    labels
        .iter()
        .map(|label| extract_field(text, label))
        .find(|value| value != NOT_AVAILABLE)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Extract all five accident fields. Each is looked up independently.
pub fn extract_accident_fields(text: &str) -> AccidentFields {
    AccidentFields {
        vehicles_involved: extract_field(text, VEHICLES_INVOLVED),
        accident_details: extract_field(text, ACCIDENT_DETAILS),
        surroundings: extract_field(text, SURROUNDINGS),
        condition: extract_field(text, CONDITION),
        overall_assessment: extract_field_any(
            text,
            &[OVERALL_ASSESSMENT, OVERALL_ASSESSMENT_LEGACY],
        ),
    }
}
