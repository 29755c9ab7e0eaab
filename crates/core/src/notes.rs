//! Plain-text preparation for speaker notes and per-item contexts.

use crate::report::Finding;
use crate::rich_text::{decode_entities, strip_tags};

/// Placeholder for empty values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Strip markup and carriage returns from a rich text value. Empty values
/// become [`NOT_AVAILABLE`].
pub fn prepare_for_notes(value: &str) -> String {
    if value.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    decode_entities(&strip_tags(value)).replace('\r', "")
}

/// First character uppercased, the rest lowercased.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// The summary block written into a finding slide's speaker notes.
pub fn finding_notes(finding: &Finding) -> String {
    let sections = [
        ("AFFECTED ENTITIES", &finding.affected_entities),
        ("IMPACT", &finding.impact),
        ("MITIGATION", &finding.recommendation),
        ("REPLICATION", &finding.replication_steps),
        ("HOST DETECTION", &finding.host_detection_techniques),
        ("NETWORK DETECTION", &finding.network_detection_techniques),
        ("REFERENCES", &finding.references),
    ];

    let mut block = format!("{}: {}", capitalize(&finding.severity), finding.title);
    for (heading, value) in sections {
        block.push_str("\n\n");
        block.push_str(heading);
        block.push('\n');
        block.push_str(&prepare_for_notes(value));
    }
    block
}
