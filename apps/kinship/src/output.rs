//! # Command Output
//!
//! JSON shapes printed in `--json-mode` and the plain-text renderings used
//! otherwise. Renderers return strings so they can be checked without
//! capturing stdout.

use kinship_core::{
    AncestorEntry, DescendantEntry, Event, Family, Individual, IndividualDetail, display_name,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Indentation per generation in lineage listings.
const INDENT: &str = "    ";

/// Suffix for someone already listed earlier in the same walk.
const REPEAT_MARK: &str = " (see above)";

// =============================================================================
// JSON RESPONSES
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub database: String,
    pub backend: String,
    pub persistent: bool,
    pub individuals: usize,
    pub families: usize,
    pub index_tokens: usize,
}

/// Result of a mutating command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    /// Identifier of the record created or changed, e.g. `"I3"`.
    pub id: Option<String>,
    pub message: String,
}

impl MutationResponse {
    pub fn ok(id: impl ToString, message: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.to_string()),
            message: message.into(),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            id: None,
            message: message.into(),
        }
    }
}

/// One row of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub partners: Vec<String>,
}

impl From<&Family> for SearchHit {
    fn from(family: &Family) -> Self {
        Self {
            id: family.id.to_string(),
            name: family.name.clone(),
            partners: family.partners.iter().map(ToString::to_string).collect(),
        }
    }
}

// =============================================================================
// TEXT RENDERING
// =============================================================================

fn event_text(event: &Event) -> String {
    match (event.date.is_empty(), event.location.is_empty()) {
        (true, true) => String::new(),
        (false, true) => event.date.clone(),
        (true, false) => event.location.clone(),
        (false, false) => format!("{}, {}", event.date, event.location),
    }
}

/// `"Smith, John (1850-1920) [I4]"`
#[must_use]
pub fn person_line(individual: &Individual) -> String {
    format!("{} [{}]", display_name(&individual.details), individual.id)
}

/// Descendant walk, one person per line, indented by generation. Spouses
/// are listed under each person with a `+`.
#[must_use]
pub fn render_descendants(entries: &[DescendantEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let indent = INDENT.repeat(entry.generation);
        if entry.repeat {
            let _ = writeln!(out, "{indent}{}{REPEAT_MARK}", person_line(&entry.individual));
            continue;
        }
        let _ = writeln!(out, "{indent}{}", person_line(&entry.individual));
        for family in &entry.families {
            let married = event_text(&family.married);
            for spouse in &family.spouses {
                if married.is_empty() {
                    let _ = writeln!(out, "{indent}  + {}", person_line(spouse));
                } else {
                    let _ = writeln!(out, "{indent}  + {} m. {married}", person_line(spouse));
                }
            }
        }
    }
    out
}

/// Ancestor walk, one person per line, indented by generation.
#[must_use]
pub fn render_ancestors(entries: &[AncestorEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let indent = INDENT.repeat(entry.generation);
        let mark = if entry.repeat { REPEAT_MARK } else { "" };
        let _ = writeln!(out, "{indent}{}{mark}", person_line(&entry.individual));
    }
    out
}

/// Full page for one person.
#[must_use]
pub fn render_detail(detail: &IndividualDetail) -> String {
    let person = &detail.individual.details;
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", detail.display_name, detail.individual.id);
    let _ = writeln!(out, "Sex: {}", person.sex.code());

    for (label, event) in [
        ("Born", &person.birth),
        ("Baptised", &person.baptism),
        ("Died", &person.death),
        ("Buried", &person.burial),
    ] {
        let text = event_text(event);
        if !text.is_empty() {
            let _ = writeln!(out, "{label}: {text}");
        }
    }
    if !person.occupation.is_empty() {
        let _ = writeln!(out, "Occupation: {}", person.occupation);
    }

    if !detail.parents.is_empty() {
        let _ = writeln!(out, "Parents:");
        for parent in &detail.parents {
            let _ = writeln!(out, "  {}", person_line(parent));
        }
    }

    for family in &detail.families {
        let _ = writeln!(out, "Family [{}]: {}", family.family, family.name);
        let married = event_text(&family.married);
        if !married.is_empty() {
            let _ = writeln!(out, "  Married: {married}");
        }
        for spouse in &family.spouses {
            let _ = writeln!(out, "  Spouse: {}", person_line(spouse));
        }
        for child in &family.children {
            let _ = writeln!(out, "  Child: {}", person_line(child));
        }
    }

    if !person.note.is_empty() {
        let _ = writeln!(out, "Note: {}", person.note);
    }
    out
}

/// Family page: name, marriage, partners, children.
#[must_use]
pub fn render_family(family: &Family, partners: &[Individual], children: &[Individual]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", family.name, family.id);
    let married = event_text(&family.details.married);
    if !married.is_empty() {
        let _ = writeln!(out, "Married: {married}");
    }
    for partner in partners {
        let _ = writeln!(out, "Partner: {}", person_line(partner));
    }
    for child in children {
        let _ = writeln!(out, "Child: {}", person_line(child));
    }
    if !family.details.note.is_empty() {
        let _ = writeln!(out, "Note: {}", family.details.note);
    }
    out
}

/// Search results, one family per line.
#[must_use]
pub fn render_search(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No families found\n".to_string();
    }
    let mut out = String::new();
    for hit in hits {
        let _ = writeln!(out, "{} [{}]", hit.name, hit.id);
    }
    out
}
