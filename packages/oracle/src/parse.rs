//! Tolerant extraction of named sections from a narrative reply.
//!
//! Models rarely follow a format exactly, so a heading is recognized in any of
//! these shapes, ignoring case and separators:
//!
//! ```text
//! ## Symbolic Analysis
//! **Cautions:** text on the same line
//! INTEGRATION_GUIDANCE: text on the same line
//! ```
//!
//! Lines before the first heading are kept as the interpretation when no
//! explicit interpretation section exists. A reply without any recognizable
//! heading becomes the interpretation verbatim.

use lazy_static::lazy_static;
use regex::Regex;

use crate::insight::InsightSections;

lazy_static! {
    static ref MARKDOWN_HEADING: Regex =
        Regex::new(r"^\s{0,3}#{1,6}\s*(?P<label>[^#]+?)\s*#*\s*$").unwrap();
    static ref BOLD_LABEL: Regex =
        Regex::new(r"^\s*\*\*(?P<label>[^*]+?)\*\*\s*[:\-]?\s*(?P<rest>.*)$").unwrap();
    static ref PLAIN_LABEL: Regex =
        Regex::new(r"^\s*(?P<label>[A-Za-z][A-Za-z0-9 _\-]{0,40}?)\s*:\s*(?P<rest>.*)$")
            .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Interpretation,
    SymbolicAnalysis,
    IntegrationGuidance,
    EmergentSymbols,
    Cautions,
}

impl Section {
    fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        let section = match key.as_str() {
            "interpretation" | "archetypalinterpretation" | "overview" | "reading" => {
                Section::Interpretation
            }
            "symbolicanalysis" | "symbolicmeaning" | "symbolism" => Section::SymbolicAnalysis,
            "integrationguidance" | "integration" | "guidance" => Section::IntegrationGuidance,
            "emergentsymbols" | "emergentsymbolnotes" | "symbols" => Section::EmergentSymbols,
            "cautions" | "caution" | "warnings" | "warning" => Section::Cautions,
            _ => return None,
        };
        Some(section)
    }
}

/// Interpretation text plus whatever sections were found.
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub interpretation: String,
    pub sections: InsightSections,
}

/// Recognize `line` as a known heading, returning the section and any text
/// that followed the label on the same line.
fn heading(line: &str) -> Option<(Section, &str)> {
    if let Some(caps) = MARKDOWN_HEADING.captures(line) {
        let label = caps.name("label")?.as_str().trim_end_matches(':');
        return Section::from_label(label).map(|s| (s, ""));
    }
    for pattern in [&*BOLD_LABEL, &*PLAIN_LABEL] {
        if let Some(caps) = pattern.captures(line) {
            let label = caps.name("label")?.as_str().trim_end_matches(':');
            if let Some(section) = Section::from_label(label) {
                let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
                return Some((section, rest));
            }
        }
    }
    None
}

pub fn parse_narrative(text: &str) -> Narrative {
    let mut preamble = String::new();
    let mut found: Vec<(Section, String)> = Vec::new();

    for line in text.lines() {
        if let Some((section, rest)) = heading(line) {
            found.push((section, rest.to_string()));
            continue;
        }
        let target = match found.last_mut() {
            Some((_, body)) => body,
            None => &mut preamble,
        };
        target.push('\n');
        target.push_str(line);
    }

    let mut interpretation: Option<String> = None;
    let mut sections = InsightSections::default();
    for (section, body) in found {
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        let slot = match section {
            Section::Interpretation => &mut interpretation,
            Section::SymbolicAnalysis => &mut sections.symbolic_analysis,
            Section::IntegrationGuidance => &mut sections.integration_guidance,
            Section::EmergentSymbols => &mut sections.emergent_symbols,
            Section::Cautions => &mut sections.cautions,
        };
        match slot {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(body);
            }
            None => *slot = Some(body.to_string()),
        }
    }

    let preamble = preamble.trim();
    let interpretation = interpretation
        .or_else(|| (!preamble.is_empty()).then(|| preamble.to_string()))
        .unwrap_or_else(|| text.trim().to_string());

    Narrative {
        interpretation,
        sections,
    }
}
