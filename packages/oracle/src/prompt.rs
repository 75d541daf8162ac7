//! Request construction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use codex_state::ArchetypalState;
use serde::{Deserialize, Serialize};

use crate::config::OracleConfig;
use crate::insight::RitualContext;

const SYSTEM_PROMPT: &str = "You are an archetypal oracle versed in depth psychology, \
symbolic traditions, and transformation practice. You interpret changes in a \
practitioner's archetypes, energies, and symbols with care and give grounded, practical \
guidance.

Answer in markdown with these sections:

## Interpretation
## Symbolic Analysis
## Integration Guidance
## Emergent Symbols
## Cautions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// An OpenAI-compatible `/chat/completions` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

pub fn build_request(
    config: &OracleConfig,
    context: &RitualContext,
    pre: &ArchetypalState,
    post: &ArchetypalState,
) -> ChatRequest {
    let user = format!(
        "Ritual: {}\nIntention: {}\nTransformation intensity: {:.3}\n\nWhat changed:\n{}\n\n\
         Interpret this transformation and offer guidance for integrating it.",
        context.ritual_name,
        if context.intention.trim().is_empty() {
            "(none stated)"
        } else {
            context.intention.as_str()
        },
        context.intensity,
        context_block(pre, post, config.noise_threshold),
    );

    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage::new("system", SYSTEM_PROMPT),
            ChatMessage::new("user", user),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Summarize what moved between `pre` and `post`.
///
/// Archetypes and energies appear only when their delta exceeds
/// `noise_threshold`. New integrations and symbols are listed verbatim.
pub fn context_block(pre: &ArchetypalState, post: &ArchetypalState, noise_threshold: f64) -> String {
    let mut out = String::new();

    let archetypes = significant_changes(&pre.archetypes, &post.archetypes, noise_threshold);
    if !archetypes.is_empty() {
        out.push_str("Archetypes:\n");
        out.push_str(&archetypes);
    }

    let energies = significant_changes(&pre.energies, &post.energies, noise_threshold);
    if !energies.is_empty() {
        out.push_str("Energies:\n");
        out.push_str(&energies);
    }

    let known: BTreeSet<&str> = pre.integrations.iter().map(|i| i.name.as_str()).collect();
    let integrations: Vec<_> = post
        .integrations
        .iter()
        .filter(|i| !known.contains(i.name.as_str()))
        .collect();
    if !integrations.is_empty() {
        out.push_str("New integrations:\n");
        for integration in integrations {
            let _ = writeln!(out, "  - {}: {}", integration.name, integration.description);
        }
    }

    let symbols: Vec<&str> = post
        .symbols
        .iter()
        .filter(|s| !pre.has_symbol(s))
        .map(String::as_str)
        .collect();
    if !symbols.is_empty() {
        let _ = writeln!(out, "New symbols: {}", symbols.join(" "));
    }

    if out.is_empty() {
        out.push_str("No significant changes.");
    }
    out.trim_end().to_string()
}

fn significant_changes(
    pre: &BTreeMap<String, f64>,
    post: &BTreeMap<String, f64>,
    noise_threshold: f64,
) -> String {
    let keys: BTreeSet<&String> = pre.keys().chain(post.keys()).collect();
    let mut out = String::new();
    for key in keys {
        let before = pre.get(key).copied().unwrap_or(0.0);
        let after = post.get(key).copied().unwrap_or(0.0);
        if (after - before).abs() > noise_threshold {
            let _ = writeln!(out, "  {}: {:.2} → {:.2}", key, before, after);
        }
    }
    out
}
