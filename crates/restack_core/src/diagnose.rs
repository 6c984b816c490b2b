//! Diagnostic classification.
//!
//! Maps raw engine diagnostics to a small error taxonomy that drives the
//! escalation ladder. Classification is an explicitly ordered,
//! first-match-wins rule table, evaluated against upstream message shapes
//! that are known to change between engine releases; [`RULE_TABLE_VERSION`]
//! is bumped whenever a predicate is adjusted.

use regex::Regex;

/// Version of the classification rule table.
pub const RULE_TABLE_VERSION: u32 = 1;

/// Error taxonomy derived from diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Provider 409 conflict on a resource the caller already owns.
    /// Success-equivalent: the desired state already holds.
    AlreadyOwnedConflict,
    /// Provider 404: a recorded resource is missing remotely (drift).
    RemoteNotFound,
    /// Provider 403: insufficient permissions. Never escalated.
    PermissionDenied,
    /// Provider quota exhausted. Never escalated.
    QuotaExceeded,
    /// CLI help text drowning the actual error line.
    HelpUsageNoise,
    /// Provider error with an embedded code and message.
    GenericProviderError,
    /// No rule matched; original text passes through.
    Unclassified,
}

impl ErrorClass {
    /// Classes reported immediately as user-fatal, bypassing the ladder.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::QuotaExceeded)
    }

    /// Classes treated as terminal success regardless of exit status.
    pub fn is_success_equivalent(&self) -> bool {
        matches!(self, Self::AlreadyOwnedConflict)
    }
}

/// Outcome of classifying one diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub class: ErrorClass,
    /// Human-readable simplification, when one is available.
    pub simplified: Option<String>,
}

/// One entry in the ordered rule table.
pub struct Rule {
    pub name: &'static str,
    pub class: ErrorClass,
    predicate: fn(&str) -> bool,
}

fn matches_already_owned(text: &str) -> bool {
    text.contains("Error 409") && text.contains("already own it")
}

fn matches_remote_not_found(text: &str) -> bool {
    text.contains("Error 404") && text.contains("not found")
}

fn matches_permission_denied(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.contains("Error 403") && (lower.contains("permission") || lower.contains("forbidden"))
}

fn matches_quota_exceeded(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("quota") && lower.contains("exceed")
}

fn matches_help_usage_noise(text: &str) -> bool {
    text.contains("Usage:") && text.contains("Flags:")
}

fn matches_generic_provider(text: &str) -> bool {
    text.to_lowercase().contains("error:") && text.contains("googleapi: Error")
}

/// The ordered classification table. First match wins.
pub fn rules() -> &'static [Rule] {
    &[
        Rule {
            name: "already-owned-conflict",
            class: ErrorClass::AlreadyOwnedConflict,
            predicate: matches_already_owned,
        },
        Rule {
            name: "remote-not-found",
            class: ErrorClass::RemoteNotFound,
            predicate: matches_remote_not_found,
        },
        Rule {
            name: "permission-denied",
            class: ErrorClass::PermissionDenied,
            predicate: matches_permission_denied,
        },
        Rule {
            name: "quota-exceeded",
            class: ErrorClass::QuotaExceeded,
            predicate: matches_quota_exceeded,
        },
        Rule {
            name: "help-usage-noise",
            class: ErrorClass::HelpUsageNoise,
            predicate: matches_help_usage_noise,
        },
        Rule {
            name: "generic-provider-error",
            class: ErrorClass::GenericProviderError,
            predicate: matches_generic_provider,
        },
    ]
}

/// Classify one diagnostic text. Pure and total: never fails.
pub fn classify(text: &str) -> Diagnosis {
    for rule in rules() {
        if (rule.predicate)(text) {
            return Diagnosis {
                class: rule.class,
                simplified: simplify(rule.class, text),
            };
        }
    }
    Diagnosis {
        class: ErrorClass::Unclassified,
        simplified: None,
    }
}

fn simplify(class: ErrorClass, text: &str) -> Option<String> {
    match class {
        ErrorClass::AlreadyOwnedConflict => Some(
            "The resource already exists and you already own it. No changes required."
                .to_string(),
        ),
        ErrorClass::RemoteNotFound => {
            Some("The resource doesn't exist at the cloud provider.".to_string())
        }
        ErrorClass::PermissionDenied => Some(
            "You don't have sufficient permissions to perform this operation.".to_string(),
        ),
        ErrorClass::QuotaExceeded => Some(
            "Quota exceeded for this resource. Check your provider quotas.".to_string(),
        ),
        ErrorClass::HelpUsageNoise => Some(strip_help_noise(text)),
        ErrorClass::GenericProviderError => extract_provider_error(text),
        ErrorClass::Unclassified => None,
    }
}

/// Drop CLI usage/flags help sections, keeping the error line immediately
/// preceding the usage block plus any later line still carrying "error:".
fn strip_help_noise(text: &str) -> String {
    let mut filtered: Vec<&str> = Vec::new();
    let mut in_help_section = false;

    for line in text.lines() {
        if line.contains("Usage:") {
            in_help_section = true;
            for i in (0..filtered.len()).rev() {
                if filtered[i].to_lowercase().contains("error:") {
                    filtered.truncate(i + 1);
                    break;
                }
            }
            continue;
        }
        if !in_help_section || line.to_lowercase().contains("error:") {
            filtered.push(line);
        }
    }

    filtered.join("\n")
}

/// Pull the code and message out of a `googleapi: Error <code>: <msg>` line.
fn extract_provider_error(text: &str) -> Option<String> {
    // Message runs to the first comma, matching the provider's own framing.
    let pattern = Regex::new(r"googleapi: Error (\d+):?\s*([^,\n]*)").ok()?;
    let captures = pattern.captures(text)?;
    let code = captures.get(1)?.as_str();
    let message = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    Some(format!("Provider error {}: {}", code, message))
}
