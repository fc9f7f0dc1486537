//! Suspicious-content signatures.
//!
//! A signature is an ordered (pattern, label) pair. The built-in list covers
//! script injection, embed/iframe tags and shell/command execution; an
//! external YAML file can replace it without code changes.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Built-in signature list. Order determines report order.
const BUILTIN_SIGNATURES: &[(&str, &str)] = &[
    (
        r"<script>|onload=|eval\(|exec\(",
        "Potentially malicious JavaScript",
    ),
    (
        r"os\.system|subprocess\.run|eval\(|exec\(",
        "Suspicious Python execution",
    ),
    (
        r"<iframe|<object|<embed|onclick=",
        "Suspicious iframe/object/embed",
    ),
    (r"`[^`]+`|\$\(.*\)", "Potential shell command execution"),
];

/// One compiled suspicious-content rule.
#[derive(Debug)]
pub struct Signature {
    pub pattern: Regex,
    pub label: String,
}

/// Ordered list of signatures applied to every scanned text value.
#[derive(Debug)]
pub struct SignatureSet {
    signatures: Vec<Signature>,
}

#[derive(Debug, Deserialize)]
struct SignatureFile {
    signatures: Vec<SignatureEntry>,
}

#[derive(Debug, Deserialize)]
struct SignatureEntry {
    pattern: String,
    label: String,
}

impl SignatureSet {
    /// The default signature list.
    pub fn builtin() -> Self {
        let signatures = BUILTIN_SIGNATURES
            .iter()
            .map(|(pattern, label)| Signature {
                // Built-in patterns are compile-time constants and always valid.
                pattern: compile(pattern).expect("built-in signature pattern"),
                label: (*label).to_string(),
            })
            .collect();

        Self { signatures }
    }

    /// Load an ordered signature list from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read signature file: {}", path.display()))?;

        let file: SignatureFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {}", path.display()))?;

        if file.signatures.is_empty() {
            anyhow::bail!("No signatures found in {}", path.display());
        }

        let mut signatures = Vec::with_capacity(file.signatures.len());
        for entry in file.signatures {
            let pattern = compile(&entry.pattern)
                .with_context(|| format!("Invalid signature pattern '{}'", entry.pattern))?;
            signatures.push(Signature {
                pattern,
                label: entry.label,
            });
        }

        Ok(Self { signatures })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// All signature matching is case-insensitive.
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
