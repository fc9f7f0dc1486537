//! Pattern scanner with preview/expand behavior.

use colored::Colorize;
use tracing::debug;

use crate::signatures::SignatureSet;

/// Yes/no confirmation capability.
///
/// Injected into the scanner so the expand decision can come from an
/// interactive prompt, a fixed policy, or a test double.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Interactive terminal prompt. A read error counts as "no".
pub struct TermConfirm;

impl Confirm for TermConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Fixed always-yes or always-no answer (non-interactive mode).
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Applies every signature, in order, to one text value at a time.
///
/// Matches on text longer than the preview length print a truncated prefix
/// and only echo the full text if the confirmer agrees; the answer never
/// stops the scan.
pub struct PatternScanner {
    signatures: SignatureSet,
    preview_length: usize,
    confirmer: Box<dyn Confirm>,
}

impl PatternScanner {
    pub fn new(
        signatures: SignatureSet,
        preview_length: usize,
        confirmer: Box<dyn Confirm>,
    ) -> Self {
        Self {
            signatures,
            preview_length,
            confirmer,
        }
    }

    /// Scan one text value against the whole signature list.
    ///
    /// Every matching signature produces its own report (and its own expand
    /// decision). Returns the number of findings.
    pub fn scan_value(&self, text: &str) -> usize {
        let mut findings = 0;

        for signature in self.signatures.iter() {
            if !signature.pattern.is_match(text) {
                continue;
            }
            findings += 1;
            debug!(label = %signature.label, "Signature matched");

            match preview(text, self.preview_length) {
                Some(prefix) => {
                    println!(
                        "{} {} detected: {}...",
                        "[!]".red().bold(),
                        signature.label,
                        prefix
                    );
                    if self.confirmer.confirm("Expand warning to full text?") {
                        println!("{} Full content:\n{}\n", "[!]".red().bold(), text);
                    }
                }
                None => {
                    println!(
                        "{} {} detected: {}",
                        "[!]".red().bold(),
                        signature.label,
                        text
                    );
                }
            }
        }

        findings
    }
}

/// First `limit` characters of `text`, or `None` if it fits as-is.
///
/// Counts characters rather than bytes so multibyte content is never split.
fn preview(text: &str, limit: usize) -> Option<String> {
    if text.chars().count() > limit {
        Some(text.chars().take(limit).collect())
    } else {
        None
    }
}
