//! Context assembly from prior versions.

use crate::domain::Version;

/// Number of prior versions fed back to the backend by default.
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// Build the backend context from `history` (newest first, as the store
/// returns it) and the new `prompt`.
///
/// Versions are replayed oldest first, each labelled with its number.
#[must_use]
pub fn build_context(history: &[Version], prompt: &str) -> String {
    if history.is_empty() {
        return prompt.to_owned();
    }

    let mut context = String::from("Previous versions of this page, oldest first:\n\n");
    for version in history.iter().rev() {
        context.push_str(&format!(
            "Version {}:\n{}\n\n",
            version.version_number, version.content
        ));
    }
    context.push_str("Produce the next version for this request:\n");
    context.push_str(prompt);
    context
}
