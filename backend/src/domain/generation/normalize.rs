//! Post-processing of raw backend output.

const FENCE: &str = "```";

/// Strip one surrounding code fence (```` ```lang\n ... \n``` ````) if present.
///
/// # Examples
/// ```
/// use siteulation::domain::generation::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```html\n<p>hi</p>\n```"), "<p>hi</p>");
/// assert_eq!(strip_code_fence("<p>plain</p>"), "<p>plain</p>");
/// ```
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };
    let Some((_lang, body)) = after_open.split_once('\n') else {
        return trimmed;
    };
    body.trim_end()
        .strip_suffix(FENCE)
        .unwrap_or(body)
        .trim()
}

/// Turn backend text into a servable HTML document.
///
/// Returns `None` when nothing usable remains. Text without an `<html`
/// marker is wrapped in a minimal shell titled `title`.
#[must_use]
pub fn normalize_output(raw: &str, title: &str) -> Option<String> {
    let body = strip_code_fence(raw);
    if body.is_empty() || is_fence_marker(body) {
        return None;
    }
    if body.to_ascii_lowercase().contains("<html") {
        return Some(body.to_owned());
    }
    Some(wrap_in_shell(body, title))
}

/// A lone opening or closing fence line, optionally with a language tag.
fn is_fence_marker(text: &str) -> bool {
    text.strip_prefix(FENCE).is_some_and(|tag| {
        tag.chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '+' | '`'))
    })
}

fn wrap_in_shell(body: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
