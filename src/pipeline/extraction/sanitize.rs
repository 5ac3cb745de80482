// Sanitize caller-supplied text before it is embedded in a model prompt.
// Removes invisible Unicode, drops injection lines, normalizes whitespace.

/// Maximum free-text length forwarded to the model (characters).
pub const MAX_PROMPT_INPUT_CHARS: usize = 4_000;

/// Sanitize text for prompt embedding: strip invisible characters, drop
/// lines that try to impersonate a role or override instructions,
/// normalize whitespace and truncate.
pub fn sanitize_user_text(raw: &str) -> String {
    let cleaned = remove_invisible_chars(raw);
    let (no_injection, removed) = remove_injection_lines(&cleaned);

    if removed > 0 {
        // Count only; the text itself may hold health information.
        tracing::warn!(removed_lines = removed, "Injection patterns removed from user text");
    }

    let normalized = normalize_whitespace(&no_injection);
    truncate_chars(&normalized, MAX_PROMPT_INPUT_CHARS)
}

/// Remove zero-width, bidi-control and other control characters.
/// Keeps space, newline and tab.
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

fn is_role_marker(lowered: &str) -> bool {
    const MARKERS: &[&str] = &[
        "system:",
        "assistant:",
        "user:",
        "[system]",
        "[assistant]",
        "[inst]",
        "[/inst]",
        "<<sys>>",
        "note to ai:",
        "instructions:",
    ];
    MARKERS.iter().any(|m| lowered.starts_with(m))
}

fn is_override_attempt(lowered: &str) -> bool {
    const PHRASES: &[&str] = &[
        "ignore previous instructions",
        "ignore all previous instructions",
        "ignore all instructions",
        "ignore the above instructions",
        "disregard your instructions",
        "disregard all instructions",
        "forget your instructions",
        "new instructions:",
        "override:",
    ];
    PHRASES.iter().any(|p| lowered.contains(p))
}

/// Drop injection lines. Returns (cleaned_text, removed_line_count).
fn remove_injection_lines(text: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0usize;

    for line in text.lines() {
        let lowered = line.trim().to_lowercase();
        if is_role_marker(&lowered) || is_override_attempt(&lowered) {
            removed += 1;
            continue;
        }
        kept.push(line);
    }

    (kept.join("\n"), removed)
}

/// Trim every line and collapse runs of blank lines.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_blank {
                lines.push("");
            }
            prev_blank = true;
        } else {
            lines.push(trimmed);
            prev_blank = false;
        }
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Truncate to `max_chars` characters, breaking at the last whitespace.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(pos) => format!("{}…[TRUNCATED]", &head[..pos]),
        None => format!("{head}…[TRUNCATED]"),
    }
}
