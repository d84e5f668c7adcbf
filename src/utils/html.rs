// src/utils/html.rs

/// Sanitizes teacher-authored markup before it is stored.
///
/// Exam titles, question texts and options are rendered inside the student's
/// session view, so they go through ammonia's whitelist: harmless formatting
/// (`<b>`, `<code>`, `<sub>`) survives while `<script>`, frames and event
/// handler attributes are removed. A `<script>` element is dropped together
/// with its content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Like [`clean_html`], but `None` if nothing visible is left.
pub fn clean_non_empty(input: &str) -> Option<String> {
    let cleaned = clean_html(input);
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
