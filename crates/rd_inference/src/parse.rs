/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Like [`truncate_to_char_boundary`] but marks the cut with an ellipsis.
pub fn clip_for_prompt(s: &str, max_bytes: usize) -> String {
    let clipped = truncate_to_char_boundary(s, max_bytes);
    if clipped.len() < s.len() {
        format!("{}...", clipped)
    } else {
        clipped.to_string()
    }
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Capitalise the first letter of every word, as in "self-driving" -> "Self-Driving".
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphabetic();
    }
    out
}
