pub mod http;

/// Truncate a string to max length, adding suffix if truncated.
pub fn truncate_string(s: &str, max_len: usize, suffix: &str) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(suffix.len());
    // Ensure we don't split a multi-byte UTF-8 character
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}

/// Last path segment of a transport file path (`photos/file_3.jpg` -> `file_3.jpg`).
pub fn file_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
