/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn a human caption ("Case Officer:") into a camelCase key ("caseOfficer").
///
/// Characters outside `[A-Za-z0-9]` and whitespace are dropped. Whitespace and
/// lower→upper transitions both start a new word, so an already-normalized key
/// maps to itself. Leading digits are dropped so keys always start with a letter.
pub fn normalize_label(raw: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            let boundary = ch.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(ch.to_ascii_lowercase());
            prev = Some(ch);
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut key = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            key.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                key.push(first.to_ascii_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }

    let trimmed = key.trim_start_matches(|c: char| c.is_ascii_digit());
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_ascii_lowercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Strip one trailing colon (and the space around it) from a caption.
pub fn strip_colon(label: &str) -> &str {
    let trimmed = label.trim();
    trimmed.strip_suffix(':').map(str::trim_end).unwrap_or(trimmed)
}
