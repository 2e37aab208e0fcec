/// Groups digits in threes with `,` regardless of host locale: `125000` -> `125,000`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

/// Longest player name rendered in a table row, in characters.
pub const MAX_USERNAME_CHARS: usize = 32;

/// Cuts names past [`MAX_USERNAME_CHARS`] and marks the cut with `…`.
pub fn truncate_username(username: &str) -> String {
    match username.char_indices().nth(MAX_USERNAME_CHARS) {
        Some((cut, _)) => format!("{}…", &username[..cut]),
        None => username.to_owned(),
    }
}

/// Escapes the characters Telegram's legacy Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
