pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

pub fn mask_api_key(key: &str) -> String {
    let count = key.chars().count();
    if count > 5 {
        let visible: String = key.chars().take(5).collect();
        format!("{}{}", visible, "*".repeat(count - 5))
    } else {
        key.to_string()
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keep a requested result count inside `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
