//! AMQP-style topic pattern matching.

/// Matches a routing key against a binding pattern.
///
/// Patterns and keys are dot-separated words; `*` matches exactly one
/// word, `#` matches zero or more. `note.*` therefore matches
/// `note.created` but not `note.favorite.toggled`, while `note.#`
/// matches the whole `note` namespace.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    segments_match(&pattern, &key)
}

fn segments_match(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| segments_match(rest, &key[skip..])),
        Some((word, rest)) => match key.split_first() {
            Some((key_word, key_rest)) => {
                (*word == "*" || word == key_word) && segments_match(rest, key_rest)
            }
            None => false,
        },
    }
}
