use itertools::Itertools;

/// Drops everything between `<` and `>` and collapses whitespace runs.
pub fn strip_markup(input: &str) -> String {
    input
        .split('<')
        .enumerate()
        .map(|(i, chunk)| match (i, chunk.split_once('>')) {
            (0, _) => chunk,
            (_, Some((_, rest))) => rest,
            // Unclosed tag runs to the end of input.
            (_, None) => "",
        })
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Cuts `input` to at most `max` chars, ending with an ellipsis when cut.
pub fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        None => input.to_string(),
        Some(_) => {
            let keep = max.saturating_sub(1);
            let end = input.char_indices().nth(keep).map_or(input.len(), |(i, _)| i);
            format!("{}…", input[..end].trim_end())
        }
    }
}
