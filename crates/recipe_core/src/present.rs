//! Text helpers for rendering a recipe view.

/// `125` -> `"02:05"`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Upper-cases the first letter of every space-separated word.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First letter upper-cased, the rest lower-cased.
pub fn sentence_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(125), "02:05");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn title_case_keeps_spacing() {
        assert_eq!(title_case("green  chili paste"), "Green  Chili Paste");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn sentence_case_lowers_the_tail() {
        assert_eq!(sentence_case("ADD the Onions"), "Add the onions");
        assert_eq!(sentence_case(""), "");
    }
}
