use unicode_width::UnicodeWidthStr;

/// Wrap text to `width` columns without breaking words. Words wider
/// than the limit get a line of their own rather than being split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }

        let candidate_width = line.width() + 1 + word.width();
        if candidate_width <= width {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Keys joined for display, e.g. "A, C". Empty input renders a dash.
pub fn format_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        "—".to_string()
    } else {
        keys.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap_text("hello world", 80), vec!["hello world"]);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        let lines = wrap_text("a pneumonoultramicroscopic b", 10);
        assert_eq!(lines, vec!["a", "pneumonoultramicroscopic", "b"]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(wrap_text("   ", 10), vec![""]);
    }

    #[test]
    fn zero_width_is_passed_through() {
        assert_eq!(wrap_text("a b c", 0), vec!["a b c"]);
    }

    #[test]
    fn format_keys_joins_or_dashes() {
        assert_eq!(format_keys(&["A".to_string(), "C".to_string()]), "A, C");
        assert_eq!(format_keys(&[]), "—");
    }
}
