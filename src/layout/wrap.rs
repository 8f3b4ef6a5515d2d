use super::font::FontMetrics;

/// Greedy word wrap against a pixel budget. Words are appended to the current
/// line while the measured width stays within `max_width`; a word that would
/// overflow closes the line and starts the next one. A single word wider than
/// the budget is emitted as its own oversized line rather than split or
/// hyphenated, so re-joining the output with single spaces always reproduces
/// the input word sequence.
pub fn wrap_text(text: &str, font: &FontMetrics, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if font.measure_width(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontMetrics {
        FontMetrics::estimated()
    }

    #[test]
    fn every_line_fits_or_is_a_single_word() {
        let font = font();
        let size = 16.0;
        let max_width = 90.0;
        let text = "the quick brown fox jumps over the lazy dog";
        for line in wrap_text(text, &font, size, max_width) {
            let fits = font.measure_width(&line, size) <= max_width;
            let single_word = !line.contains(' ');
            assert!(fits || single_word, "line {:?} breaks the width bound", line);
        }
    }

    #[test]
    fn rejoining_reproduces_the_word_sequence() {
        let font = font();
        let text = "one  two\tthree\nfour five six seven";
        let lines = wrap_text(text, &font, 14.0, 60.0);
        let rejoined = lines.join(" ");
        let expected = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn oversized_word_becomes_its_own_line() {
        let font = font();
        let lines = wrap_text("a incomprehensibilities b", &font, 20.0, 40.0);
        assert!(lines.contains(&"incomprehensibilities".to_string()));
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, "a incomprehensibilities b");
    }

    #[test]
    fn generous_budget_keeps_one_line() {
        let font = font();
        let lines = wrap_text("short caption", &font, 12.0, 10_000.0);
        assert_eq!(lines, vec!["short caption".to_string()]);
    }

    #[test]
    fn empty_text_wraps_to_nothing() {
        let font = font();
        assert!(wrap_text("   ", &font, 12.0, 100.0).is_empty());
    }
}
