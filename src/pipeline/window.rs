//! Fixed-size overlapping windows for documents without recognizable
//! headings.
//!
//! Windows break at the last paragraph break inside the size limit, then the
//! last line break, then the last sentence end, then the last space, and only
//! cut mid-word when none of those exist. Each window after the first starts
//! roughly `overlap` characters before the previous window's end, moved
//! forward to the next word start.

pub fn split_windows(text: &str, window_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars = text.chars().collect::<Vec<char>>();
    let window_chars = window_chars.max(1);
    let overlap_chars = overlap_chars.min(window_chars.saturating_sub(1));

    let mut windows = Vec::<String>::new();
    let mut start = skip_whitespace(&chars, 0);

    while start < chars.len() {
        let limit = (start + window_chars).min(chars.len());
        if limit == chars.len() {
            push_trimmed(&mut windows, &chars[start..]);
            break;
        }

        let end = find_break(&chars, start, limit, overlap_chars);
        push_trimmed(&mut windows, &chars[start..end]);

        let mut next = end.saturating_sub(overlap_chars);
        if next <= start {
            next = end;
        }
        next = align_to_word_start(&chars, next, end);
        start = skip_whitespace(&chars, next);
    }

    windows
}

fn find_break(chars: &[char], start: usize, limit: usize, overlap_chars: usize) -> usize {
    let min_end = start + overlap_chars + 1;
    if min_end >= limit {
        return limit;
    }

    // Paragraph and line breaks end the window before the separator.
    if let Some(position) = last_position(chars, min_end, limit, |index| {
        chars[index] == '\n' && chars.get(index + 1) == Some(&'\n')
    }) {
        return position;
    }
    if let Some(position) = last_position(chars, min_end, limit, |index| chars[index] == '\n') {
        return position;
    }

    // Sentence ends keep the period inside the window.
    if let Some(position) = last_position(chars, min_end - 1, limit - 1, |index| {
        chars[index] == '.' && chars.get(index + 1).is_some_and(|next| next.is_whitespace())
    }) {
        return position + 1;
    }

    if let Some(position) = last_position(chars, min_end, limit, |index| chars[index] == ' ') {
        return position;
    }

    limit
}

fn last_position(
    chars: &[char],
    from: usize,
    to: usize,
    predicate: impl Fn(usize) -> bool,
) -> Option<usize> {
    (from..=to.min(chars.len().saturating_sub(1)))
        .rev()
        .find(|index| predicate(*index))
}

fn align_to_word_start(chars: &[char], position: usize, end: usize) -> usize {
    if position == 0 || position >= chars.len() {
        return position;
    }
    if chars[position - 1].is_whitespace() || chars[position].is_whitespace() {
        return position;
    }

    let mut cursor = position;
    while cursor < end && !chars[cursor].is_whitespace() {
        cursor += 1;
    }

    if cursor < end { cursor } else { position }
}

fn skip_whitespace(chars: &[char], mut position: usize) -> usize {
    while position < chars.len() && chars[position].is_whitespace() {
        position += 1;
    }
    position
}

fn push_trimmed(windows: &mut Vec<String>, slice: &[char]) {
    let window = slice.iter().collect::<String>();
    let trimmed = window.trim();
    if !trimmed.is_empty() {
        windows.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(seed: usize, words: usize) -> String {
        (0..words)
            .map(|index| format!("word{seed}x{index}"))
            .collect::<Vec<String>>()
            .join(" ")
    }

    #[test]
    fn short_text_is_a_single_window() {
        let windows = split_windows("  Keep away from heat.  ", 1200, 200);
        assert_eq!(windows, vec!["Keep away from heat.".to_string()]);
    }

    #[test]
    fn windows_respect_size_and_prefer_paragraph_breaks() {
        let paragraphs = (0..6).map(|seed| paragraph(seed, 50)).collect::<Vec<String>>();
        let text = paragraphs.join("\n\n");

        let windows = split_windows(&text, 1200, 200);

        assert!(windows.len() > 1);
        for window in &windows {
            assert!(window.chars().count() <= 1200);
        }
        assert!(windows[0].ends_with(&paragraphs[1]) || windows[0].ends_with(&paragraphs[2]));
    }

    #[test]
    fn consecutive_windows_overlap_and_cover_the_end() {
        let text = paragraph(1, 600);
        let windows = split_windows(&text, 1200, 200);

        assert!(windows.len() > 2);
        for pair in windows.windows(2) {
            let head = pair[1].split_whitespace().next().expect("first word");
            assert!(pair[0].contains(head), "window should start inside previous");
        }
        let last_word = text.split_whitespace().last().expect("last word");
        assert!(windows.last().expect("last window").ends_with(last_word));
    }

    #[test]
    fn windowing_is_deterministic() {
        let text = format!("{}.\n{}. {}", paragraph(2, 200), paragraph(3, 120), paragraph(4, 90));
        assert_eq!(split_windows(&text, 500, 80), split_windows(&text, 500, 80));
    }

    #[test]
    fn unbroken_text_is_hard_cut() {
        let text = "x".repeat(2500);
        let windows = split_windows(&text, 1000, 100);

        assert_eq!(windows[0].len(), 1000);
        assert!(windows.iter().all(|window| window.len() <= 1000));
        assert_eq!(windows.last().map(String::len), Some(2500 - 1800));
    }
}
