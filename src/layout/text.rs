use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

const ELLIPSIS: char = '\u{2026}';
const MIN_LAST_RATIO: f32 = 0.45;
const MIN_LAST_CHARS: usize = 6;

/// Wraps `text` into at most `max_lines` lines of roughly `max_chars`
/// characters, joined with `\n`.
///
/// Lines are filled greedily. Once `max_lines - 1` lines are full, the rest
/// of the words go onto the final line as they are. Afterwards a short final line pulls one word down from the
/// line above it, and a single-word line pulls one word up from the line
/// below it. A single word is returned unchanged.
pub fn wrap_label(text: &str, max_chars: usize, max_lines: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.len() {
        0 => return String::new(),
        1 => return words[0].to_string(),
        _ => {}
    }
    let max_chars = max_chars.max(2);
    let max_lines = max_lines.max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut remainder_from = None;
    for (idx, word) in words.iter().enumerate() {
        let candidate = if current.is_empty() {
            (*word).to_string()
        } else {
            format!("{current} {word}")
        };
        if char_len(&candidate) <= max_chars {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current = (*word).to_string();
        if lines.len() + 1 >= max_lines {
            remainder_from = Some(idx);
            break;
        }
    }
    match remainder_from {
        Some(idx) => lines.push(words[idx..].join(" ")),
        None if !current.is_empty() && lines.len() < max_lines => lines.push(current),
        None => {}
    }

    if lines.len() > max_lines {
        return clamp_lines(lines, max_chars, max_lines).join("\n");
    }

    pull_down_orphan(&mut lines, max_chars);
    pull_up_widows(&mut lines);

    clamp_lines(lines, max_chars, max_lines).join("\n")
}

fn pull_down_orphan(lines: &mut [String], max_chars: usize) {
    let count = lines.len();
    if count < 2 {
        return;
    }
    let last = &lines[count - 1];
    let last_words: Vec<&str> = last.split_whitespace().collect();
    let min_len = MIN_LAST_CHARS.max((max_chars as f32 * MIN_LAST_RATIO).floor() as usize);
    let too_short = char_len(last) < min_len
        || (last_words.len() <= 2 && last_words.iter().all(|word| char_len(word) <= 3));
    if !too_short {
        return;
    }

    let mut prev_words: Vec<&str> = lines[count - 2].split_whitespace().collect();
    if prev_words.len() <= 1 {
        return;
    }
    let Some(moved) = prev_words.pop() else {
        return;
    };
    let new_last = if last.is_empty() {
        moved.to_string()
    } else {
        format!("{moved} {last}")
    };
    lines[count - 2] = prev_words.join(" ");
    lines[count - 1] = new_last;
}

fn pull_up_widows(lines: &mut [String]) {
    for idx in 0..lines.len().saturating_sub(1) {
        let head_words = lines[idx].split_whitespace().count();
        let mut next_words: Vec<String> = lines[idx + 1]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if head_words == 1 && next_words.len() > 1 {
            let moved = next_words.remove(0);
            lines[idx] = format!("{} {}", lines[idx].trim(), moved);
            lines[idx + 1] = next_words.join(" ");
        }
    }
}

fn clamp_lines(mut lines: Vec<String>, max_chars: usize, max_lines: usize) -> Vec<String> {
    if lines.len() <= max_lines {
        return lines;
    }
    let tail = lines.split_off(max_lines - 1).join(" ");
    lines.push(truncate(&tail, max_chars));
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Measures an already wrapped label for node sizing.
pub(crate) fn measure_label(wrapped: &str, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let mut lines: Vec<String> = wrapped.split('\n').map(str::to_string).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, theme.font_size, &theme.font_family, config.fast_text_metrics))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * theme.font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if fast {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|ch| match ch {
            ' ' => 0.28,
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' => 0.25,
            'm' | 'w' | 'M' | 'W' => 0.85,
            c if c.is_ascii_uppercase() => 0.66,
            _ => 0.56,
        })
        .sum::<f32>()
        * font_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_is_returned_unchanged() {
        assert_eq!(wrap_label("Short", 20, 3), "Short");
        assert_eq!(
            wrap_label("  Supercalifragilisticexpialidocious ", 20, 3),
            "Supercalifragilisticexpialidocious"
        );
        assert_eq!(wrap_label("   ", 20, 3), "");
    }

    #[test]
    fn short_phrase_stays_on_one_line() {
        assert_eq!(wrap_label("Customer demand", 20, 3), "Customer demand");
    }

    #[test]
    fn short_last_line_borrows_a_word() {
        assert_eq!(
            wrap_label("Number of customers waiting in line for service", 20, 3),
            "Number of customers\nwaiting in line\nfor service"
        );
    }

    #[test]
    fn remainder_fills_the_last_line_untouched() {
        let wrapped = wrap_label(
            "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu",
            20,
            3,
        );
        assert_eq!(
            wrapped,
            "alpha beta gamma\ndelta epsilon zeta\neta theta iota kappa lambda mu"
        );
    }

    #[test]
    fn collapsed_lines_are_truncated_with_ellipsis() {
        let lines: Vec<String> = ["one two", "three four", "five six", "seven"]
            .iter()
            .map(|line| line.to_string())
            .collect();
        assert_eq!(
            clamp_lines(lines, 12, 2),
            vec!["one two".to_string(), "three four \u{2026}".to_string()]
        );
    }

    #[test]
    fn two_tiny_words_count_as_an_orphan() {
        let mut lines = vec!["Stock of goods".to_string(), "per day".to_string()];
        pull_down_orphan(&mut lines, 12);
        assert_eq!(lines, vec!["Stock of", "goods per day"]);
    }

    #[test]
    fn long_enough_last_line_stays_put() {
        let mut lines = vec!["Stock of goods".to_string(), "per week".to_string()];
        pull_down_orphan(&mut lines, 12);
        assert_eq!(lines, vec!["Stock of goods", "per week"]);
    }

    #[test]
    fn single_word_line_pulls_next_word_up() {
        let mut lines = vec!["Inventory".to_string(), "level at the depot".to_string()];
        pull_up_widows(&mut lines);
        assert_eq!(lines, vec!["Inventory level", "at the depot"]);
    }

    #[test]
    fn never_exceeds_max_lines() {
        let samples = [
            "a b c d e f g h i j k l m n o p q r s t u v w x y z",
            "Perceived quality of the delivered product relative to the expectations of key customers",
            "Extraordinarilylongwordnumberone extraordinarilylongwordnumbertwo three four",
            "x y",
        ];
        for sample in samples {
            for max_lines in 1..=4 {
                let wrapped = wrap_label(sample, 20, max_lines);
                assert!(
                    wrapped.split('\n').count() <= max_lines,
                    "{sample:?} with {max_lines} lines gave {wrapped:?}"
                );
            }
        }
    }

    #[test]
    fn wrapping_is_pure() {
        let text = "Workload of the support team per week";
        assert_eq!(wrap_label(text, 24, 3), wrap_label(text, 24, 3));
    }

    #[test]
    fn measure_counts_lines() {
        let theme = Theme::classic();
        let config = LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        };
        let block = measure_label("one two\nthree", &theme, &config);
        assert_eq!(block.lines.len(), 2);
        assert!(block.width > 0.0);
        assert!((block.height - 2.0 * theme.font_size * config.label_line_height).abs() < 1e-3);
    }
}
