use serde::{Deserialize, Serialize};

/// Maximum word/character gap between the two option texts, in percent.
pub const MAX_LENGTH_GAP_PERCENT: f64 = 10.0;

/// Words that nudge a listener toward one option and must not appear in stimuli.
pub const PERSUASIVE_WORDS: [&str; 14] = [
    "best",
    "premium",
    "ideal",
    "perfect",
    "exclusive",
    "amazing",
    "excellent",
    "superior",
    "guaranteed",
    "unbeatable",
    "incredible",
    "exceptional",
    "outstanding",
    "recommended",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub sentences: usize,
    pub words: usize,
    pub characters: usize,
    pub numbers: usize,
    pub persuasive_words: Vec<String>,
    pub avg_word_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextComparison {
    pub stats_a: TextStats,
    pub stats_b: TextStats,
    pub sentence_diff: usize,
    pub word_diff: usize,
    pub word_diff_percent: f64,
    pub char_diff: usize,
    pub char_diff_percent: f64,
    pub number_diff: usize,
    pub balanced: bool,
    pub issues: Vec<String>,
}

/// Counts the surface features used to balance option texts.
///
/// Sentences are the non-blank pieces between periods; numbers are runs of
/// digits with an optional decimal part.
#[must_use]
pub fn analyze_text(text: &str) -> TextStats {
    let sentences = text.split('.').filter(|s| !s.trim().is_empty()).count();
    let words: Vec<&str> = text.split_whitespace().collect();
    let letters: usize = words.iter().map(|w| w.chars().count()).sum();

    let mut persuasive_words = Vec::new();
    for word in &words {
        let normalized: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if PERSUASIVE_WORDS.contains(&normalized.as_str()) && !persuasive_words.contains(&normalized)
        {
            persuasive_words.push(normalized);
        }
    }

    let avg_word_length = if words.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let avg = letters as f64 / words.len() as f64;
        (avg * 10.0).round() / 10.0
    };

    TextStats {
        sentences,
        words: words.len(),
        characters: text.chars().count(),
        numbers: count_numbers(text),
        persuasive_words,
        avg_word_length,
    }
}

/// Compares two option texts and lists every balance violation.
#[must_use]
pub fn compare_texts(option_a: &str, option_b: &str) -> TextComparison {
    let stats_a = analyze_text(option_a);
    let stats_b = analyze_text(option_b);

    let sentence_diff = stats_a.sentences.abs_diff(stats_b.sentences);
    let word_diff = stats_a.words.abs_diff(stats_b.words);
    let char_diff = stats_a.characters.abs_diff(stats_b.characters);
    let number_diff = stats_a.numbers.abs_diff(stats_b.numbers);
    let word_diff_percent = percent_of_larger(word_diff, stats_a.words.max(stats_b.words));
    let char_diff_percent =
        percent_of_larger(char_diff, stats_a.characters.max(stats_b.characters));

    let mut issues = Vec::new();
    if sentence_diff > 0 {
        issues.push(format!(
            "Sentence count differs ({} vs {})",
            stats_a.sentences, stats_b.sentences
        ));
    }
    if word_diff_percent > MAX_LENGTH_GAP_PERCENT {
        issues.push(format!("Word count differs by {word_diff_percent:.1}%"));
    }
    if char_diff_percent > MAX_LENGTH_GAP_PERCENT {
        issues.push(format!("Character count differs by {char_diff_percent:.1}%"));
    }
    if number_diff > 0 {
        issues.push(format!(
            "Numeric value count differs ({} vs {})",
            stats_a.numbers, stats_b.numbers
        ));
    }
    for (label, stats) in [("A", &stats_a), ("B", &stats_b)] {
        if !stats.persuasive_words.is_empty() {
            issues.push(format!(
                "Option {label} uses persuasive language: {}",
                stats.persuasive_words.join(", ")
            ));
        }
    }

    TextComparison {
        balanced: issues.is_empty(),
        stats_a,
        stats_b,
        sentence_diff,
        word_diff,
        word_diff_percent,
        char_diff,
        char_diff_percent,
        number_diff,
        issues,
    }
}

fn percent_of_larger(diff: usize, larger: usize) -> f64 {
    if larger == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let percent = diff as f64 / larger as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

fn count_numbers(text: &str) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut count = 0;
    let mut idx = 0;
    while idx < chars.len() {
        if !chars[idx].is_ascii_digit() {
            idx += 1;
            continue;
        }
        count += 1;
        while idx < chars.len() && chars[idx].is_ascii_digit() {
            idx += 1;
        }
        // Decimal part only when a digit follows the point.
        if idx + 1 < chars.len() && chars[idx] == '.' && chars[idx + 1].is_ascii_digit() {
            idx += 1;
            while idx < chars.len() && chars[idx].is_ascii_digit() {
                idx += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sentences_words_and_numbers() {
        let stats = analyze_text("The plan costs €8.99 per month. It includes 40GB of data.");
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.words, 11);
        assert_eq!(stats.numbers, 2);
        assert!(stats.persuasive_words.is_empty());
    }

    #[test]
    fn flags_persuasive_language_once() {
        let stats = analyze_text("The best card. Truly the BEST, premium choice.");
        assert_eq!(stats.persuasive_words, vec!["best", "premium"]);
    }

    #[test]
    fn matching_texts_are_balanced() {
        let cmp = compare_texts(
            "Card A has a fee of 49 euros. Cashback is 1 percent.",
            "Card B has a fee of 0 euros. Cashback is 2 percent.",
        );
        assert!(cmp.balanced, "issues: {:?}", cmp.issues);
        assert_eq!(cmp.number_diff, 0);
    }

    #[test]
    fn reports_every_imbalance() {
        let cmp = compare_texts(
            "Plan A costs 35 euros. It is the ideal plan for families.",
            "Plan B costs less.",
        );
        assert!(!cmp.balanced);
        assert_eq!(cmp.sentence_diff, 1);
        assert_eq!(cmp.number_diff, 1);
        assert!(cmp.issues.iter().any(|i| i.starts_with("Word count differs")));
        assert!(cmp.issues.iter().any(|i| i.contains("ideal")));
    }

    #[test]
    fn empty_texts_do_not_divide_by_zero() {
        let cmp = compare_texts("", "");
        assert!(cmp.balanced);
        assert_eq!(cmp.word_diff_percent, 0.0);
    }
}
