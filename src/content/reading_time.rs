//! Reading-time estimate

use lazy_static::lazy_static;
use regex::Regex;

use super::post::ContentSection;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid regex");
}

/// Number of words in the bodies of all sections
pub fn word_count(sections: &[ContentSection]) -> usize {
    let text = sections
        .iter()
        .map(|s| s.body.as_text())
        .collect::<Vec<_>>()
        .join(" ");
    WORD.find_iter(&text).count()
}

/// Minutes needed to read the sections, rounded to the nearest minute
pub fn reading_time(sections: &[ContentSection], words_per_minute: usize) -> u32 {
    estimate(word_count(sections), words_per_minute)
}

/// `words / words_per_minute`, rounded half up
pub fn estimate(words: usize, words_per_minute: usize) -> u32 {
    if words == 0 || words_per_minute == 0 {
        return 0;
    }
    (words as f64 / words_per_minute as f64).round() as u32
}
