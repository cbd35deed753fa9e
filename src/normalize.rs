//! Headword normalization.
//!
//! Produces the canonical key used to match user queries against
//! headwords: Turkic case folding, punctuation and digit stripping, and
//! folding of the transcription diacritics used in the dictionary.

use regex::Regex;
use std::sync::LazyLock;

static STRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\d*:/\s\-.()\[\]]").expect("strip pattern is a valid regex")
});

/// Diacritic-bearing characters and the ASCII base letter they fold to.
const FOLDS: [(&[char], char); 11] = [
    (&['ñ', 'ŋ'], 'n'),
    (&['ḏ', 'ḍ'], 'd'),
    (&['ṭ'], 't'),
    (&['ẓ'], 'z'),
    (&['ā', 'á', 'ă'], 'a'),
    (&['ī'], 'i'),
    (&['ū'], 'u'),
    (&['š'], 's'),
    (&['γ'], 'g'),
    (&['é', 'ä'], 'e'),
    (&['č'], 'c'),
];

/// Normalize a headword into its matching key.
///
/// ```
/// use clauson_sozluk::normalize::normalize;
///
/// assert_eq!(normalize("Kutadgu Bilig I:23"), "kutadgubiligı");
/// assert_eq!(normalize("ḏaŋ-"), "dan");
/// ```
pub fn normalize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    // Lowercased as one string; final sigma depends on its neighbours.
    let lowered = word
        .chars()
        .map(|c| match c {
            'I' => 'ı',
            'İ' => 'i',
            other => other,
        })
        .collect::<String>()
        .to_lowercase();

    STRIP
        .replace_all(&lowered, "")
        .chars()
        .map(fold_char)
        .collect()
}

fn fold_char(c: char) -> char {
    FOLDS
        .iter()
        .find(|(from, _)| from.contains(&c))
        .map_or(c, |(_, to)| *to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  - . "), "");
    }

    #[test]
    fn test_turkic_case_folding() {
        assert_eq!(normalize("Kutadgu Bilig I:23"), "kutadgubiligı");
        assert_eq!(normalize("İnçü"), "inçü");
        assert_eq!(normalize("IRK"), "ırk");
    }

    #[test]
    fn test_final_sigma() {
        assert_eq!(normalize("ΟΔΟΣ"), "οδος");
        assert_eq!(normalize("ΣΟΦΟΣ ΚΑΙ"), "σοφοςκαι");
    }

    #[test]
    fn test_strips_punctuation_and_digits() {
        assert_eq!(normalize("*ab-"), "ab");
        assert_eq!(normalize("a:b/c d.e(f)[g]"), "abcdefg");
        assert_eq!(normalize("tag2"), "tag");
    }

    #[test]
    fn test_folds_diacritics() {
        assert_eq!(normalize("ñŋḏḍṭẓāáăīūšγéäč"), "nnddtzaaaiusgeec");
        assert_eq!(normalize("ĀŠ"), "as");
    }

    #[test]
    fn test_unmapped_pass_through() {
        assert_eq!(normalize("öğüş"), "öğüş");
        assert_eq!(normalize("ə"), "ə");
    }

    #[test]
    fn test_idempotent() {
        for word in [
            "Kutadgu Bilig I:23",
            "İnçü",
            "ḏaŋ-",
            "ΣΟΦΟΣ",
            "ab (ab-) 12",
            "Ăγ...",
            "",
        ] {
            let once = normalize(word);
            assert_eq!(normalize(&once), once, "not idempotent for {word:?}");
        }
    }
}
