//! URL slugs derived from page titles.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turns titles into URL-safe filename stems.
#[derive(Debug, Clone)]
pub struct Slugifier {
    replacement: char,
}

impl Slugifier {
    /// Create a slugifier that joins words with `replacement`.
    pub fn new(replacement: char) -> Self {
        Self { replacement }
    }

    /// Convert a title to a slug.
    ///
    /// Lower-cases, transliterates German umlauts, strips diacritics and
    /// replaces every run of whitespace or punctuation with a single
    /// replacement character. Letters of other scripts are kept.
    pub fn slugify(&self, title: &str) -> String {
        let lowered = transliterate_german(&title.trim().to_lowercase());

        let mapped: String = lowered
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .map(|c| if c.is_alphanumeric() { c } else { self.replacement })
            .collect();

        mapped
            .split(self.replacement)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(&self.replacement.to_string())
    }
}

impl Default for Slugifier {
    fn default() -> Self {
        Self::new('-')
    }
}

fn transliterate_german(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out
}
