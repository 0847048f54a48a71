//! Case- and diacritic-insensitive text folding.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fold text for lexicon matching.
///
/// - Unicode NFD decomposition, then combining marks dropped (`não` → `nao`)
/// - Lowercase
/// - Anything that is not alphanumeric becomes a space
/// - Whitespace collapsed and trimmed
///
/// ```
/// use despacho_confirm::normalize::fold;
///
/// assert_eq!(fold("  Sim, CONFIRMO!! "), "sim confirmo");
/// assert_eq!(fold("Não envie"), "nao envie");
/// assert_eq!(fold("don't"), "don t");
/// ```
#[must_use]
pub fn fold(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold text and split it into tokens.
#[must_use]
pub fn tokens(text: &str) -> Vec<String> {
    fold(text).split(' ').filter(|t| !t.is_empty()).map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_diacritics_and_case() {
        assert_eq!(fold("ÓTIMO, pode mandar"), "otimo pode mandar");
        assert_eq!(fold("Çà et là"), "ca et la");
    }

    #[test]
    fn test_fold_collapses_whitespace_and_punctuation() {
        assert_eq!(fold("\tyes...\n please  "), "yes please");
        assert_eq!(fold("!!!"), "");
    }

    #[test]
    fn test_tokens() {
        assert_eq!(tokens("Ok, send it."), vec!["ok", "send", "it"]);
        assert!(tokens("  ").is_empty());
    }
}
