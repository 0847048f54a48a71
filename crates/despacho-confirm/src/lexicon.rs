//! Recognized word sets for confirmation, cancellation, and revision.
//!
//! Entries are phrases; they are folded with [`fold`](crate::normalize::fold)
//! and stored as token lists, so `"pode enviar"` matches `"Pode   ENVIAR!"`.

use std::collections::HashSet;

use crate::normalize::tokens;

const CONFIRM: &[&str] = &[
    // English
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "k", "confirm", "confirmed",
    "send", "send it", "go", "go ahead", "do it", "proceed", "approve", "approved",
    "looks good", "lgtm", "perfect", "correct", "right",
    // Portuguese
    "sim", "s", "claro", "confirmo", "confirma", "confirmar", "confirmado", "manda", "mande",
    "envia", "envie", "enviar", "pode enviar", "pode mandar", "pode seguir", "segue", "isso",
    "perfeito", "certo", "beleza", "fechado", "ta bom", "esta bom", "otimo",
];

const CANCEL: &[&str] = &[
    // English
    "no", "n", "nope", "nah", "cancel", "cancel it", "stop", "abort", "discard", "never mind",
    "nevermind", "forget it", "forget", "don t send", "do not send", "don t",
    // Portuguese
    "nao", "cancela", "cancelar", "cancele", "para", "pare", "esquece", "esqueca", "deixa",
    "deixa pra la", "descarta", "descartar", "desisto", "nao envie", "nao envia", "nao manda",
    "nao mande",
];

const REVISE: &[&str] = &[
    // English
    "improve", "improve it", "rewrite", "rephrase", "reword", "redo", "polish", "revise",
    "make it better", "make it shorter", "make it longer", "shorter", "longer", "more formal",
    "less formal", "more polite", "more concise",
    // Portuguese
    "melhore", "melhora", "melhorar", "reescreva", "reescreve", "refaca", "refaz", "revisa",
    "revisar", "mais formal", "menos formal", "mais curto", "mais curta", "mais educado",
    "mais educada", "mais objetivo", "encurte", "resuma",
];

/// Words that may open a revision request without changing it, as in
/// "can you improve it" or "por favor, deixa mais formal".
const LEAD_IN: &[&str] = &[
    // English
    "can", "could", "would", "will", "you", "please", "pls", "plz", "just", "now", "then", "ok",
    "okay", "and", "make", "it", "try", "to",
    // Portuguese
    "pode", "poderia", "voce", "vc", "por", "favor", "pf", "agora", "entao", "e", "deixa", "deixe",
    "faz", "faca", "tenta", "torne", "torna", "o", "a",
];

const FILLER: &[&str] = &[
    // English
    "please", "pls", "plz", "thanks", "thank", "you", "it", "that", "this", "the", "a", "and",
    "now", "then", "just", "email", "draft", "message", "declaration",
    // Portuguese
    "por", "favor", "pf", "obrigado", "obrigada", "valeu", "pode", "entao", "agora", "e", "o",
    "a", "os", "as", "isso", "esse", "essa", "ele", "ela", "mesmo", "email", "rascunho",
    "mensagem", "declaracao", "duimp",
];

/// A closed set of phrases per intent, plus filler words that may surround
/// them without changing the meaning.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    confirm: Vec<Vec<String>>,
    cancel: Vec<Vec<String>>,
    revise: Vec<Vec<String>>,
    lead_in: HashSet<String>,
    filler: HashSet<String>,
}

fn add_phrases<I, S>(target: &mut Vec<Vec<String>>, phrases: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for phrase in phrases {
        let folded = tokens(phrase.as_ref());
        if !folded.is_empty() && !target.contains(&folded) {
            target.push(folded);
        }
    }
    // Longest phrase first so greedy matching prefers "go ahead" over "go".
    target.sort_by(|a, b| b.len().cmp(&a.len()));
}

impl Lexicon {
    /// A lexicon with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// English and Portuguese defaults.
    #[must_use]
    pub fn builtin() -> Self {
        Self::empty()
            .with_confirm(CONFIRM)
            .with_cancel(CANCEL)
            .with_revise(REVISE)
            .with_lead_in(LEAD_IN)
            .with_filler(FILLER)
    }

    /// Add confirmation phrases.
    #[must_use]
    pub fn with_confirm<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        add_phrases(&mut self.confirm, phrases);
        self
    }

    /// Add cancellation phrases.
    #[must_use]
    pub fn with_cancel<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        add_phrases(&mut self.cancel, phrases);
        self
    }

    /// Add revision-request phrases.
    #[must_use]
    pub fn with_revise<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        add_phrases(&mut self.revise, phrases);
        self
    }

    /// Add words allowed before a revision phrase.
    #[must_use]
    pub fn with_lead_in<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            self.lead_in.extend(tokens(word.as_ref()));
        }
        self
    }

    /// Add filler words. Multi-word entries contribute each of their tokens.
    #[must_use]
    pub fn with_filler<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            self.filler.extend(tokens(word.as_ref()));
        }
        self
    }

    /// Whether the folded utterance is exactly one confirmation phrase.
    #[must_use]
    pub fn is_exact_confirm(&self, words: &[String]) -> bool {
        !words.is_empty() && self.confirm.iter().any(|p| p.as_slice() == words)
    }

    /// Whether the utterance consists only of confirmation phrases and filler,
    /// with at least one confirmation phrase.
    #[must_use]
    pub fn is_confirm(&self, words: &[String]) -> bool {
        covers(words, &self.confirm, &self.filler)
    }

    /// Whether the utterance consists only of cancellation phrases and filler,
    /// with at least one cancellation phrase.
    #[must_use]
    pub fn is_cancel(&self, words: &[String]) -> bool {
        covers(words, &self.cancel, &self.filler)
    }

    /// Whether the utterance opens with a revision phrase, optionally after
    /// lead-in words. Whatever follows the phrase is the instruction.
    ///
    /// "what is the shorter route?" does not qualify: "shorter" is not where
    /// the request starts.
    #[must_use]
    pub fn is_revise(&self, words: &[String]) -> bool {
        let mut rest = words;
        loop {
            if self.revise.iter().any(|p| rest.starts_with(p)) {
                return true;
            }
            match rest.split_first() {
                Some((first, tail)) if self.lead_in.contains(first) => rest = tail,
                _ => return false,
            }
        }
    }
}

/// Greedy left-to-right cover of `words` by `phrases` and `filler`.
fn covers(words: &[String], phrases: &[Vec<String>], filler: &HashSet<String>) -> bool {
    let mut rest = words;
    let mut matched = false;
    while !rest.is_empty() {
        if let Some(phrase) = phrases.iter().find(|p| rest.starts_with(p)) {
            rest = &rest[phrase.len()..];
            matched = true;
        } else if let Some((first, tail)) = rest.split_first()
            && filler.contains(first)
        {
            rest = tail;
        } else {
            return false;
        }
    }
    matched
}
