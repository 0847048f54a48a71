//! Reply classification.

use despacho_core::ActionKind;
use tracing::{debug, warn};

use crate::correction::{extract_correction, field_value_start};
use crate::intent::Intent;
use crate::lexicon::Lexicon;
use crate::normalize::tokens;

/// Classifies replies to a pending draft.
///
/// Precedence, first match wins:
///
/// 1. the whole reply is one confirmation phrase → [`Intent::Confirm`]
/// 2. only cancellation phrases and filler → [`Intent::Cancel`]
/// 3. the reply opens with a revision phrase → [`Intent::Revise`]
/// 4. a single field value can be extracted → [`Intent::Correct`]
/// 5. only confirmation phrases and filler → [`Intent::Confirm`]
/// 6. anything else → [`Intent::Unrelated`]
///
/// "yes, but send it to b@x.com" is therefore a correction: the draft is
/// revised and shown again rather than sent.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationDetector {
    lexicon: Lexicon,
}

impl ConfirmationDetector {
    /// Create a detector over the given lexicon.
    #[must_use]
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Create a detector with the built-in English and Portuguese lexicon.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(Lexicon::builtin())
    }

    /// The lexicon in use.
    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Classify a reply.
    ///
    /// Callers only ask when a draft is pending. Without one nothing can be
    /// confirmed, so the answer is always [`Intent::Unrelated`].
    #[must_use]
    pub fn classify(&self, utterance: &str, has_pending_action: bool) -> Intent {
        if !has_pending_action {
            warn!("Confirmation detector invoked without a pending action");
            return Intent::Unrelated;
        }
        let intent = self.classify_pending(utterance);
        debug!(intent = %intent, "Classified reply");
        intent
    }

    /// Classify a reply to a pending draft of `kind`.
    ///
    /// Corrections naming a field that `kind` does not have are treated as
    /// [`Intent::Unrelated`].
    #[must_use]
    pub fn classify_for(&self, utterance: &str, kind: ActionKind) -> Intent {
        match self.classify(utterance, true) {
            Intent::Correct(correction) if correction.field.kind() != kind => {
                debug!(
                    field = %correction.field,
                    kind = %kind,
                    "Correction does not apply to pending draft"
                );
                Intent::Unrelated
            },
            intent => intent,
        }
    }

    fn classify_pending(&self, utterance: &str) -> Intent {
        let words = tokens(utterance);
        if words.is_empty() {
            return Intent::Unrelated;
        }
        if self.lexicon.is_exact_confirm(&words) {
            return Intent::Confirm;
        }
        if self.lexicon.is_cancel(&words) {
            return Intent::Cancel;
        }

        let instruction_part = field_value_start(utterance)
            .and_then(|start| utterance.get(..start))
            .unwrap_or(utterance);
        if self.lexicon.is_revise(&tokens(instruction_part)) {
            return Intent::Revise {
                instruction: utterance.trim().to_string(),
            };
        }

        if let Some(correction) = extract_correction(utterance) {
            return Intent::Correct(correction);
        }
        if self.lexicon.is_confirm(&words) {
            return Intent::Confirm;
        }
        Intent::Unrelated
    }
}
