//! Extraction of single-field corrections from free text.
//!
//! Recognized fields, tried in this order:
//!
//! | Field | Accepted forms |
//! |---|---|
//! | email subject | `subject: ...`, `assunto: ...`, `change the subject to ...`, `muda o assunto para ...` |
//! | email recipient | any address; with several, the one after `to` / `para` / `pra` / `for` |
//! | importer CNPJ | 14 digits, with or without `XX.XXX.XXX/XXXX-XX` punctuation |
//! | NCM code | `dddd.dd.dd`, or 8 bare digits after the word `NCM` |

use std::sync::LazyLock;

use despacho_core::{FieldCorrection, PayloadField};
use regex::Regex;

static SUBJECT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:subject|assunto)\s*[:=]\s*(.+)$").expect("invalid regex")
});
static SUBJECT_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:subject|assunto)\s+(?:to|para|pra)\s+(.+)$").expect("invalid regex")
});
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}").expect("invalid regex")
});
static EMAIL_AFTER_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:to|para|pra|for)\s+([a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,})")
        .expect("invalid regex")
});
static CNPJ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}\b").expect("invalid regex")
});
static NCM_DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}\.\d{2}\.\d{2}\b").expect("invalid regex"));
static NCM_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bncm\b\D{0,20}?\b(\d{8})\b").expect("invalid regex")
});

/// Byte offset where an explicit subject value starts, if any.
///
/// Text from there on is data, not instruction, and is excluded from
/// revise-phrase matching.
pub(crate) fn field_value_start(utterance: &str) -> Option<usize> {
    [&*SUBJECT_MARKER, &*SUBJECT_TO]
        .iter()
        .filter_map(|re| re.find(utterance).map(|m| m.start()))
        .min()
}

fn unquote(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '«' | '»'))
        .trim()
}

fn subject(utterance: &str) -> Option<FieldCorrection> {
    let caps = SUBJECT_MARKER
        .captures(utterance)
        .or_else(|| SUBJECT_TO.captures(utterance))?;
    let value = unquote(caps.get(1)?.as_str());
    (!value.is_empty()).then(|| FieldCorrection::new(PayloadField::EmailSubject, value))
}

fn recipient(utterance: &str) -> Option<FieldCorrection> {
    let mut addresses: Vec<&str> = EMAIL.find_iter(utterance).map(|m| m.as_str()).collect();
    addresses.dedup_by(|a, b| a.eq_ignore_ascii_case(b));

    let chosen = match addresses.as_slice() {
        [] => return None,
        [only] => *only,
        _ => {
            // Several addresses: only the one introduced by "to"/"para" is unambiguous.
            let targets: Vec<&str> = EMAIL_AFTER_TO
                .captures_iter(utterance)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            match targets.as_slice() {
                [target] => *target,
                _ => return None,
            }
        },
    };
    Some(FieldCorrection::new(PayloadField::EmailRecipient, chosen))
}

fn cnpj(utterance: &str) -> Option<FieldCorrection> {
    let m = CNPJ.find(utterance)?;
    Some(FieldCorrection::new(PayloadField::ImporterCnpj, m.as_str()))
}

fn ncm(utterance: &str) -> Option<FieldCorrection> {
    let value = NCM_DOTTED
        .find(utterance)
        .map(|m| m.as_str())
        .or_else(|| {
            NCM_LABELLED
                .captures(utterance)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
        })?;
    Some(FieldCorrection::new(PayloadField::NcmCode, value))
}

/// Find a single-field correction in `utterance`.
///
/// Returns `None` when no field value is present, or when several values
/// compete and none is clearly the intended one.
#[must_use]
pub fn extract_correction(utterance: &str) -> Option<FieldCorrection> {
    subject(utterance)
        .or_else(|| recipient(utterance))
        .or_else(|| cnpj(utterance))
        .or_else(|| ncm(utterance))
}
