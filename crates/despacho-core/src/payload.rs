//! Action kinds and their kind-specific payloads.
//!
//! A payload is the content a draft proposes to act on: recipients, subject
//! and body for an email, or the cover fields of a DUIMP declaration. The
//! payload is replaced wholesale on every revision, except for targeted
//! corrections, which rewrite exactly one field via
//! [`ActionPayload::apply_correction`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fmt::Write as _;

use crate::error::{PayloadError, PayloadResult};

/// The kind of side-effecting action a draft proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Send an email.
    Email,
    /// Create a DUIMP import declaration.
    Duimp,
    /// Any other action kind supplied by the decision layer.
    Other,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Duimp => write!(f, "duimp"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// An email waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    #[serde(default)]
    pub body: String,
}

impl EmailDraft {
    /// Create an email draft with recipients and subject.
    #[must_use]
    pub fn new<I, S>(to: I, subject: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            to: to.into_iter().map(Into::into).collect(),
            cc: Vec::new(),
            subject: subject.into(),
            body: String::new(),
        }
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a carbon-copy recipient.
    #[must_use]
    pub fn with_cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }
}

/// Cover data of a DUIMP (Declaração Única de Importação) to be registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuimpDraft {
    /// Importer CNPJ, formatted `XX.XXX.XXX/XXXX-XX`.
    pub importer_cnpj: String,
    /// Importer trade name.
    #[serde(default)]
    pub importer_name: Option<String>,
    /// Internal process reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// NCM codes of the declared goods, formatted `dddd.dd.dd`.
    #[serde(default)]
    pub ncm_codes: Vec<String>,
    /// Incoterm (e.g. `FOB`, `CIF`).
    #[serde(default)]
    pub incoterm: Option<String>,
    /// Country of origin (ISO code).
    #[serde(default)]
    pub origin_country: Option<String>,
    /// Customs value as a decimal string (kept textual to avoid float drift).
    #[serde(default)]
    pub customs_value: Option<String>,
    /// Currency of the customs value.
    #[serde(default)]
    pub currency: Option<String>,
    /// Free-form notes for the broker.
    #[serde(default)]
    pub notes: Option<String>,
}

impl DuimpDraft {
    /// Create a DUIMP draft for the given importer CNPJ.
    #[must_use]
    pub fn new(importer_cnpj: impl Into<String>) -> Self {
        let raw = importer_cnpj.into();
        Self {
            importer_cnpj: format_cnpj(&raw).unwrap_or(raw),
            ..Self::default()
        }
    }

    /// Set the importer name.
    #[must_use]
    pub fn with_importer_name(mut self, name: impl Into<String>) -> Self {
        self.importer_name = Some(name.into());
        self
    }

    /// Set the process reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Add an NCM code.
    #[must_use]
    pub fn with_ncm(mut self, code: impl Into<String>) -> Self {
        let raw = code.into();
        self.ncm_codes.push(format_ncm(&raw).unwrap_or(raw));
        self
    }

    /// Set the customs value and its currency.
    #[must_use]
    pub fn with_customs_value(
        mut self,
        value: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        self.customs_value = Some(value.into());
        self.currency = Some(currency.into());
        self
    }
}

/// A payload for an action kind the core does not model explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDraft {
    /// Name of the action, as the decision layer reported it.
    pub name: String,
    /// Arbitrary fields.
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

/// Kind-specific content of a draft revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Email content.
    Email(EmailDraft),
    /// DUIMP cover data.
    Duimp(DuimpDraft),
    /// Anything else.
    Other(GenericDraft),
}

/// A field that a targeted correction can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadField {
    /// An email recipient address.
    EmailRecipient,
    /// The email subject line.
    EmailSubject,
    /// The DUIMP importer CNPJ.
    ImporterCnpj,
    /// One NCM code on a DUIMP.
    NcmCode,
}

impl PayloadField {
    /// The action kind this field belongs to.
    #[must_use]
    pub fn kind(self) -> ActionKind {
        match self {
            Self::EmailRecipient | Self::EmailSubject => ActionKind::Email,
            Self::ImporterCnpj | Self::NcmCode => ActionKind::Duimp,
        }
    }
}

impl fmt::Display for PayloadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailRecipient => write!(f, "recipient"),
            Self::EmailSubject => write!(f, "subject"),
            Self::ImporterCnpj => write!(f, "importer CNPJ"),
            Self::NcmCode => write!(f, "NCM code"),
        }
    }
}

/// A replacement value for one payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCorrection {
    /// Which field to replace.
    pub field: PayloadField,
    /// The new value.
    pub value: String,
}

impl FieldCorrection {
    /// Create a correction.
    #[must_use]
    pub fn new(field: PayloadField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl ActionPayload {
    /// The action kind of this payload.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Email(_) => ActionKind::Email,
            Self::Duimp(_) => ActionKind::Duimp,
            Self::Other(_) => ActionKind::Other,
        }
    }

    /// Return a copy of this payload with one field replaced.
    ///
    /// Every field other than the targeted one is carried over unchanged.
    ///
    /// # Errors
    ///
    /// - [`PayloadError::FieldNotApplicable`] if the field belongs to another kind
    /// - [`PayloadError::InvalidValue`] if the value is malformed for the field
    /// - [`PayloadError::AmbiguousCorrection`] if several existing values could be meant
    pub fn apply_correction(&self, correction: &FieldCorrection) -> PayloadResult<Self> {
        let field = correction.field;
        let value = correction.value.trim();
        let mut corrected = self.clone();

        match (&mut corrected, field) {
            (Self::Email(email), PayloadField::EmailRecipient) => {
                replace_recipient(&mut email.to, value)?;
            },
            (Self::Email(email), PayloadField::EmailSubject) => {
                if value.is_empty() {
                    return Err(PayloadError::InvalidValue {
                        field,
                        value: value.to_string(),
                    });
                }
                email.subject = value.to_string();
            },
            (Self::Duimp(duimp), PayloadField::ImporterCnpj) => {
                duimp.importer_cnpj =
                    format_cnpj(value).ok_or_else(|| PayloadError::InvalidValue {
                        field,
                        value: value.to_string(),
                    })?;
            },
            (Self::Duimp(duimp), PayloadField::NcmCode) => {
                replace_ncm(&mut duimp.ncm_codes, value)?;
            },
            (other, field) => {
                return Err(PayloadError::FieldNotApplicable {
                    field,
                    kind: other.kind(),
                });
            },
        }

        Ok(corrected)
    }

    /// Render a human-readable preview for the confirmation prompt.
    #[must_use]
    pub fn preview(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Email(email) => {
                let _ = writeln!(out, "Email draft");
                let _ = writeln!(out, "  To: {}", email.to.join(", "));
                if !email.cc.is_empty() {
                    let _ = writeln!(out, "  Cc: {}", email.cc.join(", "));
                }
                let _ = writeln!(out, "  Subject: {}", email.subject);
                if !email.body.is_empty() {
                    let _ = writeln!(out);
                    for line in email.body.lines() {
                        let _ = writeln!(out, "  {line}");
                    }
                }
            },
            Self::Duimp(duimp) => {
                let _ = writeln!(out, "DUIMP draft");
                match &duimp.importer_name {
                    Some(name) => {
                        let _ = writeln!(out, "  Importer: {name} (CNPJ {})", duimp.importer_cnpj);
                    },
                    None => {
                        let _ = writeln!(out, "  Importer CNPJ: {}", duimp.importer_cnpj);
                    },
                }
                if let Some(reference) = &duimp.reference {
                    let _ = writeln!(out, "  Reference: {reference}");
                }
                if !duimp.ncm_codes.is_empty() {
                    let _ = writeln!(out, "  NCM: {}", duimp.ncm_codes.join(", "));
                }
                if let Some(incoterm) = &duimp.incoterm {
                    let _ = writeln!(out, "  Incoterm: {incoterm}");
                }
                if let Some(origin) = &duimp.origin_country {
                    let _ = writeln!(out, "  Origin: {origin}");
                }
                if let Some(value) = &duimp.customs_value {
                    let currency = duimp.currency.as_deref().unwrap_or("");
                    let _ = writeln!(out, "  Customs value: {value} {currency}");
                }
                if let Some(notes) = &duimp.notes {
                    let _ = writeln!(out, "  Notes: {notes}");
                }
            },
            Self::Other(generic) => {
                let _ = writeln!(out, "{} draft", generic.name);
                for (key, value) in &generic.fields {
                    match value {
                        Value::String(s) => {
                            let _ = writeln!(out, "  {key}: {s}");
                        },
                        other => {
                            let _ = writeln!(out, "  {key}: {other}");
                        },
                    }
                }
            },
        }
        out.trim_end().to_string()
    }
}

/// Minimal shape check for an email address: one `@`, non-empty local part,
/// dotted domain, no whitespace.
fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
}

fn replace_recipient(to: &mut Vec<String>, value: &str) -> PayloadResult<()> {
    let field = PayloadField::EmailRecipient;
    if !looks_like_email(value) {
        return Err(PayloadError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }

    if to.len() <= 1 {
        to.clear();
        to.push(value.to_string());
        return Ok(());
    }

    // Several recipients: the one sharing a local part or domain with the
    // new address is the one being corrected.
    let (new_local, new_domain) = value.split_once('@').unwrap_or((value, ""));
    let candidates: Vec<usize> = to
        .iter()
        .enumerate()
        .filter(|(_, existing)| {
            let (local, domain) = existing.split_once('@').unwrap_or((existing.as_str(), ""));
            local.eq_ignore_ascii_case(new_local) || domain.eq_ignore_ascii_case(new_domain)
        })
        .map(|(i, _)| i)
        .collect();

    match candidates.as_slice() {
        [index] => {
            if let Some(slot) = to.get_mut(*index) {
                *slot = value.to_string();
            }
            Ok(())
        },
        [] => Err(PayloadError::AmbiguousCorrection {
            field,
            reason: format!("no existing recipient resembles {value}"),
        }),
        _ => Err(PayloadError::AmbiguousCorrection {
            field,
            reason: format!("several recipients resemble {value}"),
        }),
    }
}

fn replace_ncm(codes: &mut Vec<String>, value: &str) -> PayloadResult<()> {
    let field = PayloadField::NcmCode;
    let formatted = format_ncm(value).ok_or_else(|| PayloadError::InvalidValue {
        field,
        value: value.to_string(),
    })?;

    if codes.len() <= 1 {
        codes.clear();
        codes.push(formatted);
        return Ok(());
    }

    // Same heading (first four digits) identifies the code being fixed.
    let heading = &formatted[..4];
    let candidates: Vec<usize> = codes
        .iter()
        .enumerate()
        .filter(|(_, code)| code.starts_with(heading))
        .map(|(i, _)| i)
        .collect();

    match candidates.as_slice() {
        [index] => {
            if let Some(slot) = codes.get_mut(*index) {
                *slot = formatted;
            }
            Ok(())
        },
        _ => Err(PayloadError::AmbiguousCorrection {
            field,
            reason: format!("cannot tell which NCM code {formatted} replaces"),
        }),
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Format a CNPJ as `XX.XXX.XXX/XXXX-XX`. Returns `None` unless the input
/// carries exactly 14 digits.
#[must_use]
pub fn format_cnpj(value: &str) -> Option<String> {
    let d = digits(value);
    if d.len() != 14 {
        return None;
    }
    Some(format!(
        "{}.{}.{}/{}-{}",
        &d[0..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..14]
    ))
}

/// Format an NCM code as `dddd.dd.dd`. Returns `None` unless the input
/// carries exactly 8 digits.
#[must_use]
pub fn format_ncm(value: &str) -> Option<String> {
    let d = digits(value);
    if d.len() != 8 {
        return None;
    }
    Some(format!("{}.{}.{}", &d[0..4], &d[4..6], &d[6..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_email() -> ActionPayload {
        ActionPayload::Email(
            EmailDraft::new(["x@y.con"], "Meeting").with_body("Tomorrow at 10h, room 3."),
        )
    }

    fn duimp() -> ActionPayload {
        ActionPayload::Duimp(
            DuimpDraft::new("12345678000195")
                .with_importer_name("Acme Importadora")
                .with_ncm("8471.30.12")
                .with_ncm("85176277")
                .with_customs_value("15230.00", "USD"),
        )
    }

    #[test]
    fn test_kind() {
        assert_eq!(meeting_email().kind(), ActionKind::Email);
        assert_eq!(duimp().kind(), ActionKind::Duimp);
        assert_eq!(ActionKind::Duimp.to_string(), "duimp");
    }

    #[test]
    fn test_recipient_correction_preserves_other_fields() {
        let original = meeting_email();
        let corrected = original
            .apply_correction(&FieldCorrection::new(PayloadField::EmailRecipient, "x@y.com"))
            .unwrap();

        let (ActionPayload::Email(before), ActionPayload::Email(after)) = (&original, &corrected)
        else {
            panic!("expected email payloads");
        };
        assert_eq!(after.to, vec!["x@y.com".to_string()]);
        assert_eq!(after.subject, before.subject);
        assert_eq!(after.body, before.body);
        assert_eq!(after.cc, before.cc);
    }

    #[test]
    fn test_recipient_correction_picks_matching_recipient() {
        let payload = ActionPayload::Email(EmailDraft::new(
            ["ana@broker.com.br", "joao@acme.com"],
            "Invoice",
        ));
        let corrected = payload
            .apply_correction(&FieldCorrection::new(
                PayloadField::EmailRecipient,
                "joao@acme.com.br",
            ))
            .unwrap();
        let ActionPayload::Email(email) = corrected else {
            panic!("expected email");
        };
        assert_eq!(email.to, vec!["ana@broker.com.br", "joao@acme.com.br"]);
    }

    #[test]
    fn test_recipient_correction_ambiguous() {
        let payload = ActionPayload::Email(EmailDraft::new(["a@x.com", "b@x.com"], "Hi"));
        let err = payload
            .apply_correction(&FieldCorrection::new(PayloadField::EmailRecipient, "c@x.com"))
            .unwrap_err();
        assert!(matches!(err, PayloadError::AmbiguousCorrection { .. }));
    }

    #[test]
    fn test_recipient_correction_rejects_malformed() {
        let err = meeting_email()
            .apply_correction(&FieldCorrection::new(PayloadField::EmailRecipient, "not an email"))
            .unwrap_err();
        assert!(matches!(err, PayloadError::InvalidValue { .. }));
    }

    #[test]
    fn test_subject_correction() {
        let corrected = meeting_email()
            .apply_correction(&FieldCorrection::new(PayloadField::EmailSubject, "Reunião"))
            .unwrap();
        let ActionPayload::Email(email) = corrected else {
            panic!("expected email");
        };
        assert_eq!(email.subject, "Reunião");
        assert_eq!(email.to, vec!["x@y.con"]);
    }

    #[test]
    fn test_field_not_applicable() {
        let err = meeting_email()
            .apply_correction(&FieldCorrection::new(PayloadField::NcmCode, "84713012"))
            .unwrap_err();
        assert_eq!(
            err,
            PayloadError::FieldNotApplicable {
                field: PayloadField::NcmCode,
                kind: ActionKind::Email,
            }
        );
    }

    #[test]
    fn test_cnpj_correction_formats_digits() {
        let corrected = duimp()
            .apply_correction(&FieldCorrection::new(
                PayloadField::ImporterCnpj,
                "11.222.333/0001-81",
            ))
            .unwrap();
        let ActionPayload::Duimp(d) = corrected else {
            panic!("expected duimp");
        };
        assert_eq!(d.importer_cnpj, "11.222.333/0001-81");
        assert_eq!(d.ncm_codes.len(), 2);
        assert_eq!(d.importer_name.as_deref(), Some("Acme Importadora"));
    }

    #[test]
    fn test_ncm_correction_replaces_same_heading() {
        let corrected = duimp()
            .apply_correction(&FieldCorrection::new(PayloadField::NcmCode, "8471.30.19"))
            .unwrap();
        let ActionPayload::Duimp(d) = corrected else {
            panic!("expected duimp");
        };
        assert_eq!(d.ncm_codes, vec!["8471.30.19", "8517.62.77"]);
    }

    #[test]
    fn test_ncm_correction_unknown_heading_is_ambiguous() {
        let err = duimp()
            .apply_correction(&FieldCorrection::new(PayloadField::NcmCode, "0901.21.00"))
            .unwrap_err();
        assert!(matches!(err, PayloadError::AmbiguousCorrection { .. }));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_cnpj("12345678000195").as_deref(), Some("12.345.678/0001-95"));
        assert!(format_cnpj("1234").is_none());
        assert_eq!(format_ncm("84713012").as_deref(), Some("8471.30.12"));
        assert!(format_ncm("8471").is_none());
    }

    #[test]
    fn test_preview() {
        let preview = meeting_email().preview();
        assert!(preview.starts_with("Email draft"));
        assert!(preview.contains("To: x@y.con"));
        assert!(preview.contains("Subject: Meeting"));

        let preview = duimp().preview();
        assert!(preview.contains("Acme Importadora (CNPJ 12.345.678/0001-95)"));
        assert!(preview.contains("NCM: 8471.30.12, 8517.62.77"));
        assert!(preview.contains("Customs value: 15230.00 USD"));
    }

    #[test]
    fn test_payload_tagged_serialization() {
        let json = serde_json::to_value(meeting_email()).unwrap();
        assert_eq!(json["kind"], "email");
        assert_eq!(json["subject"], "Meeting");

        let parsed: ActionPayload = serde_json::from_value(serde_json::json!({
            "kind": "other",
            "name": "ptax_report",
            "fields": {"date": "2026-10-19"}
        }))
        .unwrap();
        assert_eq!(parsed.kind(), ActionKind::Other);
        assert!(parsed.preview().contains("date: 2026-10-19"));
    }
}
