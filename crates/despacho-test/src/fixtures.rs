//! Payload and session fixtures.

use despacho_core::{ActionPayload, DuimpDraft, EmailDraft, SessionId};

/// A session id for tests.
#[must_use]
pub fn test_session(name: &str) -> SessionId {
    SessionId::new(format!("test-{name}"))
}

/// An email to a customs broker, with a short body.
#[must_use]
pub fn test_email() -> ActionPayload {
    ActionPayload::Email(
        EmailDraft::new(["broker@example.com"], "Shipment 4471 documents")
            .with_body("Please find the commercial invoice attached."),
    )
}

/// The same email with a more formal body.
#[must_use]
pub fn test_email_formal() -> ActionPayload {
    ActionPayload::Email(
        EmailDraft::new(["broker@example.com"], "Shipment 4471 documents").with_body(
            "Dear Sir or Madam,\n\nPlease find attached the commercial invoice for \
             shipment 4471.\n\nKind regards",
        ),
    )
}

/// A DUIMP declaration for a fixed importer.
#[must_use]
pub fn test_duimp() -> ActionPayload {
    ActionPayload::Duimp(
        DuimpDraft::new("12.345.678/0001-95")
            .with_importer_name("Importadora Exemplo Ltda")
            .with_reference("PO-4471")
            .with_ncm("8471.30.12"),
    )
}
