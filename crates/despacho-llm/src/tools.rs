//! Tools offered to the model and their mapping to payloads.

use despacho_core::{ActionKind, ActionPayload, DuimpDraft, EmailDraft, GenericDraft, format_cnpj, format_ncm};
use serde_json::{Value, json};

use crate::error::{LlmError, LlmResult};
use crate::types::{ToolCall, ToolDefinition};

/// Tool that proposes an email.
pub const SEND_EMAIL: &str = "send_email";
/// Tool that proposes a DUIMP.
pub const CREATE_DUIMP: &str = "create_duimp";

/// Definition of the `send_email` tool.
#[must_use]
pub fn send_email_tool() -> ToolDefinition {
    ToolDefinition {
        name: SEND_EMAIL.to_string(),
        description: "Draft an email. The user will see a preview and must confirm before it is sent."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "to": {"type": "array", "items": {"type": "string"}, "description": "Recipient addresses"},
                "cc": {"type": "array", "items": {"type": "string"}},
                "subject": {"type": "string"},
                "body": {"type": "string", "description": "Plain-text body"}
            },
            "required": ["to", "subject", "body"]
        }),
    }
}

/// Definition of the `create_duimp` tool.
#[must_use]
pub fn create_duimp_tool() -> ToolDefinition {
    ToolDefinition {
        name: CREATE_DUIMP.to_string(),
        description: "Draft a DUIMP import declaration. The user must confirm before it is registered."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "importer_cnpj": {"type": "string", "description": "14-digit CNPJ"},
                "importer_name": {"type": "string"},
                "reference": {"type": "string"},
                "ncm_codes": {"type": "array", "items": {"type": "string"}, "description": "8-digit NCM codes"},
                "incoterm": {"type": "string"},
                "origin_country": {"type": "string"},
                "customs_value": {"type": "string"},
                "currency": {"type": "string"},
                "notes": {"type": "string"}
            },
            "required": ["importer_cnpj", "ncm_codes"]
        }),
    }
}

/// All action tools.
#[must_use]
pub fn action_tools() -> Vec<ToolDefinition> {
    vec![send_email_tool(), create_duimp_tool()]
}

/// The tool that produces payloads of `kind`, if there is one.
#[must_use]
pub fn tool_for_kind(kind: ActionKind) -> Option<ToolDefinition> {
    match kind {
        ActionKind::Email => Some(send_email_tool()),
        ActionKind::Duimp => Some(create_duimp_tool()),
        ActionKind::Other => None,
    }
}

fn invalid(tool: &str, message: impl Into<String>) -> LlmError {
    LlmError::InvalidToolArguments {
        tool: tool.to_string(),
        message: message.into(),
    }
}

/// Convert a tool call into a payload.
///
/// CNPJ and NCM values are normalized to their punctuated forms. Unknown
/// tools become [`ActionPayload::Other`].
///
/// # Errors
///
/// Returns [`LlmError::InvalidToolArguments`] if the arguments do not match
/// the tool's schema.
pub fn payload_from_tool_call(call: &ToolCall) -> LlmResult<ActionPayload> {
    match call.name.as_str() {
        SEND_EMAIL => {
            let email: EmailDraft = serde_json::from_value(call.arguments.clone())
                .map_err(|e| invalid(&call.name, e.to_string()))?;
            if email.to.is_empty() {
                return Err(invalid(&call.name, "no recipients"));
            }
            Ok(ActionPayload::Email(email))
        },
        CREATE_DUIMP => {
            let mut duimp: DuimpDraft = serde_json::from_value(call.arguments.clone())
                .map_err(|e| invalid(&call.name, e.to_string()))?;
            duimp.importer_cnpj = format_cnpj(&duimp.importer_cnpj)
                .ok_or_else(|| invalid(&call.name, format!("bad CNPJ {}", duimp.importer_cnpj)))?;
            duimp.ncm_codes = duimp
                .ncm_codes
                .iter()
                .map(|code| format_ncm(code).ok_or_else(|| invalid(&call.name, format!("bad NCM {code}"))))
                .collect::<LlmResult<_>>()?;
            Ok(ActionPayload::Duimp(duimp))
        },
        other => {
            let fields = match &call.arguments {
                Value::Object(map) => map.clone(),
                _ => return Err(invalid(other, "arguments must be an object")),
            };
            Ok(ActionPayload::Other(GenericDraft {
                name: other.to_string(),
                fields,
            }))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn test_email_tool_call() {
        let payload = payload_from_tool_call(&call(
            SEND_EMAIL,
            json!({"to": ["alice@example.com"], "subject": "Report", "body": "Attached."}),
        ))
        .unwrap();
        let ActionPayload::Email(email) = payload else {
            panic!("expected email");
        };
        assert_eq!(email.to, vec!["alice@example.com"]);
        assert!(email.cc.is_empty());
    }

    #[test]
    fn test_email_without_recipients_is_rejected() {
        let err = payload_from_tool_call(&call(SEND_EMAIL, json!({"to": [], "subject": "x"}))).unwrap_err();
        assert!(matches!(err, LlmError::InvalidToolArguments { .. }));
    }

    #[test]
    fn test_duimp_tool_call_normalizes_codes() {
        let payload = payload_from_tool_call(&call(
            CREATE_DUIMP,
            json!({"importer_cnpj": "12345678000195", "ncm_codes": ["84713012"], "incoterm": "FOB"}),
        ))
        .unwrap();
        let ActionPayload::Duimp(duimp) = payload else {
            panic!("expected duimp");
        };
        assert_eq!(duimp.importer_cnpj, "12.345.678/0001-95");
        assert_eq!(duimp.ncm_codes, vec!["8471.30.12"]);
        assert_eq!(duimp.incoterm.as_deref(), Some("FOB"));
    }

    #[test]
    fn test_duimp_bad_cnpj() {
        let err = payload_from_tool_call(&call(
            CREATE_DUIMP,
            json!({"importer_cnpj": "123", "ncm_codes": []}),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("bad CNPJ"));
    }

    #[test]
    fn test_unknown_tool_becomes_generic() {
        let payload = payload_from_tool_call(&call("track_shipment", json!({"bl": "MSCU123"}))).unwrap();
        assert_eq!(payload.kind(), ActionKind::Other);
    }

    #[test]
    fn test_tool_for_kind() {
        assert_eq!(tool_for_kind(ActionKind::Duimp).unwrap().name, CREATE_DUIMP);
        assert!(tool_for_kind(ActionKind::Other).is_none());
        assert_eq!(action_tools().len(), 2);
    }
}
