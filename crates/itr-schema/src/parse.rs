//! Reading accepted values back out of a built return document.

use std::collections::BTreeMap;

use itr_core::{amount_from_json, FieldCode, FieldId};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::BuildError;

fn malformed(reason: impl Into<String>) -> BuildError {
    BuildError::MalformedDocument {
        reason: reason.into(),
    }
}

/// Collect every line item in `document` into `field → amount`.
///
/// For any document produced by [`crate::ReturnBuilder::build`] this
/// reproduces the resolved values the document was built from.
///
/// # Errors
///
/// `MalformedDocument` when the `ITR.<form>` envelope is missing, a line
/// item has an unknown code or unparsable amount, or a field appears twice.
pub fn parse_resolved_fields(document: &Value) -> Result<BTreeMap<FieldId, Decimal>, BuildError> {
    let envelope = document
        .get("ITR")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing ITR envelope"))?;
    let mut forms = envelope.values();
    let form = match (forms.next(), forms.next()) {
        (Some(Value::Object(form)), None) => form,
        _ => return Err(malformed("ITR envelope must hold exactly one form")),
    };

    let mut out = BTreeMap::new();
    for (section, body) in form {
        let Some(items) = body.get("LineItems") else {
            continue;
        };
        let items = items
            .as_array()
            .ok_or_else(|| malformed(format!("{section}.LineItems is not an array")))?;
        for (i, item) in items.iter().enumerate() {
            let at = format!("{section}.LineItems[{i}]");
            let label = item
                .get("Code")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(format!("{at}: missing Code")))?;
            let code = FieldCode::from_schema_label(label)
                .ok_or_else(|| malformed(format!("{at}: unknown code {label:?}")))?;
            let field = match item.get("Ref") {
                None | Some(Value::Null) => FieldId::new(code),
                Some(Value::String(instance)) => FieldId::with_instance(code, instance.as_str())
                    .map_err(|e| malformed(format!("{at}: {e}")))?,
                Some(other) => return Err(malformed(format!("{at}: Ref must be a string, got {other}"))),
            };
            let amount = item
                .get("Amount")
                .ok_or_else(|| malformed(format!("{at}: missing Amount")))
                .and_then(|v| {
                    amount_from_json(&field.to_string(), v).map_err(|e| malformed(format!("{at}: {e}")))
                })?;
            if out.insert(field.clone(), amount).is_some() {
                return Err(malformed(format!("{at}: duplicate field {field}")));
            }
        }
    }
    Ok(out)
}
