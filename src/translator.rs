//! Translation of one batch through a [`CompletionService`].
//!
//! The client sends the two translatable fields of every entry as a JSON
//! array and expects an array of the same length back. Answers wrapped in
//! a markdown code fence are unwrapped before parsing; answers that still
//! do not fit the contract are reported as [`Translation::Passthrough`]
//! rather than as errors.

use crate::entry::{Entry, TranslatedFields};
use crate::service::{CompletionService, ServiceError};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::Write;
use tracing::{debug, warn};

/// Instruction profile sent as the system prompt.
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are an expert translator specializing in Turkic etymology and historical linguistics.
Translate the 'meaning' and 'full_entry_text' fields of the given dictionary entries from English to Turkish.

Rules:
1. Never translate content inside <b>...</b> or <i>...</i> tags; copy it exactly.
2. Never translate lowercase Roman numerals (e.g. xı, vııı, xv) or citations (e.g. 'Kaş. I', 'KB 45').
3. Translate only the English definitions, descriptions and grammatical notes outside of tags.
4. If 'meaning' is empty, return it as an empty string. Do not invent a meaning.
5. Keep all punctuation, special characters and tags exactly as they are.
6. Use natural Turkish word order and academic linguistic terminology
   (Den. V. -> İsimden Fiil, Dev. N. -> Fiilden İsim, See -> Bkz., Cf. -> Krş., l.-w. -> alıntı kelime).

Output format:
Return ONLY a JSON array of objects, each with 'meaning' and 'full_entry_text' fields.
The array must contain exactly as many objects as the input, in the same order.
Do not wrap the JSON in markdown code blocks."#;

/// Result of translating one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// One translated record per input entry, in input order.
    Translated(Vec<TranslatedFields>),
    /// No usable translation; the batch keeps its original content.
    Passthrough(String),
}

impl Translation {
    /// Whether the batch received a translation.
    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated(_))
    }
}

/// Client that translates batches of entries.
#[derive(Debug)]
pub struct TranslationClient<S> {
    service: S,
    instructions: String,
}

impl<S: CompletionService> TranslationClient<S> {
    /// Create a client with the default instruction profile.
    pub fn new(service: S) -> Self {
        Self::with_instructions(service, DEFAULT_INSTRUCTIONS)
    }

    /// Create a client with a custom instruction profile.
    pub fn with_instructions(service: S, instructions: impl Into<String>) -> Self {
        Self {
            service,
            instructions: instructions.into(),
        }
    }

    /// The underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Translate a batch using `credential`.
    ///
    /// Service failures are returned as errors for the caller's retry
    /// policy; a response that does not honour the array contract is a
    /// successful [`Translation::Passthrough`].
    pub async fn translate(
        &self,
        credential: &str,
        batch: &[Entry],
    ) -> Result<Translation, ServiceError> {
        let payload = build_payload(batch);
        let text = self
            .service
            .complete(credential, &self.instructions, &payload)
            .await?;

        if text.trim().is_empty() {
            warn!(size = batch.len(), "Empty response, keeping batch untranslated");
            return Ok(Translation::Passthrough("empty response".to_string()));
        }

        match parse_translations(&text, batch.len()) {
            Some(fields) => Ok(Translation::Translated(fields)),
            None => {
                let received = describe_shape(&escape_control_chars(repair_response(&text)));
                warn!(
                    expected = batch.len(),
                    received = %received,
                    "Response does not match batch, keeping batch untranslated"
                );
                Ok(Translation::Passthrough(format!(
                    "expected {} items, received {received}",
                    batch.len()
                )))
            }
        }
    }
}

/// Serialize the translatable fields of a batch, in order.
pub fn build_payload(batch: &[Entry]) -> String {
    let fields: Vec<TranslatedFields> = batch.iter().map(TranslatedFields::from).collect();
    // Vec of plain string structs cannot fail to serialize.
    serde_json::to_string(&fields).unwrap_or_else(|_| "[]".to_string())
}

/// Strip surrounding whitespace and a markdown code fence, if any.
pub fn repair_response(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop an optional language tag on the opening fence line.
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Escape raw control characters that appear inside JSON string literals.
///
/// Models often emit literal newlines or tabs in long entry bodies, which
/// strict JSON rejects. Whitespace between tokens is left as it is.
pub fn escape_control_chars(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| c < ' ') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if !in_string {
            in_string = c == '"';
            out.push(c);
            continue;
        }

        match c {
            _ if escaped => {
                escaped = false;
                out.push(c);
            }
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < ' ' => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Parse a repaired response into exactly `expected_len` records.
pub fn parse_translations(text: &str, expected_len: usize) -> Option<Vec<TranslatedFields>> {
    let repaired = escape_control_chars(repair_response(text));
    let fields: Vec<TranslatedFields> = match serde_json::from_str(&repaired) {
        Ok(fields) => fields,
        Err(e) => {
            debug!(error = %e, "Response is not a translation array");
            return None;
        }
    };

    (fields.len() == expected_len).then_some(fields)
}

fn describe_shape(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => format!("{} items", items.len()),
        Ok(_) => "a non-array value".to_string(),
        Err(_) => "invalid JSON".to_string(),
    }
}
