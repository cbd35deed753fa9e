//! Dictionary entry types.
//!
//! An [`Entry`] is one headword record as it appears in the source JSON
//! chunks. Fields the pipeline does not know about are carried through
//! untouched so a translated file is a strict superset of its input.

use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A source field that may be absent, explicitly `null`, or set.
///
/// The outer `Option` records whether the key was present at all, so a
/// record written back keeps exactly the keys it was read with.
pub type Field<T> = Option<Option<T>>;

/// One dictionary headword record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The headword as printed.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub word: Field<String>,

    /// Short English gloss.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub meaning: Field<String>,

    /// Turkish gloss, filled in by translation.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub meaning_tr: Field<String>,

    /// Full English entry body.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub full_entry_text: Field<String>,

    /// Full Turkish entry body, filled in by translation.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub full_entry_text_tr: Field<String>,

    /// Etymological classification (e.g. `Den. V.`).
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub etymology_type: Field<String>,

    /// Alternative spellings, in source order.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub variants: Field<Vec<String>>,

    /// Page reference; a number or a string depending on the source.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub page: Option<Value>,

    /// Any other fields present in the source record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Create an entry with a headword and English texts.
    pub fn new(
        word: impl Into<String>,
        meaning: impl Into<String>,
        full_entry_text: impl Into<String>,
    ) -> Self {
        Self {
            word: Some(Some(word.into())),
            meaning: Some(Some(meaning.into())),
            full_entry_text: Some(Some(full_entry_text.into())),
            ..Default::default()
        }
    }

    /// The headword, if set.
    pub fn word(&self) -> Option<&str> {
        self.word.as_ref().and_then(|w| w.as_deref())
    }

    /// The English gloss, empty when absent.
    pub fn meaning(&self) -> &str {
        text(self.meaning.as_ref())
    }

    /// The English entry body, empty when absent.
    pub fn full_entry_text(&self) -> &str {
        text(self.full_entry_text.as_ref())
    }

    /// The Turkish gloss, if set.
    pub fn meaning_tr(&self) -> Option<&str> {
        self.meaning_tr.as_ref().and_then(|t| t.as_deref())
    }

    /// The Turkish entry body, if set.
    pub fn full_entry_text_tr(&self) -> Option<&str> {
        self.full_entry_text_tr.as_ref().and_then(|t| t.as_deref())
    }

    /// Alternative spellings, empty when absent.
    pub fn variants(&self) -> &[String] {
        self.variants.as_ref().and_then(|v| v.as_deref()).unwrap_or(&[])
    }

    /// Store a translation in the Turkish fields.
    pub fn set_translation(&mut self, fields: &TranslatedFields) {
        self.meaning_tr = Some(Some(fields.meaning.clone()));
        self.full_entry_text_tr = Some(Some(fields.full_entry_text.clone()));
    }

    /// Page reference rendered as a string, the way the seeding endpoint stores it.
    pub fn page_string(&self) -> String {
        match &self.page {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Get a display string for logging.
    pub fn display_word(&self) -> String {
        match self.word() {
            Some(word) if word.chars().count() > 30 => {
                format!("{}...", word.chars().take(30).collect::<String>())
            }
            Some(word) => word.to_string(),
            None => "[no word]".to_string(),
        }
    }
}

fn text(field: Option<&Option<String>>) -> &str {
    field.and_then(|t| t.as_deref()).unwrap_or("")
}

/// Marks a key as present; `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// The two translatable fields of an entry.
///
/// This is both the element type of the request payload and of the array
/// the translation service is expected to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedFields {
    /// Gloss text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub meaning: String,

    /// Entry body text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_entry_text: String,
}

impl From<&Entry> for TranslatedFields {
    fn from(entry: &Entry) -> Self {
        Self {
            meaning: entry.meaning().to_string(),
            full_entry_text: entry.full_entry_text().to_string(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One record in the body of a `POST /seed` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    /// Headword.
    pub word: String,
    /// Canonical matching key derived from `word`.
    pub normalized_word: String,
    /// English gloss.
    pub meaning: String,
    /// Turkish gloss.
    pub meaning_tr: String,
    /// English entry body.
    pub full_entry_text: String,
    /// Turkish entry body.
    pub full_entry_text_tr: String,
    /// Etymological classification.
    pub etymology_type: String,
    /// Alternative spellings.
    pub variants: Vec<String>,
    /// Page reference.
    pub page: String,
}

impl From<&Entry> for SeedRecord {
    fn from(entry: &Entry) -> Self {
        let word = entry.word().unwrap_or_default().to_string();
        Self {
            normalized_word: normalize(&word),
            word,
            meaning: entry.meaning().to_string(),
            meaning_tr: entry.meaning_tr().unwrap_or_default().to_string(),
            full_entry_text: entry.full_entry_text().to_string(),
            full_entry_text_tr: entry.full_entry_text_tr().unwrap_or_default().to_string(),
            etymology_type: text(entry.etymology_type.as_ref()).to_string(),
            variants: entry.variants().to_vec(),
            page: entry.page_string(),
        }
    }
}
