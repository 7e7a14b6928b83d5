use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, TranslateError};
use crate::translation::Owner;

/// Nested `field -> locale -> text` payload for batch writes.
pub type TranslationMap = BTreeMap<String, BTreeMap<String, String>>;

/// A model whose declared fields can carry per-locale translations.
///
/// The base attribute values come from the model's `Serialize` impl, so a
/// field is readable through the overlay exactly when it is serialized.
///
/// ```ignore
/// #[derive(Serialize)]
/// struct Post { id: i64, title: String, body: String }
///
/// impl Translatable for Post {
///     fn owner_type() -> &'static str { "post" }
///     fn owner_id(&self) -> i64 { self.id }
///     fn translatable() -> &'static [&'static str] { &["title", "body"] }
/// }
/// ```
pub trait Translatable: Serialize + Send + Sync {
    /// Discriminator stored alongside each translation row. Changing it
    /// orphans every row already written for the model.
    fn owner_type() -> &'static str;

    fn owner_id(&self) -> i64;

    fn translatable() -> &'static [&'static str];

    fn is_translatable(field: &str) -> bool {
        Self::translatable()
            .iter()
            .any(|declared| *declared == field)
    }

    fn owner(&self) -> Owner {
        Owner::new(Self::owner_type(), self.owner_id())
    }

    /// The stored attributes, without any translation applied.
    fn attributes(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn base_attribute(&self, field: &str) -> Result<Option<Value>> {
        Ok(self.attributes()?.remove(field))
    }
}

pub(crate) fn ensure_translatable<E: Translatable>(field: &str) -> Result<()> {
    if E::is_translatable(field) {
        Ok(())
    } else {
        Err(TranslateError::NotTranslatableField {
            owner_type: E::owner_type(),
            field: field.to_string(),
        })
    }
}
