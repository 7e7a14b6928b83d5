//! Locale overlay for `Translatable` models.
//!
//! Reads of a translatable field resolve to the stored translation for the
//! active locale and fall back to the model's own value. Writes are validated
//! against the model's declared fields before anything touches the store, and
//! multi-row writes run in a single transaction.

use log::{debug, info};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::Result;
use crate::locale::{Locale, LocaleProvider};
use crate::orm::{Db, apply_migration_files};
use crate::settings::Settings;
use crate::translatable::{Translatable, TranslationMap, ensure_translatable};
use crate::translation::{self, Translation, TranslationFilter, TranslationStore};

#[derive(Clone, Debug)]
pub struct Translator {
    store: TranslationStore,
}

impl Translator {
    pub fn new(store: TranslationStore) -> Self {
        Translator { store }
    }

    /// Connect to `settings.database_url`, create the translations table and
    /// apply any migration files from `settings.migrations_dir`.
    pub async fn boot(settings: &Settings) -> Result<Self> {
        let db = Arc::new(Db::connect(&settings.database_url).await?);
        let store = TranslationStore::new(db.clone());
        store.migrate().await?;
        if let Some(dir) = &settings.migrations_dir {
            let applied = apply_migration_files(db, dir).await?;
            info!("Applied {} migration files from {}", applied, dir);
        }
        Ok(Translator::new(store))
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    /// Resolve `field` on `entity` for the provider's locale.
    ///
    /// Fields outside the translatable set, and translatable fields without a
    /// row for the locale, yield the entity's own value.
    pub async fn get_attribute<E: Translatable>(
        &self,
        entity: &E,
        field: &str,
        locale: impl LocaleProvider,
    ) -> Result<Option<Value>> {
        if !E::is_translatable(field) {
            return entity.base_attribute(field);
        }

        let locale = locale.current_locale();
        match self.store.find_one(&entity.owner(), field, &locale).await? {
            Some(translation) => Ok(Some(Value::String(translation.text))),
            None => {
                debug!(
                    "No `{}` translation for {}.{}, using stored value",
                    locale,
                    E::owner_type(),
                    field
                );
                entity.base_attribute(field)
            }
        }
    }

    /// Like `get_attribute`, rendering non-string values as JSON text.
    pub async fn get_text<E: Translatable>(
        &self,
        entity: &E,
        field: &str,
        locale: impl LocaleProvider,
    ) -> Result<Option<String>> {
        let value = self.get_attribute(entity, field, locale).await?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        })
    }

    /// Write `field -> text` pairs for the provider's locale.
    ///
    /// Every pair is written, each one updating the existing row for
    /// `(entity, field, locale)` or creating it. Nothing is written if any
    /// field is not translatable.
    pub async fn update_or_create<E, I, K, V>(
        &self,
        entity: &E,
        values: I,
        locale: impl LocaleProvider,
    ) -> Result<Vec<Translation>>
    where
        E: Translatable,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let locale = locale.current_locale();
        let pairs: Vec<(String, String)> = values
            .into_iter()
            .map(|(field, text)| (field.into(), text.into()))
            .collect();
        for (field, _) in &pairs {
            ensure_translatable::<E>(field)?;
        }

        let owner = entity.owner();
        let mut tx = self.store.begin().await?;
        let mut written = Vec::with_capacity(pairs.len());
        for (field, text) in &pairs {
            written.push(translation::upsert(&mut tx, &owner, field, &locale, text).await?);
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Upsert every `(field, locale, text)` triple of `translations`.
    ///
    /// Repeating a call with the same payload leaves the row set unchanged;
    /// changed texts overwrite the existing rows.
    pub async fn update_or_create_many<E: Translatable>(
        &self,
        entity: &E,
        translations: &TranslationMap,
    ) -> Result<()> {
        let triples = flatten::<E>(translations)?;
        let owner = entity.owner();

        let mut tx = self.store.begin().await?;
        for (field, locale, text) in &triples {
            translation::upsert(&mut tx, &owner, field, locale, text).await?;
        }
        tx.commit().await?;

        info!(
            "Stored {} translations for {}#{}",
            triples.len(),
            owner.owner_type,
            owner.owner_id
        );
        Ok(())
    }

    /// Insert every triple of `translations` as a new row.
    ///
    /// Fails, writing nothing, if any `(field, locale)` already has a row.
    pub async fn create_many<E: Translatable>(
        &self,
        entity: &E,
        translations: &TranslationMap,
    ) -> Result<Vec<Translation>> {
        let triples = flatten::<E>(translations)?;
        let owner = entity.owner();

        let mut tx = self.store.begin().await?;
        let mut created = Vec::with_capacity(triples.len());
        for (field, locale, text) in &triples {
            created.push(translation::insert(&mut tx, &owner, field, locale, text).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Whether `entity` owns a row matching `filter`. The filter's owner is
    /// always replaced by the entity.
    pub async fn has_translation<E: Translatable>(
        &self,
        entity: &E,
        filter: TranslationFilter,
    ) -> Result<bool> {
        self.store.exists(&filter.owner(entity.owner())).await
    }

    /// The entity's attributes with translatable fields resolved for the
    /// provider's locale. Other attributes are left as stored.
    pub async fn to_attributes<E: Translatable>(
        &self,
        entity: &E,
        locale: impl LocaleProvider,
    ) -> Result<Map<String, Value>> {
        let locale = locale.current_locale();
        let mut attributes = entity.attributes()?;
        let rows = self.store.find_all(&entity.owner(), &locale).await?;

        for field in E::translatable() {
            let Some(value) = attributes.get_mut(*field) else {
                continue;
            };
            if let Some(row) = rows.iter().find(|row| row.field == *field) {
                *value = Value::String(row.text.clone());
            }
        }
        Ok(attributes)
    }

    /// All translation rows owned by `entity`.
    pub async fn translations<E: Translatable>(&self, entity: &E) -> Result<Vec<Translation>> {
        self.store.for_owner(&entity.owner()).await
    }

    pub async fn translations_for<E: Translatable>(
        &self,
        entity: &E,
        locale: impl LocaleProvider,
    ) -> Result<Vec<Translation>> {
        self.store
            .find_all(&entity.owner(), &locale.current_locale())
            .await
    }

    /// Remove every translation row of `entity`. Owners call this when they
    /// delete the entity itself.
    pub async fn forget<E: Translatable>(&self, entity: &E) -> Result<u64> {
        let removed = self.store.delete_for_owner(&entity.owner()).await?;
        info!(
            "Removed {} translations for {}#{}",
            removed,
            E::owner_type(),
            entity.owner_id()
        );
        Ok(removed)
    }
}

/// Validate a batch payload into `(field, locale, text)` triples.
fn flatten<E: Translatable>(translations: &TranslationMap) -> Result<Vec<(String, Locale, String)>> {
    let mut triples = Vec::new();
    for (field, by_locale) in translations {
        ensure_translatable::<E>(field)?;
        for (code, text) in by_locale {
            triples.push((field.clone(), Locale::parse(code)?, text.clone()));
        }
    }
    Ok(triples)
}
