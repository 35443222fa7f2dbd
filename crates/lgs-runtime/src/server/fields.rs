//! Settings-field access for a job, driven by the merged field schema.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard};

use lgs_core::fields::replacement_text;
use lgs_core::{BASE_FIELDS, CoreError, FieldDescriptor, FieldFlags, JobSettings, ServerRecord};
use serde_json::{Map, Value, json};
use tracing::warn;

use super::GameServer;
use crate::game_type::GameType;

/// Stored field values: the base settings plus type-specific extras.
#[derive(Debug, Clone)]
pub(crate) struct FieldValues {
    pub(crate) base: JobSettings,
    pub(crate) extra: Map<String, Value>,
}

impl FieldValues {
    pub(crate) fn defaults(kind: &dyn GameType) -> Self {
        let base = JobSettings::new(kind.startup_command(), kind.stop_command())
            .with_start_indicator(kind.start_indicator().map(String::from));
        Self {
            base,
            extra: Map::new(),
        }
    }
}

impl GameServer {
    pub(super) fn read_values(&self) -> RwLockReadGuard<'_, FieldValues> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_values(&self) -> RwLockWriteGuard<'_, FieldValues> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn type_field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.kind.fields().iter().find(|f| f.name == name)
    }

    /// Merged schema: the type's fields first, then base fields it does not shadow.
    pub fn schema(&self) -> Vec<&'static FieldDescriptor> {
        let own = self.kind.fields();
        own.iter()
            .chain(
                BASE_FIELDS
                    .iter()
                    .filter(|base| !own.iter().any(|f| f.name == base.name)),
            )
            .collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.type_field(name)
            .or_else(|| BASE_FIELDS.iter().find(|f| f.name == name))
    }

    /// Current value of a field, or `None` if the schema has no such field.
    pub fn field(&self, name: &str) -> Option<Value> {
        if let Some(descriptor) = self.type_field(name) {
            let values = self.read_values();
            return Some(
                values
                    .extra
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| descriptor.default.to_value()),
            );
        }
        self.read_values().base.get(name)
    }

    /// Set a writable field. Read-only, unknown and mistyped fields are rejected.
    pub fn set_field(&self, name: &str, value: Value) -> Result<(), CoreError> {
        self.write_field(name, value, true)
    }

    /// Apply persisted or caller-supplied field values.
    ///
    /// Unknown names are logged and skipped so documents written by other
    /// versions still load. Read-only fields are accepted here.
    pub fn apply_fields(&self, fields: &Map<String, Value>) -> Result<(), CoreError> {
        for (name, value) in fields {
            if self.descriptor(name).is_none() {
                warn!(job = %self.key, field = %name, "Ignoring unknown settings field");
                continue;
            }
            self.write_field(name, value.clone(), false)?;
        }
        Ok(())
    }

    fn write_field(&self, name: &str, value: Value, check_writable: bool) -> Result<(), CoreError> {
        let descriptor = self
            .descriptor(name)
            .ok_or_else(|| CoreError::invalid_field(name, "unknown field"))?;
        if check_writable && !descriptor.flags.contains(FieldFlags::WRITABLE) {
            return Err(CoreError::invalid_field(name, "field is read-only"));
        }
        if !descriptor.kind.accepts(&value) {
            return Err(CoreError::invalid_field(
                name,
                format!("expected a value of kind {:?}", descriptor.kind),
            ));
        }

        let is_type_field = self.type_field(name).is_some();
        let mut values = self.write_values();
        if is_type_field {
            values.extra.insert(name.to_string(), value);
        } else {
            values.base.set(name, &value)?;
        }
        Ok(())
    }

    /// Placeholder values for the startup command, from `REPLACEMENT` fields.
    pub fn replacements(&self) -> BTreeMap<String, String> {
        self.schema()
            .into_iter()
            .filter(|f| f.flags.contains(FieldFlags::REPLACEMENT))
            .map(|f| {
                let value = self.field(f.name).unwrap_or(Value::Null);
                (f.name.to_string(), replacement_text(&value))
            })
            .collect()
    }

    /// Snapshot of the job as JSON.
    ///
    /// * `flat`: `{type, id, <field>: value, ...}`, the persisted form.
    ///   Metadata is never included.
    /// * nested: `{type, id, status, settings: {...}}`, where each setting
    ///   is `{type, value, flags, name}` when `include_metadata` is set.
    ///
    /// `filter` keeps only fields sharing at least one flag with it.
    pub fn as_value(&self, include_metadata: bool, flat: bool, filter: Option<FieldFlags>) -> Value {
        let mut settings = Map::new();
        for descriptor in self.schema() {
            if let Some(filter) = filter
                && !descriptor.flags.intersects(filter)
            {
                continue;
            }
            let value = self.field(descriptor.name).unwrap_or(Value::Null);
            let entry = if include_metadata && !flat {
                descriptor.describe(value)
            } else {
                value
            };
            settings.insert(descriptor.name.to_string(), entry);
        }

        if flat {
            let mut out = Map::new();
            out.insert("type".into(), Value::from(self.key.game_type.clone()));
            out.insert("id".into(), Value::from(self.key.id.clone()));
            out.extend(settings);
            Value::Object(out)
        } else {
            json!({
                "type": self.key.game_type,
                "id": self.key.id,
                "status": self.status(),
                "settings": settings,
            })
        }
    }

    /// Persisted form of this job: every `SETTINGS` field.
    pub fn record(&self) -> ServerRecord {
        let Value::Object(mut flat) = self.as_value(false, true, Some(FieldFlags::SETTINGS)) else {
            return ServerRecord::new(&self.key, Map::new());
        };
        flat.remove("type");
        flat.remove("id");
        ServerRecord::new(&self.key, flat)
    }
}
