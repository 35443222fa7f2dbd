//! Static settings-field schema.
//!
//! Each job type declares a table of [`FieldDescriptor`]s. Serialization,
//! persistence and command substitution walk these tables instead of
//! inspecting live objects, so base fields and type fields merge generically.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

bitflags! {
    /// What a settings field is used for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FieldFlags: u8 {
        /// Editable through the transport layer.
        const WRITABLE = 1;
        /// Persisted in the servers document.
        const SETTINGS = 1 << 1;
        /// Available as a `{name}` placeholder in the startup command.
        const REPLACEMENT = 1 << 2;
    }
}

/// Value kind of a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    Object,
}

impl FieldKind {
    /// Whether `value` fits this kind. `null` is accepted for every kind.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null)
            | (Self::String, Value::String(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Float, Value::Number(_))
            | (Self::Object, Value::Object(_)) => true,
            (Self::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            _ => false,
        }
    }
}

/// Default value of a type-specific field, kept `const`-constructible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Null,
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Str(s) => Value::from(s),
            Self::Int(i) => Value::from(i),
            Self::Float(f) => Value::from(f),
            Self::Bool(b) => Value::from(b),
        }
    }
}

/// One entry of a job type's settings schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub flags: FieldFlags,
    /// Human-friendly label for UIs.
    pub label: Option<&'static str>,
    pub default: FieldDefault,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind, flags: FieldFlags) -> Self {
        Self {
            name,
            kind,
            flags,
            label: None,
            default: FieldDefault::Null,
        }
    }

    #[must_use]
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    #[must_use]
    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    /// Metadata form used by the nested snapshot: `{type, value, flags, name}`.
    pub fn describe(&self, value: Value) -> Value {
        serde_json::json!({
            "type": self.kind,
            "value": value,
            "flags": self.flags.bits(),
            "name": self.label,
        })
    }
}

const EDITABLE: FieldFlags = FieldFlags::SETTINGS.union(FieldFlags::WRITABLE);

/// Fields every job has, backed by `JobSettings`.
pub const BASE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("startup_command", FieldKind::String, EDITABLE)
        .with_label("Startup command"),
    FieldDescriptor::new("stop_command", FieldKind::String, EDITABLE).with_label("Stop command"),
    FieldDescriptor::new("start_indicator", FieldKind::String, EDITABLE)
        .with_label("Start indicator"),
    FieldDescriptor::new("auto_start", FieldKind::Bool, EDITABLE).with_label("Start automatically"),
    FieldDescriptor::new("restart_on_crash", FieldKind::Bool, EDITABLE)
        .with_label("Restart on crash"),
    FieldDescriptor::new("stop_timeout", FieldKind::Int, EDITABLE)
        .with_label("Stop timeout (seconds)"),
];

/// Render a field value for command substitution.
pub fn replacement_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
