use super::SchemaBundle;
use super::message::cleanup_json_error_message;
use crate::core::{DescriptionError, Result};
use crate::document::Document;
use jsonschema::{ValidationError, Validator, error::ValidationErrorKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{Level, event};
use uuid::Uuid;

const GLOBAL_SCHEMA: &str = "global";

struct CompiledSchema {
    id: Uuid,
    schema: Value,
    validator: Validator,
}

impl CompiledSchema {
    fn compile(format_version: u32, name: &str, schema: Value) -> Result<Self> {
        let validator = jsonschema::validator_for(&schema).map_err(|err| {
            DescriptionError::SchemaError(format!(
                "Schema '{}' of format version {} does not compile: {}",
                name, format_version, err
            ))
        })?;
        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("sysdesc:schema:v{}:{}", format_version, name).as_bytes(),
        );
        Ok(Self {
            id,
            schema,
            validator,
        })
    }

    /// Raw reports in the `The property '#<pointer>' <description> in schema <id>#` form.
    fn raw_errors(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|error| {
                let pointer = error.instance_path.to_string();
                let pointer = if pointer.is_empty() { "/".to_string() } else { pointer };
                format!(
                    "The property '#{}' {} in schema {}#",
                    pointer,
                    describe(&error, &self.schema),
                    self.id
                )
            })
            .collect()
    }

    fn errors(&self, instance: &Value) -> Vec<String> {
        self.raw_errors(instance)
            .iter()
            .map(|raw| cleanup_json_error_message(raw))
            .collect()
    }
}

/// Structural validator bound to one format version.
pub struct SchemaValidator {
    format_version: u32,
    global: Option<CompiledSchema>,
    scopes: BTreeMap<String, CompiledSchema>,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("format_version", &self.format_version)
            .field("has_global_schema", &self.global.is_some())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaValidator {
    /// Validator for the bundle shipped with `format_version`.
    pub fn new(format_version: u32) -> Result<Self> {
        match SchemaBundle::builtin(format_version)? {
            Some(bundle) => Self::from_bundle(&bundle),
            None => Ok(Self::unbound(format_version)),
        }
    }

    pub fn from_bundle(bundle: &SchemaBundle) -> Result<Self> {
        let version = bundle.format_version;
        let global = CompiledSchema::compile(version, GLOBAL_SCHEMA, bundle.global.clone())?;

        let mut scopes = BTreeMap::new();
        for (name, fragment) in &bundle.scopes {
            let schema = with_shared_definitions(&bundle.global, fragment);
            scopes.insert(name.clone(), CompiledSchema::compile(version, name, schema)?);
        }

        Ok(Self {
            format_version: version,
            global: Some(global),
            scopes,
        })
    }

    /// A validator without schemas; it reports no errors.
    pub fn unbound(format_version: u32) -> Self {
        Self {
            format_version,
            global: None,
            scopes: BTreeMap::new(),
        }
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn knows_scope(&self, scope_name: &str) -> bool {
        self.scopes.contains_key(scope_name)
    }

    pub fn validate(&self, document: &Document) -> Vec<String> {
        self.validate_value(&document.to_value())
    }

    /// Validates a whole document given as raw JSON. Scope errors are
    /// prefixed with `In scope <name>: `.
    pub fn validate_value(&self, document: &Value) -> Vec<String> {
        let mut errors = match &self.global {
            Some(global) => global.errors(document),
            None => Vec::new(),
        };

        if let Some(members) = document.as_object() {
            for (scope_name, scope_data) in members {
                if scope_name == "meta" {
                    continue;
                }
                errors.extend(
                    self.validate_scope(scope_data, scope_name)
                        .into_iter()
                        .map(|message| format!("In scope {}: {}", scope_name, message)),
                );
            }
        }
        errors
    }

    /// Validates the data of one scope. Scopes without a schema in this
    /// version are accepted as they are.
    pub fn validate_scope(&self, scope_data: &Value, scope_name: &str) -> Vec<String> {
        match self.scopes.get(scope_name) {
            Some(compiled) => compiled.errors(scope_data),
            None => {
                event!(
                    Level::DEBUG,
                    scope = %scope_name,
                    format_version = self.format_version,
                    "no schema for scope"
                );
                Vec::new()
            }
        }
    }
}

/// Copies the global schema's `definitions` (and `$schema`) into a scope
/// fragment so `#/definitions/...` references resolve.
fn with_shared_definitions(global: &Value, fragment: &Value) -> Value {
    let mut schema = fragment.clone();
    let Some(target) = schema.as_object_mut() else {
        return schema;
    };

    if let Some(draft) = global.get("$schema") {
        target
            .entry("$schema")
            .or_insert_with(|| draft.clone());
    }
    if let Some(shared) = global.get("definitions").and_then(Value::as_object) {
        let definitions = target
            .entry("definitions")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(definitions) = definitions.as_object_mut() {
            for (name, definition) in shared {
                definitions
                    .entry(name.clone())
                    .or_insert_with(|| definition.clone());
            }
        }
    }
    schema
}

fn describe(error: &ValidationError<'_>, schema: &Value) -> String {
    let instance: &Value = &error.instance;
    match &error.kind {
        ValidationErrorKind::Required { property, .. } => {
            format!("did not contain a required property of '{}'", plain(property))
        }
        ValidationErrorKind::OneOfNotValid { .. } | ValidationErrorKind::AnyOf { .. } => {
            format!("of type {} did not match any of the required schemas", type_label(instance))
        }
        ValidationErrorKind::Enum { options, .. } => format!(
            "value {} did not match one of the following values: {}",
            plain(instance),
            listing(options)
        ),
        ValidationErrorKind::MinLength { limit, .. } => {
            format!("was not of a minimum string length of {}", limit)
        }
        ValidationErrorKind::Type { .. } => {
            match schema.pointer(&error.schema_path.to_string()) {
                Some(expected) => format!(
                    "of type {} did not match one or more of the following types: {}",
                    type_label(instance),
                    listing(expected)
                ),
                None => format!("of type {} {}", type_label(instance), error),
            }
        }
        _ => format!("of type {} {}", type_label(instance), error),
    }
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(number) if number.is_i64() || number.is_u64() => "Integer",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn listing(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(plain).collect::<Vec<_>>().join(", "),
        other => plain(other),
    }
}
