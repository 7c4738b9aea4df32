//! Structural value shapes used for tool metadata and catalog export.
//!
//! A [`Schema`] is a closed description of what a tool accepts or returns. It
//! carries no behaviour beyond structural equality, a zero-value projection,
//! and a JSON-Schema style rendering for discovery tooling.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shape of a value accepted or produced by a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schema {
    /// Text.
    String,
    /// Whole number.
    Integer,
    /// Floating point number.
    Number,
    /// Logical value.
    Boolean,
    /// One of a fixed set of member names.
    Enum {
        /// Member names in declaration order.
        names: Vec<String>,
    },
    /// Ordered collection of elements sharing one shape.
    Array {
        /// Shape of each element.
        items: Box<Schema>,
    },
    /// Structured value with named properties.
    ///
    /// Each distinct type is expanded once per build; later references to it
    /// carry no properties, which keeps self-referential types finite.
    Object {
        /// Name of the type the object was derived from.
        name: String,
        /// Properties in declaration order.
        properties: Vec<Property>,
    },
    /// Inner shape that may also be null.
    Nullable {
        /// Shape of the non-null value.
        inner: Box<Schema>,
    },
}

/// Named property of an object schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Field name as it appears on the wire.
    pub name: String,
    /// Shape of the field.
    pub schema: Schema,
    /// Whether callers must supply the field.
    pub required: bool,
}

impl Property {
    /// Creates a property description.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Schema, required: bool) -> Self {
        Self {
            name: name.into(),
            schema,
            required,
        }
    }
}

impl Schema {
    /// Creates an enum schema from member names.
    #[must_use]
    pub fn enumeration<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an array schema with the given element shape.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// Creates an object schema.
    #[must_use]
    pub fn object(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self::Object {
            name: name.into(),
            properties,
        }
    }

    /// Wraps the schema so that null is also accepted.
    ///
    /// Wrapping an already nullable schema is a no-op.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            nullable @ Self::Nullable { .. } => nullable,
            other => Self::Nullable {
                inner: Box::new(other),
            },
        }
    }

    /// Returns `true` for the nullable wrapper.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable { .. })
    }

    /// Returns the schema with any nullable wrapper removed.
    #[must_use]
    pub fn non_null(&self) -> &Schema {
        match self {
            Self::Nullable { inner } => inner.non_null(),
            other => other,
        }
    }

    /// Returns the object properties, or an empty slice for non-objects.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        match self.non_null() {
            Self::Object { properties, .. } => properties,
            _ => &[],
        }
    }

    /// Returns the enum member names, if this is an enum schema.
    #[must_use]
    pub fn enum_names(&self) -> Option<&[String]> {
        match self.non_null() {
            Self::Enum { names } => Some(names),
            _ => None,
        }
    }

    /// Returns `true` for shapes that are parsed from a single scalar string.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.non_null(),
            Self::String | Self::Integer | Self::Number | Self::Boolean | Self::Enum { .. }
        )
    }

    /// Zero value used when a parameter is not supplied and has no default.
    ///
    /// Objects have no meaningful zero and map to null, as do nullable shapes.
    #[must_use]
    pub fn zero_value(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Integer => Value::from(0),
            Self::Number => Value::from(0.0),
            Self::Boolean => Value::Bool(false),
            Self::Enum { names } => names
                .first()
                .map_or(Value::Null, |name| Value::from(name.as_str())),
            Self::Array { .. } => Value::Array(Vec::new()),
            Self::Object { .. } | Self::Nullable { .. } => Value::Null,
        }
    }

    /// Renders the schema in JSON-Schema form for external discovery tooling.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::String => type_only("string"),
            Self::Integer => type_only("integer"),
            Self::Number => type_only("number"),
            Self::Boolean => type_only("boolean"),
            Self::Enum { names } => serde_json::json!({
                "type": "string",
                "enum": names,
            }),
            Self::Array { items } => serde_json::json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
            Self::Object { name, properties } => {
                let mut props = Map::new();
                let mut required = Vec::new();
                for property in properties {
                    props.insert(property.name.clone(), property.schema.to_json_schema());
                    if property.required {
                        required.push(Value::from(property.name.as_str()));
                    }
                }
                serde_json::json!({
                    "type": "object",
                    "title": name,
                    "properties": props,
                    "required": required,
                })
            }
            Self::Nullable { inner } => {
                let mut rendered = inner.to_json_schema();
                if let Value::Object(map) = &mut rendered {
                    map.insert("nullable".into(), Value::Bool(true));
                }
                rendered
            }
        }
    }
}

fn type_only(name: &str) -> Value {
    serde_json::json!({ "type": name })
}

/// Builds schemas recursively while guarding against self-referential types.
///
/// Only types on the current expansion path are tracked, so a type that
/// appears twice side by side is expanded both times.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    expanding: HashSet<String>,
}

impl SchemaBuilder {
    /// Creates a builder with nothing in expansion.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands an object type unless it is already being expanded.
    ///
    /// A reference back to a type on the current path returns an object with
    /// no properties and `fields` is not invoked.
    pub fn object<F>(&mut self, type_name: &str, fields: F) -> Schema
    where
        F: FnOnce(&mut Self) -> Vec<Property>,
    {
        if !self.expanding.insert(type_name.to_owned()) {
            return Schema::object(type_name, Vec::new());
        }
        let properties = fields(self);
        self.expanding.remove(type_name);
        Schema::object(type_name, properties)
    }

    /// Returns `true` while `type_name` is being expanded by this builder.
    #[must_use]
    pub fn is_expanding(&self, type_name: &str) -> bool {
        self.expanding.contains(type_name)
    }
}
