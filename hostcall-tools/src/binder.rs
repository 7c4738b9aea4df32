//! Turns an untyped request into the ordered arguments a tool expects.
//!
//! Conversion is permissive: values that cannot be converted are treated as
//! not supplied, so the parameter falls back to its default or zero value.
//! A converted value must also deserialize into the parameter's Rust type,
//! so an out-of-range integer degrades the same way. The one exception is an
//! enum member that matches nothing, which is reported as
//! [`ToolError::Binding`] unless a positional default exists.

use hostcall_primitives::{Property, RequestContext, Schema};
use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::{BoundArgs, InputShape, Param, ToolError, ToolMetadata, ToolResult, TypeCheck};

/// Binds the request's body and parameters to the tool's declared inputs.
///
/// # Errors
///
/// Returns [`ToolError::Binding`] when an enum-typed argument names no
/// declared member and no default applies.
pub fn bind_arguments(
    metadata: &ToolMetadata,
    context: &dyn RequestContext,
) -> ToolResult<BoundArgs> {
    let body_param = metadata.body_param();
    match metadata.input_shape() {
        InputShape::Positional { params } => params
            .iter()
            .map(|param| bind_positional(param, body_param, context))
            .collect::<ToolResult<Vec<_>>>()
            .map(BoundArgs::new),
        InputShape::Structured {
            fields,
            default,
            check,
            ..
        } => bind_structured(fields, default, *check, body_param, context)
            .map(|input| BoundArgs::new(vec![input])),
    }
}

fn bind_positional(
    param: &Param,
    body_param: Option<&str>,
    context: &dyn RequestContext,
) -> ToolResult<Value> {
    let sourced = match source(&param.name, &param.schema, body_param, context) {
        Err(err) if err.is_binding() && param.default.is_some() => {
            trace!(param = %param.name, %err, "falling back to declared default");
            None
        }
        other => other?,
    };
    let fitting = sourced.filter(|value| {
        let fits = param.check.accepts(value);
        if !fits {
            trace!(param = %param.name, %value, "value does not fit the parameter type");
        }
        fits
    });
    Ok(fitting
        .or_else(|| param.default.clone())
        .unwrap_or_else(|| param.check.zero(&param.schema)))
}

fn bind_structured(
    fields: &[Param],
    default: &Value,
    check: TypeCheck,
    body_param: Option<&str>,
    context: &dyn RequestContext,
) -> ToolResult<Value> {
    let mut input = match default {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let checked = check.accepts(&Value::Object(input.clone()));
    for field in fields {
        let Some(value) = source(&field.name, &field.schema, body_param, context)? else {
            continue;
        };
        let previous = input.insert(field.name.clone(), value);
        if checked && !check.accepts(&Value::Object(input.clone())) {
            trace!(field = %field.name, "value does not fit the input type");
            match previous {
                Some(previous) => input.insert(field.name.clone(), previous),
                None => input.remove(&field.name),
            };
        }
    }
    Ok(Value::Object(input))
}

fn source(
    name: &str,
    schema: &Schema,
    body_param: Option<&str>,
    context: &dyn RequestContext,
) -> ToolResult<Option<Value>> {
    if body_param == Some(name) {
        if let Some(raw) = parse_body(context.body(), schema) {
            if let Some(value) = convert(name, schema, raw)? {
                return Ok(Some(value));
            }
        }
    }
    match context.param(name) {
        Some(raw) => convert(name, schema, raw),
        None => Ok(None),
    }
}

fn parse_body(body: &str, schema: &Schema) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    let parsed = serde_json::from_str::<Value>(body).ok();
    if schema.is_scalar() {
        // Quoted or bare JSON scalars are accepted; anything else is raw text.
        match parsed {
            Some(value) if !value.is_array() && !value.is_object() => Some(value),
            _ => Some(Value::String(body.to_owned())),
        }
    } else {
        parsed
    }
}

/// Converts a raw value into the shape described by `schema`.
///
/// `Ok(None)` means the value could not be used and should be treated as not
/// supplied.
///
/// # Errors
///
/// Returns [`ToolError::Binding`] when an enum member cannot be resolved,
/// including inside arrays and objects.
pub fn convert(field: &str, schema: &Schema, raw: Value) -> ToolResult<Option<Value>> {
    match schema {
        Schema::Nullable { inner } => {
            if raw.is_null() {
                Ok(Some(Value::Null))
            } else {
                convert(field, inner, raw)
            }
        }
        _ if raw.is_null() => Ok(None),
        Schema::String => Ok(text(raw)),
        Schema::Integer => Ok(integer(&raw)),
        Schema::Number => Ok(number(&raw)),
        Schema::Boolean => Ok(boolean(&raw)),
        Schema::Enum { names } => member(field, names, &raw).map(Some),
        Schema::Array { items } => array(field, items, raw),
        Schema::Object { properties, .. } => object(field, properties, raw),
    }
}

fn text(raw: Value) -> Option<Value> {
    match raw {
        Value::String(_) => Some(raw),
        Value::Number(number) => Some(Value::String(number.to_string())),
        Value::Bool(flag) => Some(Value::String(flag.to_string())),
        _ => None,
    }
}

fn integer(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(raw.clone()),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .map(Value::from)
                .or_else(|_| text.parse::<u64>().map(Value::from))
                .ok()
        }
        _ => None,
    }
}

fn number(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(_) => Some(raw.clone()),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn boolean(raw: &Value) -> Option<Value> {
    match raw {
        Value::Bool(_) => Some(raw.clone()),
        Value::Number(number) => match number.as_u64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        Value::String(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") || text == "1" {
                Some(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") || text == "0" {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn member(field: &str, names: &[String], raw: &Value) -> ToolResult<Value> {
    let index = match raw {
        Value::String(text) => {
            let text = text.trim();
            names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(text))
                .or_else(|| text.parse::<usize>().ok().filter(|i| *i < names.len()))
        }
        Value::Number(number) => number
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < names.len()),
        _ => None,
    };
    index
        .map(|i| Value::String(names[i].clone()))
        .ok_or_else(|| ToolError::Binding {
            field: field.to_owned(),
            value: match raw {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            expected: names.to_vec(),
        })
}

fn array(field: &str, items: &Schema, raw: Value) -> ToolResult<Option<Value>> {
    let elements = match raw {
        Value::Array(elements) => elements,
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(elements)) => elements,
            _ if items.is_scalar() => text
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_owned()))
                .collect(),
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };

    let mut converted = Vec::with_capacity(elements.len());
    for element in elements {
        match convert(field, items, element)? {
            Some(value) => converted.push(value),
            None => return Ok(None),
        }
    }
    Ok(Some(Value::Array(converted)))
}

fn object(field: &str, properties: &[Property], raw: Value) -> ToolResult<Option<Value>> {
    let map = match raw {
        Value::Object(map) => map,
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };
    if properties.is_empty() {
        return Ok(Some(Value::Object(map)));
    }

    let mut converted = Map::with_capacity(map.len());
    for (key, value) in map {
        match properties.iter().find(|property| property.name == key) {
            Some(property) => {
                let path = format!("{field}.{key}");
                if let Some(value) = convert(&path, &property.schema, value)? {
                    converted.insert(key, value);
                }
            }
            None => {
                converted.insert(key, value);
            }
        }
    }
    Ok(Some(Value::Object(converted)))
}
