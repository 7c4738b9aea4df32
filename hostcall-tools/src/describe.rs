//! Static shape descriptions for parameter and result types.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use hostcall_primitives::{Schema, SchemaBuilder};
use serde_json::Value;

/// Describes the shape of a type for schema generation and binding.
///
/// Implemented for primitives and standard containers here; user structs and
/// unit enums get it from `#[derive(Describe)]`, and structured tool inputs
/// from `#[derive(ToolInput)]`.
pub trait Describe {
    /// Whether the type accepts absence (`Option<T>`).
    const OPTIONAL: bool = false;

    /// Whether the type is a single structured tool input.
    const TOOL_INPUT: bool = false;

    /// Builds the schema for the type.
    fn describe(builder: &mut SchemaBuilder) -> Schema;

    /// Serialized default instance, for structured tool inputs.
    #[must_use]
    fn default_value() -> Option<Value> {
        None
    }

    /// Value bound when the caller supplies nothing; it deserializes as `Self`.
    #[must_use]
    fn zero_value() -> Value {
        Self::describe(&mut SchemaBuilder::new()).zero_value()
    }
}

macro_rules! describe_as {
    ($schema:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe(_builder: &mut SchemaBuilder) -> Schema {
                    $schema
                }
            }
        )+
    };
}

describe_as!(Schema::String => String, str);
describe_as!(Schema::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
describe_as!(Schema::Number => f32, f64);
describe_as!(Schema::Boolean => bool);

impl Describe for char {
    fn describe(_builder: &mut SchemaBuilder) -> Schema {
        Schema::String
    }

    fn zero_value() -> Value {
        Value::String('\0'.to_string())
    }
}

impl<T: Describe> Describe for Option<T> {
    const OPTIONAL: bool = true;

    fn describe(builder: &mut SchemaBuilder) -> Schema {
        T::describe(builder).nullable()
    }
}

macro_rules! describe_sequence {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl<T: Describe> Describe for $ty<T> {
                fn describe(builder: &mut SchemaBuilder) -> Schema {
                    Schema::array(T::describe(builder))
                }
            }
        )+
    };
}

describe_sequence!(Vec, VecDeque, BTreeSet);

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe(builder: &mut SchemaBuilder) -> Schema {
        Schema::array(T::describe(builder))
    }
}

impl<T: Describe> Describe for [T] {
    fn describe(builder: &mut SchemaBuilder) -> Schema {
        Schema::array(T::describe(builder))
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe(builder: &mut SchemaBuilder) -> Schema {
        Schema::array(T::describe(builder))
    }

    fn zero_value() -> Value {
        Value::Array(vec![T::zero_value(); N])
    }
}

macro_rules! describe_transparent {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl<T: Describe + ?Sized> Describe for $ty<T> {
                const OPTIONAL: bool = T::OPTIONAL;

                fn describe(builder: &mut SchemaBuilder) -> Schema {
                    T::describe(builder)
                }

                fn zero_value() -> Value {
                    T::zero_value()
                }
            }
        )+
    };
}

describe_transparent!(Box, Arc, Rc);

impl<T: Describe + ?Sized> Describe for &T {
    const OPTIONAL: bool = T::OPTIONAL;

    fn describe(builder: &mut SchemaBuilder) -> Schema {
        T::describe(builder)
    }

    fn zero_value() -> Value {
        T::zero_value()
    }
}

// Maps and raw JSON have no declared members, so they surface as open objects.
impl<V, S> Describe for HashMap<String, V, S> {
    fn describe(_builder: &mut SchemaBuilder) -> Schema {
        Schema::object("Map", Vec::new())
    }

    fn zero_value() -> Value {
        Value::Object(serde_json::Map::new())
    }
}

impl<V> Describe for BTreeMap<String, V> {
    fn describe(_builder: &mut SchemaBuilder) -> Schema {
        Schema::object("Map", Vec::new())
    }

    fn zero_value() -> Value {
        Value::Object(serde_json::Map::new())
    }
}

impl Describe for Value {
    fn describe(_builder: &mut SchemaBuilder) -> Schema {
        Schema::object("Value", Vec::new())
    }
}
