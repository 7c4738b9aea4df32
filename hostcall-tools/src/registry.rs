//! Tool discovery, validation, and metadata construction.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use hostcall_primitives::{Property, Schema, SchemaBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{BoundArgs, Describe, Invocation, Invoker, ToolError, ToolResult};

/// How a tool's caller and body relate in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallingConvention {
    /// Body returns a value directly; the caller waits for it.
    Synchronous,
    /// Body returns a future of a value; the caller waits for it.
    AsyncWithResult,
    /// Body returns nothing (or a future of nothing); the caller does not wait.
    FireAndForget,
}

impl CallingConvention {
    /// Classifies a declared return shape.
    ///
    /// `is_future` is whether the declared type is a future; `yields_value`
    /// is whether it (or its output) carries anything other than unit.
    #[must_use]
    pub const fn from_return_shape(is_future: bool, yields_value: bool) -> Self {
        match (is_future, yields_value) {
            (_, false) => Self::FireAndForget,
            (true, true) => Self::AsyncWithResult,
            (false, true) => Self::Synchronous,
        }
    }

    /// Returns `true` when a caller waits for the tool's outcome.
    #[must_use]
    pub const fn is_result_bearing(self) -> bool {
        !matches!(self, Self::FireAndForget)
    }
}

/// Whether a candidate can be called without an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Receiver {
    /// Free function or associated function without `self`.
    None,
    /// Method that needs an instance.
    Instance,
}

/// Visibility of a candidate outside its defining crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Declared `pub`.
    Public,
    /// Any narrower visibility.
    Restricted,
}

/// Checks bound values against the Rust type a parameter deserializes into.
///
/// Metadata read back from JSON carries no type, so its check accepts
/// everything and its zero comes from the schema.
#[derive(Clone, Copy, Default)]
pub struct TypeCheck {
    typed: Option<(fn(&Value) -> bool, fn() -> Value)>,
}

impl TypeCheck {
    /// Check for values bound to `T`.
    #[must_use]
    pub fn of<T: Describe + DeserializeOwned>() -> Self {
        Self {
            typed: Some((fits::<T>, T::zero_value)),
        }
    }

    /// Returns `true` when `value` deserializes into the checked type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        self.typed.is_none_or(|(accepts, _)| accepts(value))
    }

    /// Value bound when nothing usable was supplied.
    #[must_use]
    pub fn zero(&self, schema: &Schema) -> Value {
        self.typed.map_or_else(|| schema.zero_value(), |(_, zero)| zero())
    }
}

fn fits<T: DeserializeOwned>(value: &Value) -> bool {
    T::deserialize(value).is_ok()
}

// Checks take no part in metadata equality.
impl PartialEq for TypeCheck {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for TypeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCheck")
            .field("typed", &self.typed.is_some())
            .finish()
    }
}

/// Static description of one declared parameter.
#[derive(Clone)]
pub struct ParamSpec {
    name: &'static str,
    describe: fn(&mut SchemaBuilder) -> Schema,
    optional: bool,
    tool_input: bool,
    input_default: fn() -> Option<Value>,
    check: TypeCheck,
    default: Option<Value>,
}

impl ParamSpec {
    /// Describes a parameter of type `T`.
    #[must_use]
    pub fn of<T: Describe + DeserializeOwned>(name: &'static str) -> Self {
        Self {
            name,
            describe: T::describe,
            optional: T::OPTIONAL,
            tool_input: T::TOOL_INPUT,
            input_default: T::default_value,
            check: TypeCheck::of::<T>(),
            default: None,
        }
    }

    /// Declares the value used when the caller supplies none.
    #[must_use]
    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .field("tool_input", &self.tool_input)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Static type information of a candidate, evaluated at registry build time.
#[derive(Clone, Debug)]
pub struct Signature {
    convention: CallingConvention,
    params: Vec<ParamSpec>,
    output: Option<OutputSpec>,
}

#[derive(Clone)]
struct OutputSpec {
    type_name: &'static str,
    describe: fn(&mut SchemaBuilder) -> Schema,
}

impl fmt::Debug for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSpec")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl Signature {
    /// Starts a signature with the given calling convention.
    #[must_use]
    pub fn new(convention: CallingConvention) -> Self {
        Self {
            convention,
            params: Vec::new(),
            output: None,
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Declares the result type for result-bearing tools.
    #[must_use]
    pub fn returns<T: Describe + ?Sized>(mut self) -> Self {
        self.output = Some(OutputSpec {
            type_name: std::any::type_name::<T>(),
            describe: T::describe,
        });
        self
    }

    /// Calling convention.
    #[must_use]
    pub const fn convention(&self) -> CallingConvention {
        self.convention
    }

    /// Declared parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

/// A callable offered for registration, with its declarative metadata.
///
/// `#[tool]` submits one of these per annotated function; all fields are
/// plain data so candidates can live in statics.
#[derive(Clone, Copy)]
pub struct ToolCandidate {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Transport method hint such as `GET` or `POST`.
    pub method: Option<&'static str>,
    /// Free-form tags for discovery tooling.
    pub tags: &'static [&'static str],
    /// Parameter or field sourced from the request body.
    pub body_field: Option<&'static str>,
    /// Visibility of the underlying function.
    pub visibility: Visibility,
    /// Whether the function needs an instance.
    pub receiver: Receiver,
    /// Lazily evaluated static type information.
    pub signature: fn() -> Signature,
    /// Type-erased entry point.
    pub invoker: Invoker,
}

inventory::collect!(ToolCandidate);

impl ToolCandidate {
    /// Creates a public, receiver-free candidate with empty metadata.
    #[must_use]
    pub const fn new(name: &'static str, signature: fn() -> Signature, invoker: Invoker) -> Self {
        Self {
            name,
            description: "",
            method: None,
            tags: &[],
            body_field: None,
            visibility: Visibility::Public,
            receiver: Receiver::None,
            signature,
            invoker,
        }
    }

    /// Sets the description.
    #[must_use]
    pub const fn with_description(self, description: &'static str) -> Self {
        Self {
            description,
            ..self
        }
    }

    /// Sets the transport method hint.
    #[must_use]
    pub const fn with_method(self, method: &'static str) -> Self {
        Self {
            method: Some(method),
            ..self
        }
    }

    /// Sets the discovery tags.
    #[must_use]
    pub const fn with_tags(self, tags: &'static [&'static str]) -> Self {
        Self { tags, ..self }
    }

    /// Names the parameter or field read from the request body.
    #[must_use]
    pub const fn with_body_field(self, body_field: &'static str) -> Self {
        Self {
            body_field: Some(body_field),
            ..self
        }
    }

    /// Overrides the recorded visibility.
    #[must_use]
    pub const fn with_visibility(self, visibility: Visibility) -> Self {
        Self { visibility, ..self }
    }

    /// Overrides the recorded receiver kind.
    #[must_use]
    pub const fn with_receiver(self, receiver: Receiver) -> Self {
        Self { receiver, ..self }
    }
}

impl fmt::Debug for ToolCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCandidate")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

/// One bindable parameter or structured-input field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Name used to look the value up in the request.
    pub name: String,
    /// Expected shape.
    pub schema: Schema,
    /// Whether callers must supply it.
    pub required: bool,
    /// Value used when the caller supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Type the bound value must deserialize into.
    #[serde(skip)]
    pub check: TypeCheck,
}

/// How a tool receives its arguments, resolved once at registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputShape {
    /// A single parameter whose type is a structured tool input.
    Structured {
        /// Rust type name of the input.
        type_name: String,
        /// Fields of the input, in declaration order.
        fields: Vec<Param>,
        /// Serialized default instance the binder starts from.
        #[serde(skip)]
        default: Value,
        /// Type the assembled input must deserialize into.
        #[serde(skip)]
        check: TypeCheck,
    },
    /// Ordered positional parameters.
    Positional {
        /// Parameters in declaration order.
        params: Vec<Param>,
    },
}

impl InputShape {
    /// Fields or parameters, whichever this shape carries.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        match self {
            Self::Structured { fields, .. } => fields,
            Self::Positional { params } => params,
        }
    }
}

/// Immutable description of a registered tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    convention: CallingConvention,
    input_shape: InputShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body_param: Option<String>,
    input_schema: Schema,
    output_schema: Schema,
}

impl ToolMetadata {
    /// Builds metadata for a candidate.
    ///
    /// # Errors
    ///
    /// Returns the validation error that caused the candidate to be rejected.
    pub fn from_candidate(candidate: &ToolCandidate) -> ToolResult<Self> {
        let name = candidate.name.trim();
        if name.is_empty() {
            return Err(ToolError::InvalidMetadata {
                reason: "tool name cannot be empty".into(),
            });
        }
        if candidate.receiver == Receiver::Instance {
            return Err(ToolError::InstanceMethod { name: name.into() });
        }
        if candidate.visibility != Visibility::Public {
            return Err(ToolError::NotPublic { name: name.into() });
        }

        let signature = (candidate.signature)();
        let convention = signature.convention;
        let mut builder = SchemaBuilder::new();

        let (input_shape, input_schema) = match signature.params.as_slice() {
            [single] if single.tool_input => {
                let schema = (single.describe)(&mut builder);
                let fields = schema
                    .properties()
                    .iter()
                    .map(param_from_property)
                    .collect::<Vec<_>>();
                let default = (single.input_default)().unwrap_or_else(|| zero_object(&fields));
                let type_name = match &schema {
                    Schema::Object { name, .. } => name.clone(),
                    _ => single.name.to_owned(),
                };
                (
                    InputShape::Structured {
                        type_name,
                        fields,
                        default,
                        check: single.check,
                    },
                    schema,
                )
            }
            params => {
                let params = params
                    .iter()
                    .map(|spec| Param {
                        name: spec.name.to_owned(),
                        schema: (spec.describe)(&mut builder),
                        required: !spec.optional && spec.default.is_none(),
                        default: spec.default.clone(),
                        check: spec.check,
                    })
                    .collect::<Vec<_>>();
                let schema = Schema::object(
                    name,
                    params
                        .iter()
                        .map(|param| Property::new(&param.name, param.schema.clone(), param.required))
                        .collect(),
                );
                (InputShape::Positional { params }, schema)
            }
        };

        let body_param = candidate.body_field.map(str::to_owned);
        if let Some(body) = &body_param {
            if !input_shape.params().iter().any(|param| &param.name == body) {
                warn!(tool = name, body_field = %body, "body field does not name any parameter");
            }
        }
        for param in input_shape.params() {
            warn_on_unknown_enum_default(name, param);
        }

        let (output_type, output_schema) = match (convention, &signature.output) {
            (CallingConvention::FireAndForget, _) | (_, None) => (None, acknowledgement_schema()),
            (_, Some(output)) => (
                Some(output.type_name.to_owned()),
                (output.describe)(&mut SchemaBuilder::new()),
            ),
        };

        Ok(Self {
            name: name.to_owned(),
            description: candidate.description.to_owned(),
            method: candidate.method.map(str::to_owned),
            tags: candidate.tags.iter().map(|tag| (*tag).to_owned()).collect(),
            convention,
            input_shape,
            output_type,
            body_param,
            input_schema,
            output_schema,
        })
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, empty when none was declared.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the transport method hint.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns the discovery tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the calling convention.
    #[must_use]
    pub const fn convention(&self) -> CallingConvention {
        self.convention
    }

    /// Returns how arguments are bound.
    #[must_use]
    pub fn input_shape(&self) -> &InputShape {
        &self.input_shape
    }

    /// Returns the declared result type, `None` for fire-and-forget tools.
    #[must_use]
    pub fn output_type(&self) -> Option<&str> {
        self.output_type.as_deref()
    }

    /// Returns the parameter or field sourced from the request body.
    #[must_use]
    pub fn body_param(&self) -> Option<&str> {
        self.body_param.as_deref()
    }

    /// Returns the input schema.
    #[must_use]
    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    /// Returns the output schema.
    #[must_use]
    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}

fn param_from_property(property: &Property) -> Param {
    Param {
        name: property.name.clone(),
        schema: property.schema.clone(),
        required: property.required,
        default: None,
        check: TypeCheck::default(),
    }
}

fn zero_object(fields: &[Param]) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|field| (field.name.clone(), field.schema.zero_value()))
            .collect(),
    )
}

fn acknowledgement_schema() -> Schema {
    Schema::object(
        "Acknowledgement",
        vec![Property::new("callDelayed", Schema::Boolean, true)],
    )
}

fn warn_on_unknown_enum_default(tool: &str, param: &Param) {
    let (Some(names), Some(Value::String(default))) = (param.schema.enum_names(), &param.default)
    else {
        return;
    };
    if !names.iter().any(|name| name == default) {
        warn!(
            tool,
            param = %param.name,
            default = %default,
            "default is not a member of the parameter's enum"
        );
    }
}

/// A tool ready to be invoked.
pub struct RegisteredTool {
    metadata: ToolMetadata,
    invoker: Invoker,
}

impl RegisteredTool {
    /// Returns the metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Calls the tool body with bound arguments.
    ///
    /// Must only be called on the host thread.
    ///
    /// # Errors
    ///
    /// Propagates argument conversion failures and errors raised by the body.
    pub fn invoke(&self, args: BoundArgs) -> ToolResult<Invocation> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A candidate that was skipped during a registry build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Declared name of the candidate.
    pub name: String,
    /// Why it was skipped.
    pub reason: ToolError,
}

/// Summary of one registry build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryReport {
    /// Names registered, in candidate order.
    pub registered: Vec<String>,
    /// Candidates skipped, in candidate order.
    pub rejected: Vec<Rejection>,
}

type ToolMap = BTreeMap<String, Arc<RegisteredTool>>;

/// Registry that stores tools keyed by name.
///
/// The map is replaced wholesale by [`ToolRegistry::rebuild`]; lookups that
/// already hold an [`Arc<RegisteredTool>`] keep using the previous build.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<Arc<ToolMap>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("registered", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from every `#[tool]` linked into the binary.
    #[must_use]
    pub fn discover() -> Self {
        let registry = Self::new();
        registry.rediscover();
        registry
    }

    /// Builds a registry from an explicit candidate list.
    #[must_use]
    pub fn from_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = ToolCandidate>,
    {
        let registry = Self::new();
        registry.rebuild(candidates);
        registry
    }

    /// Replaces the registry contents with every linked `#[tool]`.
    pub fn rediscover(&self) -> RegistryReport {
        self.rebuild(inventory::iter::<ToolCandidate>.into_iter().copied())
    }

    /// Replaces the registry contents with the supplied candidates.
    ///
    /// Invalid candidates are logged and skipped; a name seen twice keeps its
    /// first registration.
    pub fn rebuild<I>(&self, candidates: I) -> RegistryReport
    where
        I: IntoIterator<Item = ToolCandidate>,
    {
        let mut tools = ToolMap::new();
        let mut report = RegistryReport::default();

        for candidate in candidates {
            let outcome = ToolMetadata::from_candidate(&candidate).and_then(|metadata| {
                if tools.contains_key(metadata.name()) {
                    Err(ToolError::DuplicateTool {
                        name: metadata.name().to_owned(),
                    })
                } else {
                    Ok(metadata)
                }
            });

            match outcome {
                Ok(metadata) => {
                    debug!(
                        tool = metadata.name(),
                        convention = ?metadata.convention(),
                        "tool registered"
                    );
                    let name = metadata.name().to_owned();
                    report.registered.push(name.clone());
                    tools.insert(
                        name,
                        Arc::new(RegisteredTool {
                            metadata,
                            invoker: candidate.invoker,
                        }),
                    );
                }
                Err(reason) => {
                    warn!(tool = candidate.name, %reason, "tool candidate rejected");
                    report.rejected.push(Rejection {
                        name: candidate.name.to_owned(),
                        reason,
                    });
                }
            }
        }

        info!(
            registered = report.registered.len(),
            rejected = report.rejected.len(),
            "tool registry built"
        );
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(tools);
        report
    }

    fn snapshot(&self) -> Arc<ToolMap> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the tool registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.snapshot().get(name).cloned()
    }

    /// Returns `true` when a tool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Lists registered tool names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Lists the metadata of all registered tools, ordered by name.
    #[must_use]
    pub fn list(&self) -> Vec<ToolMetadata> {
        self.snapshot()
            .values()
            .map(|tool| tool.metadata.clone())
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::__private::complete;

    fn add_signature() -> Signature {
        Signature::new(CallingConvention::from_return_shape(false, true))
            .param(ParamSpec::of::<i64>("a"))
            .param(ParamSpec::of::<i64>("b"))
            .returns::<i64>()
    }

    fn add_invoker(mut args: BoundArgs) -> ToolResult<Invocation> {
        let a: i64 = args.take(0, "a")?;
        let b: i64 = args.take(1, "b")?;
        complete(a + b)
    }

    fn ping_signature() -> Signature {
        Signature::new(CallingConvention::from_return_shape(false, false))
    }

    fn ping_invoker(_args: BoundArgs) -> ToolResult<Invocation> {
        Ok(Invocation::Done)
    }

    fn add() -> ToolCandidate {
        ToolCandidate::new("add", add_signature, add_invoker)
            .with_description("Adds two integers")
            .with_tags(&["math"])
    }

    #[test]
    fn classification_follows_return_shape() {
        use CallingConvention::{AsyncWithResult, FireAndForget, Synchronous};
        assert_eq!(CallingConvention::from_return_shape(false, false), FireAndForget);
        assert_eq!(CallingConvention::from_return_shape(true, false), FireAndForget);
        assert_eq!(CallingConvention::from_return_shape(true, true), AsyncWithResult);
        assert_eq!(CallingConvention::from_return_shape(false, true), Synchronous);
    }

    #[test]
    fn builds_positional_metadata() {
        let registry = ToolRegistry::from_candidates([add()]);
        let tool = registry.get("add").expect("registered");
        let metadata = tool.metadata();

        assert_eq!(metadata.convention(), CallingConvention::Synchronous);
        assert_eq!(metadata.output_type(), Some("i64"));
        assert_eq!(metadata.output_schema(), &Schema::Integer);
        assert_eq!(metadata.tags(), ["math".to_owned()]);
        let InputShape::Positional { params } = metadata.input_shape() else {
            panic!("expected positional input");
        };
        assert_eq!(params.len(), 2);
        assert!(params.iter().all(|param| param.required));
        assert_eq!(metadata.input_schema().properties().len(), 2);
    }

    #[test]
    fn fire_and_forget_tools_acknowledge() {
        let registry = ToolRegistry::from_candidates([ToolCandidate::new(
            "ping",
            ping_signature,
            ping_invoker,
        )]);
        let metadata = registry.get("ping").expect("registered").metadata().clone();
        assert_eq!(metadata.convention(), CallingConvention::FireAndForget);
        assert_eq!(metadata.output_type(), None);
        assert_eq!(metadata.output_schema().properties()[0].name, "callDelayed");
    }

    #[test]
    fn invalid_candidates_are_skipped_without_aborting() {
        let report = ToolRegistry::new().rebuild([
            ToolCandidate::new("hidden", ping_signature, ping_invoker)
                .with_visibility(Visibility::Restricted),
            ToolCandidate::new("method", ping_signature, ping_invoker)
                .with_receiver(Receiver::Instance),
            ToolCandidate::new("  ", ping_signature, ping_invoker),
            add(),
            add(),
        ]);

        assert_eq!(report.registered, ["add".to_owned()]);
        let reasons: Vec<_> = report.rejected.iter().map(|r| &r.reason).collect();
        assert!(matches!(reasons[0], ToolError::NotPublic { .. }));
        assert!(matches!(reasons[1], ToolError::InstanceMethod { .. }));
        assert!(matches!(reasons[2], ToolError::InvalidMetadata { .. }));
        assert!(matches!(reasons[3], ToolError::DuplicateTool { name } if name == "add"));
    }

    #[test]
    fn rebuild_replaces_previous_map() {
        let registry = ToolRegistry::from_candidates([add()]);
        let held = registry.get("add").expect("registered");

        registry.rebuild([ToolCandidate::new("ping", ping_signature, ping_invoker)]);

        assert!(!registry.contains("add"));
        assert_eq!(registry.names(), ["ping".to_owned()]);
        assert_eq!(held.metadata().name(), "add");
    }

    #[test]
    fn registered_tools_invoke_their_body() {
        let registry = ToolRegistry::from_candidates([add()]);
        let tool = registry.get("add").expect("registered");
        let invocation = tool
            .invoke(BoundArgs::new(vec![Value::from(2), Value::from(3)]))
            .expect("invocation");
        assert!(matches!(invocation, Invocation::Complete(value) if value == 5));
    }
}
