use hostcall_primitives::{RequestContext, ToolRequest};
use hostcall_tools::{
    CallingConvention, Describe, InputShape, Invocation, Schema, ToolError, ToolInput,
    ToolRegistry, bind_arguments, tool,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Describe)]
pub enum Color {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Default, Serialize, Deserialize, ToolInput)]
#[serde(default)]
pub struct PaintRequest {
    pub node: String,
    pub color: Option<Color>,
    pub coats: u32,
}

#[derive(Debug, Serialize, Deserialize, Describe)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Serialize, Deserialize, Describe)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize, Deserialize, Describe)]
pub struct Glyph {
    pub symbol: char,
    pub size: u8,
}

#[derive(Debug, Default, Serialize, Deserialize, ToolInput)]
#[serde(default)]
pub struct VolumeRequest {
    pub level: u8,
    pub label: String,
}

/// Adds two integers.
#[tool(tags("math"))]
pub fn add(a: i64, b: i64) -> i64 {
    a + b
}

#[tool(description = "Greets someone", method = "GET")]
pub fn greet(name: String) -> String {
    format!("Hello, {name}!")
}

#[tool]
pub fn explode() -> Result<(), String> {
    Err("boom".into())
}

#[tool(body = "contents")]
pub async fn upload(path: String, contents: Vec<u8>) -> Result<usize, String> {
    if path.is_empty() {
        return Err("path is required".into());
    }
    Ok(contents.len())
}

#[tool]
pub fn paint(request: PaintRequest) -> String {
    let color = request.color.map_or("none".to_owned(), |c| format!("{c:?}"));
    format!("{} x{} {color}", request.node, request.coats)
}

#[tool(name = "tint")]
pub fn tint_node(color: Color, #[arg(default = Color::Green)] accent: Color) -> String {
    format!("{color:?}/{accent:?}")
}

#[tool]
pub fn count_nodes(root: TreeNode) -> usize {
    1 + root.children.len()
}

#[tool]
pub fn set_level(level: u8, #[arg(default = 7)] count: u32) -> String {
    format!("{level}/{count}")
}

#[tool]
pub fn initial(letter: char, grid: [i8; 2]) -> String {
    format!("{letter:?} {grid:?}")
}

#[tool]
pub fn span(from: Point, to: Point) -> f64 {
    (to.x - from.x) + (to.y - from.y)
}

#[tool]
pub fn draw_glyph(glyph: Glyph) -> String {
    format!("{:?}@{}", glyph.symbol, glyph.size)
}

#[tool]
pub fn set_volume(request: VolumeRequest) -> String {
    format!("{}:{}", request.label, request.level)
}

#[tool]
fn hidden() -> u8 {
    1
}

fn call(registry: &ToolRegistry, request: &ToolRequest) -> Value {
    let tool = registry.get(request.tool_name()).expect("registered");
    let args = bind_arguments(tool.metadata(), request).expect("bind");
    let Invocation::Complete(result) = tool.invoke(args).expect("invoke") else {
        panic!("{} is synchronous", request.tool_name());
    };
    result
}

fn sample(schema: &Schema) -> Value {
    match schema {
        Schema::String => json!("x"),
        Schema::Integer => json!(1),
        Schema::Number => json!(1.5),
        Schema::Boolean => json!(true),
        Schema::Enum { names } => json!(names[0]),
        Schema::Array { items } => json!([sample(items)]),
        Schema::Object { properties, .. } => Value::Object(
            properties
                .iter()
                .map(|property| (property.name.clone(), sample(&property.schema)))
                .collect::<Map<_, _>>(),
        ),
        Schema::Nullable { inner } => sample(inner),
    }
}

#[test]
fn discovery_registers_public_tools_and_rejects_private_ones() {
    let registry = ToolRegistry::new();
    let report = registry.rediscover();

    for name in ["add", "greet", "explode", "upload", "paint", "tint", "count_nodes"] {
        assert!(registry.contains(name), "{name} should be registered");
    }
    assert!(!registry.contains("hidden"));
    assert!(report.rejected.iter().any(|rejection| {
        rejection.name == "hidden" && matches!(rejection.reason, ToolError::NotPublic { .. })
    }));
}

#[test]
fn conventions_follow_declared_return_types() {
    let registry = ToolRegistry::discover();
    let convention = |name: &str| registry.get(name).expect(name).metadata().convention();

    assert_eq!(convention("add"), CallingConvention::Synchronous);
    assert_eq!(convention("explode"), CallingConvention::FireAndForget);
    assert_eq!(convention("upload"), CallingConvention::AsyncWithResult);

    let add = registry.get("add").expect("add");
    assert_eq!(add.metadata().description(), "Adds two integers.");
    assert_eq!(add.metadata().tags(), ["math".to_owned()]);
    assert_eq!(registry.get("greet").expect("greet").metadata().method(), Some("GET"));
}

#[test]
fn structured_inputs_bind_fields_over_defaults() {
    let registry = ToolRegistry::discover();
    let paint = registry.get("paint").expect("paint");
    let InputShape::Structured { fields, .. } = paint.metadata().input_shape() else {
        panic!("paint takes a structured input");
    };
    let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, ["node", "color", "coats"]);

    let request = ToolRequest::new("paint")
        .with_param("node", "cube")
        .with_param("color", "blue");
    let args = bind_arguments(paint.metadata(), &request).expect("bind");
    assert_eq!(args.get(0), Some(&json!({ "node": "cube", "color": "Blue", "coats": 0 })));

    let Invocation::Complete(result) = paint.invoke(args).expect("invoke") else {
        panic!("paint is synchronous");
    };
    assert_eq!(result, json!("cube x0 Blue"));
}

#[test]
fn enum_parameters_reject_unknown_members_unless_defaulted() {
    let registry = ToolRegistry::discover();
    let tint = registry.get("tint").expect("tint");

    let request = ToolRequest::new("tint")
        .with_param("color", "red")
        .with_param("accent", "purple");
    let args = bind_arguments(tint.metadata(), &request).expect("accent falls back");
    assert_eq!(args.into_values(), [json!("Red"), json!("Green")]);

    let request = ToolRequest::new("tint").with_param("color", "purple");
    let err = bind_arguments(tint.metadata(), &request).expect_err("no default for color");
    assert_eq!(
        err,
        ToolError::Binding {
            field: "color".into(),
            value: "purple".into(),
            expected: vec!["Red".into(), "Green".into(), "Blue".into()],
        }
    );
}

#[test]
fn missing_string_parameter_binds_empty_string() {
    let registry = ToolRegistry::discover();
    let greet = registry.get("greet").expect("greet");
    let args = bind_arguments(greet.metadata(), &ToolRequest::new("greet")).expect("bind");

    let Invocation::Complete(result) = greet.invoke(args).expect("invoke") else {
        panic!("greet is synchronous");
    };
    assert_eq!(result, json!("Hello, !"));
}

#[test]
fn self_referential_types_expand_once() {
    let registry = ToolRegistry::discover();
    let count = registry.get("count_nodes").expect("count_nodes");
    let root = &count.metadata().input_schema().properties()[0].schema;
    let children = &root.properties()[1].schema;
    let Schema::Array { items } = children else {
        panic!("children is an array");
    };
    assert!(items.properties().is_empty());
}

#[test]
fn schema_conforming_arguments_always_bind() {
    let registry = ToolRegistry::discover();
    for metadata in registry.list() {
        let mut request = ToolRequest::new(metadata.name());
        for param in metadata.input_shape().params() {
            request = request.with_param(param.name.clone(), sample(&param.schema));
        }
        let tool = registry.get(metadata.name()).expect("listed");
        let args = bind_arguments(&metadata, &request).unwrap_or_else(|err| {
            panic!("{} failed to bind schema-conforming arguments: {err}", metadata.name())
        });
        if let Err(err) = tool.invoke(args) {
            assert!(
                !err.is_binding(),
                "{} rejected its bound arguments: {err}",
                metadata.name()
            );
        }
    }
}

#[test]
fn out_of_range_integers_fall_back_to_default_or_zero() {
    let registry = ToolRegistry::discover();
    let request = ToolRequest::new("set_level")
        .with_param("level", "300")
        .with_param("count", -4);
    assert_eq!(call(&registry, &request), json!("0/7"));

    let request = ToolRequest::new("set_level")
        .with_param("level", 255)
        .with_param("count", "9");
    assert_eq!(call(&registry, &request), json!("255/9"));
}

#[test]
fn missing_chars_and_arrays_bind_typed_zeros() {
    let registry = ToolRegistry::discover();
    assert_eq!(
        call(&registry, &ToolRequest::new("initial")),
        json!("'\\0' [0, 0]")
    );
    assert_eq!(
        call(&registry, &ToolRequest::new("draw_glyph")),
        json!("'\\0'@0")
    );

    let request = ToolRequest::new("initial")
        .with_param("letter", "ab")
        .with_param("grid", "3, 4");
    assert_eq!(call(&registry, &request), json!("'\\0' [3, 4]"));
}

#[test]
fn repeated_parameter_types_expand_and_convert_alike() {
    let registry = ToolRegistry::discover();
    let span = registry.get("span").expect("span");
    let properties = span.metadata().input_schema().properties();
    assert_eq!(properties[0].schema.properties().len(), 2);
    assert_eq!(properties[1].schema, properties[0].schema);

    let request = ToolRequest::new("span")
        .with_param("from", json!({ "x": "1.0", "y": "2.0" }))
        .with_param("to", json!({ "x": "4.0", "y": "6.0" }));
    assert_eq!(call(&registry, &request), json!(7.0));
}

#[test]
fn structured_fields_outside_their_type_keep_defaults() {
    let registry = ToolRegistry::discover();
    let request = ToolRequest::new("set_volume")
        .with_param("level", "999")
        .with_param("label", "loud");
    assert_eq!(call(&registry, &request), json!("loud:0"));

    let request = ToolRequest::new("set_volume").with_param("level", "12");
    assert_eq!(call(&registry, &request), json!(":12"));
}

#[tokio::test]
async fn async_tools_read_their_body_parameter() {
    let registry = ToolRegistry::discover();
    let upload = registry.get("upload").expect("upload");
    let request = ToolRequest::new("upload")
        .with_param("path", "a.bin")
        .with_body("[1, 2, 3]");
    let args = bind_arguments(upload.metadata(), &request).expect("bind");

    let Invocation::Pending(future) = upload.invoke(args).expect("invoke") else {
        panic!("upload is asynchronous");
    };
    assert_eq!(future.await, Ok(json!(3)));
}

#[test]
fn failing_bodies_report_execution_errors() {
    let registry = ToolRegistry::discover();
    let explode = registry.get("explode").expect("explode");
    let args = bind_arguments(explode.metadata(), &ToolRequest::new("explode")).expect("bind");
    assert_eq!(explode.invoke(args).err(), Some(ToolError::execution("boom")));
}
