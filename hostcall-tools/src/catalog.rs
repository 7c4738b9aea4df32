//! Read-only projection of the registry for external discovery tooling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CallingConvention, ToolMetadata, ToolRegistry};

/// How call templates are rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOptions {
    /// Path prefix that tool names are appended to.
    pub route_prefix: String,
    /// Method used when a tool declares no hint.
    pub default_method: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            route_prefix: "/tools".into(),
            default_method: "POST".into(),
        }
    }
}

impl CatalogOptions {
    /// Creates options with the supplied prefix and default method.
    #[must_use]
    pub fn new(route_prefix: impl Into<String>, default_method: impl Into<String>) -> Self {
        Self {
            route_prefix: route_prefix.into(),
            default_method: default_method.into(),
        }
    }
}

/// How an external caller reaches a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTemplate {
    /// Transport method.
    pub method: String,
    /// Route path.
    pub path: String,
    /// Names passed as query-style parameters.
    pub query: Vec<String>,
    /// Name sourced from the request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Catalog description of one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Human-readable description.
    pub description: String,
    /// Discovery tags.
    pub tags: Vec<String>,
    /// Whether callers wait for a result.
    pub convention: CallingConvention,
    /// Input shape in JSON-Schema form.
    pub input_schema: Value,
    /// Output shape in JSON-Schema form.
    pub output_schema: Value,
    /// Call template.
    pub call: CallTemplate,
}

impl CatalogEntry {
    fn from_metadata(metadata: &ToolMetadata, options: &CatalogOptions) -> Self {
        let body = metadata.body_param().map(str::to_owned);
        let query = metadata
            .input_shape()
            .params()
            .iter()
            .map(|param| param.name.clone())
            .filter(|name| body.as_ref() != Some(name))
            .collect();
        let prefix = options.route_prefix.trim_end_matches('/');
        Self {
            description: metadata.description().to_owned(),
            tags: metadata.tags().to_vec(),
            convention: metadata.convention(),
            input_schema: metadata.input_schema().to_json_schema(),
            output_schema: metadata.output_schema().to_json_schema(),
            call: CallTemplate {
                method: metadata
                    .method()
                    .unwrap_or(&options.default_method)
                    .to_ascii_uppercase(),
                path: format!("{prefix}/{}", metadata.name()),
                query,
                body,
            },
        }
    }
}

/// Machine-readable listing of every registered tool, keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Entries ordered by tool name.
    pub tools: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Projects the registry's current contents.
    #[must_use]
    pub fn from_registry(registry: &ToolRegistry, options: &CatalogOptions) -> Self {
        Self::from_metadata(&registry.list(), options)
    }

    /// Projects a metadata listing.
    #[must_use]
    pub fn from_metadata(metadata: &[ToolMetadata], options: &CatalogOptions) -> Self {
        Self {
            tools: metadata
                .iter()
                .map(|tool| {
                    (
                        tool.name().to_owned(),
                        CatalogEntry::from_metadata(tool, options),
                    )
                })
                .collect(),
        }
    }

    /// Renders the catalog as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the catalog holds only JSON-compatible data.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl ToolRegistry {
    /// Renders the registry's current contents as a catalog.
    #[must_use]
    pub fn catalog(&self, options: &CatalogOptions) -> Catalog {
        Catalog::from_registry(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::__private::done;
    use crate::{BoundArgs, Invocation, ParamSpec, Signature, ToolCandidate, ToolResult};

    fn upload_signature() -> Signature {
        Signature::new(CallingConvention::FireAndForget)
            .param(ParamSpec::of::<String>("path"))
            .param(ParamSpec::of::<String>("contents"))
    }

    fn upload(_args: BoundArgs) -> ToolResult<Invocation> {
        done(())
    }

    #[test]
    fn entries_reflect_registry_state() {
        let registry = ToolRegistry::from_candidates([ToolCandidate::new(
            "upload",
            upload_signature,
            upload,
        )
        .with_description("Stores a file")
        .with_method("put")
        .with_body_field("contents")]);

        let catalog = registry.catalog(&CatalogOptions::new("/api/", "POST"));
        let entry = &catalog.tools["upload"];

        assert_eq!(entry.description, "Stores a file");
        assert_eq!(entry.convention, CallingConvention::FireAndForget);
        assert_eq!(
            entry.call,
            CallTemplate {
                method: "PUT".into(),
                path: "/api/upload".into(),
                query: vec!["path".into()],
                body: Some("contents".into()),
            }
        );
        assert_eq!(entry.output_schema["properties"]["callDelayed"]["type"], "boolean");
        assert_eq!(entry.input_schema["required"], serde_json::json!(["path", "contents"]));

        let rendered = catalog.to_json_pretty().expect("json");
        assert!(rendered.contains("\"/api/upload\""));
    }

    #[test]
    fn default_method_applies_without_hint() {
        let registry = ToolRegistry::from_candidates([ToolCandidate::new(
            "upload",
            upload_signature,
            upload,
        )]);
        let catalog = registry.catalog(&CatalogOptions::default());
        assert_eq!(catalog.tools["upload"].call.method, "POST");
        assert_eq!(catalog.tools["upload"].call.path, "/tools/upload");
        assert!(Catalog::from_metadata(&[], &CatalogOptions::default()).tools.is_empty());
    }
}
