//! OpenAPI document → endpoints
//!
//! Walks the document's `paths` in declaration order and derives one
//! [`Endpoint`] per declared method, each carrying a request [`Schema`] that
//! is never absent.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Number, Value};

use crate::schema::{deref_local, Schema, SchemaResolver, SchemaType};

/// HTTP methods the explorer exposes, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Key used for this method inside an OpenAPI path item.
    fn path_item_key(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }

    /// POST, PUT and PATCH send the form value as a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method: {s}"))
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fetched OpenAPI/Swagger document.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    raw: Value,
}

impl SpecDocument {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The `paths` object, in declaration order.
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.raw.get("paths").and_then(Value::as_object)
    }

    pub fn title(&self) -> Option<&str> {
        self.raw.pointer("/info/title").and_then(Value::as_str)
    }
}

/// One (method, path) pair declared in the document.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Endpoint {
    /// `"<METHOD>-<path>"`, unique and stable for a given document
    pub id: String,
    pub path: String,
    pub method: HttpMethod,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Expected request shape; always present
    pub schema: Schema,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>, schema: Schema) -> Self {
        let path = path.into();
        Self {
            id: endpoint_id(method, &path),
            path,
            method,
            summary: None,
            description: None,
            schema,
        }
    }
}

pub fn endpoint_id(method: HttpMethod, path: &str) -> String {
    format!("{}-{}", method.as_str(), path)
}

/// Extract all endpoints: paths in document order, methods in
/// [`HttpMethod::ALL`] order.
pub fn enumerate_endpoints(doc: &SpecDocument) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();

    let Some(paths) = doc.paths() else {
        return endpoints;
    };

    let mut resolver = SchemaResolver::new(doc.raw());
    for (path, path_item) in paths {
        let path_level_params = path_item.get("parameters");

        for method in HttpMethod::ALL {
            let Some(operation) = path_item.get(method.path_item_key()) else {
                continue;
            };

            let schema = extract_with(operation, method, path_level_params, &mut resolver);
            endpoints.push(Endpoint {
                id: endpoint_id(method, path),
                path: path.clone(),
                method,
                summary: string_field(operation, "summary"),
                description: string_field(operation, "description"),
                schema,
            });
        }
    }

    tracing::debug!(count = endpoints.len(), "enumerated endpoints");
    endpoints
}

/// Derive the request schema for a standalone operation object.
pub fn extract_schema(operation: &Value, method: HttpMethod) -> Schema {
    extract_schema_in(operation, method, None, &Value::Null)
}

/// Derive the request schema for an operation, merging path-level parameters
/// and resolving `$ref`s against `root`.
///
/// - body methods: the JSON request body schema, else an empty object;
/// - GET/DELETE: query and path parameters as properties, else (GET only)
///   generic `limit`/`offset`/`search` fields, else an empty object.
pub fn extract_schema_in(
    operation: &Value,
    method: HttpMethod,
    path_level_params: Option<&Value>,
    root: &Value,
) -> Schema {
    extract_with(operation, method, path_level_params, &mut SchemaResolver::new(root))
}

fn extract_with(
    operation: &Value,
    method: HttpMethod,
    path_level_params: Option<&Value>,
    resolver: &mut SchemaResolver<'_>,
) -> Schema {
    let root = resolver.root();
    let summary = operation
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or("operation");

    if method.has_body() {
        let title = format!("{method} Request Body");
        return match body_schema(operation, path_level_params, root) {
            Some(raw) => {
                let description = operation
                    .get("requestBody")
                    .map(|body| deref_local(root, body))
                    .and_then(|body| body.get("description"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Request body for {method} {summary}"));
                resolver
                    .parse(raw)
                    .with_title(title)
                    .with_description(description)
            }
            None => Schema::empty_object()
                .with_title(title)
                .with_description(format!("Request body for {method} operation")),
        };
    }

    let params = collect_params(path_level_params, operation.get("parameters"), root);
    let mut schema = Schema::empty_object();
    for param in params
        .iter()
        .filter(|p| p.location == "query" || p.location == "path")
    {
        schema
            .properties
            .insert(param.name.clone(), resolver.parse(&param.property_value()));
        if param.required && !schema.is_required(&param.name) {
            schema.required.push(param.name.clone());
        }
    }

    if !schema.properties.is_empty() {
        return schema
            .with_title(format!("{method} Parameters"))
            .with_description(format!("Parameters for {method} {summary}"));
    }

    if method == HttpMethod::Get {
        return common_query_schema(method);
    }

    base_schema(method)
}

fn base_schema(method: HttpMethod) -> Schema {
    Schema::empty_object()
        .with_title(format!("{method} Request"))
        .with_description(format!("Request configuration for {method} operation"))
}

fn common_query_schema(method: HttpMethod) -> Schema {
    let mut schema = Schema::empty_object()
        .with_title(format!("{method} Query Parameters"))
        .with_description(format!("Query parameters for {method} requests"));

    let mut limit = Schema::of_type(SchemaType::Integer)
        .with_title("Limit")
        .with_description("Number of items to return");
    limit.minimum = Some(Number::from(1));
    limit.maximum = Some(Number::from(1000));

    let mut offset = Schema::of_type(SchemaType::Integer)
        .with_title("Offset")
        .with_description("Number of items to skip");
    offset.minimum = Some(Number::from(0));

    let search = Schema::of_type(SchemaType::String)
        .with_title("Search")
        .with_description("Search query");

    schema.properties.insert("limit".into(), limit);
    schema.properties.insert("offset".into(), offset);
    schema.properties.insert("search".into(), search);
    schema
}

/// OpenAPI 3 `requestBody`, falling back to a Swagger 2 `in: body` parameter.
fn body_schema<'a>(
    operation: &'a Value,
    path_level_params: Option<&'a Value>,
    root: &'a Value,
) -> Option<&'a Value> {
    if let Some(schema) = operation
        .get("requestBody")
        .and_then(|body| deref_local(root, body).pointer("/content/application~1json/schema"))
    {
        return Some(schema);
    }
    [operation.get("parameters"), path_level_params]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .map(|p| deref_local(root, p))
        .find(|p| p.get("in").and_then(Value::as_str) == Some("body"))
        .and_then(|p| p.get("schema"))
}

/// A single declared parameter.
#[derive(Debug, Clone)]
struct Param {
    name: String,
    location: String,
    description: Option<String>,
    required: bool,
    schema: Value,
}

impl Param {
    /// Property schema: `type` defaults to string, `title` to the name, and
    /// the parameter's own schema keywords win.
    fn property_value(&self) -> Value {
        let mut prop = Map::new();
        let declared_type = self
            .schema
            .get("type")
            .cloned()
            .unwrap_or_else(|| json!("string"));
        prop.insert("type".into(), declared_type);
        if let Some(description) = &self.description {
            prop.insert("description".into(), Value::String(description.clone()));
        }
        prop.insert("title".into(), Value::String(self.name.clone()));
        if let Some(own) = self.schema.as_object() {
            for (k, v) in own {
                prop.insert(k.clone(), v.clone());
            }
        }
        Value::Object(prop)
    }
}

/// Merge path-level + operation-level parameters, keeping declaration order.
/// Operation-level overrides path-level on the same `(name, in)`.
/// `$ref` parameters are resolved against `root` first.
fn collect_params(
    path_level: Option<&Value>,
    operation_level: Option<&Value>,
    root: &Value,
) -> Vec<Param> {
    let mut params: Vec<Param> = Vec::new();

    for source in [path_level, operation_level].into_iter().flatten() {
        let Some(list) = source.as_array() else {
            continue;
        };
        for raw in list {
            let Some(param) = parse_param(deref_local(root, raw)) else {
                continue;
            };
            match params
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => params.push(param),
            }
        }
    }

    params
}

/// Parse a single parameter. Swagger 2 parameters carry their type keywords
/// inline instead of under `schema`.
fn parse_param(param: &Value) -> Option<Param> {
    let name = param.get("name")?.as_str()?.to_string();
    let location = param.get("in")?.as_str()?.to_string();
    let required = param
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let schema = match param.get("schema") {
        Some(schema) => schema.clone(),
        None => {
            let mut inline = Map::new();
            for key in ["type", "format", "enum", "minimum", "maximum", "maxLength", "items"] {
                if let Some(v) = param.get(key) {
                    inline.insert(key.to_string(), v.clone());
                }
            }
            Value::Object(inline)
        }
    };

    Some(Param {
        name,
        location,
        description: string_field(param, "description"),
        required,
        schema,
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}
