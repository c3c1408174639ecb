//! Typed JSON-Schema fragment.
//!
//! Schemas arrive as untyped JSON. [`Schema::from_value`] validates them once
//! at the extraction boundary: unknown or malformed keywords are dropped, a
//! missing or unrecognised `type` becomes [`SchemaType::Unknown`], and local
//! `$ref`s are inlined. Everything downstream matches on closed variants.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// `$ref` chains deeper than this are treated as unresolvable.
const MAX_REF_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    /// Missing (`None`) or unrecognised type name.
    #[default]
    Unknown,
}

impl SchemaType {
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Number => Some("number"),
            Self::Integer => Some("integer"),
            Self::Boolean => Some("boolean"),
            Self::Object => Some("object"),
            Self::Array => Some("array"),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub schema_type: SchemaType,
    /// Name of the unrecognised `type`, kept for display.
    pub raw_type: Option<String>,
    pub properties: IndexMap<String, Schema>,
    pub required: Vec<String>,
    pub enum_values: Option<Vec<Value>>,
    pub format: Option<String>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub max_length: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Schema {
    /// `{type: object, properties: {}}`
    pub fn empty_object() -> Self {
        Self {
            schema_type: SchemaType::Object,
            ..Self::default()
        }
    }

    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a schema fragment with no surrounding document for `$ref`s.
    pub fn from_value(value: &Value) -> Self {
        Self::from_value_in(value, &Value::Null)
    }

    /// Parse a schema fragment, resolving local `$ref`s against `root`.
    pub fn from_value_in(value: &Value, root: &Value) -> Self {
        SchemaResolver::new(root).parse(value)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// First `enum` entry, if any.
    pub fn first_enum(&self) -> Option<&Value> {
        self.enum_values.as_ref().and_then(|v| v.first())
    }

    /// The display name of this schema's type.
    pub fn type_name(&self) -> &str {
        self.schema_type
            .as_str()
            .or(self.raw_type.as_deref())
            .unwrap_or("any")
    }

    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        if let Some(t) = self.schema_type.as_str().or(self.raw_type.as_deref()) {
            out.insert("type".into(), Value::String(t.to_string()));
        }
        if let Some(title) = &self.title {
            out.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(format) = &self.format {
            out.insert("format".into(), Value::String(format.clone()));
        }
        if let Some(values) = &self.enum_values {
            out.insert("enum".into(), Value::Array(values.clone()));
        }
        if let Some(min) = &self.minimum {
            out.insert("minimum".into(), Value::Number(min.clone()));
        }
        if let Some(max) = &self.maximum {
            out.insert("maximum".into(), Value::Number(max.clone()));
        }
        if let Some(len) = self.max_length {
            out.insert("maxLength".into(), Value::from(len));
        }
        if self.schema_type == SchemaType::Object || !self.properties.is_empty() {
            let props = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect();
            out.insert("properties".into(), Value::Object(props));
        }
        if !self.required.is_empty() {
            out.insert(
                "required".into(),
                Value::Array(self.required.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(out)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Parses schema fragments of one document. Each `$ref` is expanded once and
/// reused; expansions cut short by a recursive reference are not cached,
/// since their shape depends on where the recursion was entered.
pub struct SchemaResolver<'a> {
    root: &'a Value,
    chain: Vec<String>,
    cache: HashMap<String, Schema>,
    cuts: usize,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            chain: Vec::new(),
            cache: HashMap::new(),
            cuts: 0,
        }
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    pub fn parse(&mut self, value: &Value) -> Schema {
        let Some(obj) = value.as_object() else {
            return Schema::default();
        };

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            return self.expand(reference);
        }

        let (schema_type, raw_type) = parse_type(obj.get("type"));
        let string = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| match obj.get(key) {
            Some(Value::Number(n)) => Some(n.clone()),
            _ => None,
        };

        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| (name.clone(), self.parse(prop)))
                    .collect()
            })
            .unwrap_or_default();

        let mut required: Vec<String> = Vec::new();
        for name in obj
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            if !required.iter().any(|r| r == name) {
                required.push(name.to_string());
            }
        }

        Schema {
            schema_type,
            raw_type,
            properties,
            required,
            enum_values: obj.get("enum").and_then(Value::as_array).cloned(),
            format: string("format"),
            minimum: number("minimum"),
            maximum: number("maximum"),
            max_length: obj.get("maxLength").and_then(Value::as_u64),
            title: string("title"),
            description: string("description"),
        }
    }

    /// A reference already on the current chain is recursive and resolves to
    /// an untyped schema.
    fn expand(&mut self, reference: &str) -> Schema {
        if let Some(hit) = self.cache.get(reference) {
            return hit.clone();
        }
        if self.chain.len() >= MAX_REF_DEPTH || self.chain.iter().any(|r| r == reference) {
            tracing::debug!(reference, "recursive schema $ref; treating as unknown");
            self.cuts += 1;
            return Schema::default();
        }
        let root = self.root;
        let Some(target) = resolve_ref(root, reference) else {
            tracing::debug!(reference, "unresolvable schema $ref");
            self.cache.insert(reference.to_string(), Schema::default());
            return Schema::default();
        };

        let cuts_before = self.cuts;
        self.chain.push(reference.to_string());
        let schema = self.parse(target);
        self.chain.pop();
        if self.cuts == cuts_before {
            self.cache.insert(reference.to_string(), schema.clone());
        }
        schema
    }
}

/// Follow `$ref`s on a non-schema object (such as a parameter) until reaching
/// one without a `$ref`. Unresolvable or overlong chains yield `value` itself.
pub fn deref_local<'v>(root: &'v Value, value: &'v Value) -> &'v Value {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        match resolve_ref(root, reference) {
            Some(target) => current = target,
            None => return value,
        }
    }
    value
}

/// `type` may be a string or (OpenAPI 3.1) an array such as `["string", "null"]`.
fn parse_type(value: Option<&Value>) -> (SchemaType, Option<String>) {
    let name = match value {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|s| *s != "null"),
        _ => None,
    };
    match name {
        Some(n) => {
            let t = SchemaType::parse(n);
            let raw = (t == SchemaType::Unknown).then(|| n.to_string());
            (t, raw)
        }
        None => (SchemaType::Unknown, None),
    }
}

/// Resolve a local JSON pointer reference (`#/components/schemas/Pet`).
fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    root.pointer(pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_reads_keywords() {
        let schema = Schema::from_value(&json!({
            "type": "object",
            "title": "Pet",
            "required": ["name", "name"],
            "properties": {
                "name": {"type": "string", "maxLength": 200},
                "kind": {"type": "string", "enum": ["cat", "dog"]},
                "age": {"type": "integer", "minimum": 0, "maximum": 30}
            }
        }));

        assert_eq!(schema.schema_type, SchemaType::Object);
        assert_eq!(schema.title.as_deref(), Some("Pet"));
        assert_eq!(schema.required, vec!["name"]);
        let keys: Vec<&str> = schema.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "kind", "age"]);
        assert_eq!(schema.properties["name"].max_length, Some(200));
        assert_eq!(schema.properties["kind"].first_enum(), Some(&json!("cat")));
        assert_eq!(schema.properties["age"].minimum, Some(Number::from(0)));
    }

    #[test]
    fn from_value_unknown_type_is_kept_for_display() {
        let schema = Schema::from_value(&json!({"type": "file"}));
        assert_eq!(schema.schema_type, SchemaType::Unknown);
        assert_eq!(schema.type_name(), "file");

        let untyped = Schema::from_value(&json!({}));
        assert_eq!(untyped.schema_type, SchemaType::Unknown);
        assert_eq!(untyped.type_name(), "any");
    }

    #[test]
    fn from_value_accepts_type_arrays() {
        let schema = Schema::from_value(&json!({"type": ["null", "integer"]}));
        assert_eq!(schema.schema_type, SchemaType::Integer);
    }

    #[test]
    fn from_value_ignores_malformed_keywords() {
        let schema = Schema::from_value(&json!({
            "type": "string",
            "minimum": "zero",
            "enum": "not-a-list",
            "required": "name"
        }));
        assert_eq!(schema.minimum, None);
        assert_eq!(schema.enum_values, None);
        assert!(schema.required.is_empty());
    }

    #[test]
    fn from_value_in_resolves_local_refs() {
        let root = json!({
            "components": {"schemas": {
                "Pet": {"type": "object", "properties": {"owner": {"$ref": "#/components/schemas/Owner"}}},
                "Owner": {"type": "object", "properties": {"email": {"type": "string", "format": "email"}}}
            }}
        });
        let schema = Schema::from_value_in(&json!({"$ref": "#/components/schemas/Pet"}), &root);
        let owner = &schema.properties["owner"];
        assert_eq!(owner.schema_type, SchemaType::Object);
        assert_eq!(owner.properties["email"].format.as_deref(), Some("email"));
    }

    #[test]
    fn from_value_in_stops_on_cyclic_refs() {
        let root = json!({"components": {"schemas": {"Loop": {"$ref": "#/components/schemas/Loop"}}}});
        let schema = Schema::from_value_in(&json!({"$ref": "#/components/schemas/Loop"}), &root);
        assert_eq!(schema, Schema::default());
    }

    #[test]
    fn resolver_reuses_shared_refs() {
        // Each level references the next twice; expanding without reuse
        // would visit 2^12 nodes.
        let mut schemas = Map::new();
        for i in 0..12 {
            let next = json!({"$ref": format!("#/components/schemas/N{}", i + 1)});
            schemas.insert(
                format!("N{i}"),
                json!({"type": "object", "properties": {"left": next.clone(), "right": next}}),
            );
        }
        schemas.insert("N12".into(), json!({"type": "string"}));
        let root = json!({"components": {"schemas": schemas}});

        let mut resolver = SchemaResolver::new(&root);
        let schema = resolver.parse(&json!({"$ref": "#/components/schemas/N0"}));
        assert_eq!(resolver.cache.len(), 13);

        let mut leaf = &schema;
        for _ in 0..12 {
            leaf = &leaf.properties["right"];
        }
        assert_eq!(leaf.schema_type, SchemaType::String);
    }

    #[test]
    fn resolver_does_not_cache_cut_expansions() {
        let root = json!({"components": {"schemas": {
            "Node": {"type": "object", "properties": {"next": {"$ref": "#/components/schemas/Node"}}}
        }}});
        let mut resolver = SchemaResolver::new(&root);
        let node = resolver.parse(&json!({"$ref": "#/components/schemas/Node"}));
        assert_eq!(node.properties["next"], Schema::default());
        assert!(resolver.cache.is_empty());
    }

    #[test]
    fn deref_local_follows_ref_chains() {
        let root = json!({"components": {"parameters": {
            "Id": {"$ref": "#/components/parameters/RealId"},
            "RealId": {"name": "id", "in": "path"}
        }}});
        let param = json!({"$ref": "#/components/parameters/Id"});
        assert_eq!(deref_local(&root, &param)["name"], json!("id"));

        let missing = json!({"$ref": "#/components/parameters/Nope"});
        assert_eq!(deref_local(&root, &missing), &missing);
    }

    #[test]
    fn to_value_emits_empty_properties_for_objects() {
        assert_eq!(
            Schema::empty_object().to_value(),
            json!({"type": "object", "properties": {}})
        );
    }
}
