//! Raw JSON text ↔ form value
//!
//! [`validate`] and [`format`] operate on editor text. [`templates`] builds the
//! canned payloads for a schema. [`Draft`] keeps the form value and the JSON
//! text consistent: the form value is the single source of truth and text
//! that does not parse to an object never overwrites it.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::form::{normalize_numbers, CustomFieldType, FieldInput, FormState, FormValue};
use crate::schema::{Schema, SchemaType};

/// Message shown when an override replacement is rejected.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON format. Please check your syntax.";

/// Outcome of validating editor text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,
    /// Length of the compact re-serialization, not of the input text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_count: Option<usize>,
}

/// Validate editor text. Blank text is valid with a count of zero.
pub fn validate(text: &str) -> Validation {
    if text.trim().is_empty() {
        return Validation {
            valid: true,
            error: None,
            parsed: None,
            char_count: Some(0),
        };
    }
    match serde_json::from_str::<Value>(text).map(|v| normalize_numbers(&v)) {
        Ok(parsed) => Validation {
            valid: true,
            error: None,
            char_count: Some(compact_len(&parsed)),
            parsed: Some(parsed),
        },
        Err(err) => Validation {
            valid: false,
            error: Some(err.to_string()),
            parsed: None,
            char_count: None,
        },
    }
}

/// Pretty-print `text`; `None` when it is blank or not valid JSON.
pub fn format(text: &str) -> Option<String> {
    validate(text).parsed.map(|v| pretty(&v))
}

/// Two-space indented JSON.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Characters in the compact serialization, counted as UTF-16 code units.
/// Whole-valued floats are expected to be normalized already (`100`, not `100.0`).
fn compact_len(value: &Value) -> usize {
    value.to_string().encode_utf16().count()
}

/// A canned payload for a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub name: &'static str,
    pub label: &'static str,
    pub data: Value,
}

/// Templates for `schema`, in the order minimal (when anything is required),
/// complete, example. Empty only for a non-object schema without properties.
pub fn templates(schema: &Schema) -> Vec<Template> {
    if schema.schema_type != SchemaType::Object && schema.properties.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(3);

    if !schema.required.is_empty() {
        let data: Map<String, Value> = schema
            .required
            .iter()
            .map(|name| {
                let value = schema
                    .properties
                    .get(name)
                    .map(default_value)
                    .unwrap_or_else(|| Value::String(String::new()));
                (name.clone(), value)
            })
            .collect();
        out.push(Template {
            name: "minimal",
            label: "Minimal (Required Only)",
            data: Value::Object(data),
        });
    }

    out.push(Template {
        name: "complete",
        label: "Complete (All Fields)",
        data: Value::Object(
            schema
                .properties
                .iter()
                .map(|(k, p)| (k.clone(), default_value(p)))
                .collect(),
        ),
    });
    out.push(Template {
        name: "example",
        label: "Example (Sample Data)",
        data: Value::Object(
            schema
                .properties
                .iter()
                .map(|(k, p)| (k.clone(), example_value(k, p)))
                .collect(),
        ),
    });
    out
}

/// Empty value of the property's type.
pub fn default_value(prop: &Schema) -> Value {
    match prop.schema_type {
        SchemaType::String => prop
            .first_enum()
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        SchemaType::Number | SchemaType::Integer => nonzero_minimum(prop).unwrap_or(Value::from(0)),
        SchemaType::Boolean => Value::Bool(false),
        SchemaType::Array => Value::Array(Vec::new()),
        SchemaType::Object => Value::Object(Map::new()),
        SchemaType::Unknown => Value::String(String::new()),
    }
}

/// Plausible sample value, guessed from the property name and format.
pub fn example_value(name: &str, prop: &Schema) -> Value {
    let key = name.to_lowercase();
    match prop.schema_type {
        SchemaType::String => {
            if let Some(first) = prop.first_enum() {
                return first.clone();
            }
            let format = prop.format.as_deref();
            let sample = if format == Some("email") || key.contains("email") {
                "user@example.com"
            } else if format == Some("date") {
                "2024-01-01"
            } else if format == Some("date-time") {
                "2024-01-01T12:00:00Z"
            } else if key.contains("name") {
                "John Doe"
            } else if key.contains("title") {
                "Sample Title"
            } else if key.contains("description") {
                "This is a sample description"
            } else if key.contains("url") {
                "https://example.com"
            } else if key.contains("phone") {
                "+1-555-123-4567"
            } else {
                "Sample text"
            };
            Value::from(sample)
        }
        SchemaType::Number | SchemaType::Integer => {
            if key.contains("age") {
                Value::from(25)
            } else if key.contains("price") || key.contains("cost") {
                Value::from(99.99)
            } else if key.contains("count") || key.contains("quantity") {
                Value::from(10)
            } else {
                nonzero_minimum(prop).unwrap_or(Value::from(42))
            }
        }
        SchemaType::Boolean => Value::Bool(true),
        SchemaType::Array => Value::from(vec!["item1", "item2"]),
        SchemaType::Object => {
            let mut sample = Map::new();
            sample.insert("key".into(), Value::from("value"));
            Value::Object(sample)
        }
        SchemaType::Unknown => Value::from("sample"),
    }
}

/// A zero minimum counts as unset.
fn nonzero_minimum(prop: &Schema) -> Option<Value> {
    prop.minimum
        .as_ref()
        .filter(|n| n.as_f64().is_some_and(|f| f != 0.0))
        .map(|n| Value::Number(n.clone()))
}

/// Which representation the user touched last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LastEdited {
    #[default]
    Form,
    Json,
}

/// Request payload being composed, viewed as form fields and as JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    form: FormState,
    text: String,
    last_edited: LastEdited,
    error: Option<String>,
}

impl Draft {
    pub fn new(schema: Schema) -> Self {
        let form = FormState::new(schema);
        let text = pretty(&Value::Object(form.value().clone()));
        Self {
            form,
            text,
            last_edited: LastEdited::Form,
            error: None,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn schema(&self) -> &Schema {
        self.form.schema()
    }

    pub fn value(&self) -> &FormValue {
        self.form.value()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn last_edited(&self) -> LastEdited {
        self.last_edited
    }

    /// Parse error for the current text, if the last JSON edit was rejected.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn templates(&self) -> Vec<Template> {
        templates(self.form.schema())
    }

    /// Edit one form field; the JSON text follows.
    pub fn edit_field(&mut self, key: &str, input: impl Into<FieldInput>) {
        self.form.apply(key, input);
        self.form_changed();
    }

    pub fn add_custom_field(&mut self, key: impl Into<String>, field_type: CustomFieldType) {
        self.form.add_custom_field(key, field_type);
        self.form_changed();
    }

    pub fn rename_field(&mut self, old: &str, new: &str) {
        self.form.rename_field(old, new);
        self.form_changed();
    }

    pub fn remove_field(&mut self, key: &str) {
        self.form.remove_field(key);
        self.form_changed();
    }

    /// Edit the JSON text. The form value follows only when the text parses
    /// to an object; otherwise it is left as it was.
    pub fn edit_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.last_edited = LastEdited::Json;
        let result = validate(&self.text);
        self.error = match result.parsed {
            Some(Value::Object(map)) => {
                self.form.set_value(map);
                None
            }
            Some(_) => Some("request body must be a JSON object".to_string()),
            None => result.error,
        };
    }

    /// Replace the whole value from JSON text, or fail without touching it.
    pub fn replace_from_json(&mut self, text: &str) -> Result<(), String> {
        match serde_json::from_str::<Value>(text).map(|v| normalize_numbers(&v)) {
            Ok(Value::Object(map)) => {
                self.set_value(map);
                Ok(())
            }
            _ => Err(INVALID_JSON_MESSAGE.to_string()),
        }
    }

    /// Load a template into both representations. Non-object data is ignored.
    pub fn apply_template(&mut self, template: &Template) {
        if let Value::Object(map) = &template.data {
            self.set_value(map.clone());
        }
    }

    /// Pretty-print the text when it is valid.
    pub fn format_text(&mut self) -> bool {
        match format(&self.text) {
            Some(formatted) => {
                self.text = formatted;
                true
            }
            None => false,
        }
    }

    /// Empty value, custom fields dropped.
    pub fn reset(&mut self) {
        self.form.clear();
        self.form_changed();
    }

    fn set_value(&mut self, value: FormValue) {
        self.form.set_value(value);
        self.form_changed();
    }

    fn form_changed(&mut self) {
        self.text = pretty(&Value::Object(self.form.value().clone()));
        self.last_edited = LastEdited::Form;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Schema {
        Schema::from_value(&json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"}
            }
        }))
    }

    #[test]
    fn validate_blank_text_is_valid_with_zero_count() {
        for text in ["", "   ", "\n\t"] {
            let v = validate(text);
            assert!(v.valid);
            assert_eq!(v.char_count, Some(0));
            assert_eq!(v.parsed, None);
        }
    }

    #[test]
    fn validate_counts_compact_form_not_input() {
        assert_eq!(validate(r#"{"a":1}"#).char_count, Some(7));
        assert_eq!(validate(r#"{ "a" : 1 }"#).char_count, Some(7));
        assert_eq!(validate("[1,\n 2]").char_count, Some(5));
    }

    #[test]
    fn validate_counts_whole_floats_as_integers() {
        assert_eq!(validate("1.0").char_count, Some(1));
        assert_eq!(validate(r#"{"a":1e2}"#).char_count, Some(9));
        assert_eq!(validate(r#"{"a":1e2}"#).parsed, Some(json!({"a": 100})));
        assert_eq!(validate("2.5").char_count, Some(3));
    }

    #[test]
    fn validate_counts_utf16_units() {
        assert_eq!(validate(r#""é😀""#).char_count, Some(5));
    }

    #[test]
    fn validate_reports_parse_error() {
        let v = validate(r#"{"a":"#);
        assert!(!v.valid);
        assert!(v.error.is_some());
        assert_eq!(v.char_count, None);
    }

    #[test]
    fn validate_parsed_value_round_trips() {
        let text = r#"{"b": [1, 2.5, null], "a": {"c": true}}"#;
        let parsed = validate(text).parsed.unwrap();
        let again: Value = serde_json::from_str(&parsed.to_string()).unwrap();
        assert_eq!(again, parsed);
    }

    #[test]
    fn format_indents_valid_text_only() {
        assert_eq!(format(r#"{"a":1}"#).as_deref(), Some("{\n  \"a\": 1\n}"));
        assert_eq!(format("{nope"), None);
        assert_eq!(format(""), None);
    }

    #[test]
    fn templates_are_ordered_minimal_complete_example() {
        let ts = templates(&person());
        let names: Vec<&str> = ts.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["minimal", "complete", "example"]);
        assert_eq!(ts[0].data, json!({"name": ""}));
        assert_eq!(ts[1].data, json!({"name": "", "age": 0}));
        assert_eq!(ts[2].data, json!({"name": "John Doe", "age": 25}));
        assert_eq!(ts[0].label, "Minimal (Required Only)");
    }

    #[test]
    fn templates_skip_minimal_without_required() {
        let schema = Schema::from_value(&json!({
            "type": "object",
            "properties": {"flag": {"type": "boolean"}}
        }));
        let names: Vec<&str> = templates(&schema).iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["complete", "example"]);
    }

    #[test]
    fn templates_for_object_without_properties() {
        let ts = templates(&Schema::empty_object());
        let names: Vec<&str> = ts.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["complete", "example"]);
        assert_eq!(ts[0].data, json!({}));
        assert_eq!(ts[1].data, json!({}));

        let required_only = Schema::from_value(&json!({"type": "object", "required": ["a"]}));
        let ts = templates(&required_only);
        assert_eq!(ts[0].name, "minimal");
        assert_eq!(ts[0].data, json!({"a": ""}));
        assert_eq!(ts.len(), 3);
    }

    #[test]
    fn templates_empty_for_non_object_schema() {
        assert!(templates(&Schema::from_value(&json!({"type": "string"}))).is_empty());
    }

    #[test]
    fn default_value_per_type() {
        let s = |v: Value| Schema::from_value(&v);
        assert_eq!(default_value(&s(json!({"type": "string", "enum": ["b", "a"]}))), json!("b"));
        assert_eq!(default_value(&s(json!({"type": "integer", "minimum": 5}))), json!(5));
        assert_eq!(default_value(&s(json!({"type": "integer", "minimum": 0}))), json!(0));
        assert_eq!(default_value(&s(json!({"type": "boolean"}))), json!(false));
        assert_eq!(default_value(&s(json!({"type": "array"}))), json!([]));
        assert_eq!(default_value(&s(json!({"type": "object"}))), json!({}));
        assert_eq!(default_value(&s(json!({}))), json!(""));
    }

    #[test]
    fn example_value_uses_name_and_format_heuristics() {
        let s = |v: Value| Schema::from_value(&v);
        let string = s(json!({"type": "string"}));
        let number = s(json!({"type": "number"}));
        assert_eq!(example_value("contactEmail", &string), json!("user@example.com"));
        assert_eq!(
            example_value("when", &s(json!({"type": "string", "format": "date-time"}))),
            json!("2024-01-01T12:00:00Z")
        );
        assert_eq!(example_value("homepageUrl", &string), json!("https://example.com"));
        assert_eq!(example_value("Phone", &string), json!("+1-555-123-4567"));
        assert_eq!(example_value("other", &string), json!("Sample text"));
        assert_eq!(example_value("unitPrice", &number), json!(99.99));
        assert_eq!(example_value("quantity", &number), json!(10));
        assert_eq!(example_value("other", &number), json!(42));
        assert_eq!(
            example_value("other", &s(json!({"type": "integer", "minimum": 7}))),
            json!(7)
        );
        assert_eq!(example_value("tags", &s(json!({"type": "array"}))), json!(["item1", "item2"]));
        assert_eq!(example_value("meta", &s(json!({"type": "object"}))), json!({"key": "value"}));
        assert_eq!(example_value("x", &s(json!({"type": "file"}))), json!("sample"));
    }

    #[test]
    fn draft_field_edit_updates_text() {
        let mut draft = Draft::new(person());
        assert_eq!(draft.text(), "{}");
        draft.edit_field("name", "Ada");
        assert_eq!(draft.text(), "{\n  \"name\": \"Ada\"\n}");
        assert_eq!(draft.last_edited(), LastEdited::Form);
    }

    #[test]
    fn draft_valid_text_edit_updates_value() {
        let mut draft = Draft::new(person());
        draft.edit_text(r#"{"name": "Bo", "age": 3}"#);
        assert_eq!(draft.value()["age"], json!(3));
        assert_eq!(draft.last_edited(), LastEdited::Json);
        assert_eq!(draft.error(), None);
    }

    #[test]
    fn draft_invalid_text_never_overwrites_value() {
        let mut draft = Draft::new(person());
        draft.edit_field("name", "Ada");
        draft.edit_text(r#"{"name": "#);
        assert_eq!(draft.value()["name"], json!("Ada"));
        assert_eq!(draft.text(), r#"{"name": "#);
        assert!(draft.error().is_some());

        draft.edit_text("[1, 2]");
        assert_eq!(draft.value()["name"], json!("Ada"));
        assert!(draft.error().is_some());
    }

    #[test]
    fn draft_replace_from_json_accepts_objects_only() {
        let mut draft = Draft::new(person());
        draft.edit_field("name", "Ada");

        assert_eq!(draft.replace_from_json("not json"), Err(INVALID_JSON_MESSAGE.to_string()));
        assert_eq!(draft.replace_from_json("42"), Err(INVALID_JSON_MESSAGE.to_string()));
        assert_eq!(draft.value()["name"], json!("Ada"));

        draft.replace_from_json(r#"{"age": 9}"#).unwrap();
        assert_eq!(draft.value(), json!({"age": 9}).as_object().unwrap());
    }

    #[test]
    fn draft_apply_template_sets_both_representations() {
        let mut draft = Draft::new(person());
        let example = draft
            .templates()
            .into_iter()
            .find(|t| t.name == "example")
            .unwrap();
        draft.apply_template(&example);
        assert_eq!(draft.value()["name"], json!("John Doe"));
        assert_eq!(validate(draft.text()).parsed, Some(example.data));
    }

    #[test]
    fn draft_format_text_is_noop_when_invalid() {
        let mut draft = Draft::new(person());
        draft.edit_text(r#"{"a":1}"#);
        assert!(draft.format_text());
        assert_eq!(draft.text(), "{\n  \"a\": 1\n}");

        draft.edit_text("{broken");
        assert!(!draft.format_text());
        assert_eq!(draft.text(), "{broken");
    }

    #[test]
    fn draft_reset_clears_value_and_custom_fields() {
        let mut draft = Draft::new(person());
        draft.add_custom_field("extra", CustomFieldType::String);
        draft.edit_field("extra", "x");
        draft.reset();
        assert!(draft.value().is_empty());
        assert!(draft.form().custom_fields().is_empty());
        assert_eq!(draft.text(), "{}");
    }
}
