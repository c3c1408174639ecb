//! Schema → editable fields → value tree
//!
//! [`render`] maps each schema property to a [`Field`] whose [`FieldKind`] is
//! chosen from the property's type, format and enum. [`FormState::apply`]
//! converts raw user input for one field back into the [`FormValue`].
//!
//! Nested object properties are addressed with dotted keys
//! (`"address.city"`) stored flat in the value tree.

use serde_json::{Map, Number, Value};

use crate::schema::{Schema, SchemaType};

/// Field key → value. Absent keys mean "no value".
pub type FormValue = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Text,
    Email,
    Password,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Closed choice among enum values.
    Select { options: Vec<String> },
    /// Multi-line text.
    TextArea,
    /// Single-line input.
    Input(InputType),
    Number {
        integer: bool,
        minimum: Option<Number>,
        maximum: Option<Number>,
    },
    /// Absent counts as unchecked.
    Checkbox,
    /// Nested object; children carry prefixed keys.
    Group { fields: Vec<Field> },
    /// Array edited as raw JSON text.
    JsonArray,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub kind: FieldKind,
    /// Current value; `Null` when absent.
    pub value: Value,
    /// Added by the user rather than derived from the schema.
    pub custom: bool,
}

impl Field {
    /// The value as it would appear in a text input.
    pub fn display_value(&self) -> String {
        match self.kind {
            FieldKind::Checkbox => is_truthy(&self.value).to_string(),
            FieldKind::Group { .. } => String::new(),
            _ => display_text(&self.value),
        }
    }

    /// Placeholder text shown while the field is empty.
    pub fn placeholder(&self) -> String {
        match &self.kind {
            FieldKind::Select { .. } => format!("Select {}", self.key),
            FieldKind::JsonArray => {
                format!(r#"Enter {} as JSON array (e.g., ["item1", "item2"])"#, self.key)
            }
            _ => self
                .description
                .clone()
                .unwrap_or_else(|| format!("Enter {}", self.key)),
        }
    }
}

/// Raw input for a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Checked(bool),
}

impl From<&str> for FieldInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldInput {
    fn from(b: bool) -> Self {
        Self::Checked(b)
    }
}

/// Types offered for user-added fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomFieldType {
    String,
    Number,
    Boolean,
    Email,
    Date,
}

impl CustomFieldType {
    pub const ALL: [CustomFieldType; 5] = [
        CustomFieldType::String,
        CustomFieldType::Number,
        CustomFieldType::Boolean,
        CustomFieldType::Email,
        CustomFieldType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Email => "email",
            Self::Date => "date",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    fn kind(&self) -> FieldKind {
        match self {
            Self::String => FieldKind::Input(InputType::Text),
            Self::Number => FieldKind::Number {
                integer: false,
                minimum: None,
                maximum: None,
            },
            Self::Boolean => FieldKind::Checkbox,
            Self::Email => FieldKind::Input(InputType::Email),
            Self::Date => FieldKind::Input(InputType::Date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub key: String,
    pub field_type: CustomFieldType,
}

/// Pick the field representation for a property.
pub fn field_kind(prop: &Schema) -> FieldKind {
    match prop.schema_type {
        SchemaType::String => {
            if let Some(values) = &prop.enum_values {
                return FieldKind::Select {
                    options: values.iter().map(display_text).collect(),
                };
            }
            if prop.format.as_deref() == Some("textarea")
                || prop.max_length.is_some_and(|len| len > 100)
            {
                return FieldKind::TextArea;
            }
            match prop.format.as_deref() {
                Some("email") => FieldKind::Input(InputType::Email),
                Some("password") => FieldKind::Input(InputType::Password),
                _ => FieldKind::Input(InputType::Text),
            }
        }
        SchemaType::Number | SchemaType::Integer => FieldKind::Number {
            integer: prop.schema_type == SchemaType::Integer,
            minimum: prop.minimum.clone(),
            maximum: prop.maximum.clone(),
        },
        SchemaType::Boolean => FieldKind::Checkbox,
        SchemaType::Array => FieldKind::JsonArray,
        SchemaType::Object => FieldKind::Group { fields: Vec::new() },
        SchemaType::Unknown => FieldKind::Input(InputType::Text),
    }
}

/// Render every property of `schema` against the current `value`.
pub fn render(schema: &Schema, value: &FormValue) -> Vec<Field> {
    render_level(schema, value, None)
}

fn render_level(schema: &Schema, value: &FormValue, prefix: Option<&str>) -> Vec<Field> {
    schema
        .properties
        .iter()
        .map(|(name, prop)| {
            let key = match prefix {
                Some(p) => format!("{p}.{name}"),
                None => name.clone(),
            };
            let kind = match field_kind(prop) {
                FieldKind::Group { .. } => FieldKind::Group {
                    fields: render_level(prop, value, Some(&key)),
                },
                other => other,
            };
            Field {
                label: prop.title.clone().unwrap_or_else(|| key.clone()),
                description: prop.description.clone(),
                required: schema.is_required(name),
                value: value.get(&key).cloned().unwrap_or(Value::Null),
                kind,
                key,
                custom: false,
            }
        })
        .collect()
}

/// Find the property addressed by a (possibly dotted) field key.
pub fn find_property<'a>(schema: &'a Schema, key: &str) -> Option<&'a Schema> {
    if let Some(prop) = schema.properties.get(key) {
        return Some(prop);
    }
    let mut search_from = 0;
    while let Some(offset) = key[search_from..].find('.') {
        let split = search_from + offset;
        let (head, tail) = (&key[..split], &key[split + 1..]);
        if let Some(parent) = schema.properties.get(head) {
            if parent.schema_type == SchemaType::Object {
                if let Some(found) = find_property(parent, tail) {
                    return Some(found);
                }
            }
        }
        search_from = split + 1;
    }
    None
}

/// Convert `input` for a field of `kind`; `None` means the value is absent.
pub fn convert_input(kind: &FieldKind, input: FieldInput) -> Option<Value> {
    match (kind, input) {
        (FieldKind::Checkbox, FieldInput::Checked(b)) => Some(Value::Bool(b)),
        (FieldKind::Checkbox, FieldInput::Text(t)) => Some(Value::Bool(matches!(
            t.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ))),
        (_, FieldInput::Checked(b)) => Some(Value::Bool(b)),
        (FieldKind::Number { integer, .. }, FieldInput::Text(t)) => {
            if t.is_empty() {
                return None;
            }
            if *integer {
                parse_int_prefix(&t).map(Value::from)
            } else {
                parse_float_prefix(&t).and_then(number_value)
            }
        }
        (FieldKind::JsonArray, FieldInput::Text(t)) => match serde_json::from_str::<Value>(&t) {
            Ok(parsed @ Value::Array(_)) => Some(parsed),
            _ => Some(Value::String(t)),
        },
        (FieldKind::Group { .. }, FieldInput::Text(t)) => match serde_json::from_str::<Value>(&t) {
            Ok(parsed @ Value::Object(_)) => Some(parsed),
            _ => Some(Value::String(t)),
        },
        (_, FieldInput::Text(t)) => Some(Value::String(t)),
    }
}

/// JSON number for `f`. Whole values in `i64` range are stored as integers so
/// they serialize as `12`, not `12.0`.
pub fn number_value(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        return Some(Value::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Copy of `value` with every whole-valued float rewritten as an integer.
pub fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .and_then(number_value)
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Schema plus the user's value tree and ad hoc fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    schema: Schema,
    value: FormValue,
    custom: Vec<CustomField>,
}

impl FormState {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            value: FormValue::new(),
            custom: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn value(&self) -> &FormValue {
        &self.value
    }

    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom
    }

    /// Replace the whole value tree.
    pub fn set_value(&mut self, value: FormValue) {
        self.value = value;
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.custom.clear();
    }

    /// Schema fields followed by custom fields.
    pub fn render(&self) -> Vec<Field> {
        let mut fields = render(&self.schema, &self.value);
        fields.extend(self.custom.iter().map(|c| Field {
            key: c.key.clone(),
            label: c.key.clone(),
            description: None,
            required: false,
            kind: c.field_type.kind(),
            value: self.value.get(&c.key).cloned().unwrap_or(Value::Null),
            custom: true,
        }));
        fields
    }

    /// The representation used for `key`: custom field, schema property, or
    /// plain text for keys neither knows about.
    pub fn kind_for(&self, key: &str) -> FieldKind {
        if let Some(c) = self.custom.iter().find(|c| c.key == key) {
            return c.field_type.kind();
        }
        find_property(&self.schema, key)
            .map(field_kind)
            .unwrap_or(FieldKind::Input(InputType::Text))
    }

    /// Apply raw input to one field.
    pub fn apply(&mut self, key: &str, input: impl Into<FieldInput>) -> &FormValue {
        let kind = self.kind_for(key);
        match convert_input(&kind, input.into()) {
            Some(v) => {
                self.value.insert(key.to_string(), v);
            }
            None => {
                self.value.remove(key);
            }
        }
        &self.value
    }

    /// Append a user-defined field. Re-adding an existing key changes its type.
    pub fn add_custom_field(&mut self, key: impl Into<String>, field_type: CustomFieldType) {
        let key = key.into();
        match self.custom.iter_mut().find(|c| c.key == key) {
            Some(existing) => existing.field_type = field_type,
            None => self.custom.push(CustomField { key, field_type }),
        }
    }

    /// Move the value under `old` to `new`; an existing `new` is overwritten.
    pub fn rename_field(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if let Some(v) = self.value.remove(old) {
            self.value.insert(new.to_string(), v);
        }
        self.custom.retain(|c| c.key != new);
        if let Some(c) = self.custom.iter_mut().find(|c| c.key == old) {
            c.key = new.to_string();
        }
    }

    pub fn remove_field(&mut self, key: &str) {
        self.value.remove(key);
        self.custom.retain(|c| c.key != key);
    }
}

/// Text shown for a value in an input: strings verbatim, `Null` empty,
/// everything else as compact JSON.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Leading integer of `s`, truncating any fractional part (`"3.9"` → 3,
/// `"-2.5"` → -2, `"12px"` → 12).
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Leading decimal number of `s` (`"1.5e3kg"` → 1500.0).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}
