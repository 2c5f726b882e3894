//! Body of the index creation request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Everything sent with `PUT /{index}`.
///
/// An empty `IndexOptions` produces `{}` and lets the engine apply its
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    /// Index settings.
    pub settings: IndexSettings,
    /// Field mappings.
    pub mappings: Option<Mapping>,
    /// Aliases pointing at the new index.
    pub aliases: Vec<String>,
}

impl IndexOptions {
    /// Options with engine defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index settings.
    pub fn settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the mappings.
    pub fn mappings(mut self, mappings: Mapping) -> Self {
        self.mappings = Some(mappings);
        self
    }

    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Render the request body.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();

        let settings = self.settings.to_json();
        if !settings.is_empty() {
            body.insert("settings".to_string(), Value::Object(settings));
        }
        if let Some(mappings) = &self.mappings {
            body.insert("mappings".to_string(), mappings.to_json());
        }
        if !self.aliases.is_empty() {
            let aliases: Map<String, Value> = self
                .aliases
                .iter()
                .map(|alias| (alias.clone(), json!({})))
                .collect();
            body.insert("aliases".to_string(), Value::Object(aliases));
        }

        Value::Object(body)
    }
}

/// Index-level settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSettings {
    /// Number of primary shards.
    pub number_of_shards: Option<u32>,
    /// Number of replicas per shard.
    pub number_of_replicas: Option<u32>,
    /// Refresh interval, e.g. `"1s"` or `"-1"`.
    pub refresh_interval: Option<String>,
    /// Upper bound of `from + size` for searches.
    pub max_result_window: Option<u64>,
    /// Raw `analysis` block.
    pub analysis: Option<Value>,
}

impl IndexSettings {
    /// Empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of shards.
    pub fn shards(mut self, shards: u32) -> Self {
        self.number_of_shards = Some(shards);
        self
    }

    /// Set number of replicas.
    pub fn replicas(mut self, replicas: u32) -> Self {
        self.number_of_replicas = Some(replicas);
        self
    }

    /// Set refresh interval.
    pub fn refresh_interval(mut self, interval: impl Into<String>) -> Self {
        self.refresh_interval = Some(interval.into());
        self
    }

    /// Set the maximum result window.
    pub fn max_result_window(mut self, window: u64) -> Self {
        self.max_result_window = Some(window);
        self
    }

    /// Set the analysis block.
    pub fn analysis(mut self, analysis: Value) -> Self {
        self.analysis = Some(analysis);
        self
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut settings = Map::new();

        if let Some(shards) = self.number_of_shards {
            settings.insert("number_of_shards".to_string(), json!(shards));
        }
        if let Some(replicas) = self.number_of_replicas {
            settings.insert("number_of_replicas".to_string(), json!(replicas));
        }
        if let Some(interval) = &self.refresh_interval {
            settings.insert("refresh_interval".to_string(), json!(interval));
        }
        if let Some(window) = self.max_result_window {
            settings.insert("max_result_window".to_string(), json!(window));
        }
        if let Some(analysis) = &self.analysis {
            settings.insert("analysis".to_string(), analysis.clone());
        }

        settings
    }
}

/// Field mappings, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    /// Field definitions.
    pub properties: Vec<(String, MappingField)>,
    /// Dynamic mapping mode (`true`, `false`, `strict`).
    pub dynamic: Option<String>,
}

impl Mapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn field(mut self, name: impl Into<String>, field: MappingField) -> Self {
        let name = name.into();
        match self.properties.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.properties.push((name, field)),
        }
        self
    }

    /// Set dynamic mapping.
    pub fn dynamic(mut self, dynamic: impl Into<String>) -> Self {
        self.dynamic = Some(dynamic.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut mapping = Map::new();

        if let Some(dynamic) = &self.dynamic {
            mapping.insert("dynamic".to_string(), json!(dynamic));
        }
        mapping.insert("properties".to_string(), properties_json(&self.properties));

        Value::Object(mapping)
    }
}

fn properties_json(properties: &[(String, MappingField)]) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(name, field)| (name.clone(), field.to_json()))
            .collect(),
    )
}

/// One field of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingField {
    /// Field type.
    pub field_type: FieldType,
    /// Analyzer for text fields.
    pub analyzer: Option<String>,
    /// Date format for date fields.
    pub format: Option<String>,
    /// Whether the field is indexed.
    pub index: Option<bool>,
    /// Sub-fields, e.g. a `keyword` under a `text` field.
    pub fields: Vec<(String, MappingField)>,
    /// Children of `object` and `nested` fields.
    pub properties: Vec<(String, MappingField)>,
}

impl MappingField {
    /// Field of the given type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            analyzer: None,
            format: None,
            index: None,
            fields: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// `text` field.
    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    /// `text` field with a `keyword` sub-field, the engine's dynamic
    /// default for strings. Exact, regex and wildcard filters run against
    /// the sub-field.
    pub fn text_with_keyword() -> Self {
        Self::text().sub_field("keyword", Self::keyword())
    }

    /// `keyword` field.
    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    /// `integer` field.
    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    /// `long` field.
    pub fn long() -> Self {
        Self::new(FieldType::Long)
    }

    /// `float` field.
    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    /// `double` field.
    pub fn double() -> Self {
        Self::new(FieldType::Double)
    }

    /// `boolean` field.
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// `date` field.
    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    /// `object` field.
    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    /// `nested` field.
    pub fn nested() -> Self {
        Self::new(FieldType::Nested)
    }

    /// Set analyzer.
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Set date format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Enable or disable indexing.
    pub fn indexed(mut self, index: bool) -> Self {
        self.index = Some(index);
        self
    }

    /// Add a sub-field.
    pub fn sub_field(mut self, name: impl Into<String>, field: MappingField) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Add a child property.
    pub fn property(mut self, name: impl Into<String>, field: MappingField) -> Self {
        self.properties.push((name.into(), field));
        self
    }

    fn to_json(&self) -> Value {
        let mut field = Map::new();

        field.insert("type".to_string(), json!(self.field_type));

        if let Some(analyzer) = &self.analyzer {
            field.insert("analyzer".to_string(), json!(analyzer));
        }
        if let Some(format) = &self.format {
            field.insert("format".to_string(), json!(format));
        }
        if let Some(index) = self.index {
            field.insert("index".to_string(), json!(index));
        }
        if !self.fields.is_empty() {
            field.insert("fields".to_string(), properties_json(&self.fields));
        }
        if !self.properties.is_empty() {
            field.insert("properties".to_string(), properties_json(&self.properties));
        }

        Value::Object(field)
    }
}

/// Field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Full-text searchable field.
    Text,
    /// Exact match keyword field.
    Keyword,
    /// 64-bit integer.
    Long,
    /// 32-bit integer.
    Integer,
    /// 16-bit integer.
    Short,
    /// Double precision float.
    Double,
    /// Single precision float.
    Float,
    /// Boolean.
    Boolean,
    /// Date.
    Date,
    /// IP address.
    Ip,
    /// Geo point.
    GeoPoint,
    /// Nested object.
    Nested,
    /// Object.
    Object,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options() {
        assert_eq!(IndexOptions::new().to_json(), json!({}));
    }

    #[test]
    fn test_full_body() {
        let options = IndexOptions::new()
            .settings(IndexSettings::new().shards(1).replicas(0).refresh_interval("1s"))
            .mappings(
                Mapping::new()
                    .dynamic("strict")
                    .field("name", MappingField::text_with_keyword())
                    .field("year", MappingField::integer())
                    .field("released", MappingField::date().format("yyyy-MM-dd")),
            )
            .alias("films");

        assert_eq!(
            options.to_json(),
            json!({
                "settings": { "number_of_shards": 1, "number_of_replicas": 0, "refresh_interval": "1s" },
                "mappings": {
                    "dynamic": "strict",
                    "properties": {
                        "name": { "type": "text", "fields": { "keyword": { "type": "keyword" } } },
                        "year": { "type": "integer" },
                        "released": { "type": "date", "format": "yyyy-MM-dd" }
                    }
                },
                "aliases": { "films": {} }
            })
        );
    }

    #[test]
    fn test_mapping_field_replaced_in_place() {
        let mapping = Mapping::new()
            .field("a", MappingField::text())
            .field("b", MappingField::long())
            .field("a", MappingField::keyword());
        let names: Vec<_> = mapping.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(mapping.properties[0].1.field_type, FieldType::Keyword);
    }

    #[test]
    fn test_nested_properties() {
        let field = MappingField::nested()
            .property("actor", MappingField::keyword())
            .property("role", MappingField::text().analyzer("english"));
        assert_eq!(
            field.to_json(),
            json!({
                "type": "nested",
                "properties": {
                    "actor": { "type": "keyword" },
                    "role": { "type": "text", "analyzer": "english" }
                }
            })
        );
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(json!(FieldType::GeoPoint), json!("geo_point"));
        assert_eq!(json!(FieldType::Keyword), json!("keyword"));
    }
}
