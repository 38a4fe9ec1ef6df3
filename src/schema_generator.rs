use crate::annotations::{BodyBucket, OPENAPI_PROPERTY, OPENAPI_SCHEMA, PROPERTY_NAME_ANNOTATIONS};
use crate::comment::description_of;
use crate::idl::{Annotated, Field, IdlModel, StructDescriptor, TypeDescriptor};
use crate::merge::{parse_override, Override};
use crate::resolver::SchemaResolver;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Schema generator - converts IDL types to OpenAPI schemas
pub struct SchemaGenerator<'a> {
    /// The IDL model, used to look up struct descriptors
    model: &'a IdlModel,
    /// Required/emitted bookkeeping and the emitted components
    resolver: SchemaResolver,
    /// Non-fatal problems found while generating
    warnings: Vec<String>,
    /// Parsed `openapi.schema` overrides by struct name
    schema_overrides: HashMap<String, Option<Override<Schema>>>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "double", "binary")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Properties for object types, in field declaration order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrReference>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrReference>>,
    /// Value schema for map types
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaOrReference>>,
    /// Enum values
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Any other keys, usually supplied by overrides (`x-*`, `minimum`, `pattern`, ...)
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// Either an inline schema or a `$ref` to a component schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrReference {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Schema(Box<Schema>),
}

impl Schema {
    /// A schema with only a type
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    /// A schema with a type and a format
    pub fn formatted(schema_type: &str, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::typed(schema_type)
        }
    }

    /// An object schema with the given properties
    pub fn object(properties: IndexMap<String, SchemaOrReference>) -> Self {
        Self {
            properties,
            ..Self::typed("object")
        }
    }
}

impl SchemaOrReference {
    pub fn schema(schema: Schema) -> Self {
        SchemaOrReference::Schema(Box::new(schema))
    }

    pub fn reference(reference: String) -> Self {
        SchemaOrReference::Reference { reference }
    }

    /// The inline schema, if this is not a reference
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrReference::Schema(schema) => Some(schema),
            SchemaOrReference::Reference { .. } => None,
        }
    }

    /// The `$ref` pointer, if this is a reference
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            SchemaOrReference::Reference { reference } => Some(reference),
            SchemaOrReference::Schema(_) => None,
        }
    }
}

impl<'a> SchemaGenerator<'a> {
    /// Create a new SchemaGenerator over an IDL model
    pub fn new(model: &'a IdlModel) -> Self {
        debug!("Initializing SchemaGenerator over {} structs", model.structs.len());
        Self {
            model,
            resolver: SchemaResolver::new(),
            warnings: Vec::new(),
            schema_overrides: HashMap::new(),
        }
    }

    pub fn model(&self) -> &'a IdlModel {
        self.model
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut SchemaResolver {
        &mut self.resolver
    }

    /// Record a non-fatal problem
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Read an override annotation, recording a warning if it is malformed
    pub fn parse_override<T>(
        &mut self,
        element: &impl Annotated,
        key: &str,
    ) -> Option<Override<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        parse_override(element, key, &mut self.warnings)
    }

    /// Merge an override onto `target`, recording a warning if the result is invalid
    pub fn apply_override<T>(&mut self, ov: &Override<T>, target: &mut T, context: &str)
    where
        T: Serialize + DeserializeOwned,
    {
        if let Err(e) = ov.apply(target) {
            self.warn(format!("Override on {} not applied: {}", context, e));
        }
    }

    /// Generate a schema for a declared type.
    ///
    /// Struct types become a `$ref` and are queued for emission; returns `None` when a
    /// struct reference cannot be resolved.
    pub fn generate_schema(&mut self, ty: &TypeDescriptor) -> Option<SchemaOrReference> {
        if let Some(schema) = Self::primitive_to_schema(ty) {
            return Some(SchemaOrReference::schema(schema));
        }

        match ty {
            TypeDescriptor::List(inner) => {
                let items = self.generate_schema(inner)?;
                Some(SchemaOrReference::schema(Schema {
                    items: Some(Box::new(items)),
                    ..Schema::typed("array")
                }))
            }
            // Keys are string-like in OpenAPI objects, only the value type is described
            TypeDescriptor::Map { value, .. } => {
                let values = self.generate_schema(value)?;
                Some(SchemaOrReference::schema(Schema {
                    additional_properties: Some(Box::new(values)),
                    ..Schema::typed("object")
                }))
            }
            TypeDescriptor::Struct(name) => {
                if self.model.find_struct(name).is_none() {
                    self.warn(format!("Error getting struct descriptor: {} not found", name));
                    return None;
                }
                Some(SchemaOrReference::reference(self.resolver.require(name)))
            }
            _ => None,
        }
    }

    /// Convert a primitive type to an OpenAPI schema
    fn primitive_to_schema(ty: &TypeDescriptor) -> Option<Schema> {
        let schema = match ty {
            TypeDescriptor::String => Schema::typed("string"),
            TypeDescriptor::Binary => Schema::formatted("string", "binary"),
            TypeDescriptor::Bool => Schema::typed("boolean"),
            TypeDescriptor::Byte => Schema::formatted("string", "byte"),
            TypeDescriptor::Double => Schema::formatted("number", "double"),
            TypeDescriptor::I8 => Schema::formatted("integer", "int8"),
            TypeDescriptor::I16 => Schema::formatted("integer", "int16"),
            TypeDescriptor::I32 => Schema::formatted("integer", "int32"),
            TypeDescriptor::I64 => Schema::formatted("integer", "int64"),
            _ => return None,
        };
        Some(schema)
    }

    /// Schema of a struct field as a property: doc comment as description, then the
    /// field's `openapi.property` override. References are returned untouched.
    pub fn field_schema(&mut self, field: &Field) -> Option<SchemaOrReference> {
        let description = description_of(&field.comments);
        self.property_schema(field, description)
    }

    /// Schema of a struct field used as a request parameter (the parameter carries the
    /// description itself)
    pub fn parameter_schema(&mut self, field: &Field) -> Option<SchemaOrReference> {
        self.property_schema(field, None)
    }

    fn property_schema(
        &mut self,
        field: &Field,
        description: Option<String>,
    ) -> Option<SchemaOrReference> {
        let mut schema = self.generate_schema(&field.ty)?;
        if let SchemaOrReference::Schema(inner) = &mut schema {
            inner.description = description;
            if let Some(ext) = self.parse_override::<Schema>(field, OPENAPI_PROPERTY) {
                self.apply_override(&ext, inner.as_mut(), &field.name);
            }
        }
        Some(schema)
    }

    /// The struct's `openapi.schema` override, parsed (and warned about) once per struct
    pub fn schema_override(&mut self, desc: &StructDescriptor) -> Option<Override<Schema>> {
        if let Some(cached) = self.schema_overrides.get(&desc.name) {
            return cached.clone();
        }
        let parsed = self.parse_override::<Schema>(desc, OPENAPI_SCHEMA);
        self.schema_overrides.insert(desc.name.clone(), parsed.clone());
        parsed
    }

    /// Names listed as required by the struct's `openapi.schema` override
    pub fn override_required(&mut self, desc: &StructDescriptor) -> Vec<String> {
        self.schema_override(desc)
            .and_then(|ext| ext.shape())
            .map(|shape| shape.required)
            .unwrap_or_default()
    }

    /// Generate the full component schema body of a struct
    pub fn generate_struct_schema(&mut self, desc: &StructDescriptor) -> Schema {
        debug!("Generating struct schema for: {}", desc.name);

        let mut properties = IndexMap::new();
        for field in &desc.fields {
            let Some(field_schema) = self.field_schema(field) else {
                debug!("Skipping field {}.{} without schema", desc.name, field.name);
                continue;
            };
            properties.insert(property_name(field), field_schema);
        }

        let mut schema = Schema {
            description: description_of(&desc.comments),
            ..Schema::object(properties)
        };
        if let Some(ext) = self.schema_override(desc) {
            self.apply_override(&ext, &mut schema, &desc.name);
        }
        schema
    }

    /// Generate the inline object schema made of the fields in one body bucket.
    ///
    /// The result has no properties when no field of `desc` belongs to the bucket.
    pub fn generate_bucket_schema(
        &mut self,
        desc: &StructDescriptor,
        bucket: BodyBucket,
    ) -> Schema {
        let key = bucket.annotation_key();
        let ext = self.schema_override(desc);
        let all_required = ext
            .as_ref()
            .and_then(Override::shape)
            .map(|shape| shape.required)
            .unwrap_or_default();

        let mut properties = IndexMap::new();
        let mut required = Vec::new();
        for field in &desc.fields {
            if !field.has_annotation(key) {
                continue;
            }
            let name = field
                .first_annotation(key)
                .filter(|value| !value.is_empty())
                .unwrap_or(field.name.as_str())
                .to_string();
            let Some(field_schema) = self.field_schema(field) else {
                continue;
            };
            if all_required.contains(&name) {
                required.push(name.clone());
            }
            properties.insert(name, field_schema);
        }

        let mut schema = Schema::object(properties);
        if let Some(ext) = ext {
            self.apply_override(&ext, &mut schema, &desc.name);
        }
        schema.required = required;
        schema
    }

    /// Emit component schemas for every required struct until no new references appear.
    ///
    /// Each pass walks all structs (nested dependencies first) and emits those that are
    /// required but not yet emitted. Emitting can require further structs, which are
    /// handled by the next pass.
    pub fn resolve_required_schemas(&mut self) {
        let order = self.walk_order();
        let mut pass = 0;

        while self.resolver.has_pending() {
            pass += 1;
            let count = self.resolver.pending_len();
            debug!("Schema resolution pass {}: {} required", pass, count);

            for desc in &order {
                if self.resolver.is_pending(&desc.name) && !self.resolver.is_emitted(&desc.name) {
                    let schema = self.generate_struct_schema(desc);
                    self.resolver
                        .emit(&desc.name, SchemaOrReference::schema(schema));
                }
            }

            self.resolver.settle(count);
        }
    }

    /// All structs in depth-first order, each struct after the structs its fields use
    fn walk_order(&self) -> Vec<&'a StructDescriptor> {
        let model = self.model;
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for desc in &model.structs {
            visit_struct(model, desc, &mut visited, &mut order);
        }
        order
    }

    /// Consume the generator, returning emitted components and collected warnings
    pub fn into_parts(self) -> (IndexMap<String, SchemaOrReference>, Vec<String>) {
        (self.resolver.into_schemas(), self.warnings)
    }
}

fn visit_struct<'a>(
    model: &'a IdlModel,
    desc: &'a StructDescriptor,
    visited: &mut HashSet<&'a str>,
    order: &mut Vec<&'a StructDescriptor>,
) {
    if !visited.insert(desc.name.as_str()) {
        return;
    }
    for field in &desc.fields {
        if let Some(nested) = field.ty.struct_name().and_then(|name| model.find_struct(name)) {
            visit_struct(model, nested, visited, order);
        }
    }
    order.push(desc);
}

/// Property name of a field in a struct component: the last non-empty rename among the
/// header/body annotations, or the field name.
fn property_name(field: &Field) -> String {
    PROPERTY_NAME_ANNOTATIONS
        .iter()
        .filter_map(|key| field.first_annotation(key))
        .filter(|value| !value.is_empty())
        .last()
        .unwrap_or(field.name.as_str())
        .to_string()
}
