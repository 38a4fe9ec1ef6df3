//! In-memory IDL model consumed by the generator.
//!
//! The model mirrors what an IDL parser/reflection layer hands over after parsing:
//! services with their methods, struct descriptors with their fields, and the raw
//! annotations and doc comments attached to each element. It is deserialized from a
//! JSON or YAML dump (see [`crate::loader`]) and never mutated by the generator.
//!
//! # Example
//!
//! ```
//! use openapi_from_idl::idl::{IdlModel, TypeDescriptor};
//!
//! let model = IdlModel::from_yaml_str(r#"
//! structs:
//!   - name: HelloResp
//!     fields:
//!       - name: message
//!         type: string
//!         annotations: { api.body: ["message"] }
//! "#).unwrap();
//!
//! let resp = model.find_struct("HelloResp").unwrap();
//! assert_eq!(resp.fields[0].ty, TypeDescriptor::String);
//! ```

use crate::error::Result;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Annotations attached to an IDL element: key -> ordered values, in declaration order.
pub type Annotations = IndexMap<String, Vec<String>>;

/// Access to the annotations of an IDL element.
pub trait Annotated {
    /// All annotations of the element
    fn annotations(&self) -> &Annotations;

    /// Values of one annotation key, empty if the key is absent
    fn annotation(&self, key: &str) -> &[String] {
        self.annotations()
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the annotation key is present at all (even without values)
    fn has_annotation(&self, key: &str) -> bool {
        self.annotations().contains_key(key)
    }

    /// First value of an annotation key
    fn first_annotation(&self, key: &str) -> Option<&str> {
        self.annotation(key).first().map(String::as_str)
    }
}

/// A complete parsed IDL model (possibly merged from several files)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdlModel {
    /// Services in declaration order
    #[serde(default)]
    pub services: Vec<Service>,
    /// Struct descriptors in declaration order
    #[serde(default)]
    pub structs: Vec<StructDescriptor>,
}

/// An RPC service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    /// Raw doc comment text, including comment markers
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub methods: Vec<Method>,
}

/// One method of a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Output type; `None` for methods without a result
    #[serde(default)]
    pub return_type: Option<TypeDescriptor>,
}

/// A method argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

/// Reflective metadata of one struct, identified by its name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructDescriptor {
    pub name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A struct field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub annotations: Annotations,
}

/// Declared type of a field or argument.
///
/// Primitives serialize as plain strings (`string`, `i64`, ...), containers and
/// struct references as single-key mappings (`{list: i32}`, `{struct: User}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDescriptor {
    String,
    Binary,
    Bool,
    Byte,
    Double,
    I8,
    I16,
    I32,
    I64,
    List(Box<TypeDescriptor>),
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Struct(String),
}

impl TypeDescriptor {
    /// Create a `list<inner>` type
    pub fn list(inner: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(inner))
    }

    /// Create a `map<key, value>` type
    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Create a struct reference
    pub fn struct_ref(name: impl Into<String>) -> Self {
        TypeDescriptor::Struct(name.into())
    }

    /// Whether this is a primitive (non-container, non-struct) type
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            TypeDescriptor::List(_) | TypeDescriptor::Map { .. } | TypeDescriptor::Struct(_)
        )
    }

    /// Name of the struct this type ultimately refers to, looking through containers
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Struct(name) => Some(name),
            TypeDescriptor::List(inner) => inner.struct_name(),
            TypeDescriptor::Map { value, .. } => value.struct_name(),
            _ => None,
        }
    }
}

/// Parse a YAML document into any model type.
///
/// serde_yaml only maps YAML tags (`!struct User`) onto enum variants, while model dumps
/// write them as single-key mappings (`{struct: User}`). The document is therefore read
/// into a JSON value first and deserialized from there, which accepts the same shapes as
/// a JSON dump.
pub fn from_yaml_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    let value: serde_json::Value = serde_yaml::from_str(content)?;
    Ok(serde_json::from_value(value)?)
}

impl IdlModel {
    /// Parse a YAML model dump
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        from_yaml_str(content)
    }

    /// Parse a JSON model dump
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Look up a struct descriptor by name
    pub fn find_struct(&self, name: &str) -> Option<&StructDescriptor> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Append another model, keeping the first definition of each struct name.
    ///
    /// Returns the names of struct definitions that were dropped as duplicates.
    pub fn extend(&mut self, other: IdlModel) -> Vec<String> {
        let mut duplicates = Vec::new();
        self.services.extend(other.services);
        for desc in other.structs {
            if self.find_struct(&desc.name).is_some() {
                duplicates.push(desc.name);
            } else {
                self.structs.push(desc);
            }
        }
        duplicates
    }
}

impl Annotated for Service {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

impl Annotated for Method {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

impl Annotated for StructDescriptor {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

impl Annotated for Field {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_descriptor_yaml_forms() {
        let yaml = r#"
- string
- i64
- { list: bool }
- { map: { key: string, value: { struct: User } } }
- { struct: User }
"#;
        let types: Vec<TypeDescriptor> = from_yaml_str(yaml).unwrap();

        assert_eq!(types[0], TypeDescriptor::String);
        assert_eq!(types[1], TypeDescriptor::I64);
        assert_eq!(types[2], TypeDescriptor::list(TypeDescriptor::Bool));
        assert_eq!(
            types[3],
            TypeDescriptor::map(TypeDescriptor::String, TypeDescriptor::struct_ref("User"))
        );
        assert_eq!(types[4], TypeDescriptor::struct_ref("User"));
    }

    #[test]
    fn test_model_yaml_with_container_and_struct_types() {
        let model = IdlModel::from_yaml_str(
            r#"
services:
  - name: UserService
    methods:
      - name: Get
        arguments: [{ name: req, type: { struct: GetUserReq } }]
        return_type: { struct: User }
structs:
  - name: User
    fields:
      - { name: tags, type: { list: string } }
      - { name: scores, type: { map: { key: string, value: i32 } } }
"#,
        )
        .unwrap();

        let method = &model.services[0].methods[0];
        assert_eq!(
            method.arguments[0].ty,
            TypeDescriptor::struct_ref("GetUserReq")
        );
        assert_eq!(method.return_type, Some(TypeDescriptor::struct_ref("User")));
        let user = model.find_struct("User").unwrap();
        assert_eq!(user.fields[0].ty, TypeDescriptor::list(TypeDescriptor::String));
        assert_eq!(
            user.fields[1].ty,
            TypeDescriptor::map(TypeDescriptor::String, TypeDescriptor::I32)
        );
    }

    #[test]
    fn test_struct_name_looks_through_containers() {
        let ty = TypeDescriptor::list(TypeDescriptor::map(
            TypeDescriptor::String,
            TypeDescriptor::struct_ref("Item"),
        ));
        assert_eq!(ty.struct_name(), Some("Item"));
        assert_eq!(TypeDescriptor::I32.struct_name(), None);
        assert!(TypeDescriptor::Binary.is_primitive());
        assert!(!ty.is_primitive());
    }

    #[test]
    fn test_annotation_lookup() {
        let field: Field = from_yaml_str(
            r#"
name: id
type: i64
annotations:
  api.path: ["id"]
  api.body: []
"#,
        )
        .unwrap();

        assert_eq!(field.annotation("api.path"), ["id".to_string()]);
        assert_eq!(field.first_annotation("api.path"), Some("id"));
        assert!(field.has_annotation("api.body"));
        assert_eq!(field.first_annotation("api.body"), None);
        assert!(field.annotation("api.query").is_empty());
    }

    #[test]
    fn test_annotations_keep_declaration_order() {
        let method: Method = from_yaml_str(
            r#"
name: Hello
annotations:
  api.post: ["/b"]
  api.get: ["/a"]
"#,
        )
        .unwrap();

        let keys: Vec<_> = method.annotations.keys().cloned().collect();
        assert_eq!(keys, vec!["api.post", "api.get"]);
    }

    #[test]
    fn test_extend_keeps_first_struct_definition() {
        let mut model = IdlModel {
            services: vec![],
            structs: vec![StructDescriptor {
                name: "User".to_string(),
                comments: "// first".to_string(),
                ..Default::default()
            }],
        };
        let other = IdlModel {
            services: vec![Service {
                name: "UserService".to_string(),
                ..Default::default()
            }],
            structs: vec![
                StructDescriptor {
                    name: "User".to_string(),
                    comments: "// second".to_string(),
                    ..Default::default()
                },
                StructDescriptor {
                    name: "Profile".to_string(),
                    ..Default::default()
                },
            ],
        };

        let duplicates = model.extend(other);

        assert_eq!(duplicates, vec!["User".to_string()]);
        assert_eq!(model.services.len(), 1);
        assert_eq!(model.structs.len(), 2);
        assert_eq!(model.find_struct("User").unwrap().comments, "// first");
    }
}
