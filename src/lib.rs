//! openapi-from-idl - OpenAPI 3.0.3 documents from annotated IDL models.
//!
//! This library turns a parsed IDL model (services, methods, structs and the annotations
//! attached to them) into an OpenAPI document. Annotations such as `api.get`, `api.query`
//! or `api.body` describe how a method is exposed over HTTP; `openapi.*` annotations carry
//! override payloads that are merged onto the generated output.
//!
//! # Architecture
//!
//! 1. [`loader`] - Loads and merges IDL model dumps (JSON or YAML)
//! 2. [`idl`] - The IDL model: services, methods, structs, fields and types
//! 3. [`annotations`] - The annotation vocabulary and the role of each key
//! 4. [`comment`] - Doc comment normalization
//! 5. [`schema_generator`] - Converts IDL types and structs to OpenAPI schemas
//! 6. [`resolver`] - Tracks referenced and emitted component schemas
//! 7. [`merge`] - Parses override payloads and merges them onto generated structures
//! 8. [`operation_builder`] - Builds one operation per exposed method and HTTP method
//! 9. [`openapi_builder`] - Assembles and post-processes the complete document
//! 10. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```
//! use openapi_from_idl::{generate, idl::IdlModel, serializer::serialize_yaml};
//!
//! let model = IdlModel::from_yaml_str(r#"
//! services:
//!   - name: Greeter
//!     methods:
//!       - name: Hello
//!         annotations: { api.get: ["/hello/:name"] }
//!         arguments: [{ name: req, type: { struct: HelloReq } }]
//! structs:
//!   - name: HelloReq
//!     fields:
//!       - { name: name, type: string, annotations: { api.path: ["name"] } }
//! "#).unwrap();
//!
//! let result = generate(&model);
//! assert!(result.document.paths.contains_key("/hello/{name}"));
//!
//! let yaml = serialize_yaml(&result.document).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod annotations;
pub mod cli;
pub mod comment;
pub mod error;
pub mod idl;
pub mod loader;
pub mod merge;
pub mod openapi_builder;
pub mod operation_builder;
pub mod resolver;
pub mod schema_generator;
pub mod serializer;

use crate::idl::IdlModel;
use crate::openapi_builder::{GenerationResult, OpenApiBuilder};
use crate::schema_generator::SchemaGenerator;
use log::debug;

/// Generate the OpenAPI document for a whole IDL model.
///
/// Generation never fails: problems such as unresolvable struct references or malformed
/// override payloads are reported in [`GenerationResult::warnings`].
pub fn generate(model: &IdlModel) -> GenerationResult {
    debug!(
        "Generating document for {} services and {} structs",
        model.services.len(),
        model.structs.len()
    );

    let mut schema_gen = SchemaGenerator::new(model);
    let mut builder = OpenApiBuilder::new();

    builder.apply_document_override(&mut schema_gen);
    for service in &model.services {
        builder.add_service(service, &mut schema_gen);
    }

    builder.build(schema_gen)
}
