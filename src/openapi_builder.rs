use crate::annotations::{role_of, HttpMethod, Role, OPENAPI_DOCUMENT};
use crate::comment::description_of;
use crate::idl::{Annotated, Service};
use crate::operation_builder::OperationBuilder;
use crate::schema_generator::{SchemaGenerator, SchemaOrReference};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAPI version written into every generated document
pub const OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// The document under construction
    document: OpenApiDocument,
}

/// Output of a generation run
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// The generated document
    pub document: OpenApiDocument,
    /// Non-fatal problems encountered while generating
    pub warnings: Vec<String>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    #[serde(default)]
    pub title: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "termsOfService", default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    /// API version
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }
}

/// OpenAPI Tag object, one per service that exposes operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// Servers shared by all operations of this path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Parameters (query, path, header, cookie)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Operation-level server override
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// Where a parameter is read from in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (query, path, header, cookie)
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Parameter description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter is required
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    /// Parameter schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrReference>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content types and their schemas
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: SchemaOrReference,
}

/// OpenAPI Header object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrReference>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    #[serde(default)]
    pub description: String,
    /// Response headers
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Header>,
    /// Response content
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, SchemaOrReference>,
    /// Other component kinds (securitySchemes, responses, ...), taken over from overrides
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.extensions.is_empty()
    }
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Document-level servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// API paths
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas, etc.)
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
    /// One tag per service
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl PathItem {
    /// The operation slot for an HTTP method
    pub fn operation_slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    /// The operation for an HTTP method, if any
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    /// All present operations
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.operation(method))
    }

    /// All present operations, mutably
    pub fn operations_mut(&mut self) -> impl Iterator<Item = &mut Operation> {
        [
            &mut self.get,
            &mut self.post,
            &mut self.put,
            &mut self.delete,
            &mut self.patch,
            &mut self.options,
            &mut self.head,
        ]
        .into_iter()
        .flatten()
    }
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with an empty document.
    ///
    /// Title and description stay unset until [`build`](Self::build), so a single service
    /// or a document override can still provide them.
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            document: OpenApiDocument {
                openapi: OPENAPI_VERSION.to_string(),
                info: Info {
                    version: "1.0.0".to_string(),
                    ..Default::default()
                },
                servers: Vec::new(),
                paths: IndexMap::new(),
                components: Components::default(),
                tags: Vec::new(),
                extensions: IndexMap::new(),
            },
        }
    }

    /// Set custom info for the API
    pub fn with_info(
        mut self,
        title: String,
        version: String,
        description: Option<String>,
    ) -> Self {
        self.document.info.title = title;
        self.document.info.version = version;
        self.document.info.description = description;
        self
    }

    /// The document as built so far
    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }

    /// Merge the `openapi.document` override onto the document.
    ///
    /// The override is read from the first service carrying one, otherwise from the first
    /// struct carrying one. Component schemas it supplies count as already emitted.
    pub fn apply_document_override(&mut self, schema_gen: &mut SchemaGenerator) {
        let model = schema_gen.model();

        let ext = if let Some(service) = model
            .services
            .iter()
            .find(|s| s.has_annotation(OPENAPI_DOCUMENT))
        {
            debug!("Document override found on service {}", service.name);
            schema_gen.parse_override::<OpenApiDocument>(service, OPENAPI_DOCUMENT)
        } else if let Some(desc) = model
            .structs
            .iter()
            .find(|s| s.has_annotation(OPENAPI_DOCUMENT))
        {
            debug!("Document override found on struct {}", desc.name);
            schema_gen.parse_override::<OpenApiDocument>(desc, OPENAPI_DOCUMENT)
        } else {
            None
        };

        let Some(ext) = ext else {
            return;
        };
        schema_gen.apply_override(&ext, &mut self.document, "document");

        for name in self.document.components.schemas.keys() {
            schema_gen.resolver_mut().mark_emitted(name);
        }
    }

    /// Add every annotated method of a service to the document.
    ///
    /// The service becomes a tag only if at least one operation was produced.
    pub fn add_service<'a>(&mut self, service: &'a Service, schema_gen: &mut SchemaGenerator<'a>) {
        debug!("Adding service: {}", service.name);
        let mut operations_count = 0;

        for method in &service.methods {
            let mut routes = Vec::new();
            for (key, values) in method.annotations() {
                match role_of(key) {
                    Some(Role::Method(http_method)) => match values.first() {
                        Some(path) if !path.is_empty() => routes.push((http_method, path.as_str())),
                        _ => schema_gen.warn(format!(
                            "Method '{}.{}' has {} without a path, skipping",
                            service.name, method.name, key
                        )),
                    },
                    Some(Role::AnyMethod) => schema_gen.warn(format!(
                        "Method '{}.{}' uses {}, which has no OpenAPI method slot, skipping",
                        service.name, method.name, key
                    )),
                    _ => {}
                }
            }
            if routes.is_empty() {
                continue;
            }

            let builder = OperationBuilder::new(service, method, schema_gen);
            for (http_method, path_template) in routes {
                let (path, operation) = builder.build(http_method, path_template, schema_gen);
                self.add_operation(path, http_method, operation);
                operations_count += 1;
            }
        }

        if operations_count > 0 {
            self.document.tags.push(Tag {
                name: service.name.clone(),
                description: description_of(&service.comments),
            });
        }
    }

    /// Attach an operation to the path item for `path`, creating the item on first use
    pub fn add_operation(&mut self, path: String, method: HttpMethod, operation: Operation) {
        debug!("Adding operation: {} {}", method.as_str(), path);
        let path_item = self.document.paths.entry(path).or_default();
        let slot = path_item.operation_slot(method);
        if slot.is_some() {
            debug!("Replacing existing {} operation", method.as_str());
        }
        *slot = Some(operation);
    }

    /// Build the final OpenAPI document
    pub fn build(mut self, mut schema_gen: SchemaGenerator) -> GenerationResult {
        debug!("Building final OpenAPI document");

        schema_gen.resolve_required_schemas();
        let (schemas, warnings) = schema_gen.into_parts();
        self.document.components.schemas.extend(schemas);

        let document = &mut self.document;
        promote_single_tag(document);
        hoist_servers(document);
        if document.info.title.is_empty() {
            document.info.title = "API".to_string();
        }
        if document.info.description.is_none() {
            document.info.description = Some("API description".to_string());
        }

        document.tags.sort_by(|a, b| a.name.cmp(&b.name));
        document.paths.sort_keys();
        document.components.schemas.sort_keys();

        info!(
            "Document has {} paths, {} schemas, {} tags",
            document.paths.len(),
            document.components.schemas.len(),
            document.tags.len()
        );

        GenerationResult {
            document: self.document,
            warnings,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// With a single tag, let it name and describe the API where the info is still empty.
fn promote_single_tag(document: &mut OpenApiDocument) {
    if document.tags.len() != 1 {
        return;
    }
    let tag = &mut document.tags[0];
    if document.info.title.is_empty() && !tag.name.is_empty() {
        document.info.title = format!("{} API", tag.name);
    }
    if document.info.description.is_none() {
        document.info.description = tag.description.clone();
    }
    tag.description = None;
}

/// Move operation servers up to path level where a path agrees on one URL, and to the
/// document level. With a single URL overall, path-level servers are dropped entirely.
fn hoist_servers(document: &mut OpenApiDocument) {
    let mut all_servers: Vec<String> = Vec::new();

    for path_item in document.paths.values_mut() {
        let mut servers: Vec<String> = Vec::new();
        for operation in path_item.operations() {
            if let [server] = operation.servers.as_slice() {
                push_unique(&mut servers, &server.url);
                push_unique(&mut all_servers, &server.url);
            }
        }

        if let [url] = servers.as_slice() {
            path_item.servers = vec![Server::new(url.clone())];
            for operation in path_item.operations_mut() {
                if matches!(operation.servers.as_slice(), [server] if &server.url == url) {
                    operation.servers.clear();
                }
            }
        }
    }

    if !all_servers.is_empty() {
        document.servers = all_servers.iter().map(Server::new).collect();
    }
    if all_servers.len() == 1 {
        for path_item in document.paths.values_mut() {
            path_item.servers.clear();
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}
