use crate::annotations::{
    BodyBucket, HttpMethod, API_BASE_DOMAIN, API_BASE_URL, API_HEADER, API_PATH,
    OPENAPI_OPERATION, OPENAPI_PARAMETER, PARAMETER_EVALUATION_ORDER,
};
use crate::comment::description_of;
use crate::idl::{Annotated, Method, Service, StructDescriptor, TypeDescriptor};
use crate::merge::Override;
use crate::openapi_builder::{
    Header, MediaType, Operation, Parameter, RequestBody, Response, Server,
};
use crate::resolver::schema_ref;
use crate::schema_generator::{SchemaGenerator, SchemaOrReference};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Status code of the single response every operation declares
pub const SUCCESS_STATUS: &str = "200";

const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful response";

/// Builds the operations of one IDL method, one per HTTP method annotation
pub struct OperationBuilder<'a> {
    service: &'a Service,
    method: &'a Method,
    /// Struct of the first argument, source of parameters and request bodies
    input: Option<&'a StructDescriptor>,
    /// Return struct, source of the response
    output: Option<&'a StructDescriptor>,
    /// Server URL with scheme
    host: Option<String>,
    operation_override: Option<Override<Operation>>,
}

impl<'a> OperationBuilder<'a> {
    /// Resolve the input/output structs, server host and operation override of a method
    pub fn new(
        service: &'a Service,
        method: &'a Method,
        schema_gen: &mut SchemaGenerator<'a>,
    ) -> Self {
        if method.arguments.len() > 1 {
            schema_gen.warn(format!(
                "Method '{}.{}' has more than one argument, only the first is used",
                service.name, method.name
            ));
        }

        let input = method
            .arguments
            .first()
            .and_then(|arg| Self::struct_of(&arg.ty, service, method, "argument", schema_gen));
        let output = method
            .return_type
            .as_ref()
            .and_then(|ty| Self::struct_of(ty, service, method, "return type", schema_gen));

        let host = method
            .first_annotation(API_BASE_URL)
            .filter(|url| !url.is_empty())
            .or_else(|| {
                service
                    .first_annotation(API_BASE_DOMAIN)
                    .filter(|domain| !domain.is_empty())
            })
            .map(with_scheme);

        let operation_override = schema_gen.parse_override::<Operation>(method, OPENAPI_OPERATION);

        Self {
            service,
            method,
            input,
            output,
            host,
            operation_override,
        }
    }

    fn struct_of(
        ty: &TypeDescriptor,
        service: &Service,
        method: &Method,
        role: &str,
        schema_gen: &mut SchemaGenerator<'a>,
    ) -> Option<&'a StructDescriptor> {
        let TypeDescriptor::Struct(name) = ty else {
            debug!(
                "{} of {}.{} is not a struct, ignoring",
                role, service.name, method.name
            );
            return None;
        };
        let desc = schema_gen.model().find_struct(name);
        if desc.is_none() {
            schema_gen.warn(format!(
                "Error getting struct descriptor: {} not found ({} of {}.{})",
                name, role, service.name, method.name
            ));
        }
        desc
    }

    /// The operation identifier, `{Service}_{Method}`
    pub fn operation_id(&self) -> String {
        format!("{}_{}", self.service.name, self.method.name)
    }

    /// Build the operation for one HTTP method and path template.
    ///
    /// Returns the OpenAPI path (placeholders rewritten) together with the operation.
    pub fn build(
        &self,
        http_method: HttpMethod,
        path_template: &str,
        schema_gen: &mut SchemaGenerator<'a>,
    ) -> (String, Operation) {
        let operation_id = self.operation_id();
        debug!(
            "Building operation {} for {} {}",
            operation_id,
            http_method.as_str(),
            path_template
        );

        let parameters = self.build_parameters(schema_gen);
        let request_body = if http_method.allows_request_body() {
            self.build_request_body(schema_gen)
        } else {
            None
        };
        let response = self.build_response(schema_gen);

        let mut operation = Operation {
            tags: vec![self.service.name.clone()],
            description: description_of(&self.method.comments),
            operation_id: Some(operation_id.clone()),
            parameters,
            request_body,
            responses: IndexMap::from([(SUCCESS_STATUS.to_string(), response)]),
            servers: self.host.iter().map(Server::new).collect(),
            ..Default::default()
        };

        if let Some(ext) = &self.operation_override {
            schema_gen.apply_override(ext, &mut operation, &operation_id);
        }

        (normalize_path(path_template), operation)
    }

    /// One parameter per input field carrying a non-empty location annotation
    fn build_parameters(&self, schema_gen: &mut SchemaGenerator<'a>) -> Vec<Parameter> {
        let Some(input) = self.input else {
            return Vec::new();
        };
        let required_names = schema_gen.override_required(input);

        let mut parameters = Vec::new();
        for field in &input.fields {
            // Later locations overwrite earlier ones
            let mut selected = None;
            for location in PARAMETER_EVALUATION_ORDER {
                if let Some(name) = field
                    .first_annotation(location.annotation_key())
                    .filter(|name| !name.is_empty())
                {
                    selected = Some((location, name));
                }
            }
            let Some((location, name)) = selected else {
                continue;
            };
            // A path binding keeps the parameter required even when another location wins
            let path_bound = field
                .first_annotation(API_PATH)
                .is_some_and(|path| !path.is_empty());

            let Some(schema) = schema_gen.parameter_schema(field) else {
                debug!("Skipping parameter {} without schema", name);
                continue;
            };

            let mut parameter = Parameter {
                name: name.to_string(),
                location,
                description: description_of(&field.comments),
                required: path_bound || required_names.iter().any(|required| required == name),
                deprecated: None,
                schema: Some(schema),
                extensions: IndexMap::new(),
            };
            if let Some(ext) = schema_gen.parse_override::<Parameter>(field, OPENAPI_PARAMETER) {
                schema_gen.apply_override(&ext, &mut parameter, &field.name);
            }
            parameters.push(parameter);
        }
        parameters
    }

    /// Group body-annotated input fields into their content-type buckets
    fn build_request_body(&self, schema_gen: &mut SchemaGenerator<'a>) -> Option<RequestBody> {
        let input = self.input?;

        let mut content = IndexMap::new();
        for bucket in BodyBucket::ALL {
            if !has_bucket_fields(input, bucket) {
                continue;
            }
            let schema = schema_gen.generate_bucket_schema(input, bucket);
            if schema.properties.is_empty() {
                continue;
            }
            content.insert(
                bucket.content_type().to_string(),
                MediaType {
                    schema: SchemaOrReference::schema(schema),
                },
            );
        }

        if content.is_empty() {
            return None;
        }
        Some(RequestBody {
            description: description_of(&input.comments),
            content,
            required: None,
        })
    }

    /// The `200` response: header fields become headers, json/raw body fields become
    /// content referencing the output struct's component
    fn build_response(&self, schema_gen: &mut SchemaGenerator<'a>) -> Response {
        let mut response = Response {
            description: DEFAULT_RESPONSE_DESCRIPTION.to_string(),
            ..Default::default()
        };
        let Some(output) = self.output else {
            return response;
        };
        if let Some(description) = description_of(&output.comments) {
            response.description = description;
        }

        for field in &output.fields {
            let Some(name) = field
                .first_annotation(API_HEADER)
                .filter(|name| !name.is_empty())
            else {
                continue;
            };
            response.headers.insert(
                name.to_string(),
                Header {
                    description: description_of(&field.comments),
                    schema: schema_gen.generate_schema(&field.ty),
                },
            );
        }

        for bucket in [BodyBucket::Json, BodyBucket::Raw] {
            if !has_bucket_fields(output, bucket) {
                continue;
            }
            let schema = schema_gen.generate_bucket_schema(output, bucket);
            if schema.properties.is_empty() {
                continue;
            }
            schema_gen
                .resolver_mut()
                .emit(&output.name, SchemaOrReference::schema(schema));
            response.content.insert(
                bucket.content_type().to_string(),
                MediaType {
                    schema: SchemaOrReference::reference(schema_ref(&output.name)),
                },
            );
        }

        response
    }
}

fn has_bucket_fields(desc: &StructDescriptor, bucket: BodyBucket) -> bool {
    desc.fields
        .iter()
        .any(|field| field.has_annotation(bucket.annotation_key()))
}

fn path_param_pattern() -> &'static Regex {
    static PATH_PARAM_RE: OnceLock<Regex> = OnceLock::new();
    PATH_PARAM_RE.get_or_init(|| Regex::new(r":(\w+)").expect("Invalid regex"))
}

/// Rewrite `:name` placeholders to OpenAPI `{name}` syntax
pub fn normalize_path(template: &str) -> String {
    path_param_pattern()
        .replace_all(template, "{${1}}")
        .into_owned()
}

/// Prefix `http://` unless the URL already has an http(s) scheme
pub fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
