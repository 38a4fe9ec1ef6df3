//! Annotation registry: the fixed vocabulary of annotation keys understood by the generator.
//!
//! Every key maps to exactly one [`Role`]. Unknown keys have no role and are ignored by
//! all callers.

use crate::openapi_builder::ParameterLocation;

pub const API_GET: &str = "api.get";
pub const API_POST: &str = "api.post";
pub const API_PUT: &str = "api.put";
pub const API_PATCH: &str = "api.patch";
pub const API_DELETE: &str = "api.delete";
pub const API_OPTIONS: &str = "api.options";
pub const API_HEAD: &str = "api.head";
pub const API_ANY: &str = "api.any";
pub const API_QUERY: &str = "api.query";
pub const API_FORM: &str = "api.form";
pub const API_PATH: &str = "api.path";
pub const API_HEADER: &str = "api.header";
pub const API_COOKIE: &str = "api.cookie";
pub const API_BODY: &str = "api.body";
pub const API_RAW_BODY: &str = "api.raw_body";
pub const API_BASE_DOMAIN: &str = "api.base_domain";
pub const API_BASE_URL: &str = "api.baseurl";
pub const OPENAPI_OPERATION: &str = "openapi.operation";
pub const OPENAPI_PROPERTY: &str = "openapi.property";
pub const OPENAPI_SCHEMA: &str = "openapi.schema";
pub const OPENAPI_PARAMETER: &str = "openapi.parameter";
pub const OPENAPI_DOCUMENT: &str = "openapi.document";

/// Parameter annotations in evaluation order. When a field carries several of them the
/// last match wins, so `api.header` takes precedence over all others.
pub const PARAMETER_EVALUATION_ORDER: [ParameterLocation; 4] = [
    ParameterLocation::Query,
    ParameterLocation::Path,
    ParameterLocation::Cookie,
    ParameterLocation::Header,
];

/// Annotations that rename a property inside a struct component schema, in evaluation order.
pub const PROPERTY_NAME_ANNOTATIONS: [&str; 4] = [API_HEADER, API_BODY, API_FORM, API_RAW_BODY];

/// HTTP methods that have an operation slot in an OpenAPI path item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// All methods in path item slot order
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// GET, HEAD and DELETE operations never carry a request body
    pub fn allows_request_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

/// Content-type bucket a body field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyBucket {
    Json,
    Form,
    Raw,
}

impl BodyBucket {
    /// All buckets in request body content order
    pub const ALL: [BodyBucket; 3] = [BodyBucket::Json, BodyBucket::Form, BodyBucket::Raw];

    /// The annotation key selecting fields into this bucket
    pub fn annotation_key(&self) -> &'static str {
        match self {
            BodyBucket::Json => API_BODY,
            BodyBucket::Form => API_FORM,
            BodyBucket::Raw => API_RAW_BODY,
        }
    }

    /// Media type of the bucket's content entry
    pub fn content_type(&self) -> &'static str {
        match self {
            BodyBucket::Json => "application/json",
            BodyBucket::Form => "multipart/form-data",
            BodyBucket::Raw => "application/octet-stream",
        }
    }
}

/// Which generated structure an override annotation patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideTarget {
    Document,
    Operation,
    Schema,
    Property,
    Parameter,
}

/// Semantic role of an annotation key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Exposes a method under an HTTP method; the value is the path template
    Method(HttpMethod),
    /// `api.any`: recognized, but there is no single OpenAPI slot for it
    AnyMethod,
    /// Marks a field as a request parameter; the value is the wire name
    Parameter(ParameterLocation),
    /// Marks a field as part of a request/response body bucket
    Body(BodyBucket),
    /// Method-level server URL
    BaseUrl,
    /// Service-level server host, used when a method has no base URL
    BaseDomain,
    /// Structured override payload
    Override(OverrideTarget),
}

/// Look up the role of an annotation key.
pub fn role_of(key: &str) -> Option<Role> {
    let role = match key {
        API_GET => Role::Method(HttpMethod::Get),
        API_POST => Role::Method(HttpMethod::Post),
        API_PUT => Role::Method(HttpMethod::Put),
        API_PATCH => Role::Method(HttpMethod::Patch),
        API_DELETE => Role::Method(HttpMethod::Delete),
        API_OPTIONS => Role::Method(HttpMethod::Options),
        API_HEAD => Role::Method(HttpMethod::Head),
        API_ANY => Role::AnyMethod,
        API_QUERY => Role::Parameter(ParameterLocation::Query),
        API_PATH => Role::Parameter(ParameterLocation::Path),
        API_HEADER => Role::Parameter(ParameterLocation::Header),
        API_COOKIE => Role::Parameter(ParameterLocation::Cookie),
        API_BODY => Role::Body(BodyBucket::Json),
        API_FORM => Role::Body(BodyBucket::Form),
        API_RAW_BODY => Role::Body(BodyBucket::Raw),
        API_BASE_URL => Role::BaseUrl,
        API_BASE_DOMAIN => Role::BaseDomain,
        OPENAPI_DOCUMENT => Role::Override(OverrideTarget::Document),
        OPENAPI_OPERATION => Role::Override(OverrideTarget::Operation),
        OPENAPI_SCHEMA => Role::Override(OverrideTarget::Schema),
        OPENAPI_PROPERTY => Role::Override(OverrideTarget::Property),
        OPENAPI_PARAMETER => Role::Override(OverrideTarget::Parameter),
        _ => return None,
    };
    Some(role)
}

impl ParameterLocation {
    /// The annotation key marking a field as a parameter in this location
    pub fn annotation_key(&self) -> &'static str {
        match self {
            ParameterLocation::Query => API_QUERY,
            ParameterLocation::Path => API_PATH,
            ParameterLocation::Header => API_HEADER,
            ParameterLocation::Cookie => API_COOKIE,
        }
    }
}
