use openapi_from_idl::{
    generate,
    idl::IdlModel,
    loader::ModelLoader,
    openapi_builder::{OpenApiDocument, ParameterLocation, Server},
    serializer::{serialize_json, serialize_yaml},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

const HELLO: &str = include_str!("fixtures/hello.yaml");
const PETSTORE: &str = include_str!("fixtures/petstore.yaml");

fn model_from_yaml(yaml: &str) -> IdlModel {
    IdlModel::from_yaml_str(yaml).expect("Failed to parse fixture model")
}

/// Helper function to create a temporary directory of model dumps
fn create_model_dir(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write model file");
    }

    temp_dir
}

#[test]
fn test_hello_end_to_end() {
    let model = model_from_yaml(HELLO);
    let result = generate(&model);

    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    let document = serde_json::to_value(&result.document).unwrap();
    assert_eq!(
        document,
        json!({
            "openapi": "3.0.3",
            "info": {
                "title": "HelloService API",
                "description": "Greets people",
                "version": "1.0.0"
            },
            "paths": {
                "/hello/{name}": {
                    "get": {
                        "tags": ["HelloService"],
                        "description": "Say hello to someone",
                        "operationId": "HelloService_Hello",
                        "parameters": [
                            {
                                "name": "q",
                                "in": "query",
                                "description": "Free text query",
                                "required": false,
                                "schema": {"type": "string"}
                            },
                            {
                                "name": "name",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "string"}
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "Successful response",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/HelloResp"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "HelloResp": {
                        "type": "object",
                        "properties": {"message": {"type": "string"}}
                    }
                }
            },
            "tags": [{"name": "HelloService"}]
        })
    );
}

#[test]
fn test_generation_is_deterministic() {
    let model = model_from_yaml(PETSTORE);

    let first = serialize_yaml(&generate(&model).document).unwrap();
    let second = serialize_yaml(&generate(&model).document).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_petstore_document_info_and_tags() {
    let model = model_from_yaml(PETSTORE);
    let result = generate(&model);
    let document = &result.document;

    assert_eq!(document.info.title, "Pet Store");
    assert_eq!(document.info.version, "2.0.0");
    assert_eq!(
        document.info.description.as_deref(),
        Some("Manage the pets of the store.")
    );
    let tags: Vec<_> = document.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, vec!["PetService"]);
    assert!(document.components.extensions.contains_key("securitySchemes"));

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("UploadPhoto"));
}

#[test]
fn test_paths_are_sorted_and_rewritten() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let paths: Vec<_> = document.paths.keys().cloned().collect();
    assert_eq!(paths, vec!["/pets", "/pets/{id}", "/pets/{id}/photo"]);

    let item = &document.paths["/pets/{id}"];
    assert!(item.get.is_some());
    assert!(item.delete.is_some());
    assert!(item.post.is_none());
}

#[test]
fn test_schema_closure_with_cycles() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let schemas: Vec<_> = document.components.schemas.keys().cloned().collect();
    assert_eq!(schemas, vec!["Person", "Pet", "PetResp", "Tag"]);

    // Every reference in the document points at an emitted component
    let json = serialize_json(&document).unwrap();
    for (offset, _) in json.match_indices("#/components/schemas/") {
        let rest = &json[offset + "#/components/schemas/".len()..];
        let name = &rest[..rest.find('"').unwrap()];
        assert!(
            document.components.schemas.contains_key(name),
            "dangling reference to {}",
            name
        );
    }

    let person = document.components.schemas["Person"].as_schema().unwrap();
    assert_eq!(person.description.as_deref(), Some("Somebody who owns pets"));
    assert_eq!(
        person.properties["best_friend"].as_reference(),
        Some("#/components/schemas/Person")
    );
}

#[test]
fn test_response_body_component_holds_only_body_fields() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let pet_resp = document.components.schemas["PetResp"].as_schema().unwrap();
    let properties: Vec<_> = pet_resp.properties.keys().cloned().collect();
    assert_eq!(properties, vec!["pet"]);

    let get = document.paths["/pets/{id}"].get.as_ref().unwrap();
    let response = &get.responses["200"];
    assert_eq!(response.description, "The pet");
    assert!(response.headers.contains_key("ETag"));
    let post = document.paths["/pets"].post.as_ref().unwrap();
    assert_eq!(
        post.responses["200"].content["application/json"].schema.as_reference(),
        Some("#/components/schemas/PetResp")
    );
}

#[test]
fn test_body_excluded_for_get_head_delete() {
    let model = model_from_yaml(
        r#"
services:
  - name: Svc
    methods:
      - name: All
        annotations:
          api.get: ["/things"]
          api.head: ["/things"]
          api.delete: ["/things"]
          api.patch: ["/things"]
        arguments: [{ name: req, type: { struct: Body } }]
structs:
  - name: Body
    fields:
      - { name: a, type: string, annotations: { api.body: ["a"] } }
      - { name: b, type: binary, annotations: { api.form: ["b"] } }
"#,
    );
    let document = generate(&model).document;
    let item = &document.paths["/things"];

    for operation in [&item.get, &item.head, &item.delete] {
        assert!(operation.as_ref().unwrap().request_body.is_none());
    }
    let patch_body = item.patch.as_ref().unwrap().request_body.as_ref().unwrap();
    let content_types: Vec<_> = patch_body.content.keys().cloned().collect();
    assert_eq!(content_types, vec!["application/json", "multipart/form-data"]);
}

#[test]
fn test_request_body_buckets_and_required() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let post = document.paths["/pets"].post.as_ref().unwrap();
    let body = post.request_body.as_ref().unwrap();
    assert_eq!(body.description.as_deref(), Some("A new pet"));

    let json_schema = body.content["application/json"].schema.as_schema().unwrap();
    let properties: Vec<_> = json_schema.properties.keys().cloned().collect();
    assert_eq!(properties, vec!["name", "owner", "tags"]);
    assert_eq!(json_schema.required, vec!["name".to_string()]);

    let name = json_schema.properties["name"].as_schema().unwrap();
    assert_eq!(name.description.as_deref(), Some("Pet name"));
    assert_eq!(name.extensions["minLength"], json!(1));

    let put = document.paths["/pets/{id}/photo"].put.as_ref().unwrap();
    let content_types: Vec<_> = put
        .request_body
        .as_ref()
        .unwrap()
        .content
        .keys()
        .cloned()
        .collect();
    assert_eq!(
        content_types,
        vec!["multipart/form-data", "application/octet-stream"]
    );
}

#[test]
fn test_parameters_locations_and_required() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let get = document.paths["/pets/{id}"].get.as_ref().unwrap();
    let id = get.parameters.iter().find(|p| p.name == "id").unwrap();
    assert_eq!(id.location, ParameterLocation::Path);
    assert!(id.required);
    let verbose = get.parameters.iter().find(|p| p.name == "verbose").unwrap();
    assert!(!verbose.required);

    let post = document.paths["/pets"].post.as_ref().unwrap();
    let params: Vec<_> = post
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.location))
        .collect();
    assert_eq!(
        params,
        vec![
            ("X-Request-Id", ParameterLocation::Header),
            ("session", ParameterLocation::Cookie),
        ]
    );
}

#[test]
fn test_operation_override_precedence() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let post = document.paths["/pets"].post.as_ref().unwrap();
    assert_eq!(post.summary.as_deref(), Some("Create a pet"));
    assert_eq!(post.extensions["x-audit"], json!(true));
    assert_eq!(post.operation_id.as_deref(), Some("PetService_CreatePet"));
    assert_eq!(post.tags, vec!["PetService".to_string()]);
}

#[test]
fn test_servers_hoisted_per_path_with_two_hosts() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    assert_eq!(
        document.servers,
        vec![
            Server::new("http://pets.example.com"),
            Server::new("https://upload.example.com"),
        ]
    );
    assert_eq!(
        document.paths["/pets/{id}"].servers,
        vec![Server::new("http://pets.example.com")]
    );
    assert_eq!(
        document.paths["/pets/{id}/photo"].servers,
        vec![Server::new("https://upload.example.com")]
    );
    for item in document.paths.values() {
        assert!(item.operations().all(|op| op.servers.is_empty()));
    }
}

#[test]
fn test_single_server_hoisting() {
    let model = model_from_yaml(
        r#"
services:
  - name: Svc
    annotations: { api.base_domain: ["api.example.com"] }
    methods:
      - { name: ListA, annotations: { api.get: ["/a"] } }
      - { name: CreateA, annotations: { api.post: ["/a"] } }
      - { name: ListB, annotations: { api.get: ["/b"] } }
"#,
    );
    let document = generate(&model).document;

    assert_eq!(document.servers, vec![Server::new("http://api.example.com")]);
    for item in document.paths.values() {
        assert!(item.servers.is_empty());
        assert!(item.operations().all(|op| op.servers.is_empty()));
    }
}

#[test]
fn test_yaml_output_parses_back() {
    let model = model_from_yaml(PETSTORE);
    let document = generate(&model).document;

    let yaml = serialize_yaml(&document).unwrap();
    assert!(yaml.starts_with("# Generated with openapi-from-idl"));
    let parsed: OpenApiDocument = serde_yaml::from_str(&yaml).unwrap();

    assert_eq!(parsed, document);
}

#[test]
fn test_load_directory_and_generate() {
    let temp_dir = create_model_dir(vec![
        ("hello.yaml", HELLO),
        ("store/petstore.yaml", PETSTORE),
        ("target/stale.yaml", "services: [{name: Stale}]"),
    ]);

    let loaded = ModelLoader::new(temp_dir.path().to_path_buf())
        .load()
        .expect("Failed to load model directory");
    assert_eq!(loaded.files.len(), 2);
    assert!(loaded.warnings.is_empty());

    let document = generate(&loaded.model).document;
    let tags: Vec<_> = document.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, vec!["HelloService", "PetService"]);
    assert_eq!(document.info.title, "Pet Store");
    assert!(document.paths.contains_key("/hello/{name}"));
    assert!(document.paths.contains_key("/pets"));
}
