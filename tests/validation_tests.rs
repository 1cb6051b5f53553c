#![allow(clippy::unwrap_used, clippy::expect_used)]

use contract_router::{
    HttpRequest, HttpResponse, ParameterLocation, Router, RouterFactory, SpecModel,
    ValidationErrorKind,
};
use http::Method;
use serde_json::json;

const YAML_SPEC: &str = r#"openapi: 3.1.0
info:
  title: Validation API
  version: "1.0.0"
components:
  schemas:
    NewPet:
      type: object
      required: [name]
      properties:
        name: { type: string }
        age: { type: integer }
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: limit
          in: query
          required: true
          schema: { type: integer }
        - name: tags
          in: query
          required: false
          schema:
            type: array
            items: { type: integer }
        - name: status
          in: query
          required: false
          schema:
            type: string
            enum: [available, pending, sold]
        - name: X-Request-Id
          in: header
          required: false
          schema:
            type: string
            pattern: "^[a-f0-9-]+$"
        - name: session
          in: cookie
          required: false
          schema: { type: string }
      responses:
        "200":
          description: OK
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewPet'
      responses:
        "201":
          description: Created
  /pets/{petId}:
    get:
      operationId: showPetById
      parameters:
        - name: petId
          in: path
          required: true
          schema: { type: integer }
      responses:
        "200":
          description: OK
"#;

fn build_router(validation_failure_handler: bool) -> Router {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory.enable_validation_failure_handler(validation_failure_handler);

    factory
        .add_handler_by_operation_id("listPets", |ctx| {
            let limit = ctx.params().get("limit").and_then(|p| p.value()).cloned();
            let tags = ctx.params().get("tags").and_then(|p| p.value()).cloned();
            ctx.respond(HttpResponse::json(
                200,
                json!({ "limit": limit, "tags": tags }),
            ));
        })
        .unwrap();
    factory
        .add_handler_by_operation_id("createPet", |ctx| {
            let body = ctx.params().body().cloned();
            ctx.respond(HttpResponse::json(201, json!({ "created": body })));
        })
        .unwrap();
    factory
        .add_handler_by_operation_id("showPetById", |ctx| {
            let id = ctx.params().get("petId").and_then(|p| p.value()).cloned();
            ctx.respond(HttpResponse::json(200, json!({ "id": id })));
        })
        .unwrap();

    factory.generate_router().unwrap()
}

#[test]
fn test_query_param_coerced_to_integer() {
    let router = build_router(true);
    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=10"))
        .unwrap();
    assert_eq!(res.status, 200);
    // Typed value, not the raw string "10".
    assert_eq!(res.body["limit"], json!(10));
}

#[test]
fn test_path_param_coerced_to_integer() {
    let router = build_router(true);
    let res = router.handle(HttpRequest::new(Method::GET, "/pets/42")).unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["id"], json!(42));
}

#[test]
fn test_type_mismatch_is_400_with_parameter_details() {
    let router = build_router(true);
    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=abc"))
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["parameter"], json!("limit"));
    assert_eq!(res.body["location"], json!("query"));
}

#[test]
fn test_missing_required_query_param_is_400() {
    let router = build_router(true);
    let res = router.handle(HttpRequest::new(Method::GET, "/pets")).unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["parameter"], json!("limit"));
}

#[test]
fn test_absent_optional_param_is_missing_not_invalid() {
    let router = build_router(true);
    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=1"))
        .unwrap();
    assert_eq!(res.status, 200);
    // The optional array was absent: missing marker, not an error.
    assert_eq!(res.body["tags"], json!(null));
}

#[test]
fn test_array_param_elements_coerced_in_order() {
    let router = build_router(true);
    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=1&tags=3,1,2"))
        .unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["tags"], json!([3, 1, 2]));
}

#[test]
fn test_enum_param_rejects_unknown_value() {
    let router = build_router(true);
    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=1&status=lost"))
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["parameter"], json!("status"));

    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=1&status=sold"))
        .unwrap();
    assert_eq!(res.status, 200);
}

#[test]
fn test_header_pattern_param() {
    let router = build_router(true);
    let res = router
        .handle(
            HttpRequest::new(Method::GET, "/pets?limit=1").with_header("X-Request-Id", "NOPE!"),
        )
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["location"], json!("header"));

    let res = router
        .handle(
            HttpRequest::new(Method::GET, "/pets?limit=1").with_header("X-Request-Id", "ab12-ef"),
        )
        .unwrap();
    assert_eq!(res.status, 200);
}

#[test]
fn test_body_validated_against_schema() {
    let router = build_router(true);

    let res = router
        .handle(
            HttpRequest::new(Method::POST, "/pets")
                .with_body(json!({ "name": "Rex", "age": 3 })),
        )
        .unwrap();
    assert_eq!(res.status, 201);
    assert_eq!(res.body["created"]["name"], json!("Rex"));

    // Missing the required `name` property.
    let res = router
        .handle(HttpRequest::new(Method::POST, "/pets").with_body(json!({ "age": 3 })))
        .unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["location"], json!("body"));
}

#[test]
fn test_missing_required_body_is_400() {
    let router = build_router(true);
    let res = router.handle(HttpRequest::new(Method::POST, "/pets")).unwrap();
    assert_eq!(res.status, 400);
    assert_eq!(res.body["parameter"], json!("body"));
}

#[test]
fn test_disabled_failure_handler_propagates_the_exception() {
    let router = build_router(false);
    let err = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=abc"))
        .unwrap_err();
    assert_eq!(err.name, "limit");
    assert_eq!(err.location, ParameterLocation::Query);
    assert_eq!(
        err.kind,
        ValidationErrorKind::TypeMismatch { expected: "integer" }
    );

    // Valid requests still succeed with the handler disabled.
    let res = router
        .handle(HttpRequest::new(Method::GET, "/pets?limit=5"))
        .unwrap();
    assert_eq!(res.status, 200);
}

#[test]
fn test_pipe_delimited_array_style() {
    let spec = r#"openapi: 3.1.0
info:
  title: T
  version: "1"
paths:
  /search:
    get:
      operationId: search
      parameters:
        - name: ids
          in: query
          required: true
          style: pipeDelimited
          explode: false
          schema:
            type: array
            items: { type: integer }
      responses:
        "200":
          description: OK
"#;
    let model = SpecModel::from_str(spec, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory
        .add_handler_by_operation_id("search", |ctx| {
            let ids = ctx.params().get("ids").and_then(|p| p.value()).cloned();
            ctx.respond(HttpResponse::json(200, json!({ "ids": ids })));
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    let res = router
        .handle(HttpRequest::new(Method::GET, "/search?ids=4|5|6"))
        .unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body["ids"], json!([4, 5, 6]));
}

#[test]
fn test_cookie_param_reaches_the_handler() {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory
        .add_handler_by_operation_id("listPets", |ctx| {
            let session = ctx.params().get("session").and_then(|p| p.value()).cloned();
            ctx.respond(HttpResponse::json(200, json!({ "session": session })));
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    let res = router
        .handle(
            HttpRequest::new(Method::GET, "/pets?limit=1").with_header("Cookie", "session=s3cr3t"),
        )
        .unwrap();
    assert_eq!(res.body["session"], json!("s3cr3t"));
}
