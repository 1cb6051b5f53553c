#![allow(clippy::unwrap_used, clippy::expect_used)]

use contract_router::{HttpRequest, HttpResponse, Router, RouterFactory, SpecModel};
use http::Method;
use serde_json::json;

const YAML_SPEC: &str = r#"openapi: 3.1.0
info:
  title: Routing API
  version: "1.0.0"
paths:
  /pets/mine:
    get:
      operationId: listMyPets
      responses:
        "200":
          description: OK
  /pets/{petId}:
    get:
      operationId: showPetById
      parameters:
        - name: petId
          in: path
          required: true
          schema: { type: string }
      responses:
        "200":
          description: OK
    delete:
      operationId: deletePetById
      parameters:
        - name: petId
          in: path
          required: true
          schema: { type: string }
      responses:
        "204":
          description: Deleted
  /users/{userId}/pets/{petId}:
    get:
      operationId: showUserPet
      parameters:
        - name: userId
          in: path
          required: true
          schema: { type: string }
        - name: petId
          in: path
          required: true
          schema: { type: string }
      responses:
        "200":
          description: OK
"#;

fn build_router() -> Router {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();

    factory
        .add_handler_by_operation_id("listMyPets", |ctx| {
            ctx.respond(HttpResponse::json(200, json!({ "op": "mine" })));
        })
        .unwrap();
    factory
        .add_handler_by_operation_id("showPetById", |ctx| {
            let id = ctx.path_param("petId").unwrap_or("").to_string();
            ctx.respond(HttpResponse::json(200, json!({ "op": "show", "id": id })));
        })
        .unwrap();
    factory
        .add_handler_by_operation_id("deletePetById", |ctx| {
            ctx.respond(HttpResponse::json(204, json!(null)));
        })
        .unwrap();
    factory
        .add_handler_by_operation_id("showUserPet", |ctx| {
            let user = ctx.path_param("userId").unwrap_or("").to_string();
            let pet = ctx.path_param("petId").unwrap_or("").to_string();
            ctx.respond(HttpResponse::json(200, json!({ "user": user, "pet": pet })));
        })
        .unwrap();

    factory.generate_router().unwrap()
}

#[test]
fn test_static_and_parameterized_routes() {
    let router = build_router();

    let res = router.handle(HttpRequest::new(Method::GET, "/pets/42")).unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({ "op": "show", "id": "42" }));

    let res = router
        .handle(HttpRequest::new(Method::GET, "/users/7/pets/9"))
        .unwrap();
    assert_eq!(res.body, json!({ "user": "7", "pet": "9" }));
}

#[test]
fn test_declaration_order_wins_on_ambiguous_match() {
    let router = build_router();
    // /pets/mine is declared before /pets/{petId}, so the static route wins
    // even though the parameterized pattern also matches.
    let res = router.handle(HttpRequest::new(Method::GET, "/pets/mine")).unwrap();
    assert_eq!(res.body, json!({ "op": "mine" }));
}

#[test]
fn test_method_is_part_of_the_route() {
    let router = build_router();

    let res = router
        .handle(HttpRequest::new(Method::DELETE, "/pets/42"))
        .unwrap();
    assert_eq!(res.status, 204);

    // No POST route exists for the path.
    let res = router.handle(HttpRequest::new(Method::POST, "/pets/42")).unwrap();
    assert_eq!(res.status, 404);
}

#[test]
fn test_add_handler_accepts_brace_path() {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory
        .add_handler(Method::GET, "/pets/{petId}", |ctx| {
            ctx.respond(HttpResponse::json(200, json!({ "brace": true })));
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    let res = router.handle(HttpRequest::new(Method::GET, "/pets/8")).unwrap();
    assert_eq!(res.body, json!({ "brace": true }));
}

#[test]
fn test_unmatched_path_is_404() {
    let router = build_router();
    let res = router.handle(HttpRequest::new(Method::GET, "/nope")).unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(res.get_header("content-type"), Some("application/json"));
}

#[test]
fn test_path_patterns_in_priority_order() {
    let router = build_router();
    assert_eq!(
        router.path_patterns(),
        [
            "/pets/mine",
            "/pets/{petId}",
            "/pets/{petId}",
            "/users/{userId}/pets/{petId}",
        ]
    );
}

#[test]
fn test_base_path_prefixes_every_route() {
    let spec = r#"openapi: 3.1.0
info:
  title: T
  version: "1"
servers:
  - url: https://api.example.com/v2
paths:
  /ping:
    get:
      operationId: ping
      responses:
        "200":
          description: OK
"#;
    let model = SpecModel::from_str(spec, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory
        .add_handler_by_operation_id("ping", |ctx| {
            ctx.respond(HttpResponse::json(200, json!("pong")));
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    assert_eq!(router.path_patterns(), ["/v2/ping"]);
    let res = router.handle(HttpRequest::new(Method::GET, "/v2/ping")).unwrap();
    assert_eq!(res.status, 200);
    let res = router.handle(HttpRequest::new(Method::GET, "/ping")).unwrap();
    assert_eq!(res.status, 404);
}

#[test]
fn test_handler_failure_runs_failure_chain() {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory
        .add_handler_by_operation_id("listMyPets", |ctx| {
            ctx.fail(503, "backend unavailable");
        })
        .unwrap();
    factory
        .add_failure_handler_by_operation_id("listMyPets", |ctx| {
            let (status, message) = ctx.failure().unwrap_or((500, "unknown"));
            ctx.respond(HttpResponse::json(
                status,
                json!({ "error": message, "handled": true }),
            ));
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    let res = router.handle(HttpRequest::new(Method::GET, "/pets/mine")).unwrap();
    assert_eq!(res.status, 503);
    assert_eq!(res.body["handled"], json!(true));
}

#[test]
fn test_failure_without_failure_handler_becomes_error_response() {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    factory
        .add_handler_by_operation_id("listMyPets", |ctx| {
            ctx.fail(409, "conflict");
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    let res = router.handle(HttpRequest::new(Method::GET, "/pets/mine")).unwrap();
    assert_eq!(res.status, 409);
    assert_eq!(res.body, json!({ "error": "conflict" }));
}

#[test]
fn test_chained_handlers_run_in_mount_order() {
    let model = SpecModel::from_str(YAML_SPEC, "inline").unwrap();
    let mut factory = RouterFactory::from_spec(model).unwrap();
    // The first handler inspects and passes through; the second responds.
    factory
        .add_handler_by_operation_id("listMyPets", |ctx| {
            assert_eq!(ctx.request().method, Method::GET);
        })
        .unwrap();
    factory
        .add_handler_by_operation_id("listMyPets", |ctx| {
            ctx.respond(HttpResponse::json(200, json!({ "second": true })));
        })
        .unwrap();
    let router = factory.generate_router().unwrap();

    let res = router.handle(HttpRequest::new(Method::GET, "/pets/mine")).unwrap();
    assert_eq!(res.body, json!({ "second": true }));
}
