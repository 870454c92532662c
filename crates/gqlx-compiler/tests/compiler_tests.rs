//! End-to-end tests for the gqlx compiler.
//!
//! Each test compiles a composite source, creates a service with mock API
//! implementations and dispatches field invocations through it.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::executor::block_on;
use gqlx_compiler::{
    compile, CompileOptions, CompiledModule, Container, ServiceError, ServicesContext,
};
use gqlx_eval::ApiImplementations;
use gqlx_types::{Capabilities, ErrorCode, ErrorKind, GqlxError, Origin};
use serde_json::{json, Value as Json};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn build(source: &str, caps: &Capabilities) -> CompiledModule {
    compile("test", source, caps, &CompileOptions::default()).unwrap_or_else(|e| panic!("{e}"))
}

fn compile_err(source: &str, caps: &Capabilities) -> GqlxError {
    compile("test", source, caps, &CompileOptions::default()).unwrap_err()
}

fn dispatch(module: &CompiledModule, api: ApiImplementations, field: &str, args: Json) -> Result<Json, ServiceError> {
    let service = module.create_service(api);
    block_on(service.dispatch("Query", field, &args))
}

/// Completes on its second poll.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

type Log = Rc<RefCell<Vec<String>>>;

fn name_length(args: &[Json]) -> Json {
    json!(args.first().and_then(Json::as_str).map_or(0, |s| s.len()))
}

fn foo_sync() -> ApiImplementations {
    ApiImplementations::new().with_sync("foo", |args| Ok(name_length(&args)))
}

fn foo_async() -> ApiImplementations {
    ApiImplementations::new().with_async("foo", |args| async move {
        YieldOnce(false).await;
        Ok(name_length(&args))
    })
}

/// REST-like mocks: `get` serves two collections, `post` creates items.
fn rest_api() -> ApiImplementations {
    ApiImplementations::new()
        .with_async("get", |args| async move {
            match args[0].as_str() {
                Some("api/item") => Ok(json!({ "items": [] })),
                Some("api/foo") => Ok(json!({
                    "items": [{ "type": "foo", "id": 0 }, { "type": "bar", "id": 2 }]
                })),
                _ => Err(json!({ "status": 404 })),
            }
        })
        .with_async("post", |args| async move {
            let path = args[0].as_str().unwrap_or_default().to_string();
            match path.as_str() {
                "api/item" => Ok(json!({ "id": 10 })),
                "api/foo" => Ok(json!("")),
                _ => {
                    let id: i64 = path.split('/').nth(2).and_then(|s| s.parse().ok()).unwrap_or(0);
                    let target = args[1]["target"].as_i64().unwrap_or(0);
                    Ok(json!(id + target))
                }
            }
        })
}

fn rest_caps() -> Capabilities {
    Capabilities::new().asynchronous("get").asynchronous("post")
}

// ══════════════════════════════════════════════════════════════════════════════
// Invocation
// ══════════════════════════════════════════════════════════════════════════════

const NAME_SCHEMA: &str = "type Query {\n  f(name: String): Int {\n    foo(name)\n  }\n}";

#[test]
fn test_sync_capability() {
    let module = build(NAME_SCHEMA, &Capabilities::new().sync("foo"));
    assert!(!module.units()[0].is_async);
    let result = dispatch(&module, foo_sync(), "f", json!({ "name": "Tester" }));
    assert_eq!(result, Ok(json!(6)));
}

#[test]
fn test_async_capability_is_awaited() {
    let source = "type Query {\n  f(name: String): Int {\n    foo(name) * 2\n  }\n}";
    let module = build(source, &Capabilities::new().asynchronous("foo"));
    let unit = module.unit("Query", "f").unwrap();
    assert!(unit.is_async);
    assert!(unit.source.contains("(await $api.foo($data.name) * 2)"));
    let result = dispatch(&module, foo_async(), "f", json!({ "name": "Tester" }));
    assert_eq!(result, Ok(json!(12)));
}

#[test]
fn test_nested_use_and_post() {
    let source = r#"
type Query {
  item(id: Int): Int {
    use(get('api/item').items, ([item]) => {
      item = item ? item : post('api/item', {});
      id = id ? id : use(get('api/foo').items.filter(m => m.type === 'bar'), ([foo]) => {
        foo = foo ? foo : post('api/foo', { name: 'Foo', type: 'bar' });
        return foo.id;
      });
      return post(`api/item/${id}`, { target: item.id });
    })
  }
}
"#;
    let module = build(source, &rest_caps());
    assert_eq!(dispatch(&module, rest_api(), "item", json!({ "id": 5 })), Ok(json!(15)));
    assert_eq!(dispatch(&module, rest_api(), "item", json!({})), Ok(json!(12)));
}

#[test]
fn test_either_fallback() {
    let source = "type Query { f(name: String): String { either(name, 'Fallback') } }";
    let module = build(source, &Capabilities::new());
    assert_eq!(dispatch(&module, ApiImplementations::new(), "f", json!({})), Ok(json!("Fallback")));
    assert_eq!(
        dispatch(&module, ApiImplementations::new(), "f", json!({ "name": "x" })),
        Ok(json!("x"))
    );
}

#[test]
fn test_use_helper() {
    let source = "type Query { f(name: String): Int { use(name, x => x.length) } }";
    let module = build(source, &Capabilities::new());
    let result = dispatch(&module, ApiImplementations::new(), "f", json!({ "name": "Tester" }));
    assert_eq!(result, Ok(json!(6)));
}

#[test]
fn test_cq_helper() {
    let source = "type Query {\n  a(name: String): String { cq('/myurl', { name }) }\n  b: String { cq('/myurl', { }) }\n}";
    let module = build(source, &Capabilities::new());
    let api = ApiImplementations::new;
    assert_eq!(dispatch(&module, api(), "a", json!({ "name": "tester" })), Ok(json!("/myurl?name=tester")));
    assert_eq!(dispatch(&module, api(), "b", json!({})), Ok(json!("/myurl")));
}

#[test]
fn test_untaken_ternary_branch_never_runs() {
    let log = Log::default();
    let a_log = Rc::clone(&log);
    let b_log = Rc::clone(&log);
    let api = ApiImplementations::new()
        .with_async("a", move |_| {
            a_log.borrow_mut().push("a".to_string());
            async { Ok(json!("a")) }
        })
        .with_sync("b", move |_| {
            b_log.borrow_mut().push("b".to_string());
            Ok(json!("b"))
        });
    let caps = Capabilities::new().asynchronous("a").sync("b");
    let module = build("type Query { f(cond: Boolean): String { cond ? a() : b() } }", &caps);

    assert_eq!(dispatch(&module, api, "f", json!({ "cond": false })), Ok(json!("b")));
    assert_eq!(*log.borrow(), vec!["b"]);
}

#[test]
fn test_map_calls_are_issued_together() {
    let log = Log::default();
    let calls = Rc::clone(&log);
    let api = ApiImplementations::new().with_async("get", move |args| {
        let path = args[0].as_str().unwrap_or_default().to_string();
        calls.borrow_mut().push(format!("call {path}"));
        let log = Rc::clone(&calls);
        async move {
            YieldOnce(false).await;
            log.borrow_mut().push(format!("done {path}"));
            if path == "items" {
                Ok(json!([{ "id": "x" }, { "id": "y" }]))
            } else {
                Ok(json!(path.to_uppercase()))
            }
        }
    });
    let caps = Capabilities::new().asynchronous("get");
    let module = build("type Query { f: [String] { get('items').map(item => get(item.id)) } }", &caps);
    assert!(module.units()[0].source.contains("await Promise.all("));

    assert_eq!(dispatch(&module, api, "f", json!({})), Ok(json!(["X", "Y"])));
    let log = log.borrow();
    assert_eq!(&log[..4], &["call items", "done items", "call x", "call y"]);
    assert_eq!(log.iter().filter(|e| e.as_str() == "call items").count(), 1);
}

#[test]
fn test_rejection_surfaces_as_fault() {
    let module = build("type Query { f: Int { get('nowhere').id } }", &rest_caps());
    match dispatch(&module, rest_api(), "f", json!({})) {
        Err(ServiceError::Fault(fault)) => assert_eq!(fault.description(), json!({ "status": 404 })),
        other => panic!("expected fault, got {other:?}"),
    }
}

#[test]
fn test_oversized_results_surface_as_faults() {
    let source = concat!(
        "type Query { repeat(n: Float): String { 'ab'.repeat(n) } ",
        "grow(n: Float): Int { use([], xs => { xs.length = n; return xs.length; }) } }"
    );
    let module = build(source, &Capabilities::new());
    match dispatch(&module, ApiImplementations::new(), "repeat", json!({ "n": 1e19 })) {
        Err(ServiceError::Fault(fault)) => assert_eq!(
            fault.description(),
            json!({ "name": "RangeError", "message": "Invalid string length" })
        ),
        other => panic!("expected fault, got {other:?}"),
    }
    match dispatch(&module, ApiImplementations::new(), "grow", json!({ "n": 1e18 })) {
        Err(ServiceError::Fault(fault)) => {
            assert_eq!(fault.description()["message"], "Invalid array length")
        }
        other => panic!("expected fault, got {other:?}"),
    }
    let small = dispatch(&module, ApiImplementations::new(), "grow", json!({ "n": 2 }));
    assert_eq!(small, Ok(json!(2)));
}

#[test]
fn test_immediately_called_resolver_arrow() {
    let module = build(
        "type Query { f(id: String): String { (x => get(x).items.length)(id) + '!' } }",
        &rest_caps(),
    );
    assert_eq!(dispatch(&module, rest_api(), "f", json!({ "id": "api/foo" })), Ok(json!("2!")));
}

#[test]
fn test_unknown_field_dispatch() {
    let module = build(NAME_SCHEMA, &Capabilities::new().sync("foo"));
    let err = dispatch(&module, foo_sync(), "missing", json!({})).unwrap_err();
    assert_eq!(err.to_string(), "no resolver for Query.missing");
}

// ══════════════════════════════════════════════════════════════════════════════
// Module shape
// ══════════════════════════════════════════════════════════════════════════════

const ALL_CONTAINERS: &str = "type Query { a: Int { 1 } b: Int { 2 } }\n\
                              type Mutation { c(x: Int): Int { x } }\n\
                              type Subscription { d: Int { 4 } }";

#[test]
fn test_schema_text_has_no_regions() {
    let module = build(ALL_CONTAINERS, &Capabilities::new());
    assert_eq!(
        module.schema_text(),
        "type Query { a: Int  b: Int  }\ntype Mutation { c(x: Int): Int  }\ntype Subscription { d: Int  }"
    );
    assert_eq!(module.name(), "test");
    assert_eq!(module.source(), ALL_CONTAINERS);
}

#[test]
fn test_resolver_adapters() {
    let module = build(ALL_CONTAINERS, &Capabilities::new());
    let resolvers = module.resolvers();
    let types: Vec<_> = resolvers.keys().map(String::as_str).collect();
    assert_eq!(types, vec!["Query", "Mutation", "Subscription"]);
    assert!(resolvers["Query"]["a"].resolve().is_some());
    assert!(resolvers["Mutation"]["c"].resolve().is_some());
    assert!(resolvers["Subscription"]["d"].subscribe().is_some());
    assert!(resolvers["Subscription"]["d"].resolve().is_none());
}

#[test]
fn test_adapter_dispatches_through_context() {
    let module = build(ALL_CONTAINERS, &Capabilities::new());
    let context = ServicesContext::new().with_service(module.create_service(ApiImplementations::new()));
    let resolvers = module.resolvers();

    let mutation = resolvers["Mutation"]["c"].resolve().unwrap();
    let result = block_on(mutation.call(&Json::Null, &json!({ "x": 3 }), &context));
    assert_eq!(result, Ok(json!(3)));

    let subscription = resolvers["Subscription"]["d"].subscribe().unwrap();
    let result = block_on(subscription.call(&Json::Null, &json!({}), &context));
    assert_eq!(result, Ok(json!(4)));

    let empty = ServicesContext::new();
    let err = block_on(mutation.call(&Json::Null, &json!({}), &empty)).unwrap_err();
    assert_eq!(err, ServiceError::UnknownService("test".to_string()));
}

#[test]
fn test_units_keep_source_order() {
    let module = build(ALL_CONTAINERS, &Capabilities::new());
    let keys: Vec<_> = module
        .units()
        .iter()
        .map(|u| (u.container, u.field.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (Container::Query, "a"),
            (Container::Query, "b"),
            (Container::Mutation, "c"),
            (Container::Subscription, "d"),
        ]
    );
    assert_eq!(module.unit("Mutation", "c").unwrap().arguments, vec!["x"]);
}

#[test]
fn test_default_error_boundary() {
    let module = build("type Query { a: Int { 1 } }", &Capabilities::new());
    assert_eq!(
        module.units()[0].source,
        "try { return 1; } catch (err) { throw new Error(JSON.stringify(err, Object.getOwnPropertyNames(err))); }"
    );
}

#[test]
fn test_custom_wrapper_and_regenerate() {
    fn bare(block: &str) -> String {
        block.to_string()
    }
    fn legacy(source: &str) -> String {
        format!("/* legacy */ {source}")
    }
    let options = CompileOptions {
        wrap_statements: bare,
        regenerate: Some(legacy),
        ..CompileOptions::default()
    };
    let module = compile("m", "type Query { a: Int { 1 } }", &Capabilities::new(), &options).unwrap();
    assert_eq!(module.units()[0].source, "/* legacy */ { return 1; }");
    let result = dispatch(&module, ApiImplementations::new(), "a", json!({}));
    assert_eq!(result, Ok(json!(1)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_compile_is_deterministic() {
    let source = "type Query { f(id: Int): Int { get('a/' + id).items.map(x => get(x.id)).length } }";
    let first = build(source, &rest_caps());
    for _ in 0..10 {
        let again = build(source, &rest_caps());
        assert_eq!(again.fingerprint(), first.fingerprint());
        let sources = |m: &CompiledModule| m.units().iter().map(|u| u.source.clone()).collect::<Vec<_>>();
        assert_eq!(sources(&again), sources(&first));
    }
}

#[test]
fn test_fingerprint_tracks_bodies() {
    let a = build("type Query { a: Int { 1 } }", &Capabilities::new());
    let b = build("type Query { a: Int { 2 } }", &Capabilities::new());
    assert_ne!(a.fingerprint(), b.fingerprint());
}

// ══════════════════════════════════════════════════════════════════════════════
// Compile errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_forbidden_constructs_are_rejected() {
    let bodies = ["function () { return 1; }", "this.x", "await foo(name)", "delete name.x"];
    for body in bodies {
        let source = format!("type Query {{ f(name: String): Int {{ {body} }} }}");
        let err = compile_err(&source, &Capabilities::new().asynchronous("foo"));
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation, "{body}");
        assert_eq!(err.code, ErrorCode::FORBIDDEN_CONSTRUCT, "{body}");
        assert_eq!(err.origin, Origin::Composite);
    }
}

#[test]
fn test_free_variable_is_rejected() {
    let source = "type Query {\n  f(name: String): Int {\n    foo(bar)\n  }\n}";
    let err = compile_err(source, &Capabilities::new().sync("foo"));
    assert_eq!(err.code, ErrorCode::FREE_VARIABLE);
    assert_eq!(
        err.message,
        "The variable \"bar\" is not available in the current context. \
         Available: foo, name, either, use, cq, null, undefined, Array, Object, Math."
    );
    assert_eq!((err.location.line, err.location.column), (3, 9));
}

#[test]
fn test_arguments_of_other_fields_are_not_visible() {
    let source = "type Query { a(x: Int): Int { x } b(y: Int): Int { x } }";
    assert_eq!(compile_err(source, &Capabilities::new()).code, ErrorCode::FREE_VARIABLE);
}

#[test]
fn test_debug_option() {
    let source = "type Query { f: Int { use(1, x => { debugger; console.log(x); return x; }) } }";
    assert_eq!(compile_err(source, &Capabilities::new()).code, ErrorCode::FORBIDDEN_CONSTRUCT);
    let options = CompileOptions {
        debug: true,
        ..CompileOptions::default()
    };
    let module = compile("m", source, &Capabilities::new(), &options).unwrap();
    assert_eq!(dispatch(&module, ApiImplementations::new(), "f", json!({})), Ok(json!(1)));
}

#[test]
fn test_extraction_errors() {
    let err = compile_err("type Query { { 1 } }", &Capabilities::new());
    assert_eq!(err.kind(), ErrorKind::MissingFieldName);
    let err = compile_err("type Query { a: Int { 1 + } }", &Capabilities::new());
    assert_eq!(err.kind(), ErrorKind::EmbeddedExpressionSyntax);
    let err = compile_err("type Query { a: Int { (1)) } }", &Capabilities::new());
    assert_eq!(err.kind(), ErrorKind::EmbeddedExpressionSyntax);
    let err = compile_err("type Query { a: Int { 1 2 } }", &Capabilities::new());
    assert_eq!(err.kind(), ErrorKind::UnexpectedToken);
}

#[test]
fn test_schema_errors_refer_to_pure_schema() {
    let err = compile_err("type Query { a: Int { 1 } b: Missing }", &Capabilities::new());
    assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    assert_eq!(err.origin, Origin::PureSchema);
    assert_eq!(err.message, "Error in GraphQL schema: Unknown type \"Missing\".");

    let err = compile_err("type Query { a: Int { 1 } b: }", &Capabilities::new());
    assert_eq!(err.code, ErrorCode::SCHEMA_SYNTAX);
    assert_eq!(err.origin, Origin::PureSchema);
}

#[test]
fn test_capability_errors_come_before_schema_validation() {
    let err = compile_err("type Query { a: Missing { nope } }", &Capabilities::new());
    assert_eq!(err.code, ErrorCode::FREE_VARIABLE);
}

#[test]
fn test_empty_inputs() {
    assert_eq!(
        compile("", "type Query { a: Int }", &Capabilities::new(), &CompileOptions::default())
            .unwrap_err()
            .kind(),
        ErrorKind::Internal
    );
    assert_eq!(
        compile("m", "  ", &Capabilities::new(), &CompileOptions::default())
            .unwrap_err()
            .kind(),
        ErrorKind::SchemaValidation
    );
}
