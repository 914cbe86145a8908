//! End-to-end tests for config-driven instantiation:
//! descriptor parsing, target resolution, params forwarding, and error
//! propagation through the resolver context.

use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

use t2v_turbo_utils::registry::BoxedError;
use t2v_turbo_utils::resolver::constant_factory;
use t2v_turbo_utils::{
    Component, ComponentConfig, ComponentRegistry, InstantiateError, Params, ResolveError,
    ResolverContext, SearchRoots,
};

// =============================================================================
// Test Components
// =============================================================================

#[derive(Debug, Deserialize)]
struct SchedulerArgs {
    #[serde(default)]
    num_steps: usize,
}

#[derive(Debug)]
struct LcmScheduler {
    num_steps: usize,
}

#[derive(Debug, Deserialize)]
struct GuiderArgs {
    x: i64,
}

#[derive(Debug)]
struct CfgGuider {
    x: i64,
}

#[derive(Debug)]
struct BrokenComponent;

fn test_context() -> ResolverContext {
    let mut registry = ComponentRegistry::new();
    registry.register_module("scheduler", |scope| {
        scope.register("LcmScheduler", |args: SchedulerArgs| {
            Ok(LcmScheduler {
                num_steps: args.num_steps,
            })
        });
        scope.register("CfgGuider", |args: GuiderArgs| Ok(CfgGuider { x: args.x }));
        scope.register(
            "Broken",
            |_: SchedulerArgs| -> Result<BrokenComponent, BoxedError> {
                Err("checkpoint file not found".into())
            },
        );
    });
    ResolverContext::new(SearchRoots::new(), registry)
}

// =============================================================================
// Sentinel Handling
// =============================================================================

#[test]
fn sentinels_instantiate_to_none() {
    let mut ctx = test_context();
    let roots_before = ctx.roots().clone();

    for sentinel in ["__is_first_stage__", "__is_unconditional__"] {
        let result = ctx.instantiate_from_value(&json!(sentinel)).unwrap();
        assert!(result.is_none(), "{} should yield no component", sentinel);
    }
    // Sentinel handling must not touch the search roots.
    assert_eq!(ctx.roots(), &roots_before);
}

#[test]
fn missing_target_fails() {
    let mut ctx = test_context();
    let err = ctx
        .instantiate_from_value(&json!({ "params": { "num_steps": 4 } }))
        .unwrap_err();
    assert!(matches!(err, InstantiateError::MissingTarget));
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn zero_arg_construction() {
    let mut ctx = test_context();
    let component = ctx
        .instantiate(&ComponentConfig::target("scheduler.LcmScheduler"))
        .unwrap()
        .expect("explicit descriptor yields a component");
    let scheduler = component.downcast::<LcmScheduler>().unwrap();
    assert_eq!(scheduler.num_steps, 0);
}

#[test]
fn params_are_forwarded_as_constructor_arguments() {
    let mut ctx = test_context();
    let component = ctx
        .instantiate_from_value(&json!({
            "target": "scheduler.CfgGuider",
            "params": { "x": 5 }
        }))
        .unwrap()
        .unwrap();
    let guider = component.downcast::<CfgGuider>().unwrap();
    assert_eq!(guider.x, 5);
}

#[test]
fn params_mismatch_is_a_bad_params_error() {
    let mut ctx = test_context();
    // CfgGuider requires `x`.
    let err = ctx
        .instantiate_from_value(&json!({ "target": "scheduler.CfgGuider" }))
        .unwrap_err();
    assert!(matches!(err, InstantiateError::BadParams { .. }));
}

#[test]
fn constructor_errors_propagate_verbatim() {
    let mut ctx = test_context();
    let err = ctx
        .instantiate(&ComponentConfig::target("scheduler.Broken"))
        .unwrap_err();
    match err {
        InstantiateError::Constructor(inner) => {
            assert_eq!(inner.to_string(), "checkpoint file not found");
        }
        other => panic!("expected constructor error, got {:?}", other),
    }
}

#[test]
fn unknown_targets_fail_with_module_or_type_error() {
    let mut ctx = test_context();

    let err = ctx
        .instantiate(&ComponentConfig::target("vae.AutoencoderKL"))
        .unwrap_err();
    assert!(matches!(
        err,
        InstantiateError::Resolve(ResolveError::UnknownModule { .. })
    ));

    let err = ctx
        .instantiate(&ComponentConfig::target("scheduler.DdimScheduler"))
        .unwrap_err();
    assert!(matches!(
        err,
        InstantiateError::Resolve(ResolveError::UnknownType { .. })
    ));
}

// =============================================================================
// No Instance Caching
// =============================================================================

#[test]
fn repeated_instantiation_constructs_fresh_instances() {
    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Counter;

    let mut registry = ComponentRegistry::new();
    registry.register_module("pipeline", |scope| {
        scope.register_raw(
            "Counter",
            constant_factory(|| {
                CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                Counter
            }),
        );
    });
    let mut ctx = ResolverContext::new(SearchRoots::new(), registry);

    let config = ComponentConfig::target("pipeline.Counter");
    ctx.instantiate(&config).unwrap();
    ctx.instantiate(&config).unwrap();
    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Raw Factories
// =============================================================================

#[test]
fn raw_factory_sees_untyped_params() {
    struct Echo(Params);

    let mut registry = ComponentRegistry::new();
    registry.register_module("debug", |scope| {
        scope.register_raw(
            "Echo",
            std::sync::Arc::new(|params: &Params| Ok(Box::new(Echo(params.clone())) as Component)),
        );
    });
    let mut ctx = ResolverContext::new(SearchRoots::new(), registry);

    let component = ctx
        .instantiate_from_value(&json!({
            "target": "debug.Echo",
            "params": { "fps": 16, "codec": "h264" }
        }))
        .unwrap()
        .unwrap();
    let echo = component.downcast::<Echo>().unwrap();
    assert_eq!(echo.0.get("fps"), Some(&json!(16)));
    assert_eq!(echo.0.get("codec"), Some(&json!("h264")));
}
