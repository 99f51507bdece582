/// Proxy generation tests
///
/// Request validation, class proxy construction, additional interfaces and
/// the generation options (hooks, selectors, mixins).
mod common;

use common::*;
use ferrous_intercept::{
    interceptor_fn, AnyArc, ClassProxy, ConstructorArgs, DiError, DiResult, ErasedProxyRequest, Interceptor,
    InterceptorChain, InterceptorSelector, MethodSignature, ProxyGenerationOptions, ProxyGenerator, ProxyRequest,
    Resolver, ResolverCore, ReturnValue, ServiceCollection, TypeRef,
};
use std::error::Error;
use std::sync::Arc;

// ===== Class proxies used below =====

struct AuditTrail;

struct Probe {
    seen: Vec<&'static str>,
    chain: InterceptorChain,
}

impl ClassProxy for Probe {
    fn construct_proxy(_: &dyn ResolverCore, args: &mut ConstructorArgs) -> DiResult<Self> {
        let seen = args.type_names();
        let _target = args.next_if::<Arc<Probe>>();
        let _mixin = args.next_if::<Arc<AuditTrail>>();
        let chain = args.next::<InterceptorChain>()?;
        let _selector = args.next_if::<Arc<dyn InterceptorSelector>>();
        let _label: String = args.next()?;
        Ok(Probe { seen, chain })
    }
}

struct Gauge {
    scale: u32,
    chain: InterceptorChain,
}

impl Gauge {
    fn read(&self) -> u32 {
        let scale = self.scale;
        self.chain.invoke_value("read", Some(move || scale)).unwrap()
    }
}

impl ClassProxy for Gauge {
    fn construct_proxy(_: &dyn ResolverCore, args: &mut ConstructorArgs) -> DiResult<Self> {
        let chain = args.next()?;
        let scale = args.next::<u32>()?;
        Ok(Gauge { scale, chain })
    }
}

struct Calibration {
    offset: u32,
}

struct Thermometer {
    calibration: Arc<Calibration>,
    chain: InterceptorChain,
}

impl Thermometer {
    fn celsius(&self) -> u32 {
        let offset = self.calibration.offset;
        self.chain.invoke_value("celsius", Some(move || 20 + offset)).unwrap()
    }
}

impl ClassProxy for Thermometer {
    fn construct_proxy(resolver: &dyn ResolverCore, args: &mut ConstructorArgs) -> DiResult<Self> {
        Ok(Thermometer {
            calibration: resolver.get::<Calibration>()?,
            chain: args.next()?,
        })
    }
}

fn invalid_param(error: DiError) -> &'static str {
    match error {
        DiError::InvalidArgument { param, .. } => param,
        other => panic!("expected invalid argument, got {:?}", other),
    }
}

// ===== Validation =====

#[test]
fn test_unbound_type_to_proxy_is_rejected() {
    let generator = ProxyGenerator::new();
    let error = generator
        .create_proxy(ErasedProxyRequest::new(TypeRef::unbound("Repository<T>", 1)), None)
        .unwrap_err();

    assert_eq!(invalid_param(error.clone()), "type_to_proxy");
    assert!(error.to_string().contains("Repository<T>"));
}

#[test]
fn test_unbound_additional_interface_is_rejected_before_generation() {
    let generator = ProxyGenerator::new();
    let request = ProxyRequest::<dyn Calculator>::new()
        .with_target(Arc::new(Accumulator::new(Log::default())))
        .additional_interface_ref(TypeRef::unbound("Handler<E>", 1));

    let error = generator.create_interface_proxy(request).err().unwrap();

    assert_eq!(invalid_param(error), "additional_interfaces");
    assert!(generator.cached_types().is_empty());
}

#[test]
fn test_class_as_additional_interface_is_rejected() {
    let generator = ProxyGenerator::new();
    let request = ProxyRequest::<dyn Calculator>::new().additional_interface_ref(TypeRef::class::<Gauge>());

    let error = generator.create_interface_proxy(request).err().unwrap();

    assert_eq!(invalid_param(error.clone()), "additional_interfaces");
    assert!(error.to_string().ends_with("is not an interface"));
}

#[test]
fn test_untyped_interface_request_rejects_constructor_arguments() {
    let generator = ProxyGenerator::new();
    generator.register_interface::<dyn Calculator>();

    let error = generator
        .create_proxy(
            ErasedProxyRequest::new(TypeRef::of::<dyn Calculator>()).constructor_args(ConstructorArgs::new().with(1u8)),
            None,
        )
        .unwrap_err();

    assert_eq!(invalid_param(error), "constructor_args");
}

#[test]
fn test_untyped_request_needs_registered_blueprint() {
    let generator = ProxyGenerator::new();
    let request = ErasedProxyRequest::new(TypeRef::of::<dyn Describe>());

    assert!(matches!(generator.create_proxy(request, None), Err(DiError::ProxyTypeNotFound(_))));
}

// ===== Interface proxies =====

#[test]
fn test_untyped_request_with_target() {
    let log = Log::default();
    let generator = ProxyGenerator::new();
    assert!(generator.register_interface::<dyn Calculator>());

    let target: Arc<dyn Calculator> = Arc::new(Accumulator::new(log.clone()));
    let proxy = generator
        .create_proxy(
            ErasedProxyRequest::new(TypeRef::of::<dyn Calculator>())
                .with_target(Arc::new(target) as AnyArc)
                .interceptor(recording(&log, "untyped")),
            None,
        )
        .unwrap();

    let calculator = proxy.downcast_trait::<dyn Calculator>().unwrap();
    assert_eq!(calculator.add(1, 1), 2);
    assert_eq!(log.entries(), vec!["untyped:before", "target:add", "untyped:after"]);
}

#[test]
fn test_additional_interface_shares_interceptors() {
    let describer = interceptor_fn("describer", |invocation| {
        if invocation.method().name == "describe" {
            invocation.set_value(format!("proxy for {}", invocation.target_type()));
        } else {
            invocation.proceed();
        }
    });
    let generator = ProxyGenerator::new();
    let instance = generator
        .create_interface_proxy(
            ProxyRequest::<dyn Calculator>::new()
                .with_target(Arc::new(Accumulator::new(Log::default())))
                .additional_interface::<dyn Describe>()
                .interceptor(Arc::new(describer)),
        )
        .unwrap();

    assert_eq!(instance.proxy().add(2, 3), 5);
    let describe = instance.interface::<dyn Describe>().expect("additional interface");
    assert!(describe.describe().starts_with("proxy for dyn"));
    assert!(describe.describe().ends_with("Describe"));
}

#[test]
fn test_additional_interface_without_handler_has_no_target() {
    let generator = ProxyGenerator::new();
    let instance = generator
        .create_interface_proxy(
            ProxyRequest::<dyn Calculator>::new()
                .with_target(Arc::new(Accumulator::new(Log::default())))
                .additional_interface::<dyn Describe>(),
        )
        .unwrap();

    let describe = instance.interface::<dyn Describe>().unwrap();
    assert_eq!(describe.describe(), "No target to proceed to for method: describe");
}

#[tokio::test]
async fn test_proxy_without_target() {
    let supplier = interceptor_fn("supplier", |invocation| {
        if invocation.method().name == "total" {
            invocation.set_return_value(ReturnValue::future_value(async { Ok::<i64, ferrous_intercept::BoxError>(7) }));
        } else {
            invocation.proceed();
        }
    });
    let generator = ProxyGenerator::new();
    let proxy = generator
        .create_interface_proxy_without_target::<dyn Calculator>(vec![Arc::new(supplier)])
        .unwrap();

    assert_eq!(proxy.total().await.unwrap(), 7);
    let error = proxy.flush().await.unwrap_err();
    assert_eq!(error.to_string(), "No target to proceed to for method: flush");
}

#[test]
fn test_hook_excludes_methods_from_interception() {
    let log = Log::default();
    let options = ProxyGenerationOptions::default()
        .with_hook(|_: &'static str, method: &MethodSignature| method.name != "reset");
    let proxy = ProxyGenerator::new()
        .create_interface_proxy(
            ProxyRequest::<dyn Calculator>::new()
                .with_target(Arc::new(Accumulator::new(log.clone())))
                .options(options)
                .interceptor(recording(&log, "hooked")),
        )
        .unwrap()
        .into_proxy();

    proxy.reset();
    proxy.add(1, 0);

    assert_eq!(
        log.entries(),
        vec!["target:reset", "hooked:before", "target:add", "hooked:after"]
    );
}

#[test]
fn test_selector_chooses_interceptors_per_method() {
    let log = Log::default();
    let options = ProxyGenerationOptions::default().with_selector(
        |_: &'static str, method: &MethodSignature, interceptors: &[Arc<dyn Interceptor>]| -> Vec<Arc<dyn Interceptor>> {
            if method.name == "add" {
                interceptors.iter().filter(|i| i.name() == "second").cloned().collect()
            } else {
                interceptors.iter().rev().cloned().collect()
            }
        },
    );
    let proxy = ProxyGenerator::new()
        .create_interface_proxy(
            ProxyRequest::<dyn Calculator>::new()
                .with_target(Arc::new(Accumulator::new(log.clone())))
                .options(options)
                .interceptor(recording(&log, "first"))
                .interceptor(recording(&log, "second")),
        )
        .unwrap()
        .into_proxy();

    proxy.add(1, 1);
    assert_eq!(log.entries(), vec!["second:before", "target:add", "second:after"]);

    log.clear();
    proxy.reset();
    assert_eq!(
        log.entries(),
        vec!["second:before", "first:before", "target:reset", "first:after", "second:after"]
    );
}

// ===== Class proxies =====

#[test]
fn test_class_proxy_argument_order() {
    let options = ProxyGenerationOptions::default()
        .with_mixin(Arc::new(AuditTrail))
        .with_selector(|_: &'static str, _: &MethodSignature, interceptors: &[Arc<dyn Interceptor>]| {
            interceptors.to_vec()
        });
    let target = Arc::new(Probe {
        seen: Vec::new(),
        chain: InterceptorChain::new(Vec::new()),
    });

    let proxy = ProxyGenerator::new()
        .create_class_proxy_with_target(
            target,
            ProxyRequest::new().options(options).constructor_arg("label".to_string()),
            None,
        )
        .unwrap();

    assert_eq!(
        proxy.seen,
        vec![
            std::any::type_name::<Arc<Probe>>(),
            std::any::type_name::<Arc<AuditTrail>>(),
            std::any::type_name::<InterceptorChain>(),
            std::any::type_name::<Arc<dyn InterceptorSelector>>(),
            std::any::type_name::<String>(),
        ]
    );
    assert!(proxy.chain.is_empty());
}

#[test]
fn test_class_proxy_routes_through_interceptors() {
    let doubler = interceptor_fn("doubler", |invocation| {
        invocation.proceed();
        let value: u32 = invocation.take_value_or_default();
        invocation.set_value(value * 2);
    });
    let gauge = ProxyGenerator::new()
        .create_class_proxy(
            ProxyRequest::<Gauge>::new().constructor_arg(21u32).interceptor(Arc::new(doubler)),
            None,
        )
        .unwrap()
        .into_proxy();

    assert_eq!(gauge.read(), 42);
}

#[test]
fn test_class_proxy_argument_mismatch_message() {
    let generator = ProxyGenerator::new();
    let error = generator
        .create_class_proxy(ProxyRequest::<Gauge>::new().constructor_arg("text"), None)
        .err()
        .unwrap();

    assert_eq!(
        error.to_string(),
        format!(
            "Can not instantiate proxy of class: {}. Could not find a constructor that would match given arguments: &str",
            std::any::type_name::<Gauge>()
        )
    );
    let source = error.source().expect("original failure");
    assert_eq!(source.to_string(), "Argument mismatch: expected u32, found &str");
}

#[test]
fn test_class_proxy_without_arguments_mentions_parameterless_constructor() {
    let generator = ProxyGenerator::new();
    let error = generator
        .create_class_proxy(ProxyRequest::<Gauge>::new(), None)
        .err()
        .unwrap();

    assert!(error
        .to_string()
        .ends_with("Could not find a parameterless constructor."));
}

#[test]
fn test_class_proxy_with_leftover_arguments() {
    let generator = ProxyGenerator::new();
    let error = generator
        .create_class_proxy(ProxyRequest::<Gauge>::new().constructor_arg(1u32).constructor_arg(2u8), None)
        .err()
        .unwrap();

    match error {
        DiError::ProxyConstruction { arguments, source, .. } => {
            assert_eq!(arguments, vec!["u32", "u8"]);
            assert!(matches!(*source, DiError::UnusedArguments(ref left) if left == &vec!["u8"]));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_class_proxy_dependencies_come_from_resolver() {
    let generator = ProxyGenerator::new();

    let missing = generator
        .create_class_proxy(ProxyRequest::<Thermometer>::new(), None)
        .err()
        .unwrap();
    assert!(matches!(missing, DiError::NotFound(_)));

    let mut services = ServiceCollection::new();
    services.add_singleton(Calibration { offset: 2 });
    let provider = services.build();
    let thermometer = generator
        .create_class_proxy(ProxyRequest::<Thermometer>::new(), Some(&provider as &dyn ResolverCore))
        .unwrap()
        .into_proxy();

    assert_eq!(thermometer.celsius(), 22);
}
