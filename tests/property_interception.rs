/// Property-based tests for interceptor chains
///
/// These tests use proptest to generate interceptor stacks and verify the
/// ordering and short-circuit invariants hold for every shape of chain.
mod common;

use common::*;
use ferrous_intercept::{interceptor_fn, Interceptor, InterceptorChain, ProxyGenerator, ProxyRequest};
use proptest::prelude::*;
use std::sync::Arc;

fn labels() -> Vec<&'static str> {
    vec!["a", "b", "c", "d", "e", "f", "g", "h"]
}

fn chain_of(log: &Log, count: usize) -> Vec<Arc<dyn Interceptor>> {
    labels().into_iter().take(count).map(|label| recording(log, label)).collect()
}

proptest! {
    // Before-entries follow registration order, after-entries mirror it.
    #[test]
    fn interceptors_nest_in_registration_order(count in 0usize..8, a in -1000i64..1000, b in -1000i64..1000) {
        let log = Log::default();
        let proxy = ProxyGenerator::new()
            .create_interface_proxy_with_target::<dyn Calculator>(
                Arc::new(Accumulator::new(log.clone())),
                chain_of(&log, count),
            )
            .unwrap();

        prop_assert_eq!(proxy.add(a, b), a + b);

        let mut expected: Vec<String> = labels().iter().take(count).map(|l| format!("{l}:before")).collect();
        expected.push("target:add".to_string());
        expected.extend(labels().iter().take(count).rev().map(|l| format!("{l}:after")));
        prop_assert_eq!(log.entries(), expected);
    }
}

proptest! {
    // A stopping interceptor hides the target and everything after it.
    #[test]
    fn short_circuit_stops_the_chain(count in 1usize..8, stop_at in 0usize..8, value in any::<i64>()) {
        let stop_at = stop_at % count;
        let log = Log::default();
        let mut interceptors = chain_of(&log, count);
        interceptors.insert(stop_at, Arc::new(interceptor_fn("stop", move |invocation| {
            invocation.set_value(value);
        })));

        let chain = InterceptorChain::new(interceptors);
        let target_log = log.clone();
        let result: i64 = chain
            .invoke_value("add", Some(move || {
                target_log.push("target:add");
                0i64
            }))
            .unwrap();

        prop_assert_eq!(result, value);
        let entries = log.entries();
        prop_assert_eq!(entries.len(), stop_at * 2);
        prop_assert!(!entries.contains(&"target:add".to_string()));
    }
}

proptest! {
    // Async interceptors keep the same nesting as synchronous ones.
    #[test]
    fn async_interceptors_nest_like_sync_ones(count in 1usize..6) {
        let log = Log::default();
        let mut request = ProxyRequest::<dyn Calculator>::new()
            .with_target(Arc::new(Accumulator::new(log.clone())));
        for label in labels().into_iter().take(count) {
            request = request.async_interceptor(AsyncRecording::suspending(&log, label));
        }
        let proxy = ProxyGenerator::new().create_interface_proxy(request).unwrap().into_proxy();

        futures::executor::block_on(proxy.flush()).unwrap();

        let entries = log.entries();
        prop_assert_eq!(entries.len(), count * 2 + 1);
        prop_assert_eq!(&entries[count], "target:flush");
        for (i, label) in labels().into_iter().take(count).enumerate() {
            prop_assert_eq!(&entries[i], &format!("{label}:before"));
            prop_assert_eq!(&entries[entries.len() - 1 - i], &format!("{label}:after"));
        }
    }
}
