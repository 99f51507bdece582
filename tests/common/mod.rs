//! Shared services, proxy stand-ins and interceptors for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use ferrous_intercept::{
    interceptor_fn, AnyValue, AsyncInterceptor, BoxError, Interceptor, InterceptorChain, InterfaceProxy, Invocation,
};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

// ===== Event log =====

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Suspends exactly once, waking itself immediately. Works on any executor.
pub struct YieldOnce(bool);

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

pub fn yield_once() -> YieldOnce {
    YieldOnce(false)
}

// ===== Services =====

pub trait Calculator: Send + Sync {
    fn add(&self, a: i64, b: i64) -> i64;
    fn reset(&self);
    fn total(&self) -> BoxFuture<'static, Result<i64, BoxError>>;
    fn flush(&self) -> BoxFuture<'static, Result<(), BoxError>>;
}

pub struct Accumulator {
    pub total: Arc<AtomicI64>,
    pub log: Log,
}

impl Accumulator {
    pub fn new(log: Log) -> Self {
        Self {
            total: Arc::new(AtomicI64::new(0)),
            log,
        }
    }
}

impl Calculator for Accumulator {
    fn add(&self, a: i64, b: i64) -> i64 {
        self.log.push("target:add");
        self.total.fetch_add(a + b, Ordering::SeqCst);
        a + b
    }

    fn reset(&self) {
        self.log.push("target:reset");
        self.total.store(0, Ordering::SeqCst);
    }

    fn total(&self) -> BoxFuture<'static, Result<i64, BoxError>> {
        let total = self.total.clone();
        let log = self.log.clone();
        async move {
            yield_once().await;
            log.push("target:total");
            Ok(total.load(Ordering::SeqCst))
        }
        .boxed()
    }

    fn flush(&self) -> BoxFuture<'static, Result<(), BoxError>> {
        let log = self.log.clone();
        async move {
            yield_once().await;
            log.push("target:flush");
            Ok(())
        }
        .boxed()
    }
}

pub struct CalculatorProxy {
    target: Option<Arc<dyn Calculator>>,
    chain: InterceptorChain,
}

impl Calculator for CalculatorProxy {
    fn add(&self, a: i64, b: i64) -> i64 {
        let target = self.target.clone().map(|t| move || t.add(a, b));
        self.chain.invoke_value("add", target).expect("intercepted add")
    }

    fn reset(&self) {
        let target = self.target.clone().map(|t| move || t.reset());
        self.chain.invoke_unit("reset", target).expect("intercepted reset")
    }

    fn total(&self) -> BoxFuture<'static, Result<i64, BoxError>> {
        let target = self.target.clone().map(|t| move || t.total());
        self.chain.invoke_async_value("total", target)
    }

    fn flush(&self) -> BoxFuture<'static, Result<(), BoxError>> {
        let target = self.target.clone().map(|t| move || t.flush());
        self.chain.invoke_async("flush", target)
    }
}

impl InterfaceProxy for dyn Calculator {
    fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self> {
        Arc::new(CalculatorProxy { target, chain })
    }
}

pub trait Describe: Send + Sync {
    fn describe(&self) -> String;
}

pub struct DescribeProxy {
    target: Option<Arc<dyn Describe>>,
    chain: InterceptorChain,
}

impl Describe for DescribeProxy {
    fn describe(&self) -> String {
        let target = self.target.clone().map(|t| move || t.describe());
        self.chain.invoke_value("describe", target).unwrap_or_else(|e| e.to_string())
    }
}

impl InterfaceProxy for dyn Describe {
    fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self> {
        Arc::new(DescribeProxy { target, chain })
    }
}

// ===== Interceptors =====

/// Synchronous interceptor logging `label:before` and `label:after`.
pub fn recording(log: &Log, label: &'static str) -> Arc<dyn Interceptor> {
    let log = log.clone();
    Arc::new(interceptor_fn(label, move |invocation| {
        log.push(format!("{label}:before"));
        invocation.proceed();
        log.push(format!("{label}:after"));
    }))
}

/// Asynchronous interceptor logging around the rest of the chain,
/// optionally suspending before it proceeds.
pub struct AsyncRecording {
    pub label: &'static str,
    pub log: Log,
    pub suspend: bool,
}

impl AsyncRecording {
    pub fn new(log: &Log, label: &'static str) -> Self {
        Self {
            label,
            log: log.clone(),
            suspend: false,
        }
    }

    pub fn suspending(log: &Log, label: &'static str) -> Self {
        Self {
            label,
            log: log.clone(),
            suspend: true,
        }
    }
}

#[async_trait]
impl AsyncInterceptor for AsyncRecording {
    async fn intercept_async(&self, invocation: Invocation) -> Result<(), BoxError> {
        self.log.push(format!("{}:before", self.label));
        if self.suspend {
            yield_once().await;
        }
        let result = invocation.proceed_async().await;
        self.log.push(format!("{}:after", self.label));
        result
    }

    async fn intercept_async_value(&self, invocation: Invocation) -> Result<AnyValue, BoxError> {
        self.log.push(format!("{}:before", self.label));
        if self.suspend {
            yield_once().await;
        }
        let result = invocation.proceed_async_value().await;
        self.log.push(format!("{}:after", self.label));
        result
    }

    fn name(&self) -> &'static str {
        self.label
    }
}
