//! Circular dependency detection.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;

const MAX_DEPTH: usize = 1024;

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// Pops the entry pushed by `with_circular_guard`, also on early return.
struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `key` pushed on this thread's resolution stack.
///
/// Keys compare with their service key, so a keyed registration may depend
/// on the default registration of the same type. Fails with
/// `DiError::Circular` when `key` is already being resolved further up the
/// stack, and with `DiError::DepthExceeded` past `MAX_DEPTH`.
pub(crate) fn with_circular_guard<T, F>(key: &Key, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    RESOLUTION_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.contains(key) {
            let mut path: Vec<&'static str> = stack.iter().map(Key::display_name).collect();
            path.push(key.display_name());
            return Err(DiError::Circular(path));
        }
        if stack.len() >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(stack.len()));
        }
        stack.push(key.clone());
        Ok(())
    })?;

    let _guard = StackGuard;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_reentry() {
        let a = Key::Trait("A");
        let b = Key::Trait("B");
        let result = with_circular_guard(&a, || with_circular_guard(&b, || with_circular_guard(&a, || Ok(()))));
        match result {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("expected circular error, got {:?}", other),
        }
    }

    #[test]
    fn keyed_and_default_registrations_are_distinct() {
        let default = Key::Trait("dyn Store");
        let keyed = Key::TraitNamed("dyn Store", "audited");
        let result = with_circular_guard(&keyed, || with_circular_guard(&default, || Ok(7)));
        assert_eq!(result.unwrap(), 7);

        let reentered = with_circular_guard(&keyed, || with_circular_guard(&keyed, || Ok(())));
        assert!(matches!(reentered, Err(DiError::Circular(path)) if path == vec!["dyn Store", "dyn Store"]));
    }

    #[test]
    fn stack_unwinds_after_error() {
        let a = Key::Trait("A");
        let _ = with_circular_guard(&a, || with_circular_guard(&a, || Ok(())));
        assert!(with_circular_guard(&a, || Ok(())).is_ok());
    }
}
