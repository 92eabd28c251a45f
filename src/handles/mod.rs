//! Handle Registry
//!
//! Maps opaque integer handles to boxed values. Handles start at 1, grow
//! strictly and are never reused, so a freed handle can never alias a newer
//! object. Handle 0 means "no handle" and is never issued.
//!
//! All mutations go through one mutex. Values are stored behind `Arc`, so a
//! lookup only clones a pointer under the lock and any blocking work on the
//! object happens after the lock is released.

mod value;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::contract::{violate, ContractViolation};

pub use value::{Boxed, BoxedValue, Kind};

/// Opaque identifier for a registered value.
pub type Handle = usize;

/// The reserved "no handle" value.
pub const NULL_HANDLE: Handle = 0;

struct RegistryTable {
    next: Handle,
    values: HashMap<Handle, BoxedValue>,
}

/// Handle table shared by every export.
pub struct HandleRegistry {
    table: Mutex<RegistryTable>,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    /// Create an empty registry. The first handle it issues is 1.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(RegistryTable {
                next: 1,
                values: HashMap::new(),
            }),
        }
    }

    /// Box and register a value, returning its new handle.
    pub fn register<T: Boxed>(&self, value: T) -> Handle {
        self.register_boxed(T::wrap(Arc::new(value)))
    }

    /// Register an already boxed value.
    pub fn register_boxed(&self, value: BoxedValue) -> Handle {
        let kind = value.kind();
        let handle = {
            let mut table = self.table.lock();
            let handle = table.next;
            table.next += 1;
            table.values.insert(handle, value);
            handle
        };
        tracing::trace!(handle, %kind, "registered");
        handle
    }

    /// Borrowing lookup. Handle 0 and unknown handles are not found.
    pub fn get(&self, handle: Handle) -> Option<BoxedValue> {
        if handle == NULL_HANDLE {
            return None;
        }
        self.table.lock().values.get(&handle).cloned()
    }

    /// Consuming lookup: removes the entry and returns it.
    pub fn take(&self, handle: Handle) -> Option<BoxedValue> {
        if handle == NULL_HANDLE {
            return None;
        }
        let value = self.table.lock().values.remove(&handle);
        if let Some(value) = &value {
            tracing::trace!(handle, kind = %value.kind(), "taken");
        }
        value
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.table.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a handle that must refer to a live `T`.
    ///
    /// Handle 0, unknown handles and kind mismatches are contract violations.
    #[track_caller]
    pub fn resolve<T: Boxed>(&self, handle: Handle) -> Arc<T> {
        let op = T::KIND.label();
        if handle == NULL_HANDLE {
            violate(ContractViolation::ZeroHandle { op });
        }
        match self.get(handle) {
            Some(value) => downcast(op, handle, value),
            None => violate(ContractViolation::UnknownHandle { op, handle }),
        }
    }

    /// Remove a handle that must refer to a live `T` and return the value.
    ///
    /// The kind is checked before the entry is removed, so a wrong-kind
    /// release leaves the table untouched.
    #[track_caller]
    pub fn release<T: Boxed>(&self, handle: Handle) -> Arc<T> {
        let op = T::KIND.label();
        if handle == NULL_HANDLE {
            violate(ContractViolation::ZeroHandle { op });
        }
        let taken = {
            let mut table = self.table.lock();
            let current = table.values.get(&handle).map(BoxedValue::kind);
            match current {
                Some(kind) if kind == T::KIND => table.values.remove(&handle),
                Some(actual) => {
                    drop(table);
                    violate(ContractViolation::WrongKind {
                        op,
                        handle,
                        expected: T::KIND,
                        actual,
                    });
                }
                None => None,
            }
        };
        match taken {
            Some(value) => {
                tracing::trace!(handle, kind = %T::KIND, "released");
                downcast(op, handle, value)
            }
            None => violate(ContractViolation::UnknownHandle { op, handle }),
        }
    }
}

#[track_caller]
fn downcast<T: Boxed>(op: &'static str, handle: Handle, value: BoxedValue) -> Arc<T> {
    match T::unwrap(value) {
        Ok(inner) => inner,
        Err(other) => violate(ContractViolation::WrongKind {
            op,
            handle,
            expected: T::KIND,
            actual: other.kind(),
        }),
    }
}

static GLOBAL: Lazy<HandleRegistry> = Lazy::new(|| {
    tracing::debug!("process handle registry created");
    HandleRegistry::new()
});

/// The process-wide registry used by the C exports.
pub fn global() -> &'static HandleRegistry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_handle_is_one() {
        let reg = HandleRegistry::new();
        assert_eq!(reg.register("a".to_string()), 1);
        assert_eq!(reg.register("b".to_string()), 2);
    }

    #[test]
    fn test_get_borrows() {
        let reg = HandleRegistry::new();
        let h = reg.register(vec![1u8, 2, 3]);
        assert!(reg.get(h).is_some());
        assert!(reg.get(h).is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_take_consumes() {
        let reg = HandleRegistry::new();
        let h = reg.register("x".to_string());
        assert_eq!(reg.take(h).map(|v| v.kind()), Some(Kind::String));
        assert!(reg.take(h).is_none());
        assert!(reg.get(h).is_none());
    }

    #[test]
    fn test_zero_handle_not_found() {
        let reg = HandleRegistry::new();
        reg.register("x".to_string());
        assert!(reg.get(0).is_none());
        assert!(reg.take(0).is_none());
    }

    #[test]
    fn test_handles_not_reused_after_free() {
        let reg = HandleRegistry::new();
        let a = reg.register("a".to_string());
        reg.take(a);
        let b = reg.register("b".to_string());
        assert!(b > a);
    }

    #[test]
    fn test_resolve_returns_payload() {
        let reg = HandleRegistry::new();
        let h = reg.register("hello".to_string());
        assert_eq!(reg.resolve::<String>(h).as_str(), "hello");
    }

    #[test]
    #[should_panic(expected = "is string, expected bytes")]
    fn test_resolve_wrong_kind() {
        let reg = HandleRegistry::new();
        let h = reg.register("hello".to_string());
        reg.resolve::<Vec<u8>>(h);
    }

    #[test]
    #[should_panic(expected = "handle is 0")]
    fn test_resolve_zero() {
        HandleRegistry::new().resolve::<String>(0);
    }

    #[test]
    #[should_panic(expected = "invalid handle 5")]
    fn test_release_unknown() {
        HandleRegistry::new().release::<String>(5);
    }

    #[test]
    fn test_release_wrong_kind_keeps_entry() {
        let reg = Arc::new(HandleRegistry::new());
        let h = reg.register("keep".to_string());
        let r = Arc::clone(&reg);
        let outcome = std::thread::spawn(move || {
            r.release::<Vec<u8>>(h);
        })
        .join();
        assert!(outcome.is_err());
        assert_eq!(reg.resolve::<String>(h).as_str(), "keep");
    }

    #[test]
    fn test_concurrent_registration_unique() {
        let reg = Arc::new(HandleRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| reg.register(i.to_string()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<Handle> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
        assert!(!all.contains(&0));
    }
}
