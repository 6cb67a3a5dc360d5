//! Ambient configuration: process-wide defaults with per-thread overrides.
//!
//! Three values are ambient: the active dialect provider, a command timeout
//! override, and the transaction currently open on this thread. Each setter
//! returns a guard that puts back the value it replaced when dropped, so
//! nested scopes on one thread unwind in LIFO order. A thread-local value, when
//! present, always wins over the process-wide default.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use parking_lot::RwLock;
use slimorm_core::{Error, Result, TransactionHandle};
use slimorm_dialect::DialectProvider;

static GLOBAL_DIALECT: LazyLock<RwLock<Option<Arc<dyn DialectProvider>>>> =
    LazyLock::new(|| RwLock::new(None));

thread_local! {
    static THREAD_DIALECT: RefCell<Option<Arc<dyn DialectProvider>>> = const { RefCell::new(None) };
    static THREAD_TIMEOUT: Cell<Option<Duration>> = const { Cell::new(None) };
    static THREAD_TRANSACTION: Cell<Option<TransactionHandle>> = const { Cell::new(None) };
}

/// Guards restore thread-local state, so they must stay on their thread.
type NotSend = PhantomData<*const ()>;

// ============================================================================
// Dialect
// ============================================================================

/// Install the process-wide dialect, returning the one it replaces.
pub fn set_global_dialect(dialect: Arc<dyn DialectProvider>) -> Option<Arc<dyn DialectProvider>> {
    tracing::debug!(dialect = dialect.name(), "Global dialect set");
    GLOBAL_DIALECT.write().replace(dialect)
}

pub fn clear_global_dialect() -> Option<Arc<dyn DialectProvider>> {
    GLOBAL_DIALECT.write().take()
}

pub fn global_dialect() -> Option<Arc<dyn DialectProvider>> {
    GLOBAL_DIALECT.read().clone()
}

/// This thread's dialect override, if any.
pub fn thread_dialect() -> Option<Arc<dyn DialectProvider>> {
    THREAD_DIALECT.with(|slot| slot.borrow().clone())
}

/// Override the dialect on this thread until the guard is dropped.
pub fn with_thread_dialect(dialect: Arc<dyn DialectProvider>) -> DialectGuard {
    tracing::trace!(dialect = dialect.name(), "Thread dialect override");
    let previous = THREAD_DIALECT.with(|slot| slot.borrow_mut().replace(dialect));
    DialectGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// The thread override, else the process-wide dialect.
pub fn current_dialect() -> Result<Arc<dyn DialectProvider>> {
    thread_dialect().or_else(global_dialect).ok_or_else(|| {
        Error::Config(
            "no dialect provider configured; call ambient::set_global_dialect first".to_string(),
        )
    })
}

#[must_use = "the override ends when the guard is dropped"]
pub struct DialectGuard {
    previous: Option<Arc<dyn DialectProvider>>,
    _not_send: NotSend,
}

impl Drop for DialectGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_DIALECT.with(|slot| *slot.borrow_mut() = previous);
    }
}

// ============================================================================
// Command timeout
// ============================================================================

pub fn command_timeout_override() -> Option<Duration> {
    THREAD_TIMEOUT.with(Cell::get)
}

/// Override the command timeout on this thread until the guard is dropped.
pub fn with_command_timeout(timeout: Duration) -> TimeoutGuard {
    let previous = THREAD_TIMEOUT.with(|slot| slot.replace(Some(timeout)));
    TimeoutGuard {
        previous,
        _not_send: PhantomData,
    }
}

#[must_use = "the override ends when the guard is dropped"]
pub struct TimeoutGuard {
    previous: Option<Duration>,
    _not_send: NotSend,
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        THREAD_TIMEOUT.with(|slot| slot.set(self.previous));
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// The transaction most recently begun on this thread and not yet ended.
pub fn ambient_transaction() -> Option<TransactionHandle> {
    THREAD_TRANSACTION.with(Cell::get)
}

/// Make `handle` the ambient transaction until the guard is dropped.
pub fn enter_transaction(handle: TransactionHandle) -> TransactionGuard {
    let previous = THREAD_TRANSACTION.with(|slot| slot.replace(Some(handle)));
    TransactionGuard {
        previous,
        _not_send: PhantomData,
    }
}

#[must_use = "the transaction leaves the ambient slot when the guard is dropped"]
pub struct TransactionGuard {
    previous: Option<TransactionHandle>,
    _not_send: NotSend,
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        THREAD_TRANSACTION.with(|slot| slot.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slimorm_dialect::AnsiDialect;

    fn handle(id: u64) -> TransactionHandle {
        TransactionHandle {
            id,
            connection_id: 1,
            depth: 0,
            isolation: None,
        }
    }

    #[test]
    fn test_transaction_guards_restore_in_lifo_order() {
        assert_eq!(ambient_transaction(), None);
        let a = enter_transaction(handle(1));
        assert_eq!(ambient_transaction().map(|h| h.id), Some(1));
        {
            let _b = enter_transaction(handle(2));
            assert_eq!(ambient_transaction().map(|h| h.id), Some(2));
        }
        assert_eq!(ambient_transaction().map(|h| h.id), Some(1));
        drop(a);
        assert_eq!(ambient_transaction(), None);
    }

    #[test]
    fn test_timeout_override_nests() {
        assert_eq!(command_timeout_override(), None);
        let outer = with_command_timeout(Duration::from_secs(5));
        {
            let _inner = with_command_timeout(Duration::from_secs(1));
            assert_eq!(command_timeout_override(), Some(Duration::from_secs(1)));
        }
        assert_eq!(command_timeout_override(), Some(Duration::from_secs(5)));
        drop(outer);
        assert_eq!(command_timeout_override(), None);
    }

    #[test]
    fn test_thread_dialect_override() {
        assert!(thread_dialect().is_none());
        {
            let _guard = with_thread_dialect(Arc::new(AnsiDialect::new()));
            assert_eq!(current_dialect().unwrap().name(), "ansi");
        }
        assert!(thread_dialect().is_none());
    }

    #[test]
    fn test_overrides_are_per_thread() {
        let _guard = with_command_timeout(Duration::from_secs(9));
        let seen = std::thread::spawn(command_timeout_override).join().unwrap();
        assert_eq!(seen, None);
        assert_eq!(command_timeout_override(), Some(Duration::from_secs(9)));
    }
}
