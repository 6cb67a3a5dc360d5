//! Scoped transactions.
//!
//! [`OrmTransaction`] borrows its connection mutably and derefs to it, so
//! every operation issued through the scope runs inside the transaction. A
//! scope begun while another is open on the same connection becomes a
//! savepoint. Dropping a scope that was neither committed nor rolled back
//! rolls it back. Either way the connection's previous transaction handle
//! and this thread's previous ambient transaction are restored.

use std::ops::{Deref, DerefMut};

use slimorm_core::{DbConnection, IsolationLevel, Result, TransactionHandle};

use crate::ambient::{self, TransactionGuard};
use crate::wrapper::{OrmConnection, next_transaction_id};

pub struct OrmTransaction<'c> {
    conn: &'c mut OrmConnection,
    handle: TransactionHandle,
    previous: Option<TransactionHandle>,
    completed: bool,
    // Dropped after `Drop::drop` has run, restoring the ambient slot last.
    _ambient: TransactionGuard,
}

impl OrmConnection {
    /// Begin a transaction scope with the driver's default isolation.
    pub fn transaction(&mut self) -> Result<OrmTransaction<'_>> {
        OrmTransaction::begin(self, None)
    }

    pub fn transaction_with_isolation(&mut self, isolation: IsolationLevel) -> Result<OrmTransaction<'_>> {
        OrmTransaction::begin(self, Some(isolation))
    }
}

impl<'c> OrmTransaction<'c> {
    fn begin(conn: &'c mut OrmConnection, isolation: Option<IsolationLevel>) -> Result<Self> {
        let previous = conn.transaction;
        let handle = TransactionHandle {
            id: next_transaction_id(),
            connection_id: conn.id(),
            depth: previous.map_or(0, |p| p.depth + 1),
            isolation: isolation.or_else(|| previous.and_then(|p| p.isolation)),
        };

        if handle.depth == 0 {
            conn.inner.begin_transaction(isolation)?;
        } else {
            conn.inner.savepoint(&handle.savepoint_name())?;
        }
        conn.transaction = Some(handle);
        tracing::info!(
            connection = handle.connection_id,
            transaction = handle.id,
            depth = handle.depth,
            "Transaction started"
        );

        Ok(Self {
            conn,
            handle,
            previous,
            completed: false,
            _ambient: ambient::enter_transaction(handle),
        })
    }

    pub fn handle(&self) -> TransactionHandle {
        self.handle
    }

    /// Whether this scope is a savepoint inside another transaction.
    pub fn is_nested(&self) -> bool {
        self.handle.depth > 0
    }

    pub fn commit(mut self) -> Result<()> {
        if self.is_nested() {
            self.conn.inner.release_savepoint(&self.handle.savepoint_name())?;
        } else {
            self.conn.inner.commit()?;
        }
        self.completed = true;
        tracing::info!(transaction = self.handle.id, "Transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.completed = true;
        self.rollback_inner()?;
        tracing::info!(transaction = self.handle.id, "Transaction rolled back");
        Ok(())
    }

    fn rollback_inner(&mut self) -> Result<()> {
        if self.is_nested() {
            let name = self.handle.savepoint_name();
            self.conn.inner.rollback_to_savepoint(&name)?;
            self.conn.inner.release_savepoint(&name)
        } else {
            self.conn.inner.rollback()
        }
    }
}

impl Deref for OrmTransaction<'_> {
    type Target = OrmConnection;

    fn deref(&self) -> &OrmConnection {
        self.conn
    }
}

impl DerefMut for OrmTransaction<'_> {
    fn deref_mut(&mut self) -> &mut OrmConnection {
        self.conn
    }
}

impl Drop for OrmTransaction<'_> {
    fn drop(&mut self) {
        if !self.completed {
            match self.rollback_inner() {
                Ok(()) => {
                    tracing::info!(transaction = self.handle.id, "Transaction rolled back on drop");
                }
                Err(e) => {
                    tracing::warn!(
                        transaction = self.handle.id,
                        error = %e,
                        "Failed to roll back transaction on drop"
                    );
                }
            }
        }
        self.conn.transaction = self.previous;
    }
}

impl std::fmt::Debug for OrmTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrmTransaction")
            .field("handle", &self.handle)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use slimorm_core::DbCommand;
    use slimorm_sqlite::{SqliteDialect, SqliteDriver};

    use crate::wrapper::OrmConnectionFactory;

    fn open() -> OrmConnection {
        let mut conn = OrmConnectionFactory::new(":memory:", Arc::new(SqliteDriver))
            .dialect(Arc::new(SqliteDialect::new()))
            .open_db_connection()
            .unwrap();
        conn.execute_non_query(&DbCommand::new("CREATE TABLE t (x INTEGER)"))
            .unwrap();
        conn
    }

    fn count(conn: &mut OrmConnection) -> i64 {
        conn.execute_scalar(&DbCommand::new("SELECT COUNT(*) FROM t"))
            .unwrap()
            .as_i64()
            .unwrap()
    }

    fn insert(conn: &mut OrmConnection) {
        conn.execute_non_query(&DbCommand::new("INSERT INTO t (x) VALUES (1)"))
            .unwrap();
    }

    #[test]
    fn test_commit_persists() {
        let mut conn = open();
        let mut tx = conn.transaction().unwrap();
        insert(&mut tx);
        assert_eq!(tx.create_command("SELECT 1").transaction, Some(tx.handle()));
        tx.commit().unwrap();
        assert_eq!(count(&mut conn), 1);
        assert_eq!(conn.current_transaction(), None);
    }

    #[test]
    fn test_drop_rolls_back_and_restores_ambient() {
        let mut conn = open();
        {
            let mut tx = conn.transaction().unwrap();
            insert(&mut tx);
            assert_eq!(ambient::ambient_transaction(), Some(tx.handle()));
        }
        assert_eq!(ambient::ambient_transaction(), None);
        assert_eq!(conn.current_transaction(), None);
        assert_eq!(count(&mut conn), 0);
    }

    #[test]
    fn test_nested_scope_uses_savepoint() {
        let mut conn = open();
        let mut outer = conn.transaction().unwrap();
        let outer_handle = outer.handle();
        insert(&mut outer);
        {
            let mut inner = outer.transaction().unwrap();
            assert!(inner.is_nested());
            assert_eq!(ambient::ambient_transaction(), Some(inner.handle()));
            insert(&mut inner);
            inner.rollback().unwrap();
        }
        assert_eq!(ambient::ambient_transaction(), Some(outer_handle));
        assert_eq!(outer.current_transaction(), Some(outer_handle));
        assert_eq!(count(&mut outer), 1);

        {
            let mut inner = outer.transaction().unwrap();
            insert(&mut inner);
            inner.commit().unwrap();
        }
        outer.commit().unwrap();
        assert_eq!(ambient::ambient_transaction(), None);
        assert_eq!(count(&mut conn), 2);
    }
}
