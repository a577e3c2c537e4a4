//! Fixed-size pool of `switchy_database` connections.
//!
//! Every store operation checks a connection out for the duration of one
//! statement, so overlapping ingestion cycles never share an in-flight
//! connection. Checkout takes the first idle connection; when all are busy
//! it waits on the next one in round-robin order.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

use switchy_database::Database;
use tokio::sync::{Mutex, MutexGuard};

use crate::{DbError, SqlDialect};

/// Pool of database connections sharing one [`SqlDialect`].
pub struct ConnectionPool {
    connections: Vec<Mutex<Box<dyn Database>>>,
    next: AtomicUsize,
    dialect: SqlDialect,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("size", &self.connections.len())
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Wraps already-open connections in a pool.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connect`] if `connections` is empty.
    pub fn new(connections: Vec<Box<dyn Database>>, dialect: SqlDialect) -> Result<Self, DbError> {
        if connections.is_empty() {
            return Err(DbError::Connect {
                message: "connection pool needs at least one connection".to_string(),
            });
        }

        Ok(Self {
            connections: connections.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
            dialect,
        })
    }

    /// Returns the number of connections in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.connections.len()
    }

    /// Returns the SQL dialect of the pooled connections.
    #[must_use]
    pub const fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Checks out a connection. It returns to the pool when the guard is
    /// dropped.
    pub async fn acquire(&self) -> PooledConnection<'_> {
        for conn in &self.connections {
            if let Ok(guard) = conn.try_lock() {
                return PooledConnection { guard };
            }
        }

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        PooledConnection {
            guard: self.connections[idx].lock().await,
        }
    }
}

/// A connection checked out of a [`ConnectionPool`].
pub struct PooledConnection<'a> {
    guard: MutexGuard<'a, Box<dyn Database>>,
}

impl Deref for PooledConnection<'_> {
    type Target = dyn Database;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}
