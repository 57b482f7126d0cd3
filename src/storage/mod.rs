// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Storage
//!
//! The two network-free resolver tiers and the persisted session descriptor.
//!
//! ## Layout
//!
//! ```text
//! $DATA_DIR/
//!   wallet.redb
//!     credential_mappings   # credential_id -> CredentialMapping
//!     pending_binds         # bindings not yet written to the document store
//!     session               # last connected wallet, for silent reconnect
//! ```
//!
//! The in-memory [`CredentialCache`] sits in front of the database and is
//! dropped wholesale on disconnect.

pub mod credential_cache;
pub mod credential_db;

pub use credential_cache::CredentialCache;
pub use credential_db::CredentialDatabase;

use crate::models::SessionDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Local durable key-value area holding the session descriptor.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> StoreResult<Option<SessionDescriptor>>;
    fn save(&self, descriptor: &SessionDescriptor) -> StoreResult<()>;
    fn clear(&self) -> StoreResult<()>;
}
