// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `credential_mappings`: credential_id → serialized CredentialMapping
//! - `pending_binds`: credential_id → contract address awaiting remote write
//! - `session`: fixed key → serialized SessionDescriptor

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{SessionStore, StoreResult};
use crate::models::{CredentialMapping, SessionDescriptor};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: credential_id → serialized CredentialMapping (JSON bytes).
const CREDENTIAL_MAPPINGS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("credential_mappings");

/// Bindings whose document store write has not succeeded yet.
const PENDING_BINDS: TableDefinition<&str, &str> = TableDefinition::new("pending_binds");

/// Persisted session descriptor (single row).
const SESSION: TableDefinition<&str, &[u8]> = TableDefinition::new("session");

const SESSION_KEY: &str = "active";

// =============================================================================
// CredentialDatabase
// =============================================================================

/// Local durable tier for credential mappings and the session descriptor.
pub struct CredentialDatabase {
    db: Database,
}

impl CredentialDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CREDENTIAL_MAPPINGS)?;
            let _ = write_txn.open_table(PENDING_BINDS)?;
            let _ = write_txn.open_table(SESSION)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Credential mappings
    // =========================================================================

    pub fn get_mapping(&self, credential_id: &str) -> StoreResult<Option<CredentialMapping>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CREDENTIAL_MAPPINGS)?;
        match table.get(credential_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite a mapping. An existing row keeps its `created_at`.
    ///
    /// Overwriting with a different address is allowed here for corrective
    /// administration; the resolver refuses it on the normal bind path.
    pub fn upsert_mapping(
        &self,
        credential_id: &str,
        contract_address: &str,
    ) -> StoreResult<CredentialMapping> {
        let write_txn = self.db.begin_write()?;
        let mapping = {
            let mut table = write_txn.open_table(CREDENTIAL_MAPPINGS)?;

            let existing: Option<CredentialMapping> = match table.get(credential_id)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            let mapping = match existing {
                Some(mut m) => {
                    if m.contract_address != contract_address {
                        tracing::warn!(
                            credential_id = %credential_id,
                            previous = %m.contract_address,
                            contract_address = %contract_address,
                            "Overwriting credential mapping with a different address"
                        );
                    }
                    m.contract_address = contract_address.to_string();
                    m.updated_at = Utc::now();
                    m
                }
                None => CredentialMapping::new(credential_id, contract_address),
            };

            let json = serde_json::to_vec(&mapping)?;
            table.insert(credential_id, json.as_slice())?;
            mapping
        };
        write_txn.commit()?;
        Ok(mapping)
    }

    // =========================================================================
    // Pending remote binds
    // =========================================================================

    pub fn enqueue_pending_bind(&self, credential_id: &str, contract_address: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING_BINDS)?;
            table.insert(credential_id, contract_address)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All pending binds as `(credential_id, contract_address)`.
    pub fn pending_binds(&self) -> StoreResult<Vec<(String, String)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_BINDS)?;
        let mut pending = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            pending.push((key.value().to_string(), value.value().to_string()));
        }
        Ok(pending)
    }

    pub fn clear_pending_bind(&self, credential_id: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING_BINDS)?;
            table.remove(credential_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Session descriptor
// =============================================================================

impl SessionStore for CredentialDatabase {
    fn load(&self) -> StoreResult<Option<SessionDescriptor>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION)?;
        match table.get(SESSION_KEY)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn save(&self, descriptor: &SessionDescriptor) -> StoreResult<()> {
        let json = serde_json::to_vec(descriptor)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION)?;
            table.insert(SESSION_KEY, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION)?;
            table.remove(SESSION_KEY)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
