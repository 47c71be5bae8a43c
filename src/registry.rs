use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::Result;

const PARTITIONS: TableDefinition<&str, &str> =
    TableDefinition::new("partitions");
const ADMIN_TOKENS: TableDefinition<&str, &str> =
    TableDefinition::new("admin_tokens");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Persistent registry of partitions, admin tokens and tunable settings.
pub struct Registry {
    db: Database,
}

impl Registry {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(PARTITIONS)?;
        txn.open_table(ADMIN_TOKENS)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Partitions --

    pub fn set_partition(&self, name: &str, source_dir: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PARTITIONS)?;
            table.insert(name, source_dir)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_partition(&self, name: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PARTITIONS)?;
        Ok(table.get(name)?.map(|v| v.value().to_string()))
    }

    pub fn remove_partition(&self, name: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(PARTITIONS)?;
            table.remove(name)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// List all (name, source_dir) pairs, sorted by name.
    pub fn list_partitions(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PARTITIONS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }

    // -- Admin tokens --

    pub fn add_admin_token(&self, token: &str, label: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ADMIN_TOKENS)?;
            table.insert(token, label)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn remove_admin_token(&self, token: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(ADMIN_TOKENS)?;
            table.remove(token)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn list_admin_tokens(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ADMIN_TOKENS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Get a setting, returning the default if not set.
    pub fn get_setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}
