use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::io::read_table;
use crate::operations::models::{Operation, RawOperation};

/// Validated operations in registry order, indexed by id
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    path: PathBuf,
    operations: Vec<Operation>,
    index: HashMap<i64, usize>,
}

impl OperationRegistry {
    /// Load and validate the whole registry.
    ///
    /// A missing, unreadable or empty registry is an error, as is any
    /// entry with a known kind and a malformed payload.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        let raw: Vec<RawOperation> = read_table(&path)?;
        if raw.is_empty() {
            return Err(RegistryError::Empty(path));
        }

        let mut operations = Vec::with_capacity(raw.len());
        let mut index = HashMap::with_capacity(raw.len());
        for entry in &raw {
            let operation = entry.validate()?;
            if index.insert(operation.id, operations.len()).is_some() {
                return Err(RegistryError::DuplicateId(operation.id));
            }
            debug!(
                "Operation {} ({}) -> {:?}",
                operation.id,
                operation.name,
                operation.spec.kind()
            );
            operations.push(operation);
        }

        info!("📋 Loaded {} operations from {}", operations.len(), path.display());
        Ok(Self {
            path,
            operations,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: i64) -> Option<&Operation> {
        self.index.get(&id).map(|&i| &self.operations[i])
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
