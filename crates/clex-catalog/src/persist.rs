//! Binary persistence of a built [`InteractionCatalog`].

use std::fs;
use std::path::Path;

use tracing::debug;

use clex_core::error::CatalogError;

use crate::catalog::InteractionCatalog;

impl InteractionCatalog {
    /// Encode with bincode's standard configuration.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CatalogError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CatalogError::Serialization(e.to_string()))
    }

    /// Decode bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CatalogError> {
        let (catalog, read): (InteractionCatalog, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
        if read != bytes.len() {
            return Err(CatalogError::Serialization(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes).map_err(|e| CatalogError::Io(e.to_string()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved catalog");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = fs::read(path).map_err(|e| CatalogError::Io(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}
