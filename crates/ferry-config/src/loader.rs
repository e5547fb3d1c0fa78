use std::path::Path;

use crate::{ConfigError, RoutingTable};

impl RoutingTable {
    /// Load the routing table from an inline JSON document or a file
    ///
    /// The inline document wins when both are given. Blank inline
    /// documents count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when neither source is provided,
    /// or the parse error of whichever source was used
    pub fn load(inline: Option<&str>, path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(raw) = inline.filter(|raw| !raw.trim().is_empty()) {
            let table = Self::from_json(raw)?;
            tracing::debug!(models = table.len(), "loaded routing table from inline configuration");
            return Ok(table);
        }

        let Some(path) = path else {
            return Err(ConfigError::Missing);
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let table = Self::from_json(&raw)?;
        tracing::debug!(models = table.len(), path = %path.display(), "loaded routing table from file");

        Ok(table)
    }
}
