#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config::ConfigError;

/// Read a system prompt template from a UTF-8 text file.
#[inline]
pub fn load_prompt(path: &Path) -> Result<String, ConfigError> {
    let prompt = fs::read_to_string(path).map_err(|source| ConfigError::PromptFile {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        "Loaded prompt template from {} ({} bytes)",
        path.display(),
        prompt.len()
    );
    Ok(prompt)
}
