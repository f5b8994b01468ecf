//! Declaration files for aliform
//!
//! A declaration file is rendered with Tera, then parsed from KDL into an
//! [`Infra`]. `${...}` references between blocks are left in place and
//! resolved against state by [`reference::resolve`].

pub mod error;
pub mod model;
pub mod parser;
pub mod reference;
pub mod template;

pub use error::{FlowError, Result};
pub use model::{DataBlock, Infra, ProviderBlock, ResourceBlock};
pub use parser::{parse_infra_file, parse_infra_str};
pub use reference::{Reference, UNKNOWN, Unresolved, references, resolve};
pub use template::{TemplateProcessor, Variables, extract_variables};

use std::path::Path;

/// Render and parse a declaration file
///
/// Values in the file's `variables` blocks are defaults. Environment
/// variables (`ALIFORM_*`, `TF_VAR_*`) are applied after them and win.
#[tracing::instrument]
pub fn load_infra(path: &Path) -> Result<Infra> {
    let content = std::fs::read_to_string(path).map_err(|e| FlowError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let variables = extract_variables(&content)?;
    tracing::debug!(count = variables.len(), "Extracted variables");

    let mut processor = TemplateProcessor::new();
    processor.add_variables(variables);
    processor.add_env_variables();

    let rendered = processor.render_file(path)?;
    let infra = parse_infra_str(&rendered)?;

    tracing::info!(
        file = %path.display(),
        resources = infra.resources.len(),
        data = infra.data.len(),
        "Loaded declarations"
    );
    Ok(infra)
}
