//! Template rendering
//!
//! Declaration files are rendered with Tera before they are parsed, so
//! `{{ name }}` placeholders can be filled from the `variables` block and
//! from the environment.

use crate::error::{FlowError, Result};
use crate::parser::kdl_value_to_json;
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

pub type Variables = HashMap<String, serde_json::Value>;

/// Environment variables visible to templates under their full name
const ALLOWED_PREFIXES: &[&str] = &["ALIFORM_", "TF_VAR_"];

/// `TF_VAR_name` is also exposed as plain `name`
const TF_VAR_PREFIX: &str = "TF_VAR_";

pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// Add `ALIFORM_*` and `TF_VAR_*` environment variables
    ///
    /// Other variables (credentials in particular) never reach templates.
    #[tracing::instrument(skip(self))]
    pub fn add_env_variables(&mut self) {
        let mut count = 0;

        for (key, value) in std::env::vars() {
            if !ALLOWED_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
                continue;
            }
            debug!(key = %key, "Adding environment variable");
            if let Some(short) = key.strip_prefix(TF_VAR_PREFIX).filter(|s| !s.is_empty()) {
                self.context
                    .insert(short, &serde_json::Value::String(value.clone()));
            }
            self.context.insert(key, &serde_json::Value::String(value));
            count += 1;
        }

        info!(env_var_count = count, "Added filtered environment variables");
    }

    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera
            .render_str(template, &self.context)
            .map_err(|e| FlowError::TemplateRenderError(extract_tera_error_detail(&e)))
    }

    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| FlowError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render_str(&content).map_err(|e| match e {
            FlowError::TemplateRenderError(message) => FlowError::TemplateError {
                file: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect `variables { ... }` blocks from raw file content
///
/// Works on the unrendered text: the rest of the document may still hold
/// `{{ ... }}` placeholders that are not valid KDL yet. Later blocks win.
pub fn extract_variables(kdl_content: &str) -> Result<Variables> {
    use regex::Regex;

    let re = Regex::new(r"(?m)^\s*variables\s*\{")
        .map_err(|e| FlowError::InvalidConfig(format!("invalid pattern: {}", e)))?;

    let mut vars = HashMap::new();
    for mat in re.find_iter(kdl_content) {
        let Some(end) = find_matching_brace(kdl_content, mat.end() - 1) else {
            return Err(FlowError::InvalidConfig(
                "variables block is not closed".to_string(),
            ));
        };

        let block = format!("extracted {{\n{}\n}}", &kdl_content[mat.end()..end]);
        let doc: kdl::KdlDocument = block.parse().map_err(|e| {
            FlowError::InvalidConfig(format!("KDL parse error in variables block: {}", e))
        })?;

        if let Some(children) = doc.nodes().first().and_then(|n| n.children()) {
            for node in children.nodes() {
                if let Some(entry) = node.entries().first() {
                    vars.insert(
                        node.name().value().to_string(),
                        kdl_value_to_json(entry.value())?,
                    );
                }
            }
        }
    }

    Ok(vars)
}

/// Position of the brace closing the one at `open_pos`
fn find_matching_brace(content: &str, open_pos: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    if open_pos >= bytes.len() || bytes[open_pos] != b'{' {
        return None;
    }

    let mut depth = 1;
    let mut pos = open_pos + 1;
    let mut in_string = false;
    let mut escape_next = false;

    while pos < bytes.len() && depth > 0 {
        let c = bytes[pos];

        if escape_next {
            escape_next = false;
        } else if c == b'\\' {
            escape_next = true;
        } else if c == b'"' {
            in_string = !in_string;
        } else if !in_string {
            if c == b'{' {
                depth += 1;
            } else if c == b'}' {
                depth -= 1;
            }
        }

        pos += 1;
    }

    if depth == 0 { Some(pos - 1) } else { None }
}

/// Flatten a Tera error chain, naming the variable when one is undefined
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }
    let full_error = details.join(" | ");

    if full_error.contains("not found in context")
        && let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!(
            "undefined variable: `{}`\nhint: export TF_VAR_{} or give it a default in a \
             variables block (the environment wins over the file)",
            var_name, var_name
        );
    }

    full_error
}
