//! Strict template engine based on MiniJinja

use minijinja::{Environment, UndefinedBehavior};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, TemplateError};
use crate::filters;

/// Filters registered on every engine, for diagnostics
pub const FILTERS: &[&str] = &[
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "indent",
    "nindent",
    "trimprefix",
    "trimsuffix",
    "required",
];

/// Template engine over flat string contexts
///
/// Undefined placeholders are always an error: a missing value must never
/// render as an empty string into a manifest.
pub struct Engine {
    env: Environment<'static>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("indent", filters::indent);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);
        env.add_filter("required", filters::required);

        Self { env }
    }

    /// Top-level names a template reads
    ///
    /// Names the template assigns itself are not included.
    pub fn referenced_variables(&self, name: &str, template: &str) -> Result<BTreeSet<String>> {
        let tmpl = self
            .env
            .template_from_named_str(name, template)
            .map_err(|e| TemplateError::from_minijinja(e, name, template))?;
        Ok(tmpl.undeclared_variables(false).into_iter().collect())
    }

    /// Render `template` against `context`
    pub fn render_str(
        &self,
        name: &str,
        template: &str,
        context: &BTreeMap<String, String>,
    ) -> Result<String> {
        let tmpl = self
            .env
            .template_from_named_str(name, template)
            .map_err(|e| TemplateError::from_minijinja(e, name, template))?;

        tmpl.render(context)
            .map_err(|e| TemplateError::from_minijinja(e, name, template).into())
    }
}
