//! Lazy value resolution
//!
//! Raw values may point elsewhere through a prefix:
//!
//! | prefix      | meaning                                            |
//! |-------------|----------------------------------------------------|
//! | `key:X`     | the resolved value of key `X`                      |
//! | `template:T`| `T` expanded against the other values              |
//! | `env:X`     | environment variable `X`                           |
//! | `cmd:C`     | trimmed output of `sh -c C`                        |
//! | `file:P`    | contents of the file at path `P` (itself a template) |
//!
//! Resolution follows prefixes recursively. Every `key:` hop and every value a
//! template reads is tracked on a chain, and revisiting a key on the same
//! chain is rejected as a cycle.

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use tracing::debug;
use valet_core::values::{CMD_PREFIX, ENV_PREFIX, FILE_PREFIX, KEY_PREFIX, TEMPLATE_PREFIX};
use valet_core::{Command, CoreError, InputParams};

use crate::binding::{Bindings, Field};
use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// Resolves values and renders bound fields against one set of input params
#[derive(Debug)]
pub struct Resolver<'a> {
    params: &'a InputParams,
    engine: Engine,
}

impl<'a> Resolver<'a> {
    pub fn new(params: &'a InputParams) -> Self {
        Self {
            params,
            engine: Engine::new(),
        }
    }

    pub fn params(&self) -> &InputParams {
        self.params
    }

    /// True when `key` has a raw value, without resolving it
    pub fn contains_key(&self, key: &str) -> bool {
        self.params.values.contains_key(key)
    }

    /// Fully resolve the value stored under `key`
    pub async fn get_value(&self, key: &str) -> Result<String> {
        self.resolve_key(key, Vec::new()).await
    }

    /// Expand an arbitrary template against the current values
    pub async fn render_template(&self, template: &str) -> Result<String> {
        self.expand("template", template, Vec::new()).await
    }

    /// Expand a whole document, naming it in errors
    pub async fn render_document(&self, name: &str, source: &str) -> Result<String> {
        self.expand(name, source, Vec::new()).await
    }

    /// Fill every bound field of `target`, then of its nested children
    ///
    /// Per field: a literal already set wins, else the declared key when it
    /// is present, else the declared default. A field marked as a template is
    /// then expanded if non-empty.
    pub fn render_fields<'s>(&'s self, target: &'s mut dyn Bindings) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            for field in target.fields() {
                self.render_field(field).await?;
            }
            for child in target.nested() {
                self.render_fields(child).await?;
            }
            Ok(())
        })
    }

    async fn render_field(&self, field: Field<'_>) -> Result<()> {
        if field.value.is_empty() {
            match (field.key, field.default) {
                (Some(key), _) if self.contains_key(key) => {
                    *field.value = self.get_value(key).await?;
                }
                (_, Some(default)) => *field.value = default.to_string(),
                _ => {}
            }
        }

        if field.template && !field.value.is_empty() {
            let expanded = self.expand(field.name, field.value.as_str(), Vec::new()).await?;
            *field.value = expanded;
        }
        Ok(())
    }

    fn resolve_key<'s>(&'s self, key: &'s str, mut chain: Vec<String>) -> BoxFuture<'s, Result<String>> {
        Box::pin(async move {
            chain.push(key.to_string());
            if chain[..chain.len() - 1].iter().any(|k| k == key) {
                return Err(EngineError::CyclicValue { chain });
            }

            let raw = self
                .params
                .values
                .get_raw(key)
                .ok_or_else(|| CoreError::ValueNotFound {
                    key: key.to_string(),
                })?;

            self.resolve_raw(key, raw, chain).await
        })
    }

    async fn resolve_raw(&self, key: &str, raw: &str, chain: Vec<String>) -> Result<String> {
        if let Some(target) = raw.strip_prefix(KEY_PREFIX) {
            debug!(key, target, "resolving key alias");
            return self.resolve_key(target, chain).await;
        }

        if let Some(template) = raw.strip_prefix(TEMPLATE_PREFIX) {
            return self.expand(key, template, chain).await;
        }

        if let Some(name) = raw.strip_prefix(ENV_PREFIX) {
            return std::env::var(name).map_err(|_| {
                CoreError::EnvNotSet {
                    name: name.to_string(),
                }
                .into()
            });
        }

        if let Some(script) = raw.strip_prefix(CMD_PREFIX) {
            debug!(key, "resolving value from command");
            let output = self.params.output(&Command::shell(script)).await?;
            return Ok(output.trim().to_string());
        }

        if let Some(path) = raw.strip_prefix(FILE_PREFIX) {
            let path = self.expand(key, path, chain).await?;
            debug!(key, path = %path, "resolving value from file");
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(CoreError::from)?;
            return Ok(content);
        }

        Ok(raw.to_string())
    }

    /// Expand `template`, resolving only the values it reads
    ///
    /// Names that are not values are left out of the context so strict
    /// rendering reports them.
    async fn expand(&self, name: &str, template: &str, chain: Vec<String>) -> Result<String> {
        let mut context = BTreeMap::new();
        for var in self.engine.referenced_variables(name, template)? {
            if self.contains_key(&var) {
                let value = self.resolve_key(&var, chain.clone()).await?;
                context.insert(var, value);
            }
        }
        self.engine.render_str(name, template, &context)
    }
}
