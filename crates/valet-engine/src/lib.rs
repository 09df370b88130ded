//! Valet Engine - value resolution and templating
//!
//! This crate turns raw values into concrete strings:
//! - `Engine`: MiniJinja in strict mode, so a missing placeholder is an error
//! - `Resolver`: lazy, cycle-checked resolution of `key:`, `template:`, `env:`,
//!   `cmd:` and `file:` values
//! - `Bindings`: per-type field descriptors filled by `Resolver::render_fields`

pub mod binding;
pub mod engine;
pub mod error;
pub mod filters;
pub mod resolver;

pub use binding::{Bindings, Field, template_map};
pub use engine::Engine;
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use resolver::Resolver;
