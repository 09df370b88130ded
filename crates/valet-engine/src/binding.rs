//! Field binding descriptors
//!
//! A configurable type lists its string fields as [`Field`]s: where the value
//! may come from when the document leaves it empty, and whether the final
//! value is itself a template. [`Resolver::render_fields`] interprets them.
//!
//! [`Resolver::render_fields`]: crate::Resolver::render_fields

/// One bindable string field
#[derive(Debug)]
pub struct Field<'a> {
    pub name: &'a str,
    pub value: &'a mut String,
    pub key: Option<&'a str>,
    pub default: Option<&'a str>,
    pub template: bool,
}

impl<'a> Field<'a> {
    pub fn new(name: &'a str, value: &'a mut String) -> Self {
        Self {
            name,
            value,
            key: None,
            default: None,
            template: false,
        }
    }

    /// Value key consulted when the field is empty
    pub fn key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Fallback when neither a literal nor the key provides a value
    pub fn default(mut self, default: &'a str) -> Self {
        self.default = Some(default);
        self
    }

    /// Expand the final non-empty value as a template
    pub fn template(mut self) -> Self {
        self.template = true;
        self
    }
}

/// Types whose fields are filled from values before use
pub trait Bindings: Send {
    fn fields(&mut self) -> Vec<Field<'_>>;

    /// Nested bindable children (present optional sections included)
    fn nested(&mut self) -> Vec<&mut dyn Bindings> {
        Vec::new()
    }
}

/// Template-expand every entry of a string map
pub fn template_map(
    map: &mut std::collections::BTreeMap<String, String>,
) -> impl Iterator<Item = Field<'_>> {
    map.iter_mut()
        .map(|(name, value)| Field::new(name.as_str(), value).template())
}
