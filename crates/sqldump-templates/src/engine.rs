//! Template registry and `%(dotted.key)` substitution

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

use crate::Lookup;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([^)]*)\)").expect("placeholder pattern is valid"));

/// Errors raised while rendering a template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template not registered: {0}")]
    NotRegistered(String),
}

/// Output of a render, with the placeholder paths that resolved to nothing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub text: String,
    pub unresolved: Vec<String>,
}

impl Rendered {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Substitute every `%(path)` in `body` in a single pass.
///
/// Replacement text is inserted verbatim, so a value that itself contains
/// placeholder syntax is never expanded again.
pub fn substitute(body: &str, lookup: &dyn Lookup) -> Rendered {
    let mut unresolved = Vec::new();
    let text = PLACEHOLDER
        .replace_all(body, |caps: &Captures<'_>| {
            let path = &caps[1];
            match lookup.lookup(path) {
                Some(value) => value.into_owned(),
                None => {
                    unresolved.push(path.to_string());
                    String::new()
                }
            }
        })
        .into_owned();
    Rendered { text, unresolved }
}

/// Immutable set of named templates, registered once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, String>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Trailing blank lines are stripped.
    pub fn register(&mut self, name: impl Into<String>, body: &str) {
        self.templates.insert(name.into(), strip_trailing_blank_lines(body));
    }

    /// Builder-style `register`
    pub fn with_template(mut self, name: impl Into<String>, body: &str) -> Self {
        self.register(name, body);
        self
    }

    /// Unregister a template, returning its body
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.templates.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Raw body of a registered template
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render a template, reporting unregistered names and unresolved paths.
    pub fn render(&self, name: &str, lookup: &dyn Lookup) -> Result<Rendered, TemplateError> {
        let body = self
            .get(name)
            .ok_or_else(|| TemplateError::NotRegistered(name.to_string()))?;
        let rendered = substitute(body, lookup);
        if !rendered.is_complete() {
            tracing::debug!(template = name, missing = ?rendered.unresolved, "placeholders resolved to empty");
        }
        Ok(rendered)
    }

    /// Render a template, returning `None` if it is not registered.
    pub fn resolve(&self, name: &str, lookup: &dyn Lookup) -> Option<String> {
        self.render(name, lookup).ok().map(|r| r.text)
    }
}

fn strip_trailing_blank_lines(body: &str) -> String {
    let mut lines: Vec<&str> = body.lines().collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
