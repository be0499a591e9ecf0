//! Template renderer implementation.
//!
//! Supports:
//! - Variable substitution (`{{name}}`, `{{object.field}}`), HTML-escaped
//! - Iteration (`{{#each collection}}...{{/each}}`) with `{{item.field}}` references
//! - Conditional sections (`{{#if name}}...{{/if}}`)
//!
//! Substitution is a single pass over the template, so values are never
//! re-scanned for placeholders.

use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::rendering::templates;
use crate::{Error, Result};

/// Regex pattern for iteration blocks: `{{#each collection}}...{{/each}}`
static EACH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{#each\s+(\w+)\}\}([\s\S]*?)\{\{/each\}\}").unwrap_or_else(|_| unreachable!())
});

/// Regex pattern for conditional blocks: `{{#if name}}...{{/if}}`
static IF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{#if\s+(\w+)\}\}([\s\S]*?)\{\{/if\}\}").unwrap_or_else(|_| unreachable!())
});

/// Regex pattern for `{{name}}` and `{{prefix.field}}` references.
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(\w+)(?:\.(\w+))?\s*\}\}").unwrap_or_else(|_| unreachable!())
});

/// Fields of one iteration item or object.
pub type Fields = HashMap<String, String>;

/// A value that can be rendered in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderValue {
    /// Text, escaped on output.
    String(String),
    /// Markup rendered by this crate, inserted as-is.
    Html(String),
    /// A list of items for iteration.
    List(Vec<Fields>),
    /// A flat object addressed as `{{name.field}}`.
    Object(Fields),
}

impl RenderValue {
    /// Returns the value as a string, or None if not a string.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a list, or None if not a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Fields]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Empty strings, lists and objects are false.
    fn is_truthy(&self) -> bool {
        match self {
            Self::String(s) | Self::Html(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Object(o) => !o.is_empty(),
        }
    }
}

impl From<String> for RenderValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RenderValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Vec<Fields>> for RenderValue {
    fn from(l: Vec<Fields>) -> Self {
        Self::List(l)
    }
}

/// Context for rendering a template.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: HashMap<String, RenderValue>,
}

impl RenderContext {
    /// Creates a new empty render context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a string value to the context.
    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), RenderValue::String(value.into()));
    }

    /// Adds a list value to the context for iteration.
    pub fn add_list(&mut self, name: impl Into<String>, items: Vec<Fields>) {
        self.values.insert(name.into(), RenderValue::List(items));
    }

    /// Adds an object value to the context.
    pub fn add_object(&mut self, name: impl Into<String>, fields: Fields) {
        self.values.insert(name.into(), RenderValue::Object(fields));
    }

    /// Adds a render value to the context.
    pub fn add_value(&mut self, name: impl Into<String>, value: RenderValue) {
        self.values.insert(name.into(), value);
    }

    /// Gets a value from the context.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RenderValue> {
        self.values.get(name)
    }

    /// Gets a string value from the context.
    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(RenderValue::as_string)
    }

    /// Gets a list value from the context.
    #[must_use]
    pub fn get_list(&self, name: &str) -> Option<&[Fields]> {
        self.values.get(name).and_then(RenderValue::as_list)
    }

    /// Checks if the context contains a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of values in the context.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn is_truthy(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(RenderValue::is_truthy)
    }

    /// Looks up `{{name}}` or `{{name.field}}` and returns escaped output.
    fn lookup(&self, name: &str, field: Option<&str>) -> String {
        match (self.values.get(name), field) {
            (Some(RenderValue::String(s)), None) => escape_html(s),
            (Some(RenderValue::Html(s)), None) => s.clone(),
            (Some(RenderValue::Object(o)), Some(field)) => {
                o.get(field).map(|v| escape_html(v)).unwrap_or_default()
            },
            _ => String::new(),
        }
    }
}

/// Template rendering engine over the built-in page templates.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Creates a renderer with the built-in templates loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: templates::BUILTIN.iter().copied().collect(),
        }
    }

    /// Returns true if a template with this name is registered.
    #[must_use]
    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Renders a named template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or an iteration block
    /// names a collection that is not a list.
    pub fn render(&self, name: &str, ctx: &RenderContext) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("template '{name}'")))?;
        self.render_str(template, ctx)
    }

    /// Renders a named page template inside the `base` layout.
    ///
    /// The page output is exposed to the layout as `{{content}}`.
    ///
    /// # Errors
    ///
    /// See [`Self::render`].
    pub fn render_page(&self, name: &str, ctx: &RenderContext) -> Result<String> {
        let content = self.render(name, ctx)?;
        let mut layout_ctx = ctx.clone();
        layout_ctx.add_value(templates::CONTENT, RenderValue::Html(content));
        self.render(templates::BASE, &layout_ctx)
    }

    /// Renders template source text.
    ///
    /// # Errors
    ///
    /// Returns an error if an iteration collection is missing or not a list.
    pub fn render_str(&self, template: &str, ctx: &RenderContext) -> Result<String> {
        let processed = process_conditionals(template, ctx);
        let mut output = String::with_capacity(processed.len());
        let mut last = 0;

        for captures in EACH_PATTERN.captures_iter(&processed) {
            let (Some(full), Some(name), Some(body)) =
                (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            output.push_str(&substitute(&processed[last..full.start()], ctx, None));

            let collection_name = name.as_str();
            let items = ctx.get_list(collection_name).ok_or_else(|| {
                Error::operation(
                    "render_template",
                    format!("iteration collection '{collection_name}' not found or not a list"),
                )
            })?;

            let item_prefix = get_item_prefix(collection_name);
            for item in items {
                output.push_str(&substitute(body.as_str(), ctx, Some((item_prefix.as_str(), item))));
            }
            last = full.end();
        }

        output.push_str(&substitute(&processed[last..], ctx, None));
        Ok(output)
    }
}

/// Keeps or drops `{{#if}}` sections. Sections do not nest.
fn process_conditionals(input: &str, ctx: &RenderContext) -> String {
    IF_PATTERN
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            if ctx.is_truthy(name) {
                caps.get(2).map_or("", |m| m.as_str()).to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Replaces every placeholder in `text`. Unknown names render empty.
fn substitute(text: &str, ctx: &RenderContext, item: Option<(&str, &Fields)>) -> String {
    VAR_PATTERN
        .replace_all(text, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let field = caps.get(2).map(|m| m.as_str());

            match (item, field) {
                (Some((prefix, fields)), Some(field)) if name == prefix || name == "this" => {
                    fields.get(field).map(|v| escape_html(v)).unwrap_or_default()
                },
                _ => ctx.lookup(name, field),
            }
        })
        .into_owned()
}

/// Flattens a serializable record into template fields.
///
/// Strings are taken as-is, other scalars use their JSON form and nulls
/// become empty. Non-object values yield no fields.
#[must_use]
pub fn to_fields<T: Serialize>(record: &T) -> Fields {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect(),
        _ => Fields::new(),
    }
}

/// Gets the item prefix for iteration (singular form of collection name).
fn get_item_prefix(collection_name: &str) -> String {
    if let Some(stripped) = collection_name.strip_suffix("ies") {
        // e.g., "entries" -> "entry"
        return format!("{stripped}y");
    }
    if let Some(stripped) = collection_name.strip_suffix('s') {
        // e.g., "cars" -> "car"
        return stripped.to_string();
    }
    collection_name.to_string()
}

/// Escapes special HTML characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_render_context_add_and_get() {
        let mut ctx = RenderContext::new();
        ctx.add_string("name", "Alice");
        ctx.add_string("count", "42");

        assert_eq!(ctx.get_string("name"), Some("Alice"));
        assert_eq!(ctx.get_string("count"), Some("42"));
        assert!(ctx.contains("name"));
        assert_eq!(ctx.len(), 2);
        assert!(ctx.get_list("name").is_none());
    }

    #[test]
    fn test_simple_variable_substitution() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_string("name", "World");

        let result = renderer.render_str("Hello {{name}}!", &ctx).unwrap();
        assert_eq!(result, "Hello World!");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let renderer = TemplateRenderer::new();
        let result = renderer
            .render_str("[{{missing}}][{{missing.field}}]", &RenderContext::new())
            .unwrap();
        assert_eq!(result, "[][]");
    }

    #[test]
    fn test_values_are_escaped() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_string("q", "<script>\"x\" & 'y'</script>");

        let result = renderer.render_str("{{q}}", &ctx).unwrap();
        assert_eq!(
            result,
            "&lt;script&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_string("q", "{{secret}}");
        ctx.add_string("secret", "leaked");
        ctx.add_list("cars", vec![fields(&[("model", "{{secret}}")])]);

        let result = renderer
            .render_str("{{q}}|{{#each cars}}{{car.model}}{{/each}}", &ctx)
            .unwrap();
        assert_eq!(result, "{{secret}}|{{secret}}");
    }

    #[test]
    fn test_iteration_with_multiple_fields() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_string("title", "Cars");
        ctx.add_list(
            "cars",
            vec![
                fields(&[("model", "Civic"), ("maker", "Honda")]),
                fields(&[("model", "Golf"), ("maker", "VW")]),
            ],
        );

        let result = renderer
            .render_str(
                "{{title}}:{{#each cars}} {{car.model}}/{{this.maker}}{{/each}}",
                &ctx,
            )
            .unwrap();
        assert_eq!(result, "Cars: Civic/Honda Golf/VW");
    }

    #[test]
    fn test_multiple_iteration_blocks() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_list("cars", vec![fields(&[("model", "A")])]);
        ctx.add_list("drivers", vec![fields(&[("username", "b")])]);

        let result = renderer
            .render_str(
                "{{#each cars}}{{car.model}}{{/each}}-{{#each drivers}}{{driver.username}}{{/each}}",
                &ctx,
            )
            .unwrap();
        assert_eq!(result, "A-b");
    }

    #[test]
    fn test_iteration_empty_collection() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_list("items", vec![]);

        let result = renderer
            .render_str("<ul>{{#each items}}<li>{{item.v}}</li>{{/each}}</ul>", &ctx)
            .unwrap();
        assert_eq!(result, "<ul></ul>");
    }

    #[test]
    fn test_iteration_missing_collection() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render_str(
            "{{#each missing}}{{item.value}}{{/each}}",
            &RenderContext::new(),
        );
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_conditionals() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_string("shown", "yes");
        ctx.add_string("empty", "");

        let result = renderer
            .render_str("{{#if shown}}A{{/if}}{{#if empty}}B{{/if}}{{#if missing}}C{{/if}}", &ctx)
            .unwrap();
        assert_eq!(result, "A");
    }

    #[test]
    fn test_object_fields() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_object("user", fields(&[("username", "anna")]));

        let result = renderer.render_str("Hi {{user.username}}", &ctx).unwrap();
        assert_eq!(result, "Hi anna");
    }

    #[test]
    fn test_render_page_wraps_in_layout() {
        let renderer = TemplateRenderer::new();
        let mut ctx = RenderContext::new();
        ctx.add_string("num_visits", "1");
        ctx.add_string("num_visits_suffix", "");

        let html = renderer.render_page(templates::INDEX, &ctx).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Taxi Service Home"));
        assert!(html.contains("You have visited this page 1 time."));
    }

    #[test]
    fn test_unknown_template() {
        let renderer = TemplateRenderer::new();
        assert!(matches!(
            renderer.render("nope", &RenderContext::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_builtin_templates_registered() {
        let renderer = TemplateRenderer::new();
        for (name, _) in templates::BUILTIN {
            assert!(renderer.has_template(name));
        }
    }

    #[test]
    fn test_to_fields() {
        #[derive(Serialize)]
        struct Row {
            id: i64,
            name: &'static str,
            note: Option<&'static str>,
        }

        let fields = to_fields(&Row {
            id: 7,
            name: "Audi",
            note: None,
        });
        assert_eq!(fields.get("id").map(String::as_str), Some("7"));
        assert_eq!(fields.get("name").map(String::as_str), Some("Audi"));
        assert_eq!(fields.get("note").map(String::as_str), Some(""));
        assert!(to_fields(&42).is_empty());
    }

    #[test]
    fn test_get_item_prefix() {
        assert_eq!(get_item_prefix("cars"), "car");
        assert_eq!(get_item_prefix("entries"), "entry");
        assert_eq!(get_item_prefix("data"), "data");
    }
}
