//! HTML rendering.
//!
//! Pages are built-in templates rendered with variable substitution,
//! iteration and conditional sections, then wrapped in the `base` layout.

mod template_renderer;
pub mod templates;

pub use template_renderer::{
    Fields, RenderContext, RenderValue, TemplateRenderer, escape_html, to_fields,
};
