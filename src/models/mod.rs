//! Data models for textplate.

mod template;

pub use template::{Template, validate_template_name};
