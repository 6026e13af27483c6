//! sqldump templates - named SQL templates resolved against a dump context
//!
//! Templates are plain SQL/DDL text containing placeholders of the form
//! `%(dotted.key)`. Rendering walks the dotted path through a [`Lookup`]
//! (usually the session-wide [`Context`]) and splices in the scalar found
//! there. A path that misses, or that lands on a nested map, renders as the
//! empty string and is reported back in [`Rendered::unresolved`].
//!
//! ## Example
//!
//! ```rust
//! use sqldump_templates::{Context, TemplateSet};
//!
//! let mut templates = TemplateSet::new();
//! templates.register("drop", "DROP TABLE IF EXISTS `%(table.name)`;\n\n");
//!
//! let mut ctx = Context::new();
//! ctx.replace("table", &serde_json::json!({ "name": "users" })).unwrap();
//!
//! let sql = templates.resolve("drop", &ctx).unwrap();
//! assert_eq!(sql, "DROP TABLE IF EXISTS `users`;");
//! ```

mod context;
mod engine;

pub use context::{Context, Lookup};
pub use engine::{Rendered, TemplateError, TemplateSet, substitute};
