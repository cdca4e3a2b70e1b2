//! Page transforms used by the template task.
//!
//! - [`template`]: include/variable template compiler
//! - [`vars`]: per-page builder variables
//! - [`size`]: image dimension helper
//! - [`html`]: output tidying

pub mod html;
pub mod size;
pub mod template;
pub mod vars;

pub use html::format_html;
pub use template::{CompiledTemplate, compile_file};
pub use vars::BuilderVars;
