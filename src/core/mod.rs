//! Core types shared across the codebase: categories, artifact rules,
//! resolved paths and the per-session build context.

mod artifact;
mod category;
mod context;
mod driver;
mod paths;
mod state;

pub use artifact::{artifact_path, has_source_map, source_map_path, sprite_path};
pub use category::{ICONS_DIR, SourceKind, is_declaration, is_icon_source, is_partial};
pub use context::BuildContext;
pub use driver::BuildMode;
pub use paths::Paths;
pub use state::{Shutdown, setup_shutdown_handler};
