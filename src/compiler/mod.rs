//! Build-graph bookkeeping shared by the template task and the watcher.

pub mod dependency;

pub use dependency::DependencyGraph;
