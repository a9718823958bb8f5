// LogSections - core/mod.rs
//
// Core logic layer: line classification, section building, sealing,
// series extraction, export.
// Must NOT depend on: platform, app, or the filesystem directly.

pub mod builder;
pub mod classifier;
pub mod export;
pub mod lines;
pub mod model;
pub mod parser;
pub mod series;
