// LogSections - app/mod.rs
//
// Application layer: ties platform inputs to the core parser.
// Dependencies: core, platform, util.

pub mod pipeline;
