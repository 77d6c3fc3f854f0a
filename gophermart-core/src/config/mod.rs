//! Runtime configuration shared between the core engine and the server.
//!
//! Loading and merging (file, env, flags) happens in the server crate; these
//! are the validated values handed to the engine.

mod engine;

pub use engine::EngineConfig;
