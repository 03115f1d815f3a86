//! Global singletons.

pub mod settings;
