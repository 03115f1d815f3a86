pub mod actions;
pub mod blend;
pub mod change_info;
pub mod changes;
pub mod chunky;
pub mod color;
pub mod id;
pub mod renderer;
pub mod settings;
pub mod state;
pub mod tracker;
pub mod undo_store;
pub mod util;

pub use actions::Action;
pub use change_info::ChangeInfo;
pub use tracker::{worker::DocumentWorker, BatchOutcome, DocumentChangeTracker};
