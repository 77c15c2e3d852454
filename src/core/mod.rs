pub mod engine;
pub mod events;
pub mod filename;
pub mod model;
pub mod sink;
pub mod state;
