//! Request handlers for the subscribe endpoint.

pub mod subscribe;
pub mod writer;

pub use subscribe::{handle_subscribe, method_not_allowed};
pub use writer::{write_batch, WriteStage};
