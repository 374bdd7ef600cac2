//! Repository layer — stateless structs, every method takes `&Connection`.

pub mod batch;
pub mod orchestration;
pub mod tool;

pub use batch::{BatchMember, BatchRepo};
pub use orchestration::OrchestrationRepo;
pub use tool::ToolRepo;
