//! Backend module - model registry, synchronous generators, and the edit job runner

pub mod edit;
pub mod generate;
pub mod invoke;
pub mod model;

pub use edit::{EditClient, EditOutcome, EditRequest};
pub use generate::ImageGenerator;
pub use invoke::ModelInvoker;
pub use model::{truncate_prompt, ModelKind, EDIT_MODEL};
