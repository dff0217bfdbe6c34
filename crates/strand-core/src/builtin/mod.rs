//! Components shipped with the crate

mod manager;
mod named;

pub use manager::{ComponentTemplate, EntityManager};
pub use named::Named;
