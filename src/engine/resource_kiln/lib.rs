mod error;
pub use error::*;

mod resource;
pub use resource::*;

mod peer;
pub use peer::*;

mod module;
pub use module::*;

mod cache;

mod tracker;

mod manager;
pub use manager::*;

mod loader;
pub use loader::*;

mod kinds;
pub use kinds::*;

mod engine;
pub use engine::*;

#[cfg(test)]
pub(crate) mod test_support;
