mod path;
pub use path::*;

mod container;
pub use container::*;

mod vfs;
pub use vfs::*;

mod error;
pub use error::*;
