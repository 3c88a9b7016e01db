pub mod debugging;
pub mod utils;

pub use utils::ShortTypeName;
