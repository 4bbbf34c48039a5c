mod build;
mod conform;
mod introspect;
mod types;

pub use self::build::*;
pub use self::conform::*;
pub use self::introspect::*;
pub use self::types::*;
