mod eventual;
mod path;
mod value;

pub use eventual::Eventual;
pub use path::{IndexKey, Path, PathPrefixSet, PathStep};
pub use value::Value;
