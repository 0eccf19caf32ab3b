pub mod errors;
pub mod objective;
pub mod spoint;
pub mod value;

pub use errors::*;
pub use objective::*;
pub use spoint::*;
pub use value::*;
