mod due;
mod due_type;
mod payment;

pub use due::*;
pub use due_type::*;
pub use payment::*;
