pub mod donor;
pub mod enums;
pub mod medical_event;

pub use donor::*;
pub use enums::*;
pub use medical_event::*;
