pub mod entities;
pub mod extensions;
pub mod messaging;
pub mod platform;
pub mod repositories;
pub mod time;

pub use entities::*;
pub use extensions::*;
pub use messaging::*;
pub use platform::*;
pub use repositories::*;
pub use shift_core::{ShiftError, ShiftResult};
