pub mod diagnostics;
pub mod documents;
pub mod error;
pub mod events;
pub mod health;

pub use diagnostics::*;
pub use documents::*;
pub use error::*;
pub use events::*;
pub use health::*;
