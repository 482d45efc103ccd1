pub mod diagnostics;
pub mod documents;
pub mod health;
pub mod permissions;
pub mod run_code;
pub mod session;

pub use diagnostics::*;
pub use documents::*;
pub use health::*;
pub use permissions::*;
pub use run_code::*;
pub use session::*;
