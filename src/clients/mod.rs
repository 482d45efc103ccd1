pub mod execution_client;

pub use execution_client::{CodeExecutor, ExecutionError, JdoodleClient};
