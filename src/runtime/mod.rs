pub mod error;
pub mod handle;
pub mod scheduler;
pub mod task;

pub use error::Error;
pub use handle::TaskHandle;
pub use scheduler::{LocalScheduler, Scheduler};
pub use task::Task;
