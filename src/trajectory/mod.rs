mod errors;
mod record;
mod types;

pub use errors::TrajectoryError;
pub use record::TrajectoryRecord;
pub use types::{ActionClip, Path};
