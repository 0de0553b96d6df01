/// A unit of blocking work handed to a [`Scheduler`](super::Scheduler).
///
/// Rollout workers are CPU bound and never yield, so tasks are plain
/// closures-by-value rather than futures.
pub trait Task: Send {
    type Output: Send + 'static;
    fn call(self) -> Self::Output;
}
