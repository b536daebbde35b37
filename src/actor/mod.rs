//! A tiny thread-per-actor runtime. Each actor owns its state on a dedicated thread and
//! processes queued actions one at a time, so state is never shared between threads.

pub use handle::Handle;

mod handle;

/// Implemented by any state that should live on its own thread behind a [Handle].
///
/// The thread ends once every handle has been dropped, or when an action returns an error.
pub trait Actor: Sized + Send + 'static {
    /// Used as the name of the actor's thread.
    fn name(&self) -> String {
        "actor".to_string()
    }
}
