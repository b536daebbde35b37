use std::sync::mpsc::Sender;

use eyre::{eyre, Result, WrapErr};
use tracing::error;

use crate::actor::Actor;

/// A queued closure, run on the actor thread with exclusive access to the actor.
// Excuse me clippy, that's exactly why the struct exists.
#[allow(clippy::type_complexity)]
struct Action<A>(Box<dyn FnOnce(&mut A) -> Result<()> + Send + 'static>);

/// A handle to an actor. It can be used to send actions to the actor and to ask it for values.
///
/// The actor thread stops on its own once every handle to it has been dropped.
#[derive(Debug)]
pub struct Handle<A>
where
    A: Actor + Send + 'static,
{
    sender: Sender<Action<A>>,
}

// Manual Clone implementation because A does not need to be Clone for Handle<A> to be Clone.
impl<A> Clone for Handle<A>
where
    A: Actor + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A> Handle<A>
where
    A: Actor + Send + 'static,
{
    /// Turns almost any Send self-mutating type into an actor running on its own thread.
    pub fn spawn(mut actor: A) -> Result<Self> {
        let (sender, receiver) = std::sync::mpsc::channel::<Action<A>>();
        // The thread is detached, it exits when the channel closes.
        let _ = std::thread::Builder::new()
            .name(actor.name())
            .spawn(move || {
                while let Ok(Action(action)) = receiver.recv() {
                    if let Err(e) = action(&mut actor) {
                        error!("Unhandled error in actor thread: {:?}", e);
                        break;
                    }
                }
            })
            .wrap_err("Failed to spawn actor thread")?;
        Ok(Self { sender })
    }

    /// Enqueue an action to be run by the actor thread.
    /// The action will not be able to return any values, and will be run in the background.
    /// An action returning an error stops the actor.
    pub fn act(&self, f: impl FnOnce(&mut A) -> Result<()> + Send + 'static) -> Result<()> {
        self.sender
            .send(Action(Box::new(f)))
            .map_err(|_| eyre!("Failed to send action to actor"))
    }

    /// Run a closure on the actor thread and block until it hands back its result.
    ///
    /// Actions are processed in the order they were queued, so the closure observes every
    /// action enqueued before it and none of those enqueued after it.
    pub fn ask<T>(&self, f: impl FnOnce(&mut A) -> T + Send + 'static) -> Result<T>
    where
        T: Send + 'static,
    {
        let (reply, response) = std::sync::mpsc::sync_channel(1);
        self.act(move |actor| {
            // The asker may have given up waiting, that is not the actor's problem.
            let _ = reply.send(f(actor));
            Ok(())
        })?;
        response
            .recv()
            .map_err(|_| eyre!("Actor stopped before replying"))
    }
}
