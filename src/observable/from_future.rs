use std::{
  cell::{Cell, RefCell},
  future::Future,
  pin::Pin,
  rc::Rc,
  task::{Context, Poll},
};

use futures::{
  future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture, Shared},
  ready,
  task::{LocalSpawn, LocalSpawnExt},
};
use pin_project_lite::pin_project;
use tracing::{debug, trace};

use super::Observable;
use crate::{
  disposable::Disposable,
  error::Error,
  observer::{BoxedObserver, Observer, SharedObserver},
};

/// The shared form a bridged future is kept in, so every subscription can
/// wait on the same outcome.
pub type SharedFuture<T> = Shared<LocalBoxFuture<'static, Result<T, Error>>>;

/// A single-value future paired with the executor that drives it.
///
/// Used directly by [`from_future`] and as the `Future` variant of a
/// resumption [`Source`](super::Source). Clones share the same future.
///
/// Disposing the last active subscription before the outcome is known
/// cancels the future: the source lets go of it, so it is dropped as soon as
/// the aborted completion task is. Subscribing afterwards yields
/// [`Error::Cancelled`].
pub struct FutureSource<T> {
  slot: Rc<FutureSlot<T>>,
  spawner: Rc<dyn LocalSpawn>,
}

struct FutureSlot<T> {
  future: RefCell<Option<SharedFuture<T>>>,
  active: Cell<usize>,
}

impl<T> Clone for FutureSource<T> {
  fn clone(&self) -> Self {
    FutureSource {
      slot: self.slot.clone(),
      spawner: self.spawner.clone(),
    }
  }
}

impl<T: Clone + 'static> FutureSlot<T> {
  fn outcome(&self) -> Option<Result<T, Error>> {
    match self.future.borrow().as_ref() {
      Some(future) => future.peek().cloned(),
      None => Some(Err(Error::Cancelled)),
    }
  }

  fn release(&self) {
    let active = self.active.get().saturating_sub(1);
    self.active.set(active);
    if active == 0 && self.outcome().is_none() {
      debug!("last subscription disposed, cancelling future");
      let cancelled = self.future.borrow_mut().take();
      drop(cancelled);
    }
  }
}

impl<T: Clone + 'static> FutureSource<T> {
  pub fn new<F, E, S>(future: F, spawner: S) -> Self
  where
    F: Future<Output = Result<T, E>> + 'static,
    E: Into<Error>,
    S: LocalSpawn + 'static,
  {
    let future = future.map(|res| res.map_err(Into::into)).boxed_local().shared();
    FutureSource {
      slot: Rc::new(FutureSlot {
        future: RefCell::new(Some(future)),
        active: Cell::new(0),
      }),
      spawner: Rc::new(spawner),
    }
  }

  /// Whether the outcome is already known, including cancellation.
  /// Subscribing to a terminated source delivers the outcome inline.
  pub fn is_terminated(&self) -> bool { self.slot.outcome().is_some() }

  pub fn into_observable(self) -> Observable<T> { Observable::new(move |observer, _| self.subscribe(observer)) }

  fn subscribe(&self, observer: BoxedObserver<T>) -> Disposable {
    let pending = self.slot.future.borrow().clone();
    let future = match pending {
      Some(future) if future.peek().is_none() => future,
      _ => {
        trace!("future already terminated, delivering inline");
        if let Some(outcome) = self.slot.outcome() {
          deliver(observer, outcome);
        }
        return Disposable::disposed();
      }
    };

    let (abort, registration) = AbortHandle::new_pair();
    let observer = SharedObserver::new(observer);
    let completion = Completion {
      future: Abortable::new(future, registration),
      observer: Some(observer.clone()),
    };
    if let Err(err) = self.spawner.spawn_local(completion) {
      debug!(%err, "could not spawn future completion");
      observer.error(Error::new(err));
      return Disposable::disposed();
    }
    self.slot.active.set(self.slot.active.get() + 1);
    let slot = self.slot.clone();
    Disposable::new(move || {
      abort.abort();
      observer.close();
      slot.release();
    })
  }
}

fn deliver<T, O: Observer<T>>(mut observer: O, outcome: Result<T, Error>) {
  match outcome {
    Ok(value) => {
      observer.next(value);
      observer.complete();
    }
    Err(err) => observer.error(err),
  }
}

pin_project! {
  /// Waits for the shared future and hands its outcome to one observer.
  struct Completion<T> {
    #[pin]
    future: Abortable<SharedFuture<T>>,
    observer: Option<SharedObserver<BoxedObserver<T>>>,
  }
}

impl<T: Clone> Future for Completion<T> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let this = self.project();
    match ready!(this.future.poll(cx)) {
      Ok(outcome) => {
        if let Some(observer) = this.observer.take() {
          deliver(observer, outcome);
        }
      }
      Err(_) => debug!("future subscription aborted"),
    }
    Poll::Ready(())
  }
}

/// Converts a `Future` of `Result` into an observable sequence.
///
/// `Ok(v)` is emitted as `next(v)` followed by `complete()`, `Err(e)` as
/// `error(e)`. A future that is cancelled (for example a `oneshot::Receiver`
/// whose sender was dropped) is reported as [`Error::Cancelled`].
///
/// The future is shared between subscriptions and driven by `spawner`.
/// Disposing a subscription aborts its completion task, and disposing the
/// last one before the outcome is known cancels the future.
///
/// ```
/// use futures::{channel::oneshot, executor::LocalPool};
/// use rxresume::prelude::*;
///
/// let mut pool = LocalPool::new();
/// let (tx, rx) = oneshot::channel();
/// observable::from_future(rx, pool.spawner()).subscribe_fn(|v| assert_eq!(v, 1), |_| {}, || {});
/// tx.send(1).unwrap();
/// pool.run_until_stalled();
/// ```
pub fn from_future<T, F, E, S>(future: F, spawner: S) -> Observable<T>
where
  T: Clone + 'static,
  F: Future<Output = Result<T, E>> + 'static,
  E: Into<Error>,
  S: LocalSpawn + 'static,
{
  FutureSource::new(future, spawner).into_observable()
}

/// Spawns bridged futures with `tokio::task::spawn_local`.
///
/// Must be used from inside a `tokio::task::LocalSet`; spawning outside one
/// panics in tokio.
#[cfg(feature = "tokio-scheduler")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioLocalSpawner;

#[cfg(feature = "tokio-scheduler")]
impl LocalSpawn for TokioLocalSpawner {
  fn spawn_local_obj(
    &self, future: futures::task::LocalFutureObj<'static, ()>,
  ) -> Result<(), futures::task::SpawnError> {
    drop(tokio::task::spawn_local(future));
    Ok(())
  }
}
