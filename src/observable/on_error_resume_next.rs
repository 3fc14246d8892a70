//! Sequential fallback over heterogeneous sources.
//!
//! The engine subscribes its sources one at a time. Whatever way the current
//! source terminates, the engine hops through the scheduler and subscribes the
//! next one, carrying the error (if any) into the next factory. The overall
//! sequence only ends once every source has been visited.

use std::{cell::Cell, future::Future, rc::Rc};

use futures::task::LocalSpawn;
use tracing::{debug, trace};

use super::{resolve_scheduler, FutureSource, Observable};
use crate::{
  disposable::{CompositeDisposable, SerialDisposable, SingleAssignmentDisposable},
  error::{self, Error},
  observer::{BoxedObserver, Observer, SharedObserver},
  scheduler::{SchedulerExt, SchedulerRef},
};

type ErrorFactory<T> = dyn Fn(Option<Error>) -> Result<Observable<T>, Error>;

// ============================================================================
// Source
// ============================================================================

/// One step of a resumption chain.
pub enum Source<T> {
  /// Subscribed as is.
  Observable(Observable<T>),
  /// Bridged through [`FutureSource::into_observable`].
  Future(FutureSource<T>),
  /// Called with the error that ended the previous source (`None` when it
  /// completed, or when this is the first source) to build the observable.
  Factory(Rc<ErrorFactory<T>>),
}

impl<T> Source<T> {
  pub fn factory<F>(factory: F) -> Self
  where
    F: Fn(Option<Error>) -> Observable<T> + 'static,
  {
    Source::Factory(Rc::new(move |err| Ok(factory(err))))
  }

  /// A factory that may fail. An `Err` counts as a failed source.
  pub fn try_factory<F>(factory: F) -> Self
  where
    F: Fn(Option<Error>) -> Result<Observable<T>, Error> + 'static,
  {
    Source::Factory(Rc::new(factory))
  }
}

impl<T: Clone + 'static> Source<T> {
  pub fn future<F, E, S>(future: F, spawner: S) -> Self
  where
    F: Future<Output = Result<T, E>> + 'static,
    E: Into<Error>,
    S: LocalSpawn + 'static,
  {
    Source::Future(FutureSource::new(future, spawner))
  }

  fn resolve(&self, carried: Option<Error>) -> Result<Observable<T>, Error> {
    match self {
      Source::Observable(observable) => Ok(observable.clone()),
      Source::Future(future) => Ok(future.clone().into_observable()),
      Source::Factory(factory) => error::catch_unwind(|| factory(carried)),
    }
  }
}

impl<T> Clone for Source<T> {
  fn clone(&self) -> Self {
    match self {
      Source::Observable(o) => Source::Observable(o.clone()),
      Source::Future(f) => Source::Future(f.clone()),
      Source::Factory(f) => Source::Factory(f.clone()),
    }
  }
}

impl<T> From<Observable<T>> for Source<T> {
  fn from(observable: Observable<T>) -> Self { Source::Observable(observable) }
}

impl<T> From<FutureSource<T>> for Source<T> {
  fn from(future: FutureSource<T>) -> Self { Source::Future(future) }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResumeState {
  AdvancingToNextSource,
  SubscribedToCurrentSource { index: usize },
  Exhausted,
}

/// How the previous step ended.
enum Resume {
  Completed,
  Errored(Error),
  FactoryFailed(Error),
}

impl Resume {
  fn into_error(self) -> Option<Error> {
    match self {
      Resume::Completed => None,
      Resume::Errored(err) | Resume::FactoryFailed(err) => Some(err),
    }
  }
}

struct ResumeNext<T> {
  sources: Rc<[Source<T>]>,
  cursor: Cell<usize>,
  state: Cell<ResumeState>,
  observer: SharedObserver<BoxedObserver<T>>,
  scheduler: SchedulerRef,
  /// Subscription of the current source.
  subscription: SerialDisposable,
  /// The pending advance step.
  cancelable: SerialDisposable,
}

impl<T: Clone + 'static> ResumeNext<T> {
  fn new(sources: Rc<[Source<T>]>, observer: BoxedObserver<T>, scheduler: SchedulerRef) -> Rc<Self> {
    Rc::new(ResumeNext {
      sources,
      cursor: Cell::new(0),
      state: Cell::new(ResumeState::AdvancingToNextSource),
      observer: SharedObserver::new(observer),
      scheduler,
      subscription: SerialDisposable::new(),
      cancelable: SerialDisposable::new(),
    })
  }

  fn transition(&self, next: ResumeState) {
    let prev = self.state.replace(next);
    trace!(?prev, ?next, "resumption state");
  }

  fn schedule_advance(self: &Rc<Self>, resume: Resume) {
    self.transition(ResumeState::AdvancingToNextSource);
    let cursor = self.cursor.get();
    let engine = self.clone();
    let handle = self
      .scheduler
      .schedule_with_state(resume, move |_, resume| engine.advance(resume));
    // a scheduler may run the step inline; its successor's handle is newer
    if self.cursor.get() == cursor {
      self.cancelable.set(handle);
    }
  }

  /// Only the source at `index` may end the current step.
  fn source_terminated(self: &Rc<Self>, index: usize, resume: Resume) {
    let current = ResumeState::SubscribedToCurrentSource { index };
    if self.state.get() != current {
      trace!(index, state = ?self.state.get(), "stale termination ignored");
      return;
    }
    self.schedule_advance(resume);
  }

  fn advance(self: &Rc<Self>, resume: Resume) {
    if self.state.get() == ResumeState::Exhausted {
      return;
    }
    if self.observer.is_closed() {
      debug!(cursor = self.cursor.get(), "observer closed, resumption stopped");
      return;
    }

    let index = self.cursor.get();
    let Some(source) = self.sources.get(index) else {
      self.transition(ResumeState::Exhausted);
      debug!(sources = self.sources.len(), "resumption sources exhausted");
      match resume {
        Resume::FactoryFailed(err) => self.observer.clone().error(err),
        Resume::Completed | Resume::Errored(_) => self.observer.clone().complete(),
      }
      return;
    };
    self.cursor.set(index + 1);

    let observable = match source.resolve(resume.into_error()) {
      Ok(observable) => observable,
      Err(err) => {
        debug!(index, reason = %err, "source factory failed");
        self.schedule_advance(Resume::FactoryFailed(err));
        return;
      }
    };

    let slot = SingleAssignmentDisposable::new();
    self.subscription.set(slot.clone().into());
    self.transition(ResumeState::SubscribedToCurrentSource { index });
    let observer = ResumeObserver {
      outer: self.observer.clone(),
      engine: self.clone(),
      index,
    };
    let subscription = observable.subscribe_with_scheduler(observer, Some(self.scheduler.clone()));
    if let Err(err) = slot.set(subscription) {
      self.observer.clone().error(err.into());
    }
  }
}

/// Forwards values downstream and turns both terminals into an advance.
struct ResumeObserver<T> {
  outer: SharedObserver<BoxedObserver<T>>,
  engine: Rc<ResumeNext<T>>,
  index: usize,
}

impl<T: Clone + 'static> Observer<T> for ResumeObserver<T> {
  #[inline]
  fn next(&mut self, value: T) { self.outer.next(value) }

  fn error(self, err: Error) {
    debug!(reason = %err, "source failed, resuming with the next one");
    self.engine.source_terminated(self.index, Resume::Errored(err));
  }

  fn complete(self) { self.engine.source_terminated(self.index, Resume::Completed); }

  #[inline]
  fn is_closed(&self) -> bool { self.outer.is_closed() }
}

/// Chains `sources` into one sequence.
///
/// Sources are subscribed in order, one at a time; a source is subscribed
/// only after the previous one terminated, whether with `complete` or
/// `error`. A failing source never ends the sequence: its error is handed to
/// the next [`Source::Factory`] and otherwise dropped. The sequence completes
/// once the sources are exhausted, or errors if the last step was a factory
/// that failed to build its observable.
///
/// Every hand-off is a scheduled continuation, so arbitrarily long chains run
/// at constant stack depth on a trampolining scheduler. Disposing the
/// subscription disposes the active source and cancels a pending hand-off.
///
/// ```
/// use rxresume::prelude::*;
///
/// let values = std::rc::Rc::new(std::cell::RefCell::new(vec![]));
/// let c_values = values.clone();
/// observable::on_error_resume_next([
///   Source::from(observable::throw(Error::msg("offline"), None)),
///   Source::factory(|err| {
///     let fallback = if err.is_some() { 0 } else { 1 };
///     observable::return_value(fallback, None)
///   }),
///   Source::from(observable::return_value(2, None)),
/// ])
/// .subscribe_fn(move |v| c_values.borrow_mut().push(v), |_| {}, || {});
/// assert_eq!(*values.borrow(), vec![0, 2]);
/// ```
pub fn on_error_resume_next<T, I>(sources: I) -> Observable<T>
where
  T: Clone + 'static,
  I: IntoIterator,
  I::Item: Into<Source<T>>,
{
  let sources: Rc<[Source<T>]> = sources.into_iter().map(Into::into).collect();
  Observable::new(move |observer, scheduler| {
    let engine = ResumeNext::new(sources.clone(), observer, resolve_scheduler(&None, scheduler));
    debug!(sources = sources.len(), "resumption started");
    let disposable = CompositeDisposable::new([engine.subscription.clone().into(), engine.cancelable.clone().into()]);
    engine.schedule_advance(Resume::Completed);
    disposable.into()
  })
}

impl<T: Clone + 'static> Observable<T> {
  /// Continues with `next` once this observable terminates, whether it
  /// completes or fails.
  pub fn on_error_resume_next(&self, next: impl Into<Source<T>>) -> Observable<T> {
    on_error_resume_next([Source::Observable(self.clone()), next.into()])
  }
}
