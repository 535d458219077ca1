//! The whenable primitive: a push-based stream of values with exactly one
//! terminal outcome and buffered replay for late subscribers.
//!
//! A [`Whenable`] is driven from the producer side through an [`Emitter`] and
//! observed from the consumer side through [`Whenable::when`], which both
//! subscribes and returns a derived stream, so repeated calls chain into a
//! linear pipeline. Everything is single-threaded and synchronous: an emit
//! call delivers to every subscriber before it returns.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use log::{debug, trace};
use uuid::Uuid;

use crate::error::{StreamError, StreamResult};

/// Lifecycle status of a stream.
///
/// A stream starts `Open` and transitions at most once, to `Completed` or
/// `Errored`. A single tagged variant rather than separate flags, so the two
/// terminal outcomes are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// Still accepting values; no terminal event yet
    Open,
    /// Terminated successfully
    Completed,
    /// Terminated with the stored error
    Errored(StreamError),
}

impl StreamStatus {
    /// Returns `true` while no terminal event has been accepted.
    pub fn is_open(&self) -> bool {
        matches!(self, StreamStatus::Open)
    }

    /// Returns `true` once the stream has completed or errored.
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

/// One registered subscriber: a plain record of the three event callbacks.
struct Subscriber<V> {
    on_value: Box<dyn FnMut(V)>,
    on_error: Box<dyn FnMut(StreamError)>,
    on_complete: Box<dyn FnMut()>,
}

/// Shared state behind one stream: the replay buffer, the status and the
/// attached subscribers, plus an id used for log correlation.
struct StreamState<V> {
    id: Uuid,
    values: Vec<V>,
    status: StreamStatus,
    subscribers: Vec<Subscriber<V>>,
}

/// A push-based stream carrying zero or more values and exactly one terminal
/// outcome (completion or a single error).
///
/// Values accepted while the stream is open are buffered for its whole
/// lifetime; a subscriber attaching *after* the terminal event replays the
/// entire backlog synchronously, in original order, followed by the stored
/// terminal event. A subscriber attaching while the stream is still open
/// receives live events only. The buffer is unbounded: a long-lived stream
/// that emits many values before terminating retains all of them.
///
/// `Whenable` is a cheap cloneable handle (`Rc` internally) and is `!Send`:
/// all delivery happens synchronously on the thread that calls the emitter.
///
/// # Examples
///
/// ```
/// use whenable_stream::whenable::Whenable;
///
/// let stream = Whenable::with_producer(|emitter| {
///     emitter.value(1);
///     emitter.value(2);
///     emitter.complete();
///     Ok(())
/// });
///
/// // Already terminal, so a late subscriber replays the backlog.
/// let negated = stream.map(|v| -v);
/// assert!(negated.is_completed());
/// assert_eq!(negated.buffered_len(), 2);
/// ```
pub struct Whenable<V> {
    state: Rc<RefCell<StreamState<V>>>,
}

impl<V> Clone for Whenable<V> {
    fn clone(&self) -> Self {
        Whenable {
            state: Rc::clone(&self.state),
        }
    }
}

impl<V> Default for Whenable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Whenable<V> {
    /// Create an open stream with no producer.
    ///
    /// Nothing will ever be delivered unless the stream was created through
    /// [`Whenable::with_producer`] or is fed as the downstream of a `when`
    /// chain.
    pub fn new() -> Self {
        Whenable {
            state: Rc::new(RefCell::new(StreamState {
                id: Uuid::new_v4(),
                values: Vec::new(),
                status: StreamStatus::Open,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Create a stream driven by `producer`, invoked once, synchronously,
    /// with an [`Emitter`] bound to the new stream.
    ///
    /// The producer may emit any number of values before terminating, either
    /// during this call or later from deferred work it schedules itself (the
    /// emitter is `Clone` and can be moved into timers or local tasks).
    /// Returning `Err(e)` is equivalent to calling [`Emitter::error`]`(e)`:
    /// it becomes the terminal error unless the stream already terminated,
    /// and values emitted before the `Err` return stay buffered.
    ///
    /// # Examples
    ///
    /// ```
    /// use whenable_stream::error::StreamError;
    /// use whenable_stream::whenable::Whenable;
    ///
    /// let stream: Whenable<u8> = Whenable::with_producer(|_emitter| {
    ///     Err(StreamError::Custom("boom".into()))
    /// });
    /// assert!(stream.is_errored());
    /// ```
    pub fn with_producer<P>(producer: P) -> Self
    where
        P: FnOnce(Emitter<V>) -> StreamResult<()>,
    {
        let whenable = Whenable::new();
        if let Err(err) = producer(whenable.emitter()) {
            whenable.emitter().error(err);
        }
        whenable
    }

    /// An emitter bound to this stream. Producer access stays scoped to
    /// [`Whenable::with_producer`]; inside the crate pipes use this to feed
    /// hand-built downstreams.
    pub(crate) fn emitter(&self) -> Emitter<V> {
        Emitter {
            state: Rc::clone(&self.state),
        }
    }

    /// Subscribe to this stream and return the derived stream of transformed
    /// values.
    ///
    /// Every value is passed through `on_value` and the result forwarded into
    /// the returned stream; `on_error` and `on_complete` are side-effecting
    /// hooks invoked before the terminal event is forwarded downstream (they
    /// cannot suppress propagation).
    ///
    /// If this stream is already terminal, the subscriber synchronously
    /// replays every buffered value in original order, then the stored
    /// terminal event, all within this call. If the stream is still open, the
    /// subscriber sees live events only; history is never replayed to an
    /// early subscriber.
    ///
    /// A panic inside any of the three callbacks is not caught: it propagates
    /// out of the emit call (or out of this call, on the replay path) and
    /// leaves the stream's status and buffer untouched.
    ///
    /// Live delivery iterates subscribers under the internal `RefCell`
    /// borrow. While that borrow is held the delivering stream is off
    /// limits to its own handlers: emitting into it or subscribing to it
    /// panics on a double borrow, and so do read-only queries such as
    /// [`Whenable::status`] and [`Whenable::buffered_len`]. Handlers are
    /// free to drive other streams, including downstream stages; emits
    /// aimed at an already-terminal stream are ordinary no-ops.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use whenable_stream::whenable::Whenable;
    ///
    /// let stream = Whenable::with_producer(|emitter| {
    ///     emitter.value(21);
    ///     emitter.complete();
    ///     Ok(())
    /// });
    ///
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let sink = Rc::clone(&seen);
    /// let doubled = stream.when(
    ///     move |v| {
    ///         sink.borrow_mut().push(v);
    ///         v * 2
    ///     },
    ///     |_err| {},
    ///     || {},
    /// );
    /// assert_eq!(*seen.borrow(), vec![21]);
    /// assert!(doubled.is_completed());
    /// ```
    pub fn when<T, FV, FE, FC>(
        &self,
        mut on_value: FV,
        mut on_error: FE,
        mut on_complete: FC,
    ) -> Whenable<T>
    where
        V: Clone + 'static,
        T: Clone + 'static,
        FV: FnMut(V) -> T + 'static,
        FE: FnMut(StreamError) + 'static,
        FC: FnMut() + 'static,
    {
        let downstream = Whenable::new();
        let forward = downstream.emitter();
        let forward_err = forward.clone();
        let forward_done = forward.clone();

        let mut sub = Subscriber {
            on_value: Box::new(move |v: V| forward.value(on_value(v))),
            on_error: Box::new(move |err: StreamError| {
                on_error(err.clone());
                forward_err.error(err);
            }),
            on_complete: Box::new(move || {
                on_complete();
                forward_done.complete();
            }),
        };

        let (values, failure) = {
            let mut state = self.state.borrow_mut();
            if state.status.is_open() {
                state.subscribers.push(sub);
                return downstream;
            }
            debug!(
                "whenable {}: replaying {} buffered value(s) to late subscriber",
                state.id,
                state.values.len()
            );
            let failure = match &state.status {
                StreamStatus::Errored(err) => Some(err.clone()),
                _ => None,
            };
            (state.values.clone(), failure)
        };

        // Replay runs with no state borrow held: an emit aimed back at this
        // stream from inside a handler observes the terminal status and is a
        // true no-op.
        for v in values {
            (sub.on_value)(v);
        }
        match failure {
            Some(err) => (sub.on_error)(err),
            None => (sub.on_complete)(),
        }
        downstream
    }

    /// Value-only subscription: transform each value, let terminal events
    /// flow through to the derived stream unobserved.
    pub fn map<T, F>(&self, on_value: F) -> Whenable<T>
    where
        V: Clone + 'static,
        T: Clone + 'static,
        F: FnMut(V) -> T + 'static,
    {
        self.when(on_value, |_| {}, || {})
    }

    /// Identifier assigned at construction, shared with log lines.
    pub fn id(&self) -> Uuid {
        self.state.borrow().id
    }

    /// Current lifecycle status (cloned snapshot).
    pub fn status(&self) -> StreamStatus {
        self.state.borrow().status.clone()
    }

    /// Returns `true` while the stream still accepts values.
    pub fn is_open(&self) -> bool {
        self.state.borrow().status.is_open()
    }

    /// Returns `true` once the stream terminated successfully.
    pub fn is_completed(&self) -> bool {
        matches!(self.state.borrow().status, StreamStatus::Completed)
    }

    /// Returns `true` once the stream terminated with an error.
    pub fn is_errored(&self) -> bool {
        matches!(self.state.borrow().status, StreamStatus::Errored(_))
    }

    /// Number of values accepted so far (the replay backlog).
    pub fn buffered_len(&self) -> usize {
        self.state.borrow().values.len()
    }

    /// Number of currently attached subscribers. Always zero once the stream
    /// is terminal, since the terminal transition clears the list.
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

impl<V> fmt::Debug for Whenable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Whenable")
            .field("id", &state.id)
            .field("status", &state.status)
            .field("buffered", &state.values.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

/// Producer-side handle bundling the three emit operations of one stream.
///
/// Cloning is cheap (a shared handle to the same stream), so a producer can
/// move copies into deferred callbacks it schedules itself. All three
/// operations are silent no-ops once the stream is terminal.
///
/// # Examples
///
/// ```
/// use whenable_stream::whenable::{Emitter, Whenable};
///
/// let mut handle: Option<Emitter<i32>> = None;
/// let stream = Whenable::with_producer(|emitter| {
///     handle = Some(emitter);
///     Ok(())
/// });
/// let emitter = handle.unwrap();
///
/// emitter.value(7);
/// assert_eq!(stream.buffered_len(), 1);
/// emitter.complete();
/// assert!(stream.is_completed());
/// ```
pub struct Emitter<V> {
    state: Rc<RefCell<StreamState<V>>>,
}

impl<V> Clone for Emitter<V> {
    fn clone(&self) -> Self {
        Emitter {
            state: Rc::clone(&self.state),
        }
    }
}

impl<V> Emitter<V> {
    /// Push a value: append it to the replay buffer and deliver it to every
    /// attached subscriber in registration order. Ignored once the stream is
    /// terminal.
    pub fn value(&self, v: V)
    where
        V: Clone,
    {
        let mut state = self.state.borrow_mut();
        if !state.status.is_open() {
            trace!("whenable {}: ignoring value after terminal event", state.id);
            return;
        }
        state.values.push(v.clone());
        // Delivery holds the state borrow; see `Whenable::when` for the
        // reentrancy constraint this puts on handlers.
        for sub in state.subscribers.iter_mut() {
            (sub.on_value)(v.clone());
        }
    }

    /// Terminate with an error: store it, notify every subscriber's on-error
    /// in registration order, then detach all subscribers. Ignored once the
    /// stream is terminal.
    pub fn error(&self, err: StreamError) {
        let mut subscribers = {
            let mut state = self.state.borrow_mut();
            if !state.status.is_open() {
                trace!("whenable {}: ignoring error after terminal event", state.id);
                return;
            }
            debug!(
                "whenable {}: errored ({}); notifying {} subscriber(s)",
                state.id,
                err,
                state.subscribers.len()
            );
            state.status = StreamStatus::Errored(err.clone());
            mem::take(&mut state.subscribers)
        };
        // The borrow is released and the status already terminal, so emit
        // calls made from inside these handlers are plain no-ops.
        for sub in subscribers.iter_mut() {
            (sub.on_error)(err.clone());
        }
    }

    /// Terminate successfully: notify every subscriber's on-complete in
    /// registration order, then detach all subscribers. Ignored once the
    /// stream is terminal.
    pub fn complete(&self) {
        let mut subscribers = {
            let mut state = self.state.borrow_mut();
            if !state.status.is_open() {
                trace!(
                    "whenable {}: ignoring complete after terminal event",
                    state.id
                );
                return;
            }
            debug!(
                "whenable {}: completed ({} value(s) buffered, {} subscriber(s) notified)",
                state.id,
                state.values.len(),
                state.subscribers.len()
            );
            state.status = StreamStatus::Completed;
            mem::take(&mut state.subscribers)
        };
        for sub in subscribers.iter_mut() {
            (sub.on_complete)();
        }
    }
}

impl<V> fmt::Debug for Emitter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Emitter")
            .field("id", &state.id)
            .field("status", &state.status)
            .finish()
    }
}
