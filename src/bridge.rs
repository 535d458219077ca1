//! Bridges between whenables and async [`Stream`]s
//!
//! A whenable is a synchronous push primitive; consumers living in async code
//! can subscribe to one as an async stream of events, and producers can drive
//! one from any async stream. Both directions go through an unbounded channel
//! so the whenable side never suspends.

use async_stream::stream;
use futures_core::Stream;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::error::{StreamError, StreamResult};
use crate::whenable::Whenable;

/// A boxed async stream of whenable events: `Ok` per value, a final `Err` if
/// the whenable errored, end-of-stream on termination.
pub type EventStream<V> = BoxStream<'static, StreamResult<V>>;

impl<V> Whenable<V>
where
    V: Clone + Send + 'static,
{
    /// Subscribe to this whenable as an async stream.
    ///
    /// Attaching behaves exactly like [`Whenable::when`]: on an open stream
    /// the events are the live ones from this point on; on a terminal stream
    /// the full backlog (and the terminal event) is already queued when this
    /// returns. The async stream ends when the whenable terminates: the
    /// terminal transition detaches the subscriber, which closes the internal
    /// channel.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures_util::StreamExt;
    /// use tokio::runtime::Runtime;
    /// use whenable_stream::constructors::from_iter;
    ///
    /// let rt = Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let stream = from_iter(vec![1, 2]);
    ///     let events: Vec<_> = stream.subscribe_stream().collect().await;
    ///     assert_eq!(events, vec![Ok(1), Ok(2)]);
    /// });
    /// ```
    pub fn subscribe_stream(&self) -> EventStream<V> {
        let (tx, mut rx) = mpsc::unbounded_channel::<StreamResult<V>>();
        let tx_err = tx.clone();
        self.when(
            move |v: V| {
                let _ = tx.send(Ok(v));
            },
            move |err: StreamError| {
                let _ = tx_err.send(Err(err));
            },
            || {},
        );
        let events = stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        };

        Box::pin(events)
    }
}

/// Drive an async stream into a whenable: every item is emitted as a value
/// and the whenable completes when the input ends.
///
/// The input is consumed on a spawned local task, so this must be called from
/// within a [`tokio::task::LocalSet`].
///
/// # Examples
///
/// ```
/// use futures_util::StreamExt;
/// use tokio::runtime::Runtime;
/// use tokio::task::LocalSet;
/// use whenable_stream::bridge::from_stream;
///
/// let rt = Runtime::new().unwrap();
/// let local = LocalSet::new();
/// local.block_on(&rt, async {
///     let whenable = from_stream(tokio_stream::iter(vec![1, 2, 3]));
///     let events: Vec<_> = whenable.subscribe_stream().collect().await;
///     assert_eq!(events, vec![Ok(1), Ok(2), Ok(3)]);
///     assert!(whenable.is_completed());
/// });
/// ```
pub fn from_stream<S, V>(input: S) -> Whenable<V>
where
    S: Stream<Item = V> + 'static,
    V: Clone + 'static,
{
    Whenable::with_producer(|emitter| {
        tokio::task::spawn_local(async move {
            futures::pin_mut!(input);
            while let Some(v) = input.next().await {
                emitter.value(v);
            }
            emitter.complete();
        });
        Ok(())
    })
}

/// Drive a fallible async stream into a whenable: the first `Err` becomes the
/// terminal error and stops the drive loop; an `Ok` end completes.
///
/// Must be called from within a [`tokio::task::LocalSet`], like
/// [`from_stream`].
pub fn from_try_stream<S, V>(input: S) -> Whenable<V>
where
    S: Stream<Item = StreamResult<V>> + 'static,
    V: Clone + 'static,
{
    Whenable::with_producer(|emitter| {
        tokio::task::spawn_local(async move {
            futures::pin_mut!(input);
            while let Some(item) = input.next().await {
                match item {
                    Ok(v) => emitter.value(v),
                    Err(err) => {
                        emitter.error(err);
                        return;
                    }
                }
            }
            emitter.complete();
        });
        Ok(())
    })
}
