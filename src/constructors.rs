//! Core whenable constructors
//!
//! Free functions building already-terminal streams, in the spirit of the
//! classic stream constructors: every one of them is a thin wrapper over
//! [`Whenable::with_producer`], so a late subscriber replays exactly what the
//! constructor emitted.

use crate::error::StreamError;
use crate::whenable::Whenable;

/// Emit a single value and complete.
///
/// # Examples
/// ```
/// use whenable_stream::constructors::emit;
///
/// let stream = emit(42);
/// assert!(stream.is_completed());
/// assert_eq!(stream.buffered_len(), 1);
/// ```
pub fn emit<V>(v: V) -> Whenable<V>
where
    V: Clone + 'static,
{
    Whenable::with_producer(|emitter| {
        emitter.value(v);
        emitter.complete();
        Ok(())
    })
}

/// Create a stream that completes immediately without emitting.
pub fn empty<V>() -> Whenable<V> {
    Whenable::with_producer(|emitter| {
        emitter.complete();
        Ok(())
    })
}

/// Emit every item of an iterator in order, then complete.
///
/// # Examples
/// ```
/// use whenable_stream::constructors::from_iter;
///
/// let stream = from_iter(vec![1, 2, 3]);
/// assert_eq!(stream.buffered_len(), 3);
/// ```
pub fn from_iter<I, V>(iter: I) -> Whenable<V>
where
    I: IntoIterator<Item = V>,
    V: Clone + 'static,
{
    Whenable::with_producer(|emitter| {
        for v in iter {
            emitter.value(v);
        }
        emitter.complete();
        Ok(())
    })
}

/// Create a stream that errors immediately with `err`.
pub fn failed<V>(err: StreamError) -> Whenable<V> {
    Whenable::with_producer(|emitter| {
        emitter.error(err);
        Ok(())
    })
}
