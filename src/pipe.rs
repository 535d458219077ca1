use std::rc::Rc;

use crate::error::StreamError;
use crate::whenable::Whenable;

/// A Pipe represents a whenable transformation from one type to another.
/// It's a function from Whenable<I> to Whenable<O>, held as a reusable value
/// so the same transformation can be applied to many streams.
pub struct Pipe<I, O> {
    f: Rc<dyn Fn(&Whenable<I>) -> Whenable<O> + 'static>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Pipe {
            f: Rc::clone(&self.f),
        }
    }
}

impl<I, O> Pipe<I, O> {
    /// Create a new pipe from a function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Whenable<I>) -> Whenable<O> + 'static,
    {
        Pipe { f: Rc::new(f) }
    }

    /// Apply this pipe to a stream
    pub fn apply(&self, input: &Whenable<I>) -> Whenable<O> {
        (self.f)(input)
    }
}

/// Create a pipe that applies the given function to each value
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> O + Clone + 'static,
    I: Clone + 'static,
    O: Clone + 'static,
{
    Pipe::new(move |input| {
        let f = f.clone();
        input.map(move |v| f(v))
    })
}

/// Create a pipe that forwards only values matching the predicate.
/// Terminal events always flow through.
pub fn filter<I, F>(predicate: F) -> Pipe<I, I>
where
    F: Fn(&I) -> bool + Clone + 'static,
    I: Clone + 'static,
{
    Pipe::new(move |input| {
        let predicate = predicate.clone();
        let out = Whenable::new();
        let forward = out.emitter();
        let forward_err = forward.clone();
        let forward_done = forward.clone();
        input.when(
            move |v: I| {
                if predicate(&v) {
                    forward.value(v);
                }
            },
            move |err: StreamError| forward_err.error(err),
            move || forward_done.complete(),
        );
        out
    })
}

/// Compose two pipes together
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: 'static,
    M: 'static,
    O: 'static,
{
    Pipe::new(move |input| {
        let mid = p1.apply(input);
        p2.apply(&mid)
    })
}

/// Identity pipe that doesn't transform the stream
pub fn identity<I>() -> Pipe<I, I>
where
    I: 'static,
{
    Pipe::new(|input| input.clone())
}

/// Extension trait for pipes
pub trait PipeExt<I, O> {
    /// Compose this pipe with another pipe
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: 'static;
}

impl<I, O> PipeExt<I, O> for Pipe<I, O>
where
    I: 'static,
    O: 'static,
{
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: 'static,
    {
        compose(self, other)
    }
}
