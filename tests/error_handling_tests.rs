use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use whenable_stream::constructors::{emit, failed};
use whenable_stream::{Emitter, StreamError, StreamStatus, Whenable};

fn open_stream<V: Clone + 'static>() -> (Whenable<V>, Emitter<V>) {
    let mut tap: Option<Emitter<V>> = None;
    let stream = Whenable::with_producer(|emitter| {
        tap = Some(emitter);
        Ok(())
    });
    (stream, tap.unwrap())
}

#[test]
fn test_producer_error_becomes_terminal() {
    let stream: Whenable<i32> = Whenable::with_producer(|_emitter| {
        Err(StreamError::Custom("setup failed".to_string()))
    });
    assert_eq!(
        stream.status(),
        StreamStatus::Errored(StreamError::Custom("setup failed".to_string()))
    );
}

#[test]
fn test_producer_error_after_values_keeps_buffer() {
    let stream: Whenable<i32> = Whenable::with_producer(|emitter| {
        emitter.value(1);
        emitter.value(2);
        Err(StreamError::Custom("halfway".to_string()))
    });

    assert!(stream.is_errored());
    assert_eq!(stream.buffered_len(), 2);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let error_sink = Rc::clone(&errors);
    stream.when(
        move |v| {
            sink.borrow_mut().push(v);
            v
        },
        move |err| error_sink.borrow_mut().push(err),
        || {},
    );

    assert_eq!(*seen.borrow(), vec![1, 2]);
    assert_eq!(
        *errors.borrow(),
        vec![StreamError::Custom("halfway".to_string())]
    );
}

#[test]
fn test_producer_error_after_complete_is_ignored() {
    let stream: Whenable<i32> = Whenable::with_producer(|emitter| {
        emitter.complete();
        Err(StreamError::Custom("unreachable outcome".to_string()))
    });
    assert!(stream.is_completed());
}

#[test]
fn test_error_reaches_live_subscriber_once() {
    let (stream, tap) = open_stream::<i32>();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    stream.when(|v| v, move |err| sink.borrow_mut().push(err), || {});

    tap.error(StreamError::Custom("boom".to_string()));
    tap.error(StreamError::Custom("again".to_string()));

    assert_eq!(
        *errors.borrow(),
        vec![StreamError::Custom("boom".to_string())]
    );
}

#[test]
fn test_terminal_channels_are_mutually_exclusive() {
    // Completion must not touch the error channel and vice versa.
    let (completed, complete_tap) = open_stream::<i32>();
    let (errored, error_tap) = open_stream::<i32>();

    let completed_events = Rc::new(RefCell::new(Vec::new()));
    let errored_events = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&completed_events);
    let done_sink = Rc::clone(&completed_events);
    completed.when(
        |v| v,
        move |_err| sink.borrow_mut().push("error"),
        move || done_sink.borrow_mut().push("complete"),
    );
    let sink = Rc::clone(&errored_events);
    let done_sink = Rc::clone(&errored_events);
    errored.when(
        |v| v,
        move |_err| sink.borrow_mut().push("error"),
        move || done_sink.borrow_mut().push("complete"),
    );

    complete_tap.complete();
    error_tap.error(StreamError::Custom("boom".to_string()));

    assert_eq!(*completed_events.borrow(), vec!["complete"]);
    assert_eq!(*errored_events.borrow(), vec!["error"]);
}

#[test]
fn test_panicking_value_handler_leaves_stream_usable() {
    let (stream, tap) = open_stream::<i32>();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    stream.map(move |v| {
        let first = *counter.borrow() == 0;
        *counter.borrow_mut() += 1;
        if first {
            panic!("handler rejected {}", v);
        }
        v
    });

    // The panic unwinds out of the emit call.
    let result = catch_unwind(AssertUnwindSafe(|| tap.value(1)));
    assert!(result.is_err());

    // The value was accepted before dispatch and the stream stays open with
    // the subscriber still attached.
    assert!(stream.is_open());
    assert_eq!(stream.buffered_len(), 1);
    assert_eq!(stream.subscriber_count(), 1);

    tap.value(2);
    assert_eq!(stream.buffered_len(), 2);
    assert_eq!(*calls.borrow(), 2);

    tap.complete();
    assert!(stream.is_completed());
}

#[test]
fn test_query_inside_value_handler_panics() {
    let (stream, tap) = open_stream::<i32>();
    let handle = stream.clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    stream.map(move |v| {
        if v == 0 {
            // The delivering stream is mutably borrowed for the whole
            // dispatch, so even a read-only query double borrows.
            let _ = handle.buffered_len();
        }
        sink.borrow_mut().push(v);
        v
    });

    let result = catch_unwind(AssertUnwindSafe(|| tap.value(0)));
    assert!(result.is_err());

    // The value landed in the buffer before dispatch and the stream is
    // still open with the subscriber attached.
    assert!(stream.is_open());
    assert_eq!(stream.buffered_len(), 1);
    assert_eq!(stream.subscriber_count(), 1);

    tap.value(7);
    assert_eq!(*seen.borrow(), vec![7]);
    assert_eq!(stream.buffered_len(), 2);
}

#[test]
fn test_panicking_replay_handler_leaves_terminal_state() {
    let stream = emit(9);

    let result = catch_unwind(AssertUnwindSafe(|| {
        stream.map(|_v: i32| -> i32 { panic!("replay rejected") });
    }));
    assert!(result.is_err());

    assert!(stream.is_completed());
    assert_eq!(stream.buffered_len(), 1);
    assert_eq!(stream.subscriber_count(), 0);

    // A later subscriber still gets the full replay.
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    stream.map(move |v| {
        sink.borrow_mut().push(v);
        v
    });
    assert_eq!(*seen.borrow(), vec![9]);
}

#[test]
fn test_panicking_complete_handler_still_detaches_everyone() {
    let (stream, tap) = open_stream::<i32>();
    stream.when(|v| v, |_err| {}, || panic!("teardown failed"));

    let result = catch_unwind(AssertUnwindSafe(|| tap.complete()));
    assert!(result.is_err());

    // The status flipped before handlers ran, so the stream is terminal and
    // the subscriber list was already cleared.
    assert!(stream.is_completed());
    assert_eq!(stream.subscriber_count(), 0);
}

#[test]
fn test_io_errors_convert() {
    let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk offline");
    let err: StreamError = io_err.into();
    assert_eq!(err, StreamError::IO("disk offline".to_string()));
}

#[test]
fn test_error_display() {
    assert_eq!(
        StreamError::Custom("boom".to_string()).to_string(),
        "Stream error: boom"
    );
    assert_eq!(
        StreamError::IO("disk offline".to_string()).to_string(),
        "IO error: disk offline"
    );
}

#[test]
fn test_failed_stream_replays_error_to_every_subscriber() {
    let stream = failed::<i32>(StreamError::IO("socket closed".to_string()));

    for _ in 0..2 {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        stream.when(|v| v, move |err| sink.borrow_mut().push(err), || {});
        assert_eq!(
            *errors.borrow(),
            vec![StreamError::IO("socket closed".to_string())]
        );
    }
}

#[test]
fn test_fallible_producer_with_io_source() {
    // `?` works inside producers for anything convertible to StreamError.
    fn read_header() -> Result<i32, std::io::Error> {
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short read",
        ))
    }

    let stream: Whenable<i32> = Whenable::with_producer(|emitter| {
        let header = read_header()?;
        emitter.value(header);
        emitter.complete();
        Ok(())
    });

    assert!(stream.is_errored());
    assert!(matches!(
        stream.status(),
        StreamStatus::Errored(StreamError::IO(_))
    ));
}
