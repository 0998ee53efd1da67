//! Folding chunk streams into a single value
//!
//! A [`Reducer`] pairs a seed value with a combining function. Reducing a
//! stream consumes it in arrival order and resolves exactly once: with the
//! final accumulator when the stream ends, or with the first error the stream
//! yields. Nothing is polled after an error.

use std::pin::pin;

use futures::{Stream, StreamExt};

/// A combining function plus the seed it starts from
///
/// Each call to [`Reducer::reduce`] starts from a fresh clone of the seed, so
/// one reducer can be shared across any number of reductions.
#[derive(Debug, Clone, Copy)]
pub struct Reducer<A, F> {
    init: A,
    combine: F,
}

impl<A, F> Reducer<A, F> {
    /// Create a reducer from a seed value and a combining function
    pub const fn new(init: A, combine: F) -> Self {
        Self { init, combine }
    }

    /// The seed every reduction starts from
    pub fn initial(&self) -> &A {
        &self.init
    }
}

impl<A, F> Reducer<A, F>
where
    A: Clone,
{
    /// Fold `stream` into one value
    ///
    /// # Errors
    /// Returns the first error yielded by `stream`, after which the stream is
    /// dropped without being polled again.
    pub async fn reduce<S, T, E>(&self, stream: S) -> Result<A, E>
    where
        S: Stream<Item = Result<T, E>>,
        F: Fn(A, T) -> A,
    {
        let mut stream = pin!(stream);
        let mut acc = self.init.clone();

        while let Some(chunk) = stream.next().await {
            acc = (self.combine)(acc, chunk?);
        }

        Ok(acc)
    }
}

/// Free-function form of [`Reducer::reduce`]
///
/// # Errors
/// Returns the first error yielded by `stream`.
pub async fn reduce_stream<S, T, E, A, F>(stream: S, reducer: &Reducer<A, F>) -> Result<A, E>
where
    S: Stream<Item = Result<T, E>>,
    A: Clone,
    F: Fn(A, T) -> A,
{
    reducer.reduce(stream).await
}

fn append_bytes<T: AsRef<[u8]>>(mut acc: Vec<u8>, chunk: T) -> Vec<u8> {
    acc.extend_from_slice(chunk.as_ref());
    acc
}

fn append_str<T: AsRef<str>>(mut acc: String, chunk: T) -> String {
    acc.push_str(chunk.as_ref());
    acc
}

/// Byte reducer type returned by [`concat`]
pub type Concat<T> = Reducer<Vec<u8>, fn(Vec<u8>, T) -> Vec<u8>>;

/// String reducer type returned by [`concat_str`]
pub type ConcatStr<T> = Reducer<String, fn(String, T) -> String>;

/// Concatenate byte chunks, starting from an empty buffer
///
/// Decode after reducing: a chunk boundary may fall inside a UTF-8 sequence.
#[must_use]
pub fn concat<T: AsRef<[u8]>>() -> Concat<T> {
    Reducer::new(Vec::new(), append_bytes::<T> as fn(Vec<u8>, T) -> Vec<u8>)
}

/// Concatenate string chunks, starting from the empty string
#[must_use]
pub fn concat_str<T: AsRef<str>>() -> ConcatStr<T> {
    Reducer::new(String::new(), append_str::<T> as fn(String, T) -> String)
}
