//! Producers of token records.
//!
//! The packer pulls records through [`TokenSource`]. Exhaustion is signalled
//! with `Ok(None)`; an `Err` means the producer itself failed (I/O, parsing,
//! tokenization).

use grownet_core::{Result, TokenId, TokenRecord};

/// A pull-based producer of token records.
pub trait TokenSource {
    /// Pull the next record, or `Ok(None)` once the corpus is consumed.
    fn next_record(&mut self) -> Result<Option<TokenRecord>>;
}

impl<S: TokenSource + ?Sized> TokenSource for &mut S {
    fn next_record(&mut self) -> Result<Option<TokenRecord>> {
        (**self).next_record()
    }
}

impl<S: TokenSource + ?Sized> TokenSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<TokenRecord>> {
        (**self).next_record()
    }
}

/// Adapts an infallible iterator of records into a [`TokenSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I> {
    /// Wrap an iterator.
    pub fn new<T>(records: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            inner: records.into_iter(),
        }
    }

    /// Unwrap the iterator.
    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I, R> TokenSource for IterSource<I>
where
    I: Iterator<Item = R>,
    R: Into<Vec<TokenId>>,
{
    fn next_record(&mut self) -> Result<Option<TokenRecord>> {
        Ok(self.inner.next().map(Into::into))
    }
}
