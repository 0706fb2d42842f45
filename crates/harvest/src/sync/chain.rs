//! Lazy flattening of fallible, independently-paged sequences
//!
//! Every level of the crawl is a [`Supplier`] of inner sequences. A
//! [`LazyChain`] drains the current inner sequence before asking the supplier
//! for the next one, so no level fetches ahead of what the caller consumes.

use std::iter::FusedIterator;

/// Yields inner sequences one at a time
pub trait Supplier {
    type Item;
    type Error;
    type Inner: IntoIterator<Item = Result<Self::Item, Self::Error>>;

    /// The next inner sequence, or `Ok(None)` once there are no more.
    ///
    /// Never called again after it returns `Ok(None)` or an error.
    fn next_inner(&mut self) -> Result<Option<Self::Inner>, Self::Error>;
}

enum State<I> {
    /// Between inner sequences (including before the first)
    Pending,
    Draining(I),
    Exhausted,
}

/// One flat sequence over every element of every supplied inner sequence.
///
/// Empty inner sequences are skipped. The first error, whether from the
/// supplier or from an inner sequence, is yielded once and ends the chain.
/// Forward-only: there is no rewind and no removal.
pub struct LazyChain<S: Supplier> {
    supplier: S,
    state: State<<S::Inner as IntoIterator>::IntoIter>,
}

impl<S: Supplier> LazyChain<S> {
    pub fn new(supplier: S) -> Self {
        Self {
            supplier,
            state: State::Pending,
        }
    }

    pub fn supplier(&self) -> &S {
        &self.supplier
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, State::Exhausted)
    }
}

impl<S: Supplier> Iterator for LazyChain<S> {
    type Item = Result<S::Item, S::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Exhausted => return None,
                State::Draining(inner) => match inner.next() {
                    Some(Ok(item)) => return Some(Ok(item)),
                    Some(Err(e)) => {
                        self.state = State::Exhausted;
                        return Some(Err(e));
                    }
                    None => self.state = State::Pending,
                },
                State::Pending => match self.supplier.next_inner() {
                    Ok(Some(inner)) => self.state = State::Draining(inner.into_iter()),
                    Ok(None) => {
                        self.state = State::Exhausted;
                        return None;
                    }
                    Err(e) => {
                        self.state = State::Exhausted;
                        return Some(Err(e));
                    }
                },
            }
        }
    }
}

impl<S: Supplier> FusedIterator for LazyChain<S> {}

/// Supplier backed by a closure
pub struct FromFn<F>(F);

impl<F, I, T, E> Supplier for FromFn<F>
where
    F: FnMut() -> Result<Option<I>, E>,
    I: IntoIterator<Item = Result<T, E>>,
{
    type Item = T;
    type Error = E;
    type Inner = I;

    fn next_inner(&mut self) -> Result<Option<I>, E> {
        (self.0)()
    }
}

/// Chain the inner sequences produced by calling `f` until it returns `Ok(None)`
pub fn from_fn<F, I, T, E>(f: F) -> LazyChain<FromFn<F>>
where
    F: FnMut() -> Result<Option<I>, E>,
    I: IntoIterator<Item = Result<T, E>>,
{
    LazyChain::new(FromFn(f))
}
