//! Lazy effect chain used to compose pipeline steps.
//!
//! A [`Step`] wraps a computation that, when evaluated, yields an [`Outcome`]:
//! a success value, an empty result that skips downstream mapping, or a
//! failure. Nothing runs until [`Step::evaluate`] is called at the top of a
//! pipeline; evaluation is single-pass and synchronous.
//!
//! ```rust,ignore
//! let installed = Step::of(requests)
//!     .flat_map(|requests| validate(requests))
//!     .for_each(|utility| install(utility))
//!     .evaluate();
//! ```

use crate::error::StepLabel;
use anyhow::Result;

/// Result of evaluating a [`Step`].
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Empty,
    Failure(anyhow::Error),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// Collapse into a `Result`, mapping `Empty` to `None`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            Outcome::Success(value) => Ok(Some(value)),
            Outcome::Empty => Ok(None),
            Outcome::Failure(err) => Err(err),
        }
    }
}

pub struct Step<'a, T> {
    thunk: Box<dyn FnOnce() -> Outcome<T> + 'a>,
}

impl<'a, T: 'a> Step<'a, T> {
    fn from_thunk(thunk: impl FnOnce() -> Outcome<T> + 'a) -> Self {
        Self {
            thunk: Box::new(thunk),
        }
    }

    pub fn of(value: T) -> Self {
        Self::from_thunk(move || Outcome::Success(value))
    }

    pub fn success(value: T) -> Self {
        Self::of(value)
    }

    pub fn empty() -> Self {
        Self::from_thunk(|| Outcome::Empty)
    }

    pub fn fail(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self::from_thunk(move || Outcome::Failure(err))
    }

    /// Wrap an impure computation; an `Err` becomes a failure.
    pub fn effect(thunk: impl FnOnce() -> Result<T> + 'a) -> Self {
        Self::from_thunk(move || match thunk() {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        })
    }

    /// Wrap a computation that may legitimately produce no value.
    pub fn effect_optional(thunk: impl FnOnce() -> Result<Option<T>> + 'a) -> Self {
        Self::from_thunk(move || match thunk() {
            Ok(Some(value)) => Outcome::Success(value),
            Ok(None) => Outcome::Empty,
            Err(err) => Outcome::Failure(err),
        })
    }

    pub fn map<U: 'a>(self, f: impl FnOnce(T) -> U + 'a) -> Step<'a, U> {
        Step::from_thunk(move || match (self.thunk)() {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(err) => Outcome::Failure(err),
        })
    }

    pub fn flat_map<U: 'a>(self, f: impl FnOnce(T) -> Step<'a, U> + 'a) -> Step<'a, U> {
        Step::from_thunk(move || match (self.thunk)() {
            Outcome::Success(value) => f(value).evaluate(),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(err) => Outcome::Failure(err),
        })
    }

    pub fn if_then_else<U: 'a>(
        self,
        predicate: impl FnOnce(&T) -> bool + 'a,
        if_true: impl FnOnce(T) -> Step<'a, U> + 'a,
        if_false: impl FnOnce(T) -> Step<'a, U> + 'a,
    ) -> Step<'a, U> {
        self.flat_map(move |value| {
            if predicate(&value) {
                if_true(value)
            } else {
                if_false(value)
            }
        })
    }

    /// Tag a failure with the step it escaped from. The innermost name wins.
    pub fn named(self, name: &str) -> Self {
        let name = name.to_string();
        Self::from_thunk(move || match (self.thunk)() {
            Outcome::Failure(err) if err.downcast_ref::<StepLabel>().is_none() => {
                Outcome::Failure(err.context(StepLabel(name)))
            }
            other => other,
        })
    }

    pub fn evaluate(self) -> Outcome<T> {
        (self.thunk)()
    }
}

impl<'a, I> Step<'a, I>
where
    I: IntoIterator + 'a,
    I::Item: 'a,
{
    /// Run `f` for every element in order, collecting non-empty results.
    ///
    /// The first failure stops the iteration.
    pub fn for_each<U: 'a>(self, mut f: impl FnMut(I::Item) -> Step<'a, U> + 'a) -> Step<'a, Vec<U>> {
        self.flat_map(move |items| {
            Step::from_thunk(move || {
                let mut collected = Vec::new();
                for item in items {
                    match f(item).evaluate() {
                        Outcome::Success(value) => collected.push(value),
                        Outcome::Empty => {}
                        Outcome::Failure(err) => return Outcome::Failure(err),
                    }
                }
                Outcome::Success(collected)
            })
        })
    }
}
