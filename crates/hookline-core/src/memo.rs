//! # Memoization
//!
//! `memoize` wraps a computation so repeated calls with structurally equal
//! arguments return the stored result instead of recomputing it.
//!
//! ```rust
//! use hookline_core::*;
//!
//! let add = memoize(|(a, b): (i32, i32)| a + b);
//! assert_eq!(add.call((1, 2)), 3);
//! assert_eq!(add.call((1, 2)), 3); // served from the store
//! assert_eq!(add.stats().misses, 1);
//! ```
//!
//! With `MemoOptions::default().max_size(n)` the store keeps at most `n`
//! results and drops the oldest-inserted one first (FIFO, reads do not
//! refresh an entry).

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use crate::cache::CacheStore;
use crate::key::{CacheKey, encode_key};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoOptions {
    /// Maximum number of stored results; 0 means unbounded.
    pub max_size: usize,
}

impl MemoOptions {
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct MemoStore<R> {
    store: RefCell<CacheStore<R>>,
    stats: Cell<MemoStats>,
}

impl<R: Clone> MemoStore<R> {
    fn new(options: MemoOptions) -> Self {
        Self {
            store: RefCell::new(CacheStore::new(options.max_size)),
            stats: Cell::new(MemoStats::default()),
        }
    }

    fn lookup(&self, key: &str) -> Option<R> {
        let hit = self.store.borrow().get(key).cloned();
        let mut stats = self.stats.get();
        match hit {
            Some(_) => {
                log::trace!("memo hit `{key}`");
                stats.hits += 1;
            }
            None => stats.misses += 1,
        }
        self.stats.set(stats);
        hit
    }

    fn store(&self, key: String, value: R) {
        if self.store.borrow_mut().insert(key, value).is_some() {
            let mut stats = self.stats.get();
            stats.evictions += 1;
            self.stats.set(stats);
        }
    }
}

/// A memoized computation. Call it with [`call`](Self::call).
pub struct Memo<A, R> {
    f: Box<dyn Fn(A) -> R>,
    cache: MemoStore<R>,
}

impl<A: CacheKey, R: Clone> Memo<A, R> {
    pub fn new(f: impl Fn(A) -> R + 'static, options: MemoOptions) -> Self {
        Self {
            f: Box::new(f),
            cache: MemoStore::new(options),
        }
    }

    /// Returns the stored result for `args`, computing and storing it on a miss.
    /// A panicking computation stores nothing.
    pub fn call(&self, args: A) -> R {
        let key = encode_key(&args);
        if let Some(hit) = self.cache.lookup(&key) {
            return hit;
        }
        // no borrow is held here, so `f` may call back into this memo
        let value = (self.f)(args);
        self.cache.store(key, value.clone());
        value
    }

    pub fn is_cached(&self, args: &A) -> bool {
        self.cache.store.borrow().contains(&encode_key(args))
    }

    /// Empties the store. Always returns `true`.
    pub fn clear_cache(&self) -> bool {
        self.cache.store.borrow_mut().clear()
    }

    pub fn len(&self) -> usize {
        self.cache.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.store.borrow().is_empty()
    }

    pub fn stats(&self) -> MemoStats {
        self.cache.stats.get()
    }
}

/// Memoizes a computation that can fail. Only `Ok` results are stored;
/// an `Err` goes back to the caller and the next call computes again.
pub struct FallibleMemo<A, R, E> {
    f: Box<dyn Fn(A) -> Result<R, E>>,
    cache: MemoStore<R>,
    _err: PhantomData<fn() -> E>,
}

impl<A: CacheKey, R: Clone, E> FallibleMemo<A, R, E> {
    pub fn new(f: impl Fn(A) -> Result<R, E> + 'static, options: MemoOptions) -> Self {
        Self {
            f: Box::new(f),
            cache: MemoStore::new(options),
            _err: PhantomData,
        }
    }

    pub fn call(&self, args: A) -> Result<R, E> {
        let key = encode_key(&args);
        if let Some(hit) = self.cache.lookup(&key) {
            return Ok(hit);
        }
        let value = (self.f)(args)?;
        self.cache.store(key, value.clone());
        Ok(value)
    }

    pub fn is_cached(&self, args: &A) -> bool {
        self.cache.store.borrow().contains(&encode_key(args))
    }

    pub fn clear_cache(&self) -> bool {
        self.cache.store.borrow_mut().clear()
    }

    pub fn len(&self) -> usize {
        self.cache.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.store.borrow().is_empty()
    }

    pub fn stats(&self) -> MemoStats {
        self.cache.stats.get()
    }
}

pub fn memoize<A: CacheKey, R: Clone>(f: impl Fn(A) -> R + 'static) -> Memo<A, R> {
    Memo::new(f, MemoOptions::default())
}

pub fn memoize_with<A: CacheKey, R: Clone>(
    f: impl Fn(A) -> R + 'static,
    options: MemoOptions,
) -> Memo<A, R> {
    Memo::new(f, options)
}

pub fn memoize_fallible<A: CacheKey, R: Clone, E>(
    f: impl Fn(A) -> Result<R, E> + 'static,
    options: MemoOptions,
) -> FallibleMemo<A, R, E> {
    FallibleMemo::new(f, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counted<A: 'static, R: 'static>(
        f: impl Fn(A) -> R + 'static,
    ) -> (Rc<Cell<usize>>, impl Fn(A) -> R + 'static) {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        (calls, move |a| {
            c.set(c.get() + 1);
            f(a)
        })
    }

    #[test]
    fn test_memoize_results() {
        let (calls, add) = counted(|(a, b): (i32, i32)| a + b);
        let add = memoize(add);

        assert_eq!(add.call((1, 2)), 3);
        assert_eq!(add.call((1, 2)), 3);
        assert_eq!(add.call((2, 3)), 5);
        assert_eq!(calls.get(), 2);
        assert_eq!(
            add.stats(),
            MemoStats {
                hits: 1,
                misses: 2,
                evictions: 0
            }
        );
    }

    #[test]
    fn test_max_size_evicts_first_inserted() {
        let (calls, mul) = counted(|(a, b): (i32, i32)| a * b);
        let mul = memoize_with(mul, MemoOptions::default().max_size(2));

        assert_eq!(mul.call((1, 1)), 1);
        assert_eq!(mul.call((2, 2)), 4);
        assert_eq!(calls.get(), 2);

        assert_eq!(mul.call((3, 3)), 9);
        assert_eq!(calls.get(), 3);
        assert!(!mul.is_cached(&(1, 1)));

        // (1, 1) was evicted and computes again, pushing (2, 2) out next
        assert_eq!(mul.call((1, 1)), 1);
        assert_eq!(calls.get(), 4);
        assert_eq!(mul.call((3, 3)), 9);
        assert_eq!(calls.get(), 4);
        assert_eq!(mul.len(), 2);
        assert_eq!(mul.stats().evictions, 2);
    }

    #[test]
    fn test_hits_do_not_refresh_position() {
        let (calls, id) = counted(|x: u32| x);
        let memo = memoize_with(id, MemoOptions::default().max_size(2));
        memo.call(1);
        memo.call(2);
        memo.call(1); // hit; still the oldest
        memo.call(3);
        assert!(!memo.is_cached(&1));
        assert!(memo.is_cached(&2));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_clear_cache() {
        let (calls, sub) = counted(|(a, b): (i32, i32)| a - b);
        let sub = memoize(sub);

        assert_eq!(sub.call((5, 2)), 3);
        assert_eq!(sub.call((5, 2)), 3);
        assert_eq!(calls.get(), 1);

        assert!(sub.clear_cache());
        assert!(sub.is_empty());

        assert_eq!(sub.call((5, 2)), 3);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_zero_argument_calls_share_one_entry() {
        let (calls, answer) = counted(|(): ()| 42);
        let answer = memoize(answer);
        assert_eq!(answer.call(()), 42);
        assert_eq!(answer.call(()), 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(answer.len(), 1);
    }

    #[test]
    fn test_string_arguments() {
        let (calls, shout) = counted(|s: String| s.to_uppercase());
        let shout = memoize(shout);
        assert_eq!(shout.call("hi".to_string()), "HI");
        assert_eq!(shout.call(String::from("hi")), "HI");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let (calls, parse) = counted(|s: String| s.parse::<i32>());
        let parse = memoize_fallible(parse, MemoOptions::default());

        assert!(parse.call("x".to_string()).is_err());
        assert!(parse.call("x".to_string()).is_err());
        assert_eq!(calls.get(), 2);
        assert!(parse.is_empty());

        assert_eq!(parse.call("7".to_string()), Ok(7));
        assert_eq!(parse.call("7".to_string()), Ok(7));
        assert_eq!(calls.get(), 3);
        assert!(parse.is_cached(&"7".to_string()));
    }

    #[test]
    fn test_panic_stores_nothing() {
        let memo = memoize(|x: i32| {
            if x < 0 {
                panic!("negative");
            }
            x
        });
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| memo.call(-1)));
        assert!(res.is_err());
        assert!(memo.is_empty());
        assert_eq!(memo.call(1), 1);
    }
}
