//! Argument-list encoding for memoization keys.
//!
//! A memo key is `"<arity>|<parts>"`. Each part carries a type tag and
//! strings are length-prefixed, so `("1+2",)` and `(1, 2)` never collide,
//! while equal argument lists always produce the same key.

use std::fmt::Write;

/// Writes the structural form of one value into a [`KeyEncoder`].
///
/// Implement this for your own argument types to memoize over them:
///
/// ```rust
/// use hookline_core::{CacheKey, KeyEncoder, encode_key};
///
/// struct UserId(u64);
///
/// impl CacheKey for UserId {
///     fn encode(&self, enc: &mut KeyEncoder) {
///         enc.tag("user");
///         enc.write_uint(self.0 as u128);
///     }
/// }
///
/// assert_eq!(encode_key(&UserId(7)), encode_key(&UserId(7)));
/// ```
pub trait CacheKey {
    fn encode(&self, enc: &mut KeyEncoder);

    /// Number of call arguments this value stands for. Tuples report their
    /// length, `()` reports zero, everything else is a single argument.
    fn arity(&self) -> usize {
        1
    }
}

#[derive(Default, Debug)]
pub struct KeyEncoder {
    buf: String,
}

impl KeyEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_int(&mut self, v: i128) {
        let _ = write!(self.buf, "i{v};");
    }

    pub fn write_uint(&mut self, v: u128) {
        let _ = write!(self.buf, "u{v};");
    }

    pub fn write_float(&mut self, v: f64) {
        // -0.0 == 0.0 structurally
        let v = if v == 0.0 { 0.0 } else { v };
        let _ = write!(self.buf, "f{v:?};");
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push_str(if v { "T;" } else { "F;" });
    }

    pub fn write_str(&mut self, v: &str) {
        let _ = write!(self.buf, "s{}:{v};", v.len());
    }

    pub fn write_none(&mut self) {
        self.buf.push_str("N;");
    }

    /// Opens a sequence of `len` nested parts.
    pub fn begin_seq(&mut self, len: usize) {
        let _ = write!(self.buf, "[{len}");
    }

    pub fn end_seq(&mut self) {
        self.buf.push(']');
    }

    /// Writes a free-form type tag; use it to keep distinct user types apart.
    pub fn tag(&mut self, name: &str) {
        let _ = write!(self.buf, "#{}:{name}", name.len());
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Encodes a full argument list into its cache key.
pub fn encode_key<A: CacheKey + ?Sized>(args: &A) -> String {
    let mut enc = KeyEncoder::new();
    let _ = write!(enc.buf, "{}|", args.arity());
    args.encode(&mut enc);
    enc.finish()
}

macro_rules! signed_key {
    ($($t:ty),*) => {$(
        impl CacheKey for $t {
            fn encode(&self, enc: &mut KeyEncoder) {
                enc.write_int(*self as i128);
            }
        }
    )*};
}

macro_rules! unsigned_key {
    ($($t:ty),*) => {$(
        impl CacheKey for $t {
            fn encode(&self, enc: &mut KeyEncoder) {
                enc.write_uint(*self as u128);
            }
        }
    )*};
}

signed_key!(i8, i16, i32, i64, i128, isize);
unsigned_key!(u8, u16, u32, u64, u128, usize);

impl CacheKey for f32 {
    fn encode(&self, enc: &mut KeyEncoder) {
        enc.write_float(*self as f64);
    }
}

impl CacheKey for f64 {
    fn encode(&self, enc: &mut KeyEncoder) {
        enc.write_float(*self);
    }
}

impl CacheKey for bool {
    fn encode(&self, enc: &mut KeyEncoder) {
        enc.write_bool(*self);
    }
}

impl CacheKey for char {
    fn encode(&self, enc: &mut KeyEncoder) {
        let mut buf = [0u8; 4];
        enc.write_str(self.encode_utf8(&mut buf));
    }
}

impl CacheKey for str {
    fn encode(&self, enc: &mut KeyEncoder) {
        enc.write_str(self);
    }
}

impl CacheKey for String {
    fn encode(&self, enc: &mut KeyEncoder) {
        enc.write_str(self);
    }
}

impl<T: CacheKey + ?Sized> CacheKey for &T {
    fn encode(&self, enc: &mut KeyEncoder) {
        (**self).encode(enc);
    }

    fn arity(&self) -> usize {
        (**self).arity()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for Box<T> {
    fn encode(&self, enc: &mut KeyEncoder) {
        (**self).encode(enc);
    }

    fn arity(&self) -> usize {
        (**self).arity()
    }
}

impl<T: CacheKey> CacheKey for Option<T> {
    fn encode(&self, enc: &mut KeyEncoder) {
        match self {
            Some(v) => {
                enc.begin_seq(1);
                v.encode(enc);
                enc.end_seq();
            }
            None => enc.write_none(),
        }
    }
}

impl<T: CacheKey> CacheKey for [T] {
    fn encode(&self, enc: &mut KeyEncoder) {
        enc.begin_seq(self.len());
        for v in self {
            v.encode(enc);
        }
        enc.end_seq();
    }
}

impl<T: CacheKey, const N: usize> CacheKey for [T; N] {
    fn encode(&self, enc: &mut KeyEncoder) {
        self.as_slice().encode(enc);
    }
}

impl<T: CacheKey> CacheKey for Vec<T> {
    fn encode(&self, enc: &mut KeyEncoder) {
        self.as_slice().encode(enc);
    }
}

impl CacheKey for () {
    fn encode(&self, _enc: &mut KeyEncoder) {}

    fn arity(&self) -> usize {
        0
    }
}

macro_rules! tuple_key {
    ($len:expr; $($name:ident),+) => {
        impl<$($name: CacheKey),+> CacheKey for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode(&self, enc: &mut KeyEncoder) {
                let ($($name,)+) = self;
                $($name.encode(enc);)+
            }

            fn arity(&self) -> usize {
                $len
            }
        }
    };
}

tuple_key!(1; A);
tuple_key!(2; A, B);
tuple_key!(3; A, B, C);
tuple_key!(4; A, B, C, D);
tuple_key!(5; A, B, C, D, E);
tuple_key!(6; A, B, C, D, E, F);
tuple_key!(7; A, B, C, D, E, F, G);
tuple_key!(8; A, B, C, D, E, F, G, H);
