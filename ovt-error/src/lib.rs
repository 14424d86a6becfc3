#![deny(missing_docs)]

//! Error type and helper macros shared by the Open Vector Tile crates.
//!
//! Every variant raised by the codec itself captures a [`Backtrace`] at construction; set `RUST_BACKTRACE=1` to populate it.
//! The codec is pure, so every error means "this input (or this tile) is corrupt" and none of
//! them are retryable.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// Same type as `Backtrace`; the alias keeps thiserror from emitting the nightly-only `provide` method.
type CapturedBacktrace = Backtrace;

/// The top-level error type for the Open Vector Tile codec.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum OvtError {
    /// A varint continued past the ten bytes a 64-bit value can occupy.
    #[error("varint starting at byte {0} continues past 10 bytes\nBacktrace:\n{1}")]
    VarintOverflow(usize, CapturedBacktrace),
    /// A field carried a wire type the codec cannot skip.
    #[error("unsupported wire type {0}\nBacktrace:\n{1}")]
    UnsupportedWireType(u8, CapturedBacktrace),
    /// The column cache message carried a field outside the ten column kinds.
    #[error("unknown column kind {0}\nBacktrace:\n{1}")]
    UnknownColumnKind(u64, CapturedBacktrace),
    /// A feature was requested past the end of its layer.
    #[error("feature index {0} out of bounds for a layer of {1} features\nBacktrace:\n{2}")]
    FeatureIndexOutOfBounds(usize, usize, CapturedBacktrace),
    /// A feature blob started with a type outside `1..=6`.
    #[error("unknown feature type {0}\nBacktrace:\n{1}")]
    UnknownFeatureType(u64, CapturedBacktrace),
    /// An extent (raw value or wire code) outside the six legal extents.
    #[error("invalid extent {0}\nBacktrace:\n{1}")]
    InvalidExtent(u64, CapturedBacktrace),
    /// A flat tessellation array whose length is not a whole number of points.
    #[error("tessellation of {0} coordinates does not form whole points\nBacktrace:\n{1}")]
    MalformedTessellation(usize, CapturedBacktrace),
    /// An index was out of bounds.
    #[error("index {0} out of bounds from {1} to {2}\nBacktrace:\n{3}")]
    OutOfBounds(usize, usize, usize, CapturedBacktrace),
    /// An argument supplied by the caller was invalid.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, CapturedBacktrace),
    /// Bytes that could not be decoded.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidSerde(ErrString, CapturedBacktrace),
    /// Two types were expected to match but did not.
    #[error("expected type: {0} but instead got {1}\nBacktrace:\n{2}")]
    MismatchedTypes(ErrString, ErrString, CapturedBacktrace),
    /// An internal assertion did not hold.
    #[error("{0}\nBacktrace:\n{1}")]
    AssertionFailed(ErrString, CapturedBacktrace),
    /// Wraps another error with a message describing where it happened.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<OvtError>),
    /// An I/O error. It keeps the source's own context and carries no backtrace.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A legacy tile that prost could not decode.
    #[cfg(feature = "prost")]
    #[error(transparent)]
    ProstDecode(#[from] prost::DecodeError),
}

impl OvtError {
    /// Adds information about the context of an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        OvtError::Context(msg.into(), Box::new(self))
    }
}

impl Debug for OvtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return [`OvtError`]s as their error type.
pub type OvtResult<T> = Result<T, OvtError>;

/// A trait for unwrapping an [`OvtResult`].
pub trait OvtUnwrap {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug.
    fn ovt_unwrap(self) -> Self::Output;
}

impl<T, E> OvtUnwrap for Result<T, E>
where
    E: Into<OvtError>,
{
    type Output = T;

    #[inline(always)]
    #[track_caller]
    fn ovt_unwrap(self) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|err| crate::ovt_panic!(err))
    }
}

/// A trait for expect-ing an [`OvtResult`] or an [`Option`].
pub trait OvtExpect {
    /// The type of the value being expected.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error and the
    /// given message. Should be called only in contexts where the error condition represents
    /// a bug.
    fn ovt_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> OvtExpect for Result<T, E>
where
    E: Into<OvtError>,
{
    type Output = T;

    #[inline(always)]
    #[track_caller]
    fn ovt_expect(self, msg: &str) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|e| crate::ovt_panic!(e.with_context(msg.to_string())))
    }
}

impl<T> OvtExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    #[track_caller]
    fn ovt_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            crate::ovt_panic!(OvtError::AssertionFailed(
                msg.to_string().into(),
                Backtrace::capture()
            ))
        })
    }
}

#[doc(hidden)]
#[cold]
#[track_caller]
#[allow(clippy::panic)]
pub fn __panic(err: OvtError) -> ! {
    panic!("{}", err)
}

/// A convenient macro for creating an [`OvtError`].
#[macro_export]
macro_rules! ovt_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        $crate::OvtError::OutOfBounds($idx, $start, $stop, std::backtrace::Backtrace::capture())
    }};
    (VarintOverflow: $offset:expr) => {{
        $crate::OvtError::VarintOverflow($offset, std::backtrace::Backtrace::capture())
    }};
    (UnsupportedWireType: $code:expr) => {{
        $crate::OvtError::UnsupportedWireType($code, std::backtrace::Backtrace::capture())
    }};
    (UnknownColumnKind: $tag:expr) => {{
        $crate::OvtError::UnknownColumnKind($tag, std::backtrace::Backtrace::capture())
    }};
    (FeatureIndexOutOfBounds: $idx:expr, $len:expr) => {{
        $crate::OvtError::FeatureIndexOutOfBounds($idx, $len, std::backtrace::Backtrace::capture())
    }};
    (UnknownFeatureType: $tag:expr) => {{
        $crate::OvtError::UnknownFeatureType($tag, std::backtrace::Backtrace::capture())
    }};
    (InvalidExtent: $value:expr) => {{
        $crate::OvtError::InvalidExtent($value, std::backtrace::Backtrace::capture())
    }};
    (MalformedTessellation: $len:expr) => {{
        $crate::OvtError::MalformedTessellation($len, std::backtrace::Backtrace::capture())
    }};
    (MismatchedTypes: $expected:expr, $actual:expr) => {{
        $crate::OvtError::MismatchedTypes(
            $expected.to_string().into(),
            $actual.to_string().into(),
            std::backtrace::Backtrace::capture(),
        )
    }};
    (Context: $msg:literal, $err:expr) => {{
        $crate::OvtError::Context($msg.into(), Box::new($err))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::OvtError::$variant(
            format!($fmt $(, $arg)*).into(),
            std::backtrace::Backtrace::capture(),
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::ovt_err!(InvalidArgument: $fmt $(, $arg)*)
    };
}

/// A convenient macro for returning an [`OvtError`].
#[macro_export]
macro_rules! ovt_bail {
    ($($tt:tt)+) => {
        return Err($crate::ovt_err!($($tt)+))
    };
}

/// A convenient macro for panicking with an [`OvtError`] in the presence of a programmer error
/// (e.g., an invariant has been violated).
#[macro_export]
macro_rules! ovt_panic {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__panic($crate::ovt_err!(AssertionFailed: $fmt $(, $arg)*))
    };
    ($err:expr) => {{
        let err: $crate::OvtError = $err;
        $crate::__panic(err)
    }};
}
