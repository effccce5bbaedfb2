//! Shared error plumbing for the flatnav core library.
//!
//! Every public error type carries a stable machine-readable code generated by
//! [`define_error_codes!`] and an [`ErrorKind`] that places it in the coarse
//! taxonomy callers branch on.

use std::fmt;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident
                    $( { $($pattern:tt)* } )?
                    $( ( $($tuple:tt)* ) )?
                    => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(
                        Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )?
                            => $CodeTy::$CodeVariant,
                    )+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Coarse classification shared by every error the core produces.
///
/// Invalid-argument and unsupported-configuration errors indicate caller
/// mistakes and are never retried. Corrupt-data errors abort a load without
/// returning a partially initialised index.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A caller supplied an argument the operation cannot accept.
    InvalidArgument,
    /// Persisted bytes were truncated, inconsistent, or failed verification.
    CorruptData,
    /// A metric, quantization mode, or type identifier was not recognised.
    UnsupportedConfiguration,
    /// The index or an allocation ran out of room.
    ResourceExhausted,
    /// The underlying reader or writer failed.
    Io,
}

impl ErrorKind {
    /// Returns a stable lowercase name for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::CorruptData => "corrupt_data",
            Self::UnsupportedConfiguration => "unsupported_configuration",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
