//! Per-descriptor encoding state.
//!
//! A descriptor is in exactly one [`EncodingMode`]:
//!
//! - `AutoConvert` (default): untagged; the platform's ambient conversion
//!   decides. Descriptors inherited from before the shim attached start here.
//! - `Binary`: bytes move untouched and carry no CCSID.
//! - `TextPinned(ccsid)`: text in an explicit codepage.
//!
//! Independently of the mode, a descriptor may have auto-conversion disabled,
//! which exempts it from any ambient conversion. The flag is a separate axis
//! and survives mode changes.

mod codeset;
mod registry;
mod table;

pub use codeset::{CodesetResolver, CodesetTable};
pub use registry::{AssumeOpen, CcsidRegistry, DescriptorOracle};
pub use table::MAX_TRACKED_FD;

use std::fmt;

use crate::error::CcsidError;

/// Text flag bit of a packed tag word.
pub const TAG_TEXT_FLAG: u32 = 0x1_0000;
/// CCSID field of a packed tag word.
pub const TAG_CCSID_MASK: u32 = 0xffff;
/// CCSID value the platform uses to mark binary data.
pub const BINARY_CCSID: u16 = 0xffff;

/// A coded character set identifier that can pin a descriptor.
///
/// Zero (untagged) and `0xffff` (binary) are markers, not codepages, and are
/// not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ccsid(u16);

impl Ccsid {
    pub const IBM_037: Self = Self(37);
    pub const ISO8859_1: Self = Self(819);
    pub const IBM_1047: Self = Self(1047);
    pub const UTF_8: Self = Self(1208);

    /// Validate a raw CCSID.
    #[must_use]
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 || raw == BINARY_CCSID {
            None
        } else {
            Some(Self(raw))
        }
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Ccsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Primary conversion mode of a descriptor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingMode {
    #[default]
    AutoConvert,
    Binary,
    TextPinned(Ccsid),
}

impl EncodingMode {
    /// The pinned CCSID, if any.
    #[must_use]
    pub const fn ccsid(self) -> Option<Ccsid> {
        match self {
            Self::TextPinned(ccsid) => Some(ccsid),
            Self::AutoConvert | Self::Binary => None,
        }
    }

    /// Pack into the platform tag word: CCSID in the low 16 bits, text flag
    /// in bit 16. Untagged is 0 and binary is `0xffff` without the flag.
    #[must_use]
    pub const fn to_tag(self) -> u32 {
        match self {
            Self::AutoConvert => 0,
            Self::Binary => BINARY_CCSID as u32,
            Self::TextPinned(ccsid) => TAG_TEXT_FLAG | ccsid.0 as u32,
        }
    }

    /// Decode a packed tag word.
    ///
    /// A CCSID field of 0 untags, `0xffff` selects binary, anything else pins
    /// text whether or not the text flag is set.
    pub fn from_tag(word: u32) -> Result<Self, CcsidError> {
        if word & !(TAG_TEXT_FLAG | TAG_CCSID_MASK) != 0 {
            return Err(CcsidError::InvalidCcsid(word));
        }
        let raw = (word & TAG_CCSID_MASK) as u16;
        Ok(match raw {
            0 => Self::AutoConvert,
            BINARY_CCSID => Self::Binary,
            _ => Self::TextPinned(Ccsid(raw)),
        })
    }
}

/// Tracked state of one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingState {
    pub fd: i32,
    pub mode: EncodingMode,
    /// Exempts the descriptor from ambient conversion regardless of `mode`.
    pub auto_convert_disabled: bool,
}

impl EncodingState {
    /// State of a descriptor the registry has never seen.
    #[must_use]
    pub const fn untracked(fd: i32) -> Self {
        Self {
            fd,
            mode: EncodingMode::AutoConvert,
            auto_convert_disabled: false,
        }
    }
}

/// What a read or write on a descriptor must do with the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPlan {
    /// Move bytes untouched.
    Raw,
    /// Transcode between the descriptor's CCSID and the program's.
    Transcode { file: Ccsid, program: Ccsid },
    /// Defer to the platform's ambient auto-conversion.
    Ambient,
}

impl TransferPlan {
    /// Decide the plan for a descriptor state.
    #[must_use]
    pub fn for_state(state: &EncodingState, program: Ccsid, ambient_autocvt: bool) -> Self {
        if state.auto_convert_disabled {
            return Self::Raw;
        }
        match state.mode {
            EncodingMode::Binary => Self::Raw,
            EncodingMode::TextPinned(file) if file == program => Self::Raw,
            EncodingMode::TextPinned(file) => Self::Transcode { file, program },
            EncodingMode::AutoConvert if ambient_autocvt => Self::Ambient,
            EncodingMode::AutoConvert => Self::Raw,
        }
    }

    #[must_use]
    pub const fn converts(self) -> bool {
        !matches!(self, Self::Raw)
    }
}
