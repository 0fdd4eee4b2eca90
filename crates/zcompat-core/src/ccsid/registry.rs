//! Descriptor encoding state registry.

use std::sync::Arc;

use parking_lot::RwLock;

use super::table::{FdTable, MAX_TRACKED_FD};
use super::{Ccsid, CodesetResolver, CodesetTable, EncodingMode, EncodingState, TransferPlan};
use crate::config::ShimConfig;
use crate::error::CcsidError;

/// Answers whether a descriptor is currently open in the surrounding I/O layer.
pub trait DescriptorOracle: Send + Sync {
    fn is_open(&self, fd: i32) -> bool;
}

/// Oracle that accepts every non-negative descriptor.
///
/// For embedders without a validity check; range limits still apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeOpen;

impl DescriptorOracle for AssumeOpen {
    fn is_open(&self, fd: i32) -> bool {
        fd >= 0
    }
}

/// Concurrent registry of per-descriptor encoding state.
///
/// State is created lazily: a descriptor nobody has touched reports the
/// default `AutoConvert` state without an entry existing. All mutation happens
/// under one registry-wide write lock, so readers never see a mode from one
/// update paired with a flag from another.
pub struct CcsidRegistry {
    config: Arc<ShimConfig>,
    oracle: Box<dyn DescriptorOracle>,
    codesets: Box<dyn CodesetResolver>,
    table: RwLock<FdTable>,
}

impl std::fmt::Debug for CcsidRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CcsidRegistry")
            .field("config", &self.config)
            .field("tracked", &self.tracked_count())
            .finish_non_exhaustive()
    }
}

impl CcsidRegistry {
    /// Registry with the built-in codeset table and no descriptor validity check.
    #[must_use]
    pub fn new(config: Arc<ShimConfig>) -> Self {
        Self::with_collaborators(config, Box::new(AssumeOpen), Box::new(CodesetTable))
    }

    #[must_use]
    pub fn with_collaborators(
        config: Arc<ShimConfig>,
        oracle: Box<dyn DescriptorOracle>,
        codesets: Box<dyn CodesetResolver>,
    ) -> Self {
        Self {
            config,
            oracle,
            codesets,
            table: RwLock::new(FdTable::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Returns true if `fd` is in range and open per the oracle.
    #[must_use]
    pub fn is_valid(&self, fd: i32) -> bool {
        (0..MAX_TRACKED_FD).contains(&fd) && self.oracle.is_open(fd)
    }

    fn check_open(&self, fd: i32) -> Result<(), CcsidError> {
        if self.is_valid(fd) {
            Ok(())
        } else {
            Err(CcsidError::InvalidDescriptor(fd))
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The pinned CCSID of `fd`, or `None` when untracked or not pinned.
    #[must_use]
    pub fn ccsid(&self, fd: i32) -> Option<Ccsid> {
        self.table.read().get(fd).and_then(|s| s.mode.ccsid())
    }

    /// Current state, or the default state for an untracked descriptor.
    #[must_use]
    pub fn state(&self, fd: i32) -> EncodingState {
        self.table
            .read()
            .get(fd)
            .copied()
            .unwrap_or(EncodingState::untracked(fd))
    }

    #[must_use]
    pub fn mode(&self, fd: i32) -> EncodingMode {
        self.state(fd).mode
    }

    /// Packed tag word (see [`EncodingMode::to_tag`]).
    #[must_use]
    pub fn tag(&self, fd: i32) -> u32 {
        self.mode(fd).to_tag()
    }

    /// How a transfer on `fd` must treat its bytes.
    #[must_use]
    pub fn transfer_plan(&self, fd: i32) -> TransferPlan {
        TransferPlan::for_state(
            &self.state(fd),
            self.config.program_ccsid,
            self.config.ambient_autocvt,
        )
    }

    /// Number of descriptors with a materialised entry.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.table.read().len()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Runs `f` on the state of `fd`, materialising it if absent.
    /// Callers have already checked that `fd` is open.
    fn write_state<F>(&self, fd: i32, f: F) -> Result<(), CcsidError>
    where
        F: FnOnce(&mut EncodingState),
    {
        let mut table = self.table.write();
        let state = table.entry(fd).ok_or(CcsidError::InvalidDescriptor(fd))?;
        f(state);
        Ok(())
    }

    /// The descriptor is checked before `mode` is evaluated, so an invalid
    /// descriptor is reported ahead of an invalid value.
    fn set_mode<F>(&self, fd: i32, mode: F) -> Result<(), CcsidError>
    where
        F: FnOnce() -> Result<EncodingMode, CcsidError>,
    {
        self.check_open(fd)?;
        let mode = mode()?;
        self.write_state(fd, |state| state.mode = mode)
    }

    /// Pin `fd` to text in `raw`.
    pub fn set_ccsid(&self, fd: i32, raw: u16) -> Result<(), CcsidError> {
        self.set_mode(fd, || {
            Ccsid::new(raw)
                .map(EncodingMode::TextPinned)
                .ok_or(CcsidError::InvalidCcsid(u32::from(raw)))
        })
    }

    /// Pin `fd` to the CCSID named by `codeset`.
    pub fn set_ccsid_from_codeset(&self, fd: i32, codeset: &str) -> Result<(), CcsidError> {
        self.set_mode(fd, || {
            self.codesets
                .resolve(codeset)
                .map(EncodingMode::TextPinned)
                .ok_or_else(|| CcsidError::UnknownCodeset(codeset.to_string()))
        })
    }

    /// Pin `fd` to the configured default text CCSID.
    pub fn set_text(&self, fd: i32) -> Result<(), CcsidError> {
        self.set_mode(fd, || Ok(EncodingMode::TextPinned(self.config.text_ccsid)))
    }

    /// Mark `fd` binary, dropping any pinned CCSID.
    pub fn set_binary(&self, fd: i32) -> Result<(), CcsidError> {
        self.set_mode(fd, || Ok(EncodingMode::Binary))
    }

    /// Apply a packed tag word to `fd`.
    pub fn set_tag(&self, fd: i32, word: u32) -> Result<(), CcsidError> {
        self.set_mode(fd, || EncodingMode::from_tag(word))
    }

    /// Exempt `fd` from ambient conversion. The mode is left as is.
    pub fn disable_auto_convert(&self, fd: i32) -> Result<(), CcsidError> {
        self.check_open(fd)?;
        self.write_state(fd, |state| state.auto_convert_disabled = true)
    }

    /// Give `dest` the mode (and CCSID) of `source`.
    ///
    /// An untracked but open source contributes its default `AutoConvert`
    /// mode. The auto-convert disable flag is not copied; `dest` keeps its own.
    pub fn copy_ccsid(&self, source: i32, dest: i32) -> Result<(), CcsidError> {
        self.check_open(source)?;
        self.check_open(dest)?;
        let mut table = self.table.write();
        let mode = table.get(source).map_or(EncodingMode::AutoConvert, |s| s.mode);
        let state = table.entry(dest).ok_or(CcsidError::InvalidDescriptor(dest))?;
        state.mode = mode;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Descriptor lifecycle
    // -----------------------------------------------------------------------

    /// Forget `fd`. Idempotent.
    pub fn notify_closed(&self, fd: i32) {
        self.table.write().remove(fd);
    }

    /// A fresh open returned `fd`; drop whatever a previous holder of that
    /// number left behind.
    pub fn notify_opened(&self, fd: i32) {
        self.table.write().remove(fd);
    }

    /// `new` now refers to the same open file as `old` (dup, dup2, F_DUPFD).
    /// The whole state, disable flag included, follows the duplicate.
    pub fn notify_duplicated(&self, old: i32, new: i32) -> Result<(), CcsidError> {
        self.check_open(old)?;
        self.check_open(new)?;
        if old == new {
            return Ok(());
        }
        let mut table = self.table.write();
        match table.get(old).copied() {
            Some(state) => {
                let slot = table.entry(new).ok_or(CcsidError::InvalidDescriptor(new))?;
                *slot = EncodingState { fd: new, ..state };
            }
            None => {
                table.remove(new);
            }
        }
        Ok(())
    }
}
