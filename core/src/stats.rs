//! Per-frame replacement statistics
//!
//! Counters are reset by [`DecalSystem::begin_frame`](crate::DecalSystem::begin_frame)
//! and accumulated as cameras render.

use std::fmt;

/// Work done by the replacement pipeline during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Cameras whose passes ran and whose buffers were published
    pub cameras_rendered: u32,
    /// Cameras skipped (blocked, unsupported path, terminated, failed)
    pub cameras_skipped: u32,
    /// Replacement sub-draws issued
    pub replacement_draws: u32,
    /// Eye composites issued
    pub composites: u32,
    /// Cameras whose targets were (re)allocated
    pub reallocations: u32,
}

impl FrameStats {
    pub fn merge(&mut self, other: &FrameStats) {
        self.cameras_rendered += other.cameras_rendered;
        self.cameras_skipped += other.cameras_skipped;
        self.replacement_draws += other.replacement_draws;
        self.composites += other.composites;
        self.reallocations += other.reallocations;
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cameras ({} skipped), {} draws, {} composites, {} reallocations",
            self.cameras_rendered,
            self.cameras_skipped,
            self.replacement_draws,
            self.composites,
            self.reallocations
        )
    }
}
