//! Launch-time interpreter resolution for relocatable installs.
//!
//! Binaries installed under a movable prefix cannot bake an absolute
//! `PT_INTERP` path to a bundled dynamic linker. This crate resolves the
//! right linker when such a binary is started: it follows the invocation
//! symlink to the real ELF image, reads the image's search hint and
//! requested interpreter, expands `$ORIGIN`, and probes a prioritized
//! candidate list (the binary's own directory, the expanded hint, the
//! shared-library cache) for an executable match.
//!
//! Everything up to the final `exec` is a pure value computation ending in a
//! [`launch::LaunchPlan`]; only the binary's `main` replaces the process
//! image.

pub mod cache;
pub mod config;
pub mod elf;
pub mod error;
pub mod launch;
pub mod link_chain;
pub mod locate;
pub mod origin;

#[cfg(test)]
pub(crate) mod testelf;
