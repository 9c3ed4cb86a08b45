//! disgate-bot - binaries around the disgate gateway client
//!
//! The library itself lives in `libs/disgate`; this crate only re-exports it
//! for the binaries under `src/bin/`.

pub use disgate;
