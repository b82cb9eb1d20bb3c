//! libFLAC boundary: handle ownership, token registry, callback trampolines
//! and status string translation. Nothing here is public.

pub(crate) mod callbacks;
pub(crate) mod handle;
pub(crate) mod registry;
pub(crate) mod status;
