//! Translation of libFLAC status codes into readable strings.
//!
//! libFLAC exports one `const char *const []` table per status enum. The
//! bindings declare them as zero-length arrays, so they are indexed through a
//! raw pointer rather than a slice.

use libc::c_char;
use libflac_sys as ffi;
use std::ffi::CStr;

/// Read entry `index` of a libFLAC status string table.
///
/// # Safety
///
/// `table` must be one of libFLAC's status string tables and `last` the
/// highest value of the matching status enum.
unsafe fn table_entry(table: *const *const c_char, index: usize, last: usize) -> String {
    if index > last {
        return format!("unknown status {}", index);
    }
    let entry = *table.add(index);
    if entry.is_null() {
        return format!("unknown status {}", index);
    }
    CStr::from_ptr(entry).to_string_lossy().into_owned()
}

pub(crate) fn decoder_error_status(status: ffi::FLAC__StreamDecoderErrorStatus) -> String {
    unsafe {
        table_entry(
            std::ptr::addr_of!(ffi::FLAC__StreamDecoderErrorStatusString) as *const *const c_char,
            status as usize,
            ffi::FLAC__STREAM_DECODER_ERROR_STATUS_UNPARSEABLE_STREAM as usize,
        )
    }
}

pub(crate) fn decoder_state(state: ffi::FLAC__StreamDecoderState) -> String {
    unsafe {
        table_entry(
            std::ptr::addr_of!(ffi::FLAC__StreamDecoderStateString) as *const *const c_char,
            state as usize,
            ffi::FLAC__STREAM_DECODER_UNINITIALIZED as usize,
        )
    }
}

pub(crate) fn decoder_init_status(status: ffi::FLAC__StreamDecoderInitStatus) -> String {
    unsafe {
        table_entry(
            std::ptr::addr_of!(ffi::FLAC__StreamDecoderInitStatusString) as *const *const c_char,
            status as usize,
            ffi::FLAC__STREAM_DECODER_INIT_STATUS_ALREADY_INITIALIZED as usize,
        )
    }
}

pub(crate) fn encoder_state(state: ffi::FLAC__StreamEncoderState) -> String {
    unsafe {
        table_entry(
            std::ptr::addr_of!(ffi::FLAC__StreamEncoderStateString) as *const *const c_char,
            state as usize,
            ffi::FLAC__STREAM_ENCODER_MEMORY_ALLOCATION_ERROR as usize,
        )
    }
}

pub(crate) fn encoder_init_status(status: ffi::FLAC__StreamEncoderInitStatus) -> String {
    unsafe {
        table_entry(
            std::ptr::addr_of!(ffi::FLAC__StreamEncoderInitStatusString) as *const *const c_char,
            status as usize,
            ffi::FLAC__STREAM_ENCODER_INIT_STATUS_ALREADY_INITIALIZED as usize,
        )
    }
}
