/*!
 * C ABI surface for embedding linetail in other runtimes.
 *
 * One entry point: a string-in, integer-out inode lookup matching the
 * narrow contract of [`crate::inode::get_inode`]. Build the crate as a
 * cdylib and load it from the host runtime's FFI layer; the host is
 * responsible for marshaling the path string and the 64-bit result.
 */

use std::ffi::{c_char, CStr};

use crate::inode;

/// Look up the inode number of the file at `path`.
///
/// `path` must be a NUL-terminated UTF-8 string. Returns the inode
/// number, or `-1` if the path is null, not valid UTF-8, or cannot be
/// statted. No error detail is surfaced beyond the sentinel.
///
/// # Safety
///
/// `path`, if non-null, must point to a NUL-terminated buffer that stays
/// valid for the duration of the call. The borrowed string is released
/// before this function returns, on every path.
#[no_mangle]
pub unsafe extern "C" fn linetail_get_inode(path: *const c_char) -> i64 {
    if path.is_null() {
        return -1;
    }

    let c_str = unsafe { CStr::from_ptr(path) };
    match c_str.to_str() {
        Ok(s) => inode::get_inode(s),
        Err(_) => -1,
    }
}
