//! UTF-16 conversions for the W-suffixed service APIs.

/// Encode a Rust string as a NUL-terminated UTF-16 buffer.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode UTF-16 units up to the first NUL (or the end of the slice).
pub fn from_wide(units: &[u16]) -> String {
    let len = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..len])
}

/// Split a `MULTI_SZ` block (NUL-terminated strings, terminated by an empty
/// string) into its components. Tolerates a block that is missing the final
/// empty terminator.
pub fn split_multi(units: &[u16]) -> Vec<String> {
    let mut out = Vec::new();
    let mut from = 0;
    for (i, &u) in units.iter().enumerate() {
        if u == 0 {
            if i <= from {
                break;
            }
            out.push(String::from_utf16_lossy(&units[from..i]));
            from = i + 1;
        }
    }
    if from < units.len() {
        out.push(String::from_utf16_lossy(&units[from..]));
    }
    out
}

/// Decode a NUL-terminated UTF-16 string the OS owns.
///
/// # Safety
///
/// `ptr` must be null or point to a readable NUL-terminated UTF-16 string.
#[cfg(windows)]
pub unsafe fn from_wide_ptr(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
}

/// Decode a `MULTI_SZ` block the OS owns.
///
/// # Safety
///
/// `ptr` must be null or point to a readable block terminated by an empty
/// string (two consecutive NULs).
#[cfg(windows)]
pub unsafe fn multi_from_wide_ptr(ptr: *const u16) -> Vec<String> {
    if ptr.is_null() {
        return Vec::new();
    }
    let mut len = 0usize;
    loop {
        if *ptr.add(len) == 0 {
            if len == 0 || *ptr.add(len - 1) == 0 {
                break;
            }
        }
        len += 1;
    }
    split_multi(std::slice::from_raw_parts(ptr, len))
}
