//! Length-prefixed UTF-16 strings in module memory
//!
//! A string pointer addresses the first payload byte. The payload byte length
//! is a little-endian `u32` stored in the four bytes before it. Readers trust
//! that length and never scan for a terminator.

use crate::error::{BridgeError, BridgeResult};
use crate::module::ModuleHandle;

/// Class id passed to `__new` when allocating a string
pub const STRING_CLASS_ID: i32 = 2;

/// Size of the length header preceding the payload
pub const LENGTH_HEADER_SIZE: u32 = 4;

/// Largest payload accepted from a module
pub const MAX_STRING_BYTES: usize = 16 * 1024 * 1024;

pub fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn decode_utf16(bytes: &[u8]) -> BridgeResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(BridgeError::InvalidString(format!(
            "odd byte length {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| BridgeError::InvalidString(e.to_string()))
}

/// Read a string through an arbitrary memory reader.
///
/// Shared by the bridge and by host imports, which only see the raw memory.
pub fn read_string_with<F>(ptr: u32, mut read: F) -> BridgeResult<String>
where
    F: FnMut(u32, &mut [u8]) -> BridgeResult<()>,
{
    let header_at = ptr
        .checked_sub(LENGTH_HEADER_SIZE)
        .ok_or(BridgeError::MemoryAccess {
            ptr,
            len: LENGTH_HEADER_SIZE as usize,
        })?;

    let mut header = [0u8; LENGTH_HEADER_SIZE as usize];
    read(header_at, &mut header)?;
    let byte_len = u32::from_le_bytes(header) as usize;

    if byte_len > MAX_STRING_BYTES {
        return Err(BridgeError::InvalidString(format!(
            "length {byte_len} at {ptr:#x} exceeds {MAX_STRING_BYTES} bytes"
        )));
    }
    if byte_len % 2 != 0 {
        return Err(BridgeError::InvalidString(format!(
            "odd byte length {byte_len} at {ptr:#x}"
        )));
    }

    let mut payload = vec![0u8; byte_len];
    read(ptr, &mut payload)?;
    decode_utf16(&payload)
}

pub fn read_string(module: &dyn ModuleHandle, ptr: u32) -> BridgeResult<String> {
    read_string_with(ptr, |offset, buf| module.read(offset, buf))
}

/// Allocate a string in module memory and copy `text` into it.
///
/// The returned pointer is not pinned.
pub fn write_string(module: &mut dyn ModuleHandle, text: &str) -> BridgeResult<u32> {
    let bytes = encode_utf16(text);
    let len = i32::try_from(bytes.len()).map_err(|_| {
        BridgeError::InvalidString(format!("{} bytes is too long to allocate", bytes.len()))
    })?;

    let ptr = module.call("__new", &[len, STRING_CLASS_ID])?;
    if ptr == 0 {
        return Err(BridgeError::NullPointer {
            operation: "__new".to_string(),
        });
    }

    let ptr = ptr as u32;
    module.write(ptr, &bytes)?;
    Ok(ptr)
}
