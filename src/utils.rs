use std::io;

use crate::traits::BlockDevice;

/// Fills `buffer` with the bytes found at `offset` on the device.
///
/// # Arguments
///
/// - `device`: The device to read from.
/// - `offset`: The byte offset of the first byte to read.
/// - `buffer`: The destination buffer, entirely filled on success.
///
/// # Errors
///
/// Returns an `io::Error` if the read fails, or an `UnexpectedEof` error if the device
/// ends before the buffer could be filled.
pub fn read_exact_at<D: BlockDevice + ?Sized>(
    device: &D,
    offset: u64,
    buffer: &mut [u8],
) -> io::Result<()> {
    let mut filled = 0;

    while filled < buffer.len() {
        match device.read_at(offset + filled as u64, &mut buffer[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "Short read at offset {offset}: {filled} of {} bytes",
                        buffer.len()
                    ),
                ));
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Failed to read at offset {offset}: {err}"),
                ));
            }
        }
    }

    Ok(())
}

/// Extracts a 32-bit unsigned integer from a buffer at a given offset.
///
/// # Panics
///
/// Panics if the slice does not contain enough bytes starting from the offset.
pub fn u32_at(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(
        buffer[offset..offset + 4]
            .try_into()
            .expect("invalid slice"),
    )
}
