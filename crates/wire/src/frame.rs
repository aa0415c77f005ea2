// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! Length-prefixed framing for the init string (spec.md §6.4): an
//! ASCII decimal length terminated by `\n`, at most 4 digits, followed
//! by exactly that many payload bytes.

use tbc_core::error::TurbulenceError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum init-string length: 4 ASCII digits, so `9999` is the largest
/// representable length, but spec.md caps the payload itself at 4095
/// bytes.
pub const MAX_FRAME_LEN: usize = 4095;

/// Write `payload` as `"<len>\n" + payload`. Returns `ConfigInvalid` if
/// `payload` exceeds [`MAX_FRAME_LEN`] or the length would need more
/// than 4 digits.
pub async fn write_framed<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &str,
) -> Result<(), TurbulenceError> {
    let len = payload.len();
    if len > MAX_FRAME_LEN {
        return Err(TurbulenceError::ConfigInvalid(format!(
            "init string of {len} bytes exceeds the {MAX_FRAME_LEN}-byte cap"
        )));
    }
    let header = format!("{len}\n");
    if header.len() > 5 {
        return Err(TurbulenceError::ConfigInvalid(
            "init string length does not fit in 4 ASCII digits".to_string(),
        ));
    }
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload.as_bytes()).await?;
    Ok(())
}

/// Read a frame written by [`write_framed`]: a `\n`-terminated ASCII
/// decimal length (at most 4 digits) followed by exactly that many
/// bytes.
pub async fn read_framed<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, TurbulenceError> {
    let mut len_digits = Vec::with_capacity(4);
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).await?;
        if byte[0] == b'\n' {
            break;
        }
        if !byte[0].is_ascii_digit() || len_digits.len() >= 4 {
            return Err(TurbulenceError::ConfigInvalid(
                "init string length header is not a bounded ASCII decimal".to_string(),
            ));
        }
        len_digits.push(byte[0]);
    }

    let len_str = std::str::from_utf8(&len_digits)?;
    let len: usize = len_str
        .parse()
        .map_err(|_| TurbulenceError::ConfigInvalid(format!("bad length header '{len_str}'")))?;
    if len > MAX_FRAME_LEN {
        return Err(TurbulenceError::ConfigInvalid(format!(
            "init string of {len} bytes exceeds the {MAX_FRAME_LEN}-byte cap"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    String::from_utf8(payload).map_err(|e| TurbulenceError::Utf8(e.utf8_error()))
}

/// Synchronous counterpart of [`write_framed`], for the pre-fork and
/// just-post-fork control-socket handshake in `tbc-supervisor`, which
/// runs before either side has a tokio runtime to drive.
pub fn write_framed_sync<W: std::io::Write>(
    writer: &mut W,
    payload: &str,
) -> Result<(), TurbulenceError> {
    let len = payload.len();
    if len > MAX_FRAME_LEN {
        return Err(TurbulenceError::ConfigInvalid(format!(
            "init string of {len} bytes exceeds the {MAX_FRAME_LEN}-byte cap"
        )));
    }
    let header = format!("{len}\n");
    if header.len() > 5 {
        return Err(TurbulenceError::ConfigInvalid(
            "init string length does not fit in 4 ASCII digits".to_string(),
        ));
    }
    writer.write_all(header.as_bytes())?;
    writer.write_all(payload.as_bytes())?;
    Ok(())
}

/// Synchronous counterpart of [`read_framed`].
pub fn read_framed_sync<R: std::io::Read>(reader: &mut R) -> Result<String, TurbulenceError> {
    let mut len_digits = Vec::with_capacity(4);
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        if byte[0] == b'\n' {
            break;
        }
        if !byte[0].is_ascii_digit() || len_digits.len() >= 4 {
            return Err(TurbulenceError::ConfigInvalid(
                "init string length header is not a bounded ASCII decimal".to_string(),
            ));
        }
        len_digits.push(byte[0]);
    }

    let len_str = std::str::from_utf8(&len_digits)?;
    let len: usize = len_str
        .parse()
        .map_err(|_| TurbulenceError::ConfigInvalid(format!("bad length header '{len_str}'")))?;
    if len > MAX_FRAME_LEN {
        return Err(TurbulenceError::ConfigInvalid(format!(
            "init string of {len} bytes exceeds the {MAX_FRAME_LEN}-byte cap"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    String::from_utf8(payload).map_err(|e| TurbulenceError::Utf8(e.utf8_error()))
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
