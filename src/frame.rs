//! # 负载帧模块
//!
//! 负载在写入像素之前会被包装成一个帧：
//!
//! ```text
//! [4 bytes] 负载长度 (小端 u32)
//! [N bytes] 负载原文
//! ```
//!
//! 嵌入前按整帧校验容量，提取时先读出长度并确认其可信，之后才分配输出缓冲区。

use crate::bitmap::PixelGeometry;
use crate::constants::{BITS_PER_BYTE, LENGTH_PREFIX_BYTES};
use crate::cursor::PixelCursor;
use crate::error::{CapacityError, Result, try_zeroed};
use crate::steganography::read_bits;
use log::trace;

/// 为负载加上 4 字节的小端长度前缀。
///
/// # Errors
///
/// * 负载长度超出 `u32` 的表示范围。
/// * 无法为帧分配内存。
pub fn frame_for_embed(payload: &[u8]) -> Result<Vec<u8>> {
    let length =
        u32::try_from(payload.len()).map_err(|_| CapacityError::LengthOverflow(payload.len()))?;
    let frame_length = payload
        .len()
        .checked_add(LENGTH_PREFIX_BYTES)
        .ok_or(CapacityError::LengthOverflow(payload.len()))?;

    let mut frame = try_zeroed(frame_length)?;
    frame[..LENGTH_PREFIX_BYTES].copy_from_slice(&length.to_le_bytes());
    frame[LENGTH_PREFIX_BYTES..].copy_from_slice(payload);
    trace!("framed {} payload bytes into {} bytes", payload.len(), frame_length);

    Ok(frame)
}

/// 确认 `frame_length` 字节的帧能放进 `geometry` 描述的位图。
///
/// 必须在任何写入之前调用：容量不足时位图保持原样。
pub fn check_capacity(frame_length: usize, geometry: &PixelGeometry) -> Result<(), CapacityError> {
    let required = frame_length.checked_mul(BITS_PER_BYTE);
    match required {
        Some(required) if required <= geometry.available_length => Ok(()),
        _ => Err(CapacityError::PayloadTooLarge {
            required: required.unwrap_or(usize::MAX),
            available: geometry.available_length,
            stored: geometry.data_length,
        }),
    }
}

/// 用一个新的游标读出前 32 位，并按小端 `u32` 解释为负载长度。
pub fn read_length_prefix(pixels: &[u8], geometry: &PixelGeometry) -> Result<u32> {
    let prefix_bits = LENGTH_PREFIX_BYTES * BITS_PER_BYTE;
    if geometry.available_length < prefix_bits {
        return Err(CapacityError::NoRoomForPrefix {
            available: geometry.available_length,
        }
        .into());
    }

    let mut cursor = PixelCursor::new(geometry, prefix_bits)?;
    let prefix = read_bits(pixels, &mut cursor, LENGTH_PREFIX_BYTES)?;
    let mut raw = [0u8; LENGTH_PREFIX_BYTES];
    raw.copy_from_slice(&prefix);

    Ok(u32::from_le_bytes(raw))
}

/// 检查提取时读到的长度是否可能来自这张位图。
///
/// 非隐写图像或损坏的数据会给出任意的长度，必须在分配输出缓冲区之前拒绝。
pub fn check_extraction_plausibility(
    declared: u32,
    geometry: &PixelGeometry,
) -> Result<(), CapacityError> {
    let required = (declared as u64 + LENGTH_PREFIX_BYTES as u64) * BITS_PER_BYTE as u64;
    if required > geometry.available_length as u64 {
        return Err(CapacityError::ImplausibleLength {
            declared,
            required,
            available: geometry.available_length,
        });
    }
    Ok(())
}

/// 这张位图最多能隐藏的负载字节数。
pub fn max_payload_len(geometry: &PixelGeometry) -> usize {
    (geometry.available_length / BITS_PER_BYTE).saturating_sub(LENGTH_PREFIX_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::BitmapHeader;

    fn geometry(width: u32, height: u32) -> PixelGeometry {
        PixelGeometry::from_header(&BitmapHeader::rgb24(width, height).unwrap()).unwrap()
    }

    #[test]
    fn frame_starts_with_little_endian_length() {
        let frame = frame_for_embed(b"hello").unwrap();
        assert_eq!(frame, b"\x05\x00\x00\x00hello");
        assert_eq!(frame_for_embed(&[]).unwrap(), vec![0; 4]);
    }

    #[test]
    fn capacity_boundary() {
        // 4x4: 48 个可用字节，正好容纳 6 字节的帧
        let geometry = geometry(4, 4);
        assert!(check_capacity(6, &geometry).is_ok());
        assert_eq!(
            check_capacity(7, &geometry),
            Err(CapacityError::PayloadTooLarge {
                required: 56,
                available: 48,
                stored: 48
            })
        );
    }

    #[test]
    fn capacity_counts_only_usable_bytes() {
        // 13x1: 39 个可用字节，但存储了 40 个字节
        let geometry = geometry(13, 1);
        assert_eq!(geometry.data_length, 40);
        assert!(matches!(
            check_capacity(5, &geometry),
            Err(CapacityError::PayloadTooLarge {
                required: 40,
                available: 39,
                stored: 40
            })
        ));
    }

    #[test]
    fn plausibility_limits() {
        let geometry = geometry(4, 4);
        assert_eq!(max_payload_len(&geometry), 2);
        assert!(check_extraction_plausibility(2, &geometry).is_ok());
        assert!(check_extraction_plausibility(3, &geometry).is_err());
        assert!(check_extraction_plausibility(u32::MAX, &geometry).is_err());
    }

    #[test]
    fn prefix_needs_thirty_two_usable_bytes() {
        let geometry = geometry(2, 2);
        let pixels = vec![0; geometry.data_length];
        assert!(matches!(
            read_length_prefix(&pixels, &geometry),
            Err(crate::error::StegoError::Capacity(
                CapacityError::NoRoomForPrefix { available: 12 }
            ))
        ));
    }

    #[test]
    fn reads_prefix_from_low_bits() {
        let geometry = geometry(11, 1);
        let mut pixels = vec![0xFE; geometry.data_length];
        // 长度 0x0000_0003：最低两位为 1
        pixels[0] |= 1;
        pixels[1] |= 1;
        assert_eq!(read_length_prefix(&pixels, &geometry).unwrap(), 3);
    }
}
