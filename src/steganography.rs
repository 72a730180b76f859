//! # 隐写核心模块
//!
//! 按位打包/解包，以及建立在其上的两阶段嵌入与提取流程：
//! 先按完整长度校验容量，再做一次线性的读写遍历。任一校验失败都不会触碰像素。

use crate::bitmap::Bitmap;
use crate::constants::{BITS_PER_BYTE, LENGTH_PREFIX_BYTES};
use crate::cursor::PixelCursor;
use crate::error::{CapacityError, Result, try_zeroed};
use crate::frame::{
    check_capacity, check_extraction_plausibility, frame_for_embed, max_payload_len,
    read_length_prefix,
};
use log::{debug, info};

/// 把 `source` 的每一位依次写入游标所指字节的最低位，低位在前。
///
/// 目标字节的第 1–7 位保持不变。
pub fn write_bits(
    pixels: &mut [u8],
    cursor: &mut PixelCursor,
    source: &[u8],
) -> Result<(), CapacityError> {
    for &byte in source {
        for bit in 0..BITS_PER_BYTE {
            let offset = cursor.next().ok_or(CapacityError::CursorExhausted)?;
            pixels[offset] = (pixels[offset] & 0xFE) | ((byte >> bit) & 1);
        }
    }
    Ok(())
}

/// `write_bits` 的逆操作：每 8 个游标位置的最低位组成一个字节，低位在前。
pub fn read_bits(pixels: &[u8], cursor: &mut PixelCursor, count: usize) -> Result<Vec<u8>> {
    let mut bytes = try_zeroed(count)?;
    for byte in bytes.iter_mut() {
        for bit in 0..BITS_PER_BYTE {
            let offset = cursor.next().ok_or(CapacityError::CursorExhausted)?;
            *byte |= (pixels[offset] & 1) << bit;
        }
    }
    Ok(bytes)
}

/// 将 `payload` 连同长度前缀嵌入位图的像素缓冲区。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误，此时位图不会被修改：
/// * 负载长度超出 32 位。
/// * 位图没有足够的可用字节容纳整帧。
/// * 无法为帧分配内存。
pub fn embed(bitmap: &mut Bitmap, payload: &[u8]) -> Result<()> {
    let frame = frame_for_embed(payload)?;
    let geometry = *bitmap.geometry();
    check_capacity(frame.len(), &geometry)?;

    let mut cursor = PixelCursor::new(&geometry, frame.len() * BITS_PER_BYTE)?;
    write_bits(bitmap.pixels_mut(), &mut cursor, &frame)?;

    info!(
        "embedded {} bytes using {} of {} usable color bytes",
        payload.len(),
        frame.len() * BITS_PER_BYTE,
        geometry.available_length
    );
    Ok(())
}

/// 从位图中提取之前嵌入的负载。
///
/// # Errors
///
/// * 位图的可用字节不足以容纳长度前缀。
/// * 读到的长度与位图容量不符 (图像未经隐写或已损坏)。
/// * 无法为输出分配内存。
pub fn extract(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let geometry = bitmap.geometry();
    let declared = read_length_prefix(bitmap.pixels(), geometry)?;
    debug!("declared payload length: {declared} bytes");
    check_extraction_plausibility(declared, geometry)?;

    let frame_length = declared as usize + LENGTH_PREFIX_BYTES;
    let mut cursor = PixelCursor::new(geometry, frame_length * BITS_PER_BYTE)?;
    let mut frame = read_bits(bitmap.pixels(), &mut cursor, frame_length)?;
    frame.drain(..LENGTH_PREFIX_BYTES);

    info!("extracted {} bytes", frame.len());
    Ok(frame)
}

/// 这张位图最多能隐藏的负载字节数。
pub fn capacity(bitmap: &Bitmap) -> usize {
    max_payload_len(bitmap.geometry())
}

/// 对完整的位图文件字节执行嵌入，返回输出文件的字节。
pub fn embed_file_bytes(bitmap_bytes: Vec<u8>, payload: &[u8]) -> Result<Vec<u8>> {
    let mut bitmap = Bitmap::parse(bitmap_bytes)?;
    embed(&mut bitmap, payload)?;
    bitmap.into_bytes()
}

/// 从完整的位图文件字节中提取负载。
pub fn extract_file_bytes(bitmap_bytes: Vec<u8>) -> Result<Vec<u8>> {
    extract(&Bitmap::parse(bitmap_bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::blank_bitmap;
    use crate::constants::BMP_HEADER_SIZE;
    use crate::error::StegoError;
    use proptest::prelude::*;

    #[test]
    fn write_bits_touches_only_the_lowest_bit() {
        let bitmap = Bitmap::parse(blank_bitmap(3, 1, 0b1010_1010).unwrap()).unwrap();
        let mut pixels = bitmap.pixels().to_vec();
        let mut cursor = PixelCursor::new(bitmap.geometry(), 8).unwrap();
        write_bits(&mut pixels, &mut cursor, &[0b0000_0101]).unwrap();

        assert_eq!(
            &pixels[..8],
            &[0xAB, 0xAA, 0xAB, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]
        );
        assert_eq!(pixels[8], 0xAA);
    }

    #[test]
    fn write_bits_reports_exhausted_cursor() {
        let bitmap = Bitmap::parse(blank_bitmap(3, 1, 0).unwrap()).unwrap();
        let mut pixels = bitmap.pixels().to_vec();
        let mut cursor = PixelCursor::new(bitmap.geometry(), 4).unwrap();
        assert_eq!(
            write_bits(&mut pixels, &mut cursor, &[0xFF]),
            Err(CapacityError::CursorExhausted)
        );
    }

    #[test]
    fn single_byte_round_trip() {
        let output = embed_file_bytes(blank_bitmap(4, 4, 0x7F).unwrap(), &[0x41]).unwrap();
        assert_eq!(extract_file_bytes(output).unwrap(), vec![0x41]);
    }

    #[test]
    fn two_by_two_bitmap_is_too_small_for_any_frame() {
        let result = embed_file_bytes(blank_bitmap(2, 2, 0).unwrap(), &[0x41]);
        assert!(matches!(
            result,
            Err(StegoError::Capacity(CapacityError::PayloadTooLarge {
                required: 40,
                available: 12,
                stored: 16
            }))
        ));
    }

    #[test]
    fn empty_payload_round_trip() {
        let output = embed_file_bytes(blank_bitmap(4, 4, 0xFF).unwrap(), &[]).unwrap();
        assert_eq!(extract_file_bytes(output).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn capacity_failure_leaves_pixels_untouched() {
        let mut bitmap = Bitmap::parse(blank_bitmap(4, 4, 0x33).unwrap()).unwrap();
        let before = bitmap.pixels().to_vec();
        assert!(embed(&mut bitmap, &[1, 2, 3]).is_err());
        assert_eq!(bitmap.pixels(), &before[..]);
    }

    #[test]
    fn padding_bytes_are_never_modified() {
        let mut bytes = blank_bitmap(10, 6, 0x00).unwrap();
        for row in bytes[BMP_HEADER_SIZE..].chunks_exact_mut(32) {
            row[30..].fill(0xAA);
        }
        let original = bytes.clone();

        let mut bitmap = Bitmap::parse(bytes).unwrap();
        let payload = vec![0xFF; capacity(&bitmap)];
        embed(&mut bitmap, &payload).unwrap();
        let output = bitmap.into_bytes().unwrap();

        for (row, original_row) in output[BMP_HEADER_SIZE..]
            .chunks_exact(32)
            .zip(original[BMP_HEADER_SIZE..].chunks_exact(32))
        {
            assert_eq!(&row[30..], &original_row[30..]);
        }
        assert_eq!(&output[..BMP_HEADER_SIZE], &original[..BMP_HEADER_SIZE]);
    }

    #[test]
    fn rejects_implausible_declared_length() {
        // 所有最低位都是 1，读出的长度为 u32::MAX
        let bytes = blank_bitmap(8, 8, 0xFF).unwrap();
        assert!(matches!(
            extract_file_bytes(bytes),
            Err(StegoError::Capacity(CapacityError::ImplausibleLength {
                declared: u32::MAX,
                ..
            }))
        ));
    }

    #[test]
    fn accepts_declared_length_at_the_limit() {
        let mut bitmap = Bitmap::parse(blank_bitmap(4, 4, 0).unwrap()).unwrap();
        let geometry = *bitmap.geometry();
        let mut cursor = PixelCursor::new(&geometry, 32).unwrap();
        write_bits(bitmap.pixels_mut(), &mut cursor, &2u32.to_le_bytes()).unwrap();
        assert_eq!(extract(&bitmap).unwrap(), vec![0, 0]);

        let mut cursor = PixelCursor::new(&geometry, 32).unwrap();
        write_bits(bitmap.pixels_mut(), &mut cursor, &3u32.to_le_bytes()).unwrap();
        assert!(extract(&bitmap).is_err());
    }

    #[test]
    fn pixels_after_a_gap_keep_everything_before_data_offset() {
        // 在头部和像素之间插入 8 个字节，像素从偏移 62 开始
        let blank = blank_bitmap(10, 2, 0x5A).unwrap();
        let mut bytes = blank[..BMP_HEADER_SIZE].to_vec();
        bytes.extend_from_slice(&[0xC3; 8]);
        bytes.extend_from_slice(&blank[BMP_HEADER_SIZE..]);
        let file_size = bytes.len() as u32;
        bytes[2..6].copy_from_slice(&file_size.to_le_bytes());
        bytes[10..14].copy_from_slice(&62u32.to_le_bytes());

        let bitmap = Bitmap::parse(bytes.clone()).unwrap();
        assert_eq!(bitmap.geometry().pixel_range(), 62..126);
        assert_eq!(capacity(&bitmap), 3);

        let output = embed_file_bytes(bytes.clone(), &[1, 2, 3]).unwrap();
        assert_eq!(output.len(), bytes.len());
        assert_eq!(&output[..62], &bytes[..62]);
        assert_eq!(extract_file_bytes(output).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn payload_filling_every_usable_byte_round_trips() {
        // 4x4 共 48 个可用字节，恰好容纳 4 字节前缀加 2 字节负载
        let bytes = blank_bitmap(4, 4, 0x80).unwrap();
        let output = embed_file_bytes(bytes.clone(), &[0xAB, 0xCD]).unwrap();
        assert_eq!(extract_file_bytes(output).unwrap(), vec![0xAB, 0xCD]);

        assert!(matches!(
            embed_file_bytes(bytes, &[0xAB, 0xCD, 0xEF]),
            Err(StegoError::Capacity(CapacityError::PayloadTooLarge {
                required: 56,
                available: 48,
                ..
            }))
        ));
    }

    proptest! {
        #[test]
        fn round_trip_within_capacity(
            width in 1u32..24,
            height in 1u32..12,
            fill in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            prop_assume!(width as usize * height as usize * 3 >= LENGTH_PREFIX_BYTES * BITS_PER_BYTE);
            let bytes = blank_bitmap(width, height, fill).unwrap();
            let mut bitmap = Bitmap::parse(bytes.clone()).unwrap();
            let payload = &payload[..payload.len().min(capacity(&bitmap))];

            embed(&mut bitmap, payload).unwrap();
            let output = bitmap.into_bytes().unwrap();
            prop_assert_eq!(output.len(), bytes.len());
            prop_assert_eq!(&output[..BMP_HEADER_SIZE], &bytes[..BMP_HEADER_SIZE]);
            prop_assert_eq!(extract_file_bytes(output).unwrap(), payload.to_vec());
        }
    }
}
