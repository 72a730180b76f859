//! # 位图容器模块
//!
//! 负责解析并校验 24 位无压缩 BMP 的头部，计算像素行几何信息，
//! 取出像素缓冲区，并在隐写完成后把修改过的像素缓冲区拼接回原始文件。
//!
//! 原始文件字节在整个生命周期内都保留在内存中，
//! 因此像素区以外的所有字节 (头部、调色板、尾随数据) 都能逐字节原样输出。

use crate::constants::{
    BITS_PER_PIXEL, BMP_HEADER_SIZE, BMP_INFO_HEADER_SIZE, BMP_MAGIC, BYTES_PER_PIXEL,
    ROW_ALIGNMENT,
};
use crate::error::{FormatError, Result, try_copy};
use log::{debug, warn};
use std::ops::Range;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// 紧凑布局的 BMP 文件头 + BITMAPINFOHEADER。
///
/// 所有多字节字段均为小端序，字段之间没有任何填充，
/// 因此可以直接从文件开头的 54 个字节中按位读出。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct BitmapHeader {
    magic: [u8; 2],
    file_size: U32,
    reserved: [U16; 2],
    data_offset: U32,
    info_header_size: U32,
    width: U32,
    height: U32,
    planes: U16,
    bits_per_pixel: U16,
    compression: U32,
    image_size: U32,
    x_pixels_per_meter: U32,
    y_pixels_per_meter: U32,
    colors_used: U32,
    colors_important: U32,
}

const _: () = assert!(size_of::<BitmapHeader>() == BMP_HEADER_SIZE);

impl BitmapHeader {
    /// 从字节流开头读取头部，不做任何语义校验。
    ///
    /// # Errors
    ///
    /// 字节数少于 [`BMP_HEADER_SIZE`] 时返回 [`FormatError::TruncatedHeader`]。
    pub fn read(bytes: &[u8]) -> std::result::Result<Self, FormatError> {
        Self::read_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| FormatError::TruncatedHeader {
                expected: BMP_HEADER_SIZE,
                actual: bytes.len(),
            })
    }

    /// 检查魔数、保留字段、平面数、色深和压缩方式。
    pub fn validate(&self) -> std::result::Result<(), FormatError> {
        if self.magic != BMP_MAGIC {
            return Err(FormatError::Magic { found: self.magic });
        }

        let reserved = self.reserved.map(|field| field.get());
        if reserved != [0, 0] {
            return Err(FormatError::Reserved { found: reserved });
        }

        if self.planes() != 1 {
            return Err(FormatError::Planes(self.planes()));
        }

        if self.bits_per_pixel() != BITS_PER_PIXEL {
            return Err(FormatError::BitsPerPixel(self.bits_per_pixel()));
        }

        if self.compression() != 0 {
            return Err(FormatError::Compression(self.compression()));
        }

        Ok(())
    }

    /// 为一张空白的 24 位位图构造头部，像素数据紧跟在头部之后。
    ///
    /// # Errors
    ///
    /// 如果像素数据的总大小无法用 32 位表示，返回 [`FormatError::GeometryOverflow`]。
    pub fn rgb24(width: u32, height: u32) -> std::result::Result<Self, FormatError> {
        let overflow = FormatError::GeometryOverflow { width, height };
        let data_length = (width as u64 * BYTES_PER_PIXEL as u64)
            .next_multiple_of(ROW_ALIGNMENT as u64)
            .checked_mul(height as u64)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or_else(|| overflow.clone())?;
        let file_size = data_length
            .checked_add(BMP_HEADER_SIZE as u32)
            .ok_or(overflow)?;

        Ok(Self {
            magic: BMP_MAGIC,
            file_size: U32::new(file_size),
            reserved: [U16::ZERO; 2],
            data_offset: U32::new(BMP_HEADER_SIZE as u32),
            info_header_size: U32::new(BMP_INFO_HEADER_SIZE),
            width: U32::new(width),
            height: U32::new(height),
            planes: U16::new(1),
            bits_per_pixel: U16::new(BITS_PER_PIXEL),
            compression: U32::ZERO,
            image_size: U32::new(data_length),
            x_pixels_per_meter: U32::new(2835),
            y_pixels_per_meter: U32::new(2835),
            colors_used: U32::ZERO,
            colors_important: U32::ZERO,
        })
    }

    pub fn file_size(&self) -> u32 {
        self.file_size.get()
    }

    pub fn data_offset(&self) -> u32 {
        self.data_offset.get()
    }

    pub fn info_header_size(&self) -> u32 {
        self.info_header_size.get()
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }

    pub fn planes(&self) -> u16 {
        self.planes.get()
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel.get()
    }

    pub fn compression(&self) -> u32 {
        self.compression.get()
    }
}

/// 由头部推导出的像素区几何信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGeometry {
    /// 像素数据在文件中的起始偏移。
    pub data_offset: usize,
    /// 每行实际存储的字节数 (对齐到 4 字节)。
    pub row_length: usize,
    /// 每行真正承载颜色的字节数 (`width * 3`)。
    pub row_available_length: usize,
    /// 像素区的总存储字节数，包含行尾填充。
    pub data_length: usize,
    /// 所有可用于隐写的字节数，不含填充。
    pub available_length: usize,
}

impl PixelGeometry {
    pub fn from_header(header: &BitmapHeader) -> std::result::Result<Self, FormatError> {
        let overflow = || FormatError::GeometryOverflow {
            width: header.width(),
            height: header.height(),
        };
        let width = usize::try_from(header.width()).map_err(|_| overflow())?;
        let height = usize::try_from(header.height()).map_err(|_| overflow())?;
        let data_offset = usize::try_from(header.data_offset()).map_err(|_| overflow())?;

        let row_available_length = width.checked_mul(BYTES_PER_PIXEL).ok_or_else(overflow)?;
        let row_length = align(row_available_length, ROW_ALIGNMENT).ok_or_else(overflow)?;
        let data_length = row_length.checked_mul(height).ok_or_else(overflow)?;
        let available_length = row_available_length
            .checked_mul(height)
            .ok_or_else(overflow)?;

        Ok(Self {
            data_offset,
            row_length,
            row_available_length,
            data_length,
            available_length,
        })
    }

    /// 每行末尾的填充字节数。
    pub fn row_padding(&self) -> usize {
        self.row_length - self.row_available_length
    }

    /// 像素区在整个文件中的字节范围。
    ///
    /// 调用前必须已经确认 `data_offset + data_length` 不会溢出。
    pub fn pixel_range(&self) -> Range<usize> {
        self.data_offset..self.data_offset + self.data_length
    }
}

/// 将 `x` 向上对齐到 `alignment` 的整数倍，溢出时返回 `None`。
pub fn align(x: usize, alignment: usize) -> Option<usize> {
    x.checked_next_multiple_of(alignment)
}

/// 已解析的位图：保留原始文件字节，并独占一份可修改的像素缓冲区。
#[derive(Debug, Clone)]
pub struct Bitmap {
    original: Vec<u8>,
    header: BitmapHeader,
    geometry: PixelGeometry,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// 解析完整的位图文件字节。
    ///
    /// 所有头部校验和截断检查都在分配像素缓冲区之前完成。
    ///
    /// # Errors
    ///
    /// 如果发生以下任一情况，将返回错误：
    /// * 头部不完整，或魔数、保留字段、平面数、色深、压缩方式不符合要求 ([`FormatError`])。
    /// * 文件长度不足以容纳 `data_offset + data_length` 个字节 ([`FormatError::TruncatedData`])。
    /// * 无法为像素缓冲区分配内存。
    pub fn parse(file_bytes: Vec<u8>) -> Result<Self> {
        let header = BitmapHeader::read(&file_bytes)?;
        header.validate()?;

        let geometry = PixelGeometry::from_header(&header)?;
        let expected = geometry
            .data_offset
            .checked_add(geometry.data_length)
            .ok_or(FormatError::GeometryOverflow {
                width: header.width(),
                height: header.height(),
            })?;
        if expected > file_bytes.len() {
            return Err(FormatError::TruncatedData {
                expected,
                actual: file_bytes.len(),
            }
            .into());
        }

        if header.file_size() as usize != file_bytes.len() {
            warn!(
                "bitmap header declares {} bytes but the file has {}",
                header.file_size(),
                file_bytes.len()
            );
        }
        debug!(
            "parsed {}x{} bitmap: offset {}, info header {} bytes, row {} of {} usable, {} of {} bytes usable",
            header.width(),
            header.height(),
            geometry.data_offset,
            header.info_header_size(),
            geometry.row_length,
            geometry.row_available_length,
            geometry.available_length,
            geometry.data_length
        );

        let pixels = try_copy(&file_bytes[geometry.pixel_range()])?;

        Ok(Self {
            original: file_bytes,
            header,
            geometry,
            pixels,
        })
    }

    pub fn header(&self) -> &BitmapHeader {
        &self.header
    }

    pub fn geometry(&self) -> &PixelGeometry {
        &self.geometry
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// 把当前像素缓冲区拼接回原始文件，得到输出文件的完整字节。
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        Ok(splice(self.original, &self.geometry, &self.pixels)?)
    }
}

/// 用 `pixels` 覆盖原始文件中 `[data_offset, data_offset + data_length)` 的字节，
/// 其余字节保持不变。
///
/// # Errors
///
/// 新像素缓冲区长度与 `data_length` 不一致，或像素区超出原始文件时返回错误。
pub fn splice(
    mut original: Vec<u8>,
    geometry: &PixelGeometry,
    pixels: &[u8],
) -> std::result::Result<Vec<u8>, FormatError> {
    if pixels.len() != geometry.data_length {
        return Err(FormatError::PixelLengthMismatch {
            expected: geometry.data_length,
            actual: pixels.len(),
        });
    }

    let actual = original.len();
    let range = geometry
        .data_offset
        .checked_add(geometry.data_length)
        .filter(|&end| end <= actual)
        .map(|end| geometry.data_offset..end)
        .ok_or(FormatError::TruncatedData {
            expected: geometry.data_offset.saturating_add(geometry.data_length),
            actual,
        })?;
    original[range].copy_from_slice(pixels);

    Ok(original)
}

/// 生成一张像素全为 `fill` 的 24 位位图文件，行尾填充为零。
pub fn blank_bitmap(width: u32, height: u32, fill: u8) -> Result<Vec<u8>> {
    let header = BitmapHeader::rgb24(width, height)?;
    let geometry = PixelGeometry::from_header(&header)?;

    let mut bytes = try_copy(header.as_bytes())?;
    bytes.resize(BMP_HEADER_SIZE + geometry.data_length, 0);
    if geometry.row_length > 0 {
        bytes[BMP_HEADER_SIZE..]
            .chunks_exact_mut(geometry.row_length)
            .for_each(|row| row[..geometry.row_available_length].fill(fill));
    }

    Ok(bytes)
}
