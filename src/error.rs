//! # 错误类型模块
//!
//! 库内所有失败路径都汇总到 [`StegoError`]。
//! 每一种错误都在最早的检查点被发现，并且不会重试。

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// 位图头部或文件结构不符合要求。
///
/// 解析阶段的错误都带有 "Failed to read bitmap header" 前缀；拼接阶段的错误不带。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error(
        "Failed to read bitmap header: unexpected end-of-file: the header needs {expected} bytes \
         but got {actual} bytes only"
    )]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Failed to read bitmap header: incorrect magic number {found:02x?}")]
    Magic { found: [u8; 2] },

    #[error("Failed to read bitmap header: reserved fields must be 0, found {found:?}")]
    Reserved { found: [u16; 2] },

    #[error("Failed to read bitmap header: unsupported planes value {0}")]
    Planes(u16),

    #[error("Failed to read bitmap header: unsupported bit count per pixel {0}")]
    BitsPerPixel(u16),

    #[error("Failed to read bitmap header: unsupported compression {0}")]
    Compression(u32),

    #[error(
        "Failed to read bitmap header: pixel geometry {width}x{height} does not fit in memory"
    )]
    GeometryOverflow { width: u32, height: u32 },

    #[error(
        "Failed to read bitmap header: file expected to be {expected} bytes but got {actual} \
         bytes only"
    )]
    TruncatedData { expected: usize, actual: usize },

    #[error("replacement pixel data is {actual} bytes but the bitmap stores {expected}")]
    PixelLengthMismatch { expected: usize, actual: usize },
}

/// 图像容量不足，或者提取时读到的长度不可信。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error(
        "At least {required} bytes of bitmap color data is required but got {available} bytes only \
         ({stored} bytes stored including row padding). Please use a larger bitmap file."
    )]
    PayloadTooLarge {
        required: usize,
        available: usize,
        stored: usize,
    },

    #[error("payload of {0} bytes does not fit into a 32-bit length prefix")]
    LengthOverflow(usize),

    #[error("Bitmap too small. This bitmap could not have data ({available} usable bytes).")]
    NoRoomForPrefix { available: usize },

    #[error(
        "Bitmap too small or have no data: declared length {declared} needs {required} bytes \
         of color data but only {available} are usable"
    )]
    ImplausibleLength {
        declared: u32,
        required: u64,
        available: usize,
    },

    #[error("requested {requested} cursor advances but only {available} bytes are usable")]
    CursorOverrun { requested: usize, available: usize },

    #[error("pixel cursor exhausted before all bits were transferred")]
    CursorExhausted,
}

/// 隐写库的统一错误类型。
#[derive(Error, Debug)]
pub enum StegoError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Could not allocate {requested} bytes of memory")]
    Allocation {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}

impl StegoError {
    /// 用于向用户报告的错误类别名称。
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Format(_) => "format error",
            Self::Capacity(_) => "capacity error",
            Self::Io(_) => "I/O error",
            Self::Allocation { .. } => "allocation error",
        }
    }
}

pub type Result<T, E = StegoError> = std::result::Result<T, E>;

/// 以可失败的方式分配一个长度为 `len`、内容为零的缓冲区。
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|source| StegoError::Allocation {
            requested: len,
            source,
        })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// 以可失败的方式复制一段字节。
pub(crate) fn try_copy(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes.len())
        .map_err(|source| StegoError::Allocation {
            requested: bytes.len(),
            source,
        })?;
    buffer.extend_from_slice(bytes);
    Ok(buffer)
}
