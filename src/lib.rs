//! # bmp_lsb 库
//!
//! 本库包含 24 位 BMP 最低有效位隐写工具的核心逻辑：
//! 位图解析与拼接、跳过行填充的像素游标、按位打包以及带长度前缀的负载帧。

// 声明库包含的所有模块。

pub mod bitmap;
pub mod cli;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod handler;
pub mod steganography;

pub use bitmap::{Bitmap, BitmapHeader, PixelGeometry};
pub use error::{CapacityError, FormatError, Result, StegoError};
pub use steganography::{capacity, embed, extract};
