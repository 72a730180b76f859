//! # 像素游标模块
//!
//! 按行优先顺序枚举像素缓冲区中真正承载颜色的字节偏移，跳过每行末尾的填充字节。
//! 嵌入与提取共用同一种游标，保证两边访问的字节序列完全一致。

use crate::bitmap::PixelGeometry;
use crate::error::CapacityError;
use std::iter::FusedIterator;

/// 只向前移动的行感知游标。
///
/// 构造时必须给出本次遍历最多前进的次数，且不能超过 `available_length`；
/// 因此迭代过程本身不需要再做边界检查。每一遍读写都要构造新的游标。
#[derive(Debug, Clone)]
pub struct PixelCursor {
    position: usize,
    row_length: usize,
    row_available_length: usize,
    remaining: usize,
}

impl PixelCursor {
    /// 创建一个最多前进 `advances` 次的游标。
    ///
    /// # Errors
    ///
    /// 当 `advances` 超过位图的可用字节数时返回 [`CapacityError::CursorOverrun`]。
    pub fn new(geometry: &PixelGeometry, advances: usize) -> Result<Self, CapacityError> {
        if advances > geometry.available_length {
            return Err(CapacityError::CursorOverrun {
                requested: advances,
                available: geometry.available_length,
            });
        }

        Ok(Self {
            position: 0,
            row_length: geometry.row_length,
            row_available_length: geometry.row_available_length,
            remaining: advances,
        })
    }
}

impl Iterator for PixelCursor {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.position;
        self.position += 1;
        // 走到一行可用字节的末尾时，直接跳到下一行的开头
        if self.position % self.row_length == self.row_available_length {
            self.position += self.row_length - self.row_available_length;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PixelCursor {}

impl FusedIterator for PixelCursor {}
