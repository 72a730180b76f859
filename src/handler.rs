//! # 命令处理逻辑模块
//!
//! 包含处理各个子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心隐写算法以及向用户报告结果。
//! 输出文件只会在整个操作成功之后才写入，失败时不会留下任何半成品。

use crate::bitmap::Bitmap;
use crate::cli::{CapacityArgs, CoverArgs, EmbedArgs, ExtractArgs};
use crate::error::StegoError;
use crate::steganography::{capacity, embed, extract};
use anyhow::{Context, Result};
use colored::Colorize;
use image::{DynamicImage, ImageFormat};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;

fn read_bitmap(path: &Path) -> Result<Bitmap> {
    let picture = fs::read(path).map_err(StegoError::from).with_context(|| {
        format!(
            "Unable to read image file: {}",
            path.to_string_lossy().red().bold()
        )
    })?;
    debug!("read {} bytes from {}", picture.len(), path.display());

    Bitmap::parse(picture).with_context(|| {
        format!(
            "'{}' is not a usable 24-bit uncompressed bitmap.",
            path.to_string_lossy().red().bold()
        )
    })
}

/// 处理 'Embed' 命令的执行逻辑。
///
/// 负责读取位图和待隐藏的文件、在写入前检查隐写空间是否足够、嵌入带长度前缀的数据，
/// 最后将结果写入目标图像文件。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径的 `EmbedArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像或文件。
/// * 图像不是 24 位无压缩 BMP，或已被截断。
/// * 图像没有足够的空间来隐藏文件。
/// * 无法写入到目标图像文件。
pub fn handle_embed(args: EmbedArgs) -> Result<()> {
    let mut bitmap = read_bitmap(&args.image)?;

    let payload = fs::read(&args.input)
        .map_err(StegoError::from)
        .with_context(|| {
            format!(
                "Unable to read input file: {}",
                args.input.to_string_lossy().red().bold()
            )
        })?;

    embed(&mut bitmap, &payload).with_context(|| {
        format!(
            "Failed to hide {} bytes in the image. \nIt can hold at most {} bytes.",
            payload.len().to_string().red().bold(),
            capacity(&bitmap).to_string().green().bold()
        )
    })?;

    let picture = bitmap.into_bytes()?;
    fs::write(&args.dest, picture)
        .map_err(StegoError::from)
        .with_context(|| {
            format!(
                "Unable to write to target image file: {}",
                args.dest.to_string_lossy().red().bold()
            )
        })?;

    println!(
        "The file has been successfully hidden and saved: {}",
        args.dest.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Extract' 命令的执行逻辑。
///
/// 负责读取经过隐写的位图、读出并校验长度前缀、提取负载，
/// 最后将恢复的内容写入目标文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取输入的图像文件，或它不是 24 位无压缩 BMP。
/// * 图像中读出的长度不可信 (没有隐藏数据或已损坏)。
/// * 无法写入到目标文件。
pub fn handle_extract(args: ExtractArgs) -> Result<()> {
    let bitmap = read_bitmap(&args.image)?;

    let payload = extract(&bitmap).with_context(|| {
        format!(
            "Failed to recover hidden data from '{}'. \nThe image may not contain a hidden file or is corrupted.",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    fs::write(&args.output, &payload)
        .map_err(StegoError::from)
        .with_context(|| {
            format!(
                "Unable to write to target file: {}",
                args.output.to_string_lossy().red().bold()
            )
        })?;

    println!(
        "{} bytes have been successfully recovered and saved: {}",
        payload.len(),
        args.output.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Capacity' 命令：打印像素几何信息和可隐藏的最大字节数。
pub fn handle_capacity(args: CapacityArgs) -> Result<()> {
    let bitmap = read_bitmap(&args.image)?;
    let header = bitmap.header();
    let geometry = bitmap.geometry();

    println!(
        "{}: {}x{} pixels, {} bytes per row ({} usable), {} of {} pixel bytes usable",
        args.image.to_string_lossy().bold(),
        header.width(),
        header.height(),
        geometry.row_length,
        geometry.row_available_length,
        geometry.available_length,
        geometry.data_length
    );
    println!(
        "It can hide up to {} bytes.",
        capacity(&bitmap).to_string().green().bold()
    );
    Ok(())
}

/// 处理 'Cover' 命令：把任意可解码的无损图像转换为 24 位 BMP 载体。
///
/// 转换结果会先按载体的要求重新解析一遍，确认可用后才写入磁盘。
pub fn handle_cover(args: CoverArgs) -> Result<()> {
    let source = image::open(&args.image).with_context(|| {
        format!(
            "Unable to decode image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(source.to_rgb8())
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Bmp)
        .context("Failed to encode the image as a 24-bit bitmap.")?;

    let hidden = Bitmap::parse(encoded.clone())
        .map(|bitmap| capacity(&bitmap))
        .context("The encoded image is not a usable 24-bit bitmap.")?;

    fs::write(&args.dest, &encoded)
        .map_err(StegoError::from)
        .with_context(|| {
            format!(
                "Unable to write to target image file: {}",
                args.dest.to_string_lossy().red().bold()
            )
        })?;

    println!(
        "The cover image has been saved: {} (it can hide up to {} bytes)",
        args.dest.to_string_lossy().green().bold(),
        hidden.to_string().green().bold()
    );
    Ok(())
}

/// 找出错误链中的隐写错误类别，用于向用户报告。
///
/// 不是由隐写库产生的错误 (例如图像解码失败) 归为 "error"。
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StegoError>())
        .map_or("error", StegoError::kind)
}
