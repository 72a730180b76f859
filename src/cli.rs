//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。
//! 参数格式错误时由 `clap` 报告用法并以退出码 2 结束进程。

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// 一款基于 LSB (最低有效位) 隐写术的命令行工具，用于在 24 位无压缩 BMP 图像中隐藏或恢复任意文件。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款基于 LSB (最低有效位) 隐写术的命令行工具，用于在 24 位无压缩 BMP 图像中隐藏或恢复任意文件。\n\
                  每个可用的颜色字节只改写最低位，行尾填充字节保持不变。"
)]
pub struct Cli {
    /// 提高日志详细程度 (-v, -vv, -vvv)。设置 RUST_LOG 时以其为准。
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 把一个文件嵌入到 BMP 图像中。
    #[command(short_flag = 'w', visible_alias = "hide")]
    Embed(EmbedArgs),

    /// 从经过隐写的 BMP 图像中提取文件。
    #[command(short_flag = 'r', visible_alias = "recover")]
    Extract(ExtractArgs),

    /// 显示 BMP 图像的像素几何信息和可隐藏的最大字节数。
    Capacity(CapacityArgs),

    /// 把任意无损格式图像 (如 PNG) 转换为可用作载体的 24 位 BMP。
    Cover(CoverArgs),
}

/// 'embed' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct EmbedArgs {
    /// 用作载体的 24 位 BMP 图像。
    pub image: PathBuf,

    /// 要隐藏的文件。
    pub input: PathBuf,

    /// 隐写完成后，保存结果图像的输出路径。
    pub dest: PathBuf,
}

/// 'extract' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// 已隐藏数据的 BMP 图像。
    pub image: PathBuf,

    /// 提取出的文件的保存路径。
    pub output: PathBuf,
}

/// 'capacity' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct CapacityArgs {
    /// 要检查的 BMP 图像。
    pub image: PathBuf,
}

/// 'cover' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct CoverArgs {
    /// 输入图像 (PNG, BMP, TIFF, WebP, QOI)。
    pub image: PathBuf,

    /// 生成的 24 位 BMP 的保存路径。
    pub dest: PathBuf,
}
