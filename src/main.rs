use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::process::ExitCode;

use bmp_lsb::{
    cli::{Cli, Commands},
    handler::{error_kind, handle_capacity, handle_cover, handle_embed, handle_extract},
};

/// 初始化日志系统，输出到标准错误。
///
/// 默认只显示警告，每个 `-v` 提高一级；设置了 `RUST_LOG` 时以其为准。
fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// 程序的主入口点
///
/// 负责解析命令行参数，并根据指定的子命令将执行分派到相应的处理函数。
/// 参数错误由 `clap` 以退出码 2 处理；其余任何失败都在这里统一报告，并以退出码 1 结束。
fn main() -> ExitCode {
    // 解析命令行参数
    let cli = Cli::parse();
    init_logger(cli.verbose);

    // 根据子命令调用相应的处理函数
    let result = match cli.command {
        Commands::Embed(args) => handle_embed(args),
        Commands::Extract(args) => handle_extract(args),
        Commands::Capacity(args) => handle_capacity(args),
        Commands::Cover(args) => handle_cover(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!(
                "{} ({}): {:#}",
                "Error".red().bold(),
                error_kind(&err),
                err
            );
            ExitCode::FAILURE
        }
    }
}
