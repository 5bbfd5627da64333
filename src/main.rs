use std::io;
use std::process::ExitCode;

use clap::Parser;
use ebook_batch_convert::action::cli::{exit_status_for, process_cli_mode};
use ebook_batch_convert::config::config::Cli;

fn main() -> io::Result<ExitCode> {
    let cli = Cli::parse();
    let always_succeed = cli.always_succeed;
    let output = process_cli_mode(cli)?;
    log::info!(
        "程式執行完成，輸出目錄：{}，成功 {} 個，失敗 {} 個",
        output.output_path.display(),
        output.succeeded,
        output.failed
    );
    println!("轉換程序完成。");
    Ok(ExitCode::from(exit_status_for(&output, always_succeed)))
}
