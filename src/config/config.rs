use clap::{Parser, ValueEnum};
use std::io;
use std::path::Path;

#[derive(Parser, Clone)]
#[command(
    name = "ebook_batch_convert",
    about = "遞迴搜尋目錄中的電子書並平行呼叫外部轉換程式",
    long_about = "遞迴搜尋輸入目錄下指定副檔名的檔案，以固定大小的工作池平行呼叫外部轉換程式（預設為 Calibre 的 ebook-convert，.epub 轉 .mobi），並逐一回報每個檔案的轉換結果。\n僅提供輸入目錄時使用預設配置。使用 --show-config 預覽實際配置。\n使用 `--help` 查看詳細用法。"
)]
pub struct Cli {
    /// 要搜尋的根目錄
    #[arg(env = "EBOOK_CONVERT_INPUT")]
    pub input: String,
    /// 輸出目錄，預設為目前工作目錄
    #[arg(short, long, env = "EBOOK_CONVERT_OUTPUT")]
    pub output: Option<String>,
    #[arg(long, env = "EBOOK_CONVERT_SOURCE_EXT")]
    pub source_ext: Option<String>,
    #[arg(long, env = "EBOOK_CONVERT_TARGET_EXT")]
    pub target_ext: Option<String>,
    /// 外部轉換程式，以 `<程式> <輸入> <輸出>` 方式呼叫
    #[arg(long, env = "EBOOK_CONVERT_BINARY")]
    pub converter: Option<String>,
    /// 附加在輸出路徑之後的額外參數，可重複指定
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    pub converter_args: Option<Vec<String>>,
    /// 同時執行的轉換數上限
    #[arg(short = 'j', long, env = "EBOOK_CONVERT_WORKERS")]
    pub workers: Option<usize>,
    /// 單一轉換的逾時秒數，未指定則不限時
    #[arg(long, env = "EBOOK_CONVERT_TIMEOUT")]
    pub timeout: Option<u64>,
    #[arg(long, value_enum, env = "EBOOK_CONVERT_LAYOUT")]
    pub layout: Option<OutputLayout>,
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
    #[arg(long, env = "EBOOK_CONVERT_LOG", value_parser = ["error", "warn", "info", "debug"])]
    pub log_level: Option<String>,
    #[arg(long, default_value_t = false)]
    pub show_config: bool,
    /// 即使有檔案轉換失敗也以結束碼 0 結束
    #[arg(long, default_value_t = false)]
    pub always_succeed: bool,
}

/// 輸出檔案的擺放方式
#[derive(Clone, Copy, ValueEnum, PartialEq, Eq, Debug, Default)]
pub enum OutputLayout {
    /// 全部輸出至同一層目錄，同名檔案會互相覆蓋
    #[default]
    Flat,
    /// 依來源檔案相對於輸入目錄的路徑建立子目錄
    Mirror,
}

pub const DEFAULT_SOURCE_EXT: &str = ".epub";
pub const DEFAULT_TARGET_EXT: &str = ".mobi";
pub const DEFAULT_CONVERTER: &str = "ebook-convert";
pub const DEFAULT_WORKERS: usize = 10;

pub fn validate_input_path(input: &str) -> io::Result<&Path> {
    let path = Path::new(input);
    if !path.exists() {
        log::error!("輸入路徑不存在：{}", input);
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("輸入路徑 '{}' 不存在", input)
        ));
    }
    if !path.is_dir() {
        log::error!("輸入路徑不是目錄：{}", input);
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("輸入路徑 '{}' 不是目錄", input)
        ));
    }
    Ok(path)
}

pub fn is_valid_extension(ext: &str) -> bool {
    let invalid_chars = ['/', '\\', ':', '?', '"', '<', '>', '|', '*'];
    let trimmed = ext.trim_start_matches('.');
    !trimmed.is_empty() && !ext.contains(&invalid_chars[..])
}

/// 將副檔名正規化為以 `.` 開頭，`epub` 與 `.epub` 視為相同
pub fn normalize_extension(ext: &str) -> io::Result<String> {
    let ext = ext.trim();
    if !is_valid_extension(ext) {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("無效的副檔名: '{}'", ext)));
    }
    if ext.starts_with('.') {
        Ok(ext.to_string())
    } else {
        Ok(format!(".{}", ext))
    }
}

pub fn validate_extensions(source_ext: &str, target_ext: &str) -> io::Result<(String, String)> {
    let source = normalize_extension(source_ext)?;
    let target = normalize_extension(target_ext)?;
    if source == target {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("來源與目標副檔名相同：{}", source)
        ));
    }
    Ok((source, target))
}

pub fn validate_workers(workers: usize) -> io::Result<usize> {
    if workers == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "工作執行緒數必須至少為 1"));
    }
    Ok(workers)
}

/// 逾時為 0 秒會讓每個轉換立即被終止
pub fn validate_timeout(timeout_secs: Option<u64>) -> io::Result<Option<u64>> {
    if timeout_secs == Some(0) {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "逾時秒數必須至少為 1"));
    }
    Ok(timeout_secs)
}
