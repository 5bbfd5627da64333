use std::io;
use crate::config::config::{
    validate_extensions, validate_input_path, validate_timeout, validate_workers, OutputLayout, DEFAULT_CONVERTER,
    DEFAULT_SOURCE_EXT, DEFAULT_TARGET_EXT, DEFAULT_WORKERS,
};
use crate::config::ports::{AppConfig, ConfigPort};

// 配置服務，負責從適配器取得配置並統一驗證
pub struct ConfigService {
    config_port: Box<dyn ConfigPort>,
}

impl ConfigService {
    pub fn new(config_port: Box<dyn ConfigPort>) -> Self {
        ConfigService { config_port }
    }

    pub fn get_config(&self) -> io::Result<AppConfig> {
        let mut config = self.config_port.get_config()?;
        validate_input_path(&config.input)?;
        let (source_ext, target_ext) = validate_extensions(&config.source_ext, &config.target_ext)?;
        config.source_ext = source_ext;
        config.target_ext = target_ext;
        config.workers = validate_workers(config.workers)?;
        config.timeout_secs = validate_timeout(config.timeout_secs)?;
        if config.converter.trim().is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "未指定轉換程式"));
        }
        Ok(config)
    }
}

/// 未指定輸出目錄時使用目前工作目錄
pub fn resolve_output_dir(output: Option<String>) -> io::Result<String> {
    match output {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?.to_string_lossy().into_owned()),
    }
}

// 預設配置適配器：epub 轉 mobi，ebook-convert，10 個工作執行緒
pub struct DefaultConfigAdapter {
    input: String,
    output: Option<String>,
    no_progress: bool,
}

impl DefaultConfigAdapter {
    pub fn new(input: String, output: Option<String>, no_progress: bool) -> Self {
        DefaultConfigAdapter { input, output, no_progress }
    }
}

impl ConfigPort for DefaultConfigAdapter {
    fn get_config(&self) -> io::Result<AppConfig> {
        Ok(AppConfig {
            input: self.input.clone(),
            output: resolve_output_dir(self.output.clone())?,
            source_ext: DEFAULT_SOURCE_EXT.to_string(),
            target_ext: DEFAULT_TARGET_EXT.to_string(),
            converter: DEFAULT_CONVERTER.to_string(),
            converter_args: Vec::new(),
            workers: DEFAULT_WORKERS,
            timeout_secs: None,
            layout: OutputLayout::Flat,
            no_progress: self.no_progress,
        })
    }
}
