use std::io;
use crate::config::config::{Cli, OutputLayout, DEFAULT_CONVERTER, DEFAULT_SOURCE_EXT, DEFAULT_TARGET_EXT, DEFAULT_WORKERS};
use crate::config::ports::{AppConfig, ConfigPort, ConversionPort};
use crate::facade::conversion_facade::ConversionAdapter;
use crate::models::conversion::ConversionOutput;
use crate::service::config_service::{resolve_output_dir, ConfigService, DefaultConfigAdapter};
use crate::utils::utils::setup_logging;

pub fn process_cli_mode(cli: Cli) -> io::Result<ConversionOutput> {
    setup_logging(cli.log_level.as_deref().unwrap_or("info"))?;

    // 僅提供 input（與 output）時使用預設配置
    let config_port: Box<dyn ConfigPort> = if is_default_config(&cli) {
        log::info!("未提供轉換選項，使用預設配置：.epub -> .mobi，ebook-convert，{} 個工作執行緒", DEFAULT_WORKERS);
        Box::new(DefaultConfigAdapter::new(cli.input.clone(), cli.output.clone(), cli.no_progress))
    } else {
        Box::new(CliConfigAdapter::new(cli.clone()))
    };

    let config_service = ConfigService::new(config_port);
    let config = config_service.get_config()?;
    if cli.show_config {
        println!("實際使用的配置：{:#?}", config);
    }

    let conversion_port: Box<dyn ConversionPort> = Box::new(ConversionAdapter::new());
    conversion_port.execute(config)
}

pub fn is_default_config(cli: &Cli) -> bool {
    cli.source_ext.is_none()
        && cli.target_ext.is_none()
        && cli.converter.is_none()
        && cli.converter_args.is_none()
        && cli.workers.is_none()
        && cli.timeout.is_none()
        && cli.layout.is_none()
}

/// 有任何檔案轉換失敗時回傳 1，除非指定 `--always-succeed`
pub fn exit_status_for(output: &ConversionOutput, always_succeed: bool) -> u8 {
    if output.has_failures() && !always_succeed {
        1
    } else {
        0
    }
}

// CLI 配置適配器
pub struct CliConfigAdapter {
    cli: Cli,
}

impl CliConfigAdapter {
    pub fn new(cli: Cli) -> Self {
        CliConfigAdapter { cli }
    }
}

impl ConfigPort for CliConfigAdapter {
    fn get_config(&self) -> io::Result<AppConfig> {
        let config = AppConfig {
            input: self.cli.input.clone(),
            output: resolve_output_dir(self.cli.output.clone())?,
            source_ext: self.cli.source_ext.clone().unwrap_or(DEFAULT_SOURCE_EXT.to_string()),
            target_ext: self.cli.target_ext.clone().unwrap_or(DEFAULT_TARGET_EXT.to_string()),
            converter: self.cli.converter.clone().unwrap_or(DEFAULT_CONVERTER.to_string()),
            converter_args: self.cli.converter_args.clone().unwrap_or_default(),
            workers: self.cli.workers.unwrap_or(DEFAULT_WORKERS),
            timeout_secs: self.cli.timeout,
            layout: self.cli.layout.unwrap_or(OutputLayout::Flat),
            no_progress: self.cli.no_progress,
        };
        log::debug!("使用自訂配置：{:?}", config);
        Ok(config)
    }
}
