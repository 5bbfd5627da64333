use std::io;
use std::path::PathBuf;
use std::time::Duration;
use crate::config::config::OutputLayout;
use crate::models::conversion::{ConversionInput, ConversionOutput, ConverterCommand};

// 應用配置結構體，封裝所有參數
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub input: String,
    pub output: String,
    pub source_ext: String,
    pub target_ext: String,
    pub converter: String,
    pub converter_args: Vec<String>,
    pub workers: usize,
    pub timeout_secs: Option<u64>,
    pub layout: OutputLayout,
    pub no_progress: bool,
}

impl AppConfig {
    pub fn to_conversion_input(&self) -> ConversionInput {
        ConversionInput {
            input_path: PathBuf::from(&self.input),
            output_dir: PathBuf::from(&self.output),
            source_ext: self.source_ext.clone(),
            target_ext: self.target_ext.clone(),
            converter: ConverterCommand {
                program: PathBuf::from(&self.converter),
                extra_args: self.converter_args.clone(),
                timeout: self.timeout_secs.map(Duration::from_secs),
            },
            workers: self.workers,
            layout: self.layout,
            no_progress: self.no_progress,
        }
    }
}

// 配置來源的 Port
pub trait ConfigPort {
    fn get_config(&self) -> io::Result<AppConfig>;
}

// 轉換執行的 Port
pub trait ConversionPort {
    fn execute(&self, config: AppConfig) -> io::Result<ConversionOutput>;
}
