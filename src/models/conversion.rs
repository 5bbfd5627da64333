use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::config::OutputLayout;

#[derive(Clone, Debug)]
pub struct ConversionInput {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub source_ext: String,
    pub target_ext: String,
    pub converter: ConverterCommand,
    pub workers: usize,
    pub layout: OutputLayout,
    pub no_progress: bool,
}

/// 外部轉換程式：`<program> <輸入> <輸出> [extra_args...]`
#[derive(Clone, Debug)]
pub struct ConverterCommand {
    pub program: PathBuf,
    pub extra_args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl ConverterCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ConverterCommand {
            program: program.into(),
            extra_args: Vec::new(),
            timeout: None,
        }
    }
}

/// 單一轉換任務，由執行它的 worker 獨佔
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionTask {
    pub source: PathBuf,
    pub output: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionResult {
    Success { source: PathBuf, output: PathBuf },
    Failure { source: PathBuf, diagnostic: String },
}

impl ConversionResult {
    pub fn source(&self) -> &PathBuf {
        match self {
            ConversionResult::Success { source, .. } => source,
            ConversionResult::Failure { source, .. } => source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionResult::Success { source, output } => {
                write!(f, "轉換成功：{} -> {}", source.display(), output.display())
            }
            ConversionResult::Failure { source, diagnostic } if diagnostic.is_empty() => {
                write!(f, "轉換失敗：{}", source.display())
            }
            ConversionResult::Failure { source, diagnostic } => {
                write!(f, "轉換失敗：{}\n{}", source.display(), diagnostic)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConvertBatchInput {
    pub tasks: Vec<ConversionTask>,
    pub converter: ConverterCommand,
    pub workers: usize,
}

#[derive(Debug, Default)]
pub struct ConvertBatchOutput {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct ConversionOutput {
    pub output_path: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_dirs: u64,
    pub elapsed: Duration,
}

impl ConversionOutput {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
