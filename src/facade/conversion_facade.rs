use std::fs;
use std::io;
use std::time::Instant;
use log::{debug, info, warn};
use crate::config::ports::{AppConfig, ConversionPort};
use crate::facade::traits::i_conversion::ConversionFacadeTrait;
use crate::models::conversion::{ConversionInput, ConversionOutput, ConversionResult, ConvertBatchInput};
use crate::models::file::FileCollectInput;
use crate::service::convert::{find_collisions, plan_tasks, ConvertService};
use crate::service::file::FileService;
use crate::service::traits::i_service::{ConvertServiceTrait, FileServiceTrait};
use crate::utils::utils::{create_progress_bar, format_duration};

pub struct ConversionFacade {
    file_service: Box<dyn FileServiceTrait>,
    convert_service: Box<dyn ConvertServiceTrait>,
}

impl ConversionFacade {
    pub fn new(
        file_service: Box<dyn FileServiceTrait>,
        convert_service: Box<dyn ConvertServiceTrait>,
    ) -> Self {
        ConversionFacade {
            file_service,
            convert_service,
        }
    }
}

impl ConversionFacadeTrait for ConversionFacade {
    fn execute_conversion(&self, input: ConversionInput) -> io::Result<ConversionOutput> {
        let start = Instant::now();
        let file_output = self.file_service.collect_files(FileCollectInput {
            input_path: input.input_path.clone(),
            source_ext: input.source_ext.clone(),
        })?;

        let total = file_output.files.len();
        if total == 0 {
            warn!("在 {} 下找不到任何 {} 檔案", input.input_path.display(), input.source_ext);
            return Ok(ConversionOutput {
                output_path: input.output_dir.clone(),
                total: 0,
                succeeded: 0,
                failed: 0,
                skipped_dirs: file_output.skipped_dirs,
                elapsed: start.elapsed(),
            });
        }

        fs::create_dir_all(&input.output_dir)?;
        let tasks = plan_tasks(
            &file_output.files,
            &input.input_path,
            &input.output_dir,
            input.layout,
            &input.source_ext,
            &input.target_ext,
        );
        for (output, sources) in find_collisions(&tasks) {
            let sources: Vec<String> = sources.iter().map(|s| s.display().to_string()).collect();
            warn!(
                "多個檔案將輸出至相同路徑 {}，後完成者會覆蓋先完成者：{}",
                output.display(),
                sources.join(", ")
            );
        }

        info!(
            "開始轉換，輸入路徑：{}，輸出目錄：{}，{} -> {}，共 {} 個檔案",
            input.input_path.display(),
            input.output_dir.display(),
            input.source_ext,
            input.target_ext,
            total
        );

        let pm = create_progress_bar(total as u64, input.no_progress);
        let (mut succeeded, mut failed) = (0usize, 0usize);
        let mut report = |result: &ConversionResult| {
            if result.is_success() {
                succeeded += 1;
            } else {
                failed += 1;
            }
            debug!("任務完成：{:?}", result);
            pm.println(&result.to_string());
            pm.update(succeeded, failed);
        };

        let batch = self.convert_service.convert_files(
            ConvertBatchInput {
                tasks,
                converter: input.converter.clone(),
                workers: input.workers,
            },
            &mut report,
        )?;
        pm.finish(batch.succeeded, batch.failed, file_output.skipped_dirs);

        let elapsed = start.elapsed();
        info!(
            "轉換結束，共 {} 個檔案，成功 {} 個，失敗 {} 個，跳過 {} 個目錄，耗時 {}",
            total,
            batch.succeeded,
            batch.failed,
            file_output.skipped_dirs,
            format_duration(elapsed)
        );

        Ok(ConversionOutput {
            output_path: input.output_dir.clone(),
            total,
            succeeded: batch.succeeded,
            failed: batch.failed,
            skipped_dirs: file_output.skipped_dirs,
            elapsed,
        })
    }
}

// 以 Facade 實作轉換 Port，將配置轉為轉換輸入後執行
pub struct ConversionAdapter {
    facade: Box<dyn ConversionFacadeTrait>,
}

impl ConversionAdapter {
    pub fn new() -> Self {
        Self::with_facade(Box::new(ConversionFacade::new(
            Box::new(FileService::new()),
            Box::new(ConvertService::new()),
        )))
    }

    pub fn with_facade(facade: Box<dyn ConversionFacadeTrait>) -> Self {
        ConversionAdapter { facade }
    }
}

impl Default for ConversionAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionPort for ConversionAdapter {
    fn execute(&self, config: AppConfig) -> io::Result<ConversionOutput> {
        self.facade.execute_conversion(config.to_conversion_input())
    }
}
