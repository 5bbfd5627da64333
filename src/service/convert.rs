use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use rayon::ThreadPoolBuilder;
use crate::config::config::OutputLayout;
use crate::models::conversion::{
    ConversionResult, ConversionTask, ConvertBatchInput, ConvertBatchOutput, ConverterCommand,
};
use crate::service::traits::i_service::ConvertServiceTrait;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 轉換服務，以固定大小的工作池平行執行外部轉換程式
pub struct ConvertService;

impl ConvertService {
    pub fn new() -> Self {
        ConvertService
    }
}

impl Default for ConvertService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvertServiceTrait for ConvertService {
    /// 一次送出所有任務，依完成順序（而非送出順序）逐一回報結果。
    /// 每個任務恰好產生一個結果；單一任務的錯誤不會影響其他任務。
    fn convert_files(
        &self,
        input: ConvertBatchInput,
        on_result: &mut dyn FnMut(&ConversionResult),
    ) -> io::Result<ConvertBatchOutput> {
        let total = input.tasks.len();
        let mut output = ConvertBatchOutput::default();
        if total == 0 {
            return Ok(output);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(input.workers)
            .thread_name(|i| format!("convert-worker-{}", i))
            .build()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("無法建立工作池: {}", e)))?;
        info!("以 {} 個工作執行緒轉換 {} 個檔案", input.workers, total);

        let converter = Arc::new(input.converter);
        let (tx, rx) = mpsc::channel();
        for task in input.tasks {
            let tx = tx.clone();
            let converter = Arc::clone(&converter);
            pool.spawn(move || {
                let result = run_task(task, &converter);
                // 接收端只會在全部結果收齊後才關閉
                let _ = tx.send(result);
            });
        }
        drop(tx);

        for result in rx {
            if result.is_success() {
                output.succeeded += 1;
            } else {
                output.failed += 1;
            }
            on_result(&result);
        }

        let received = output.succeeded + output.failed;
        if received != total {
            error!("預期 {} 個轉換結果，實際收到 {} 個", total, received);
        }
        Ok(output)
    }
}

/// 執行單一任務，任何錯誤（包含 panic）都轉為 `Failure`
fn run_task(task: ConversionTask, converter: &ConverterCommand) -> ConversionResult {
    let source = task.source.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| convert_file(&task, converter))) {
        Ok(result) => result,
        Err(_) => ConversionResult::Failure {
            source,
            diagnostic: "轉換任務發生未預期的 panic".to_string(),
        },
    }
}

/// 呼叫外部轉換程式轉換單一檔案。
///
/// 結束碼 0 為成功；非 0 時以標準錯誤輸出作為診斷訊息；
/// 無法啟動或與子行程溝通失敗時以錯誤訊息作為診斷訊息。此函式不會回傳錯誤。
pub fn convert_file(task: &ConversionTask, converter: &ConverterCommand) -> ConversionResult {
    if let Some(parent) = task.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                return ConversionResult::Failure {
                    source: task.source.clone(),
                    diagnostic: format!("無法建立輸出目錄 {}: {}", parent.display(), e),
                };
            }
        }
    }

    debug!(
        "執行：{} {} {}",
        converter.program.display(),
        task.source.display(),
        task.output.display()
    );
    let outcome = run_converter(task, converter);
    classify_outcome(task, converter, outcome)
}

fn classify_outcome(
    task: &ConversionTask,
    converter: &ConverterCommand,
    outcome: io::Result<Output>,
) -> ConversionResult {
    match outcome {
        Ok(output) if output.status.success() => ConversionResult::Success {
            source: task.source.clone(),
            output: task.output.clone(),
        },
        Ok(output) => {
            let stdout = decode_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                debug!("{} 的標準輸出：{}", task.source.display(), stdout.trim_end());
            }
            let stderr = decode_lossy(&output.stderr);
            let diagnostic = if stderr.trim().is_empty() {
                format!("轉換程式異常結束（{}）", output.status)
            } else {
                stderr.trim_end().to_string()
            };
            ConversionResult::Failure { source: task.source.clone(), diagnostic }
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
            warn!("{} 轉換逾時：{}", task.source.display(), e);
            ConversionResult::Failure { source: task.source.clone(), diagnostic: e.to_string() }
        }
        Err(e) => {
            warn!("無法執行 {}：{}", converter.program.display(), e);
            ConversionResult::Failure {
                source: task.source.clone(),
                diagnostic: format!("無法執行 {}: {}", converter.program.display(), e),
            }
        }
    }
}

/// 以 `<program> <source> <output> [extra_args...]` 執行外部程式並收集輸出
pub fn run_converter(task: &ConversionTask, converter: &ConverterCommand) -> io::Result<Output> {
    let mut command = Command::new(&converter.program);
    command
        .arg(&task.source)
        .arg(&task.output)
        .args(&converter.extra_args)
        .stdin(Stdio::null());

    match converter.timeout {
        None => command.output(),
        Some(timeout) => {
            let child = command.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
            wait_with_timeout(child, timeout)
        }
    }
}

/// 在獨立執行緒讀取整個管線，讀完後經由 channel 送出
fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<mpsc::Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            let _ = tx.send(buffer);
        });
        rx
    })
}

/// 在期限前取得讀取結果；逾期回傳 `None`，讀取執行緒不再等待
fn recv_before(reader: Option<&mpsc::Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(rx) = reader else {
        return Some(Vec::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buffer) => Some(buffer),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}

fn timed_out(timeout: Duration, detail: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("逾時：超過 {} 秒{}", timeout.as_secs_f64(), detail)
    )
}

/// 等待子行程結束並收齊輸出，整體不超過 `timeout`。
///
/// 子行程逾時會被終止；子行程已結束但孫行程仍持有管線時，期限到了也直接放棄讀取。
/// 兩種情況都回傳 `TimedOut` 錯誤。
fn wait_with_timeout(mut child: Child, timeout: Duration) -> io::Result<Output> {
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = recv_before(stdout.as_ref(), deadline);
                let stderr = recv_before(stderr.as_ref(), deadline);
                return match (stdout, stderr) {
                    (Some(stdout), Some(stderr)) => Ok(Output { status, stdout, stderr }),
                    _ => Err(timed_out(timeout, "輸出管線仍未關閉")),
                };
            }
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out(timeout, "仍未完成，已終止"));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// 以 UTF-8 解碼，直接捨棄無效的位元組序列
pub fn decode_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// 去掉來源副檔名並換上目標副檔名
pub fn output_file_name(source: &Path, source_ext: &str, target_ext: &str) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match name.strip_suffix(source_ext) {
        // 檔名就是副檔名本身（如 `.epub`）時保留完整檔名
        Some("") => name.clone(),
        Some(stem) => stem.to_string(),
        None => source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(name.clone()),
    };
    format!("{}{}", stem, target_ext)
}

/// 計算輸出路徑。`Flat` 直接放在輸出目錄；`Mirror` 保留相對於搜尋根目錄的子目錄。
pub fn output_path_for(
    source: &Path,
    search_root: &Path,
    output_dir: &Path,
    layout: OutputLayout,
    source_ext: &str,
    target_ext: &str,
) -> PathBuf {
    let file_name = output_file_name(source, source_ext, target_ext);
    match layout {
        OutputLayout::Flat => output_dir.join(file_name),
        OutputLayout::Mirror => {
            let relative_dir = source
                .parent()
                .and_then(|parent| pathdiff::diff_paths(parent, search_root))
                .filter(|rel| !rel.starts_with(".."));
            match relative_dir {
                Some(rel) => output_dir.join(rel).join(file_name),
                None => output_dir.join(file_name),
            }
        }
    }
}

/// 為每個來源檔案建立一個轉換任務
pub fn plan_tasks(
    files: &[PathBuf],
    search_root: &Path,
    output_dir: &Path,
    layout: OutputLayout,
    source_ext: &str,
    target_ext: &str,
) -> Vec<ConversionTask> {
    files
        .iter()
        .map(|source| ConversionTask {
            source: source.clone(),
            output: output_path_for(source, search_root, output_dir, layout, source_ext, target_ext),
        })
        .collect()
}

/// 找出多個來源對應到同一輸出路徑的情況，依輸出路徑排序
pub fn find_collisions(tasks: &[ConversionTask]) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut by_output: HashMap<&Path, Vec<PathBuf>> = HashMap::new();
    for task in tasks {
        by_output.entry(task.output.as_path()).or_default().push(task.source.clone());
    }
    let mut collisions: Vec<(PathBuf, Vec<PathBuf>)> = by_output
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(output, sources)| (output.to_path_buf(), sources))
        .collect();
    collisions.sort();
    collisions
}
