use std::io;
use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};

pub fn parse_log_level(log_level: &str) -> log::LevelFilter {
    match log_level {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    }
}

pub fn setup_logging(log_level: &str) -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(parse_log_level(log_level))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("日誌初始化失敗: {}", e)))
}

pub struct ProgressManager {
    pb: ProgressBar,
    no_progress: bool,
    start: Instant,
}

impl ProgressManager {
    pub fn new(total: u64, no_progress: bool) -> Self {
        let pb = if no_progress {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len} ETA: {eta_precise}")
                .map(|style| style.progress_chars("##-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb
        };
        ProgressManager {
            pb,
            no_progress,
            start: Instant::now(),
        }
    }

    /// 在進度條上方輸出一行狀態，隱藏進度條時直接輸出
    pub fn println(&self, line: &str) {
        self.pb.suspend(|| println!("{}", line));
    }

    pub fn update(&self, succeeded: usize, failed: usize) {
        if self.no_progress {
            return;
        }
        let done = (succeeded + failed) as u64;
        let elapsed = self.start.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 { done as f64 / elapsed } else { 0.0 };
        self.pb.set_message(format!(
            "成功 {}，失敗 {}，速度：{:.2} 檔案/秒",
            succeeded, failed, speed
        ));
        self.pb.set_position(done);
    }

    pub fn finish(&self, succeeded: usize, failed: usize, skipped_dirs: u64) {
        if self.no_progress {
            return;
        }
        self.pb.finish_with_message(format!(
            "完成，成功 {} 個，失敗 {} 個，跳過 {} 個目錄，耗時 {}",
            succeeded,
            failed,
            skipped_dirs,
            format_duration(self.start.elapsed())
        ));
    }
}

pub fn create_progress_bar(total: u64, no_progress: bool) -> ProgressManager {
    ProgressManager::new(total, no_progress)
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2} 秒", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{} 分 {} 秒", secs / 60, secs % 60)
    } else {
        format!("{} 時 {} 分 {} 秒", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
