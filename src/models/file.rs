use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct FileCollectInput {
    pub input_path: PathBuf,
    /// 已正規化為以 `.` 開頭的來源副檔名，大小寫敏感
    pub source_ext: String,
}

#[derive(Debug)]
pub struct FileCollectOutput {
    pub files: Vec<PathBuf>,
    /// 因權限等原因無法讀取而跳過的目錄數
    pub skipped_dirs: u64,
}
