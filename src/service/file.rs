use std::io;
use std::path::Path;
use log::{debug, info, warn};
use walkdir::WalkDir;
use crate::models::file::{FileCollectInput, FileCollectOutput};
use crate::service::traits::i_service::FileServiceTrait;

/// 檔案服務，負責遞迴收集待轉換的檔案
pub struct FileService;

impl FileService {
    pub fn new() -> Self {
        FileService
    }
}

impl Default for FileService {
    fn default() -> Self {
        Self::new()
    }
}

impl FileServiceTrait for FileService {
    fn collect_files(&self, input: FileCollectInput) -> io::Result<FileCollectOutput> {
        collect_files(&input.input_path, &input.source_ext)
    }
}

/// 根目錄不存在或不是目錄時回傳錯誤，整個流程隨之中止
pub fn ensure_root_dir(root: &Path) -> io::Result<()> {
    if !root.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("搜尋目錄 '{}' 不存在", root.display())
        ));
    }
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("搜尋路徑 '{}' 不是目錄", root.display())
        ));
    }
    Ok(())
}

/// 檔名（大小寫敏感）是否以指定副檔名結尾
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(ext))
        .unwrap_or(false)
}

/// 走訪錯誤是否來自一個目錄；只有目錄才計入 `skipped_dirs`
pub fn is_skipped_dir(path: Option<&Path>) -> bool {
    path.map(|p| p.is_dir()).unwrap_or(false)
}

/// 遞迴收集 `root` 下所有檔名以 `ext` 結尾的一般檔案。
///
/// 每層依檔名排序，相同目錄狀態下結果順序固定。無法讀取的子目錄會記錄警告後跳過，
/// 其中的檔案不列入結果，數量計入 `skipped_dirs`。
pub fn collect_files(root: &Path, ext: &str) -> io::Result<FileCollectOutput> {
    ensure_root_dir(root)?;

    let mut files = Vec::new();
    let mut skipped_dirs = 0u64;
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e.into_io_error().unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, format!("無法讀取搜尋目錄 '{}'", root.display()))
                }));
            }
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                if is_skipped_dir(e.path()) {
                    warn!("無法讀取目錄 {}，跳過：{}", path, e);
                    skipped_dirs += 1;
                } else {
                    warn!("無法讀取 {}，略過：{}", path, e);
                }
                continue;
            }
        };

        let file_type = entry.file_type();
        let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if is_file && has_extension(entry.path(), ext) {
            debug!("找到檔案：{}", entry.path().display());
            files.push(entry.into_path());
        }
    }

    info!(
        "在 {} 下找到 {} 個 {} 檔案，跳過 {} 個目錄",
        root.display(),
        files.len(),
        ext,
        skipped_dirs
    );
    Ok(FileCollectOutput { files, skipped_dirs })
}
