use std::io;
use crate::models::conversion::{ConversionResult, ConvertBatchInput, ConvertBatchOutput};
use crate::models::file::{FileCollectInput, FileCollectOutput};

// File 服務接口，負責檔案收集
pub trait FileServiceTrait: Send + Sync {
    /// 收集符合副檔名的檔案
    /// # 參數
    /// - input: 檔案收集的輸入參數
    /// # 回傳
    /// - 成功時返回收集的檔案列表與跳過的目錄數，搜尋目錄無效時返回 IO 錯誤
    fn collect_files(&self, input: FileCollectInput) -> io::Result<FileCollectOutput>;
}

// Convert 服務接口，負責平行呼叫外部轉換程式
pub trait ConvertServiceTrait: Send + Sync {
    /// 執行所有轉換任務
    /// # 參數
    /// - input: 任務列表、轉換程式與工作執行緒數
    /// - on_result: 每個任務完成時依完成順序呼叫一次
    /// # 回傳
    /// - 成功與失敗的數量；單一任務失敗不會造成錯誤，僅工作池無法建立時返回 IO 錯誤
    fn convert_files(
        &self,
        input: ConvertBatchInput,
        on_result: &mut dyn FnMut(&ConversionResult),
    ) -> io::Result<ConvertBatchOutput>;
}
