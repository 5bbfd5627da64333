use std::io;
use crate::models::conversion::{ConversionInput, ConversionOutput};

// Facade 接口，負責協調檔案收集與轉換流程
pub trait ConversionFacadeTrait: Send + Sync {
    /// 收集檔案並執行轉換，逐一回報結果
    /// # 參數
    /// - input: 轉換所需的輸入參數
    /// # 回傳
    /// - 成功時返回轉換摘要；搜尋目錄無效等致命錯誤時返回 IO 錯誤
    fn execute_conversion(&self, input: ConversionInput) -> io::Result<ConversionOutput>;
}
