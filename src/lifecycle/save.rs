/// 保存事务
///
/// BeforeSave 与 FileSaved 两个事件之间的临时状态。BeforeSave 时创建，
/// FileSaved（或文档关闭）时取出并丢弃。
use crate::codec::CodecKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveTransaction {
    /// BeforeSave 时生效的压缩算法
    pub compression_at_save_start: Option<CodecKind>,
    /// BeforeSave 时的光标位置，撤销压缩替换后恢复
    pub cursor_position: usize,
    /// BeforeSave 是否真的把缓冲区替换成了压缩数据（决定 FileSaved 是否需要撤销）
    pub transcoded: bool,
    /// 本次保存是否为纠正性的二次保存
    pub corrective: bool,
}

/// FileSaved 的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 前后都没有压缩，或没有对应的 BeforeSave
    Unchanged,
    /// 文件已按压缩格式写盘，缓冲区恢复为解压后的文本
    Restored,
    /// 保存期间目标算法发生变化，已撤销替换并请求再次保存
    Resaved { target: Option<CodecKind> },
    /// 纠正性保存之后目标算法仍不一致，放弃继续保存
    Abandoned,
}

impl SaveOutcome {
    pub fn requested_save(&self) -> bool {
        matches!(self, SaveOutcome::Resaved { .. })
    }
}
