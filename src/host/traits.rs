/// 宿主编辑器抽象层 - trait 定义
///
/// 核心逻辑只通过这一组窄接口访问编辑器：读写缓冲区原始字节、光标、撤销组、
/// 保存点、路径与保存请求。真实编辑器与内存实现（测试用）都实现该 trait。
use std::path::{Path, PathBuf};
use crate::encoding::TextEncoding;
use crate::registry::BufferId;

/// 宿主编辑器接口
///
/// # 约定
/// - 所有方法针对指定缓冲区；未知 ID 由实现自行忽略
/// - 缓冲区内容以原始字节整体替换，不做增量修改
/// - `request_save` 只登记保存请求，由宿主在当前事件处理结束后执行，
///   因此不会在处理器内部重入
pub trait EditorHost {
    /// 读取缓冲区的原始字节
    fn raw_bytes(&self, id: BufferId) -> Vec<u8>;

    /// 用给定字节替换整个缓冲区内容
    fn replace_content(&mut self, id: BufferId, bytes: &[u8]);

    fn caret(&self, id: BufferId) -> usize;

    fn set_caret(&mut self, id: BufferId, position: usize);

    /// 开始一个撤销组，组内的所有修改可以一步撤销
    fn begin_undo_group(&mut self, id: BufferId);

    fn end_undo_group(&mut self, id: BufferId);

    /// 撤销最近一个撤销组
    fn undo(&mut self, id: BufferId);

    /// 清空撤销历史
    fn reset_undo_history(&mut self, id: BufferId);

    /// 标记保存点（缓冲区变为未修改状态）
    fn mark_save_point(&mut self, id: BufferId);

    fn mark_dirty(&mut self, id: BufferId);

    fn path(&self, id: BufferId) -> PathBuf;

    /// 切换当前活动文档
    fn switch_to(&mut self, path: &Path);

    /// 请求保存该缓冲区
    fn request_save(&mut self, id: BufferId);

    /// 宿主为该缓冲区记录的文本编码（保存时宿主按此编码写盘）
    fn buffer_encoding(&self, id: BufferId) -> TextEncoding;

    fn set_buffer_encoding(&mut self, id: BufferId, encoding: TextEncoding);

    /// 在状态栏显示文本
    fn show_status(&mut self, id: BufferId, text: &str);
}

/// 作用域撤销组
///
/// 创建时调用 `begin_undo_group`，离开作用域时（包括 `?` 提前返回）调用
/// `end_undo_group`，保证撤销组总是成对关闭。
pub struct UndoGroup<'a> {
    host: &'a mut dyn EditorHost,
    id: BufferId,
}

impl<'a> UndoGroup<'a> {
    pub fn begin(host: &'a mut dyn EditorHost, id: BufferId) -> Self {
        host.begin_undo_group(id);
        Self { host, id }
    }

    /// 在撤销组内替换缓冲区内容
    pub fn replace_content(&mut self, bytes: &[u8]) {
        self.host.replace_content(self.id, bytes);
    }
}

impl Drop for UndoGroup<'_> {
    fn drop(&mut self) {
        self.host.end_undo_group(self.id);
    }
}
