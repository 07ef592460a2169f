/// 内存宿主实现
///
/// 用内存中的"磁盘"（路径 → 字节）模拟编辑器，完整实现撤销组、保存点、
/// 脏标记与保存请求队列。用于测试、命令行工具，以及嵌入方的参考实现。
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use super::traits::EditorHost;
use crate::encoding::TextEncoding;
use crate::registry::BufferId;

#[derive(Debug, Clone, Default)]
struct Document {
    path: PathBuf,
    content: Vec<u8>,
    caret: usize,
    encoding: TextEncoding,
    dirty: bool,
    undo_stack: Vec<Vec<u8>>,
    group_depth: usize,
    group_start: Option<Vec<u8>>,
}

/// 内存编辑器
#[derive(Debug, Default)]
pub struct MemoryEditor {
    disk: HashMap<PathBuf, Vec<u8>>,
    documents: BTreeMap<BufferId, Document>,
    next_id: u64,
    active: Option<BufferId>,
    pending_saves: VecDeque<BufferId>,
    status: Option<String>,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 向"磁盘"写入文件
    pub fn write_file(&mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.disk.insert(path.into(), bytes.into());
    }

    /// 读取"磁盘"上的文件
    pub fn file(&self, path: &Path) -> Option<&[u8]> {
        self.disk.get(path).map(Vec::as_slice)
    }

    /// 打开文档（文件不存在时视为新建的空文档）
    ///
    /// 只加载内容并分配 ID，打开事件需要调用方另行分发。
    pub fn open_document(&mut self, path: impl Into<PathBuf>) -> BufferId {
        let path = path.into();
        let content = self.disk.get(&path).cloned().unwrap_or_default();

        self.next_id += 1;
        let id = BufferId(self.next_id);
        self.documents.insert(
            id,
            Document {
                path,
                content,
                ..Document::default()
            },
        );
        self.active = Some(id);
        id
    }

    pub fn close_document(&mut self, id: BufferId) {
        self.documents.remove(&id);
        self.pending_saves.retain(|pending| *pending != id);
        if self.active == Some(id) {
            self.active = self.documents.keys().next().copied();
        }
    }

    /// 模拟用户编辑：整体替换内容，作为独立的撤销步骤
    pub fn type_text(&mut self, id: BufferId, text: &str) {
        self.replace_content(id, text.as_bytes());
        self.set_caret(id, text.len());
    }

    /// 模拟"另存为"：修改文档路径
    pub fn set_path(&mut self, id: BufferId, path: impl Into<PathBuf>) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.path = path.into();
        }
    }

    /// 将缓冲区内容按宿主编码写入磁盘
    ///
    /// UTF-8 之外的编码视为宿主自行转换；缓冲区内容已经是待保存字节时
    /// （例如压缩后的二进制数据）宿主编码应为 UTF-8，原样写出。
    pub fn write_to_disk(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get(&id) {
            let bytes = match doc.encoding {
                TextEncoding::Utf8 => doc.content.clone(),
                encoding => std::str::from_utf8(&doc.content)
                    .ok()
                    .and_then(|text| encoding.encode(text).ok())
                    .unwrap_or_else(|| doc.content.clone()),
            };
            self.disk.insert(doc.path.clone(), bytes);
        }
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.dirty = false;
        }
    }

    /// 取出下一个待执行的保存请求
    pub fn take_save_request(&mut self) -> Option<BufferId> {
        self.pending_saves.pop_front()
    }

    pub fn content(&self, id: BufferId) -> &[u8] {
        self.documents
            .get(&id)
            .map(|doc| doc.content.as_slice())
            .unwrap_or_default()
    }

    pub fn is_dirty(&self, id: BufferId) -> bool {
        self.documents.get(&id).is_some_and(|doc| doc.dirty)
    }

    pub fn undo_depth(&self, id: BufferId) -> usize {
        self.documents.get(&id).map_or(0, |doc| doc.undo_stack.len())
    }

    pub fn active(&self) -> Option<BufferId> {
        self.active
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl EditorHost for MemoryEditor {
    fn raw_bytes(&self, id: BufferId) -> Vec<u8> {
        self.content(id).to_vec()
    }

    fn replace_content(&mut self, id: BufferId, bytes: &[u8]) {
        if let Some(doc) = self.documents.get_mut(&id) {
            let previous = std::mem::replace(&mut doc.content, bytes.to_vec());
            if doc.group_depth == 0 {
                doc.undo_stack.push(previous);
            }
            doc.caret = doc.caret.min(doc.content.len());
            doc.dirty = true;
        }
    }

    fn caret(&self, id: BufferId) -> usize {
        self.documents.get(&id).map_or(0, |doc| doc.caret)
    }

    fn set_caret(&mut self, id: BufferId, position: usize) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.caret = position.min(doc.content.len());
        }
    }

    fn begin_undo_group(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            if doc.group_depth == 0 {
                doc.group_start = Some(doc.content.clone());
            }
            doc.group_depth += 1;
        }
    }

    fn end_undo_group(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.group_depth = doc.group_depth.saturating_sub(1);
            if doc.group_depth == 0 {
                // 组内没有修改时不产生撤销步骤
                if let Some(start) = doc.group_start.take() {
                    if start != doc.content {
                        doc.undo_stack.push(start);
                    }
                }
            }
        }
    }

    fn undo(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            if let Some(previous) = doc.undo_stack.pop() {
                doc.content = previous;
                doc.caret = doc.caret.min(doc.content.len());
                doc.dirty = true;
            }
        }
    }

    fn reset_undo_history(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.undo_stack.clear();
        }
    }

    fn mark_save_point(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.dirty = false;
        }
    }

    fn mark_dirty(&mut self, id: BufferId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.dirty = true;
        }
    }

    fn path(&self, id: BufferId) -> PathBuf {
        self.documents
            .get(&id)
            .map(|doc| doc.path.clone())
            .unwrap_or_default()
    }

    fn switch_to(&mut self, path: &Path) {
        if let Some((id, _)) = self.documents.iter().find(|(_, doc)| doc.path == path) {
            self.active = Some(*id);
        }
    }

    fn request_save(&mut self, id: BufferId) {
        if self.documents.contains_key(&id) {
            self.pending_saves.push_back(id);
        }
    }

    fn buffer_encoding(&self, id: BufferId) -> TextEncoding {
        self.documents
            .get(&id)
            .map(|doc| doc.encoding)
            .unwrap_or_default()
    }

    fn set_buffer_encoding(&mut self, id: BufferId, encoding: TextEncoding) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.encoding = encoding;
        }
    }

    fn show_status(&mut self, _id: BufferId, text: &str) {
        self.status = Some(text.to_string());
    }
}
