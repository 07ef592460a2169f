/// 编辑会话
///
/// 把内存编辑器与生命周期控制器组装在一起，按宿主编辑器的顺序分发事件：
/// 打开文档后分发 Open，保存时依次执行 BeforeSave → 写盘 → FileSaved，
/// 并在 FileSaved 之后继续处理它请求的纠正性保存。
///
/// # 使用示例
///
/// ```rust
/// use compressed_view::{Preferences, Session};
///
/// let mut session = Session::new(Preferences::default());
/// let id = session.open("notes.gz").unwrap();
/// session.editor_mut().type_text(id, "hello\n");
/// session.save(id).unwrap();
/// ```
use std::path::PathBuf;
use crate::codec::CodecKind;
use crate::encoding::TextEncoding;
use crate::host::{EditorHost, MemoryEditor};
use crate::lifecycle::{BufferStatus, LifecycleController};
use crate::preferences::Preferences;
use crate::registry::BufferId;
use crate::utils::Result;

pub struct Session {
    editor: MemoryEditor,
    controller: LifecycleController,
}

impl Session {
    pub fn new(prefs: Preferences) -> Self {
        Self::with_editor(MemoryEditor::new(), prefs)
    }

    /// 使用已经准备好"磁盘"内容的编辑器
    pub fn with_editor(editor: MemoryEditor, prefs: Preferences) -> Self {
        Self {
            editor,
            controller: LifecycleController::new(prefs),
        }
    }

    pub fn editor(&self) -> &MemoryEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut MemoryEditor {
        &mut self.editor
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LifecycleController {
        &mut self.controller
    }

    /// 打开文档并分发 Open 事件
    ///
    /// Open 返回错误时文档会被关闭，错误向上传递。
    pub fn open(&mut self, path: impl Into<PathBuf>) -> Result<BufferId> {
        let id = self.editor.open_document(path);
        if let Err(e) = self.controller.on_open(&mut self.editor, id) {
            self.editor.close_document(id);
            return Err(e);
        }
        self.controller.on_activated(&mut self.editor, id);
        Ok(id)
    }

    /// 保存文档（包括 FileSaved 请求的再次保存）
    pub fn save(&mut self, id: BufferId) -> Result<usize> {
        self.editor.request_save(id);
        self.pump()
    }

    /// 另存为：修改路径后保存
    pub fn save_as(&mut self, id: BufferId, path: impl Into<PathBuf>) -> Result<usize> {
        self.editor.set_path(id, path);
        self.save(id)
    }

    /// 处理所有待执行的保存请求
    ///
    /// 某个保存失败时该文档不会写盘，队列中其余的请求照常执行；
    /// 处理完整个队列后返回第一个错误。
    ///
    /// # 返回
    /// 实际执行的保存次数
    pub fn pump(&mut self) -> Result<usize> {
        let mut saves = 0;
        let mut failure = None;
        while let Some(id) = self.editor.take_save_request() {
            match self.save_once(id) {
                Ok(()) => saves += 1,
                Err(e) => {
                    log::warn!("缓冲区 {} 保存失败: {}", id, e);
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(saves),
        }
    }

    fn save_once(&mut self, id: BufferId) -> Result<()> {
        self.controller.on_before_save(&mut self.editor, id)?;
        self.editor.write_to_disk(id);
        self.controller.on_file_saved(&mut self.editor, id)?;
        Ok(())
    }

    pub fn close(&mut self, id: BufferId) {
        self.controller.on_close(id);
        self.editor.close_document(id);
    }

    pub fn activate(&mut self, id: BufferId) -> BufferStatus {
        self.controller.on_activated(&mut self.editor, id)
    }

    pub fn toggle(&mut self, id: BufferId, kind: CodecKind) -> Result<()> {
        self.controller.toggle_compression(&mut self.editor, id, kind)
    }

    pub fn cycle(&mut self, id: BufferId) -> Result<Option<CodecKind>> {
        self.controller.cycle_compression(&mut self.editor, id)
    }

    pub fn compress(&mut self, id: BufferId, kind: CodecKind) -> Result<()> {
        self.controller.compress(&mut self.editor, id, kind)
    }

    pub fn decompress(&mut self, id: BufferId, kind: CodecKind) -> Result<TextEncoding> {
        self.controller.decompress(&mut self.editor, id, kind)
    }
}
