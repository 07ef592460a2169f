/// 生命周期状态机
///
/// 每个缓冲区的状态与登记表中的归属一致：Untracked → Included ⇄ Excluded，
/// 只有关闭文档（`remove`）才会回到 Untracked。
use std::collections::{HashMap, HashSet};
use std::path::Path;
use crate::codec::{Codec, CodecKind};
use crate::encoding::TextEncoding;
use crate::host::{EditorHost, UndoGroup};
use crate::preferences::Preferences;
use crate::registry::{BufferId, BufferRegistry, Membership, Presentation};
use crate::transcode::{decode_for_display, decode_with, encode_for_storage};
use crate::utils::{Result, ViewerError};
use super::save::{SaveOutcome, SaveTransaction};

/// Open 事件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// 解压成功（或空文件），缓冲区显示解压后的文本
    Included(CodecKind),
    /// 后缀匹配了某个算法但无法解压
    Excluded,
    /// 没有找到压缩
    Untracked,
}

/// 状态栏信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStatus {
    pub codec: Option<CodecKind>,
    pub encoding: TextEncoding,
}

impl BufferStatus {
    /// 格式化为 "gzip/UTF-8"、"bzip2/UTF-16LE BOM" 等
    pub fn text(&self) -> String {
        match self.codec {
            Some(codec) => format!("{}/{}", codec, self.encoding),
            None => self.encoding.to_string(),
        }
    }
}

impl std::fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}

/// 生命周期控制器
///
/// 拥有缓冲区登记表与保存事务表；宿主编辑器以 `&mut dyn EditorHost`
/// 的形式传入每个处理器，控制器本身不持有编辑器。
#[derive(Debug, Default)]
pub struct LifecycleController {
    pub(super) prefs: Preferences,
    pub(super) registry: BufferRegistry,
    saves: HashMap<BufferId, SaveTransaction>,
    /// 已请求纠正性保存、尚未进入 BeforeSave 的缓冲区
    corrective_pending: HashSet<BufferId>,
}

impl LifecycleController {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            ..Self::default()
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// 修改配置（下一次事件立即生效）
    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    pub fn save_transaction(&self, id: BufferId) -> Option<&SaveTransaction> {
        self.saves.get(&id)
    }

    /// 处理文档打开
    ///
    /// # 返回
    /// - 解压失败不是错误，只影响返回的结果
    /// - 解压成功但文本编码转换失败时返回错误，登记表不做任何修改
    pub fn on_open(&mut self, host: &mut dyn EditorHost, id: BufferId) -> Result<OpenOutcome> {
        let path = host.path(id);
        let raw = host.raw_bytes(id);
        let by_suffix = self.prefs.kind_by_suffix(&path);

        if raw.is_empty() {
            // 空文件不经过解压器：后缀匹配时直接视为解压成功，否则不做探测
            let Some(kind) = by_suffix else {
                log::debug!("{} 是空文件，没有匹配的后缀", path.display());
                return Ok(OpenOutcome::Untracked);
            };
            let encoding = adopt_host_encoding(host, id);
            self.registry.include(id, &path, encoding, kind);
            log::info!("{} 是空文件，按 {} 处理", path.display(), kind);
            return Ok(OpenOutcome::Included(kind));
        }

        let candidates: Vec<Codec> = self
            .prefs
            .probe_order(&path, self.prefs.decompress_all)
            .into_iter()
            .cloned()
            .collect();
        for codec in &candidates {
            if self.try_open_with(host, id, &path, &raw, codec)? {
                return Ok(OpenOutcome::Included(codec.kind()));
            }
        }

        if let Some(kind) = by_suffix {
            log::info!("{} 无法按 {} 解压，标记为纯文本", path.display(), kind);
            self.registry.exclude(id, &path);
            return Ok(OpenOutcome::Excluded);
        }

        log::debug!("{} 没有找到压缩", path.display());
        Ok(OpenOutcome::Untracked)
    }

    /// 尝试用一个算法解压并显示
    ///
    /// # 返回
    /// 成功返回 true；解压失败返回 false；其他错误向上传递
    fn try_open_with(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
        path: &Path,
        raw: &[u8],
        codec: &Codec,
    ) -> Result<bool> {
        let decoded = match decode_for_display(raw, codec) {
            Ok(decoded) => decoded,
            Err(e) if e.is_decode_failure() => {
                log::debug!("{} 不是 {} 格式: {}", path.display(), codec, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        host.replace_content(id, &decoded.text);
        host.set_buffer_encoding(id, TextEncoding::Utf8);
        host.set_caret(id, 0);
        host.reset_undo_history(id);
        host.mark_save_point(id);

        self.registry.include(id, path, decoded.encoding, codec.kind());
        log::info!("{} 使用 {} 压缩，编码 {}", path.display(), codec, decoded.encoding);
        Ok(true)
    }

    /// 处理保存前事件
    ///
    /// 记录保存事务；缓冲区处于压缩状态时，把显示文本替换为压缩后的字节
    /// （单个撤销组，保存后撤销还原）。
    ///
    /// 保存开始时的算法按 `effective_codec` 决定：从未记录过、但路径后缀匹配
    /// 某个算法的缓冲区在第一次保存时就压缩，并接管宿主的缓冲区编码。
    pub fn on_before_save(&mut self, host: &mut dyn EditorHost, id: BufferId) -> Result<()> {
        let corrective = self.corrective_pending.remove(&id);
        let path = host.path(id);
        let start = self.effective_codec(id, &path);
        let cursor_position = host.caret(id);

        // 失败时不留下保存事务，缓冲区内容保持不变
        let transcoded = match start {
            Some(kind) => self.substitute_compressed(host, id, &path, kind)?,
            None => false,
        };

        self.saves.insert(
            id,
            SaveTransaction {
                compression_at_save_start: start,
                cursor_position,
                transcoded,
                corrective,
            },
        );
        Ok(())
    }

    /// 把显示文本替换为压缩后的字节
    ///
    /// # 返回
    /// 是否替换了缓冲区内容（Encoded 形态原样写盘，不替换）
    fn substitute_compressed(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
        path: &Path,
        kind: CodecKind,
    ) -> Result<bool> {
        let (encoding, presentation) = match self.registry.compression(id) {
            Some(compression) => (compression.encoding, compression.presentation),
            None => (host.buffer_encoding(id), Presentation::Decoded),
        };
        if presentation == Presentation::Encoded {
            // 缓冲区里已经是压缩数据，原样写盘
            return Ok(false);
        }

        let codec = self.codec_config(kind)?;
        let stored = encode_for_storage(&host.raw_bytes(id), encoding, &codec)?;
        if !self.registry.is_included(id) {
            let encoding = adopt_host_encoding(host, id);
            self.registry.include(id, path, encoding, kind);
            log::info!("{} 按后缀使用 {} 压缩，编码 {}", path.display(), kind, encoding);
        }

        let mut group = UndoGroup::begin(host, id);
        group.replace_content(&stored);
        log::debug!("缓冲区 {} 以 {} 压缩保存", id, kind);
        Ok(true)
    }

    /// 处理保存完成事件
    ///
    /// 按（可能已经改变的）路径重新计算目标算法，与保存开始时的算法比较：
    /// - 不同：撤销压缩替换，更新登记表，请求再保存一次（只允许一次）
    /// - 相同且有压缩：撤销替换，恢复光标，重置撤销历史并标记保存点
    pub fn on_file_saved(&mut self, host: &mut dyn EditorHost, id: BufferId) -> Result<SaveOutcome> {
        let Some(transaction) = self.saves.remove(&id) else {
            return Ok(SaveOutcome::Unchanged);
        };
        let path = host.path(id);
        let start = transaction.compression_at_save_start;
        let target = self.target_codec(id, &path);

        if target != start {
            if transaction.corrective {
                if transaction.transcoded {
                    host.undo(id);
                }
                host.set_caret(id, transaction.cursor_position);
                log::warn!(
                    "{} 纠正性保存后目标算法仍不一致 ({:?} → {:?})，不再重新保存",
                    path.display(),
                    start,
                    target
                );
                return Ok(SaveOutcome::Abandoned);
            }
            return self.resave(host, id, &path, transaction, target);
        }

        self.registry.set_stored_path(id, &path);
        if start.is_none() {
            return Ok(SaveOutcome::Unchanged);
        }

        if transaction.transcoded {
            host.undo(id);
        }
        host.set_caret(id, transaction.cursor_position);
        host.reset_undo_history(id);
        host.mark_save_point(id);
        host.mark_save_point(id);
        log::debug!("{} 已按压缩格式保存", path.display());
        Ok(SaveOutcome::Restored)
    }

    /// 保存期间目标算法发生变化：恢复显示文本、更新登记表并请求再次保存
    fn resave(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
        path: &Path,
        transaction: SaveTransaction,
        target: Option<CodecKind>,
    ) -> Result<SaveOutcome> {
        if transaction.transcoded {
            host.undo(id);
        }
        host.set_caret(id, transaction.cursor_position);

        // 手动切换后缓冲区里是旧算法的压缩数据，先还原为文本
        let plain = self.display_text(host, id)?;
        let tracked = self.registry.encoding(id);
        if self.registry.presentation(id) == Some(Presentation::Encoded) {
            let mut group = UndoGroup::begin(host, id);
            group.replace_content(&plain);
        }

        match target {
            Some(kind) => {
                let encoding = match tracked {
                    Some(encoding) => encoding,
                    None => adopt_host_encoding(host, id),
                };
                self.registry.include(id, path, encoding, kind);
            }
            None => {
                if let Some(encoding) = tracked {
                    host.set_buffer_encoding(id, encoding);
                }
                self.registry.exclude(id, path);
            }
        }

        log::info!(
            "{} 保存期间压缩设置改变 ({:?} → {:?})，重新保存",
            path.display(),
            transaction.compression_at_save_start,
            target
        );
        host.mark_dirty(id);
        host.switch_to(path);
        self.corrective_pending.insert(id);
        host.request_save(id);
        Ok(SaveOutcome::Resaved { target })
    }

    /// 处理文档关闭
    pub fn on_close(&mut self, id: BufferId) {
        self.registry.remove(id);
        self.saves.remove(&id);
        self.corrective_pending.remove(&id);
    }

    /// 处理文档激活：刷新状态栏，不改变任何状态
    pub fn on_activated(&self, host: &mut dyn EditorHost, id: BufferId) -> BufferStatus {
        let status = self.status(host, id);
        if self.prefs.update_status_bar && self.registry.is_included(id) {
            host.show_status(id, &status.text());
        }
        status
    }

    /// 查询缓冲区的有效算法与编码
    pub fn status(&self, host: &dyn EditorHost, id: BufferId) -> BufferStatus {
        BufferStatus {
            codec: self.effective_codec(id, &host.path(id)),
            encoding: self
                .registry
                .encoding(id)
                .unwrap_or_else(|| host.buffer_encoding(id)),
        }
    }

    /// 有效算法：显式记录优先，从未记录过时按后缀匹配
    pub fn effective_codec(&self, id: BufferId, path: &Path) -> Option<CodecKind> {
        match self.registry.membership(id) {
            Membership::Included => self.registry.codec(id),
            Membership::Excluded => None,
            Membership::Untracked => self.prefs.kind_by_suffix(path),
        }
    }

    /// 保存后应当生效的算法
    ///
    /// 路径的后缀类别（后缀匹配到的算法）发生变化时，新路径的后缀优先；
    /// 否则保留已有的 Included / Excluded 决定，从未记录过时才按后缀匹配。
    pub fn target_codec(&self, id: BufferId, path: &Path) -> Option<CodecKind> {
        let by_suffix = self.prefs.kind_by_suffix(path);
        let Some(record) = self.registry.record(id) else {
            return by_suffix;
        };

        if self.prefs.kind_by_suffix(record.stored_path()) != by_suffix {
            by_suffix
        } else {
            record.compression().map(|c| c.codec)
        }
    }

    /// 获取可用的算法配置
    pub(super) fn codec_config(&self, kind: CodecKind) -> Result<Codec> {
        self.prefs
            .codec(kind)
            .filter(|codec| codec.is_supported())
            .cloned()
            .ok_or_else(|| ViewerError::CodecUnavailable(kind.name().to_string()))
    }

    /// 缓冲区当前对应的 UTF-8 文本
    ///
    /// 显示形态为 Encoded 时按登记的算法与编码解压，否则就是原始字节。
    pub(super) fn display_text(&self, host: &dyn EditorHost, id: BufferId) -> Result<Vec<u8>> {
        let raw = host.raw_bytes(id);
        match self.registry.compression(id) {
            Some(compression) if compression.presentation == Presentation::Encoded => {
                let codec = self.codec_config(compression.codec)?;
                decode_with(&raw, &codec, compression.encoding)
            }
            _ => Ok(raw),
        }
    }
}

/// 接管宿主的缓冲区编码作为登记编码，并把宿主切换为 UTF-8 显示
pub(super) fn adopt_host_encoding(host: &mut dyn EditorHost, id: BufferId) -> TextEncoding {
    let encoding = host.buffer_encoding(id);
    host.set_buffer_encoding(id, TextEncoding::Utf8);
    encoding
}
