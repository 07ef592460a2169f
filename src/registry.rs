/// 缓冲区登记表
///
/// 按宿主提供的缓冲区 ID 记录每个打开文档的压缩状态，是"这个缓冲区保存时要不要压缩、
/// 用什么压缩、用什么编码"的唯一权威来源。
///
/// 未知 ID 永远不是错误：查询返回空结果，表示该缓冲区处于 Untracked 状态。
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use crate::codec::CodecKind;
use crate::encoding::TextEncoding;

/// 宿主分配的缓冲区标识（文档打开期间稳定，关闭后可能被复用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 缓冲区的压缩归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Membership {
    /// 从未记录过任何决定
    #[default]
    Untracked,
    /// 正在使用压缩，保存时需要重新压缩
    Included,
    /// 后缀本应匹配压缩算法，但用户（或解压失败）强制为纯文本
    Excluded,
}

/// 编辑器缓冲区当前显示的内容形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Presentation {
    /// 显示解压后的文本（打开或手动解压之后）
    #[default]
    Decoded,
    /// 显示压缩后的字节（手动切换压缩之后）
    Encoded,
}

/// 已启用压缩的缓冲区的压缩参数
///
/// 算法与编码总是成对出现，因此放在同一个结构里。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression {
    pub codec: CodecKind,
    pub encoding: TextEncoding,
    pub presentation: Presentation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tracked {
    Included(Compression),
    Excluded,
}

/// 单个缓冲区的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRecord {
    state: Tracked,
    stored_path: PathBuf,
}

impl BufferRecord {
    pub fn membership(&self) -> Membership {
        match self.state {
            Tracked::Included(_) => Membership::Included,
            Tracked::Excluded => Membership::Excluded,
        }
    }

    pub fn stored_path(&self) -> &Path {
        &self.stored_path
    }

    pub fn compression(&self) -> Option<&Compression> {
        match &self.state {
            Tracked::Included(compression) => Some(compression),
            Tracked::Excluded => None,
        }
    }
}

/// 缓冲区登记表
///
/// # 实现细节
/// - 只保存 Included / Excluded 两种记录；没有记录即 Untracked
/// - Included 记录同时携带算法与编码，Excluded 记录不携带，二者不会不一致
#[derive(Debug, Default)]
pub struct BufferRegistry {
    records: HashMap<BufferId, BufferRecord>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记为 Included（会清除 Excluded 标记）
    pub fn include(
        &mut self,
        id: BufferId,
        path: impl Into<PathBuf>,
        encoding: TextEncoding,
        codec: CodecKind,
    ) {
        self.include_with(id, path, encoding, codec, Presentation::Decoded);
    }

    /// 标记为 Included，并指定编辑器当前显示的内容形态
    pub fn include_with(
        &mut self,
        id: BufferId,
        path: impl Into<PathBuf>,
        encoding: TextEncoding,
        codec: CodecKind,
        presentation: Presentation,
    ) {
        self.records.insert(
            id,
            BufferRecord {
                state: Tracked::Included(Compression {
                    codec,
                    encoding,
                    presentation,
                }),
                stored_path: path.into(),
            },
        );
    }

    /// 标记为 Excluded（清除算法与编码）
    pub fn exclude(&mut self, id: BufferId, path: impl Into<PathBuf>) {
        self.records.insert(
            id,
            BufferRecord {
                state: Tracked::Excluded,
                stored_path: path.into(),
            },
        );
    }

    /// 删除记录（文档关闭时调用）
    pub fn remove(&mut self, id: BufferId) -> Option<BufferRecord> {
        self.records.remove(&id)
    }

    /// 更新 Included 记录的显示形态，其他状态下不做任何事
    pub fn set_presentation(&mut self, id: BufferId, presentation: Presentation) {
        if let Some(BufferRecord {
            state: Tracked::Included(compression),
            ..
        }) = self.records.get_mut(&id)
        {
            compression.presentation = presentation;
        }
    }

    /// 更新已存在记录的存储路径（另存为成功之后）
    pub fn set_stored_path(&mut self, id: BufferId, path: impl Into<PathBuf>) {
        if let Some(record) = self.records.get_mut(&id) {
            record.stored_path = path.into();
        }
    }

    pub fn record(&self, id: BufferId) -> Option<&BufferRecord> {
        self.records.get(&id)
    }

    pub fn membership(&self, id: BufferId) -> Membership {
        self.records
            .get(&id)
            .map(BufferRecord::membership)
            .unwrap_or_default()
    }

    pub fn is_included(&self, id: BufferId) -> bool {
        self.membership(id) == Membership::Included
    }

    pub fn is_excluded(&self, id: BufferId) -> bool {
        self.membership(id) == Membership::Excluded
    }

    pub fn stored_path(&self, id: BufferId) -> Option<&Path> {
        self.records.get(&id).map(BufferRecord::stored_path)
    }

    pub fn compression(&self, id: BufferId) -> Option<&Compression> {
        self.records.get(&id).and_then(BufferRecord::compression)
    }

    pub fn codec(&self, id: BufferId) -> Option<CodecKind> {
        self.compression(id).map(|c| c.codec)
    }

    pub fn encoding(&self, id: BufferId) -> Option<TextEncoding> {
        self.compression(id).map(|c| c.encoding)
    }

    pub fn presentation(&self, id: BufferId) -> Option<Presentation> {
        self.compression(id).map(|c| c.presentation)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
