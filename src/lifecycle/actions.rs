/// 用户操作
///
/// 切换压缩、轮换压缩、手动压缩、手动解压。这些操作作用于缓冲区的当前内容
/// （不是磁盘上的文件），与 Open 使用同一套 include / exclude 入口。
///
/// 所有操作先完成全部计算再修改状态：返回错误时编辑器与登记表都不变。
use crate::codec::CodecKind;
use crate::encoding::TextEncoding;
use crate::host::{EditorHost, UndoGroup};
use crate::registry::{BufferId, Presentation};
use crate::transcode::{decode_for_display, encode_for_storage};
use crate::utils::Result;
use super::controller::LifecycleController;

impl LifecycleController {
    /// 切换压缩
    ///
    /// 已经使用同一算法时关闭压缩（恢复纯文本并标记为 Excluded），
    /// 否则用该算法压缩当前文本，缓冲区显示压缩后的字节。
    pub fn toggle_compression(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
        kind: CodecKind,
    ) -> Result<()> {
        let target = if self.registry.codec(id) == Some(kind) {
            None
        } else {
            Some(kind)
        };
        self.select_compression(host, id, target)
    }

    /// 按轮换顺序切换到下一个算法
    ///
    /// # 返回
    /// 切换后的算法，None 表示已关闭压缩
    pub fn cycle_compression(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
    ) -> Result<Option<CodecKind>> {
        let by_suffix = self.prefs.kind_by_suffix(&host.path(id));
        let next = self.prefs.next_codec(self.registry.codec(id), by_suffix);
        self.select_compression(host, id, next)?;
        Ok(next)
    }

    fn select_compression(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
        target: Option<CodecKind>,
    ) -> Result<()> {
        let path = host.path(id);
        let plain = self.display_text(host, id)?;
        let tracked = self.registry.encoding(id);

        match target {
            None => {
                if self.registry.presentation(id) == Some(Presentation::Encoded) {
                    let mut group = UndoGroup::begin(host, id);
                    group.replace_content(&plain);
                }
                if let Some(encoding) = tracked {
                    host.set_buffer_encoding(id, encoding);
                }
                self.registry.exclude(id, &path);
                log::info!("缓冲区 {} 关闭压缩", id);
            }
            Some(kind) => {
                let codec = self.codec_config(kind)?;
                let encoding = tracked.unwrap_or_else(|| host.buffer_encoding(id));
                let stored = encode_for_storage(&plain, encoding, &codec)?;
                {
                    let mut group = UndoGroup::begin(host, id);
                    group.replace_content(&stored);
                }
                host.set_buffer_encoding(id, TextEncoding::Utf8);
                self.registry
                    .include_with(id, &path, encoding, kind, Presentation::Encoded);
                log::info!("缓冲区 {} 切换为 {} 压缩", id, kind);
            }
        }

        host.mark_dirty(id);
        Ok(())
    }

    /// 手动压缩
    ///
    /// 缓冲区内容替换为压缩后的字节并标记为 Excluded，之后按原样保存。
    pub fn compress(&mut self, host: &mut dyn EditorHost, id: BufferId, kind: CodecKind) -> Result<()> {
        let codec = self.codec_config(kind)?;
        let plain = self.display_text(host, id)?;
        let encoding = self
            .registry
            .encoding(id)
            .unwrap_or_else(|| host.buffer_encoding(id));
        let stored = encode_for_storage(&plain, encoding, &codec)?;

        {
            let mut group = UndoGroup::begin(host, id);
            group.replace_content(&stored);
        }
        host.set_buffer_encoding(id, TextEncoding::Utf8);
        self.registry.exclude(id, host.path(id));
        host.mark_dirty(id);
        log::info!("缓冲区 {} 已手动压缩为 {}", id, kind);
        Ok(())
    }

    /// 手动解压
    ///
    /// 与 Open 相同：显示解压后的文本，按探测到的编码标记为 Included。
    ///
    /// # 返回
    /// 探测到的文本编码
    pub fn decompress(
        &mut self,
        host: &mut dyn EditorHost,
        id: BufferId,
        kind: CodecKind,
    ) -> Result<TextEncoding> {
        let codec = self.codec_config(kind)?;
        let decoded = decode_for_display(&host.raw_bytes(id), &codec)?;

        {
            let mut group = UndoGroup::begin(host, id);
            group.replace_content(&decoded.text);
        }
        host.set_buffer_encoding(id, TextEncoding::Utf8);
        self.registry.include(id, host.path(id), decoded.encoding, kind);
        host.mark_dirty(id);
        log::info!("缓冲区 {} 已手动解压 ({}, {})", id, kind, decoded.encoding);
        Ok(decoded.encoding)
    }
}
