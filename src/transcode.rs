/// 转码管线
///
/// 打开时：解压 → 探测 BOM → 转为 UTF-8（无 BOM）供编辑器显示；
/// 保存时：UTF-8 → 目标编码（含 BOM）→ 压缩。
///
/// 两个操作都是显式字节缓冲区上的纯函数，不读写编辑器或缓冲区登记表。
use crate::codec::Codec;
use crate::encoding::TextEncoding;
use crate::utils::{Result, ViewerError};

/// 解压后的显示内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// UTF-8（无 BOM）字节
    pub text: Vec<u8>,
    /// 磁盘上的原始编码，保存时需要还原
    pub encoding: TextEncoding,
}

/// 解压并转换为显示用的 UTF-8
///
/// # 返回
/// - 解压失败返回 `Decode` 错误（调用方视为"不是这种压缩格式"）
/// - 解压成功但字节不符合探测到的编码时返回 `EncodingConversion` 错误
pub fn decode_for_display(compressed: &[u8], codec: &Codec) -> Result<DecodedText> {
    let raw = codec.decompress_bytes(compressed)?;
    let encoding = TextEncoding::sniff(&raw);
    let text = encoding.decode(&raw)?;

    Ok(DecodedText {
        text: text.into_bytes(),
        encoding,
    })
}

/// 按已知编码解压为 UTF-8（不重新探测）
///
/// 用于缓冲区当前显示的是压缩字节、编码已经记录在登记表中的情况。
pub fn decode_with(compressed: &[u8], codec: &Codec, encoding: TextEncoding) -> Result<Vec<u8>> {
    let raw = codec.decompress_bytes(compressed)?;
    Ok(encoding.decode(&raw)?.into_bytes())
}

/// 将显示用的 UTF-8 转为目标编码后压缩
///
/// 目标编码就是 UTF-8（无 BOM）时直接压缩原字节。
pub fn encode_for_storage(display: &[u8], target: TextEncoding, codec: &Codec) -> Result<Vec<u8>> {
    if target == TextEncoding::Utf8 {
        return codec.compress_bytes(display);
    }

    let text = std::str::from_utf8(display).map_err(|e| ViewerError::EncodingConversion {
        encoding: TextEncoding::Utf8.label(),
        reason: e.to_string(),
    })?;
    let encoded = target.encode(text)?;
    codec.compress_bytes(&encoded)
}
