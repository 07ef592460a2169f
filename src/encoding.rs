/// 文本编码与 BOM 探测
///
/// 解压后的字节流需要先确定编码，再统一转换为 UTF-8（无 BOM）交给编辑器显示；
/// 保存时再按记录下来的编码还原（必要时写回 BOM）。
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use crate::utils::{Result, ViewerError};

pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
pub const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
pub const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF32LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];

/// BOM 探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bom {
    Utf8,
    Utf16Le,
    Utf16Be,
    /// 没有可识别的 BOM（含 UTF-32 BOM）
    None,
}

/// 根据前 4 个字节识别 BOM
///
/// 只识别 UTF-8 与 UTF-16 的 BOM。UTF-32 LE 的 BOM（`FF FE 00 00`）与 UTF-16 LE
/// 共享前缀，需先排除，否则会被误判为 UTF-16 LE。
pub fn detect_bom(bytes: &[u8]) -> Bom {
    let head = &bytes[..bytes.len().min(4)];
    if head.starts_with(UTF8_BOM) {
        Bom::Utf8
    } else if head.starts_with(UTF32LE_BOM) {
        Bom::None
    } else if head.starts_with(UTF16LE_BOM) {
        Bom::Utf16Le
    } else if head.starts_with(UTF16BE_BOM) {
        Bom::Utf16Be
    } else {
        Bom::None
    }
}

/// 文件在磁盘上的文本编码
///
/// `Ansi`（windows-1252）只会来自宿主编辑器的缓冲区编码，BOM 探测永远不会得到它。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Ansi,
}

impl From<Bom> for TextEncoding {
    fn from(bom: Bom) -> Self {
        match bom {
            Bom::Utf8 => TextEncoding::Utf8Bom,
            Bom::Utf16Le => TextEncoding::Utf16Le,
            Bom::Utf16Be => TextEncoding::Utf16Be,
            Bom::None => TextEncoding::Utf8,
        }
    }
}

impl TextEncoding {
    /// 探测字节流的编码（无 BOM 时默认 UTF-8）
    pub fn sniff(bytes: &[u8]) -> Self {
        detect_bom(bytes).into()
    }

    /// 该编码惯用的 BOM（UTF-8 无 BOM 与 ANSI 为空）
    pub fn bom(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8Bom => UTF8_BOM,
            TextEncoding::Utf16Le => UTF16LE_BOM,
            TextEncoding::Utf16Be => UTF16BE_BOM,
            TextEncoding::Utf8 | TextEncoding::Ansi => &[],
        }
    }

    pub fn has_bom(&self) -> bool {
        !self.bom().is_empty()
    }

    /// 状态栏显示用的编码名称
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Ansi => "WINDOWS-1252",
        }
    }

    fn encoding_rs(&self) -> &'static encoding_rs::Encoding {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => encoding_rs::UTF_8,
            TextEncoding::Utf16Le => encoding_rs::UTF_16LE,
            TextEncoding::Utf16Be => encoding_rs::UTF_16BE,
            TextEncoding::Ansi => encoding_rs::WINDOWS_1252,
        }
    }

    /// 将该编码的字节解码为文本，开头的 BOM 会被去掉
    ///
    /// # 返回
    /// 遇到无法解码的字节序列时返回 `EncodingConversion` 错误，而不是替换字符
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let payload = bytes.strip_prefix(self.bom()).unwrap_or(bytes);
        let (text, had_errors) = self.encoding_rs().decode_without_bom_handling(payload);
        if had_errors {
            return Err(ViewerError::EncodingConversion {
                encoding: self.label(),
                reason: "malformed byte sequence".to_string(),
            });
        }
        Ok(text.into_owned())
    }

    /// 将文本编码为该编码的字节，带 BOM 的编码会先写入 BOM
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len() + 3);
        out.extend_from_slice(self.bom());

        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => out.extend_from_slice(text.as_bytes()),
            // encoding_rs 不支持输出 UTF-16，按码元逐个写入
            TextEncoding::Utf16Le => {
                for unit in text.encode_utf16() {
                    out.write_u16::<LittleEndian>(unit)?;
                }
            }
            TextEncoding::Utf16Be => {
                for unit in text.encode_utf16() {
                    out.write_u16::<BigEndian>(unit)?;
                }
            }
            TextEncoding::Ansi => {
                let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(text);
                if unmappable {
                    return Err(ViewerError::EncodingConversion {
                        encoding: self.label(),
                        reason: "text contains characters outside windows-1252".to_string(),
                    });
                }
                out.extend_from_slice(&bytes);
            }
        }

        Ok(out)
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())?;
        if self.has_bom() {
            write!(f, " BOM")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-8-bom" | "utf8-bom" => Ok(TextEncoding::Utf8Bom),
            "utf-16le" | "utf16le" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(TextEncoding::Utf16Be),
            "ansi" | "windows-1252" => Ok(TextEncoding::Ansi),
            other => Err(format!("不支持的编码: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom() {
        assert_eq!(detect_bom(&[0xEF, 0xBB, 0xBF, b'a']), Bom::Utf8);
        assert_eq!(detect_bom(&[0xFF, 0xFE, b'a', 0x00]), Bom::Utf16Le);
        assert_eq!(detect_bom(&[0xFE, 0xFF, 0x00, b'a']), Bom::Utf16Be);
        assert_eq!(detect_bom(b"hello"), Bom::None);
        assert_eq!(detect_bom(&[]), Bom::None);
    }

    #[test]
    fn test_utf32_bom_is_not_detected() {
        assert_eq!(detect_bom(&[0xFF, 0xFE, 0x00, 0x00]), Bom::None);
        assert_eq!(detect_bom(&[0x00, 0x00, 0xFE, 0xFF]), Bom::None);
    }

    #[test]
    fn test_short_prefixes() {
        assert_eq!(detect_bom(&[0xFF, 0xFE]), Bom::Utf16Le);
        assert_eq!(detect_bom(&[0xEF, 0xBB]), Bom::None);
        assert_eq!(detect_bom(&[0xFE]), Bom::None);
    }

    #[test]
    fn test_sniff_defaults_to_utf8() {
        assert_eq!(TextEncoding::sniff(b"plain"), TextEncoding::Utf8);
        assert_eq!(TextEncoding::sniff(&[0xEF, 0xBB, 0xBF]), TextEncoding::Utf8Bom);
    }

    #[test]
    fn test_utf16_encode_writes_bom() {
        let le = TextEncoding::Utf16Le.encode("hi").unwrap();
        assert_eq!(le, vec![0xFF, 0xFE, b'h', 0x00, b'i', 0x00]);

        let be = TextEncoding::Utf16Be.encode("hi").unwrap();
        assert_eq!(be, vec![0xFE, 0xFF, 0x00, b'h', 0x00, b'i']);
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = TextEncoding::Utf8Bom.encode("铁剑").unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
        assert_eq!(TextEncoding::Utf8Bom.decode(&bytes).unwrap(), "铁剑");

        let bytes = TextEncoding::Utf16Be.encode("Mixed 中英文 text").unwrap();
        assert_eq!(TextEncoding::Utf16Be.decode(&bytes).unwrap(), "Mixed 中英文 text");
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let result = TextEncoding::Utf8.decode(&[0xC3, 0x28]);
        assert!(matches!(result, Err(ViewerError::EncodingConversion { .. })));

        // 奇数长度的 UTF-16
        let result = TextEncoding::Utf16Le.decode(&[0xFF, 0xFE, b'a']);
        assert!(result.is_err());
    }

    #[test]
    fn test_ansi_rejects_unmappable() {
        assert_eq!(TextEncoding::Ansi.encode("café").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert!(TextEncoding::Ansi.encode("铁剑").is_err());
    }

    #[test]
    fn test_status_label() {
        assert_eq!(TextEncoding::Utf8.to_string(), "UTF-8");
        assert_eq!(TextEncoding::Utf8Bom.to_string(), "UTF-8 BOM");
        assert_eq!(TextEncoding::Utf16Le.to_string(), "UTF-16LE BOM");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("UTF-16LE".parse::<TextEncoding>().unwrap(), TextEncoding::Utf16Le);
        assert_eq!("ansi".parse::<TextEncoding>().unwrap(), TextEncoding::Ansi);
        assert!("latin-9".parse::<TextEncoding>().is_err());
    }
}
