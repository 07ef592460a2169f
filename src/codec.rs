/// 压缩算法模块
///
/// 每种算法是一个无状态的字节流变换：`compress` / `decompress` 都完整读取输入、
/// 完整产出输出。算法集合是封闭的（`CodecKind`），新增算法需要扩展枚举。
///
/// # 使用示例
///
/// ```rust
/// use compressed_view::codec::{Codec, CodecKind};
///
/// let gzip = Codec::with_defaults(CodecKind::Gzip);
/// let packed = gzip.compress_bytes(b"hello\n").unwrap();
/// assert_eq!(gzip.decompress_bytes(&packed).unwrap(), b"hello\n");
/// ```
mod backends;

use std::io::Read;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::utils::{path_has_suffix, Result, ViewerError};

/// 压缩算法标识
///
/// 名称（`name()`）会写入配置文件，必须保持稳定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    Gzip,
    Bzip2,
    Zstd,
    Xz,
    Brotli,
}

impl CodecKind {
    /// 所有算法，按默认排序
    pub const ALL: [CodecKind; 5] = [
        CodecKind::Gzip,
        CodecKind::Bzip2,
        CodecKind::Zstd,
        CodecKind::Xz,
        CodecKind::Brotli,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Gzip => "gzip",
            CodecKind::Bzip2 => "bzip2",
            CodecKind::Zstd => "zstd",
            CodecKind::Xz => "xz",
            CodecKind::Brotli => "brotli",
        }
    }

    /// 从名称获取算法（忽略大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// 默认关联的文件后缀
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            CodecKind::Gzip => &[".gz", ".gzip"],
            CodecKind::Bzip2 => &[".bz2", ".bzip2"],
            CodecKind::Zstd => &[".zst"],
            CodecKind::Xz => &[".xz"],
            CodecKind::Brotli => &[".br"],
        }
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GzipSettings {
    /// 0-9
    pub level: u32,
}

impl Default for GzipSettings {
    fn default() -> Self {
        Self { level: 9 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bzip2Settings {
    /// 1-9（块大小，单位 100k）
    pub level: u32,
}

impl Default for Bzip2Settings {
    fn default() -> Self {
        Self { level: 9 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZstdSettings {
    pub level: i32,
}

impl Default for ZstdSettings {
    fn default() -> Self {
        Self { level: 11 }
    }
}

/// xz 完整性校验类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XzCheck {
    None,
    Crc32,
    #[default]
    Crc64,
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XzSettings {
    /// 0-9
    pub preset: u32,
    pub extreme: bool,
    pub check: XzCheck,
}

impl Default for XzSettings {
    fn default() -> Self {
        Self {
            preset: 6,
            extreme: false,
            check: XzCheck::Crc64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrotliSettings {
    /// 0-11
    pub quality: u32,
    /// 窗口大小（log2），10-24
    pub window: u32,
}

impl Default for BrotliSettings {
    fn default() -> Self {
        Self {
            quality: 11,
            window: 22,
        }
    }
}

/// 算法专属的调优参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum CodecSettings {
    Gzip(GzipSettings),
    Bzip2(Bzip2Settings),
    Zstd(ZstdSettings),
    Xz(XzSettings),
    Brotli(BrotliSettings),
}

impl CodecSettings {
    pub fn defaults(kind: CodecKind) -> Self {
        match kind {
            CodecKind::Gzip => CodecSettings::Gzip(GzipSettings::default()),
            CodecKind::Bzip2 => CodecSettings::Bzip2(Bzip2Settings::default()),
            CodecKind::Zstd => CodecSettings::Zstd(ZstdSettings::default()),
            CodecKind::Xz => CodecSettings::Xz(XzSettings::default()),
            CodecKind::Brotli => CodecSettings::Brotli(BrotliSettings::default()),
        }
    }

    pub fn kind(&self) -> CodecKind {
        match self {
            CodecSettings::Gzip(_) => CodecKind::Gzip,
            CodecSettings::Bzip2(_) => CodecKind::Bzip2,
            CodecSettings::Zstd(_) => CodecKind::Zstd,
            CodecSettings::Xz(_) => CodecKind::Xz,
            CodecSettings::Brotli(_) => CodecKind::Brotli,
        }
    }
}

fn assume_supported() -> bool {
    true
}

/// 一个已配置的压缩算法
///
/// # 字段
/// - `settings`: 算法及其调优参数
/// - `extensions`: 该算法认领的文件后缀（按配置顺序）
/// - `supported`: 底层库是否可用，由 `initialize` 更新，不写入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codec {
    pub settings: CodecSettings,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(skip, default = "assume_supported")]
    supported: bool,
}

impl PartialEq for Codec {
    fn eq(&self, other: &Self) -> bool {
        self.settings == other.settings && self.extensions == other.extensions
    }
}

impl Codec {
    pub fn new(settings: CodecSettings, extensions: Vec<String>) -> Self {
        Self {
            settings,
            extensions,
            supported: true,
        }
    }

    /// 使用默认参数与默认后缀创建
    pub fn with_defaults(kind: CodecKind) -> Self {
        Self::new(
            CodecSettings::defaults(kind),
            kind.default_extensions().iter().map(|ext| ext.to_string()).collect(),
        )
    }

    pub fn kind(&self) -> CodecKind {
        self.settings.kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Vec<String> {
        &mut self.extensions
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// 检查底层实现是否可用并更新 `is_supported`
    ///
    /// 可重复调用。gzip/bzip2/brotli 为纯静态链接实现，总是可用；
    /// zstd 与 xz 会尝试按当前参数创建一次编码上下文。
    pub fn initialize(&mut self) -> bool {
        self.supported = match &self.settings {
            CodecSettings::Zstd(settings) => backends::zstd_available(settings),
            CodecSettings::Xz(settings) => backends::xz_available(settings),
            CodecSettings::Gzip(_) | CodecSettings::Bzip2(_) | CodecSettings::Brotli(_) => true,
        };
        if !self.supported {
            log::warn!("{} 初始化失败，已禁用", self.name());
        }
        self.supported
    }

    /// 路径是否匹配该算法的任一后缀（忽略大小写）
    pub fn matches(&self, path: &Path) -> bool {
        self.extensions.iter().any(|ext| path_has_suffix(path, ext))
    }

    /// 压缩整个输入流
    pub fn compress(&self, input: &mut dyn Read) -> Result<Vec<u8>> {
        self.ensure_supported()?;
        let result = match &self.settings {
            CodecSettings::Gzip(settings) => backends::gzip_compress(input, settings),
            CodecSettings::Bzip2(settings) => backends::bzip2_compress(input, settings),
            CodecSettings::Zstd(settings) => backends::zstd_compress(input, settings),
            CodecSettings::Xz(settings) => backends::xz_compress(input, settings),
            CodecSettings::Brotli(settings) => backends::brotli_compress(input, settings),
        };
        result.map_err(|source| ViewerError::Encode {
            codec: self.name(),
            source,
        })
    }

    /// 解压整个输入流
    ///
    /// 输入不是该算法的合法数据（魔数不符、数据截断等）时返回 `Decode` 错误，
    /// 不会返回部分结果。
    pub fn decompress(&self, input: &mut dyn Read) -> Result<Vec<u8>> {
        self.ensure_supported()?;
        let result = match &self.settings {
            CodecSettings::Gzip(_) => backends::gzip_decompress(input),
            CodecSettings::Bzip2(_) => backends::bzip2_decompress(input),
            CodecSettings::Zstd(_) => backends::zstd_decompress(input),
            CodecSettings::Xz(_) => backends::xz_decompress(input),
            CodecSettings::Brotli(_) => backends::brotli_decompress(input),
        };
        result.map_err(|source| ViewerError::Decode {
            codec: self.name(),
            source,
        })
    }

    pub fn compress_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.compress(&mut &data[..])
    }

    pub fn decompress_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decompress(&mut &data[..])
    }

    fn ensure_supported(&self) -> Result<()> {
        if self.supported {
            Ok(())
        } else {
            Err(ViewerError::CodecUnavailable(self.name().to_string()))
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
