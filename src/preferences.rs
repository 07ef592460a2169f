/// 用户配置
///
/// 以 JSON 形式持久化。保存的内容：是否"尝试所有已启用的压缩算法"、是否更新状态栏，
/// 以及按排序保存的每个算法的启用标志、轮换标志、后缀列表和调优参数。
///
/// # 使用示例
///
/// ```rust,ignore
/// use compressed_view::Preferences;
///
/// let mut prefs = Preferences::load_or_default(Path::new("compressed_view.json"));
/// prefs.initialize();
/// let codec = prefs.codec_by_suffix(Path::new("log.gz"));
/// ```
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::codec::{Codec, CodecKind};
use crate::utils::{Result, ViewerError};

/// 当前配置格式版本
pub const PREFERENCES_VERSION: u32 = 3;

/// 配置中的一个压缩算法条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecEntry {
    /// 是否参与后缀匹配与自动探测
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// 是否参与"切换压缩"的轮换
    #[serde(default = "enabled_by_default")]
    pub in_rotation: bool,
    pub codec: Codec,
}

fn enabled_by_default() -> bool {
    true
}

fn update_status_bar_default() -> bool {
    true
}

impl CodecEntry {
    pub fn new(codec: Codec) -> Self {
        Self {
            enabled: true,
            in_rotation: true,
            codec,
        }
    }

    /// 已启用且底层库可用
    pub fn is_active(&self) -> bool {
        self.enabled && self.codec.is_supported()
    }
}

/// 用户配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub version: u32,
    /// 按后缀解压失败（或没有后缀匹配）时，依次尝试所有已启用的算法
    #[serde(default)]
    pub decompress_all: bool,
    /// 激活缓冲区时在状态栏显示 "算法/编码"
    #[serde(default = "update_status_bar_default")]
    pub update_status_bar: bool,
    /// 算法列表，顺序即优先级
    #[serde(default)]
    pub codecs: Vec<CodecEntry>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            decompress_all: false,
            update_status_bar: true,
            codecs: CodecKind::ALL
                .into_iter()
                .map(|kind| CodecEntry::new(Codec::with_defaults(kind)))
                .collect(),
        }
    }
}

impl Preferences {
    /// 从 JSON 字符串解析并迁移到当前版本
    pub fn from_json(json: &str) -> Result<Self> {
        let mut prefs: Preferences = serde_json::from_str(json)?;
        prefs.migrate();
        Ok(prefs)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// 从文件加载，失败时记录日志并使用默认配置
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!("无法读取配置 {}: {}，使用默认配置", path.display(), e);
                Self::default()
            }
        }
    }

    /// 保存到文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// 补齐旧版本配置中缺少的算法，并更新版本号
    fn migrate(&mut self) {
        for kind in CodecKind::ALL {
            if self.entry(kind).is_none() {
                log::info!("配置中缺少 {}，已添加默认设置", kind);
                self.codecs.push(CodecEntry::new(Codec::with_defaults(kind)));
            }
        }
        // 重复条目只保留第一个
        let mut seen = Vec::new();
        self.codecs.retain(|entry| {
            let kind = entry.codec.kind();
            if seen.contains(&kind) {
                false
            } else {
                seen.push(kind);
                true
            }
        });
        self.version = PREFERENCES_VERSION;
    }

    /// 初始化所有算法，更新其可用状态
    ///
    /// # 返回
    /// 返回不可用的算法列表
    pub fn initialize(&mut self) -> Vec<CodecKind> {
        self.codecs
            .iter_mut()
            .filter_map(|entry| (!entry.codec.initialize()).then(|| entry.codec.kind()))
            .collect()
    }

    pub fn entry(&self, kind: CodecKind) -> Option<&CodecEntry> {
        self.codecs.iter().find(|entry| entry.codec.kind() == kind)
    }

    pub fn entry_mut(&mut self, kind: CodecKind) -> Option<&mut CodecEntry> {
        self.codecs.iter_mut().find(|entry| entry.codec.kind() == kind)
    }

    /// 获取算法配置（不论是否启用）
    pub fn codec(&self, kind: CodecKind) -> Option<&Codec> {
        self.entry(kind).map(|entry| &entry.codec)
    }

    /// 按名称获取可用的算法
    pub fn codec_by_name(&self, name: &str) -> Result<&Codec> {
        let kind = CodecKind::from_name(name)
            .ok_or_else(|| ViewerError::UnknownCodec(name.to_string()))?;
        let codec = self
            .codec(kind)
            .ok_or_else(|| ViewerError::UnknownCodec(name.to_string()))?;
        if !codec.is_supported() {
            return Err(ViewerError::CodecUnavailable(name.to_string()));
        }
        Ok(codec)
    }

    /// 已启用且可用的算法，按配置顺序（自动探测顺序）
    pub fn enabled_codecs(&self) -> impl Iterator<Item = &Codec> + '_ {
        self.codecs
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| &entry.codec)
    }

    /// 按后缀匹配算法
    ///
    /// 按配置顺序返回第一个后缀匹配的已启用算法（不是最长匹配）。
    pub fn codec_by_suffix(&self, path: &Path) -> Option<&Codec> {
        self.enabled_codecs().find(|codec| codec.matches(path))
    }

    pub fn kind_by_suffix(&self, path: &Path) -> Option<CodecKind> {
        self.codec_by_suffix(path).map(Codec::kind)
    }

    /// 打开文件时依次尝试解压的算法
    ///
    /// 后缀匹配的算法排在最前；`try_all` 时按配置顺序追加其余已启用的算法。
    pub fn probe_order(&self, path: &Path, try_all: bool) -> Vec<&Codec> {
        let by_suffix = self.codec_by_suffix(path);
        let mut order: Vec<&Codec> = by_suffix.into_iter().collect();
        if try_all {
            let suffix_kind = by_suffix.map(Codec::kind);
            order.extend(
                self.enabled_codecs()
                    .filter(|codec| Some(codec.kind()) != suffix_kind),
            );
        }
        order
    }

    fn rotation(&self) -> impl Iterator<Item = CodecKind> + '_ {
        self.codecs
            .iter()
            .filter(|entry| entry.in_rotation && entry.codec.is_supported())
            .map(|entry| entry.codec.kind())
    }

    /// 计算"切换压缩"的下一个算法
    ///
    /// # 参数
    /// * `current` - 缓冲区当前使用的算法
    /// * `by_suffix` - 按文件后缀匹配到的算法
    ///
    /// # 返回
    /// - 当前未压缩：优先使用后缀匹配的算法，否则使用轮换列表第一个
    /// - 当前算法不是后缀算法：轮换列表中当前算法之后第一个非后缀算法
    /// - 当前算法就是后缀算法：轮换列表中第一个非后缀算法
    /// - 没有下一个时返回 None（关闭压缩）
    pub fn next_codec(
        &self,
        current: Option<CodecKind>,
        by_suffix: Option<CodecKind>,
    ) -> Option<CodecKind> {
        match current {
            None => by_suffix
                .filter(|kind| self.rotation().any(|k| k == *kind))
                .or_else(|| self.rotation().next()),
            Some(current) if Some(current) != by_suffix => self
                .rotation()
                .skip_while(|kind| *kind != current)
                .skip(1)
                .find(|kind| Some(*kind) != by_suffix),
            Some(_) => self.rotation().find(|kind| Some(*kind) != by_suffix),
        }
    }
}
