use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use compressed_view::utils::create_backup;
use compressed_view::{
    decode_for_display, encode_for_storage, CodecKind, MemoryEditor, Preferences,
    Session, TextEncoding, DEFAULT_CONFIG_NAME,
};

#[derive(Parser)]
#[command(name = "compressed_view")]
#[command(about = "以纯文本查看、打包压缩文本文件（gzip/bzip2/zstd/xz/brotli）")]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 解压并输出文本
    View {
        file: PathBuf,

        /// 后缀不匹配或解压失败时尝试所有已启用的算法
        #[arg(long)]
        try_all: bool,
    },
    /// 把纯文本文件压缩保存
    Pack {
        input: PathBuf,
        output: PathBuf,

        /// 压缩算法（默认按输出文件后缀选择）
        #[arg(long)]
        codec: Option<String>,

        /// 压缩前转换的文本编码
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        /// 覆盖前备份已有的输出文件
        #[arg(long)]
        backup: bool,
    },
    /// 批量探测文件的压缩算法与编码（JSON 输出）
    Probe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 写入默认配置文件
    InitConfig {
        path: Option<PathBuf>,

        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

/// 单个文件的探测结果
#[derive(Debug, Serialize)]
struct ProbeReport {
    path: PathBuf,
    size: usize,
    codec: Option<CodecKind>,
    encoding: Option<TextEncoding>,
    decoded_size: Option<usize>,
    error: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &cli.command {
        Command::InitConfig { path, force } => {
            let path = path.clone().unwrap_or_else(|| config_path(&cli));
            handle_init_config(&path, *force)
        }
        Command::View { file, try_all } => {
            let mut prefs = load_preferences(&cli);
            prefs.decompress_all |= *try_all;
            handle_view(prefs, file)
        }
        Command::Pack { input, output, codec, encoding, backup } => {
            let prefs = load_preferences(&cli);
            handle_pack(&prefs, input, output, codec.as_deref(), encoding, *backup)
        }
        Command::Probe { files } => handle_probe(&load_preferences(&cli), files),
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// 加载配置并初始化算法
fn load_preferences(cli: &Cli) -> Preferences {
    let path = config_path(cli);
    let mut prefs = if path.exists() {
        Preferences::load_or_default(&path)
    } else {
        log::debug!("配置文件 {} 不存在，使用默认配置", path.display());
        Preferences::default()
    };

    for kind in prefs.initialize() {
        log::warn!("{} 不可用，已跳过", kind);
    }
    prefs
}

/// 处理 view：按编辑器打开文件的流程解压并输出
fn handle_view(prefs: Preferences, file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("读取文件失败: {}", file.display()))?;

    let mut editor = MemoryEditor::new();
    editor.write_file(file, bytes);
    let mut session = Session::with_editor(editor, prefs);
    let id = session.open(file)?;

    let status = session.activate(id);
    if session.controller().registry().is_included(id) {
        eprintln!("[{}]", status);
    } else {
        log::info!("{}: 没有找到压缩", file.display());
    }

    use std::io::Write;
    std::io::stdout().write_all(session.editor().content(id))?;
    Ok(())
}

/// 处理 pack：纯文本 → 目标编码 → 压缩
fn handle_pack(
    prefs: &Preferences,
    input: &Path,
    output: &Path,
    codec: Option<&str>,
    encoding: &str,
    backup: bool,
) -> anyhow::Result<()> {
    let codec = match codec {
        Some(name) => prefs.codec_by_name(name)?,
        None => prefs
            .codec_by_suffix(output)
            .ok_or_else(|| anyhow!("无法根据后缀确定压缩算法: {}，请使用 --codec", output.display()))?,
    };
    let encoding: TextEncoding = encoding.parse().map_err(|e: String| anyhow!(e))?;

    let text = std::fs::read(input)
        .with_context(|| format!("读取文件失败: {}", input.display()))?;
    let packed = encode_for_storage(&text, encoding, codec)?;

    if backup && output.exists() {
        let backup_path = create_backup(output)?;
        println!("已备份: {}", backup_path.display());
    }
    std::fs::write(output, &packed)
        .with_context(|| format!("写入文件失败: {}", output.display()))?;

    println!(
        "{} → {} ({}/{}, {} → {} 字节)",
        input.display(),
        output.display(),
        codec,
        encoding,
        text.len(),
        packed.len()
    );
    Ok(())
}

/// 处理 probe：并行探测多个文件
fn handle_probe(prefs: &Preferences, files: &[PathBuf]) -> anyhow::Result<()> {
    let reports: Vec<ProbeReport> = files
        .par_iter()
        .map(|path| probe_file(prefs, path))
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn probe_file(prefs: &Preferences, path: &Path) -> ProbeReport {
    let mut report = ProbeReport {
        path: path.to_path_buf(),
        size: 0,
        codec: None,
        encoding: None,
        decoded_size: None,
        error: None,
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.size = bytes.len();
    if bytes.is_empty() {
        return report;
    }

    for codec in prefs.probe_order(path, true) {
        match decode_for_display(&bytes, codec) {
            Ok(decoded) => {
                report.codec = Some(codec.kind());
                report.encoding = Some(decoded.encoding);
                report.decoded_size = Some(decoded.text.len());
                return report;
            }
            Err(e) if e.is_decode_failure() => continue,
            Err(e) => {
                report.codec = Some(codec.kind());
                report.error = Some(e.to_string());
                return report;
            }
        }
    }
    report
}

/// 处理 init-config
fn handle_init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
    }
    Preferences::default().save(path)?;
    println!("已写入默认配置: {}", path.display());
    Ok(())
}
