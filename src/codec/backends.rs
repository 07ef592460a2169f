/// 各压缩算法的流式实现
///
/// 每个函数完整读取输入并产出完整输出，不暴露中间状态。
use std::io::{self, Read};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use brotli::{BrotliResult, BrotliState, HeapAlloc, HuffmanCode};
use super::{BrotliSettings, Bzip2Settings, GzipSettings, XzCheck, XzSettings, ZstdSettings};

// liblzma 的 LZMA_PRESET_EXTREME
const XZ_PRESET_EXTREME: u32 = 0x8000_0000;
const BROTLI_BUFFER_SIZE: usize = 4096;

pub(super) fn gzip_compress(input: &mut dyn Read, settings: &GzipSettings) -> io::Result<Vec<u8>> {
    let level = flate2::Compression::new(settings.level.min(9));
    let mut encoder = GzEncoder::new(Vec::new(), level);
    io::copy(input, &mut encoder)?;
    encoder.finish()
}

pub(super) fn gzip_decompress(input: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(input);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

pub(super) fn bzip2_compress(input: &mut dyn Read, settings: &Bzip2Settings) -> io::Result<Vec<u8>> {
    let level = bzip2::Compression::new(settings.level.clamp(1, 9));
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), level);
    io::copy(input, &mut encoder)?;
    encoder.finish()
}

pub(super) fn bzip2_decompress(input: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut decoder = bzip2::read::MultiBzDecoder::new(input);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

pub(super) fn zstd_compress(input: &mut dyn Read, settings: &ZstdSettings) -> io::Result<Vec<u8>> {
    let mut compressed = Vec::new();
    zstd::stream::copy_encode(input, &mut compressed, settings.level)?;
    Ok(compressed)
}

pub(super) fn zstd_decompress(input: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    zstd::stream::copy_decode(input, &mut decompressed)?;
    Ok(decompressed)
}

/// 检查 zstd 上下文能否创建
pub(super) fn zstd_available(settings: &ZstdSettings) -> bool {
    zstd::bulk::Compressor::new(settings.level).is_ok()
}

fn xz_check(check: XzCheck) -> xz2::stream::Check {
    match check {
        XzCheck::None => xz2::stream::Check::None,
        XzCheck::Crc32 => xz2::stream::Check::Crc32,
        XzCheck::Crc64 => xz2::stream::Check::Crc64,
        XzCheck::Sha256 => xz2::stream::Check::Sha256,
    }
}

fn xz_encoder_stream(settings: &XzSettings) -> io::Result<xz2::stream::Stream> {
    let mut preset = settings.preset.min(9);
    if settings.extreme {
        preset |= XZ_PRESET_EXTREME;
    }
    xz2::stream::Stream::new_easy_encoder(preset, xz_check(settings.check))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

pub(super) fn xz_compress(input: &mut dyn Read, settings: &XzSettings) -> io::Result<Vec<u8>> {
    let stream = xz_encoder_stream(settings)?;
    let mut encoder = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
    io::copy(input, &mut encoder)?;
    encoder.finish()
}

pub(super) fn xz_decompress(input: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut decoder = xz2::read::XzDecoder::new_multi_decoder(input);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// 检查 liblzma 能否按当前设置创建编码器
pub(super) fn xz_available(settings: &XzSettings) -> bool {
    xz_encoder_stream(settings).is_ok()
}

pub(super) fn brotli_compress(input: &mut dyn Read, settings: &BrotliSettings) -> io::Result<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(
        Vec::new(),
        BROTLI_BUFFER_SIZE,
        settings.quality.min(11),
        settings.window.clamp(10, 24),
    );
    io::copy(input, &mut writer)?;
    // into_inner 会写出流结束标记
    Ok(writer.into_inner())
}

/// brotli 解压
///
/// `brotli::Decompressor` 在第一个流结束后会忽略剩余字节，很多普通文本的前缀
/// 也能被解析成一个空流；这里直接驱动解码状态机，要求整个输入恰好是一个完整的流。
pub(super) fn brotli_decompress(input: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut compressed = Vec::new();
    input.read_to_end(&mut compressed)?;

    let mut state = BrotliState::new(
        HeapAlloc::<u8>::new(0),
        HeapAlloc::<u32>::new(0),
        HeapAlloc::<HuffmanCode>::new(HuffmanCode { value: 0, bits: 0 }),
    );
    let mut available_in = compressed.len();
    let mut input_offset = 0;
    let mut total_out = 0;
    let mut buffer = [0u8; BROTLI_BUFFER_SIZE];
    let mut decompressed = Vec::new();

    loop {
        let mut available_out = buffer.len();
        let mut output_offset = 0;
        let result = brotli::BrotliDecompressStream(
            &mut available_in,
            &mut input_offset,
            &compressed,
            &mut available_out,
            &mut output_offset,
            &mut buffer,
            &mut total_out,
            &mut state,
        );
        decompressed.extend_from_slice(&buffer[..output_offset]);

        match result {
            BrotliResult::NeedsMoreOutput => continue,
            BrotliResult::ResultSuccess if available_in == 0 => return Ok(decompressed),
            BrotliResult::ResultSuccess => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("brotli 流结束后还有 {} 字节多余数据", available_in),
                ))
            }
            BrotliResult::NeedsMoreInput => {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "brotli 流被截断"))
            }
            BrotliResult::ResultFailure => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "无效的 brotli 数据"))
            }
        }
    }
}
