//! 流式 Base64 编解码
//!
//! 每一段差异对应一次 打开 -> consume -> finalize 的生命周期, 内存占用固定。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::{self, Write};

use crate::error::ParseError;

/// 每行编码字符数
pub(crate) const LINE_WIDTH: usize = 64;

/// 将字节逐个编码为 Base64 字符并直接写入输出
#[derive(Debug, Default)]
pub(crate) struct EncoderFeed {
    pending: [u8; 3],
    len: usize,
    line_len: usize,
    open: bool,
}

impl EncoderFeed {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn consume<W: Write>(&mut self, byte: u8, out: &mut W) -> io::Result<()> {
        self.open = true;
        self.pending[self.len] = byte;
        self.len += 1;
        if self.len == self.pending.len() {
            self.emit(out)?;
        }
        Ok(())
    }

    /// 写出剩余字节 (带填充) 并关闭
    pub(crate) fn finalize<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.len > 0 {
            self.emit(out)?;
        }
        self.line_len = 0;
        self.open = false;
        Ok(())
    }

    fn emit<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let mut encoded = [0u8; 4];
        let n = STANDARD
            .encode_slice(&self.pending[..self.len], &mut encoded)
            .map_err(io::Error::other)?;
        self.len = 0;

        for &ch in &encoded[..n] {
            if self.line_len == LINE_WIDTH {
                out.write_all(b"\n")?;
                self.line_len = 0;
            }
            out.write_all(&[ch])?;
            self.line_len += 1;
        }
        Ok(())
    }
}

/// 将 Base64 字符逐个解码, 每凑满 4 个字符输出解码后的字节
#[derive(Debug, Default)]
pub(crate) struct DecoderFeed {
    pending: [u8; 4],
    len: usize,
    decoded: [u8; 3],
    open: bool,
}

impl DecoderFeed {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    /// 返回本次解码出的字节, 未凑满一组时为空
    pub(crate) fn consume(&mut self, ch: u8) -> Result<&[u8], ParseError> {
        if ch == b'\r' {
            return Ok(&[]);
        }
        self.open = true;
        self.pending[self.len] = ch;
        self.len += 1;
        if self.len < self.pending.len() {
            return Ok(&[]);
        }

        self.len = 0;
        let n = STANDARD
            .decode_slice(self.pending, &mut self.decoded)
            .map_err(|e| ParseError::InvalidPayload(e.to_string()))?;
        Ok(&self.decoded[..n])
    }

    pub(crate) fn finalize(&mut self) -> Result<(), ParseError> {
        let leftover = self.len;
        self.len = 0;
        self.open = false;
        if leftover != 0 {
            return Err(ParseError::InvalidPayload(format!(
                "{leftover} trailing character(s) at end of run"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_run(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut feed = EncoderFeed::new();
        for &b in bytes {
            feed.consume(b, &mut out).unwrap();
        }
        feed.finalize(&mut out).unwrap();
        assert!(!feed.is_open());
        out
    }

    fn decode_run(chars: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut feed = DecoderFeed::new();
        for &ch in chars.iter().filter(|&&ch| ch != b'\n') {
            out.extend_from_slice(feed.consume(ch).unwrap());
        }
        feed.finalize().unwrap();
        out
    }

    #[test]
    fn encoder_pads_partial_quantum() {
        assert_eq!(encode_run(b"2"), b"Mg==");
        assert_eq!(encode_run(b"ab"), b"YWI=");
        assert_eq!(encode_run(b"abc"), b"YWJj");
    }

    #[test]
    fn encoder_wraps_long_runs() {
        let data = vec![0xffu8; 100];
        let encoded = encode_run(&data);
        let lines: Vec<&[u8]> = encoded.split(|&b| b == b'\n').collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), LINE_WIDTH);
        assert_eq!(lines[1].len(), LINE_WIDTH);
        assert_eq!(decode_run(&encoded), data);
    }

    #[test]
    fn feeds_are_reusable_across_runs() {
        let mut out = Vec::new();
        let mut feed = EncoderFeed::new();
        feed.consume(b'x', &mut out).unwrap();
        feed.finalize(&mut out).unwrap();
        out.push(b'|');
        feed.consume(b'y', &mut out).unwrap();
        feed.finalize(&mut out).unwrap();

        assert_eq!(out, b"eA==|eQ==");
    }

    #[test]
    fn decoder_rejects_truncated_run() {
        let mut feed = DecoderFeed::new();
        assert!(feed.consume(b'M').unwrap().is_empty());
        assert!(feed.is_open());
        assert!(feed.finalize().is_err());
        assert!(!feed.is_open());
    }

    #[test]
    fn decoder_rejects_invalid_characters() {
        let mut feed = DecoderFeed::new();
        for &ch in b"**!" {
            feed.consume(ch).unwrap();
        }
        assert!(feed.consume(b'*').is_err());
    }
}
