//! Minimal server-sent-events line decoder.
//!
//! Only `data:` fields matter to the completion backends; event names, ids
//! and comments are ignored.

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the `data:` payloads of every completed line.
    ///
    /// Lines may be split across chunks (including inside a UTF-8 sequence).
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(data) = data_field(&line) {
                out.push(data);
            }
        }
        out
    }

    /// Flush a trailing line that was not newline-terminated.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buf);
        data_field(&line)
    }
}

fn data_field(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() {
        None
    } else {
        Some(data.to_string())
    }
}
