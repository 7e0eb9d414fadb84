//! Content type sniffing over payload streams
//!
//! [`sniffer`] splits a payload stream into a [`Detector`], which peeks the
//! first [`CONTENT_TYPE_DETECT_SIZE`] bytes and hands back an equivalent
//! stream, and a [`DetectionSignal`] that completes once the type is known.

use bytes::Bytes;
use futures::StreamExt;
use neogate_network::PayloadStream;
use thiserror::Error;
use tokio::sync::oneshot;

/// Number of leading bytes inspected
pub const CONTENT_TYPE_DETECT_SIZE: usize = 512;

/// Fallback for binary data
pub const OCTET_STREAM: &str = "application/octet-stream";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Reading the payload failed before the type could be determined
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("content type detection failed: {0}")]
pub struct DetectionError(pub String);

type Outcome = Result<&'static str, DetectionError>;

/// Peeks a payload stream and publishes the detected type
pub struct Detector {
    stream: PayloadStream<'static>,
    signal: oneshot::Sender<Outcome>,
}

/// Completes when the paired [`Detector`] has classified the payload
pub struct DetectionSignal(oneshot::Receiver<Outcome>);

/// Pair a detector with its completion signal
pub fn sniffer(stream: PayloadStream<'static>) -> (Detector, DetectionSignal) {
    let (tx, rx) = oneshot::channel();
    (Detector { stream, signal: tx }, DetectionSignal(rx))
}

impl Detector {
    /// Read up to [`CONTENT_TYPE_DETECT_SIZE`] bytes, publish the result and
    /// return a stream yielding exactly the bytes of the original one.
    ///
    /// A read error is published to the signal and replayed as the last item
    /// of the returned stream.
    pub async fn detect(self) -> PayloadStream<'static> {
        let Detector { mut stream, signal } = self;

        let mut chunks: Vec<Bytes> = Vec::new();
        let mut size = 0;
        let mut failure = None;
        while size < CONTENT_TYPE_DETECT_SIZE {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    size += chunk.len();
                    chunks.push(chunk);
                }
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                None => break,
            }
        }

        let outcome = match &failure {
            Some(e) => Err(DetectionError(e.to_string())),
            None => Ok(detect_content_type(&prefix_of(&chunks))),
        };
        // nobody waiting is fine
        let _ = signal.send(outcome);

        let mut head: Vec<std::io::Result<Bytes>> = chunks.into_iter().map(Ok).collect();
        match failure {
            Some(e) => {
                head.push(Err(e));
                futures::stream::iter(head).boxed()
            }
            None => futures::stream::iter(head).chain(stream).boxed(),
        }
    }
}

impl DetectionSignal {
    /// Wait for classification, or for the failure that prevented it
    pub async fn wait(self) -> Outcome {
        self.0
            .await
            .unwrap_or_else(|_| Err(DetectionError("detector dropped".to_string())))
    }
}

fn prefix_of(chunks: &[Bytes]) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(CONTENT_TYPE_DETECT_SIZE);
    for chunk in chunks {
        let take = (CONTENT_TYPE_DETECT_SIZE - prefix.len()).min(chunk.len());
        prefix.extend_from_slice(&chunk[..take]);
        if prefix.len() == CONTENT_TYPE_DETECT_SIZE {
            break;
        }
    }
    prefix
}

enum Signature {
    /// Bytes at the start of the data
    Exact(&'static [u8], &'static str),
    /// `data & mask == pattern`, optionally after leading whitespace
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
        mime: &'static str,
    },
    /// Case-insensitive HTML tag followed by space or `>`
    Html(&'static [u8]),
    Mp4,
    Text,
}

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_ws: true,
        mime: "text/xml; charset=utf-8",
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
        skip_ws: false,
        mime: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
        skip_ws: false,
        mime: "text/plain; charset=utf-16le",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
        skip_ws: false,
        mime: TEXT_PLAIN,
    },
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_ws: false,
        mime: "image/webp",
    },
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        skip_ws: false,
        mime: "audio/aiff",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF",
        pattern: b"ID3",
        skip_ws: false,
        mime: "audio/mpeg",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"OggS\x00",
        skip_ws: false,
        mime: "application/ogg",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"MThd\x00\x00\x00\x06",
        skip_ws: false,
        mime: "audio/midi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        skip_ws: false,
        mime: "video/avi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_ws: false,
        mime: "audio/wave",
    },
    Signature::Mp4,
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    Signature::Exact(b"wOFF", "font/woff"),
    Signature::Exact(b"wOF2", "font/woff2"),
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00\x61\x73\x6D", "application/wasm"),
    Signature::Text,
];

/// Classify data by its leading bytes. Only the first
/// [`CONTENT_TYPE_DETECT_SIZE`] bytes are considered; anything unrecognized
/// is `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(CONTENT_TYPE_DETECT_SIZE)];
    let first_non_ws = data
        .iter()
        .position(|b| !is_whitespace(*b))
        .unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|sig| sig.check(data, first_non_ws))
        .unwrap_or(OCTET_STREAM)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_tag_terminator(b: u8) -> bool {
    b == b' ' || b == b'>'
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

impl Signature {
    fn check(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Self::Exact(prefix, mime) => data.starts_with(prefix).then_some(*mime),
            Self::Masked {
                mask,
                pattern,
                skip_ws,
                mime,
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                data.iter()
                    .zip(mask.iter())
                    .zip(pattern.iter())
                    .all(|((d, m), p)| d & m == *p)
                    .then_some(*mime)
            }
            Self::Html(tag) => {
                let data = &data[first_non_ws..];
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let matches = data
                    .iter()
                    .zip(tag.iter())
                    .all(|(d, t)| if t.is_ascii_uppercase() { d.to_ascii_uppercase() == *t } else { d == t });
                (matches && is_tag_terminator(data[tag.len()])).then_some(TEXT_HTML)
            }
            Self::Mp4 => is_mp4(data).then_some("video/mp4"),
            Self::Text => (!data[first_non_ws..].iter().any(|b| is_binary_byte(*b))).then_some(TEXT_PLAIN),
        }
    }
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    // brands follow the major brand and minor version, four bytes each
    (8..box_size)
        .step_by(4)
        .filter(|st| *st != 12)
        .any(|st| data.get(st..st + 3) == Some(b"mp4".as_slice()))
}
