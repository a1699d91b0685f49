//! Container identification and the supported-format table.

use serde::{Deserialize, Serialize};

/// Image container families the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Jpeg,
    Png,
    WebP,
    Heic,
    Avif,
    Unsupported,
}

/// One row of the supported-format table.
#[derive(Debug, Clone, Copy)]
pub struct SupportedFormat {
    pub extension: &'static str,
    pub mime_types: &'static [&'static str],
    pub kind: ContainerKind,
    pub can_process: bool,
}

pub const SUPPORTED_FORMATS: &[SupportedFormat] = &[
    SupportedFormat { extension: "jpg", mime_types: &["image/jpeg"], kind: ContainerKind::Jpeg, can_process: true },
    SupportedFormat { extension: "jpeg", mime_types: &["image/jpeg"], kind: ContainerKind::Jpeg, can_process: true },
    SupportedFormat { extension: "png", mime_types: &["image/png"], kind: ContainerKind::Png, can_process: true },
    SupportedFormat { extension: "webp", mime_types: &["image/webp"], kind: ContainerKind::WebP, can_process: true },
    SupportedFormat { extension: "heic", mime_types: &["image/heic", "image/heif"], kind: ContainerKind::Heic, can_process: false },
    SupportedFormat { extension: "avif", mime_types: &["image/avif"], kind: ContainerKind::Avif, can_process: false },
];

impl ContainerKind {
    /// Map a declared MIME type to a container. Parameters such as
    /// `; charset=` are ignored, as is case.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        SUPPORTED_FORMATS
            .iter()
            .find(|f| f.mime_types.contains(&essence.as_str()))
            .map(|f| f.kind)
            .unwrap_or(ContainerKind::Unsupported)
    }

    /// Identify the container from magic bytes alone.
    pub fn sniff(data: &[u8]) -> Self {
        infer::get(data)
            .map(|t| Self::from_mime(t.mime_type()))
            .unwrap_or(ContainerKind::Unsupported)
    }

    /// Canonical MIME type, `None` for unsupported input.
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            ContainerKind::Jpeg => Some("image/jpeg"),
            ContainerKind::Png => Some("image/png"),
            ContainerKind::WebP => Some("image/webp"),
            ContainerKind::Heic => Some("image/heic"),
            ContainerKind::Avif => Some("image/avif"),
            ContainerKind::Unsupported => None,
        }
    }

    /// Preferred extension for output files.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ContainerKind::Jpeg => Some("jpg"),
            ContainerKind::Png => Some("png"),
            ContainerKind::WebP => Some("webp"),
            ContainerKind::Heic => Some("heic"),
            ContainerKind::Avif => Some("avif"),
            ContainerKind::Unsupported => None,
        }
    }

    /// Whether the re-encoder can produce a cleaned copy of this container.
    pub fn can_process(self) -> bool {
        matches!(self, ContainerKind::Jpeg | ContainerKind::Png | ContainerKind::WebP)
    }

    /// Whether metadata detection runs for this container.
    pub fn is_scannable(self) -> bool {
        self.can_process()
    }
}

/// Resolve the MIME type to scan a buffer as: the declared one when present,
/// otherwise whatever the magic bytes say.
pub fn resolve_mime(declared: Option<&str>, data: &[u8]) -> String {
    match declared.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) => mime.to_string(),
        None => ContainerKind::sniff(data)
            .mime_type()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

/// True when extension and MIME agree on a processable format.
pub fn is_format_supported(file_name: &str, mime: &str) -> bool {
    let Some(extension) = file_extension(file_name) else {
        return false;
    };
    SUPPORTED_FORMATS.iter().any(|f| {
        f.extension == extension && f.mime_types.contains(&mime) && f.can_process
    })
}

/// Lowercased extension after the last dot, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
