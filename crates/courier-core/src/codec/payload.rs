//! Payload - プロセス境界を越えるタグ付きバイト列

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

/// metadata 内でエンコーディングタグを保持するキー
pub const METADATA_ENCODING: &str = "encoding";

/// どのエンコーダが payload を作ったかを示すタグ
///
/// デコード時の振り分けにだけ使い、エンコード時の選択には使いません
/// （エンコードは値の形で選ぶ）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingTag(&'static str);

impl EncodingTag {
    pub const BINARY_NULL: EncodingTag = EncodingTag("binary/null");
    pub const BINARY_PLAIN: EncodingTag = EncodingTag("binary/plain");
    /// 構造化モデル専用のタグ。汎用 JSON と区別するために分けている。
    pub const JSON_MODEL: EncodingTag = EncodingTag("json/model");
    pub const JSON_PLAIN: EncodingTag = EncodingTag("json/plain");

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EncodingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Payload は metadata と data からなる不変の値
///
/// `Bytes` なので clone は参照カウントの増加だけで済み、変更用のメソッドは持ちません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    metadata: BTreeMap<String, Bytes>,
    data: Bytes,
}

impl Payload {
    pub fn new(encoding: EncodingTag, data: impl Into<Bytes>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            METADATA_ENCODING.to_string(),
            Bytes::from_static(encoding.as_str().as_bytes()),
        );
        Self {
            metadata,
            data: data.into(),
        }
    }

    /// 受信した payload（タグ不明・欠落のものを含む）をそのまま組み立てる
    pub fn from_parts(metadata: BTreeMap<String, Bytes>, data: impl Into<Bytes>) -> Self {
        Self {
            metadata,
            data: data.into(),
        }
    }

    /// エンコーディングタグ（UTF-8 でなければ None）
    pub fn encoding(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_ENCODING)
            .and_then(|raw| std::str::from_utf8(raw).ok())
    }

    pub fn metadata(&self) -> &BTreeMap<String, Bytes> {
        &self.metadata
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_encoding_metadata() {
        let payload = Payload::new(EncodingTag::JSON_PLAIN, "\"hi\"");
        assert_eq!(payload.encoding(), Some("json/plain"));
        assert_eq!(payload.data().as_ref(), b"\"hi\"");
    }

    #[test]
    fn non_utf8_encoding_reads_as_missing() {
        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_ENCODING.to_string(), Bytes::from_static(&[0xff, 0xfe]));
        let payload = Payload::from_parts(metadata, Bytes::new());
        assert_eq!(payload.encoding(), None);
    }
}
