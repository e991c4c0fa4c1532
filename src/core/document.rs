use crate::config::toml_config::LineEnding;
use crate::utils::error::{PublishError, Result};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// rule pack 檔案的編碼，依 BOM 判斷並在寫回時保留
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16LeBom,
    Utf16BeBom,
}

impl TextEncoding {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&UTF8_BOM) {
            TextEncoding::Utf8Bom
        } else if bytes.starts_with(&UTF16LE_BOM) {
            TextEncoding::Utf16LeBom
        } else if bytes.starts_with(&UTF16BE_BOM) {
            TextEncoding::Utf16BeBom
        } else {
            TextEncoding::Utf8
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePackDocument {
    encoding: TextEncoding,
    text: String,
}

impl RulePackDocument {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let encoding = TextEncoding::detect(bytes);
        let text = match encoding {
            TextEncoding::Utf8 => utf8(bytes)?,
            TextEncoding::Utf8Bom => utf8(&bytes[UTF8_BOM.len()..])?,
            TextEncoding::Utf16LeBom => utf16(&bytes[2..], u16::from_le_bytes)?,
            TextEncoding::Utf16BeBom => utf16(&bytes[2..], u16::from_be_bytes)?,
        };
        Ok(Self { encoding, text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn with_text(&self, text: String) -> Self {
        Self {
            encoding: self.encoding,
            text,
        }
    }

    /// 以原本的編碼輸出，並統一換行字元
    pub fn encode(&self, line_ending: LineEnding) -> Vec<u8> {
        let text = normalize_line_endings(&self.text, line_ending);
        match self.encoding {
            TextEncoding::Utf8 => text.into_bytes(),
            TextEncoding::Utf8Bom => {
                let mut bytes = UTF8_BOM.to_vec();
                bytes.extend_from_slice(text.as_bytes());
                bytes
            }
            TextEncoding::Utf16LeBom => {
                let mut bytes = UTF16LE_BOM.to_vec();
                bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
                bytes
            }
            TextEncoding::Utf16BeBom => {
                let mut bytes = UTF16BE_BOM.to_vec();
                bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
                bytes
            }
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| PublishError::EncodingError {
        message: format!("rule pack is not valid UTF-8: {}", e),
    })
}

fn utf16(bytes: &[u8], decode_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(PublishError::EncodingError {
            message: "UTF-16 rule pack has an odd number of bytes".to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| decode_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| PublishError::EncodingError {
        message: format!("rule pack is not valid UTF-16: {}", e),
    })
}

pub fn normalize_line_endings(text: &str, line_ending: LineEnding) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    match line_ending {
        LineEnding::Lf => unified,
        LineEnding::Crlf => unified.replace('\n', line_ending.as_str()),
    }
}
