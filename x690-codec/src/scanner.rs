//! Indefinite-length content scanner
//!
//! Locates the End-Of-Contents marker that closes an indefinite-length
//! value, skipping over arbitrarily deep nesting without any type
//! knowledge.

use crate::ident::{Length, Tag};
use x690_core::{X690Error, X690Result};

/// End-Of-Contents marker, `0x00 0x00`
pub const EOC: [u8; 2] = [0x00, 0x00];

/// Find the EOC marker closing the outermost indefinite-length level
///
/// `data` must be positioned just after a TLV header whose length was
/// declared indefinite. Returns the byte offset of the two-byte EOC
/// marker that closes that level.
///
/// Nested children are skipped by parsing their headers: a definite
/// child is skipped by its declared length, an indefinite child
/// increments the nesting depth and is closed by its own EOC.
///
/// # Errors
/// `TruncatedContent` if the buffer ends before the outer EOC is found.
pub fn find_eoc(data: &[u8]) -> X690Result<usize> {
    let mut depth = 0usize;
    let mut pos = 0usize;

    while pos < data.len() {
        // EOC closes the current level
        if data[pos] == 0x00 {
            if pos + 1 >= data.len() {
                break;
            }
            if data[pos + 1] == 0x00 {
                if depth == 0 {
                    return Ok(pos);
                }
                depth -= 1;
                pos += 2;
                continue;
            }
        }

        // Any other child: parse its header and skip it
        let (_, tag_len) = Tag::decode(&data[pos..])?;
        let (length, len_len) = Length::decode(&data[pos + tag_len..])?;
        pos += tag_len + len_len;

        match length {
            Length::Indefinite => depth += 1,
            Length::Definite(n) => {
                if pos + n > data.len() {
                    return Err(X690Error::TruncatedContent {
                        declared: n,
                        available: data.len() - pos,
                    });
                }
                pos += n;
            }
        }
    }

    Err(X690Error::TruncatedContent {
        declared: pos + 2,
        available: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a nested indefinite-length constructed value `depth`
    /// levels deep with one primitive leaf inside
    fn nested(depth: usize) -> Vec<u8> {
        let mut inner = vec![0x04, 0x02, 0xAA, 0xBB]; // OCTET STRING
        for _ in 0..depth {
            let mut wrapped = vec![0x30, 0x80]; // SEQUENCE, indefinite
            wrapped.extend_from_slice(&inner);
            wrapped.extend_from_slice(&EOC);
            inner = wrapped;
        }
        inner
    }

    #[test]
    fn test_flat_content() {
        // content: one primitive TLV, then the outer EOC
        let data = [0x04, 0x01, 0xFF, 0x00, 0x00];
        assert_eq!(find_eoc(&data).unwrap(), 3);
    }

    #[test]
    fn test_immediate_eoc() {
        // depth 0: empty content
        let data = [0x00, 0x00];
        assert_eq!(find_eoc(&data).unwrap(), 0);
    }

    #[test]
    fn test_nested_depths() {
        // The outer value's content is a nested container of depth d
        // followed by the outer EOC; the scanner must not stop at any
        // inner EOC.
        for d in 0..=5 {
            let mut content = nested(d);
            let inner_len = content.len();
            content.extend_from_slice(&EOC);
            assert_eq!(find_eoc(&content).unwrap(), inner_len, "depth {}", d);
        }
    }

    #[test]
    fn test_missing_eoc() {
        let data = [0x04, 0x01, 0xFF];
        assert!(matches!(
            find_eoc(&data),
            Err(X690Error::TruncatedContent { .. })
        ));
    }

    #[test]
    fn test_truncated_child() {
        // Child declares 4 content bytes but only 1 is present
        let data = [0x04, 0x04, 0xFF];
        assert!(matches!(
            find_eoc(&data),
            Err(X690Error::TruncatedContent {
                declared: 4,
                available: 1
            })
        ));
    }
}
