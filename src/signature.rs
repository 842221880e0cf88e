//! Magic-number signatures and the classifier that applies them.
//!
//! Rules are plain data: an offset, an exact byte pattern and the label to
//! report. Every rule is tested independently against an entry's content,
//! so one buffer may receive several hints.
//!
//! The ZIP variants and the `koly` check at offset 0 are deliberately
//! simple heuristics rather than format validators.

/// One static-magic test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureRule {
    /// Byte offset from the start of the content
    pub offset: usize,
    /// Exact bytes expected at `offset`
    pub pattern: &'static [u8],
    /// Type hint reported when the pattern matches
    pub label: &'static str,
}

impl SignatureRule {
    pub const fn new(offset: usize, pattern: &'static [u8], label: &'static str) -> Self {
        Self {
            offset,
            pattern,
            label,
        }
    }

    /// True if `content` holds `pattern` at `offset`. Content shorter than
    /// `offset + pattern.len()` never matches.
    pub fn matches(&self, content: &[u8]) -> bool {
        self.offset
            .checked_add(self.pattern.len())
            .and_then(|end| content.get(self.offset..end))
            .is_some_and(|window| window == self.pattern)
    }
}

/// Signature table applied to every entry, in evaluation order.
pub static SIGNATURE_RULES: &[SignatureRule] = &[
    // PDF without a leading BOM or whitespace
    SignatureRule::new(0, b"%PDF", "PDF"),
    SignatureRule::new(0, b"MZ", "Windows Executable"),
    SignatureRule::new(0, &[0x7F, 0x45, 0x4C, 0x46], "ELF Executable"),
    SignatureRule::new(0, &[0x50, 0x4B, 0x03], "ZIP"),
    SignatureRule::new(0, &[0x50, 0x4B, 0x04], "ZIP"),
    SignatureRule::new(0, &[0x50, 0x4B, 0x05], "ZIP"),
    // OLE2 compound file: legacy doc/xls/ppt
    SignatureRule::new(
        0,
        &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
        "MS-Office",
    ),
    SignatureRule::new(0, b"koly", "Apple Disk Image"),
];

/// Classify content against [`SIGNATURE_RULES`].
///
/// Returns the label of every matching rule in table order; content that
/// matches nothing (including empty content) yields an empty vector.
pub fn classify(content: &[u8]) -> Vec<String> {
    classify_with(SIGNATURE_RULES, content)
}

/// Classify content against an arbitrary rule table.
pub fn classify_with(rules: &[SignatureRule], content: &[u8]) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.matches(content))
        .map(|rule| rule.label.to_string())
        .collect()
}
