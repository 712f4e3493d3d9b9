//! Mask templates -- `@N` capture-group substitution.
//!
//! A mask template is plain text with two kinds of placeholders:
//!
//! | sequence | output |
//! |----------|--------|
//! | `@@`     | a literal `@` |
//! | `@N`, `@NN` | capture group `N` (1-99) |
//!
//! A group number outside `1..=group_count`, or an `@` followed by
//! anything else, stops rendering: the text produced so far is kept and a
//! [`TemplateWarning`] is reported. Templates of rules without capture
//! groups are used verbatim.
//!
//! Every rendered message ends with `, at: <timestamp>`.

use std::fmt;
use std::time::SystemTime;

use alertik_core::event::format_timestamp;

/// Upper bound of an outbound message body (bytes)
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Non-fatal problem found while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateWarning {
    /// `@N` with `N` outside `1..=available`
    GroupOutOfRange { group: usize, available: usize },
    /// `@` followed by a character that is neither a digit nor `@`
    InvalidPlaceholder { offset: usize },
    /// the message exceeded [`MAX_MESSAGE_LEN`] and was cut
    Truncated { len: usize },
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupOutOfRange { group, available } => write!(
                f,
                "capture group @{group} requested but only {available} available, message cut"
            ),
            Self::InvalidPlaceholder { offset } => {
                write!(f, "invalid '@' sequence at offset {offset}, message cut")
            }
            Self::Truncated { len } => write!(
                f,
                "message of {len} bytes exceeds {MAX_MESSAGE_LEN} bytes, truncated"
            ),
        }
    }
}

/// A rendered outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub warnings: Vec<TemplateWarning>,
}

impl RenderedMessage {
    /// Whether the template was rendered in full.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Growable message buffer capped at [`MAX_MESSAGE_LEN`] bytes.
///
/// Appends past the cap are cut on a character boundary and remembered,
/// so the caller can report a single truncation.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    buf: String,
    /// total bytes requested, including anything cut
    requested: usize,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: &str) {
        self.requested += s.len();
        let room = MAX_MESSAGE_LEN - self.buf.len();
        if s.len() <= room {
            self.buf.push_str(s);
            return;
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.push_str(&s[..end]);
    }

    pub fn push(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.push_str(c.encode_utf8(&mut tmp));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether any append was cut.
    pub fn is_truncated(&self) -> bool {
        self.requested > self.buf.len()
    }

    /// Bytes requested so far, including the ones cut.
    pub fn requested_len(&self) -> usize {
        self.requested
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Renders `template` against the capture groups of a match.
///
/// `groups[0]` is capture group 1; unmatched optional groups are passed as
/// empty strings. With no groups the template is copied verbatim.
pub fn render(template: &str, groups: &[&str], timestamp: SystemTime) -> RenderedMessage {
    let mut out = MessageBuffer::new();
    let mut warnings = Vec::new();

    if groups.is_empty() {
        out.push_str(template);
    } else if let Err(warning) = substitute(template, groups, &mut out) {
        warnings.push(warning);
    }

    append_timestamp(&mut out, timestamp);

    if out.is_truncated() {
        warnings.push(TemplateWarning::Truncated {
            len: out.requested_len(),
        });
    }

    RenderedMessage {
        text: out.into_string(),
        warnings,
    }
}

/// Appends the `, at: <timestamp>` suffix.
pub fn append_timestamp(out: &mut MessageBuffer, timestamp: SystemTime) {
    out.push_str(", at: ");
    out.push_str(&format_timestamp(timestamp));
}

fn substitute(
    template: &str,
    groups: &[&str],
    out: &mut MessageBuffer,
) -> Result<(), TemplateWarning> {
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'@' {
            i += 1;
            continue;
        }

        out.push_str(&template[literal_start..i]);
        let at = i;
        i += 1;

        match bytes.get(i) {
            Some(b'@') => {
                out.push('@');
                i += 1;
            }
            Some(d) if d.is_ascii_digit() => {
                let mut group = usize::from(d - b'0');
                i += 1;
                if let Some(d2) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
                    group = group * 10 + usize::from(d2 - b'0');
                    i += 1;
                }
                if group == 0 || group > groups.len() {
                    return Err(TemplateWarning::GroupOutOfRange {
                        group,
                        available: groups.len(),
                    });
                }
                out.push_str(groups[group - 1]);
            }
            _ => return Err(TemplateWarning::InvalidPlaceholder { offset: at }),
        }

        literal_start = i;
    }

    out.push_str(&template[literal_start..]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ts() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn suffix() -> String {
        format!(", at: {}", format_timestamp(ts()))
    }

    #[test]
    fn substitutes_capture_groups() {
        let msg = render("User @1 joined @2", &["bob", "#general"], ts());
        assert_eq!(msg.text, format!("User bob joined #general{}", suffix()));
        assert!(msg.is_complete());
    }

    #[test]
    fn double_at_is_literal() {
        let msg = render("mail @1@@example.com", &["root"], ts());
        assert_eq!(msg.text, format!("mail root@example.com{}", suffix()));
    }

    #[test]
    fn two_digit_group() {
        let groups: Vec<String> = (1..=12).map(|n| format!("g{n}")).collect();
        let groups: Vec<&str> = groups.iter().map(String::as_str).collect();
        let msg = render("@12-@1", &groups, ts());
        assert_eq!(msg.text, format!("g12-g1{}", suffix()));
    }

    #[test]
    fn third_digit_is_literal() {
        let msg = render("@123", &["a"; 12], ts());
        assert_eq!(msg.text, format!("a3{}", suffix()));
    }

    #[test]
    fn out_of_range_group_cuts_message() {
        let msg = render("User @1 joined @9 today", &["bob", "#general"], ts());
        assert_eq!(msg.text, format!("User bob joined {}", suffix()));
        assert_eq!(
            msg.warnings,
            vec![TemplateWarning::GroupOutOfRange {
                group: 9,
                available: 2
            }]
        );
    }

    #[test]
    fn group_zero_is_out_of_range() {
        let msg = render("x @0", &["a"], ts());
        assert_eq!(msg.text, format!("x {}", suffix()));
        assert!(!msg.is_complete());
    }

    #[test]
    fn invalid_placeholder_cuts_message() {
        let msg = render("ping @host now", &["a"], ts());
        assert_eq!(msg.text, format!("ping {}", suffix()));
        assert_eq!(
            msg.warnings,
            vec![TemplateWarning::InvalidPlaceholder { offset: 5 }]
        );
    }

    #[test]
    fn trailing_at_is_invalid() {
        let msg = render("end @", &["a"], ts());
        assert_eq!(msg.text, format!("end {}", suffix()));
        assert!(!msg.is_complete());
    }

    #[test]
    fn no_groups_uses_template_verbatim() {
        let msg = render("costs @5 @@ @x", &[], ts());
        assert_eq!(msg.text, format!("costs @5 @@ @x{}", suffix()));
        assert!(msg.is_complete());
    }

    #[test]
    fn multibyte_text_is_copied() {
        let msg = render("사용자 @1 로그인", &["김"], ts());
        assert_eq!(msg.text, format!("사용자 김 로그인{}", suffix()));
    }

    #[test]
    fn long_messages_are_truncated() {
        let big = "x".repeat(MAX_MESSAGE_LEN);
        let msg = render("@1", &[big.as_str()], ts());
        assert_eq!(msg.text.len(), MAX_MESSAGE_LEN);
        assert!(matches!(
            msg.warnings.as_slice(),
            [TemplateWarning::Truncated { .. }]
        ));
    }

    #[test]
    fn buffer_truncates_on_char_boundary() {
        let mut buf = MessageBuffer::new();
        buf.push_str(&"a".repeat(MAX_MESSAGE_LEN - 1));
        buf.push_str("가");
        assert_eq!(buf.len(), MAX_MESSAGE_LEN - 1);
        assert!(buf.is_truncated());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn render_never_panics_and_respects_cap(
                template in ".{0,200}",
                groups in proptest::collection::vec(".{0,40}", 0..12),
            ) {
                let groups: Vec<&str> = groups.iter().map(String::as_str).collect();
                let msg = render(&template, &groups, ts());
                prop_assert!(msg.text.len() <= MAX_MESSAGE_LEN);
                let truncated = msg
                    .warnings
                    .iter()
                    .any(|w| matches!(w, TemplateWarning::Truncated { .. }));
                if !truncated {
                    prop_assert!(msg.text.ends_with(&suffix()));
                }
            }

            #[test]
            fn templates_without_at_are_copied(template in "[^@]{0,200}") {
                let msg = render(&template, &["g"], ts());
                prop_assert!(msg.is_complete());
                prop_assert_eq!(&msg.text, &format!("{template}{}", suffix()));
            }
        }
    }
}
