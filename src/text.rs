//! Post-text normalization.
//!
//! A fixed rule sequence strips platform boilerplate, URLs, and markup
//! remnants, then tames repeated-character laughter spam and whitespace.
//! Rule order matters: later rules assume earlier cleanup already happened.

use once_cell::sync::Lazy;
use regex::Regex;

static APP_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)-\s*dc\s+official\s+app").unwrap());
static WAVE_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)From\s+DC\s+Wave").unwrap());
static IMAGE_ORDER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)이미지\s*순서\s*ON\d*").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
// Two laughter characters dominate spam runs; collapse to exactly two so the
// laughter signal survives while run length stops mattering.
static KIEUK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"ㅋ{3,}").unwrap());
static HIEUT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"ㅎ{3,}").unwrap());

/// Normalize raw post text. Total: any input maps to a (possibly empty)
/// cleaned string, and a second pass changes nothing.
pub fn normalize(raw: &str) -> String {
    let text = APP_SIGNATURE.replace_all(raw, " ");
    let text = WAVE_SIGNATURE.replace_all(&text, " ");
    let text = IMAGE_ORDER_MARKER.replace_all(&text, " ");
    let text = URL.replace_all(&text, " ");
    let text = MARKUP_TAG.replace_all(&text, " ");
    let text = KIEUK_RUN.replace_all(&text, "ㅋㅋ");
    let text = HIEUT_RUN.replace_all(&text, "ㅎㅎ");
    collapse_whitespace(&text)
}

/// Collapse whitespace runs into single spaces and trim the ends.
pub fn collapse_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boilerplate_urls_and_markers_strip_to_empty() {
        assert_eq!(normalize("이미지 순서 ON2 https://x.com/a - dc official App"), "");
    }

    #[test]
    fn app_signature_tolerates_case_and_spacing() {
        assert_eq!(normalize("재밌다 -  DC  Official   App"), "재밌다");
        assert_eq!(normalize("글 내용 From DC Wave"), "글 내용");
    }

    #[test]
    fn laughter_runs_collapse_to_two() {
        assert_eq!(normalize("ㅋㅋㅋㅋㅋ 완전 웃김"), "ㅋㅋ 완전 웃김");
        assert_eq!(normalize("ㅎㅎㅎㅎ"), "ㅎㅎ");
        // Two-character laughter is already normal form.
        assert_eq!(normalize("ㅋㅋ 그러게"), "ㅋㅋ 그러게");
    }

    #[test]
    fn markup_and_urls_are_removed() {
        assert_eq!(
            normalize("<div>본문</div> 링크 https://example.com/a?b=1 끝"),
            "본문 링크 끝"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "이미지 순서 ON 3 <b>제목</b>   ㅋㅋㅋㅋ",
            "평범한 문장입니다",
            "  공백   정리  ",
            "",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(collapse_whitespace("한\n\n 줄\t정리"), "한 줄 정리");
    }
}
