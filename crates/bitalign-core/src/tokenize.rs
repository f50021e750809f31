/// Whether `c` belongs to a script written without spaces between words
/// (Han, kana, hangul) or is CJK punctuation / a full-width form.
pub fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
        | '\u{3040}'..='\u{30FF}' // hiragana, katakana
        | '\u{3100}'..='\u{312F}' // bopomofo
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}' // hangul syllables
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
        | '\u{FE30}'..='\u{FE4F}' // CJK compatibility forms
        | '\u{FF00}'..='\u{FFEF}' // half-width and full-width forms
        | '\u{20000}'..='\u{2FA1F}')
}

/// Split a sentence into a flat token sequence.
///
/// Whitespace separates tokens; inside a whitespace-delimited chunk each CJK
/// character is its own token and runs of other characters stay together.
///
/// - `"The cat sat."` → `["The", "cat", "sat."]`
/// - `"猫坐着。"` → `["猫", "坐", "着", "。"]`
/// - `"用GPT-4翻译"` → `["用", "GPT-4", "翻", "译"]`
pub fn tokenize(sentence: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for chunk in sentence.split_whitespace() {
        let mut run_start: Option<usize> = None;
        for (idx, c) in chunk.char_indices() {
            if is_cjk_char(c) {
                if let Some(start) = run_start.take() {
                    tokens.push(&chunk[start..idx]);
                }
                tokens.push(&chunk[idx..idx + c.len_utf8()]);
            } else if run_start.is_none() {
                run_start = Some(idx);
            }
        }
        if let Some(start) = run_start {
            tokens.push(&chunk[start..]);
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokens() {
        assert_eq!(tokenize("The cat  sat.\n"), vec!["The", "cat", "sat."]);
    }

    #[test]
    fn test_cjk_characters_split() {
        assert_eq!(tokenize("猫坐着。"), vec!["猫", "坐", "着", "。"]);
        assert_eq!(tokenize("狗 大声叫"), vec!["狗", "大", "声", "叫"]);
    }

    #[test]
    fn test_mixed_script() {
        assert_eq!(tokenize("用GPT-4翻译"), vec!["用", "GPT-4", "翻", "译"]);
        assert_eq!(tokenize("版本v2，发布"), vec!["版", "本", "v2", "，", "发", "布"]);
    }

    #[test]
    fn test_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }
}
