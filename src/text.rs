//! Diacritic folding used for sort keys.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Letters that canonical decomposition leaves alone or that fold to more
/// than one ASCII letter.
fn fold_special(c: char) -> Option<&'static str> {
    let s = match c {
        'Ä' => "Ae",
        'Ö' => "Oe",
        'Ü' => "Ue",
        'ä' => "ae",
        'ö' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'ẞ' => "SS",
        'Ł' => "L",
        'ł' => "l",
        'Ø' => "O",
        'ø' => "o",
        'Đ' => "D",
        'đ' => "d",
        'Æ' => "AE",
        'æ' => "ae",
        'Œ' => "OE",
        'œ' => "oe",
        'Þ' => "Th",
        'þ' => "th",
        'ı' => "i",
        _ => return None,
    };
    Some(s)
}

/// Strips diacritics: special letters first, then NFD with combining marks
/// dropped.
pub fn fold_diacritics(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        match fold_special(c) {
            Some(s) => out.push_str(s),
            None => out.extend(c.to_string().nfd().filter(|d| !is_combining_mark(*d))),
        }
    }
    out
}

/// Case-insensitive collation key for `Ordering::KeyAsc`.
pub fn sort_key(title: &str) -> String {
    fold_diacritics(title).to_lowercase()
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_special_letters() {
        assert_eq!(fold_diacritics("Ä"), "Ae");
        assert_eq!(fold_diacritics("ß"), "ss");
        assert_eq!(fold_diacritics("Ł"), "L");
    }

    #[test]
    fn strips_composed_accents() {
        assert_eq!(fold_diacritics("é"), "e");
        assert_eq!(fold_diacritics("Żółć"), "Zolc");
        assert_eq!(fold_diacritics("Łódź"), "Lodz");
        assert_eq!(fold_diacritics("Müller"), "Mueller");
    }

    #[test]
    fn sort_key_orders_polish_letters_with_their_base() {
        let mut titles = vec!["Żyrardów", "Zabrze", "Łódź", "Lublin", "Ełk"];
        titles.sort_by_key(|t| sort_key(t));
        assert_eq!(titles, vec!["Ełk", "Łódź", "Lublin", "Zabrze", "Żyrardów"]);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
