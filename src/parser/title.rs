use regex::Regex;
use std::sync::OnceLock;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Normalizes a noisy game title so request names and catalog names compare
/// on equal footing. Idempotent.
#[must_use]
pub fn sanitize_title(name: &str) -> String {
    // One rewrite can expose another ("Foo, The (GOTY)" hides its trailing
    // article behind the bracketed suffix), so rewrite until stable.
    let mut current = sanitize_once(name);
    for _ in 0..8 {
        let next = sanitize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn sanitize_once(name: &str) -> String {
    static ARTICLE: OnceLock<Regex> = OnceLock::new();
    static BRACKETS: OnceLock<Regex> = OnceLock::new();
    static MARKS: OnceLock<Regex> = OnceLock::new();

    let article = get_regex(&ARTICLE, r"(?i)^(.+),\s*(the|a|an|der|das|die)$");
    let brackets = get_regex(&BRACKETS, r"\[.+?\]|\(.+?\)|\{.+?\}");
    let marks = get_regex(&MARKS, r"[™®©]");

    // "Witcher 3, The" -> "The Witcher 3"
    let rotated = article.replace(name.trim(), "$2 $1");
    let stripped = brackets.replace_all(&rotated, "");
    let stripped = marks.replace_all(&stripped, "");

    let replaced: String = stripped
        .chars()
        .filter(|c| *c != '\\')
        .map(|c| match c {
            '_' | '.' => ' ',
            '’' => '\'',
            other => other,
        })
        .collect();

    collapse_whitespace(&replaced)
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = true;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    if result.ends_with(' ') {
        result.pop();
    }

    result
}

/// Rewrites every run of digits as its Roman numeral ("final fantasy 7" ->
/// "final fantasy VII"). Runs outside 1..=3999 are left unchanged.
#[must_use]
pub fn replace_digits_with_roman(name: &str) -> String {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = get_regex(&DIGITS, r"\d+");

    digits
        .replace_all(name, |caps: &regex::Captures| match caps[0].parse::<u32>() {
            Ok(n) if (1..=3999).contains(&n) => to_roman(n),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// Standard additive/subtractive Roman numeral form for 1..=3999.
#[must_use]
pub fn to_roman(mut value: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut result = String::new();
    for (n, glyph) in TABLE {
        while value >= n {
            result.push_str(glyph);
            value -= n;
        }
    }
    result
}
