use std::sync::LazyLock;

use regex::Regex;

static HEADING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:#+\s*)+").expect("valid heading prefix regex"));

static HYPHEN_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("valid hyphen run regex"));

static TRAILING_BACKSLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\+\s*$").expect("valid trailing backslash regex"));

static CHAPTER_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:#\s*)?Capítulo\s*(\d+)").expect("valid chapter heading regex")
});

static PART_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:#\s*)?Parte\s*([IVXLCDM]+)\b").expect("valid part heading regex")
});

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid leading digits regex"));

const EM_DASH: &str = "—";

pub fn normalize(title: &str) -> String {
    let without_marker = HEADING_PREFIX.replace(title, "");
    let dashed = HYPHEN_RUN.replace_all(&without_marker, EM_DASH);
    dashed.trim().to_owned()
}

pub fn clean_body_line(line: &str) -> String {
    let dashed = HYPHEN_RUN.replace_all(line, EM_DASH);
    let unbroken = TRAILING_BACKSLASHES.replace(&dashed, "");
    unbroken.trim().to_owned()
}

/// Sort position recovered from a title.
///
/// `Unnumbered` orders after every number, so titles without an ordinal sort
/// last instead of disappearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ordinal {
    Number(u64),
    Unnumbered,
}

impl Ordinal {
    pub fn number(self) -> Option<u64> {
        match self {
            Ordinal::Number(n) => Some(n),
            Ordinal::Unnumbered => None,
        }
    }
}

impl std::fmt::Display for Ordinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ordinal::Number(n) => write!(f, "{n}"),
            Ordinal::Unnumbered => f.write_str("∞"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingClass {
    Chapter,
    Part,
    Other,
}

pub fn classify_heading(title: &str) -> HeadingClass {
    if CHAPTER_HEADING.is_match(title) {
        HeadingClass::Chapter
    } else if PART_HEADING.is_match(title) {
        HeadingClass::Part
    } else {
        HeadingClass::Other
    }
}

pub fn extract_ordinal(title: &str) -> Ordinal {
    if let Some(caps) = CHAPTER_HEADING.captures(title) {
        return parse_digits(&caps[1]);
    }

    if let Some(caps) = PART_HEADING.captures(title)
        && let Some(numeral) = caps.get(1)
        && !numeral.as_str().is_empty()
    {
        return Ordinal::Number(roman_to_int(numeral.as_str()));
    }

    match LEADING_DIGITS.captures(title) {
        Some(caps) => parse_digits(&caps[1]),
        None => Ordinal::Unnumbered,
    }
}

fn parse_digits(digits: &str) -> Ordinal {
    match digits.parse::<u64>() {
        Ok(n) => Ordinal::Number(n),
        Err(err) => {
            tracing::debug!(digits, %err, "ordinal does not fit; treating as unnumbered");
            Ordinal::Unnumbered
        }
    }
}

fn roman_value(symbol: char) -> u64 {
    match symbol.to_ascii_uppercase() {
        'I' => 1,
        'V' => 5,
        'X' => 10,
        'L' => 50,
        'C' => 100,
        'D' => 500,
        'M' => 1000,
        _ => 0,
    }
}

pub fn roman_to_int(numeral: &str) -> u64 {
    let values = numeral.chars().map(roman_value).collect::<Vec<_>>();
    let mut total = 0_u64;
    let mut idx = 0;
    while idx < values.len() {
        let current = values[idx];
        match values.get(idx + 1) {
            Some(&next) if current < next => {
                total = total.saturating_add(next - current);
                idx += 2;
            }
            _ => {
                total = total.saturating_add(current);
                idx += 1;
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn normalize_strips_heading_markers() {
        assert_eq!(normalize("# Capítulo 1"), "Capítulo 1");
        assert_eq!(normalize("  ### Epígrafe  "), "Epígrafe");
        assert_eq!(normalize("#Parte II"), "Parte II");
        assert_eq!(normalize("# # Nota"), "Nota");
    }

    #[test]
    fn normalize_turns_hyphen_runs_into_em_dash() {
        assert_eq!(
            normalize("Parte I -- Fundamentos"),
            "Parte I — Fundamentos"
        );
        assert_eq!(
            normalize("# Capítulo 1 --- Prólogo"),
            "Capítulo 1 — Prólogo"
        );
        assert_eq!(normalize("bem-vindo"), "bem-vindo");
    }

    #[test]
    fn normalize_keeps_case_and_inner_whitespace() {
        assert_eq!(normalize("capítulo  UM"), "capítulo  UM");
    }

    #[test]
    fn clean_body_line_drops_hard_breaks() {
        assert_eq!(clean_body_line("primeira linha\\  "), "primeira linha");
        assert_eq!(clean_body_line("  a -- b\\\\"), "a — b");
    }

    #[test]
    fn extract_ordinal_reads_chapter_numbers() {
        assert_eq!(extract_ordinal("# Capítulo 12 -- Fim"), Ordinal::Number(12));
        assert_eq!(extract_ordinal("CAPÍTULO 3"), Ordinal::Number(3));
        assert_eq!(extract_ordinal("Capítulo7"), Ordinal::Number(7));
    }

    #[test]
    fn extract_ordinal_reads_part_numerals() {
        assert_eq!(extract_ordinal("# Parte IV -- Prática"), Ordinal::Number(4));
        assert_eq!(extract_ordinal("Parte ii"), Ordinal::Number(2));
    }

    #[test]
    fn extract_ordinal_falls_back_to_leading_digits() {
        assert_eq!(extract_ordinal("8.2 Liderança Ágil"), Ordinal::Number(8));
        assert_eq!(extract_ordinal("Partes do todo"), Ordinal::Unnumbered);
        assert_eq!(extract_ordinal("Introdução"), Ordinal::Unnumbered);
        assert_eq!(
            extract_ordinal("99999999999999999999999 overflow"),
            Ordinal::Unnumbered
        );
    }

    #[test]
    fn unnumbered_sorts_last() {
        let mut ordinals = vec![
            Ordinal::Unnumbered,
            Ordinal::Number(3),
            Ordinal::Number(1),
        ];
        ordinals.sort();
        assert_eq!(
            ordinals,
            vec![Ordinal::Number(1), Ordinal::Number(3), Ordinal::Unnumbered]
        );
    }

    #[test]
    fn roman_numerals_decode_standard_values() {
        assert_eq!(roman_to_int("I"), 1);
        assert_eq!(roman_to_int("IV"), 4);
        assert_eq!(roman_to_int("IX"), 9);
        assert_eq!(roman_to_int("XL"), 40);
        assert_eq!(roman_to_int("MCMXCIV"), 1994);
    }

    #[test]
    fn roman_numerals_ignore_unknown_symbols() {
        assert_eq!(roman_to_int("XZ"), 10);
        assert_eq!(roman_to_int(""), 0);
    }

    #[test]
    fn classify_heading_partitions_titles() {
        assert_eq!(classify_heading("# Capítulo 1"), HeadingClass::Chapter);
        assert_eq!(classify_heading("Parte III -- Fim"), HeadingClass::Part);
        assert_eq!(classify_heading("Posfácio"), HeadingClass::Other);
        assert_eq!(classify_heading("Parte dos autores"), HeadingClass::Other);
    }

    fn to_roman(mut n: u64) -> String {
        const TABLE: [(u64, &str); 13] = [
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
        let mut out = String::new();
        for (value, symbol) in TABLE {
            while n >= value {
                out.push_str(symbol);
                n -= value;
            }
        }
        out
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(title in "\\PC{0,40}") {
            let once = normalize(&title);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn canonical_roman_numerals_decode(n in 1_u64..4000) {
            let numeral = to_roman(n);
            prop_assert_eq!(roman_to_int(&numeral), n);
            let title = format!("Parte {numeral}");
            prop_assert_eq!(extract_ordinal(&title), Ordinal::Number(n));
        }
    }
}
