//! LaTeX markup decoding for titles, names, and abstracts.
//!
//! Decoding runs as ordered passes (accents, diacritics, punctuation,
//! symbols, greek) followed by NFC normalization, mirroring the staged
//! decoders bibliographic toolchains use. Three variants exist because the
//! pipeline treats fields differently:
//!
//! - [`LatexDecoder::decode`] — full decode plus brace stripping, for
//!   titles, names, and addresses headed into plain-text record fields;
//! - [`LatexDecoder::decode_tex`] — full decode with braces kept, for the
//!   TeX-preserving title variant (protects math and forced casing);
//! - [`LatexDecoder::decode_abstract`] — strict: raw non-ASCII input is a
//!   fatal violation, and only the conservative passes run so embedded math
//!   survives re-rendering.
use crate::error::{Error, Result};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub struct LatexDecoder {
    accent_dotless: Regex,
    accent_braced: Regex,
    accent_bare: Regex,
    diacritic_braced: Regex,
    diacritic_spaced: Regex,
    symbol: Regex,
    escaped_special: Regex,
    greek: Regex,
}

impl LatexDecoder {
    pub fn new() -> Self {
        Self {
            accent_dotless: Regex::new(r#"\\(['`^"~=.])\{\\([ij])\}"#)
                .expect("regex for dotless accents"),
            accent_braced: Regex::new(r#"\\(['`^"~=.])\{([A-Za-z])\}"#)
                .expect("regex for braced accents"),
            accent_bare: Regex::new(r#"\\(['`^"~=.])([A-Za-z])"#).expect("regex for bare accents"),
            diacritic_braced: Regex::new(r"\\([cvuHkrbd])\{([A-Za-z])\}")
                .expect("regex for braced diacritics"),
            diacritic_spaced: Regex::new(r"\\([cvuHkrbd]) ([A-Za-z])")
                .expect("regex for spaced diacritics"),
            symbol: Regex::new(
                r"\\(ldots|dots|copyright|pounds|euro|ddag|dag|ss|ae|AE|aa|AA|oe|OE|o|O|l|L|i|j|S|P)\b",
            )
            .expect("regex for symbol macros"),
            escaped_special: Regex::new(r"\\([&%$#_])").expect("regex for escaped specials"),
            greek: Regex::new(
                r"\\(alpha|beta|gamma|delta|epsilon|varepsilon|zeta|eta|theta|vartheta|iota|kappa|lambda|mu|nu|xi|pi|varpi|rho|varrho|sigma|varsigma|tau|upsilon|phi|varphi|chi|psi|omega|Gamma|Delta|Theta|Lambda|Xi|Pi|Sigma|Upsilon|Phi|Psi|Omega)\b",
            )
            .expect("regex for greek macros"),
        }
    }

    /// Full decode for plain-text fields; braces are stripped afterward.
    pub fn decode(&self, text: &str) -> String {
        let decoded = self.decode_tex(text);
        strip_braces(&decoded)
    }

    /// Full decode that keeps braces, protecting math and forced casing.
    pub fn decode_tex(&self, text: &str) -> String {
        let mut out = self.apply_accents(text);
        out = self.apply_diacritics(&out);
        out = apply_punctuation(&out);
        out = self.apply_symbols(&out);
        out = self.apply_greek(&out);
        out.nfc().collect()
    }

    /// Strict decode for abstracts. Abstracts must arrive as pure
    /// LaTeX-escaped ASCII; any raw non-ASCII character is fatal and the
    /// offending characters are named. Only the conservative passes run.
    pub fn decode_abstract(&self, text: &str, entry: &str) -> Result<String> {
        let offending = crate::inventory::scan_non_ascii(text);
        if !offending.is_empty() {
            let chars = offending
                .iter()
                .map(|ch| format!("'{ch}'"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::AbstractEncodingViolation {
                entry: entry.to_string(),
                chars,
            });
        }
        let mut out = self.apply_accents(text);
        out = self.apply_diacritics(&out);
        out = apply_punctuation(&out);
        Ok(out.nfc().collect())
    }

    fn apply_accents(&self, text: &str) -> String {
        let replace = |caps: &regex::Captures| -> String {
            let base = &caps[2];
            match accent_combining(caps[1].chars().next().unwrap_or_default()) {
                Some(mark) => format!("{base}{mark}"),
                None => caps[0].to_string(),
            }
        };
        let out = self.accent_dotless.replace_all(text, replace);
        let out = self.accent_braced.replace_all(&out, replace);
        self.accent_bare.replace_all(&out, replace).into_owned()
    }

    fn apply_diacritics(&self, text: &str) -> String {
        let replace = |caps: &regex::Captures| -> String {
            let base = &caps[2];
            match diacritic_combining(caps[1].chars().next().unwrap_or_default()) {
                Some(mark) => format!("{base}{mark}"),
                None => caps[0].to_string(),
            }
        };
        let out = self.diacritic_braced.replace_all(text, replace);
        self.diacritic_spaced.replace_all(&out, replace).into_owned()
    }

    fn apply_symbols(&self, text: &str) -> String {
        let out = self.symbol.replace_all(text, |caps: &regex::Captures| {
            symbol_text(&caps[1]).to_string()
        });
        self.escaped_special.replace_all(&out, "$1").into_owned()
    }

    fn apply_greek(&self, text: &str) -> String {
        self.greek
            .replace_all(text, |caps: &regex::Captures| {
                greek_text(&caps[1]).to_string()
            })
            .into_owned()
    }
}

impl Default for LatexDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn accent_combining(command: char) -> Option<char> {
    Some(match command {
        '\'' => '\u{0301}',
        '`' => '\u{0300}',
        '^' => '\u{0302}',
        '"' => '\u{0308}',
        '~' => '\u{0303}',
        '=' => '\u{0304}',
        '.' => '\u{0307}',
        _ => return None,
    })
}

fn diacritic_combining(command: char) -> Option<char> {
    Some(match command {
        'c' => '\u{0327}',
        'v' => '\u{030C}',
        'u' => '\u{0306}',
        'H' => '\u{030B}',
        'k' => '\u{0328}',
        'r' => '\u{030A}',
        'b' => '\u{0331}',
        'd' => '\u{0323}',
        _ => return None,
    })
}

fn symbol_text(name: &str) -> &'static str {
    match name {
        "ldots" | "dots" => "\u{2026}",
        "copyright" => "\u{a9}",
        "pounds" => "\u{a3}",
        "euro" => "\u{20ac}",
        "dag" => "\u{2020}",
        "ddag" => "\u{2021}",
        "ss" => "\u{df}",
        "ae" => "\u{e6}",
        "AE" => "\u{c6}",
        "aa" => "\u{e5}",
        "AA" => "\u{c5}",
        "oe" => "\u{153}",
        "OE" => "\u{152}",
        "o" => "\u{f8}",
        "O" => "\u{d8}",
        "l" => "\u{142}",
        "L" => "\u{141}",
        "i" => "\u{131}",
        "j" => "\u{237}",
        "S" => "\u{a7}",
        "P" => "\u{b6}",
        _ => "",
    }
}

fn greek_text(name: &str) -> &'static str {
    match name {
        "alpha" => "\u{3b1}",
        "beta" => "\u{3b2}",
        "gamma" => "\u{3b3}",
        "delta" => "\u{3b4}",
        "epsilon" | "varepsilon" => "\u{3b5}",
        "zeta" => "\u{3b6}",
        "eta" => "\u{3b7}",
        "theta" => "\u{3b8}",
        "vartheta" => "\u{3d1}",
        "iota" => "\u{3b9}",
        "kappa" => "\u{3ba}",
        "lambda" => "\u{3bb}",
        "mu" => "\u{3bc}",
        "nu" => "\u{3bd}",
        "xi" => "\u{3be}",
        "pi" => "\u{3c0}",
        "varpi" => "\u{3d6}",
        "rho" => "\u{3c1}",
        "varrho" => "\u{3f1}",
        "sigma" => "\u{3c3}",
        "varsigma" => "\u{3c2}",
        "tau" => "\u{3c4}",
        "upsilon" => "\u{3c5}",
        "phi" => "\u{3c6}",
        "varphi" => "\u{3d5}",
        "chi" => "\u{3c7}",
        "psi" => "\u{3c8}",
        "omega" => "\u{3c9}",
        "Gamma" => "\u{393}",
        "Delta" => "\u{394}",
        "Theta" => "\u{398}",
        "Lambda" => "\u{39b}",
        "Xi" => "\u{39e}",
        "Pi" => "\u{3a0}",
        "Sigma" => "\u{3a3}",
        "Upsilon" => "\u{3a5}",
        "Phi" => "\u{3a6}",
        "Psi" => "\u{3a8}",
        "Omega" => "\u{3a9}",
        _ => "",
    }
}

fn apply_punctuation(text: &str) -> String {
    text.replace("---", "\u{2014}")
        .replace("--", "\u{2013}")
        .replace("``", "\u{201c}")
        .replace("''", "\u{201d}")
        .replace('~', " ")
}

/// Remove unescaped braces, then unescape the escaped ones.
fn strip_braces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = '\0';
    for ch in text.chars() {
        if (ch == '{' || ch == '}') && prev != '\\' {
            prev = ch;
            continue;
        }
        out.push(ch);
        prev = ch;
    }
    out.replace("\\{", "{").replace("\\}", "}")
}
