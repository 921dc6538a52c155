//! Input path patterns with coordinate placeholders
//!
//! Similar to the ImageJ BigStitcher stack loader, a pattern such as
//! `{zzzz}/{yyyy}/{xxxx}.png` names one tile per (x, y, z). The number of
//! letters in a placeholder is the maximum number of decimal digits of that
//! coordinate.

use crate::io::error::{Result, invalid_parameter};

/// Coordinate axis of a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Tile column
    X,
    /// Tile row
    Y,
    /// Slice
    Z,
}

impl Axis {
    /// All axes in index order
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Position of this axis in coordinate arrays
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Placeholder letter
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
        }
    }

    const fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'x' => Some(Self::X),
            b'y' => Some(Self::Y),
            b'z' => Some(Self::Z),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Coordinate { axis: Axis, width: usize },
}

/// Parsed input path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPattern {
    source: String,
    tokens: Vec<Token>,
}

impl InputPattern {
    /// Parse a pattern; all three axes must occur
    ///
    /// # Errors
    ///
    /// Returns an error if a placeholder for x, y or z is missing
    pub fn parse(pattern: &str) -> Result<Self> {
        Self::parse_with_axes(pattern, &Axis::ALL)
    }

    /// Parse a pattern in which only the `required` axes must occur
    ///
    /// # Errors
    ///
    /// Returns an error if a placeholder for a required axis is missing
    pub fn parse_with_axes(pattern: &str, required: &[Axis]) -> Result<Self> {
        let bytes = pattern.as_bytes();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while let Some(&byte) = bytes.get(i) {
            if byte == b'{' {
                if let Some((axis, width)) = placeholder_at(bytes, i) {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Coordinate { axis, width });
                    i += width + 2;
                    continue;
                }
            }
            let ch_len = pattern
                .get(i..)
                .and_then(|rest| rest.chars().next())
                .map_or(1, char::len_utf8);
            if let Some(chunk) = pattern.get(i..i + ch_len) {
                literal.push_str(chunk);
            }
            i += ch_len;
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        let parsed = Self {
            source: pattern.to_string(),
            tokens,
        };
        if let Some(&missing) = required.iter().find(|&&axis| !parsed.has_axis(axis)) {
            return Err(invalid_parameter(
                "input_path_pattern",
                &pattern,
                &format!("is not a valid pattern, placeholder for {} is missing", missing.letter()),
            ));
        }
        Ok(parsed)
    }

    /// The pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn has_axis(&self, axis: Axis) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Coordinate { axis: a, .. } if *a == axis))
    }

    /// Widest placeholder per axis, `[x, y, z]`
    pub fn digit_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for token in &self.tokens {
            if let Token::Coordinate { axis, width } = token {
                if let Some(count) = counts.get_mut(axis.index()) {
                    *count = (*count).max(*width);
                }
            }
        }
        counts
    }

    /// Substitute coordinates, zero padded to `widths` (0 means unpadded)
    pub fn format(&self, coords: [u64; 3], widths: [usize; 3]) -> String {
        let mut out = String::with_capacity(self.source.len());
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Coordinate { axis, .. } => {
                    let value = coords.get(axis.index()).copied().unwrap_or_default();
                    let width = widths.get(axis.index()).copied().unwrap_or_default();
                    out.push_str(&format!("{value:0width$}"));
                }
            }
        }
        out
    }

    /// Extract `[x, y, z]` from a path produced by this pattern
    ///
    /// Each placeholder matches one up to its width of digits; repeated
    /// placeholders of one axis must agree.
    pub fn match_path(&self, path: &str) -> Option<[u64; 3]> {
        let mut values = [None; 3];
        if !match_tokens(&self.tokens, path.as_bytes(), &mut values) {
            return None;
        }
        let [x, y, z] = values;
        Some([x?, y?, z?])
    }

    /// Literal text before the first placeholder
    pub fn literal_prefix(&self) -> &str {
        match self.tokens.first() {
            Some(Token::Literal(text)) => text,
            _ => "",
        }
    }
}

// `{` followed by one or more identical axis letters and `}`
fn placeholder_at(bytes: &[u8], start: usize) -> Option<(Axis, usize)> {
    let letter = *bytes.get(start + 1)?;
    let axis = Axis::from_letter(letter)?;
    let width = bytes
        .get(start + 1..)?
        .iter()
        .take_while(|&&b| b == letter)
        .count();
    (bytes.get(start + 1 + width) == Some(&b'}')).then_some((axis, width))
}

fn match_tokens(tokens: &[Token], input: &[u8], values: &mut [Option<u64>; 3]) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return input.is_empty();
    };

    match token {
        Token::Literal(text) => input
            .strip_prefix(text.as_bytes())
            .is_some_and(|remaining| match_tokens(rest, remaining, values)),
        Token::Coordinate { axis, width } => {
            let available = input.iter().take_while(|b| b.is_ascii_digit()).count();
            let index = axis.index();
            let previous = values.get(index).copied().flatten();

            for len in 1..=available.min(*width) {
                let Some(value) = input
                    .get(..len)
                    .and_then(|digits| std::str::from_utf8(digits).ok())
                    .and_then(|digits| digits.parse::<u64>().ok())
                else {
                    continue;
                };
                if previous.is_some_and(|p| p != value) {
                    continue;
                }
                set_value(values, index, Some(value));
                if input
                    .get(len..)
                    .is_some_and(|remaining| match_tokens(rest, remaining, values))
                {
                    return true;
                }
                set_value(values, index, previous);
            }
            false
        }
    }
}

fn set_value(values: &mut [Option<u64>; 3], index: usize, value: Option<u64>) {
    if let Some(slot) = values.get_mut(index) {
        *slot = value;
    }
}

/// Validate a pattern given on the command line
///
/// # Errors
///
/// Returns the validation message if the pattern is invalid
pub fn check_input_pattern(pattern: &str) -> std::result::Result<String, String> {
    InputPattern::parse(pattern)
        .map(|_| pattern.to_string())
        .map_err(|e| e.to_string())
}
