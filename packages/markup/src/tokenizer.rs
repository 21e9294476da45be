//! Scanner for change tokens embedded in block text.
//!
//! One block line is cut into literal text and bracketed tokens:
//! ```text
//! The {--quick--}{++lazy++} fox {>>sure about this?<<} jumps
//! ```
//! Anything that opens like a token but is unterminated or malformed is
//! literal text. The scan never fails.

/// A lexed piece of one block line.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Plain text between tokens.
    Text(String),
    /// `{--struck--}`
    Deletion(String),
    /// `{++added++}`
    Insertion(String),
    /// `{~~old~>new~~}`
    Substitution { old: String, new: String },
    /// `{>>note<<}`
    Comment(String),
    /// `{==marked==}`
    Highlight(String),
}

impl Token {
    /// True for the token families that carry a change or highlight id.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Token::Deletion(_) | Token::Insertion(_) | Token::Substitution { .. } | Token::Highlight(_)
        )
    }
}

/// Cut one block line into tokens. Consecutive literal characters collapse
/// into a single `Text` token.
pub fn tokenize_line(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some((token, end)) = scan_token(&chars, i) {
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(token);
                i = end;
                continue;
            }
        }
        text.push(chars[i]);
        i += 1;
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

/// Try to read a complete token starting at the `{` at `start`. Returns the
/// token and the index one past its closing brace, or `None` when the text
/// is not a well-formed token.
fn scan_token(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let opener = (*chars.get(start + 1)?, *chars.get(start + 2)?);
    let body = start + 3;

    match opener {
        ('~', '~') => scan_substitution(chars, body),
        ('-', '-') => scan_delimited(chars, body, ['-', '-', '}']).map(|(s, end)| (Token::Deletion(s), end)),
        ('+', '+') => scan_delimited(chars, body, ['+', '+', '}']).map(|(s, end)| (Token::Insertion(s), end)),
        ('>', '>') => scan_delimited(chars, body, ['<', '<', '}']).map(|(s, end)| (Token::Comment(s), end)),
        ('=', '=') => scan_delimited(chars, body, ['=', '=', '}']).map(|(s, end)| (Token::Highlight(s), end)),
        _ => None,
    }
}

/// Scan for the first occurrence of a three-character closer; the content
/// runs up to it.
fn scan_delimited(chars: &[char], from: usize, closer: [char; 3]) -> Option<(String, usize)> {
    let mut i = from;
    while i + 3 <= chars.len() {
        if chars[i] == closer[0] && chars[i + 1] == closer[1] && chars[i + 2] == closer[2] {
            return Some((chars[from..i].iter().collect(), i + 3));
        }
        i += 1;
    }
    None
}

/// Scan `old~>new~~}` following a `{~~` opener. Both sides may be empty;
/// a missing `~>` arrow makes the whole token malformed.
fn scan_substitution(chars: &[char], from: usize) -> Option<(Token, usize)> {
    let mut arrow = None;
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '~' && chars[i + 1] == '>' {
            arrow = Some(i);
            break;
        }
        // An early closer means there is no arrow inside this token.
        if i + 2 < chars.len() && chars[i] == '~' && chars[i + 1] == '~' && chars[i + 2] == '}' {
            return None;
        }
        i += 1;
    }
    let arrow = arrow?;

    let (new, end) = scan_delimited(chars, arrow + 2, ['~', '~', '}'])?;
    let old: String = chars[from..arrow].iter().collect();
    Some((Token::Substitution { old, new }, end))
}
