/// Tokenizer — splits a completed line into arguments on whitespace.
/// No quoting, no escaping; an empty or all-blank line yields no tokens
/// and the dispatcher is never entered.
use alloc::vec::Vec;

/// Maximum arguments per command line, the verb included.
pub const MAX_ARGS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// More than MAX_ARGS tokens on the line.
    TooManyArgs,
}

/// Split `line` into at most MAX_ARGS whitespace-separated tokens. The
/// returned slices borrow the line.
pub fn tokenize(line: &str) -> Result<Vec<&str>, TokenError> {
    let mut args = Vec::new();
    for token in line.split_whitespace() {
        if args.len() == MAX_ARGS {
            return Err(TokenError::TooManyArgs);
        }
        args.push(token);
    }
    Ok(args)
}
