// Froth: tokenizer
//
// Copyright (C) 2019  Brandon Lewis
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public License
// as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this program.  If not, see
// <https://www.gnu.org/licenses/>.

//! Converts a single source line into an ordered token sequence. Scans
//! character by character with a small bit of state, rather than via a
//! grammar -- Froth's surface syntax is line-oriented and has no nesting
//! except the `( ... )` comment and the flow-word `;` terminator, both of
//! which are handled above this layer.

use crate::error::{ErrorKind, Result};

/// A literal number or an identifier. String literals never survive as
/// tokens themselves -- the tokenizer expands them in place into the
/// reversed character codes plus a length marker (see `tokenize`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Integer(i64),
    Word(String),
}

impl Token {
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w.as_str()),
            Token::Integer(_) => None,
        }
    }

    pub fn is_word(&self, name: &str) -> bool {
        self.as_word() == Some(name)
    }
}

/// Classify a flushed buffer as an integer literal or a word.
fn classify(buffer: String) -> Token {
    match buffer.parse::<i64>() {
        Ok(v) => Token::Integer(v),
        Err(_) => Token::Word(buffer),
    }
}

/// Tokenize a single source line.
///
/// Returns `Err(ErrorKind::EndOfLine)` if a string literal is left open
/// at the end of the line -- the same code a mid-evaluation underflow on
/// an exhausted line produces, since both mean "this line ran out before
/// its syntax closed".
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    let mut in_comment = false;
    let mut in_string = false;
    let mut escape = false;

    let mut flush = |buffer: &mut String, tokens: &mut Vec<Token>| {
        if !buffer.is_empty() {
            tokens.push(classify(std::mem::take(buffer)));
        }
    };

    for ch in line.chars() {
        if escape && !in_comment {
            buffer.push(ch);
            escape = false;
            continue;
        }

        match ch {
            '\\' if !in_comment => escape = true,
            ' ' if !in_comment && !in_string => flush(&mut buffer, &mut tokens),
            '(' if !in_string => {
                flush(&mut buffer, &mut tokens);
                in_comment = true;
            }
            ')' => {
                in_comment = false;
                buffer.clear();
            }
            '"' if !in_comment => {
                if in_string {
                    let chars: Vec<i64> = buffer.chars().map(|c| c as i64).collect();
                    let len = chars.len() as i64;
                    tokens.extend(chars.into_iter().rev().map(Token::Integer));
                    tokens.push(Token::Integer(len));
                } else {
                    flush(&mut buffer, &mut tokens);
                }
                buffer.clear();
                in_string = !in_string;
            }
            _ if !in_comment => buffer.push(ch),
            _ => {}
        }
    }

    if !in_comment {
        flush(&mut buffer, &mut tokens);
    }

    if in_string {
        return Err(ErrorKind::EndOfLine);
    }

    Ok(tokens)
}
