// Froth: flow-word capture
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

//! `if` and `macro` both capture a balanced token sequence from the
//! current line up to a matching `;`. Nested flow words increase a depth
//! counter so an inner `if ... ;` doesn't terminate the outer capture.

use std::collections::VecDeque;

use crate::error::{ErrorKind, Result};
use crate::token::Token;
use crate::words::WordTable;

/// Pop tokens from the front of `line` until a terminating `;` at depth
/// zero, returning the captured (non-terminating) tokens in order.
///
/// Fails with `EndOfLine` if the line empties before a terminator.
pub fn read_flow(line: &mut VecDeque<Token>, words: &WordTable) -> Result<Vec<Token>> {
    let mut depth: i64 = 0;
    let mut sequence = Vec::new();

    loop {
        let token = line.pop_front().ok_or(ErrorKind::EndOfLine)?;

        if token.is_word(";") {
            if depth == 0 {
                return Ok(sequence);
            }
            depth -= 1;
            sequence.push(token);
            continue;
        }

        if let Some(name) = token.as_word() {
            if words.is_flow_word(name) {
                depth += 1;
            }
        }
        sequence.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Token::*;

    fn line_of(tokens: Vec<Token>) -> VecDeque<Token> {
        tokens.into_iter().collect()
    }

    #[test]
    fn captures_up_to_terminator() {
        let words = WordTable::builtin();
        let mut line = line_of(vec![
            Integer(1),
            Integer(1),
            Word("add".to_string()),
            Word(";".to_string()),
            Integer(1),
        ]);
        let body = read_flow(&mut line, &words).unwrap();
        assert_eq!(
            body,
            vec![Integer(1), Integer(1), Word("add".to_string())]
        );
        // The trailing token after `;` is left on the line.
        assert_eq!(line, line_of(vec![Integer(1)]));
    }

    #[test]
    fn nested_flow_word_increases_depth() {
        let words = WordTable::builtin();
        let mut line = line_of(vec![
            Word("if".to_string()),
            Integer(2),
            Word(";".to_string()),
            Word(";".to_string()),
        ]);
        let body = read_flow(&mut line, &words).unwrap();
        assert_eq!(
            body,
            vec![
                Word("if".to_string()),
                Integer(2),
                Word(";".to_string()),
            ]
        );
        assert!(line.is_empty());
    }

    #[test]
    fn missing_terminator_is_end_of_line() {
        let words = WordTable::builtin();
        let mut line = line_of(vec![Integer(1)]);
        assert_eq!(read_flow(&mut line, &words).unwrap_err(), ErrorKind::EndOfLine);
    }
}
