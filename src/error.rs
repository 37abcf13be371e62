// Froth: error/catch subsystem
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

//! Errors are values here, not host-language exceptions. Every handler
//! either succeeds or returns one of these kinds; the evaluator propagates
//! the first non-success kind it sees to the driver, which consults the
//! catch map before surfacing anything to the host.

use std::fmt;

/// The result of a single handler invocation or evaluation step.
pub type Result<T> = core::result::Result<T, ErrorKind>;

/// The closed built-in error taxonomy, plus an open `UserError` for
/// synthetic errors raised from Froth source with `raise`.
///
/// The builtin kinds carry the stable integer codes pre-seeded into the
/// variable map (§6 of the spec) so that `catch`/`raise` can address them
/// by number from inside a running program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Undefined,
    Success,
    StackUnderflow,
    EndOfProgram,
    EndOfLine,
    UnknownWord,
    MemoryError,
    DepthExceeded,
    DivideByZero,
    /// `raise N` collides intentionally with the builtin codes: a user
    /// error carrying code 2 is indistinguishable from `StackUnderflow`
    /// to the catch machinery, exactly as in the reference implementation.
    UserError(i64),
}

impl ErrorKind {
    /// The stable integer code used by `catch`/`raise` and pre-seeded
    /// into the variable map under each kind's name.
    pub fn code(self) -> i64 {
        match self {
            ErrorKind::Undefined => 0,
            ErrorKind::Success => 1,
            ErrorKind::StackUnderflow => 2,
            ErrorKind::EndOfProgram => 3,
            ErrorKind::EndOfLine => 4,
            ErrorKind::UnknownWord => 5,
            ErrorKind::MemoryError => 6,
            ErrorKind::DepthExceeded => 7,
            ErrorKind::DivideByZero => 8,
            ErrorKind::UserError(n) => n,
        }
    }

    /// Reconstruct a kind from an integer code. User-raised codes that
    /// don't match a builtin always round-trip to `UserError`; codes
    /// that do match a builtin round-trip to that builtin kind, which
    /// is the deliberate collision described in the spec.
    pub fn from_code(code: i64) -> ErrorKind {
        match code {
            0 => ErrorKind::Undefined,
            1 => ErrorKind::Success,
            2 => ErrorKind::StackUnderflow,
            3 => ErrorKind::EndOfProgram,
            4 => ErrorKind::EndOfLine,
            5 => ErrorKind::UnknownWord,
            6 => ErrorKind::MemoryError,
            7 => ErrorKind::DepthExceeded,
            8 => ErrorKind::DivideByZero,
            n => ErrorKind::UserError(n),
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ErrorKind::Success)
    }

    /// The name pre-seeded into the variable map, and shown to the host
    /// as the terminal status. User errors render as `USER_ERROR_<n>`.
    pub fn name(self) -> String {
        match self {
            ErrorKind::Undefined => "UNDEFINED".to_string(),
            ErrorKind::Success => "SUCCESS".to_string(),
            ErrorKind::StackUnderflow => "STACK_UNDERFLOW".to_string(),
            ErrorKind::EndOfProgram => "END_OF_PROGRAM".to_string(),
            ErrorKind::EndOfLine => "END_OF_LINE".to_string(),
            ErrorKind::UnknownWord => "UNKNOWN_WORD".to_string(),
            ErrorKind::MemoryError => "MEMORY_ERROR".to_string(),
            ErrorKind::DepthExceeded => "DEPTH_EXCEEDED".to_string(),
            ErrorKind::DivideByZero => "DIVIDE_BY_ZERO".to_string(),
            ErrorKind::UserError(n) => format!("USER_ERROR_{}", n),
        }
    }

    /// Every builtin kind, in the order the variable map pre-seeds them.
    pub fn builtins() -> &'static [ErrorKind] {
        &[
            ErrorKind::Undefined,
            ErrorKind::Success,
            ErrorKind::StackUnderflow,
            ErrorKind::EndOfProgram,
            ErrorKind::EndOfLine,
            ErrorKind::UnknownWord,
            ErrorKind::MemoryError,
            ErrorKind::DepthExceeded,
            ErrorKind::DivideByZero,
        ]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_for_builtins() {
        for &kind in ErrorKind::builtins() {
            assert_eq!(ErrorKind::from_code(kind.code()), kind);
        }
    }

    #[test]
    fn user_error_collides_with_builtin_code() {
        assert_eq!(ErrorKind::from_code(2), ErrorKind::StackUnderflow);
        assert_eq!(ErrorKind::UserError(2).code(), 2);
    }

    #[test]
    fn user_error_name_is_rendered() {
        assert_eq!(ErrorKind::UserError(35).name(), "USER_ERROR_35");
    }
}
