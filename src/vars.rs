// Froth: variable map
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

//! The variable map binds an identifier to either a single integer
//! (`var`) or a stored token sequence (`macro`). It is pre-seeded with
//! one entry per builtin error kind, so Froth source can refer to e.g.
//! `STACK_UNDERFLOW` as a plain integer.

use std::collections::HashMap;

use crate::error::ErrorKind;
use crate::token::Token;

/// A variable's bound value: a single value assigned with `var`, or a
/// macro body captured with `macro ... ;`. Macros are not closures --
/// they carry no captured environment, just the token sequence itself.
#[derive(Clone, Debug, PartialEq)]
pub enum Variable {
    Value(i64),
    Macro(Vec<Token>),
}

#[derive(Clone, Debug, Default)]
pub struct VariableMap {
    vars: HashMap<String, Variable>,
}

impl VariableMap {
    /// A fresh map, pre-seeded with the builtin error codes.
    pub fn new() -> VariableMap {
        let mut vars = HashMap::new();
        for &kind in ErrorKind::builtins() {
            vars.insert(kind.name(), Variable::Value(kind.code()));
        }
        VariableMap { vars }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: i64) {
        self.vars.insert(name.into(), Variable::Value(value));
    }

    pub fn set_macro(&mut self, name: impl Into<String>, body: Vec<Token>) {
        self.vars.insert(name.into(), Variable::Macro(body));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.vars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_error_names_are_preseeded() {
        let vars = VariableMap::new();
        assert_eq!(
            vars.get("STACK_UNDERFLOW"),
            Some(&Variable::Value(ErrorKind::StackUnderflow.code()))
        );
    }

    #[test]
    fn var_overwrites_and_lookup_yields_last_assignment() {
        let mut vars = VariableMap::new();
        vars.set_value("x", 1);
        vars.set_value("x", 2);
        assert_eq!(vars.get("x"), Some(&Variable::Value(2)));
    }

    #[test]
    fn macro_lookup_yields_the_captured_body() {
        let mut vars = VariableMap::new();
        let body = vec![Token::Integer(1), Token::Word("add".to_string())];
        vars.set_macro("inc", body.clone());
        assert_eq!(vars.get("inc"), Some(&Variable::Macro(body)));
    }
}
