// Froth: word table
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

//! The word table maps an identifier to either a builtin operation or a
//! host-supplied one, together with its *literal arity* -- the number of
//! raw, unevaluated tokens the dispatcher must pop from the front of the
//! current line before invoking the handler.
//!
//! This generalizes the teacher's closed `Opcode` enum and `dispatch`
//! match (`vm.rs`) from a fixed instruction set to a table that a host
//! can extend at construction time, per the original's `tokenMap` /
//! `customWords` pattern (`original_source/froth.py`, `client.py::Run`).

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ErrorKind;
use crate::token::Token;
use crate::vm::Vm;

/// Every native operation the core VM implements directly. The literal
/// arity of each is fixed at the variant level (`literal_arity`) rather
/// than carried as data, mirroring the teacher's preference for a flat
/// `match` dispatch over indirection through function pointers for its
/// own builtin instruction set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rand,
    Xor,
    And,
    Or,
    Not,
    Lshift,
    Rshift,
    Drop,
    Swap,
    Dup,
    Over,
    Rot,
    Eq,
    Lt,
    Gt,
    P,
    Emit,
    Cr,
    Debug,
    Var,
    Alloc,
    Dealloc,
    Memread,
    Memwrite,
    Here,
    Line,
    Jump,
    Reljump,
    Catch,
    Endcatch,
    Raise,
    If,
    Macro,
}

impl BuiltinOp {
    /// Number of raw tokens this op consumes from the line *before* it
    /// runs. Only `var` (the variable name) and `macro` (the macro
    /// name) take any -- every other builtin's operands come off the
    /// data stack, not the line.
    pub fn literal_arity(self) -> usize {
        match self {
            BuiltinOp::Var | BuiltinOp::Macro => 1,
            _ => 0,
        }
    }

    /// `if` and `macro` are flow words: their handler captures a
    /// balanced token sequence from the line up to a matching `;`
    /// rather than simply consuming `literal_arity` tokens.
    pub fn is_flow_word(self) -> bool {
        matches!(self, BuiltinOp::If | BuiltinOp::Macro)
    }

    fn name(self) -> &'static str {
        match self {
            BuiltinOp::Add => "add",
            BuiltinOp::Sub => "sub",
            BuiltinOp::Mul => "mul",
            BuiltinOp::Div => "div",
            BuiltinOp::Mod => "mod",
            BuiltinOp::Rand => "rand",
            BuiltinOp::Xor => "xor",
            BuiltinOp::And => "and",
            BuiltinOp::Or => "or",
            BuiltinOp::Not => "not",
            BuiltinOp::Lshift => "lshift",
            BuiltinOp::Rshift => "rshift",
            BuiltinOp::Drop => "drop",
            BuiltinOp::Swap => "swap",
            BuiltinOp::Dup => "dup",
            BuiltinOp::Over => "over",
            BuiltinOp::Rot => "rot",
            BuiltinOp::Eq => "eq",
            BuiltinOp::Lt => "lt",
            BuiltinOp::Gt => "gt",
            BuiltinOp::P => "p",
            BuiltinOp::Emit => "emit",
            BuiltinOp::Cr => "cr",
            BuiltinOp::Debug => "debug",
            BuiltinOp::Var => "var",
            BuiltinOp::Alloc => "alloc",
            BuiltinOp::Dealloc => "dealloc",
            BuiltinOp::Memread => "memread",
            BuiltinOp::Memwrite => "memwrite",
            BuiltinOp::Here => "here",
            BuiltinOp::Line => "line",
            BuiltinOp::Jump => "jump",
            BuiltinOp::Reljump => "reljump",
            BuiltinOp::Catch => "catch",
            BuiltinOp::Endcatch => "endcatch",
            BuiltinOp::Raise => "raise",
            BuiltinOp::If => "if",
            BuiltinOp::Macro => "macro",
        }
    }

    fn all() -> &'static [BuiltinOp] {
        use BuiltinOp::*;
        &[
            Add, Sub, Mul, Div, Mod, Rand, Xor, And, Or, Not, Lshift, Rshift, Drop, Swap, Dup,
            Over, Rot, Eq, Lt, Gt, P, Emit, Cr, Debug, Var, Alloc, Dealloc, Memread, Memwrite,
            Here, Line, Jump, Reljump, Catch, Endcatch, Raise, If, Macro,
        ]
    }
}

/// A host-supplied operation. Receives the VM (to manipulate the
/// stack, memory, or output sink) plus whatever raw literal tokens its
/// arity declared. Returns `None` on success, `Some(kind)` to propagate
/// an error -- the same contract a builtin's dispatch arm honors.
///
/// Grounded on the custom-word pattern in `client.py::Run`, where the
/// host editor registers `drawline`, `recv`, `send`, etc. as literal
/// arity-0 entries touching an external device. Those specific words
/// are out of this core's scope; only the extension point is restored.
pub trait HostWord {
    fn literal_arity(&self) -> usize {
        0
    }

    fn call(&self, vm: &mut Vm, literal_args: &[Token]) -> Option<ErrorKind>;
}

#[derive(Clone)]
pub enum WordEntry {
    Builtin(BuiltinOp),
    Host(Rc<dyn HostWord>),
}

impl WordEntry {
    pub fn literal_arity(&self) -> usize {
        match self {
            WordEntry::Builtin(op) => op.literal_arity(),
            WordEntry::Host(word) => word.literal_arity(),
        }
    }

    pub fn is_flow_word(&self) -> bool {
        matches!(self, WordEntry::Builtin(op) if op.is_flow_word())
    }
}

/// An immutable registry of words, built once and cloned per VM so that
/// later host-side mutations never affect a running VM (spec §5).
#[derive(Clone)]
pub struct WordTable {
    words: HashMap<String, WordEntry>,
}

impl WordTable {
    /// The builtin table alone, with no host extensions.
    pub fn builtin() -> WordTable {
        let mut words = HashMap::new();
        for &op in BuiltinOp::all() {
            words.insert(op.name().to_string(), WordEntry::Builtin(op));
        }
        WordTable { words }
    }

    /// Builtins layered with host-supplied words; a name collision lets
    /// the host shadow a builtin, mirroring the reference VM's
    /// `self.tokens.update(customWords)`.
    pub fn with_host_words(custom: HashMap<String, Rc<dyn HostWord>>) -> WordTable {
        let mut table = Self::builtin();
        for (name, word) in custom {
            table.words.insert(name, WordEntry::Host(word));
        }
        table
    }

    pub fn get(&self, name: &str) -> Option<&WordEntry> {
        self.words.get(name)
    }

    pub fn is_flow_word(&self, name: &str) -> bool {
        self.words.get(name).map(|e| e.is_flow_word()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_registers_every_op_under_its_name() {
        let table = WordTable::builtin();
        assert!(table.get("add").is_some());
        assert!(table.get("macro").is_some());
        assert!(table.get("nonexistent").is_none());
    }

    #[test]
    fn var_and_macro_have_literal_arity_one() {
        assert_eq!(BuiltinOp::Var.literal_arity(), 1);
        assert_eq!(BuiltinOp::Macro.literal_arity(), 1);
        assert_eq!(BuiltinOp::Add.literal_arity(), 0);
    }

    #[test]
    fn if_and_macro_are_flow_words() {
        let table = WordTable::builtin();
        assert!(table.is_flow_word("if"));
        assert!(table.is_flow_word("macro"));
        assert!(!table.is_flow_word("add"));
    }

    struct Echo;
    impl HostWord for Echo {
        fn call(&self, _vm: &mut Vm, _args: &[Token]) -> Option<ErrorKind> {
            None
        }
    }

    #[test]
    fn host_words_can_shadow_builtins() {
        let mut custom: HashMap<String, Rc<dyn HostWord>> = HashMap::new();
        custom.insert("add".to_string(), Rc::new(Echo));
        let table = WordTable::with_host_words(custom);
        assert!(matches!(table.get("add"), Some(WordEntry::Host(_))));
    }
}
