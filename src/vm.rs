// Froth: virtual machine and driver
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

//! The VM ties together the stack, memory, variable map, word table and
//! catch map, and drives execution one source line at a time through
//! `tick`. This is the direct generalization of the teacher's `VM`
//! struct and `step`/`exec`/`dispatch` trio (`vm.rs` in the teacher
//! crate) from a fixed bytecode ISA to Froth's line-oriented, macro-
//! expanding evaluation model.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use rand::Rng;
use tracing::{debug, trace};

use crate::error::{ErrorKind, Result};
use crate::flow::read_flow;
use crate::memory::Memory;
use crate::sink::Sink;
use crate::token::{tokenize, Token};
use crate::vars::{Variable, VariableMap};
use crate::words::{BuiltinOp, HostWord, WordEntry, WordTable};

/// Default cap on the current-line token buffer. Cyclic macros that
/// never bottom out in a base case grow this buffer without bound;
/// rather than let the process exhaust memory, expansion past this
/// many tokens is treated as a `DepthExceeded` error. The spec reserves
/// this code but leaves the threshold to the implementer.
pub const DEFAULT_MAX_LINE_TOKENS: usize = 65_536;

/// Whether a line ran to clean exhaustion or was abandoned early by a
/// `jump`/`reljump`. The direct generalization of the teacher's
/// `ControlFlow::{Advance, Branch}` split from per-instruction to
/// per-line granularity: the driver uses this to decide whether to
/// advance the program counter itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LineOutcome {
    Exhausted,
    Jumped,
}

pub struct Vm {
    words: WordTable,
    stack: Vec<i64>,
    memory: Memory,
    vars: VariableMap,
    catch_map: HashMap<i64, i64>,
    lines: Vec<String>,
    pc: i64,
    started: bool,
    sink: Box<dyn Sink>,
    max_line_tokens: usize,
}

impl Vm {
    /// Construct a VM over `source`, writing program output to `sink`.
    /// `custom_words` layers host-supplied operations atop the
    /// builtins (§5: the table is copied here and never mutated again).
    pub fn new(
        source: &str,
        sink: Box<dyn Sink>,
        custom_words: HashMap<String, Rc<dyn HostWord>>,
    ) -> Vm {
        Vm {
            words: WordTable::with_host_words(custom_words),
            stack: Vec::new(),
            memory: Memory::new(),
            vars: VariableMap::new(),
            catch_map: HashMap::new(),
            lines: source.split('\n').map(str::to_string).collect(),
            pc: -1,
            started: false,
            sink,
            max_line_tokens: DEFAULT_MAX_LINE_TOKENS,
        }
    }

    pub fn with_max_line_tokens(mut self, max: usize) -> Vm {
        self.max_line_tokens = max;
        self
    }

    /// Extend memory by `n` zero cells before the program's first line
    /// runs, for hosts that want a program to start with a working area
    /// already allocated (`Config::initial_memory`).
    pub fn preallocate(&mut self, n: i64) {
        self.memory.alloc(n);
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn memory(&self) -> &[i64] {
        self.memory.as_slice()
    }

    pub fn variables(&self) -> &VariableMap {
        &self.vars
    }

    pub fn pc(&self) -> i64 {
        self.pc
    }

    /// Push a value onto the operand stack. The write half of the
    /// `HostWord` contract: a host handler reports its result this way,
    /// the same as any builtin's dispatch arm.
    pub fn push(&mut self, v: i64) {
        self.stack.push(v);
    }

    /// Pop a value off the operand stack, `StackUnderflow` if it's
    /// empty. The read half of the `HostWord` contract: a host handler
    /// takes its operands this way, the same as any builtin's dispatch
    /// arm.
    pub fn pop(&mut self) -> Result<i64> {
        self.stack.pop().ok_or(ErrorKind::StackUnderflow)
    }

    /// The output sink, so a host word can write to it (§6: "may call
    /// into the output sink").
    pub fn sink_mut(&mut self) -> &mut dyn Sink {
        self.sink.as_mut()
    }

    /// Run to completion, the direct analogue of the teacher's `exec`
    /// looping `step` until a non-`Advance` result.
    pub fn run_until_end(&mut self) -> ErrorKind {
        loop {
            let kind = self.tick();
            if !kind.is_success() {
                return kind;
            }
        }
    }

    /// Advance at most one source line.
    pub fn tick(&mut self) -> ErrorKind {
        // The constructor seeds `pc` at -1 so the very first tick lands
        // on line 0; that happens exactly once. A negative `pc` at any
        // later tick is a real out-of-range program counter (e.g. `0
        // jump`, or a `reljump` back past the first line) and must end
        // the program, not silently restart it.
        if !self.started {
            self.started = true;
            self.pc = 0;
        }
        if self.pc < 0 || self.pc as usize >= self.lines.len() {
            return ErrorKind::EndOfProgram;
        }

        let line_text = self.lines[self.pc as usize].trim().to_string();
        trace!(pc = self.pc, line = %line_text, "tick");

        if line_text.is_empty() || line_text.starts_with('#') {
            self.pc += 1;
            return ErrorKind::Success;
        }

        let tokens = match tokenize(&line_text) {
            Ok(tokens) => tokens,
            Err(kind) => return self.handle_line_result(Err(kind)),
        };

        let mut current_line: VecDeque<Token> = tokens.into_iter().collect();
        let result = self.evaluate_line(&mut current_line);
        self.handle_line_result(result)
    }

    /// Apply the catch map to a line's result and decide whether the
    /// driver should advance the program counter itself.
    fn handle_line_result(&mut self, result: Result<LineOutcome>) -> ErrorKind {
        match result {
            Ok(LineOutcome::Exhausted) => {
                self.pc += 1;
                ErrorKind::Success
            }
            Ok(LineOutcome::Jumped) => ErrorKind::Success,
            Err(kind) => {
                if let Some(&target) = self.catch_map.get(&kind.code()) {
                    debug!(error = %kind, target, "caught");
                    if target >= 0 {
                        self.pc = target;
                    } else {
                        self.pc += 1;
                    }
                    ErrorKind::Success
                } else {
                    kind
                }
            }
        }
    }

    /// Evaluate the current line front-to-back, dispatching each token
    /// to a builtin handler, host word, variable substitution, macro
    /// expansion, or integer push.
    fn evaluate_line(&mut self, line: &mut VecDeque<Token>) -> Result<LineOutcome> {
        while let Some(token) = line.pop_front() {
            match token {
                Token::Integer(v) => self.stack.push(v),
                Token::Word(name) => {
                    if let Some(entry) = self.words.get(&name).cloned() {
                        let arity = entry.literal_arity();
                        let mut literal_args = Vec::with_capacity(arity);
                        for _ in 0..arity {
                            literal_args.push(line.pop_front().ok_or(ErrorKind::EndOfLine)?);
                        }

                        match entry {
                            WordEntry::Builtin(op) => {
                                if let Some(outcome) =
                                    self.dispatch(op, &literal_args, line)?
                                {
                                    return Ok(outcome);
                                }
                            }
                            WordEntry::Host(word) => {
                                if let Some(kind) = word.call(self, &literal_args) {
                                    return Err(kind);
                                }
                            }
                        }
                    } else {
                        self.lookup(&name, line)?;
                    }
                }
            }
        }
        Ok(LineOutcome::Exhausted)
    }

    /// §4.6: a word absent from the word table is either a bound
    /// variable (pushed), a macro (inlined), or unknown.
    fn lookup(&mut self, name: &str, line: &mut VecDeque<Token>) -> Result<()> {
        match self.vars.get(name).cloned() {
            Some(Variable::Value(v)) => {
                self.stack.push(v);
                Ok(())
            }
            Some(Variable::Macro(body)) => self.prepend(line, body),
            None => Err(ErrorKind::UnknownWord),
        }
    }

    /// Prepend a token sequence to the front of the current line,
    /// guarding against runaway macro/conditional expansion.
    fn prepend(&self, line: &mut VecDeque<Token>, body: Vec<Token>) -> Result<()> {
        if line.len() + body.len() > self.max_line_tokens {
            return Err(ErrorKind::DepthExceeded);
        }
        for token in body.into_iter().rev() {
            line.push_front(token);
        }
        Ok(())
    }

    /// Pop two values; returns `(deeper, shallower)` i.e. `(a, b)` for
    /// a line written `a b op`.
    fn pop2(&mut self) -> Result<(i64, i64)> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    fn peek_at(&self, depth_from_top: usize) -> Result<i64> {
        let len = self.stack.len();
        if depth_from_top >= len {
            return Err(ErrorKind::StackUnderflow);
        }
        Ok(self.stack[len - 1 - depth_from_top])
    }

    /// Dispatch table for builtin operations, the generalization of the
    /// teacher's `dispatch` match over `Opcode`. Returns `Ok(Some(_))`
    /// when the line must stop evaluating immediately (a jump), `Ok(None)`
    /// to keep consuming the line, or `Err` to propagate a failure.
    fn dispatch(
        &mut self,
        op: BuiltinOp,
        literal_args: &[Token],
        line: &mut VecDeque<Token>,
    ) -> Result<Option<LineOutcome>> {
        use BuiltinOp::*;
        match op {
            Add => {
                let (a, b) = self.pop2()?;
                self.stack.push(a + b);
            }
            Sub => {
                let (a, b) = self.pop2()?;
                self.stack.push(a - b);
            }
            Mul => {
                let (a, b) = self.pop2()?;
                self.stack.push(a * b);
            }
            Div => {
                let (a, b) = self.pop2()?;
                if b == 0 {
                    return Err(ErrorKind::DivideByZero);
                }
                self.stack.push(floor_div(a, b));
            }
            Mod => {
                let (a, b) = self.pop2()?;
                if b == 0 {
                    return Err(ErrorKind::DivideByZero);
                }
                self.stack.push(floor_mod(a, b));
            }
            Rand => {
                let n = self.pop()?;
                let r = if n > 0 {
                    rand::thread_rng().gen_range(0..n)
                } else {
                    0
                };
                self.stack.push(r);
            }
            Xor => {
                let (a, b) = self.pop2()?;
                self.stack.push(a ^ b);
            }
            And => {
                let (a, b) = self.pop2()?;
                self.stack.push(a & b);
            }
            Or => {
                let (a, b) = self.pop2()?;
                self.stack.push(a | b);
            }
            Not => {
                let a = self.pop()?;
                self.stack.push(!a);
            }
            Lshift => {
                let (bits, amount) = self.pop2()?;
                self.stack.push(bits.wrapping_shl(amount as u32));
            }
            Rshift => {
                let (bits, amount) = self.pop2()?;
                self.stack.push(bits.wrapping_shr(amount as u32));
            }
            Drop => {
                self.pop()?;
            }
            Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(b);
                self.stack.push(a);
            }
            Dup => {
                let top = self.peek_at(0)?;
                self.stack.push(top);
            }
            Over => {
                let second = self.peek_at(1)?;
                self.stack.push(second);
            }
            Rot => {
                let c = self.pop()?;
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(c);
                self.stack.push(a);
                self.stack.push(b);
            }
            Eq => {
                let (a, b) = self.pop2()?;
                self.stack.push(bool_to_value(a == b));
            }
            Lt => {
                let (a, b) = self.pop2()?;
                self.stack.push(bool_to_value(a < b));
            }
            Gt => {
                let (a, b) = self.pop2()?;
                self.stack.push(bool_to_value(a > b));
            }
            P => {
                let v = self.pop()?;
                self.sink.write(&v.to_string());
                self.sink.flush();
            }
            Emit => {
                let v = self.pop()?;
                let ch = char::from_u32(v as u32).unwrap_or('\u{FFFD}');
                let mut buf = [0u8; 4];
                self.sink.write(ch.encode_utf8(&mut buf));
                self.sink.flush();
            }
            Cr => {
                self.sink.write("\n");
                self.sink.flush();
            }
            Debug => {
                let line = format!(
                    "[DEBUG] pc = {} | stack = {:?} | variables = {:?}\n",
                    self.pc, self.stack, self.vars
                );
                self.sink.write(&line);
                self.sink.flush();
            }
            Var => {
                let name = literal_name(&literal_args[0]);
                let value = self.pop()?;
                self.vars.set_value(name, value);
            }
            Alloc => {
                let n = self.pop()?;
                self.memory.alloc(n);
            }
            Dealloc => {
                let n = self.pop()?;
                self.memory.dealloc(n);
            }
            Memread => {
                let p = self.pop()?;
                self.stack.push(self.memory.read(p)?);
            }
            Memwrite => {
                let data = self.pop()?;
                let address = self.pop()?;
                self.memory.write(address, data)?;
            }
            Here => {
                self.stack.push(self.memory.here());
            }
            Line => {
                self.stack.push(self.pc + 1);
            }
            Jump => {
                let n = self.pop()?;
                self.pc = n - 1;
                return Ok(Some(LineOutcome::Jumped));
            }
            Reljump => {
                let n = self.pop()?;
                self.pc += n;
                return Ok(Some(LineOutcome::Jumped));
            }
            Catch => {
                let handler = self.pop()?;
                let errno = self.pop()?;
                self.catch_map.insert(errno, handler);
            }
            Endcatch => {
                let errno = self.pop()?;
                self.catch_map.remove(&errno);
            }
            Raise => {
                let n = self.pop()?;
                return Err(ErrorKind::UserError(n));
            }
            If => {
                let sequence = read_flow(line, &self.words)?;
                let predicate = self.pop()?;
                if predicate != 0 {
                    self.prepend(line, sequence)?;
                }
            }
            Macro => {
                let name = literal_name(&literal_args[0]);
                let sequence = read_flow(line, &self.words)?;
                self.vars.set_macro(name, sequence);
            }
        }
        Ok(None)
    }
}

fn literal_name(token: &Token) -> String {
    match token {
        Token::Word(w) => w.clone(),
        Token::Integer(v) => v.to_string(),
    }
}

fn bool_to_value(b: bool) -> i64 {
    if b {
        -1
    } else {
        0
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::BufferSink;

    fn run(source: &str) -> (ErrorKind, Vec<i64>) {
        let mut vm = Vm::new(source, Box::new(BufferSink::new()), HashMap::new());
        let kind = vm.run_until_end();
        (kind, vm.stack().to_vec())
    }

    #[test]
    fn scenario_basic_arithmetic() {
        let (kind, stack) = run("1 1 1\n1 2 add\n3 2 sub");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![1, 1, 1, 3, 1]);
    }

    #[test]
    fn scenario_macro() {
        let (kind, stack) = run("macro two 1 1 add ; 1\ntwo");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![1, 2]);
    }

    #[test]
    fn scenario_jump_and_reljump() {
        let (kind, stack) = run("3 jump\n1234\n67\n2 reljump\n89");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![67]);
    }

    #[test]
    fn scenario_if() {
        let (kind, stack) = run("0 if 58 ; 2\n1 if 2 reljump ; 5\n6");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![2]);
    }

    #[test]
    fn scenario_memory() {
        let (kind, stack) = run("10 alloc\n5 85 memwrite\n5 memread\nhere\n5 dealloc\nhere");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![85, 10, 5]);
    }

    #[test]
    fn scenario_string_literal() {
        let (kind, stack) = run("\"Hello World!\"");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(
            stack,
            vec![33, 100, 108, 114, 111, 87, 32, 111, 108, 108, 101, 72, 12]
        );
    }

    #[test]
    fn scenario_raise_and_catch() {
        let (kind, stack) = run("34 -1 catch\n34 raise\n34 endcatch\n35 raise");
        assert_eq!(kind, ErrorKind::UserError(35));
        assert!(stack.is_empty());
    }

    #[test]
    fn string_then_emit_round_trips_in_source_order() {
        let mut vm = Vm::new(
            "\"ABC\"\ndrop\nemit\nemit\nemit",
            Box::new(BufferSink::new()),
            HashMap::new(),
        );
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::EndOfProgram);
    }

    #[test]
    fn division_and_modulo_floor_toward_negative_infinity() {
        let (_, stack) = run("-7 2 div\n-7 2 mod");
        assert_eq!(stack, vec![-4, 1]);
    }

    #[test]
    fn divide_by_zero_is_recoverable_via_catch() {
        let (kind, stack) = run("8 -1 catch\n1 0 div\n2");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![2]);
    }

    #[test]
    fn unknown_word_halts_with_unknown_word() {
        let (kind, _) = run("totally_not_a_word");
        assert_eq!(kind, ErrorKind::UnknownWord);
    }

    #[test]
    fn stack_underflow_is_reported() {
        let (kind, _) = run("add");
        assert_eq!(kind, ErrorKind::StackUnderflow);
    }

    #[test]
    fn comment_only_line_is_skipped() {
        let (kind, stack) = run("# just a comment\n1 2 add");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![3]);
    }

    #[test]
    fn blank_lines_advance_without_effect() {
        let (kind, stack) = run("\n\n1");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![1]);
    }

    struct Echo(i64);
    impl HostWord for Echo {
        fn call(&self, vm: &mut Vm, _args: &[Token]) -> Option<ErrorKind> {
            vm.push(self.0);
            None
        }
    }

    #[test]
    fn host_words_are_reachable_from_source() {
        let mut custom: HashMap<String, Rc<dyn HostWord>> = HashMap::new();
        custom.insert("fortytwo".to_string(), Rc::new(Echo(42)));
        let mut vm = Vm::new("fortytwo", Box::new(BufferSink::new()), custom);
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(vm.stack(), &[42]);
    }

    #[test]
    fn cyclic_macro_hits_depth_exceeded() {
        let mut vm = Vm::new("macro loop loop ;\nloop", Box::new(BufferSink::new()), HashMap::new())
            .with_max_line_tokens(64);
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::DepthExceeded);
    }

    /// An external host word using only `Vm`'s public surface -- `pop`,
    /// `push`, `sink_mut` -- never the private `stack` field.
    struct Double;
    impl HostWord for Double {
        fn call(&self, vm: &mut Vm, _args: &[Token]) -> Option<ErrorKind> {
            match vm.pop() {
                Ok(v) => {
                    vm.push(v * 2);
                    None
                }
                Err(kind) => Some(kind),
            }
        }
    }

    struct Say;
    impl HostWord for Say {
        fn call(&self, vm: &mut Vm, _args: &[Token]) -> Option<ErrorKind> {
            vm.sink_mut().write("hi");
            vm.sink_mut().flush();
            None
        }
    }

    #[test]
    fn host_word_pops_and_pushes_through_the_public_stack_api() {
        let mut custom: HashMap<String, Rc<dyn HostWord>> = HashMap::new();
        custom.insert("double".to_string(), Rc::new(Double));
        let mut vm = Vm::new("21 double", Box::new(BufferSink::new()), custom);
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(vm.stack(), &[42]);
    }

    #[test]
    fn host_word_underflow_propagates_as_stack_underflow() {
        let mut custom: HashMap<String, Rc<dyn HostWord>> = HashMap::new();
        custom.insert("double".to_string(), Rc::new(Double));
        let mut vm = Vm::new("double", Box::new(BufferSink::new()), custom);
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::StackUnderflow);
    }

    #[test]
    fn host_word_writes_through_the_public_sink_api() {
        let mut custom: HashMap<String, Rc<dyn HostWord>> = HashMap::new();
        custom.insert("say".to_string(), Rc::new(Say));
        let mut vm = Vm::new("say", Box::new(BufferSink::new()), custom);
        let kind = vm.run_until_end();
        assert_eq!(kind, ErrorKind::EndOfProgram);
    }

    #[test]
    fn zero_jump_ends_the_program_instead_of_looping() {
        let (kind, stack) = run("0 jump");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, Vec::<i64>::new());
    }

    #[test]
    fn reljump_past_the_first_line_ends_the_program() {
        let (kind, stack) = run("1 -5 reljump\n99");
        assert_eq!(kind, ErrorKind::EndOfProgram);
        assert_eq!(stack, vec![1]);
    }
}
