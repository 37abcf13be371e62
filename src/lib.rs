// Froth: a small concatenative, stack-based scripting language core.
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

pub mod config;
pub mod error;
pub mod flow;
pub mod memory;
pub mod sink;
pub mod token;
pub mod vars;
pub mod vm;
pub mod words;

pub use config::Config;
pub use error::{ErrorKind, Result};
pub use sink::{BufferSink, Sink, StdoutSink};
pub use token::Token;
pub use vars::{Variable, VariableMap};
pub use vm::Vm;
pub use words::{BuiltinOp, HostWord, WordEntry, WordTable};
