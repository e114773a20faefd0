use std::fmt;
use std::time::{Duration, Instant};

use crate::entry::Entry;
use crate::error::Error;
use crate::format;
use crate::program::{Instruction, Program};

const REGISTERS: usize = 26;
const PARAM_SLOTS: usize = 9;

/// A runtime value: the stack, the parameter slots, and both register
/// files hold integers or byte strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Str(Vec<u8>),
}

impl Value {
    /// Zero and the empty string are false, everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Int(n) => *n != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Str(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Str(bytes.to_vec())
    }
}

fn zeroed<const N: usize>() -> [Value; N] {
    std::array::from_fn(|_| Value::Int(0))
}

/// Execution context for one terminal.
///
/// The static registers `A..Z` live here so they persist across every
/// program run against the same terminal. Delays honor `direct_output` /
/// `disable_delays` and busy-wait unless a hook replaces the wait.
pub struct Terminal {
    entry: Entry,
    pub direct_output: bool,
    pub disable_delays: bool,
    static_vars: [Value; REGISTERS],
    delay_hook: Option<Box<dyn FnMut(Duration)>>,
}

impl Terminal {
    pub fn new(entry: Entry) -> Self {
        Self {
            entry,
            direct_output: false,
            disable_delays: false,
            static_vars: zeroed(),
            delay_hook: None,
        }
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Replace the busy-wait behind `$<…>` delays, e.g. with a real sleep
    /// or an emitter of pad bytes.
    pub fn set_delay_hook(&mut self, hook: impl FnMut(Duration) + 'static) {
        self.delay_hook = Some(Box::new(hook));
    }

    /// Compile and run the named string capability in one step.
    pub fn expand(
        &mut self,
        name: &str,
        affected_lines: u32,
        params: &[Value],
    ) -> Result<Vec<u8>, Error> {
        let source = self
            .entry
            .string(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?
            .to_vec();
        Program::compile(&source)?.exec(self, affected_lines, params)
    }

    fn delay(&mut self, duration: Duration) {
        match &mut self.delay_hook {
            Some(hook) => hook(duration),
            None => {
                // no termios access here, so pacing is a plain spin
                let end = Instant::now() + duration;
                while Instant::now() < end {
                    std::hint::spin_loop();
                }
            }
        }
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("entry", &self.entry.names().brief())
            .field("direct_output", &self.direct_output)
            .field("disable_delays", &self.disable_delays)
            .field("static_vars", &self.static_vars)
            .field("delay_hook", &self.delay_hook.is_some())
            .finish()
    }
}

impl Program {
    /// Run to completion against `terminal` and return the emitted bytes.
    pub fn exec(
        &self,
        terminal: &mut Terminal,
        affected_lines: u32,
        params: &[Value],
    ) -> Result<Vec<u8>, Error> {
        let mut run = self.begin(terminal, affected_lines, params)?;
        while !run.done() {
            run.step()?;
        }
        Ok(run.into_output())
    }

    /// Start a cooperative execution; drive it with [`Run::step`].
    ///
    /// The mutable borrow of `terminal` keeps a second execution from
    /// touching the shared static registers until this one is finished.
    pub fn begin<'prog, 'term>(
        &'prog self,
        terminal: &'term mut Terminal,
        affected_lines: u32,
        params: &[Value],
    ) -> Result<Run<'prog, 'term>, Error> {
        if params.len() < self.max_used_param() {
            return Err(Error::Range {
                needed: self.max_used_param(),
                got: params.len(),
            });
        }
        let mut seed: [Value; PARAM_SLOTS] = zeroed();
        for (slot, param) in seed.iter_mut().zip(params) {
            *slot = param.clone();
        }
        let done = self.code().is_empty();
        Ok(Run {
            program: self,
            terminal,
            affected_lines,
            params: seed.clone(),
            seed,
            dynamic_vars: zeroed(),
            stack: Vec::new(),
            pc: 0,
            output: Vec::new(),
            done,
        })
    }
}

/// One execution of a [`Program`]: value stack, program counter, the nine
/// parameter slots, the dynamic registers `a..z`, and the output buffer.
pub struct Run<'prog, 'term> {
    program: &'prog Program,
    terminal: &'term mut Terminal,
    affected_lines: u32,
    seed: [Value; PARAM_SLOTS],
    params: [Value; PARAM_SLOTS],
    dynamic_vars: [Value; REGISTERS],
    stack: Vec<Value>,
    pc: usize,
    output: Vec<u8>,
    done: bool,
}

impl Run<'_, '_> {
    #[must_use]
    pub fn done(&self) -> bool {
        self.done
    }

    /// Bytes produced so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    #[must_use]
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Rewind to the state right after `begin`. Static registers are
    /// terminal state and are deliberately left alone.
    pub fn reset(&mut self) {
        self.params = self.seed.clone();
        self.dynamic_vars = zeroed();
        self.stack.clear();
        self.output.clear();
        self.pc = 0;
        self.done = self.program.code().is_empty();
    }

    /// Execute one instruction. Returns `true` while more remain.
    pub fn step(&mut self) -> Result<bool, Error> {
        let program = self.program;
        let Some(instr) = program.code().get(self.pc) else {
            self.done = true;
            return Ok(false);
        };

        let mut jump = 0i32;
        match instr {
            Instruction::Out(bytes) => self.output.extend_from_slice(bytes),
            Instruction::Delay {
                tenths,
                proportional,
                force,
            } => {
                if self.terminal.direct_output && (!self.terminal.disable_delays || *force) {
                    let mut tenths = u64::from(*tenths);
                    if *proportional {
                        tenths = tenths.saturating_mul(u64::from(self.affected_lines));
                    }
                    self.terminal
                        .delay(Duration::from_micros(tenths.saturating_mul(100)));
                }
            }
            Instruction::Print(spec) => {
                let value = self.pop()?;
                let bytes = format::format(spec, &value)?;
                self.output.extend_from_slice(&bytes);
            }
            Instruction::PushParam(n) => {
                let value = self.params[usize::from(*n) - 1].clone();
                self.stack.push(value);
            }
            Instruction::PushVar(name) => {
                let value = self.var(*name).clone();
                self.stack.push(value);
            }
            Instruction::SetVar(name) => {
                let value = self.pop()?;
                *self.var_mut(*name) = value;
            }
            Instruction::Constant(v) => self.stack.push(Value::Int(*v)),
            Instruction::StrLen => {
                let s = self.pop_str()?;
                self.stack.push(Value::Int(s.len() as i32));
            }
            Instruction::ParamInc => {
                for slot in &mut self.params[..2] {
                    if let Value::Int(n) = slot {
                        *n = n.wrapping_add(1);
                    }
                }
            }
            Instruction::Add => self.binary(|a, b| a.wrapping_add(b))?,
            Instruction::Sub => self.binary(|a, b| a.wrapping_sub(b))?,
            Instruction::Mul => self.binary(|a, b| a.wrapping_mul(b))?,
            Instruction::Div => self.binary(floor_div)?,
            Instruction::Mod => self.binary(|a, b| if b == 0 { 0 } else { a.wrapping_rem(b) })?,
            Instruction::And => self.binary(|a, b| a & b)?,
            Instruction::Or => self.binary(|a, b| a | b)?,
            Instruction::Xor => self.binary(|a, b| a ^ b)?,
            Instruction::Not => {
                let a = self.pop_int()?;
                self.stack.push(Value::Int(!a));
            }
            Instruction::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(Value::Int(i32::from(a == b)));
            }
            Instruction::Greater => self.binary(|a, b| i32::from(a > b))?,
            Instruction::Less => self.binary(|a, b| i32::from(a < b))?,
            Instruction::LogicalAnd => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(Value::Int(i32::from(a.truthy() && b.truthy())));
            }
            Instruction::LogicalOr => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(Value::Int(i32::from(a.truthy() || b.truthy())));
            }
            Instruction::LogicalNot => {
                let a = self.pop()?;
                self.stack.push(Value::Int(i32::from(!a.truthy())));
            }
            Instruction::JumpZero(delta) => {
                let value = self.pop()?;
                if !value.truthy() {
                    jump = *delta;
                }
            }
            Instruction::Jump(delta) => jump = *delta,
        }

        let next = self.pc as i32 + 1 + jump;
        self.pc = next.max(0) as usize;
        if self.pc >= program.code().len() {
            self.done = true;
        }
        Ok(!self.done)
    }

    fn var(&self, name: u8) -> &Value {
        if name.is_ascii_lowercase() {
            &self.dynamic_vars[usize::from(name - b'a')]
        } else {
            &self.terminal.static_vars[usize::from(name - b'A')]
        }
    }

    fn var_mut(&mut self, name: u8) -> &mut Value {
        if name.is_ascii_lowercase() {
            &mut self.dynamic_vars[usize::from(name - b'a')]
        } else {
            &mut self.terminal.static_vars[usize::from(name - b'A')]
        }
    }

    fn pop(&mut self) -> Result<Value, Error> {
        self.stack.pop().ok_or(Error::Runtime("stack exhausted"))
    }

    fn pop_int(&mut self) -> Result<i32, Error> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            Value::Str(_) => Err(Error::Type("expected a number on the stack")),
        }
    }

    fn pop_str(&mut self) -> Result<Vec<u8>, Error> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            Value::Int(_) => Err(Error::Type("expected a string on the stack")),
        }
    }

    fn binary(&mut self, op: impl Fn(i32, i32) -> i32) -> Result<(), Error> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.stack.push(Value::Int(op(a, b)));
        Ok(())
    }
}

/// `%/` rounds toward negative infinity; division by zero yields 0 the way
/// ncurses does rather than failing the whole expansion.
fn floor_div(a: i32, b: i32) -> i32 {
    if b == 0 {
        return 0;
    }
    let q = a.wrapping_div(b);
    let r = a.wrapping_rem(b);
    if r != 0 && (a < 0) != (b < 0) { q - 1 } else { q }
}

#[test]
fn test_floor_div() {
    assert_eq!(3, floor_div(7, 2));
    assert_eq!(-4, floor_div(-7, 2));
    assert_eq!(-4, floor_div(7, -2));
    assert_eq!(3, floor_div(-7, -2));
    assert_eq!(0, floor_div(5, 0));
}

#[test]
fn test_stack_exhausted() {
    let mut term = Terminal::new(Entry::default());
    let program = Program::compile(b"%d").unwrap();
    assert!(matches!(
        program.exec(&mut term, 1, &[]),
        Err(Error::Runtime("stack exhausted"))
    ));
}

#[test]
fn test_too_few_params() {
    let mut term = Terminal::new(Entry::default());
    let program = Program::compile(b"%p3%d").unwrap();
    assert!(matches!(
        program.exec(&mut term, 1, &[Value::Int(1)]),
        Err(Error::Range { needed: 3, got: 1 })
    ));
}
