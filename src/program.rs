use crate::error::Error;
use crate::format::FormatSpec;
use crate::lexer::{self, Token};

/// One compiled operation. Jump targets are relative to the jump itself:
/// execution advances `pc + 1 + delta`, so programs are position
/// independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Emit literal bytes
    Out(Vec<u8>),
    /// Pause output, in tenths of a millisecond
    Delay {
        tenths: u32,
        proportional: bool,
        force: bool,
    },
    /// Pop a value, format it, emit the result
    Print(FormatSpec),
    /// Push parameter 1..=9
    PushParam(u8),
    /// Push a register: lowercase dynamic, uppercase static
    PushVar(u8),
    /// Pop into a register, same case rule
    SetVar(u8),
    Constant(i32),
    /// Pop a string, push its length
    StrLen,
    /// `%i`: make the first two parameters one-based
    ParamInc,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Not,
    Equal,
    Greater,
    Less,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    /// Pop; when zero or the empty string, skip `delta` instructions
    JumpZero(i32),
    Jump(i32),
}

/// A compiled parameterized string, executable any number of times.
#[derive(Debug, Clone, Default)]
pub struct Program {
    code: Vec<Instruction>,
    max_used_param: usize,
}

impl Program {
    /// Compile capability source into linear code with resolved jumps.
    pub fn compile(source: &[u8]) -> Result<Self, Error> {
        let mut tokens = lexer::scan(source)?.into_iter();
        let mut code = Vec::new();
        while let Some(token) = tokens.next() {
            match token {
                Token::Instr(instr) => code.push(instr),
                Token::If => compile_conditional(&mut tokens, &mut code)?,
                Token::Then | Token::Else | Token::EndIf => {
                    return Err(Error::Parse("conditional marker outside %?"));
                }
            }
        }

        let max_used_param = code
            .iter()
            .map(|instr| match instr {
                Instruction::PushParam(n) => usize::from(*n),
                _ => 0,
            })
            .max()
            .unwrap_or(0);

        Ok(Self {
            code,
            max_used_param,
        })
    }

    #[must_use]
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Highest one-based parameter index the program references.
    #[must_use]
    pub fn max_used_param(&self) -> usize {
        self.max_used_param
    }
}

/// Rewrite one `%? … %t … %e … %;` construct into relative jumps.
///
/// Each `%t` becomes a `JumpZero` aimed just past the branch; each `%e`
/// first emits a `Jump` to the end of the construct (queued for patching)
/// and then resolves the preceding `JumpZero` to the instruction after that
/// jump. `%;` resolves the final `JumpZero` (the terminal branch needs no
/// trailing jump) and every queued end jump. Nested constructs recurse.
fn compile_conditional(
    tokens: &mut std::vec::IntoIter<Token>,
    code: &mut Vec<Instruction>,
) -> Result<(), Error> {
    let mut pending_branch: Option<usize> = None;
    let mut end_jumps = Vec::new();
    loop {
        let Some(token) = tokens.next() else {
            return Err(Error::Parse("unexpected end of instructions"));
        };
        match token {
            Token::Instr(instr) => code.push(instr),
            Token::If => compile_conditional(tokens, code)?,
            Token::Then => {
                code.push(Instruction::JumpZero(0));
                pending_branch = Some(code.len() - 1);
            }
            Token::Else => {
                code.push(Instruction::Jump(0));
                end_jumps.push(code.len() - 1);
                if let Some(at) = pending_branch.take() {
                    let target = code.len();
                    patch(code, at, target);
                }
            }
            Token::EndIf => {
                if let Some(at) = pending_branch.take() {
                    let target = code.len();
                    patch(code, at, target);
                }
                for at in end_jumps {
                    let target = code.len();
                    patch(code, at, target);
                }
                return Ok(());
            }
        }
    }
}

fn patch(code: &mut [Instruction], at: usize, target: usize) {
    let delta = (target - at - 1) as i32;
    code[at] = if matches!(code[at], Instruction::JumpZero(_)) {
        Instruction::JumpZero(delta)
    } else {
        Instruction::Jump(delta)
    };
}

#[cfg(test)]
fn assert_jumps_in_range(program: &Program) {
    for (at, instr) in program.code().iter().enumerate() {
        if let Instruction::Jump(delta) | Instruction::JumpZero(delta) = instr {
            let target = at as i32 + 1 + delta;
            assert!(
                target >= 0 && target <= program.code().len() as i32,
                "jump at {at} lands at {target}, outside 0..={}",
                program.code().len()
            );
        }
    }
}

#[test]
fn test_compile_literal() {
    let program = Program::compile(b"\\E[2J").unwrap();
    assert_eq!([Instruction::Out(vec![0x1b, b'[', b'2', b'J'])], program.code());
    assert_eq!(0, program.max_used_param());
}

#[test]
fn test_compile_conditional() {
    let program = Program::compile(b"%?%p1%t yes%e no%;").unwrap();
    assert_eq!(
        [
            Instruction::PushParam(1),
            Instruction::JumpZero(2),
            Instruction::Out(b" yes".to_vec()),
            Instruction::Jump(1),
            Instruction::Out(b" no".to_vec()),
        ],
        program.code()
    );
    assert_jumps_in_range(&program);
}

#[test]
fn test_compile_else_if_chain() {
    let program =
        Program::compile(b"%?%p1%{1}%=%tONE%e%p1%{2}%=%tTWO%eOTHER%;").unwrap();
    assert_jumps_in_range(&program);
    // both end jumps land one past the last instruction
    assert_eq!(Instruction::Jump(7), program.code()[5]);
    assert_eq!(Instruction::Jump(1), program.code()[11]);
}

#[test]
fn test_compile_nested_conditional() {
    let program = Program::compile(b"%?%p1%t%?%p2%ta%eb%;%ec%;").unwrap();
    assert_jumps_in_range(&program);
}

#[test]
fn test_compile_errors() {
    assert!(matches!(
        Program::compile(b"%?%p1%t yes"),
        Err(Error::Parse("unexpected end of instructions"))
    ));
    assert!(matches!(Program::compile(b"abc%;"), Err(Error::Parse(_))));
    assert!(matches!(Program::compile(b"%t"), Err(Error::Parse(_))));
}

#[test]
fn test_max_used_param() {
    assert_eq!(0, Program::compile(b"plain").unwrap().max_used_param());
    assert_eq!(2, Program::compile(b"%p2%p1%+%d").unwrap().max_used_param());
    // %i alone does not force parameters to exist
    assert_eq!(1, Program::compile(b"\\E[%i%p1%dG").unwrap().max_used_param());
}
