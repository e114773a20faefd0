use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex};

use crate::error::Error;
use crate::format::{FormatSpec, PrintFlags};
use crate::program::Instruction;

/// One lexed element of a parameterized string.
///
/// Everything except the four conditional markers maps straight onto a
/// finished [`Instruction`]; the markers are rewritten into jumps by the
/// compiler.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Instr(Instruction),
    If,
    Then,
    Else,
    EndIf,
}

/// The whole `term(5)` parameter language in one pass. Alternatives are
/// ordered so that `%p1`, `%Pa`, `%'c'` and friends win over the generic
/// printf form, and printf (which requires a conversion character) wins
/// over the single-character operators, letting `%+d` and `%+` coexist.
static LEXER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\$<(?P<delay>[0-9]+(?:\.[0-9]*)?)(?P<delay_flags>[*/]{0,2})>",
        r"|%p(?P<param>[1-9])",
        r"|%P(?P<set_var>[A-Za-z])",
        r"|%g(?P<get_var>[A-Za-z])",
        r"|%'(?P<chr>(?:\\[0-7]{1,3}|\\.|\^.|[^'\\^]))'",
        r"|%\{(?P<int>[0-9]+)\}",
        r"|%(?P<flags>:?[-+ #]*)(?P<width>[0-9]+)?(?:\.(?P<precision>[0-9]+))?(?P<conversion>[cdoxXs])",
        r"|%(?P<op>[%il+\-*/m&|^~=><AO!?te;])",
    ))
    .expect("lexer regex is well-formed")
});

/// Lex a capability source string. Spans the regex does not claim are
/// literal output, after escape decoding.
pub(crate) fn scan(source: &[u8]) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in LEXER.captures_iter(source) {
        let matched = caps.get(0).expect("whole-match group always present");
        if matched.start() > last {
            push_literal(&mut tokens, unescape(&source[last..matched.start()]));
        }
        last = matched.end();
        tokens.push(token(&caps)?);
    }
    if last < source.len() {
        push_literal(&mut tokens, unescape(&source[last..]));
    }
    Ok(tokens)
}

fn push_literal(tokens: &mut Vec<Token>, bytes: Vec<u8>) {
    if !bytes.is_empty() {
        tokens.push(Token::Instr(Instruction::Out(bytes)));
    }
}

fn token(caps: &Captures<'_>) -> Result<Token, Error> {
    if let Some(delay) = caps.name("delay") {
        let flags = caps
            .name("delay_flags")
            .map(|m| m.as_bytes())
            .unwrap_or_default();
        if flags.len() == 2 && flags[0] == flags[1] {
            return Err(Error::Parse("repeated delay flag"));
        }
        return Ok(Token::Instr(Instruction::Delay {
            tenths: parse_delay(delay.as_bytes()),
            proportional: flags.contains(&b'*'),
            force: flags.contains(&b'/'),
        }));
    }
    if let Some(param) = caps.name("param") {
        return Ok(Token::Instr(Instruction::PushParam(
            param.as_bytes()[0] - b'0',
        )));
    }
    if let Some(var) = caps.name("set_var") {
        return Ok(Token::Instr(Instruction::SetVar(var.as_bytes()[0])));
    }
    if let Some(var) = caps.name("get_var") {
        return Ok(Token::Instr(Instruction::PushVar(var.as_bytes()[0])));
    }
    if let Some(chr) = caps.name("chr") {
        let bytes = unescape(chr.as_bytes());
        let &[byte] = bytes.as_slice() else {
            return Err(Error::Parse("character constant is not a single byte"));
        };
        return Ok(Token::Instr(Instruction::Constant(i32::from(byte))));
    }
    if let Some(int) = caps.name("int") {
        let value = std::str::from_utf8(int.as_bytes())
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or(Error::Parse("integer constant out of range"))?;
        return Ok(Token::Instr(Instruction::Constant(value)));
    }
    if let Some(conversion) = caps.name("conversion") {
        return Ok(Token::Instr(Instruction::Print(print_spec(
            caps,
            conversion.as_bytes()[0],
        )?)));
    }

    let op = caps.name("op").ok_or(Error::Parse("unrecognized token"))?;
    Ok(match op.as_bytes()[0] {
        b'%' => Token::Instr(Instruction::Out(vec![b'%'])),
        b'i' => Token::Instr(Instruction::ParamInc),
        b'l' => Token::Instr(Instruction::StrLen),
        b'+' => Token::Instr(Instruction::Add),
        b'-' => Token::Instr(Instruction::Sub),
        b'*' => Token::Instr(Instruction::Mul),
        b'/' => Token::Instr(Instruction::Div),
        b'm' => Token::Instr(Instruction::Mod),
        b'&' => Token::Instr(Instruction::And),
        b'|' => Token::Instr(Instruction::Or),
        b'^' => Token::Instr(Instruction::Xor),
        b'~' => Token::Instr(Instruction::Not),
        b'=' => Token::Instr(Instruction::Equal),
        b'>' => Token::Instr(Instruction::Greater),
        b'<' => Token::Instr(Instruction::Less),
        b'A' => Token::Instr(Instruction::LogicalAnd),
        b'O' => Token::Instr(Instruction::LogicalOr),
        b'!' => Token::Instr(Instruction::LogicalNot),
        b'?' => Token::If,
        b't' => Token::Then,
        b'e' => Token::Else,
        b';' => Token::EndIf,
        _ => return Err(Error::Parse("unrecognized operator")),
    })
}

fn print_spec(caps: &Captures<'_>, conversion: u8) -> Result<FormatSpec, Error> {
    let mut flags = PrintFlags::empty();
    if let Some(raw) = caps.name("flags") {
        for &b in raw.as_bytes() {
            flags |= match b {
                b'-' => PrintFlags::LEFT,
                b'+' => PrintFlags::SIGN,
                b' ' => PrintFlags::SPACE,
                b'#' => PrintFlags::ALTERNATE,
                // `:` only shields the flags from being read as operators
                _ => PrintFlags::empty(),
            };
        }
    }

    let mut width = 0;
    if let Some(raw) = caps.name("width") {
        let mut digits = raw.as_bytes();
        if digits[0] == b'0' {
            flags |= PrintFlags::ZERO;
            digits = &digits[1..];
        }
        width = parse_usize(digits)?;
    }
    let precision = match caps.name("precision") {
        Some(raw) => Some(parse_usize(raw.as_bytes())?),
        None => None,
    };

    Ok(FormatSpec {
        conversion,
        flags,
        width,
        precision,
    })
}

fn parse_usize(digits: &[u8]) -> Result<usize, Error> {
    if digits.is_empty() {
        return Ok(0);
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::Parse("field width out of range"))
}

fn parse_delay(digits: &[u8]) -> u32 {
    let text = std::str::from_utf8(digits).unwrap_or("0");
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };
    let ms: u32 = whole.parse().unwrap_or(0);
    let tenth = frac.bytes().next().map_or(0, |d| u32::from(d - b'0'));
    ms.saturating_mul(10).saturating_add(tenth)
}

/// Decode terminfo source escapes into output bytes. Used for literal
/// spans and for `%'c'` character constants.
pub(crate) fn unescape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        i += 1;
        match b {
            b'\\' => {
                let Some(&next) = raw.get(i) else {
                    out.push(b'\\');
                    break;
                };
                i += 1;
                match next {
                    b'0'..=b'7' => {
                        let mut value = u32::from(next - b'0');
                        let mut taken = 1;
                        while taken < 3 {
                            match raw.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    i += 1;
                                    taken += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push(value as u8);
                    }
                    b'E' | b'e' => out.push(0x1b),
                    b'n' => out.extend_from_slice(b"\r\n"),
                    b'l' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b's' => out.push(b' '),
                    // \^ \\ \, \: and any unlisted escape: the char itself
                    other => out.push(other),
                }
            }
            b'^' => {
                let Some(&next) = raw.get(i) else {
                    out.push(b'^');
                    break;
                };
                i += 1;
                out.push(if next == b'?' { 0x7f } else { next & 0x1f });
            }
            other => out.push(other),
        }
    }
    out
}

#[test]
fn test_scan_cursor_move() {
    let tokens = scan(b"\\E[%i%p1%d;%p2%dH").unwrap();
    assert_eq!(
        tokens[..4],
        [
            Token::Instr(Instruction::Out(vec![0x1b, b'['])),
            Token::Instr(Instruction::ParamInc),
            Token::Instr(Instruction::PushParam(1)),
            Token::Instr(Instruction::Print(FormatSpec {
                conversion: b'd',
                flags: PrintFlags::empty(),
                width: 0,
                precision: None,
            })),
        ]
    );
    assert_eq!(Token::Instr(Instruction::Out(vec![b'H'])), tokens[7]);
}

#[test]
fn test_scan_operators_vs_printf() {
    // `%+` with a conversion is printf, without one it is addition
    let tokens = scan(b"%p1%p2%+%d").unwrap();
    assert_eq!(Token::Instr(Instruction::Add), tokens[2]);
    let tokens = scan(b"%p1%:+3d").unwrap();
    let Token::Instr(Instruction::Print(spec)) = &tokens[1] else {
        panic!("expected print token, got {:?}", tokens[1]);
    };
    assert_eq!(PrintFlags::SIGN, spec.flags);
    assert_eq!(3, spec.width);
}

#[test]
fn test_scan_constants_and_vars() {
    let tokens = scan(b"%{1024}%'x'%Pa%ga%gZ").unwrap();
    assert_eq!(
        tokens,
        [
            Token::Instr(Instruction::Constant(1024)),
            Token::Instr(Instruction::Constant(i32::from(b'x'))),
            Token::Instr(Instruction::SetVar(b'a')),
            Token::Instr(Instruction::PushVar(b'a')),
            Token::Instr(Instruction::PushVar(b'Z')),
        ]
    );
    assert!(scan(b"%'\\n'").is_err()); // expands to CR LF, two bytes
}

#[test]
fn test_scan_delay() {
    let tokens = scan(b"$<5>$<20.5*>$<2/>").unwrap();
    assert_eq!(
        tokens,
        [
            Token::Instr(Instruction::Delay {
                tenths: 50,
                proportional: false,
                force: false
            }),
            Token::Instr(Instruction::Delay {
                tenths: 205,
                proportional: true,
                force: false
            }),
            Token::Instr(Instruction::Delay {
                tenths: 20,
                proportional: false,
                force: true
            }),
        ]
    );
    assert!(scan(b"$<5**>").is_err());
}

#[test]
fn test_unescape() {
    assert_eq!(vec![0x1b, b'['], unescape(b"\\E["));
    assert_eq!(vec![0x1b], unescape(b"\\e"));
    assert_eq!(b"\r\n".to_vec(), unescape(b"\\n"));
    assert_eq!(vec![b'\n'], unescape(b"\\l"));
    assert_eq!(vec![0x01], unescape(b"^A"));
    assert_eq!(vec![0x7f], unescape(b"^?"));
    assert_eq!(vec![0o33], unescape(b"\\033"));
    assert_eq!(vec![0xff], unescape(b"\\377"));
    assert_eq!(vec![b' ', b'^', b'\\', b',', b':'], unescape(b"\\s\\^\\\\\\,\\:"));
    // dangling escapes stay literal
    assert_eq!(vec![b'^'], unescape(b"^"));
    assert_eq!(vec![b'\\'], unescape(b"\\"));
}

#[test]
fn test_percent_literal() {
    let tokens = scan(b"100%%").unwrap();
    assert_eq!(
        tokens,
        [
            Token::Instr(Instruction::Out(b"100".to_vec())),
            Token::Instr(Instruction::Out(b"%".to_vec())),
        ]
    );
}
