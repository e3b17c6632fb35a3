//! Includes all the code for reading a NASM listing and turning it into
//! ops the thread can execute. Only the subset rkiln emits is understood

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Reg {
    Rax,
    Rbx,
    Rdx,
    Rdi,
    Rsp,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    /// QWORD [rsp + offset], offset in bytes
    Stack(usize),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Op {
    Mov(Operand, Operand),
    Push(Operand),
    Pop(Reg),
    Add(Reg, Operand),
    Sub(Reg, Operand),
    IMul(Reg, Operand),
    Cqo,
    IDiv(Reg),
    Test(Reg, Reg),
    JumpZero(String),
    Jump(String),
    Label(String),
    Syscall,
}

/// line numbers are 1-based, counted in the listing
#[derive(PartialEq, Eq, Debug)]
pub enum ReadError {
    UnknownInstruction(String, usize),
    BadOperand(String, usize),
    OperandCount(String, usize, usize),
}
impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ReadError::UnknownInstruction(what, line) => {
                write!(f, "unknown instruction `{}` on line {}", what, line)
            }
            ReadError::BadOperand(what, line) => {
                write!(f, "bad operand `{}` on line {}", what, line)
            }
            ReadError::OperandCount(what, count, line) => write!(
                f,
                "`{}` given {} operands on line {}",
                what, count, line
            ),
        }
    }
}
impl std::error::Error for ReadError {}

type Result<T> = std::result::Result<T, ReadError>;

fn reg(text: &str, line: usize) -> Result<Reg> {
    match text {
        "rax" => Ok(Reg::Rax),
        "rbx" => Ok(Reg::Rbx),
        "rdx" => Ok(Reg::Rdx),
        "rdi" => Ok(Reg::Rdi),
        "rsp" => Ok(Reg::Rsp),
        _ => Err(ReadError::BadOperand(text.to_string(), line)),
    }
}

fn operand(text: &str, line: usize) -> Result<Operand> {
    let bad = || ReadError::BadOperand(text.to_string(), line);
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Operand::Imm(value));
    }
    let address = text.strip_prefix("QWORD").unwrap_or(text).trim();
    if let Some(inner) = address
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let mut parts = inner.split('+').map(str::trim);
        if parts.next() != Some("rsp") {
            return Err(bad());
        }
        return match (parts.next(), parts.next()) {
            (None, _) => Ok(Operand::Stack(0)),
            (Some(offset), None) => offset.parse().map(Operand::Stack).map_err(|_| bad()),
            _ => Err(bad()),
        };
    }
    reg(text, line).map(Operand::Reg)
}

fn label(text: &str, line: usize) -> Result<String> {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(text.to_string())
    } else {
        Err(ReadError::BadOperand(text.to_string(), line))
    }
}

fn read_line(code: &str, line: usize) -> Result<Option<Op>> {
    if let Some(name) = code.strip_suffix(':') {
        return label(name, line).map(|name| Some(Op::Label(name)));
    }
    let (mnemonic, rest) = match code.find(char::is_whitespace) {
        Some(at) => (&code[..at], code[at..].trim()),
        None => (code, ""),
    };
    let args: Vec<&str> = if rest.is_empty() {
        vec![]
    } else {
        rest.split(',').map(str::trim).collect()
    };
    let expect = |count: usize| {
        if args.len() == count {
            Ok(())
        } else {
            Err(ReadError::OperandCount(mnemonic.to_string(), args.len(), line))
        }
    };
    let op = match mnemonic {
        "global" => {
            expect(1)?;
            return Ok(None);
        }
        "mov" => {
            expect(2)?;
            Op::Mov(operand(args[0], line)?, operand(args[1], line)?)
        }
        "push" => {
            expect(1)?;
            Op::Push(operand(args[0], line)?)
        }
        "pop" => {
            expect(1)?;
            Op::Pop(reg(args[0], line)?)
        }
        "add" => {
            expect(2)?;
            Op::Add(reg(args[0], line)?, operand(args[1], line)?)
        }
        "sub" => {
            expect(2)?;
            Op::Sub(reg(args[0], line)?, operand(args[1], line)?)
        }
        "imul" => {
            expect(2)?;
            Op::IMul(reg(args[0], line)?, operand(args[1], line)?)
        }
        "cqo" => {
            expect(0)?;
            Op::Cqo
        }
        "idiv" => {
            expect(1)?;
            Op::IDiv(reg(args[0], line)?)
        }
        "test" => {
            expect(2)?;
            Op::Test(reg(args[0], line)?, reg(args[1], line)?)
        }
        "jz" => {
            expect(1)?;
            Op::JumpZero(label(args[0], line)?)
        }
        "jmp" => {
            expect(1)?;
            Op::Jump(label(args[0], line)?)
        }
        "syscall" => {
            expect(0)?;
            Op::Syscall
        }
        _ => return Err(ReadError::UnknownInstruction(mnemonic.to_string(), line)),
    };
    Ok(Some(op))
}

/// Reads a whole listing. Blank lines, comments and directives produce no ops
pub fn read(text: &str) -> Result<Vec<Op>> {
    let mut ops = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let code = match raw.find(';') {
            Some(comment) => &raw[..comment],
            None => raw,
        }
        .trim();
        if code.is_empty() {
            continue;
        }
        if let Some(op) = read_line(code, i + 1)? {
            trace!("{}: {:?}", i + 1, op);
            ops.push(op);
        }
    }
    debug!("read {} ops", ops.len());
    Ok(ops)
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn operands() {
        assert_eq!(operand("rax", 1), Ok(Operand::Reg(Reg::Rax)));
        assert_eq!(operand("-12", 1), Ok(Operand::Imm(-12)));
        assert_eq!(operand("QWORD [rsp]", 1), Ok(Operand::Stack(0)));
        assert_eq!(operand("QWORD [rsp + 16]", 1), Ok(Operand::Stack(16)));
        assert_eq!(operand("[rsp+8]", 1), Ok(Operand::Stack(8)));
        assert_eq!(
            operand("QWORD [rbp + 8]", 3),
            Err(ReadError::BadOperand("QWORD [rbp + 8]".to_string(), 3))
        );
        assert_eq!(
            operand("rcx", 2),
            Err(ReadError::BadOperand("rcx".to_string(), 2))
        );
    }
    #[test]
    fn listing() {
        let text = "global _start\n_start:\n    mov rax, 60 ; exit\n\n    pop rdi\nlabel0:\n    jz label0\n    syscall\n";
        assert_eq!(
            read(text),
            Ok(vec![
                Op::Label("_start".to_string()),
                Op::Mov(Operand::Reg(Reg::Rax), Operand::Imm(60)),
                Op::Pop(Reg::Rdi),
                Op::Label("label0".to_string()),
                Op::JumpZero("label0".to_string()),
                Op::Syscall,
            ])
        );
    }
    #[test]
    fn store_to_stack() {
        assert_eq!(
            read("mov QWORD [rsp + 8], rax"),
            Ok(vec![Op::Mov(Operand::Stack(8), Operand::Reg(Reg::Rax))])
        );
    }
    #[test]
    fn errors() {
        assert_eq!(
            read("mov rax, 1\nret"),
            Err(ReadError::UnknownInstruction("ret".to_string(), 2))
        );
        assert_eq!(
            read("pop rax, rbx"),
            Err(ReadError::OperandCount("pop".to_string(), 2, 1))
        );
        assert_eq!(
            read("cqo rax").unwrap_err().to_string(),
            "`cqo` given 1 operands on line 1"
        );
    }
}
