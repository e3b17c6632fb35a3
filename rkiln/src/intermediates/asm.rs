//! Target instructions, the output of the generator. Each [Instruction] is
//! exactly one line of x86-64 NASM once rendered by
//! [emit](crate::passes::emit); keeping them as enums until then makes the
//! generator testable without string matching.

/// the registers the generator names. rsp only ever shows up as the
/// destination of a stack adjustment or inside an [Operand::Stack]; rdx is
/// only touched implicitly by cqo / idiv
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Register {
    Rax,
    Rbx,
    Rdi,
    Rsp,
}
impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Register::Rax => "rax",
            Register::Rbx => "rbx",
            Register::Rdi => "rdi",
            Register::Rsp => "rsp",
        };
        write!(f, "{}", s)
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Operand {
    Reg(Register),
    Imm(i64),
    /// a quadword at [rsp + offset], offset in bytes
    Stack(usize),
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Stack(0) => write!(f, "QWORD [rsp]"),
            Operand::Stack(offset) => write!(f, "QWORD [rsp + {}]", offset),
        }
    }
}

/// Labels are minted by the generator from a counter, so two labels are the
/// same label only if they have the same number. A jump refers to wherever
/// the matching LabelMark ends up
pub type Label = usize;

pub fn label_name(label: Label) -> String {
    format!("label{}", label)
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Instruction {
    /// dst, src
    Mov(Operand, Operand),
    Push(Operand),
    Pop(Register),
    Add(Register, Operand),
    Sub(Register, Operand),
    IMul(Register, Operand),
    /// sign extend rax into rdx ahead of an IDiv
    Cqo,
    IDiv(Register),
    Test(Register, Register),
    JumpZero(Label),
    Jump(Label),
    LabelMark(Label),
    Syscall,
}

/// the linux syscall number for exit
pub const SYS_EXIT: i64 = 60;
/// bytes per slot on the stack
pub const WORD: usize = 8;

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Instruction::*;
        match self {
            Mov(dst, src) => write!(f, "mov {}, {}", dst, src),
            Push(what) => write!(f, "push {}", what),
            Pop(reg) => write!(f, "pop {}", reg),
            Add(dst, src) => write!(f, "add {}, {}", dst, src),
            Sub(dst, src) => write!(f, "sub {}, {}", dst, src),
            IMul(dst, src) => write!(f, "imul {}, {}", dst, src),
            Cqo => write!(f, "cqo"),
            IDiv(reg) => write!(f, "idiv {}", reg),
            Test(a, b) => write!(f, "test {}, {}", a, b),
            JumpZero(label) => write!(f, "jz {}", label_name(*label)),
            Jump(label) => write!(f, "jmp {}", label_name(*label)),
            LabelMark(label) => write!(f, "{}:", label_name(*label)),
            Syscall => write!(f, "syscall"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Instruction::*;
    use super::Operand::*;
    use super::Register::*;
    #[test]
    fn nasm_text() {
        assert_eq!(Mov(Reg(Rax), Imm(5)).to_string(), "mov rax, 5");
        assert_eq!(Push(Stack(8)).to_string(), "push QWORD [rsp + 8]");
        assert_eq!(Push(Stack(0)).to_string(), "push QWORD [rsp]");
        assert_eq!(Mov(Stack(16), Reg(Rax)).to_string(), "mov QWORD [rsp + 16], rax");
        assert_eq!(Add(Rsp, Imm(24)).to_string(), "add rsp, 24");
        assert_eq!(IMul(Rax, Reg(Rbx)).to_string(), "imul rax, rbx");
        assert_eq!(JumpZero(3).to_string(), "jz label3");
        assert_eq!(LabelMark(3).to_string(), "label3:");
    }
}
