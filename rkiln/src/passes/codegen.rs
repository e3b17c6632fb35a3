use crate::asm::Instruction;
use std::fmt::Write;

/// what every listing starts with. the linker looks for _start
const HEADER: &str = "global _start\n_start:\n";

/// Renders the instructions as a NASM file for x86-64 linux, ready for
/// `nasm -felf64`. Labels go flush left, everything else is indented
pub fn emit(instructions: &[Instruction]) -> String {
    let mut out = String::from(HEADER);
    for inst in instructions {
        // writing into a String can't fail
        let _ = match inst {
            Instruction::LabelMark(_) => writeln!(out, "{}", inst),
            _ => writeln!(out, "    {}", inst),
        };
    }
    trace!("emitted:\n{}", out);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asm::{Instruction::*, Operand::*, Register::*};
    #[test]
    fn listing() {
        let text = emit(&[
            Mov(Reg(Rax), Imm(3)),
            Push(Reg(Rax)),
            Pop(Rax),
            Test(Rax, Rax),
            JumpZero(0),
            LabelMark(0),
            Mov(Reg(Rax), Imm(60)),
            Mov(Reg(Rdi), Imm(0)),
            Syscall,
        ]);
        assert_eq!(
            text,
            "global _start\n_start:\n    mov rax, 3\n    push rax\n    pop rax\n    test rax, rax\n    jz label0\nlabel0:\n    mov rax, 60\n    mov rdi, 0\n    syscall\n"
        );
    }
    #[test]
    fn nothing_to_emit() {
        assert_eq!(emit(&[]), HEADER);
    }
}
