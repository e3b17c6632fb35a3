use crate::read::{Op, Operand, Reg};

use indexmap::IndexMap;

/// Should be small enough to make small scripts low-RAM, but high enough
/// that startup doesn't take forever with 1000s of incremental allocs
const INIT_STACK_SIZE: usize = 16;
/// bytes per stack slot
const WORD: usize = 8;
const SYS_EXIT: i64 = 60;

/// Executes a listing. The machine stack is a Vec whose end is the top, so
/// [rsp + n] is the slot n / 8 below the last element
#[derive(PartialEq, Debug)]
pub struct Thread {
    pub stack: Vec<i64>,
    rax: i64,
    rbx: i64,
    rdx: i64,
    rdi: i64,
    zero_flag: bool,
    code: Vec<Op>,
    // Code pointer
    ip: usize,
    labels: IndexMap<String, usize>,
}

macro_rules! thread_assert {
    ( $thread:ident, $cond:expr, $lit:literal $(,)? $($expr:expr),* ) => {
        if !$cond {
            $thread.thread_panic(&format!($lit, $($expr),*))
        }
    }
}

impl std::fmt::Display for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "rax {} | rbx {} | rdx {} | rdi {} | zf {}",
            self.rax, self.rbx, self.rdx, self.rdi, self.zero_flag
        )?;
        writeln!(f, "stack {:?}", self.stack)?;
        let here = self
            .labels
            .iter()
            .filter(|(_, at)| **at <= self.ip)
            .last();
        match here {
            Some((name, at)) => writeln!(f, "at {} + {}", name, self.ip - at),
            None => writeln!(f, "at {}", self.ip),
        }
    }
}

impl Thread {
    fn thread_panic(&mut self, msg: &str) -> ! {
        eprintln!("vm panic: {}\nSTATE:\n{}", msg, self);
        self.sane_state();
        panic!("vm panic");
    }
    pub fn new(code: Vec<Op>) -> Self {
        let mut labels = IndexMap::new();
        for (at, op) in code.iter().enumerate() {
            if let Op::Label(name) = op {
                labels.insert(name.clone(), at);
            }
        }
        Self {
            stack: Vec::with_capacity(INIT_STACK_SIZE),
            rax: 0,
            rbx: 0,
            rdx: 0,
            rdi: 0,
            zero_flag: false,
            code,
            ip: 0,
            labels,
        }
    }
    /// Returns the exit status once the program asks to exit
    fn exec_next(&mut self) -> Option<u8> {
        let op = match self.code.get(self.ip) {
            Some(op) => op.clone(),
            None => self.thread_panic("ran off the end of the program"),
        };
        self.ip += 1;
        match op {
            Op::Mov(Operand::Stack(offset), src) => {
                let value = self.read(src);
                let slot = self.slot(offset);
                self.stack[slot] = value;
            }
            Op::Mov(Operand::Reg(dst), src) => {
                let value = self.read(src);
                self.write(dst, value);
            }
            Op::Mov(Operand::Imm(_), _) => self.thread_panic("mov into an immediate"),
            Op::Push(src) => {
                let value = self.read(src);
                self.push(value);
            }
            Op::Pop(dst) => {
                let value = self.pop();
                self.write(dst, value);
            }
            Op::Add(Reg::Rsp, src) => {
                let bytes = self.read(src);
                self.shrink(bytes);
            }
            Op::Sub(Reg::Rsp, src) => {
                let bytes = self.read(src);
                self.shrink(-bytes);
            }
            Op::Add(dst, src) => {
                let value = self.get(dst).wrapping_add(self.read(src));
                self.write(dst, value);
            }
            Op::Sub(dst, src) => {
                let value = self.get(dst).wrapping_sub(self.read(src));
                self.write(dst, value);
            }
            Op::IMul(dst, src) => {
                let value = self.get(dst).wrapping_mul(self.read(src));
                self.write(dst, value);
            }
            Op::Cqo => {
                self.rdx = if self.rax < 0 { -1 } else { 0 };
            }
            Op::IDiv(by) => {
                let divisor = i128::from(self.get(by));
                let dividend = (i128::from(self.rdx) << 64) | i128::from(self.rax as u64);
                thread_assert!(self, divisor != 0, "division by zero");
                let quotient = dividend / divisor;
                thread_assert!(
                    self,
                    quotient >= i128::from(i64::min_value())
                        && quotient <= i128::from(i64::max_value()),
                    "quotient {} does not fit in rax",
                    quotient
                );
                self.rax = quotient as i64;
                self.rdx = (dividend % divisor) as i64;
            }
            Op::Test(a, b) => {
                self.zero_flag = self.get(a) & self.get(b) == 0;
            }
            Op::JumpZero(to) => {
                if self.zero_flag {
                    self.ip = self.find(&to);
                }
            }
            Op::Jump(to) => {
                self.ip = self.find(&to);
            }
            Op::Label(_) => {}
            Op::Syscall => {
                thread_assert!(
                    self,
                    self.rax == SYS_EXIT,
                    "syscall {} not supported",
                    self.rax
                );
                return Some(self.rdi as u8);
            }
        }
        None
    }
    fn sane_state(&mut self) {
        // Deallocate everything
        self.stack.clear();
        self.stack.shrink_to_fit();
    }
    /// Runs from the top of the listing until it exits, returning the status
    /// the way the kernel would report it (low 8 bits of rdi)
    pub fn run(&mut self) -> u8 {
        self.ip = 0;
        loop {
            trace!(
                "stack {:?}| next {:?}| rax {}",
                self.stack,
                self.code.get(self.ip),
                self.rax
            );
            if let Some(status) = self.exec_next() {
                debug!("exited with {}", status);
                return status;
            }
        }
    }
    fn find(&mut self, label: &str) -> usize {
        match self.labels.get(label) {
            Some(at) => *at,
            None => self.thread_panic(&format!("could not find label {}", label)),
        }
    }
    fn get(&mut self, reg: Reg) -> i64 {
        match reg {
            Reg::Rax => self.rax,
            Reg::Rbx => self.rbx,
            Reg::Rdx => self.rdx,
            Reg::Rdi => self.rdi,
            Reg::Rsp => self.thread_panic("rsp is not readable as a value"),
        }
    }
    fn write(&mut self, reg: Reg, value: i64) {
        match reg {
            Reg::Rax => self.rax = value,
            Reg::Rbx => self.rbx = value,
            Reg::Rdx => self.rdx = value,
            Reg::Rdi => self.rdi = value,
            Reg::Rsp => self.thread_panic("rsp is only moved by push, pop, add and sub"),
        }
    }
    fn read(&mut self, operand: Operand) -> i64 {
        match operand {
            Operand::Reg(reg) => self.get(reg),
            Operand::Imm(value) => value,
            Operand::Stack(offset) => {
                let slot = self.slot(offset);
                self.stack[slot]
            }
        }
    }
    /// index into self.stack for [rsp + offset]
    fn slot(&mut self, offset: usize) -> usize {
        thread_assert!(self, offset % WORD == 0, "unaligned stack access {}", offset);
        let depth = offset / WORD;
        if depth >= self.stack.len() {
            self.thread_panic(&format!("read below the stack at [rsp + {}]", offset));
        }
        self.stack.len() - depth - 1
    }
    /// add rsp, bytes. negative grows the stack with zeroes
    fn shrink(&mut self, bytes: i64) {
        thread_assert!(
            self,
            bytes % WORD as i64 == 0,
            "unaligned stack adjustment {}",
            bytes
        );
        let words = bytes / WORD as i64;
        let new_len = self.stack.len() as i64 - words;
        thread_assert!(self, new_len >= 0, "stack underflow");
        self.stack.resize(new_len as usize, 0);
    }
    fn pop(&mut self) -> i64 {
        match self.stack.pop() {
            Some(p) => p,
            None => self.thread_panic("stack underflow"),
        }
    }
    fn push(&mut self, p: i64) {
        self.stack.push(p)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::read::read;
    fn run(text: &str) -> u8 {
        Thread::new(read(text).unwrap()).run()
    }
    #[test]
    fn exit_status() {
        assert_eq!(run("mov rax, 60\nmov rdi, 42\nsyscall"), 42);
        assert_eq!(run("mov rax, 60\nmov rdi, 263\nsyscall"), 7);
        assert_eq!(run("mov rax, 60\nmov rdi, -1\nsyscall"), 255);
    }
    #[test]
    fn stack_addressing() {
        let text = "
            push 1
            push 2
            push 3
            push QWORD [rsp + 16]
            pop rdi
            mov rax, 60
            syscall";
        assert_eq!(run(text), 1);
    }
    #[test]
    fn store_then_discard() {
        let text = "
            push 1
            push 2
            mov rax, 9
            mov QWORD [rsp + 8], rax
            add rsp, 8
            pop rdi
            mov rax, 60
            syscall";
        assert_eq!(run(text), 9);
    }
    #[test]
    fn signed_division() {
        let text = "
            mov rax, -7
            mov rbx, 2
            cqo
            idiv rbx
            mov rdi, rax
            imul rdi, -1
            mov rax, 60
            syscall";
        assert_eq!(run(text), 3);
    }
    #[test]
    fn branches() {
        let text = "
            mov rax, 0
            test rax, rax
            jz label0
            mov rdi, 1
            jmp label1
        label0:
            mov rdi, 2
        label1:
            mov rax, 60
            syscall";
        assert_eq!(run(text), 2);
    }
    #[test]
    #[should_panic(expected = "vm panic")]
    fn divide_by_zero() {
        run("mov rax, 1\nmov rbx, 0\ncqo\nidiv rbx\nmov rax, 60\nsyscall");
    }
    #[test]
    #[should_panic(expected = "vm panic")]
    fn underflow() {
        run("pop rax");
    }
    #[test]
    #[should_panic(expected = "vm panic")]
    fn runs_off_the_end() {
        run("mov rax, 60");
    }
    #[test]
    #[should_panic(expected = "vm panic")]
    fn missing_label() {
        run("jmp label9");
    }
    #[test]
    #[should_panic(expected = "vm panic")]
    fn other_syscalls() {
        run("mov rax, 1\nsyscall");
    }
}
