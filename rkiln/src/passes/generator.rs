// Walks the AST and writes out target instructions. All the static analysis
// that exists (is this name declared?) happens here too

use crate::{
    asm::{
        Instruction, Instruction::*, Label, Operand, Operand::*, Register, Register::*, SYS_EXIT, WORD,
    },
    ast::*,
    span::Span,
    token::Token,
};
use indexmap::IndexMap;

#[derive(Debug, PartialEq)]
pub enum GenerateError {
    Undeclared(String, Span),
    /// name, where it's declared again, where it was declared first
    Redeclared(String, Span, Span),
    IntegerOutOfRange(String, Span),
}
impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use GenerateError::*;
        match self {
            Undeclared(name, span) => write!(f, "[ERROR] undeclared identifier `{}` at {}", name, span),
            Redeclared(name, span, first) => write!(
                f,
                "[ERROR] identifier `{}` already declared in this scope at {}, declared again at {}",
                name, first, span
            ),
            IntegerOutOfRange(digits, span) => {
                write!(f, "[ERROR] int literal `{}` does not fit in 64 bits at {}", digits, span)
            }
        }
    }
}
impl std::error::Error for GenerateError {}

type Result<T> = std::result::Result<T, GenerateError>;

/// a binding: which slot of the logical stack holds the value
#[derive(Debug)]
struct Var {
    stack_loc: usize,
    span: Span,
}

/// one per open scope, innermost last
#[derive(Debug, Default)]
struct Frame {
    /// stack size when the scope opened
    base: usize,
    vars: IndexMap<String, Var>,
}

struct Generator<'p> {
    program: &'p Program,
    instructions: Vec<Instruction>,
    /// slots the generated code has pushed so far, in words
    stack_size: usize,
    frames: Vec<Frame>,
    label_count: usize,
}

impl<'p> Generator<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            instructions: Vec::new(),
            stack_size: 0,
            // top level statements get a frame like any scope
            frames: vec![Frame::default()],
            label_count: 0,
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn push(&mut self, what: Operand) {
        self.emit(Push(what));
        self.stack_size += 1;
    }

    fn pop(&mut self, into: Register) {
        self.emit(Pop(into));
        self.stack_size -= 1;
    }

    fn new_label(&mut self) -> Label {
        let label = self.label_count;
        self.label_count += 1;
        label
    }

    /// innermost binding wins
    fn lookup(&self, ident: &Token) -> Result<usize> {
        let name = ident.kind.text();
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.vars.get(&name))
            .map(|var| var.stack_loc)
            .ok_or(GenerateError::Undeclared(name, ident.span))
    }

    /// byte offset from rsp to a slot, as things stand right now
    fn offset_of(&self, stack_loc: usize) -> usize {
        (self.stack_size - stack_loc - 1) * WORD
    }

    fn gen_expr(&mut self, id: ExprId) -> Result<()> {
        let program = self.program;
        match program.expr(id) {
            Expression::Term(Term::IntLit(token)) => {
                let digits = token.kind.text();
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| GenerateError::IntegerOutOfRange(digits.clone(), token.span))?;
                self.emit(Mov(Reg(Rax), Imm(value)));
                self.push(Reg(Rax));
            }
            Expression::Term(Term::Identifier(token)) => {
                let stack_loc = self.lookup(token)?;
                let offset = self.offset_of(stack_loc);
                self.push(Stack(offset));
            }
            Expression::Term(Term::Paren(inner)) => self.gen_expr(*inner)?,
            Expression::Binary(binary) => {
                self.gen_expr(binary.left)?;
                self.gen_expr(binary.right)?;
                self.pop(Rbx);
                self.pop(Rax);
                match binary.op {
                    BinaryOp::Add => self.emit(Add(Rax, Reg(Rbx))),
                    BinaryOp::Subtract => self.emit(Sub(Rax, Reg(Rbx))),
                    BinaryOp::Multiply => self.emit(IMul(Rax, Reg(Rbx))),
                    BinaryOp::Divide => {
                        self.emit(Cqo);
                        self.emit(IDiv(Rbx));
                    }
                }
                self.push(Reg(Rax));
            }
        }
        Ok(())
    }

    fn begin_scope(&mut self) {
        self.frames.push(Frame { base: self.stack_size, vars: IndexMap::new() });
    }

    /// drops the frame and every slot declared in it
    fn end_scope(&mut self) {
        if let Some(frame) = self.frames.pop() {
            let count = self.stack_size.saturating_sub(frame.base);
            if count > 0 {
                self.emit(Add(Rsp, Imm((count * WORD) as i64)));
            }
            trace!("closed scope with {:?}", frame.vars.keys().collect::<Vec<_>>());
            self.stack_size = frame.base;
        }
    }

    fn gen_scope(&mut self, id: ScopeId) -> Result<()> {
        let program = self.program;
        self.begin_scope();
        // close the scope whether or not the body made it through
        let result = program.scope(id).statements.iter().try_for_each(|stmt| self.gen_stmt(*stmt));
        self.end_scope();
        result
    }

    /// pops the condition and jumps to `otherwise` if it's zero
    fn gen_condition(&mut self, condition: ExprId, otherwise: Label) -> Result<()> {
        self.gen_expr(condition)?;
        self.pop(Rax);
        self.emit(Test(Rax, Rax));
        self.emit(JumpZero(otherwise));
        Ok(())
    }

    fn gen_if(&mut self, stmt: &If) -> Result<()> {
        let else_label = self.new_label();
        self.gen_condition(stmt.condition, else_label)?;
        self.gen_scope(stmt.scope)?;
        match stmt.predicate {
            Some(predicate) => {
                let end_label = self.new_label();
                self.emit(Jump(end_label));
                self.emit(LabelMark(else_label));
                self.gen_predicate(predicate, end_label)?;
                self.emit(LabelMark(end_label));
            }
            None => self.emit(LabelMark(else_label)),
        }
        Ok(())
    }

    /// every branch of the chain finishes by getting to `end_label`
    fn gen_predicate(&mut self, id: PredId, end_label: Label) -> Result<()> {
        let program = self.program;
        match program.pred(id) {
            Predicate::ElseIf { condition, scope, next } => {
                let else_label = self.new_label();
                self.gen_condition(*condition, else_label)?;
                self.gen_scope(*scope)?;
                match next {
                    Some(next) => {
                        self.emit(Jump(end_label));
                        self.emit(LabelMark(else_label));
                        self.gen_predicate(*next, end_label)?;
                    }
                    // falling through the label lands on the end anyway
                    None => self.emit(LabelMark(else_label)),
                }
            }
            Predicate::Else(scope) => self.gen_scope(*scope)?,
        }
        Ok(())
    }

    fn gen_exit(&mut self) {
        self.emit(Mov(Reg(Rax), Imm(SYS_EXIT)));
        self.pop(Rdi);
        self.emit(Syscall);
    }

    fn gen_stmt(&mut self, id: StmtId) -> Result<()> {
        let program = self.program;
        match program.stmt(id) {
            Statement::Exit(code) => {
                self.gen_expr(*code)?;
                self.gen_exit();
            }
            Statement::Let { ident, value } => {
                let name = ident.kind.text();
                let current = self.frames.last().and_then(|frame| frame.vars.get(&name));
                if let Some(first) = current {
                    return Err(GenerateError::Redeclared(name, ident.span, first.span));
                }
                self.gen_expr(*value)?;
                // the value just pushed stays put as the variable
                let var = Var { stack_loc: self.stack_size - 1, span: ident.span };
                if let Some(frame) = self.frames.last_mut() {
                    frame.vars.insert(name, var);
                }
            }
            Statement::Assign { ident, value } => {
                let stack_loc = self.lookup(ident)?;
                self.gen_expr(*value)?;
                self.pop(Rax);
                let offset = self.offset_of(stack_loc);
                self.emit(Mov(Stack(offset), Reg(Rax)));
            }
            Statement::Scope(scope) => self.gen_scope(*scope)?,
            Statement::If(stmt) => self.gen_if(stmt)?,
        }
        Ok(())
    }
}

pub fn generate(program: &Program) -> Result<Vec<Instruction>> {
    let mut generator = Generator::new(program);
    for stmt in &program.statements {
        generator.gen_stmt(*stmt)?;
    }
    // falling off the end exits 0
    generator.emit(Mov(Reg(Rax), Imm(SYS_EXIT)));
    generator.emit(Mov(Reg(Rdi), Imm(0)));
    generator.emit(Syscall);
    debug!(
        "generated {} instructions using {} labels",
        generator.instructions.len(),
        generator.label_count
    );
    Ok(generator.instructions)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::passes::{parse, tokenize};

    fn program(text: &str) -> Program {
        parse(tokenize(text).expect("test lex error")).expect("test parse error")
    }
    fn gen(text: &str) -> Result<Vec<Instruction>> {
        generate(&program(text))
    }
    /// everything but the exit tacked onto the end
    fn body(text: &str) -> Vec<Instruction> {
        let mut insts = gen(text).expect("test generate error");
        let tail = insts.split_off(insts.len() - 3);
        assert_eq!(tail, vec![Mov(Reg(Rax), Imm(60)), Mov(Reg(Rdi), Imm(0)), Syscall]);
        insts
    }

    #[test]
    fn exit_literal() {
        assert_eq!(
            body("exit(5);"),
            vec![Mov(Reg(Rax), Imm(5)), Push(Reg(Rax)), Mov(Reg(Rax), Imm(60)), Pop(Rdi), Syscall]
        );
    }
    #[test]
    fn empty_program_exits_zero() {
        assert_eq!(body(""), vec![]);
    }
    #[test]
    fn binary_pops_right_first() {
        assert_eq!(
            body("exit(7 - 2);")[..7].to_vec(),
            vec![
                Mov(Reg(Rax), Imm(7)),
                Push(Reg(Rax)),
                Mov(Reg(Rax), Imm(2)),
                Push(Reg(Rax)),
                Pop(Rbx),
                Pop(Rax),
                Sub(Rax, Reg(Rbx)),
            ]
        );
        let div = body("exit(8 / 2);");
        assert_eq!(div[6..8].to_vec(), vec![Cqo, IDiv(Rbx)]);
    }
    #[test]
    fn identifiers_are_copied_from_their_slot() {
        let insts = body("let x = 1; let y = 2; exit(x); exit(y);");
        assert_eq!(insts[4], Push(Stack(8)));
        assert_eq!(insts[8], Push(Stack(0)));
    }
    #[test]
    fn offsets_account_for_temporaries() {
        // x is under y and then the pushed 3
        let insts = body("let x = 1; let y = 2; exit(3 + x);");
        assert_eq!(insts[6], Push(Stack(16)));
    }
    #[test]
    fn assignment_overwrites_in_place() {
        let insts = body("let x = 1; let y = 2; x = 7;");
        assert_eq!(
            insts[4..].to_vec(),
            vec![Mov(Reg(Rax), Imm(7)), Push(Reg(Rax)), Pop(Rax), Mov(Stack(8), Reg(Rax))]
        );
    }
    #[test]
    fn scope_discards_its_slots() {
        let insts = body("let a = 1; { let b = 2; let c = 3; } exit(a);");
        assert_eq!(insts[6], Add(Rsp, Imm(16)));
        // back to just a on the stack
        assert_eq!(insts[7], Push(Stack(0)));
    }
    #[test]
    fn empty_scope_emits_nothing() {
        assert_eq!(body("{ { } }"), vec![]);
    }
    #[test]
    fn out_of_scope_is_undeclared() {
        let err = gen("{ let x = 1; } exit(x);").unwrap_err();
        assert_eq!(err, GenerateError::Undeclared("x".to_string(), Span::at(1, 21)));
        assert_eq!(err.to_string(), "[ERROR] undeclared identifier `x` at 1:21");
    }
    #[test]
    fn assign_to_undeclared() {
        match gen("y = 3;").unwrap_err() {
            GenerateError::Undeclared(name, _) => assert_eq!(name, "y"),
            other => panic!("expected undeclared, got {:?}", other),
        }
    }
    #[test]
    fn redeclaration() {
        let err = gen("let x = 1; let x = 2;").unwrap_err();
        assert_eq!(
            err.to_string(),
            "[ERROR] identifier `x` already declared in this scope at 1:5, declared again at 1:16"
        );
    }
    #[test]
    fn shadowing_is_allowed() {
        let insts = body("let x = 1; { let x = 2; exit(x); } exit(x);");
        // inner x is the top slot
        assert_eq!(insts[4], Push(Stack(0)));
        // after the scope, outer x is on top again
        assert!(insts.contains(&Add(Rsp, Imm(8))));
        assert_eq!(insts[insts.len() - 4], Push(Stack(0)));
    }
    #[test]
    fn let_sees_the_outer_binding() {
        assert!(gen("let x = 1; { let x = x + 1; exit(x); }").is_ok());
        assert!(gen("let x = x;").is_err());
    }
    #[test]
    fn literal_too_big() {
        match gen("exit(99999999999999999999);").unwrap_err() {
            GenerateError::IntegerOutOfRange(digits, span) => {
                assert_eq!(digits, "99999999999999999999");
                assert_eq!(span.lo, (1, 6));
            }
            other => panic!("expected out of range, got {:?}", other),
        }
    }
    #[test]
    fn if_without_chain() {
        assert_eq!(
            body("if (1) { }"),
            vec![Mov(Reg(Rax), Imm(1)), Push(Reg(Rax)), Pop(Rax), Test(Rax, Rax), JumpZero(0), LabelMark(0)]
        );
    }
    #[test]
    fn if_else() {
        let insts = body("if (1) { } else { }");
        assert_eq!(insts[4..].to_vec(), vec![JumpZero(0), Jump(1), LabelMark(0), LabelMark(1)]);
    }
    #[test]
    fn labels_are_unique() {
        let insts = body(
            "if (0) { if (1) { } elif (2) { } else { } } elif (3) { } elif (4) { } \
             if (5) { } else { }",
        );
        let mut marks = vec![];
        let mut targets = vec![];
        for inst in &insts {
            match inst {
                LabelMark(label) => marks.push(*label),
                Jump(label) | JumpZero(label) => targets.push(*label),
                _ => (),
            }
        }
        let mut deduped = marks.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), marks.len(), "a label was marked twice");
        for target in targets {
            assert!(marks.contains(&target), "jump to unmarked label{}", target);
        }
    }
    #[test]
    fn frames_close_on_error() {
        let program = program("{ { let a = 1; exit(nope); } }");
        let mut generator = Generator::new(&program);
        assert!(generator.gen_stmt(program.statements[0]).is_err());
        assert_eq!(generator.frames.len(), 1);
        assert_eq!(generator.stack_size, 0);
    }
}
