use std::io::Write;

use crate::classify::LabelRole;
use crate::error::{describe_slot, Error};
use crate::output;
use crate::program::{Program, Token};
use crate::symbol::{decode_hex, CmpFlag, HexError, Opcode, Register, Tag, REGISTER_COUNT};

/// Eight signed 32-bit registers, zeroed at start.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct RegisterFile([i32; REGISTER_COUNT]);

impl RegisterFile {
    pub fn get(&self, reg: Register) -> i32 {
        self.0[reg.index()]
    }

    pub fn set(&mut self, reg: Register, value: i32) {
        self.0[reg.index()] = value;
    }

    pub fn as_array(&self) -> &[i32; REGISTER_COUNT] {
        &self.0
    }
}

/// Lifecycle of a single run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    /// Built, nothing executed yet.
    Ready,
    Running,
    /// PC passed the end of the sequence.
    Halted,
    /// An instruction failed. The run cannot continue.
    Faulted,
}

/// What an operand slot is allowed to hold.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Shape {
    Reg,
    /// Register or immediate
    Value,
    Label,
}

impl Shape {
    fn accepts(self, tag: Tag) -> bool {
        match self {
            Shape::Reg => tag == Tag::Reg,
            Shape::Value => matches!(tag, Tag::Reg | Tag::Imm),
            Shape::Label => tag == Tag::Label,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Shape::Reg => "register",
            Shape::Value => "register or immediate",
            Shape::Label => "label",
        }
    }
}

/// Represents complete program state during one run.
///
/// The program itself is borrowed read-only. Registers, PC and the comparison flag belong to
/// this run alone.
pub struct RunState<'p> {
    program: &'p Program,
    reg: RegisterFile,
    /// Index into the instruction sequence
    pc: usize,
    flag: CmpFlag,
    status: Status,
    trace: bool,
}

impl<'p> RunState<'p> {
    pub fn new(program: &'p Program) -> Self {
        RunState {
            program,
            reg: RegisterFile::default(),
            pc: 0,
            flag: CmpFlag::Indeterminate,
            status: Status::Ready,
            trace: false,
        }
    }

    /// Print every executed instruction to stderr.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    // Indexed by `Opcode as usize`
    const OP_TABLE: [fn(&mut Self, &mut dyn Write) -> Result<usize, Error>; 7] = [
        Self::mov, // 0x10
        Self::add, // 0x11
        Self::mul, // 0x12
        Self::clt, // 0x13
        Self::jne, // 0x14
        Self::jeq, // 0x15
        Self::out, // 0x16
    ];

    /// Run until the program halts or an instruction fails.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<(), Error> {
        while self.step(out)? == Status::Running {}
        Ok(())
    }

    /// Execute the instruction at PC. Stepping a finished run does nothing.
    pub fn step(&mut self, out: &mut dyn Write) -> Result<Status, Error> {
        if matches!(self.status, Status::Halted | Status::Faulted) {
            return Ok(self.status);
        }
        self.status = Status::Running;

        let program = self.program;
        let Some(head) = program.get(self.pc) else {
            self.status = Status::Halted;
            return Ok(self.status);
        };
        if self.trace {
            self.trace_instr(head);
        }

        let next = match head.tag {
            Tag::Op(op) => Self::OP_TABLE[op.index()](self, out),
            // Reaching a label definition by fall-through or by jumping
            Tag::Label => Ok(self.pc + 1),
            Tag::Reg | Tag::Imm | Tag::Unresolved => Err(Error::UnresolvedToken {
                text: head.text.clone(),
                span: head.span.into(),
            }),
        };
        match next {
            Ok(pc) => {
                self.pc = pc;
                if self.pc >= program.len() {
                    self.status = Status::Halted;
                }
                Ok(self.status)
            }
            Err(e) => {
                self.status = Status::Faulted;
                Err(e)
            }
        }
    }

    pub fn reg(&self, reg: Register) -> i32 {
        self.reg.get(reg)
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.reg
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn flag(&self) -> CmpFlag {
        self.flag
    }

    pub fn status(&self) -> Status {
        self.status
    }

    fn trace_instr(&self, head: &Token) {
        let arity = match head.tag {
            Tag::Op(op) => op.arity(),
            _ => 0,
        };
        let end = (self.pc + 1 + arity).min(self.program.len());
        let words: Vec<&str> = self.program.tokens()[self.pc..end]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        output::trace(self.pc, &words, self.flag);
    }

    /// Check operand tags for the instruction at PC, before any of them is resolved.
    fn operands<const N: usize>(
        &self,
        op: Opcode,
        shapes: [Shape; N],
    ) -> Result<[&'p Token; N], Error> {
        let program = self.program;
        for (i, shape) in shapes.into_iter().enumerate() {
            let slot = program.get(self.pc + 1 + i);
            if slot.is_some_and(|token| shape.accepts(token.tag)) {
                continue;
            }
            let span = slot
                .or_else(|| program.get(self.pc))
                .map(|t| t.span)
                .unwrap_or_default();
            return Err(Error::UnexpectedOperand {
                op,
                expected: shape.describe(),
                found: describe_slot(slot.map(|t| t.tag)),
                span: span.into(),
            });
        }
        let tokens = program.tokens();
        Ok(std::array::from_fn(|i| &tokens[self.pc + 1 + i]))
    }

    /// Resolve a register or immediate operand to its value.
    fn value(&self, token: &Token) -> Result<i32, Error> {
        match token.tag {
            Tag::Reg => Ok(self.reg.get(parse_register(token)?)),
            _ => parse_immediate(token),
        }
    }

    fn mov(&mut self, _out: &mut dyn Write) -> Result<usize, Error> {
        let [dst, src] = self.operands(Opcode::Mov, [Shape::Reg, Shape::Value])?;
        let dst = parse_register(dst)?;
        let val = self.value(src)?;
        self.reg.set(dst, val);
        Ok(self.pc + 3)
    }

    fn add(&mut self, _out: &mut dyn Write) -> Result<usize, Error> {
        let [dst, src] = self.operands(Opcode::Add, [Shape::Reg, Shape::Value])?;
        let dst = parse_register(dst)?;
        let val = self.value(src)?;
        self.reg.set(dst, self.reg.get(dst).wrapping_add(val));
        Ok(self.pc + 3)
    }

    fn mul(&mut self, _out: &mut dyn Write) -> Result<usize, Error> {
        let [dst, src] = self.operands(Opcode::Mul, [Shape::Reg, Shape::Value])?;
        let dst = parse_register(dst)?;
        let val = self.value(src)?;
        self.reg.set(dst, self.reg.get(dst).wrapping_mul(val));
        Ok(self.pc + 3)
    }

    fn clt(&mut self, _out: &mut dyn Write) -> Result<usize, Error> {
        let [a, b] = self.operands(Opcode::Clt, [Shape::Value, Shape::Value])?;
        let a = self.value(a)?;
        let b = self.value(b)?;
        self.flag = CmpFlag::from(a < b);
        Ok(self.pc + 3)
    }

    fn jne(&mut self, _out: &mut dyn Write) -> Result<usize, Error> {
        self.cond_jump(Opcode::Jne, CmpFlag::False)
    }

    fn jeq(&mut self, _out: &mut dyn Write) -> Result<usize, Error> {
        self.cond_jump(Opcode::Jeq, CmpFlag::True)
    }

    /// Jump to the label if the flag matches `when`. The flag is reset either way.
    fn cond_jump(&mut self, op: Opcode, when: CmpFlag) -> Result<usize, Error> {
        let [target] = self.operands(op, [Shape::Label])?;
        debug_assert_eq!(target.role, LabelRole::Reference);
        let taken = self.flag == when;
        self.flag = CmpFlag::Indeterminate;
        if !taken {
            return Ok(self.pc + 2);
        }
        self.program
            .label(&target.text)
            .ok_or_else(|| Error::UndefinedLabel {
                label: target.text.clone(),
                span: target.span.into(),
            })
    }

    fn out(&mut self, out: &mut dyn Write) -> Result<usize, Error> {
        let [src] = self.operands(Opcode::Out, [Shape::Value])?;
        let val = self.value(src)?;
        output::print_int(out, val)?;
        Ok(self.pc + 2)
    }
}

/// Operand text with its one-byte sigil removed.
fn payload(token: &Token) -> &str {
    token.text.get(1..).unwrap_or_default()
}

fn parse_register(token: &Token) -> Result<Register, Error> {
    let out_of_range = || Error::RegisterOutOfRange {
        text: token.text.clone(),
        span: token.span.into(),
    };
    match decode_hex(payload(token)) {
        Ok(index) => Register::new(index).ok_or_else(out_of_range),
        Err(HexError::Overflow) => Err(out_of_range()),
        Err(HexError::Malformed) => Err(Error::MalformedOperand {
            text: token.text.clone(),
            span: token.span.into(),
        }),
    }
}

fn parse_immediate(token: &Token) -> Result<i32, Error> {
    decode_hex(payload(token))
        .ok()
        .and_then(|val| i32::try_from(val).ok())
        .ok_or_else(|| Error::MalformedOperand {
            text: token.text.clone(),
            span: token.span.into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build and run, returning printed lines and the final state.
    fn run(src: &str) -> (Result<(), Error>, Vec<String>, [i32; REGISTER_COUNT], Status) {
        let program = Program::build(src).expect("program should build");
        let mut state = RunState::new(&program);
        let mut out = Vec::new();
        let res = state.run(&mut out);
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        (res, lines, *state.registers().as_array(), state.status())
    }

    fn output(src: &str) -> Vec<String> {
        let (res, lines, _, _) = run(src);
        res.expect("program should run");
        lines
    }

    #[test]
    fn mov_then_out() {
        assert_eq!(output("10 R0 C5 16 R0"), ["5"]);
    }

    #[test]
    fn add_accumulates() {
        assert_eq!(output("11 R0 C3 16 R0"), ["3"]);
        assert_eq!(output("11 R0 C3 11 R0 C3 16 R0"), ["6"]);
    }

    #[test]
    fn register_sources() {
        let (res, lines, regs, status) = run("10 R1 C7 10 R2 R1 12 R2 CA 11 R2 R1 16 R2");
        res.unwrap();
        assert_eq!(lines, ["77"]);
        assert_eq!(regs[1], 7);
        assert_eq!(regs[2], 77);
        assert_eq!(status, Status::Halted);
    }

    #[test]
    fn hex_and_negative_immediates() {
        assert_eq!(output("16 CFF 16 C-10 16 c0x1a"), ["255", "-16", "26"]);
    }

    #[test]
    fn arithmetic_wraps() {
        assert_eq!(output("10 R0 C7FFFFFFF 11 R0 C1 16 R0"), ["-2147483648"]);
        assert_eq!(output("10 R0 C40000000 12 R0 C4 16 R0"), ["0"]);
    }

    #[test]
    fn jeq_taken_when_true() {
        // 1 < 2 sets the flag, JEQ jumps over the first OUT
        assert_eq!(output("13 C1 C2 15 Askip 16 C1 Askip 16 C2"), ["2"]);
    }

    #[test]
    fn jne_not_taken_when_true() {
        assert_eq!(output("13 C1 C2 14 Askip 16 C1 Askip 16 C2"), ["1", "2"]);
    }

    #[test]
    fn jne_taken_when_false() {
        assert_eq!(output("13 C2 C1 14 Askip 16 C1 Askip 16 C2"), ["2"]);
    }

    #[test]
    fn jump_consumes_flag() {
        // The second JEQ sees an indeterminate flag and falls through
        assert_eq!(output("13 C1 C2 15 Aa Aa 15 Ab 16 C1 Ab 16 C2"), ["1", "2"]);
        // Same for JNE, which never jumps on an indeterminate flag either
        assert_eq!(output("14 Ab 16 C1 Ab"), ["1"]);
    }

    #[test]
    fn backward_loop() {
        // r0 = 3; loop { out r0; r0 -= 1 } while 0 < r0
        let src = "
            10 R0 C3
            Aloop
            16 R0
            11 R0 C-1
            13 C0 R0
            15 Aloop
            16 C-1
        ";
        assert_eq!(output(src), ["3", "2", "1", "-1"]);
    }

    #[test]
    fn loop_while_not_equal_to_zero() {
        // Count down from 5, exit once r0 is no longer positive
        let src = "
            10 R0 C5
            10 R1 C0
            Atop
            11 R1 C1
            11 R0 C-1
            13 R0 C1
            14 Atop
            16 R1
        ";
        let (res, lines, regs, _) = run(src);
        res.unwrap();
        assert_eq!(lines, ["5"]);
        assert_eq!(regs[0], 0);
    }

    #[test]
    fn empty_program_halts() {
        let (res, lines, _, status) = run("");
        res.unwrap();
        assert!(lines.is_empty());
        assert_eq!(status, Status::Halted);
    }

    #[test]
    fn register_out_of_range() {
        let (res, lines, _, status) = run("16 C1 10 R8 C1 16 C2");
        let err = res.unwrap_err();
        assert!(matches!(err, Error::RegisterOutOfRange { ref text, .. } if text == "R8"));
        assert_eq!(err.status(), 5);
        // Nothing after the failing instruction runs
        assert_eq!(lines, ["1"]);
        assert_eq!(status, Status::Faulted);

        let (res, ..) = run("16 RF");
        assert!(matches!(res, Err(Error::RegisterOutOfRange { .. })));
        let (res, ..) = run("16 R-1");
        assert!(matches!(res, Err(Error::RegisterOutOfRange { .. })));
    }

    #[test]
    fn unexpected_operand_shape() {
        for src in ["10 C1 C1", "11 R0 Ax", "13 Ax C1", "16 Ax", "10 R0", "15 C1", "16 10"] {
            let (res, ..) = run(src);
            let err = res.unwrap_err();
            assert!(
                matches!(err, Error::UnexpectedOperand { .. }),
                "{src}: {err:?}"
            );
            assert_eq!(err.status(), 4);
        }
    }

    #[test]
    fn shape_checked_before_registers() {
        let (res, ..) = run("10 R9 Ax");
        assert!(matches!(res, Err(Error::UnexpectedOperand { .. })));
    }

    #[test]
    fn malformed_operands() {
        for src in ["16 Rz", "16 C", "16 CFFFFFFFF", "16 Cxyz"] {
            let (res, ..) = run(src);
            assert!(
                matches!(res, Err(Error::MalformedOperand { .. })),
                "{src}: {res:?}"
            );
        }
    }

    #[test]
    fn unresolved_head() {
        let (res, lines, ..) = run("16 C1 what 16 C2");
        assert!(matches!(res, Err(Error::UnresolvedToken { ref text, .. }) if text == "what"));
        assert_eq!(lines, ["1"]);
        let (res, ..) = run("R0");
        assert!(matches!(res, Err(Error::UnresolvedToken { .. })));
    }

    #[test]
    fn step_by_step() {
        let program = Program::build("Astart 10 R0 C2 16 R0").unwrap();
        let mut state = RunState::new(&program);
        let mut out = Vec::new();
        assert_eq!(state.status(), Status::Ready);
        assert_eq!(state.step(&mut out).unwrap(), Status::Running);
        assert_eq!(state.pc(), 1);
        assert_eq!(state.step(&mut out).unwrap(), Status::Running);
        assert_eq!(state.pc(), 4);
        assert_eq!(state.reg(Register::new(0).unwrap()), 2);
        assert_eq!(state.reg(Register::new(7).unwrap()), 0);
        // Out of range indices never reach the register file
        assert!(Register::new(8).is_none());
        assert_eq!(state.step(&mut out).unwrap(), Status::Halted);
        assert_eq!(state.step(&mut out).unwrap(), Status::Halted);
        assert_eq!(out, b"2\n");
    }

    #[test]
    fn flag_lifecycle() {
        let program = Program::build("13 C1 C2 15 Aend Aend").unwrap();
        let mut state = RunState::new(&program);
        let mut out = Vec::new();
        assert_eq!(state.flag(), CmpFlag::Indeterminate);
        state.step(&mut out).unwrap();
        assert_eq!(state.flag(), CmpFlag::True);
        state.step(&mut out).unwrap();
        assert_eq!(state.flag(), CmpFlag::Indeterminate);
        // Jumped to the definition slot itself
        assert_eq!(state.pc(), 5);
    }

    #[test]
    fn runs_are_independent() {
        let program = Program::build("11 R0 C1 16 R0").unwrap();
        for _ in 0..3 {
            let mut out = Vec::new();
            RunState::new(&program).run(&mut out).unwrap();
            assert_eq!(out, b"1\n");
        }
    }
}
