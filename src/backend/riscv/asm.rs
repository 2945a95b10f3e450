//! RISC-V assembly text emitter
//!
//! Thin layer over a `String` buffer: one method per instruction or
//! directive, each taking an optional trailing comment.

use std::fmt;

/// RV32 registers used by generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Zero,
    Ra,
    Sp,
    Gp,
    Fp,
    A0,
    A1,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    S10,
    S11,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::Zero => "zero",
            Register::Ra => "ra",
            Register::Sp => "sp",
            Register::Gp => "gp",
            Register::Fp => "fp",
            Register::A0 => "a0",
            Register::A1 => "a1",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::T3 => "t3",
            Register::T4 => "t4",
            Register::T5 => "t5",
            Register::T6 => "t6",
            Register::S10 => "s10",
            Register::S11 => "s11",
        };
        f.write_str(name)
    }
}

/// An assembly label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Three-register ALU operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Xor,
    Slt,
}

impl AluOp {
    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Mul => "mul",
            AluOp::Div => "div",
            AluOp::Rem => "rem",
            AluOp::Xor => "xor",
            AluOp::Slt => "slt",
        }
    }
}

/// Two-register conditional branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Bge,
    Bltu,
}

impl Branch {
    fn mnemonic(self) -> &'static str {
        match self {
            Branch::Bge => "bge",
            Branch::Bltu => "bltu",
        }
    }
}

/// Accumulates assembly text
#[derive(Debug, Default)]
pub struct RiscVBackend {
    output: String,
    next_label: usize,
    /// Set when emitted code indexes into a string; the program then
    /// initializes the one-character string table at startup.
    require_init_chars: bool,
}

impl RiscVBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.output
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// A fresh local label
    pub fn fresh_label(&mut self) -> Label {
        self.next_label += 1;
        Label(format!("label_{}", self.next_label))
    }

    pub fn require_init_chars(&mut self) {
        self.require_init_chars = true;
    }

    pub fn requires_init_chars(&self) -> bool {
        self.require_init_chars
    }

    // ==================== Raw Output ====================

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    /// Emit one indented instruction or directive
    pub fn insn(&mut self, text: &str, comment: &str) {
        if comment.is_empty() {
            self.writeln(&format!("  {}", text));
        } else {
            self.writeln(&format!("  {:<40} # {}", text, comment));
        }
    }

    pub fn blank(&mut self) {
        self.writeln("");
    }

    // ==================== Directives ====================

    pub fn data_section(&mut self) {
        self.writeln(".data");
    }

    pub fn text_section(&mut self) {
        self.writeln(".text");
    }

    pub fn global_label(&mut self, label: &Label) {
        self.writeln("");
        self.writeln(&format!(".globl {}", label));
        self.writeln(&format!("{}:", label));
    }

    pub fn local_label(&mut self, label: &Label, comment: &str) {
        if comment.is_empty() {
            self.writeln(&format!("{}:", label));
        } else {
            self.writeln(&format!("{:<42} # {}", format!("{}:", label), comment));
        }
    }

    pub fn equiv(&mut self, name: &str, value: impl fmt::Display) {
        self.writeln(&format!(".equiv {}, {}", name, value));
    }

    pub fn word(&mut self, value: i32, comment: &str) {
        self.insn(&format!(".word {}", value), comment);
    }

    pub fn word_label(&mut self, label: &Label, comment: &str) {
        self.insn(&format!(".word {}", label), comment);
    }

    pub fn string(&mut self, value: &str, comment: &str) {
        self.insn(&format!(".string \"{}\"", escape(value)), comment);
    }

    pub fn align(&mut self, power: u32) {
        self.insn(&format!(".align {}", power), "");
    }

    // ==================== Instructions ====================

    pub fn li(&mut self, rd: Register, imm: i32, comment: &str) {
        self.insn(&format!("li {}, {}", rd, imm), comment);
    }

    pub fn la(&mut self, rd: Register, label: &Label, comment: &str) {
        self.insn(&format!("la {}, {}", rd, label), comment);
    }

    pub fn lui(&mut self, rd: Register, imm: u32, comment: &str) {
        self.insn(&format!("lui {}, {}", rd, imm), comment);
    }

    pub fn mv(&mut self, rd: Register, rs: Register, comment: &str) {
        self.insn(&format!("mv {}, {}", rd, rs), comment);
    }

    pub fn alu(&mut self, op: AluOp, rd: Register, rs1: Register, rs2: Register, comment: &str) {
        self.insn(&format!("{} {}, {}, {}", op.mnemonic(), rd, rs1, rs2), comment);
    }

    pub fn addi(&mut self, rd: Register, rs: Register, imm: i32, comment: &str) {
        self.insn(&format!("addi {}, {}, {}", rd, rs, imm), comment);
    }

    /// `addi` with a symbolic immediate such as `@.__len__`
    pub fn addi_sym(&mut self, rd: Register, rs: Register, sym: &str, comment: &str) {
        self.insn(&format!("addi {}, {}, {}", rd, rs, sym), comment);
    }

    pub fn xori(&mut self, rd: Register, rs: Register, imm: i32, comment: &str) {
        self.insn(&format!("xori {}, {}, {}", rd, rs, imm), comment);
    }

    pub fn slli(&mut self, rd: Register, rs: Register, shamt: u32, comment: &str) {
        self.insn(&format!("slli {}, {}, {}", rd, rs, shamt), comment);
    }

    pub fn seqz(&mut self, rd: Register, rs: Register, comment: &str) {
        self.insn(&format!("seqz {}, {}", rd, rs), comment);
    }

    pub fn snez(&mut self, rd: Register, rs: Register, comment: &str) {
        self.insn(&format!("snez {}, {}", rd, rs), comment);
    }

    pub fn lw(&mut self, rd: Register, base: Register, offset: i32, comment: &str) {
        self.insn(&format!("lw {}, {}({})", rd, offset, base), comment);
    }

    /// `lw` at a symbolic offset such as `@.__len__`
    pub fn lw_sym(&mut self, rd: Register, base: Register, sym: &str, comment: &str) {
        self.insn(&format!("lw {}, {}({})", rd, sym, base), comment);
    }

    pub fn sw(&mut self, rs: Register, base: Register, offset: i32, comment: &str) {
        self.insn(&format!("sw {}, {}({})", rs, offset, base), comment);
    }

    pub fn lbu_sym(&mut self, rd: Register, base: Register, sym: &str, comment: &str) {
        self.insn(&format!("lbu {}, {}({})", rd, sym, base), comment);
    }

    pub fn j(&mut self, label: &Label, comment: &str) {
        self.insn(&format!("j {}", label), comment);
    }

    pub fn jal(&mut self, label: &Label, comment: &str) {
        self.insn(&format!("jal {}", label), comment);
    }

    pub fn jalr(&mut self, rs: Register, comment: &str) {
        self.insn(&format!("jalr {}", rs), comment);
    }

    pub fn jr(&mut self, rs: Register, comment: &str) {
        self.insn(&format!("jr {}", rs), comment);
    }

    pub fn branch(&mut self, op: Branch, rs1: Register, rs2: Register, label: &Label, comment: &str) {
        self.insn(&format!("{} {}, {}, {}", op.mnemonic(), rs1, rs2, label), comment);
    }

    pub fn beqz(&mut self, rs: Register, label: &Label, comment: &str) {
        self.insn(&format!("beqz {}, {}", rs, label), comment);
    }

    pub fn bnez(&mut self, rs: Register, label: &Label, comment: &str) {
        self.insn(&format!("bnez {}, {}", rs, label), comment);
    }

    pub fn bgez(&mut self, rs: Register, label: &Label, comment: &str) {
        self.insn(&format!("bgez {}, {}", rs, label), comment);
    }

    pub fn ecall(&mut self, comment: &str) {
        self.insn("ecall", comment);
    }
}

/// Escape a string for a `.string` directive
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_with_comment() {
        let mut asm = RiscVBackend::new();
        asm.li(Register::A0, 10, "exit");
        asm.lw_sym(Register::T1, Register::T0, "@.__len__", "");
        let text = asm.finish();
        assert!(text.contains("li a0, 10"));
        assert!(text.contains("# exit"));
        assert!(text.contains("lw t1, @.__len__(t0)"));
    }

    #[test]
    fn test_fresh_labels_are_unique() {
        let mut asm = RiscVBackend::new();
        let a = asm.fresh_label();
        let b = asm.fresh_label();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("label_"));
    }

    #[test]
    fn test_string_escaping() {
        let mut asm = RiscVBackend::new();
        asm.string("say \"hi\"\n", "");
        assert!(asm.output().contains(r#".string "say \"hi\"\n""#));
    }
}
