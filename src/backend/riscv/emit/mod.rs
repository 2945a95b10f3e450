//! Per-function code emission
//!
//! A [`FuncEmitter`] walks the body of one function (or the top level) and
//! writes its instructions. Every expression is evaluated into an explicit
//! destination register taken from the [`RegisterRing`].

mod calls;
mod expr;
mod stmt;

use log::{trace, warn};

use super::asm::{Label, Register, RiscVBackend};
use super::constants::ConstantPool;
use super::descriptors::{FuncId, ProgramLayout, Slot, SymbolInfo, WORD};
use super::regs::RegisterRing;
use crate::frontend::ast::{Expr, ExprKind};
use crate::types::ValueType;

// ==================== Runtime Errors ====================

/// Error exits of generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    Arg,
    None,
    Div,
    Oob,
}

impl RuntimeError {
    pub const ALL: [RuntimeError; 4] = [RuntimeError::Arg, RuntimeError::None, RuntimeError::Div, RuntimeError::Oob];

    pub fn label(self) -> Label {
        Label::new(match self {
            RuntimeError::Arg => "error.Arg",
            RuntimeError::None => "error.None",
            RuntimeError::Div => "error.Div",
            RuntimeError::Oob => "error.OOB",
        })
    }

    /// Symbol of the exit code
    pub fn code(self) -> &'static str {
        match self {
            RuntimeError::Arg => "@error_arg",
            RuntimeError::None => "@error_none",
            RuntimeError::Div => "@error_div_zero",
            RuntimeError::Oob => "@error_oob",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RuntimeError::Arg => "Invalid argument",
            RuntimeError::None => "Operation on None",
            RuntimeError::Div => "Division by zero",
            RuntimeError::Oob => "Index out of bounds",
        }
    }
}

// ==================== Literals ====================

/// Word holding a literal in a slot of type `ty`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralWord {
    Imm(i32),
    Addr(Label),
}

/// Initial value of a variable or attribute. `int` and `bool` literals in
/// reference-typed slots point at boxed constants.
pub fn literal_word(constants: &mut ConstantPool, init: Option<&Expr>, ty: &ValueType) -> LiteralWord {
    let Some(init) = init else {
        return LiteralWord::Imm(0);
    };
    match &init.kind {
        ExprKind::IntegerLiteral { value } if ty.is_unboxed() => LiteralWord::Imm(*value),
        ExprKind::IntegerLiteral { value } => LiteralWord::Addr(constants.int_label(*value)),
        ExprKind::BooleanLiteral { value } if ty.is_unboxed() => LiteralWord::Imm(*value as i32),
        ExprKind::BooleanLiteral { value } => LiteralWord::Addr(constants.bool_label(*value)),
        ExprKind::StringLiteral { value } => LiteralWord::Addr(constants.str_label(value)),
        ExprKind::NoneLiteral => LiteralWord::Imm(0),
        _ => {
            warn!("non-literal initial value");
            LiteralWord::Imm(0)
        }
    }
}

// ==================== Emitter ====================

/// Where a variable lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum VarLocation {
    Global(usize),
    Hidden(Label),
    Frame(FuncId, Slot),
}

pub struct FuncEmitter<'e, 'a> {
    layout: &'e ProgramLayout<'a>,
    asm: &'e mut RiscVBackend,
    constants: &'e mut ConstantPool,
    regs: RegisterRing,
    /// Function being emitted; `None` for the top level
    func: Option<FuncId>,
    epilogue: Label,
    /// Variables bound by the enclosing comprehensions, innermost last
    comprehension_vars: Vec<(&'a str, VarLocation)>,
}

impl<'e, 'a> FuncEmitter<'e, 'a> {
    pub fn new(
        layout: &'e ProgramLayout<'a>,
        asm: &'e mut RiscVBackend,
        constants: &'e mut ConstantPool,
        func: Option<FuncId>,
    ) -> Self {
        let epilogue = asm.fresh_label();
        Self { layout, asm, constants, regs: RegisterRing::new(), func, epilogue, comprehension_vars: Vec::new() }
    }

    /// Emit the statements of the top level
    pub fn emit_top_level(mut self) {
        for stmt in self.layout.statements {
            self.emit_stmt(stmt);
        }
    }

    /// Emit the body of a user function: prologue, statements, epilogue
    pub fn emit_function(mut self) {
        let Some(id) = self.func else {
            warn!("emit_function called for the top level");
            return;
        };
        let layout = self.layout;
        let info = layout.func(id);
        let locals = info.locals.len() as i32;
        trace!("emitting {}", info.full_name);

        self.asm.global_label(&info.code_label());
        self.asm.addi(Register::Sp, Register::Sp, -2 * WORD, "reserve space for saved RA and FP");
        self.asm.sw(Register::Ra, Register::Sp, 0, "save return address");
        self.asm.sw(Register::Fp, Register::Sp, WORD, "save caller's frame pointer");
        self.asm.addi(Register::Fp, Register::Sp, 2 * WORD, "new frame pointer");
        if locals > 0 {
            self.asm.addi(Register::Sp, Register::Sp, -locals * WORD, "reserve space for locals");
        }
        self.init_locals(id);
        self.asm.local_label(&info.start_label(), "body of function");

        for stmt in info.statements {
            self.emit_stmt(stmt);
        }

        self.asm.mv(Register::A0, Register::Zero, "implicit None return");
        let epilogue = self.epilogue.clone();
        self.asm.local_label(&epilogue, "epilogue");
        self.asm.lw(Register::Ra, Register::Fp, -2 * WORD, "restore return address");
        self.asm.lw(Register::Fp, Register::Fp, -WORD, "restore caller's frame pointer");
        self.asm.addi(Register::Sp, Register::Sp, (2 + locals) * WORD, "pop frame");
        self.asm.jr(Register::Ra, "return to caller");
    }

    /// Store each local's declared initial value into its slot
    fn init_locals(&mut self, id: FuncId) {
        let layout = self.layout;
        for (j, local) in layout.func(id).locals.iter().enumerate() {
            let reg = self.regs.acquire(self.asm);
            self.load_literal(local.init, &local.ty, reg);
            let comment = if local.name.is_empty() { "comprehension variable".to_string() } else { format!("local {}", local.name) };
            self.asm.sw(reg, Register::Fp, Slot::Local(j).offset(), &comment);
            self.regs.release(self.asm, reg);
        }
    }

    fn load_literal(&mut self, init: Option<&Expr>, ty: &ValueType, dest: Register) {
        match literal_word(self.constants, init, ty) {
            LiteralWord::Imm(0) => self.asm.mv(dest, Register::Zero, ""),
            LiteralWord::Imm(value) => self.asm.li(dest, value, ""),
            LiteralWord::Addr(label) => self.asm.la(dest, &label, ""),
        }
    }

    // ==================== Variables ====================

    fn locate(&self, name: &str) -> Option<VarLocation> {
        if let Some((_, location)) = self.comprehension_vars.iter().rev().find(|(n, _)| *n == name) {
            return Some(location.clone());
        }
        match self.layout.resolve(self.func, name)? {
            SymbolInfo::Global(index) => Some(VarLocation::Global(index)),
            SymbolInfo::Stack(owner, slot) => Some(VarLocation::Frame(owner, slot)),
            SymbolInfo::Class(_) | SymbolInfo::Func(_) => None,
        }
    }

    /// Register addressing the frame of `owner`: `fp` for the current
    /// function, otherwise the static link loaded into `scratch`.
    fn frame_base(&mut self, owner: FuncId, scratch: Register) -> Register {
        let Some(current) = self.func else {
            warn!("frame variable referenced at the top level");
            return Register::Fp;
        };
        if owner == current {
            return Register::Fp;
        }
        let here = self.layout.func(current);
        let target = self.layout.func(owner);
        let Some(distance) = here.depth.checked_sub(target.depth + 1) else {
            warn!("{} is not enclosed by {}", here.full_name, target.full_name);
            return Register::Fp;
        };
        let offset = (here.params.len() + distance) as i32 * WORD;
        self.asm.lw(scratch, Register::Fp, offset, &format!("static link to {}", target.full_name));
        scratch
    }

    fn load_location(&mut self, location: &VarLocation, dest: Register, name: &str) {
        match location {
            VarLocation::Global(index) => {
                let global = self.layout.global(*index);
                if let Some(value) = global.const_int() {
                    self.asm.li(dest, value, &format!("constant {}", name));
                } else {
                    self.asm.la(dest, &global.label(), "");
                    self.asm.lw(dest, dest, 0, &format!("load global {}", name));
                }
            }
            VarLocation::Hidden(label) => {
                self.asm.la(dest, label, "");
                self.asm.lw(dest, dest, 0, &format!("load {}", name));
            }
            VarLocation::Frame(owner, slot) => {
                let base = self.frame_base(*owner, dest);
                self.asm.lw(dest, base, slot.offset(), &format!("load {}", name));
            }
        }
    }

    fn store_location(&mut self, location: &VarLocation, value: Register, name: &str) {
        match location {
            VarLocation::Global(index) => {
                let label = self.layout.global(*index).label();
                let tmp = self.regs.acquire(self.asm);
                self.asm.la(tmp, &label, "");
                self.asm.sw(value, tmp, 0, &format!("store global {}", name));
                self.regs.release(self.asm, tmp);
            }
            VarLocation::Hidden(label) => {
                let tmp = self.regs.acquire(self.asm);
                self.asm.la(tmp, label, "");
                self.asm.sw(value, tmp, 0, &format!("bind {}", name));
                self.regs.release(self.asm, tmp);
            }
            VarLocation::Frame(owner, slot) if Some(*owner) == self.func => {
                self.asm.sw(value, Register::Fp, slot.offset(), &format!("store {}", name));
            }
            VarLocation::Frame(owner, slot) => {
                let tmp = self.regs.acquire(self.asm);
                let base = self.frame_base(*owner, tmp);
                self.asm.sw(value, base, slot.offset(), &format!("store {}", name));
                self.regs.release(self.asm, tmp);
            }
        }
    }

    fn load_var(&mut self, name: &str, dest: Register) {
        match self.locate(name) {
            Some(location) => self.load_location(&location, dest, name),
            None => {
                warn!("no storage for variable {}", name);
                self.asm.mv(dest, Register::Zero, "");
            }
        }
    }

    fn store_var(&mut self, name: &str, value: Register) {
        match self.locate(name) {
            Some(location) => self.store_location(&location, value, name),
            None => warn!("no storage for variable {}", name),
        }
    }

    /// `expr` is the receiver of the current method and the method never
    /// reassigns it, so it cannot be None.
    fn is_constant_receiver(&self, expr: &Expr) -> bool {
        let Some(id) = self.func else {
            return false;
        };
        let info = self.layout.func(id);
        match (info.receiver(), expr.as_identifier()) {
            (Some(receiver), Some(name)) if info.receiver_constant && receiver == name => {
                self.locate(name) == Some(VarLocation::Frame(id, Slot::Param(0)))
            }
            _ => false,
        }
    }

    // ==================== Runtime Checks ====================

    fn none_check(&mut self, reg: Register) {
        let ok = self.asm.fresh_label();
        self.asm.bnez(reg, &ok, "ensure not None");
        self.asm.j(&RuntimeError::None.label(), "go to error handler");
        self.asm.local_label(&ok, "not None");
    }

    fn jump_to_error(&mut self, error: RuntimeError) {
        self.asm.j(&error.label(), "go to error handler");
    }

    /// Box an `int` or `bool` in `reg` when it flows into a slot of type
    /// `to` that holds references.
    fn box_value(&mut self, reg: Register, from: &ValueType, to: &ValueType) {
        if to.is_unboxed() {
            return;
        }
        let routine = if from.is_int() {
            "makeint"
        } else if from.is_bool() {
            "makebool"
        } else {
            return;
        };
        self.asm.mv(Register::A0, reg, "value to box");
        self.call_runtime(routine);
        self.asm.mv(reg, Register::A0, "boxed value");
    }

    /// `jal` to a runtime routine with the live registers saved around it
    fn call_runtime(&mut self, routine: &str) {
        self.regs.save_busy(self.asm);
        self.asm.jal(&Label::new(routine), "");
        self.regs.load_busy(self.asm);
    }

    /// Reserve `words` words for outgoing stack arguments
    fn push_region(&mut self, words: usize) {
        if words > 0 {
            self.asm.addi(Register::Sp, Register::Sp, -(words as i32) * WORD, "reserve argument space");
        }
    }

    fn pop_region(&mut self, words: usize) {
        if words > 0 {
            self.asm.addi(Register::Sp, Register::Sp, words as i32 * WORD, "pop arguments");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_words() {
        let mut pool = ConstantPool::new();
        let five = Expr::int(5);
        assert_eq!(literal_word(&mut pool, Some(&five), &ValueType::int()), LiteralWord::Imm(5));
        let boxed = literal_word(&mut pool, Some(&five), &ValueType::object());
        assert_eq!(boxed, LiteralWord::Addr(Label::new("const_2")));
        let yes = Expr::bool(true);
        assert_eq!(literal_word(&mut pool, Some(&yes), &ValueType::object()), LiteralWord::Addr(Label::new("const_1")));
        assert_eq!(literal_word(&mut pool, None, &ValueType::class("A")), LiteralWord::Imm(0));
    }

    #[test]
    fn test_error_labels() {
        let labels: Vec<_> = RuntimeError::ALL.iter().map(|e| e.label().as_str().to_string()).collect();
        assert_eq!(labels, vec!["error.Arg", "error.None", "error.Div", "error.OOB"]);
    }
}
