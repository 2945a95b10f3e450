//! Expression emission

use log::{trace, warn};

use super::{FuncEmitter, RuntimeError, VarLocation};
use crate::backend::riscv::asm::{AluOp, Branch, Label, Register};
use crate::backend::riscv::descriptors::WORD;
use crate::frontend::ast::{BinOp, Expr, ExprKind, Identifier, UnaryOp};
use crate::types::ValueType;

/// Inferred type of an expression, `object` when analysis left none
pub(super) fn type_of(expr: &Expr) -> ValueType {
    expr.value_type().cloned().unwrap_or_else(ValueType::object)
}

/// Value of a `True`/`False` literal
pub(super) fn literal_bool(expr: &Expr) -> Option<bool> {
    match expr.kind {
        ExprKind::BooleanLiteral { value } => Some(value),
        _ => None,
    }
}

/// Byte of a one-character string literal
fn one_char(expr: &Expr) -> Option<u8> {
    match &expr.kind {
        ExprKind::StringLiteral { value } if value.len() == 1 => value.bytes().next(),
        _ => None,
    }
}

/// Size in bytes of an interned one-character string
const CHAR_OBJECT_SIZE: i32 = 20;

impl<'e, 'a> FuncEmitter<'e, 'a> {
    /// Evaluate `expr` into `dest`
    pub(super) fn emit_expr(&mut self, expr: &'a Expr, dest: Register) {
        trace!("expr at {} into {}", expr.span, dest);
        match &expr.kind {
            ExprKind::IntegerLiteral { value } => self.asm.li(dest, *value, "load integer literal"),
            ExprKind::BooleanLiteral { value } => self.asm.li(dest, *value as i32, "load boolean literal"),
            ExprKind::StringLiteral { value } => {
                let label = self.constants.str_label(value);
                self.asm.la(dest, &label, "load string literal");
            }
            ExprKind::NoneLiteral => self.asm.mv(dest, Register::Zero, "load None"),
            ExprKind::Identifier { name } => self.load_var(name, dest),
            ExprKind::BinaryExpr { left, operator, right } => self.emit_binary(expr, left, *operator, right, dest),
            ExprKind::UnaryExpr { operator, operand } => {
                self.emit_expr(operand, dest);
                match operator {
                    UnaryOp::Neg => self.asm.alu(AluOp::Sub, dest, Register::Zero, dest, "negate"),
                    UnaryOp::Not => self.asm.seqz(dest, dest, "logical not"),
                }
            }
            ExprKind::IfExpr { condition, then_expr, else_expr } => {
                self.emit_if_expr(expr, condition, then_expr, else_expr, dest)
            }
            ExprKind::ListExpr { elements } => self.emit_list(expr, elements, dest),
            ExprKind::ForListExpr { element, identifier, iterable } => {
                self.emit_comprehension(expr, element, identifier, iterable, dest)
            }
            ExprKind::IndexExpr { list, index } => self.emit_index(list, index, dest),
            ExprKind::MemberExpr { object, member } => self.emit_member(object, member, dest),
            ExprKind::CallExpr { function, args } => self.emit_call(function, args, dest),
            ExprKind::MethodCallExpr { method, args } => self.emit_method_call(method, args, dest),
        }
    }

    // ==================== Operators ====================

    fn emit_binary(&mut self, expr: &'a Expr, left: &'a Expr, op: BinOp, right: &'a Expr, dest: Register) {
        let left_ty = type_of(left);
        let right_ty = type_of(right);
        match op {
            BinOp::And | BinOp::Or => {
                let done = self.asm.fresh_label();
                self.emit_expr(left, dest);
                if op == BinOp::And {
                    self.asm.beqz(dest, &done, "short-circuit and");
                } else {
                    self.asm.bnez(dest, &done, "short-circuit or");
                }
                self.emit_expr(right, dest);
                self.asm.local_label(&done, "");
                return;
            }
            BinOp::Eq | BinOp::Ne if left_ty.is_str() && right_ty.is_str() => {
                let negate = op == BinOp::Ne;
                if let Some(byte) = one_char(right) {
                    self.emit_one_char_eq(left, byte, negate, dest);
                } else if let Some(byte) = one_char(left) {
                    self.emit_one_char_eq(right, byte, negate, dest);
                } else {
                    self.emit_runtime_binary(left, right, if negate { "strneql" } else { "streql" }, dest);
                }
                return;
            }
            BinOp::Add if left_ty.is_str() && right_ty.is_str() => {
                self.emit_runtime_binary(left, right, "strcat", dest);
                return;
            }
            BinOp::Add if type_of(expr).is_list() => {
                self.emit_concat(expr, left, right, dest);
                return;
            }
            _ => {}
        }

        self.emit_expr(left, dest);
        let rhs = self.regs.acquire(self.asm);
        self.emit_expr(right, rhs);
        match op {
            BinOp::Add => self.asm.alu(AluOp::Add, dest, dest, rhs, "add"),
            BinOp::Sub => self.asm.alu(AluOp::Sub, dest, dest, rhs, "subtract"),
            BinOp::Mul => self.asm.alu(AluOp::Mul, dest, dest, rhs, "multiply"),
            BinOp::FloorDiv => {
                self.divisor_check(rhs);
                self.emit_floor_div(dest, rhs);
            }
            BinOp::Mod => {
                self.divisor_check(rhs);
                self.emit_modulo(dest, rhs);
            }
            BinOp::Lt => self.asm.alu(AluOp::Slt, dest, dest, rhs, "less than"),
            BinOp::Gt => self.asm.alu(AluOp::Slt, dest, rhs, dest, "greater than"),
            BinOp::Le => {
                self.asm.alu(AluOp::Slt, dest, rhs, dest, "");
                self.asm.xori(dest, dest, 1, "less or equal");
            }
            BinOp::Ge => {
                self.asm.alu(AluOp::Slt, dest, dest, rhs, "");
                self.asm.xori(dest, dest, 1, "greater or equal");
            }
            BinOp::Eq | BinOp::Is => {
                self.asm.alu(AluOp::Xor, dest, dest, rhs, "");
                self.asm.seqz(dest, dest, if op == BinOp::Is { "same object" } else { "equal" });
            }
            BinOp::Ne => {
                self.asm.alu(AluOp::Xor, dest, dest, rhs, "");
                self.asm.snez(dest, dest, "not equal");
            }
            BinOp::And | BinOp::Or => warn!("short-circuit operator reached arithmetic emission"),
        }
        self.regs.release(self.asm, rhs);
    }

    fn divisor_check(&mut self, divisor: Register) {
        let ok = self.asm.fresh_label();
        self.asm.bnez(divisor, &ok, "ensure non-zero divisor");
        self.jump_to_error(RuntimeError::Div);
        self.asm.local_label(&ok, "divisor is non-zero");
    }

    /// Quotient rounded toward negative infinity: truncate, then step down
    /// when the remainder is non-zero and its sign differs from the divisor's.
    fn emit_floor_div(&mut self, dest: Register, divisor: Register) {
        let rem = self.regs.acquire(self.asm);
        let done = self.asm.fresh_label();
        self.asm.alu(AluOp::Rem, rem, dest, divisor, "");
        self.asm.alu(AluOp::Div, dest, dest, divisor, "truncated quotient");
        self.asm.beqz(rem, &done, "exact division");
        self.asm.alu(AluOp::Xor, rem, rem, divisor, "");
        self.asm.bgez(rem, &done, "remainder and divisor agree in sign");
        self.asm.addi(dest, dest, -1, "round toward negative infinity");
        self.asm.local_label(&done, "");
        self.regs.release(self.asm, rem);
    }

    /// Remainder taking the sign of the divisor
    fn emit_modulo(&mut self, dest: Register, divisor: Register) {
        let rem = self.regs.acquire(self.asm);
        let done = self.asm.fresh_label();
        self.asm.alu(AluOp::Rem, rem, dest, divisor, "");
        self.asm.mv(dest, rem, "truncated remainder");
        self.asm.beqz(rem, &done, "zero remainder");
        self.asm.alu(AluOp::Xor, rem, rem, divisor, "");
        self.asm.bgez(rem, &done, "remainder and divisor agree in sign");
        self.asm.alu(AluOp::Add, dest, dest, divisor, "adjust toward divisor's sign");
        self.asm.local_label(&done, "");
        self.regs.release(self.asm, rem);
    }

    /// `s == "c"` without a runtime call: length one and matching byte
    fn emit_one_char_eq(&mut self, other: &'a Expr, byte: u8, negate: bool, dest: Register) {
        self.emit_expr(other, dest);
        let tmp = self.regs.acquire(self.asm);
        let mismatch = self.asm.fresh_label();
        let done = self.asm.fresh_label();
        self.asm.lw_sym(tmp, dest, "@.__len__", "string length");
        self.asm.addi(tmp, tmp, -1, "");
        self.asm.bnez(tmp, &mismatch, "not a one-character string");
        self.asm.lbu_sym(tmp, dest, "@.__str__", "first character");
        self.asm.addi(tmp, tmp, -i32::from(byte), &format!("compare with {:?}", byte as char));
        if negate {
            self.asm.snez(dest, tmp, "");
        } else {
            self.asm.seqz(dest, tmp, "");
        }
        self.asm.j(&done, "");
        self.asm.local_label(&mismatch, "");
        self.asm.li(dest, negate as i32, "lengths differ");
        self.asm.local_label(&done, "");
        self.regs.release(self.asm, tmp);
    }

    /// Two-operand runtime routine. `strcat` takes the right operand at
    /// the lower address; the comparisons take the left one there.
    fn emit_runtime_binary(&mut self, left: &'a Expr, right: &'a Expr, routine: &str, dest: Register) {
        self.emit_expr(left, dest);
        let rhs = self.regs.acquire(self.asm);
        self.emit_expr(right, rhs);
        let (first, second) = if routine == "strcat" { (rhs, dest) } else { (dest, rhs) };
        self.regs.save_busy(self.asm);
        self.push_region(2);
        self.asm.sw(first, Register::Sp, 0, "");
        self.asm.sw(second, Register::Sp, WORD, "");
        self.asm.jal(&Label::new(routine), "");
        self.pop_region(2);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, &format!("result of {}", routine));
        self.regs.release(self.asm, rhs);
    }

    fn emit_concat(&mut self, expr: &'a Expr, left: &'a Expr, right: &'a Expr, dest: Register) {
        let result = type_of(expr).element_type().cloned().unwrap_or_else(ValueType::object);
        let conversion = |side: &ValueType| match side.element_type() {
            Some(elem) if elem.is_int() && !result.is_unboxed() => "makeint",
            Some(elem) if elem.is_bool() && !result.is_unboxed() => "makebool",
            _ => "noconv",
        };
        let left_conv = conversion(&type_of(left));
        let right_conv = conversion(&type_of(right));

        self.emit_expr(left, dest);
        self.none_check(dest);
        let rhs = self.regs.acquire(self.asm);
        self.emit_expr(right, rhs);
        self.none_check(rhs);
        self.regs.save_busy(self.asm);
        self.push_region(4);
        self.asm.sw(rhs, Register::Sp, 0, "right list");
        self.asm.sw(dest, Register::Sp, WORD, "left list");
        let tmp = self.regs.acquire(self.asm);
        self.asm.la(tmp, &Label::new(right_conv), "");
        self.asm.sw(tmp, Register::Sp, 2 * WORD, "right element conversion");
        self.asm.la(tmp, &Label::new(left_conv), "");
        self.asm.sw(tmp, Register::Sp, 3 * WORD, "left element conversion");
        self.regs.release(self.asm, tmp);
        self.asm.jal(&Label::new("concat"), "");
        self.pop_region(4);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "concatenated list");
        self.regs.release(self.asm, rhs);
    }

    // ==================== Conditionals and Lists ====================

    fn emit_if_expr(
        &mut self,
        expr: &'a Expr,
        condition: &'a Expr,
        then_expr: &'a Expr,
        else_expr: &'a Expr,
        dest: Register,
    ) {
        let result = type_of(expr);
        match literal_bool(condition) {
            Some(true) => return self.emit_branch_value(then_expr, &result, dest),
            Some(false) => return self.emit_branch_value(else_expr, &result, dest),
            None => {}
        }
        let otherwise = self.asm.fresh_label();
        let done = self.asm.fresh_label();
        self.emit_expr(condition, dest);
        self.asm.beqz(dest, &otherwise, "condition is false");
        self.emit_branch_value(then_expr, &result, dest);
        self.asm.j(&done, "");
        self.asm.local_label(&otherwise, "");
        self.emit_branch_value(else_expr, &result, dest);
        self.asm.local_label(&done, "");
    }

    fn emit_branch_value(&mut self, branch: &'a Expr, result: &ValueType, dest: Register) {
        self.emit_expr(branch, dest);
        self.box_value(dest, &type_of(branch), result);
    }

    fn emit_list(&mut self, expr: &'a Expr, elements: &'a [Expr], dest: Register) {
        let element_ty = type_of(expr).element_type().cloned().unwrap_or_else(ValueType::object);
        let words = elements.len() + 1;
        self.regs.save_busy(self.asm);
        self.push_region(words);
        let tmp = self.regs.acquire(self.asm);
        self.asm.li(tmp, elements.len() as i32, "list length");
        self.asm.sw(tmp, Register::Sp, 0, "");
        self.regs.release(self.asm, tmp);
        for (i, element) in elements.iter().enumerate() {
            let reg = self.regs.acquire(self.asm);
            self.emit_expr(element, reg);
            self.box_value(reg, &type_of(element), &element_ty);
            self.asm.sw(reg, Register::Sp, (i as i32 + 1) * WORD, &format!("element {}", i));
            self.regs.release(self.asm, reg);
        }
        self.asm.jal(&Label::new("conslist"), "build list");
        self.pop_region(words);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "new list");
    }

    /// `[element for identifier in iterable]`: the runtime's `conslist`
    /// takes the elements from a stack region sized by the iterable.
    fn emit_comprehension(
        &mut self,
        expr: &'a Expr,
        element: &'a Expr,
        identifier: &'a Identifier,
        iterable: &'a Expr,
        dest: Register,
    ) {
        let location = match self.func {
            Some(id) => self.layout.func(id).comprehension_slot(expr.id).map(|slot| VarLocation::Frame(id, slot)),
            None => self.layout.hidden_global(expr.id).cloned().map(VarLocation::Hidden),
        };
        let Some(location) = location else {
            warn!("no slot for comprehension variable {}", identifier.name);
            self.asm.mv(dest, Register::Zero, "");
            return;
        };
        let element_ty = type_of(expr).element_type().cloned().unwrap_or_else(ValueType::object);

        self.regs.save_busy(self.asm);
        let list = self.regs.acquire(self.asm);
        self.emit_expr(iterable, list);
        self.none_check(list);
        let len = self.regs.acquire(self.asm);
        let index = self.regs.acquire(self.asm);
        self.asm.lw_sym(len, list, "@.__len__", "source length");
        self.asm.addi(index, len, 1, "");
        self.asm.slli(index, index, 2, "");
        self.asm.alu(AluOp::Sub, Register::Sp, Register::Sp, index, "reserve conslist arguments");
        self.asm.sw(len, Register::Sp, 0, "result length");
        self.asm.mv(index, Register::Zero, "");

        let top = self.asm.fresh_label();
        let done = self.asm.fresh_label();
        self.asm.local_label(&top, "comprehension loop");
        self.asm.branch(Branch::Bge, index, len, &done, "");
        let item = self.regs.acquire(self.asm);
        self.emit_list_element(list, index, item);
        self.store_location(&location, item, &identifier.name);
        self.regs.release(self.asm, item);

        self.comprehension_vars.push((identifier.name.as_str(), location));
        let value = self.regs.acquire(self.asm);
        self.emit_expr(element, value);
        self.box_value(value, &type_of(element), &element_ty);
        let slot = self.regs.acquire(self.asm);
        self.asm.slli(slot, index, 2, "");
        self.asm.alu(AluOp::Add, slot, Register::Sp, slot, "");
        self.asm.sw(value, slot, WORD, "store result element");
        self.regs.release(self.asm, slot);
        self.regs.release(self.asm, value);
        self.comprehension_vars.pop();

        self.asm.addi(index, index, 1, "");
        self.asm.j(&top, "");
        self.asm.local_label(&done, "");
        self.regs.release(self.asm, index);
        self.regs.release(self.asm, len);
        self.regs.release(self.asm, list);

        self.asm.jal(&Label::new("conslist"), "build list");
        let size = self.regs.acquire(self.asm);
        self.asm.lw_sym(size, Register::A0, "@.__len__", "");
        self.asm.addi(size, size, 1, "");
        self.asm.slli(size, size, 2, "");
        self.asm.alu(AluOp::Add, Register::Sp, Register::Sp, size, "pop conslist arguments");
        self.regs.release(self.asm, size);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "new list");
    }

    // ==================== Indexing and Members ====================

    /// Branch to `error.OOB` unless `0 <= index < len(seq)`
    pub(super) fn bounds_check(&mut self, seq: Register, index: Register) {
        let len = self.regs.acquire(self.asm);
        let ok = self.asm.fresh_label();
        self.asm.lw_sym(len, seq, "@.__len__", "length");
        self.asm.branch(Branch::Bltu, index, len, &ok, "index within bounds");
        self.jump_to_error(RuntimeError::Oob);
        self.asm.local_label(&ok, "");
        self.regs.release(self.asm, len);
    }

    /// Load element `index` of `list` into `dest`
    pub(super) fn emit_list_element(&mut self, list: Register, index: Register, dest: Register) {
        self.asm.addi(dest, index, 4, "skip list header");
        self.asm.slli(dest, dest, 2, "");
        self.asm.alu(AluOp::Add, dest, list, dest, "element address");
        self.asm.lw(dest, dest, 0, "load element");
    }

    /// Interned one-character string for byte `index` of `string`
    pub(super) fn emit_string_char(&mut self, string: Register, index: Register, dest: Register) {
        self.asm.require_init_chars();
        let tmp = self.regs.acquire(self.asm);
        self.asm.alu(AluOp::Add, dest, string, index, "");
        self.asm.lbu_sym(dest, dest, "@.__str__", "load character");
        self.asm.li(tmp, CHAR_OBJECT_SIZE, "");
        self.asm.alu(AluOp::Mul, dest, dest, tmp, "");
        self.asm.la(tmp, &Label::new("allChars"), "");
        self.asm.alu(AluOp::Add, dest, tmp, dest, "one-character string");
        self.regs.release(self.asm, tmp);
    }

    fn emit_index(&mut self, list: &'a Expr, index: &'a Expr, dest: Register) {
        let seq_ty = type_of(list);
        self.emit_expr(list, dest);
        let idx = self.regs.acquire(self.asm);
        self.emit_expr(index, idx);
        if !seq_ty.is_str() {
            self.none_check(dest);
        }
        self.bounds_check(dest, idx);
        if seq_ty.is_str() {
            self.emit_string_char(dest, idx, dest);
        } else {
            self.emit_list_element(dest, idx, idx);
            self.asm.mv(dest, idx, "");
        }
        self.regs.release(self.asm, idx);
    }

    fn emit_member(&mut self, object: &'a Expr, member: &Identifier, dest: Register) {
        let object_ty = type_of(object);
        self.emit_expr(object, dest);
        let Some(offset) = self.layout.class_of(&object_ty).and_then(|c| c.attribute_offset(&member.name)) else {
            warn!("no attribute {} on {}", member.name, object_ty);
            return;
        };
        if !object_ty.is_special() && !self.is_constant_receiver(object) {
            self.none_check(dest);
        }
        self.asm.lw(dest, dest, offset, &format!("get attribute {}", member.name));
    }
}
