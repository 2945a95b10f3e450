//! Statement emission

use log::{trace, warn};

use super::expr::{literal_bool, type_of};
use super::FuncEmitter;
use crate::backend::riscv::asm::{AluOp, Branch, Label, Register};
use crate::frontend::ast::{Expr, ExprKind, Identifier, Stmt, StmtKind};
use crate::types::ValueType;

impl<'e, 'a> FuncEmitter<'e, 'a> {
    pub(super) fn emit_stmt(&mut self, stmt: &'a Stmt) {
        trace!("stmt at {}", stmt.span);
        match &stmt.kind {
            StmtKind::ExprStmt { expr } => {
                let reg = self.regs.acquire(self.asm);
                self.emit_expr(expr, reg);
                self.regs.release(self.asm, reg);
            }
            StmtKind::AssignStmt { targets, value } => self.emit_assign(targets, value),
            StmtKind::IfStmt { condition, then_body, else_body } => self.emit_if(condition, then_body, else_body),
            StmtKind::WhileStmt { condition, body } => self.emit_while(condition, body),
            StmtKind::ForStmt { identifier, iterable, body } => self.emit_for(identifier, iterable, body),
            StmtKind::ReturnStmt { value } => self.emit_return(value.as_ref()),
        }
    }

    fn emit_block(&mut self, body: &'a [Stmt]) {
        for stmt in body {
            self.emit_stmt(stmt);
        }
    }

    /// Evaluate `condition` and jump to `target` when it is false. A
    /// reload on release is hoisted above the branch so both paths leave
    /// the stack alike.
    fn branch_if_false(&mut self, condition: &'a Expr, target: &Label) {
        let reg = self.regs.acquire(self.asm);
        self.emit_expr(condition, reg);
        if self.regs.release_reloads() {
            self.asm.mv(Register::A0, reg, "");
            self.regs.release(self.asm, reg);
            self.asm.beqz(Register::A0, target, "condition is false");
        } else {
            self.asm.beqz(reg, target, "condition is false");
            self.regs.release(self.asm, reg);
        }
    }

    // ==================== Assignment ====================

    fn emit_assign(&mut self, targets: &'a [Expr], value: &'a Expr) {
        let value_ty = type_of(value);
        let reg = self.regs.acquire(self.asm);
        self.emit_expr(value, reg);
        for target in targets {
            let target_ty = type_of(target);
            let boxed = value_ty.is_unboxed() && !target_ty.is_unboxed();
            let stored = if boxed {
                let copy = self.regs.acquire(self.asm);
                self.asm.mv(copy, reg, "");
                self.box_value(copy, &value_ty, &target_ty);
                copy
            } else {
                reg
            };
            self.emit_store(target, stored);
            if boxed {
                self.regs.release(self.asm, stored);
            }
        }
        self.regs.release(self.asm, reg);
    }

    fn emit_store(&mut self, target: &'a Expr, value: Register) {
        match &target.kind {
            ExprKind::Identifier { name } => self.store_var(name, value),
            ExprKind::MemberExpr { object, member } => {
                let object_ty = type_of(object);
                let Some(offset) = self.layout.class_of(&object_ty).and_then(|c| c.attribute_offset(&member.name))
                else {
                    warn!("no attribute {} on {}", member.name, object_ty);
                    return;
                };
                let base = self.regs.acquire(self.asm);
                self.emit_expr(object, base);
                if !self.is_constant_receiver(object) {
                    self.none_check(base);
                }
                self.asm.sw(value, base, offset, &format!("set attribute {}", member.name));
                self.regs.release(self.asm, base);
            }
            ExprKind::IndexExpr { list, index } => {
                let base = self.regs.acquire(self.asm);
                self.emit_expr(list, base);
                let idx = self.regs.acquire(self.asm);
                self.emit_expr(index, idx);
                self.none_check(base);
                self.bounds_check(base, idx);
                self.asm.addi(idx, idx, 4, "skip list header");
                self.asm.slli(idx, idx, 2, "");
                self.asm.alu(AluOp::Add, idx, base, idx, "element address");
                self.asm.sw(value, idx, 0, "store element");
                self.regs.release(self.asm, idx);
                self.regs.release(self.asm, base);
            }
            _ => warn!("unsupported assignment target at {}", target.span),
        }
    }

    // ==================== Control Flow ====================

    fn emit_if(&mut self, condition: &'a Expr, then_body: &'a [Stmt], else_body: &'a [Stmt]) {
        match literal_bool(condition) {
            Some(true) => return self.emit_block(then_body),
            Some(false) => return self.emit_block(else_body),
            None => {}
        }
        let otherwise = self.asm.fresh_label();
        let done = self.asm.fresh_label();
        self.branch_if_false(condition, &otherwise);
        self.emit_block(then_body);
        if !else_body.is_empty() {
            self.asm.j(&done, "");
        }
        self.asm.local_label(&otherwise, "else branch");
        self.emit_block(else_body);
        if !else_body.is_empty() {
            self.asm.local_label(&done, "end of if");
        }
    }

    fn emit_while(&mut self, condition: &'a Expr, body: &'a [Stmt]) {
        let literal = literal_bool(condition);
        if literal == Some(false) {
            return;
        }
        let top = self.asm.fresh_label();
        let done = self.asm.fresh_label();
        self.asm.local_label(&top, "while loop");
        if literal.is_none() {
            self.branch_if_false(condition, &done);
        }
        self.emit_block(body);
        self.asm.j(&top, "");
        self.asm.local_label(&done, "end of while");
    }

    /// `for x in iterable`: the length is read once since lists and strings
    /// never change size.
    fn emit_for(&mut self, identifier: &'a Identifier, iterable: &'a Expr, body: &'a [Stmt]) {
        let seq_ty = type_of(iterable);
        let var_ty = identifier.inferred_type.as_ref().and_then(|t| t.as_value()).cloned();
        let element_ty = seq_ty.element_type().cloned().unwrap_or_else(ValueType::object);

        let seq = self.regs.acquire(self.asm);
        self.emit_expr(iterable, seq);
        if !seq_ty.is_str() {
            self.none_check(seq);
        }
        let len = self.regs.acquire(self.asm);
        let index = self.regs.acquire(self.asm);
        self.asm.lw_sym(len, seq, "@.__len__", "iteration count");
        self.asm.mv(index, Register::Zero, "");

        let top = self.asm.fresh_label();
        let done = self.asm.fresh_label();
        self.asm.local_label(&top, "for loop");
        self.asm.branch(Branch::Bge, index, len, &done, "");
        let item = self.regs.acquire(self.asm);
        if seq_ty.is_str() {
            self.emit_string_char(seq, index, item);
        } else {
            self.emit_list_element(seq, index, item);
            if let Some(var_ty) = &var_ty {
                self.box_value(item, &element_ty, var_ty);
            }
        }
        self.store_var(&identifier.name, item);
        self.regs.release(self.asm, item);
        self.asm.addi(index, index, 1, "advance");
        self.emit_block(body);
        self.asm.j(&top, "");
        self.asm.local_label(&done, "end of for");
        self.regs.release(self.asm, index);
        self.regs.release(self.asm, len);
        self.regs.release(self.asm, seq);
    }

    fn emit_return(&mut self, value: Option<&'a Expr>) {
        let Some(current) = self.func else {
            warn!("return outside of a function");
            return;
        };
        if let Some(value) = value {
            if self.try_tail_call(value) {
                return;
            }
        }
        let layout = self.layout;
        let ret = &layout.func(current).ret;
        let reg = self.regs.acquire(self.asm);
        match value {
            Some(value) => {
                self.emit_expr(value, reg);
                self.box_value(reg, &type_of(value), ret);
                self.asm.mv(Register::A0, reg, "return value");
            }
            None => self.asm.mv(Register::A0, Register::Zero, "return None"),
        }
        self.regs.release(self.asm, reg);
        self.regs.force_free(self.asm);
        let epilogue = self.epilogue.clone();
        self.asm.j(&epilogue, "go to return");
    }
}
