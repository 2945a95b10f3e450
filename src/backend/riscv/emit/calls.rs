//! Calls: user functions, builtins, constructors, method dispatch and
//! self tail calls

use log::warn;

use super::expr::type_of;
use super::{FuncEmitter, RuntimeError};
use crate::backend::riscv::asm::{Label, Register};
use crate::backend::riscv::descriptors::{
    Builtin, ClassIndex, FuncId, Slot, SymbolInfo, BOOL_TAG, INT_TAG, STR_TAG, WORD,
};
use crate::frontend::ast::{Expr, ExprKind, Identifier};
use crate::types::ValueType;

impl<'e, 'a> FuncEmitter<'e, 'a> {
    /// Declared type of parameter `index` of `func`
    fn param_type(&self, func: FuncId, index: usize) -> ValueType {
        self.layout.func(func).params.get(index).map(|p| p.ty.clone()).unwrap_or_else(ValueType::object)
    }

    /// Evaluate `arg`, box it for parameter `index` of `func` and store it
    /// at `offset(sp)`.
    fn emit_stack_arg(&mut self, arg: &'a Expr, func: FuncId, index: usize, offset: i32) {
        let param_ty = self.param_type(func, index);
        let reg = self.regs.acquire(self.asm);
        self.emit_expr(arg, reg);
        self.box_value(reg, &type_of(arg), &param_ty);
        self.asm.sw(reg, Register::Sp, offset, &format!("argument {}", index));
        self.regs.release(self.asm, reg);
    }

    pub(super) fn emit_call(&mut self, function: &'a Identifier, args: &'a [Expr], dest: Register) {
        let layout = self.layout;
        match layout.resolve(self.func, &function.name) {
            Some(SymbolInfo::Class(index)) => self.emit_construct(index, args, dest),
            Some(SymbolInfo::Func(id)) => match layout.func(id).builtin {
                Some(Builtin::Print) => self.emit_print(args, dest),
                Some(Builtin::Len) => self.emit_len(args, dest),
                Some(Builtin::Input) => {
                    self.call_runtime("$input");
                    self.asm.mv(dest, Register::A0, "line read");
                }
                Some(Builtin::ObjectInit) | None => self.emit_user_call(id, args, dest),
            },
            _ => {
                warn!("{} is not callable", function.name);
                self.asm.mv(dest, Register::Zero, "");
            }
        }
    }

    // ==================== Functions ====================

    /// Arguments go at `0..n` words above `sp`, followed by the static
    /// links of the callee's enclosing functions, innermost first.
    fn emit_user_call(&mut self, callee: FuncId, args: &'a [Expr], dest: Register) {
        let layout = self.layout;
        let info = layout.func(callee);
        let words = args.len() + info.depth;
        self.regs.save_busy(self.asm);
        self.push_region(words);
        self.emit_static_links(callee, args.len());
        for (i, arg) in args.iter().enumerate() {
            self.emit_stack_arg(arg, callee, i, i as i32 * WORD);
        }
        self.asm.jal(&info.code_label(), &format!("call {}", info.full_name));
        self.pop_region(words);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "returned value");
    }

    /// Store the frame pointer of every function enclosing `callee`. The
    /// caller is either one of them or nested in one, so each link is
    /// either `fp` or copied from the caller's own links.
    fn emit_static_links(&mut self, callee: FuncId, nargs: usize) {
        let layout = self.layout;
        let depth = layout.func(callee).depth;
        if depth == 0 {
            return;
        }
        let Some(current) = self.func else {
            warn!("nested function {} called from the top level", layout.func(callee).full_name);
            return;
        };
        let here = layout.func(current);
        for k in 0..depth {
            let offset = (nargs + depth - k - 1) as i32 * WORD;
            if k == here.depth {
                self.asm.sw(Register::Fp, Register::Sp, offset, "static link");
            } else if k < here.depth {
                let link = (here.params.len() + here.depth - k - 1) as i32 * WORD;
                let reg = self.regs.acquire(self.asm);
                self.asm.lw(reg, Register::Fp, link, "");
                self.asm.sw(reg, Register::Sp, offset, "static link");
                self.regs.release(self.asm, reg);
            } else {
                warn!("{} is not visible from {}", layout.func(callee).full_name, here.full_name);
            }
        }
    }

    // ==================== Builtins ====================

    fn emit_print(&mut self, args: &'a [Expr], dest: Register) {
        let Some(arg) = args.first() else {
            warn!("print without an argument");
            self.asm.mv(dest, Register::Zero, "");
            return;
        };
        let arg_ty = type_of(arg);
        if arg_ty.is_none() {
            self.emit_expr(arg, dest);
            self.jump_to_error(RuntimeError::Arg);
            return;
        }
        self.emit_runtime_unary(arg, &arg_ty, "$print", dest);
    }

    fn emit_len(&mut self, args: &'a [Expr], dest: Register) {
        let Some(arg) = args.first() else {
            warn!("len without an argument");
            self.asm.mv(dest, Register::Zero, "");
            return;
        };
        let arg_ty = type_of(arg);
        if arg_ty.is_unboxed() || arg_ty.is_none() {
            self.emit_expr(arg, dest);
            self.jump_to_error(RuntimeError::Arg);
            return;
        }
        self.emit_runtime_unary(arg, &arg_ty, "$len", dest);
    }

    fn emit_runtime_unary(&mut self, arg: &'a Expr, arg_ty: &ValueType, routine: &str, dest: Register) {
        self.regs.save_busy(self.asm);
        self.push_region(1);
        let reg = self.regs.acquire(self.asm);
        self.emit_expr(arg, reg);
        self.box_value(reg, arg_ty, &ValueType::object());
        self.asm.sw(reg, Register::Sp, 0, "");
        self.regs.release(self.asm, reg);
        self.asm.jal(&Label::new(routine), "");
        self.pop_region(1);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "");
    }

    // ==================== Objects ====================

    /// Allocate from the prototype, then run `__init__` on the new object
    fn emit_construct(&mut self, index: ClassIndex, args: &'a [Expr], dest: Register) {
        let layout = self.layout;
        let class = layout.class(index);
        match class.tag {
            INT_TAG | BOOL_TAG => return self.asm.li(dest, 0, &format!("default {}", class.name)),
            STR_TAG => {
                let empty = self.constants.str_label("");
                return self.asm.la(dest, &empty, "empty string");
            }
            _ => {}
        }
        let Some((slot, init)) = class.method("__init__") else {
            warn!("class {} has no __init__", class.name);
            self.asm.mv(dest, Register::Zero, "");
            return;
        };
        let words = args.len() + 1;
        self.regs.save_busy(self.asm);
        self.asm.la(Register::A0, &class.prototype_label(), &format!("prototype of {}", class.name));
        self.asm.jal(&Label::new("alloc"), "allocate object");
        self.push_region(words);
        self.asm.sw(Register::A0, Register::Sp, 0, "receiver");
        for (i, arg) in args.iter().enumerate() {
            self.emit_stack_arg(arg, init, i + 1, (i as i32 + 1) * WORD);
        }
        self.emit_dispatch(slot, "__init__");
        self.asm.lw(Register::A0, Register::Sp, 0, "new object");
        self.pop_region(words);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "");
    }

    /// Call slot `slot` of the dispatch table of the receiver at `0(sp)`
    fn emit_dispatch(&mut self, slot: usize, name: &str) {
        self.asm.lw(Register::A0, Register::Sp, 0, "");
        self.asm.lw(Register::A1, Register::A0, 2 * WORD, "dispatch table");
        self.asm.lw(Register::A1, Register::A1, slot as i32 * WORD, &format!("method {}", name));
        self.asm.jalr(Register::A1, "");
    }

    pub(super) fn emit_method_call(&mut self, method: &'a Expr, args: &'a [Expr], dest: Register) {
        let layout = self.layout;
        let Some((object, member)) = method.as_member() else {
            warn!("method call without a member target");
            self.asm.mv(dest, Register::Zero, "");
            return;
        };
        let object_ty = type_of(object);
        let Some((slot, func)) = layout.class_of(&object_ty).and_then(|c| c.method(&member.name)) else {
            warn!("no method {} on {}", member.name, object_ty);
            self.asm.mv(dest, Register::Zero, "");
            return;
        };
        self.emit_expr(object, dest);
        if !object_ty.is_special() && !self.is_constant_receiver(object) {
            self.none_check(dest);
        }
        self.box_value(dest, &object_ty, &ValueType::object());

        let words = args.len() + 1;
        self.regs.save_busy(self.asm);
        self.push_region(words);
        self.asm.sw(dest, Register::Sp, 0, "receiver");
        for (i, arg) in args.iter().enumerate() {
            self.emit_stack_arg(arg, func, i + 1, (i as i32 + 1) * WORD);
        }
        self.emit_dispatch(slot, &member.name);
        self.pop_region(words);
        self.regs.load_busy(self.asm);
        self.asm.mv(dest, Register::A0, "returned value");
    }

    // ==================== Tail Calls ====================

    /// `return f(..)` inside `f` itself, or `return o.m(..)` inside `m`
    /// when dispatch cannot pick another body: rebind the parameters and
    /// jump back to the start of the body.
    pub(super) fn try_tail_call(&mut self, value: &'a Expr) -> bool {
        let layout = self.layout;
        let Some(current) = self.func else {
            return false;
        };
        let (receiver, args) = match &value.kind {
            ExprKind::CallExpr { function, args } => {
                if layout.resolve(self.func, &function.name) != Some(SymbolInfo::Func(current)) {
                    return false;
                }
                (None, args)
            }
            ExprKind::MethodCallExpr { method, args } => {
                let Some((object, member)) = method.as_member() else {
                    return false;
                };
                let target = layout.class_of(&type_of(object)).and_then(|c| c.method(&member.name));
                if target.map(|(_, id)| id) != Some(current) || layout.overridden_below(current) {
                    return false;
                }
                (Some(object), args)
            }
            _ => return false,
        };
        let values: Vec<&'a Expr> = receiver.into_iter().chain(args.iter()).collect();
        if values.len() != layout.func(current).params.len() {
            return false;
        }
        self.emit_tail_call(current, receiver.is_some(), &values);
        true
    }

    fn emit_tail_call(&mut self, current: FuncId, has_receiver: bool, values: &[&'a Expr]) {
        let layout = self.layout;
        let info = layout.func(current);
        let words = values.len();
        // Start from an empty ring so no spill lands among the staged words
        self.regs.save_busy(self.asm);
        self.push_region(words);
        for (i, &value) in values.iter().enumerate() {
            let reg = self.regs.acquire(self.asm);
            self.emit_expr(value, reg);
            if i == 0 && has_receiver && !self.is_constant_receiver(value) {
                self.none_check(reg);
            }
            self.box_value(reg, &type_of(value), &info.params[i].ty);
            self.asm.sw(reg, Register::Sp, i as i32 * WORD, &format!("new {}", info.params[i].name));
            self.regs.release(self.asm, reg);
        }
        let reg = self.regs.acquire(self.asm);
        for i in 0..words {
            self.asm.lw(reg, Register::Sp, i as i32 * WORD, "");
            self.asm.sw(reg, Register::Fp, Slot::Param(i).offset(), "");
        }
        self.regs.release(self.asm, reg);
        self.pop_region(words);
        self.init_locals(current);
        self.regs.load_busy(self.asm);
        self.regs.force_free(self.asm);
        self.asm.j(&info.start_label(), &format!("tail call to {}", info.full_name));
    }
}
