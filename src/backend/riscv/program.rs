//! RISC-V program generator
//!
//! Lays out the whole assembly file: symbolic constants, class prototypes
//! and dispatch tables, global variables, the `main` entry point, every
//! user function, the error exits and finally the constant pool. The
//! runtime library (`alloc`, `conslist`, `$print`, ...) is linked in by
//! the simulator.

use log::{debug, info};

use super::asm::{AluOp, Label, Register, RiscVBackend};
use super::constants::ConstantPool;
use super::descriptors::{ClassInfo, ProgramLayout, BOOL_TAG, HEADER_WORDS, INT_TAG, LIST_TAG, STR_TAG, WORD};
use super::emit::{literal_word, FuncEmitter, LiteralWord, RuntimeError};
use crate::backend::codegen::CodeGen;
use crate::frontend::ast::Program;
use crate::utils::{Error, Result};

/// Largest heap size `lui` can load without setting the sign bit
const MAX_HEAP_PAGES: u32 = 0x80000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeGenOptions {
    /// Heap size in 4 KiB pages
    pub heap_pages: u32,
}

impl Default for CodeGenOptions {
    fn default() -> Self {
        Self { heap_pages: 8192 }
    }
}

/// Generator of RV32IM assembly for the venus-style simulator
#[derive(Debug, Default)]
pub struct RiscVCodeGen {
    options: CodeGenOptions,
}

impl RiscVCodeGen {
    pub fn new(options: CodeGenOptions) -> Self {
        Self { options }
    }

    /// Assembly text for an analyzed, error-free program
    pub fn generate_assembly(&self, program: &Program) -> Result<String> {
        let pages = self.options.heap_pages;
        if pages == 0 || pages >= MAX_HEAP_PAGES {
            return Err(Error::CodeGen(format!("heap size of {} pages is out of range", pages)));
        }

        let layout = ProgramLayout::build(program);
        debug!(
            "layout: {} classes, {} functions, {} globals",
            layout.classes.len(),
            layout.funcs.len(),
            layout.globals.len()
        );
        let mut asm = RiscVBackend::new();
        let mut constants = ConstantPool::new();

        emit_header(&mut asm);
        emit_prototypes(&layout, &mut asm, &mut constants);
        emit_dispatch_tables(&layout, &mut asm);
        emit_globals(&layout, &mut asm, &mut constants);

        asm.blank();
        asm.text_section();
        emit_main(&layout, &mut asm, &mut constants, pages);
        emit_object_init(&mut asm);
        for (id, func) in layout.user_funcs() {
            debug!("function {}", func.full_name);
            FuncEmitter::new(&layout, &mut asm, &mut constants, Some(id)).emit_function();
        }
        emit_error_routines(&mut asm, &mut constants);

        asm.blank();
        let init_chars = asm.requires_init_chars() as i32;
        asm.equiv("@requireInitChar", init_chars);
        constants.emit(&mut asm);

        let text = asm.finish();
        info!("generated {} lines of assembly", text.lines().count());
        Ok(text)
    }
}

impl CodeGen for RiscVCodeGen {
    fn generate(&mut self, program: &Program) -> Result<String> {
        self.generate_assembly(program)
    }

    fn target_triple(&self) -> &str {
        "riscv32"
    }

    fn name(&self) -> &str {
        "RISC-V"
    }
}

// ==================== Data Section ====================

fn emit_header(asm: &mut RiscVBackend) {
    for (name, value) in [
        ("@sbrk", 9),
        ("@print_string", 4),
        ("@print_char", 11),
        ("@print_int", 1),
        ("@exit2", 17),
        ("@read_string", 8),
        ("@fill_line_buffer", 18),
        ("@.__obj_size__", 4),
        ("@.__len__", 12),
        ("@.__int__", 12),
        ("@.__bool__", 12),
        ("@.__str__", 16),
        ("@.__elts__", 16),
        ("@error_div_zero", 2),
        ("@error_arg", 1),
        ("@error_oob", 3),
        ("@error_none", 4),
        ("@error_oom", 5),
        ("@error_nyi", 6),
        ("@listHeaderWords", 4),
        ("@strHeaderWords", 4),
    ] {
        asm.equiv(name, value);
    }
    asm.equiv("@bool.True", "const_1");
    asm.equiv("@bool.False", "const_0");
}

/// Prototype object of a class: tag, size, dispatch table, then the
/// initial attribute values
fn emit_prototype(asm: &mut RiscVBackend, constants: &mut ConstantPool, class: &ClassInfo<'_>) {
    asm.global_label(&class.prototype_label());
    asm.word(class.tag, &format!("type tag for class: {}", class.name));
    match class.tag {
        INT_TAG | BOOL_TAG => {
            asm.word(HEADER_WORDS + 1, "object size");
            asm.word_label(&class.dispatch_label(), "pointer to dispatch table");
            asm.word(0, &format!("initial value of attribute: __{}__", class.name));
        }
        STR_TAG => {
            asm.word(HEADER_WORDS + 2, "object size");
            asm.word_label(&class.dispatch_label(), "pointer to dispatch table");
            asm.word(0, "initial value of attribute: __len__");
            asm.word(0, "initial value of attribute: __str__");
        }
        _ => {
            asm.word(class.size_words(), "object size");
            asm.word_label(&class.dispatch_label(), "pointer to dispatch table");
            for attr in &class.attributes {
                let comment = format!("initial value of attribute: {}", attr.name);
                match literal_word(constants, attr.init, &attr.ty) {
                    LiteralWord::Imm(value) => asm.word(value, &comment),
                    LiteralWord::Addr(label) => asm.word_label(&label, &comment),
                }
            }
        }
    }
    asm.align(2);
}

fn emit_prototypes(layout: &ProgramLayout<'_>, asm: &mut RiscVBackend, constants: &mut ConstantPool) {
    asm.data_section();
    for class in &layout.classes {
        emit_prototype(asm, constants, class);
    }
    asm.global_label(&Label::new("$.list$prototype"));
    asm.word(LIST_TAG, "type tag for lists");
    asm.word(HEADER_WORDS + 1, "object size");
    asm.word(0, "no dispatch table");
    asm.word(0, "initial length");
    asm.align(2);
}

fn emit_dispatch_tables(layout: &ProgramLayout<'_>, asm: &mut RiscVBackend) {
    for class in &layout.classes {
        asm.global_label(&class.dispatch_label());
        for (name, func) in &class.methods {
            asm.word_label(&layout.func(*func).code_label(), &format!("implementation of {}", name));
        }
    }
}

fn emit_globals(layout: &ProgramLayout<'_>, asm: &mut RiscVBackend, constants: &mut ConstantPool) {
    for global in &layout.globals {
        asm.global_label(&global.label());
        let comment = format!("{} {}", if global.is_const { "constant" } else { "global variable" }, global.var.name);
        match literal_word(constants, global.var.init, &global.var.ty) {
            LiteralWord::Imm(value) => asm.word(value, &comment),
            LiteralWord::Addr(label) => asm.word_label(&label, &comment),
        }
    }
    for label in layout.hidden_global_labels() {
        asm.global_label(label);
        asm.word(0, "comprehension variable");
    }
}

// ==================== Text Section ====================

fn emit_main(layout: &ProgramLayout<'_>, asm: &mut RiscVBackend, constants: &mut ConstantPool, pages: u32) {
    let main = Label::new("main");
    asm.global_label(&main);
    asm.lui(Register::A0, pages, "heap size in 4 KiB pages");
    asm.alu(AluOp::Add, Register::S11, Register::S11, Register::A0, "save heap size");
    asm.jal(&Label::new("heap.init"), "initialize heap");
    asm.mv(Register::Gp, Register::A0, "heap base");
    asm.mv(Register::S10, Register::Gp, "heap allocation pointer");
    asm.alu(AluOp::Add, Register::S11, Register::S10, Register::S11, "heap limit");
    asm.mv(Register::Ra, Register::Zero, "no return address for main");
    asm.mv(Register::Fp, Register::Zero, "no caller frame for main");
    asm.addi(Register::Sp, Register::Sp, -2 * WORD, "top-level frame");
    asm.sw(Register::Ra, Register::Sp, 0, "");
    asm.sw(Register::Fp, Register::Sp, WORD, "");
    asm.addi(Register::Fp, Register::Sp, 2 * WORD, "");

    let skip = asm.fresh_label();
    asm.insn("li t0, @requireInitChar", "");
    asm.beqz(Register::T0, &skip, "one-character strings unused");
    asm.jal(&Label::new("initchars"), "build one-character strings");
    asm.local_label(&skip, "");

    FuncEmitter::new(layout, asm, constants, None).emit_top_level();

    asm.li(Register::A0, 10, "exit");
    asm.ecall("");
}

fn emit_object_init(asm: &mut RiscVBackend) {
    asm.global_label(&Label::new("$object.__init__"));
    asm.mv(Register::A0, Register::Zero, "None");
    asm.jr(Register::Ra, "");
}

fn emit_error_routines(asm: &mut RiscVBackend, constants: &mut ConstantPool) {
    for error in RuntimeError::ALL {
        asm.global_label(&error.label());
        asm.insn(&format!("li a0, {}", error.code()), "exit code");
        let message = constants.str_label(error.message());
        asm.la(Register::A1, &message, "");
        asm.addi_sym(Register::A1, Register::A1, "@.__str__", "message text");
        asm.j(&Label::new("abort"), "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::*;
    use crate::semantic::analyze;

    fn compile(mut program: Program) -> String {
        let analysis = analyze(&mut program);
        assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics.messages());
        RiscVCodeGen::default().generate_assembly(&program).unwrap()
    }

    fn int() -> TypeAnnotation {
        TypeAnnotation::class("int")
    }

    #[test]
    fn test_heap_pages_validated() {
        let program = Program::new(vec![], vec![]);
        let codegen = RiscVCodeGen::new(CodeGenOptions { heap_pages: 0 });
        assert!(matches!(codegen.generate_assembly(&program), Err(Error::CodeGen(_))));
        let codegen = RiscVCodeGen::new(CodeGenOptions { heap_pages: MAX_HEAP_PAGES });
        assert!(codegen.generate_assembly(&program).is_err());
    }

    #[test]
    fn test_generate_through_backend_trait() {
        let mut backend: Box<dyn CodeGen> = Box::new(RiscVCodeGen::default());
        assert_eq!((backend.name(), backend.target_triple()), ("RISC-V", "riscv32"));
        let asm = backend.generate(&Program::new(vec![], vec![])).unwrap();
        assert!(asm.contains("main:"));
    }

    #[test]
    fn test_empty_program_skeleton() {
        let asm = compile(Program::new(vec![], vec![]));
        assert!(asm.contains(".equiv @.__len__, 12"));
        assert!(asm.contains("$object$prototype:"));
        assert!(asm.contains("$.list$prototype:"));
        assert!(asm.contains("lui a0, 8192"));
        assert!(asm.contains(".equiv @requireInitChar, 0"));
        for label in ["error.Arg:", "error.None:", "error.Div:", "error.OOB:"] {
            assert!(asm.contains(label), "missing {}", label);
        }
        assert!(asm.contains(".string \"Division by zero\""));
    }

    #[test]
    fn test_print_boxes_int() {
        let asm = compile(Program::new(vec![], vec![Stmt::expr(Expr::call("print", vec![Expr::int(42)]))]));
        assert!(asm.contains("li t0, 42"));
        assert!(asm.contains("jal makeint"));
        assert!(asm.contains("jal $print"));
    }

    #[test]
    fn test_print_none_is_invalid_argument() {
        let asm = compile(Program::new(vec![], vec![Stmt::expr(Expr::call("print", vec![Expr::none()]))]));
        assert!(asm.contains("j error.Arg"));
        assert!(!asm.contains("jal $print"));
    }

    #[test]
    fn test_int_constant_is_immediate() {
        let asm = compile(Program::new(
            vec![Declaration::constant("k", int(), Expr::int(7))],
            vec![Stmt::expr(Expr::call("print", vec![Expr::id("k")]))],
        ));
        assert!(asm.contains("li t0, 7"));
        assert!(asm.contains("$k:"));
    }

    #[test]
    fn test_string_indexing_needs_char_table() {
        let asm = compile(Program::new(
            vec![],
            vec![Stmt::expr(Expr::call("print", vec![Expr::index(Expr::str("abc"), Expr::int(1))]))],
        ));
        assert!(asm.contains("allChars"));
        assert!(asm.contains(".equiv @requireInitChar, 1"));
        assert!(asm.contains("j error.OOB"));
    }

    #[test]
    fn test_class_prototype_and_dispatch() {
        let class = ClassDef::new(
            "Point",
            "object",
            vec![
                Declaration::var("x", int(), Expr::int(3)),
                Declaration::var("tag", TypeAnnotation::class("object"), Expr::int(1)),
            ],
        );
        let asm = compile(Program::new(
            vec![class.into()],
            vec![Stmt::expr(Expr::call("print", vec![Expr::member(Expr::call("Point", vec![]), "x")]))],
        ));
        assert!(asm.contains("$Point$prototype:"));
        assert!(asm.contains("type tag for class: Point"));
        assert!(asm.contains(".word 5"));
        assert!(asm.contains("$Point$dispatchTable:"));
        assert!(asm.contains(".word $object.__init__"));
        assert!(asm.contains("jal alloc"));
        assert!(asm.contains("lw t0, 12(t0)"));
    }

    #[test]
    fn test_floor_division_checks_divisor() {
        let asm = compile(Program::new(
            vec![Declaration::var("x", int(), Expr::int(7))],
            vec![Stmt::assign(vec![Expr::id("x")], Expr::binary(Expr::id("x"), BinOp::FloorDiv, Expr::int(-2)))],
        ));
        assert!(asm.contains("j error.Div"));
        assert!(asm.contains("rem t2, t0, t1"));
        assert!(asm.contains("div t0, t0, t1"));
    }
}
