//! Program layout
//!
//! Descriptors for every class, function and variable of a program: type
//! tags, attribute offsets, dispatch-table slots, frame slots and labels.
//! Built once from the typed AST before any code is emitted.

use std::collections::HashMap;

use log::{debug, warn};

use super::asm::Label;
use crate::frontend::ast::*;
use crate::types::ValueType;

pub const WORD: i32 = 4;
/// Type tag, size and dispatch-table pointer
pub const HEADER_WORDS: i32 = 3;

pub const OBJECT_TAG: i32 = 0;
pub const INT_TAG: i32 = 1;
pub const BOOL_TAG: i32 = 2;
pub const STR_TAG: i32 = 3;
pub const LIST_TAG: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassIndex(usize);

/// Functions whose code is not generated from a `FuncDef`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    ObjectInit,
    Print,
    Len,
    Input,
}

// ==================== Variables ====================

/// A named, typed storage location and its literal initial value
#[derive(Debug, Clone)]
pub struct VarInfo<'a> {
    pub name: String,
    pub ty: ValueType,
    pub init: Option<&'a Expr>,
}

impl<'a> VarInfo<'a> {
    fn from_def(def: &'a VarDef) -> Self {
        Self {
            name: def.var.identifier.name.clone(),
            ty: ValueType::from_annotation(&def.var.annotation),
            init: Some(&def.value),
        }
    }

    fn param(var: &TypedVar) -> Self {
        Self { name: var.identifier.name.clone(), ty: ValueType::from_annotation(&var.annotation), init: None }
    }

    /// Frame slot of a comprehension variable
    fn hidden() -> Self {
        Self { name: String::new(), ty: ValueType::object(), init: None }
    }
}

#[derive(Debug, Clone)]
pub struct GlobalVarInfo<'a> {
    pub var: VarInfo<'a>,
    pub is_const: bool,
}

impl GlobalVarInfo<'_> {
    pub fn label(&self) -> Label {
        Label::new(format!("${}", self.var.name))
    }

    /// Value of an `int` constant, which is loaded as an immediate
    pub fn const_int(&self) -> Option<i32> {
        if !self.is_const || !self.var.ty.is_int() {
            return None;
        }
        match self.var.init.map(|e| &e.kind) {
            Some(ExprKind::IntegerLiteral { value }) => Some(*value),
            _ => None,
        }
    }
}

/// Position of a variable in an activation record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Param(usize),
    Local(usize),
}

impl Slot {
    /// Offset from the frame pointer. Locals sit below the saved return
    /// address and frame pointer.
    pub fn offset(self) -> i32 {
        match self {
            Slot::Param(i) => i as i32 * WORD,
            Slot::Local(j) => -(j as i32 + 3) * WORD,
        }
    }
}

/// What a name denotes at some point of the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolInfo {
    Class(ClassIndex),
    Func(FuncId),
    Global(usize),
    Stack(FuncId, Slot),
}

// ==================== Classes ====================

#[derive(Debug, Clone)]
pub struct ClassInfo<'a> {
    pub name: String,
    pub tag: i32,
    pub super_class: Option<ClassIndex>,
    /// Inherited attributes first, then the class's own
    pub attributes: Vec<VarInfo<'a>>,
    /// Dispatch table in slot order; slot 0 is `__init__`
    pub methods: Vec<(String, FuncId)>,
}

impl ClassInfo<'_> {
    pub fn prototype_label(&self) -> Label {
        Label::new(format!("${}$prototype", self.name))
    }

    pub fn dispatch_label(&self) -> Label {
        Label::new(format!("${}$dispatchTable", self.name))
    }

    /// Object size in words
    pub fn size_words(&self) -> i32 {
        HEADER_WORDS + self.attributes.len() as i32
    }

    pub fn attribute_offset(&self, name: &str) -> Option<i32> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some((HEADER_WORDS + index as i32) * WORD)
    }

    pub fn attribute(&self, name: &str) -> Option<&VarInfo<'_>> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Dispatch-table slot and implementation of a method
    pub fn method(&self, name: &str) -> Option<(usize, FuncId)> {
        self.methods.iter().enumerate().find(|(_, (n, _))| n == name).map(|(slot, (_, func))| (slot, *func))
    }
}

// ==================== Functions ====================

#[derive(Debug, Clone)]
pub struct FuncInfo<'a> {
    pub name: String,
    /// `f`, `C.m` or `outer.inner`
    pub full_name: String,
    /// Nesting depth; top-level functions and methods are at 0
    pub depth: usize,
    pub params: Vec<VarInfo<'a>>,
    pub locals: Vec<VarInfo<'a>>,
    pub ret: ValueType,
    pub statements: &'a [Stmt],
    pub parent: Option<FuncId>,
    pub class: Option<ClassIndex>,
    pub builtin: Option<Builtin>,
    /// Methods only: the body never assigns the receiver
    pub receiver_constant: bool,
    symbols: HashMap<String, SymbolInfo>,
    comprehension_slots: HashMap<NodeId, usize>,
}

impl<'a> FuncInfo<'a> {
    fn new(name: &str, full_name: String, depth: usize, ret: ValueType, statements: &'a [Stmt]) -> Self {
        Self {
            name: name.to_string(),
            full_name,
            depth,
            params: Vec::new(),
            locals: Vec::new(),
            ret,
            statements,
            parent: None,
            class: None,
            builtin: None,
            receiver_constant: false,
            symbols: HashMap::new(),
            comprehension_slots: HashMap::new(),
        }
    }

    fn builtin(kind: Builtin, name: &str, full_name: &str, params: Vec<ValueType>, ret: ValueType) -> Self {
        let mut info = Self::new(name, full_name.to_string(), 0, ret, &[]);
        info.builtin = Some(kind);
        info.params = params
            .into_iter()
            .enumerate()
            .map(|(i, ty)| VarInfo { name: format!("arg{}", i), ty, init: None })
            .collect();
        info
    }

    pub fn code_label(&self) -> Label {
        Label::new(format!("${}", self.full_name))
    }

    /// First instruction after the prologue
    pub fn start_label(&self) -> Label {
        Label::new(format!("${}$start", self.full_name))
    }

    /// Local slot holding the variable of a comprehension
    pub fn comprehension_slot(&self, node: NodeId) -> Option<Slot> {
        self.comprehension_slots.get(&node).map(|j| Slot::Local(*j))
    }

    /// Name of the receiver parameter, for methods
    pub fn receiver(&self) -> Option<&str> {
        self.class?;
        self.params.first().map(|p| p.name.as_str())
    }
}

// ==================== Layout ====================

#[derive(Debug)]
pub struct ProgramLayout<'a> {
    pub classes: Vec<ClassInfo<'a>>,
    pub funcs: Vec<FuncInfo<'a>>,
    pub globals: Vec<GlobalVarInfo<'a>>,
    pub statements: &'a [Stmt],
    class_index: HashMap<String, ClassIndex>,
    global_symbols: HashMap<String, SymbolInfo>,
    /// Variables of top-level comprehensions
    hidden_globals: HashMap<NodeId, Label>,
}

impl<'a> ProgramLayout<'a> {
    pub fn build(program: &'a Program) -> Self {
        let mut layout = Self {
            classes: Vec::new(),
            funcs: Vec::new(),
            globals: Vec::new(),
            statements: &program.statements,
            class_index: HashMap::new(),
            global_symbols: HashMap::new(),
            hidden_globals: HashMap::new(),
        };
        layout.install_builtins();

        for decl in &program.declarations {
            if let Declaration::VarDef(def) | Declaration::ConstVarDef(def) = decl {
                let index = layout.globals.len();
                let is_const = matches!(decl, Declaration::ConstVarDef(_));
                layout.globals.push(GlobalVarInfo { var: VarInfo::from_def(def), is_const });
                layout.global_symbols.insert(decl.name().to_string(), SymbolInfo::Global(index));
            }
        }
        for decl in &program.declarations {
            match decl {
                Declaration::ClassDef(def) => layout.add_class(def),
                Declaration::FuncDef(def) => {
                    let id = layout.add_func(def, None, None);
                    layout.global_symbols.insert(def.name.name.clone(), SymbolInfo::Func(id));
                }
                _ => {}
            }
        }
        for (n, node) in comprehensions(&program.statements).into_iter().enumerate() {
            layout.hidden_globals.insert(node, Label::new(format!("$comprehension.{}", n)));
        }
        debug!(
            "layout: {} classes, {} functions, {} globals",
            layout.classes.len(),
            layout.funcs.len(),
            layout.globals.len()
        );
        layout
    }

    fn install_builtins(&mut self) {
        let object = ValueType::object();
        let object_init = self.push_func(FuncInfo::builtin(
            Builtin::ObjectInit,
            "__init__",
            "object.__init__",
            vec![object.clone()],
            ValueType::none(),
        ));
        let methods = vec![("__init__".to_string(), object_init)];
        let object_index = self.push_class("object", None, methods.clone());
        for name in ["int", "bool", "str"] {
            self.push_class(name, Some(object_index), methods.clone());
        }
        for (name, kind, params, ret) in [
            ("print", Builtin::Print, vec![object.clone()], ValueType::none()),
            ("len", Builtin::Len, vec![object.clone()], ValueType::int()),
            ("input", Builtin::Input, vec![], ValueType::str()),
        ] {
            let id = self.push_func(FuncInfo::builtin(kind, name, name, params, ret));
            self.global_symbols.insert(name.to_string(), SymbolInfo::Func(id));
        }
    }

    fn push_func(&mut self, info: FuncInfo<'a>) -> FuncId {
        let id = FuncId(self.funcs.len());
        self.funcs.push(info);
        id
    }

    /// Register a class with no attributes; its tag is its index, so the
    /// predefined classes get 0 to 3 and user classes count up from 4.
    fn push_class(&mut self, name: &str, super_class: Option<ClassIndex>, methods: Vec<(String, FuncId)>) -> ClassIndex {
        let index = ClassIndex(self.classes.len());
        self.classes.push(ClassInfo {
            name: name.to_string(),
            tag: index.0 as i32,
            super_class,
            attributes: Vec::new(),
            methods,
        });
        self.class_index.insert(name.to_string(), index);
        self.global_symbols.insert(name.to_string(), SymbolInfo::Class(index));
        index
    }

    fn add_class(&mut self, def: &'a ClassDef) {
        let name = def.name.name.as_str();
        if self.class_index.contains_key(name) {
            warn!("class {} declared twice; keeping the first", name);
            return;
        }
        let object = ClassIndex(OBJECT_TAG as usize);
        let super_index = match self.class_index.get(&def.super_class.name) {
            Some(&index) if self.classes[index.0].tag == OBJECT_TAG || self.classes[index.0].tag > STR_TAG => index,
            _ => object,
        };
        let index = ClassIndex(self.classes.len());
        let mut attributes = self.classes[super_index.0].attributes.clone();
        let mut methods = self.classes[super_index.0].methods.clone();

        for decl in &def.declarations {
            match decl {
                Declaration::VarDef(var) | Declaration::ConstVarDef(var) => {
                    if attributes.iter().any(|a| a.name == var.var.identifier.name) {
                        warn!("attribute {}.{} redefined", name, var.var.identifier.name);
                        continue;
                    }
                    attributes.push(VarInfo::from_def(var));
                }
                Declaration::FuncDef(method) => {
                    let id = self.add_func(method, None, Some((index, name)));
                    let method_name = &method.name.name;
                    match methods.iter_mut().find(|(n, _)| n == method_name) {
                        Some(slot) => slot.1 = id,
                        None => methods.push((method_name.clone(), id)),
                    }
                }
                _ => {}
            }
        }

        let pushed = self.push_class(name, Some(super_index), methods);
        self.classes[pushed.0].attributes = attributes;
        debug!("class {} has tag {}", name, self.classes[pushed.0].tag);
    }

    fn add_func(&mut self, def: &'a FuncDef, parent: Option<FuncId>, class: Option<(ClassIndex, &str)>) -> FuncId {
        let name = def.name.name.as_str();
        let (full_name, depth) = match (parent, class) {
            (Some(p), _) => (format!("{}.{}", self.funcs[p.0].full_name, name), self.funcs[p.0].depth + 1),
            (None, Some((_, class_name))) => (format!("{}.{}", class_name, name), 0),
            (None, None) => (name.to_string(), 0),
        };
        let ret = ValueType::from_annotation(&def.return_type);
        let mut info = FuncInfo::new(name, full_name, depth, ret, &def.statements);
        info.parent = parent;
        info.class = class.map(|(index, _)| index);
        let id = FuncId(self.funcs.len());
        for (i, param) in def.params.iter().enumerate() {
            info.params.push(VarInfo::param(param));
            info.symbols.insert(param.identifier.name.clone(), SymbolInfo::Stack(id, Slot::Param(i)));
        }
        if class.is_some() {
            if let Some(receiver) = def.params.first() {
                info.receiver_constant = !reassigns(def, &receiver.identifier.name);
            }
        }
        self.funcs.push(info);

        let mut locals = Vec::new();
        let mut symbols = HashMap::new();
        for decl in &def.declarations {
            match decl {
                Declaration::VarDef(var) | Declaration::ConstVarDef(var) => {
                    symbols.insert(decl.name().to_string(), SymbolInfo::Stack(id, Slot::Local(locals.len())));
                    locals.push(VarInfo::from_def(var));
                }
                Declaration::GlobalDecl(_) => {
                    if let Some(SymbolInfo::Global(index)) = self.global_symbols.get(decl.name()) {
                        symbols.insert(decl.name().to_string(), SymbolInfo::Global(*index));
                    }
                }
                Declaration::FuncDef(nested) => {
                    let nested_id = self.add_func(nested, Some(id), None);
                    symbols.insert(nested.name.name.clone(), SymbolInfo::Func(nested_id));
                }
                Declaration::NonLocalDecl(_) | Declaration::ClassDef(_) => {}
            }
        }
        let mut slots = HashMap::new();
        for node in comprehensions(&def.statements) {
            slots.insert(node, locals.len());
            locals.push(VarInfo::hidden());
        }

        let info = &mut self.funcs[id.0];
        info.locals = locals;
        info.symbols.extend(symbols);
        info.comprehension_slots = slots;
        id
    }

    // ==================== Queries ====================

    pub fn func(&self, id: FuncId) -> &FuncInfo<'a> {
        &self.funcs[id.0]
    }

    pub fn class(&self, index: ClassIndex) -> &ClassInfo<'a> {
        &self.classes[index.0]
    }

    pub fn class_named(&self, name: &str) -> Option<&ClassInfo<'a>> {
        self.class_index.get(name).map(|index| &self.classes[index.0])
    }

    /// Class descriptor for the class a value type names
    pub fn class_of(&self, ty: &ValueType) -> Option<&ClassInfo<'a>> {
        self.class_named(ty.class_name()?)
    }

    pub fn global(&self, index: usize) -> &GlobalVarInfo<'a> {
        &self.globals[index]
    }

    /// Functions with generated bodies, in declaration order
    pub fn user_funcs(&self) -> impl Iterator<Item = (FuncId, &FuncInfo<'a>)> {
        self.funcs.iter().enumerate().filter(|(_, f)| f.builtin.is_none()).map(|(i, f)| (FuncId(i), f))
    }

    pub fn hidden_global(&self, node: NodeId) -> Option<&Label> {
        self.hidden_globals.get(&node)
    }

    pub fn hidden_global_labels(&self) -> Vec<&Label> {
        let mut labels: Vec<&Label> = self.hidden_globals.values().collect();
        labels.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        labels
    }

    /// Resolve `name` as seen from inside `from` (`None` for the top level):
    /// enclosing functions innermost first, then the global scope.
    pub fn resolve(&self, from: Option<FuncId>, name: &str) -> Option<SymbolInfo> {
        let mut current = from;
        while let Some(id) = current {
            let info = &self.funcs[id.0];
            if let Some(symbol) = info.symbols.get(name) {
                return Some(*symbol);
            }
            current = info.parent;
        }
        self.global_symbols.get(name).copied()
    }

    fn is_strict_subclass(&self, sub: ClassIndex, sup: ClassIndex) -> bool {
        let mut current = self.classes[sub.0].super_class;
        while let Some(index) = current {
            if index == sup {
                return true;
            }
            current = self.classes[index.0].super_class;
        }
        false
    }

    /// Whether some subclass of the method's class replaces it
    pub fn overridden_below(&self, method: FuncId) -> bool {
        let info = &self.funcs[method.0];
        let Some(class) = info.class else {
            return false;
        };
        self.classes.iter().enumerate().any(|(i, c)| {
            self.is_strict_subclass(ClassIndex(i), class)
                && c.method(&info.name).map_or(false, |(_, id)| id != method)
        })
    }
}

/// Comprehensions evaluated directly by `stmts`, outside nested functions
fn comprehensions(stmts: &[Stmt]) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    walk_stmts(stmts, &mut |stmt| {
        for expr in stmt.exprs() {
            expr.walk(&mut |e| {
                if matches!(e.kind, ExprKind::ForListExpr { .. }) {
                    nodes.push(e.id);
                }
            });
        }
    });
    nodes
}

/// Whether the body of `def` (or a nested function re-homing the name with
/// `nonlocal`) assigns `name`
fn reassigns(def: &FuncDef, name: &str) -> bool {
    let mut assigned = false;
    walk_stmts(&def.statements, &mut |stmt| match &stmt.kind {
        StmtKind::AssignStmt { targets, .. } => {
            assigned |= targets.iter().any(|t| t.as_identifier() == Some(name));
        }
        StmtKind::ForStmt { identifier, .. } => assigned |= identifier.name == name,
        _ => {}
    });
    assigned || nested_reassigns(def, name)
}

fn nested_reassigns(def: &FuncDef, name: &str) -> bool {
    def.declarations.iter().any(|decl| {
        let Declaration::FuncDef(nested) = decl else {
            return false;
        };
        let rebinds = nested
            .declarations
            .iter()
            .any(|d| matches!(d, Declaration::NonLocalDecl(s) if s.variable.name == name));
        let shadows = nested.params.iter().any(|p| p.identifier.name == name)
            || nested.declarations.iter().any(|d| d.is_variable() && d.name() == name);
        if rebinds {
            reassigns(nested, name)
        } else {
            !shadows && nested_reassigns(nested, name)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int() -> TypeAnnotation {
        TypeAnnotation::class("int")
    }

    fn method(name: &str, class: &str, body: Vec<Stmt>, declarations: Vec<Declaration>) -> Declaration {
        let this = TypedVar::new("self", TypeAnnotation::class(class));
        FuncDef::new(name, vec![this], TypeAnnotation::none(), declarations, body).into()
    }

    #[test]
    fn test_builtin_tags_and_labels() {
        let program = Program::new(vec![], vec![]);
        let layout = ProgramLayout::build(&program);
        let tags: Vec<_> = layout.classes.iter().map(|c| (c.name.as_str(), c.tag)).collect();
        assert_eq!(tags, vec![("object", 0), ("int", 1), ("bool", 2), ("str", 3)]);
        assert_eq!(layout.class_named("str").unwrap().prototype_label().as_str(), "$str$prototype");
        assert!(matches!(layout.resolve(None, "print"), Some(SymbolInfo::Func(_))));
    }

    #[test]
    fn test_inherited_attributes_and_override_slots() {
        let a = ClassDef::new(
            "A",
            "object",
            vec![Declaration::var("x", int(), Expr::int(1)), method("f", "A", vec![], vec![])],
        );
        let b = ClassDef::new(
            "B",
            "A",
            vec![
                Declaration::var("y", int(), Expr::int(2)),
                method("g", "B", vec![], vec![]),
                method("f", "B", vec![], vec![]),
            ],
        );
        let program = Program::new(vec![a.into(), b.into()], vec![]);
        let layout = ProgramLayout::build(&program);

        let b = layout.class_named("B").unwrap();
        assert_eq!(b.tag, 5);
        assert_eq!(b.attribute_offset("x"), Some(12));
        assert_eq!(b.attribute_offset("y"), Some(16));
        assert_eq!(b.size_words(), 5);
        let slots: Vec<_> = b.methods.iter().map(|(n, id)| (n.as_str(), layout.func(*id).full_name.as_str())).collect();
        assert_eq!(slots, vec![("__init__", "object.__init__"), ("f", "B.f"), ("g", "B.g")]);

        let (_, a_f) = layout.class_named("A").unwrap().method("f").unwrap();
        assert!(layout.overridden_below(a_f));
        let (_, b_f) = b.method("f").unwrap();
        assert!(!layout.overridden_below(b_f));
    }

    #[test]
    fn test_nested_function_slots_and_resolution() {
        let inner = FuncDef::new(
            "inner",
            vec![],
            int(),
            vec![Declaration::nonlocal("y")],
            vec![Stmt::ret(Some(Expr::id("y")))],
        );
        let outer = FuncDef::new(
            "outer",
            vec![TypedVar::new("p", int())],
            TypeAnnotation::none(),
            vec![Declaration::var("y", int(), Expr::int(0)), Declaration::global("g"), inner.into()],
            vec![],
        );
        let program = Program::new(vec![Declaration::var("g", int(), Expr::int(0)), outer.into()], vec![]);
        let layout = ProgramLayout::build(&program);

        let Some(SymbolInfo::Func(outer_id)) = layout.resolve(None, "outer") else {
            panic!("outer is a function");
        };
        let Some(SymbolInfo::Func(inner_id)) = layout.resolve(Some(outer_id), "inner") else {
            panic!("inner is a function");
        };
        let inner = layout.func(inner_id);
        assert_eq!(inner.depth, 1);
        assert_eq!(inner.code_label().as_str(), "$outer.inner");
        assert_eq!(layout.resolve(Some(inner_id), "y"), Some(SymbolInfo::Stack(outer_id, Slot::Local(0))));
        assert_eq!(layout.resolve(Some(inner_id), "p"), Some(SymbolInfo::Stack(outer_id, Slot::Param(0))));
        assert_eq!(layout.resolve(Some(outer_id), "g"), Some(SymbolInfo::Global(0)));
        assert_eq!(Slot::Local(0).offset(), -12);
        assert_eq!(Slot::Param(1).offset(), 4);
    }

    #[test]
    fn test_receiver_reassignment_detected() {
        let plain = method("f", "A", vec![Stmt::expr(Expr::member(Expr::id("self"), "x"))], vec![]);
        let assigning = method("g", "A", vec![Stmt::assign(vec![Expr::id("self")], Expr::none())], vec![]);
        let helper = FuncDef::new(
            "h",
            vec![],
            TypeAnnotation::none(),
            vec![Declaration::nonlocal("self")],
            vec![Stmt::assign(vec![Expr::id("self")], Expr::none())],
        );
        let via_nested = method("k", "A", vec![], vec![helper.into()]);
        let class = ClassDef::new("A", "object", vec![plain, assigning, via_nested]);
        let program = Program::new(vec![class.into()], vec![]);
        let layout = ProgramLayout::build(&program);

        let a = layout.class_named("A").unwrap();
        let constant = |name: &str| layout.func(a.method(name).unwrap().1).receiver_constant;
        assert!(constant("f"));
        assert!(!constant("g"));
        assert!(!constant("k"));
    }

    #[test]
    fn test_comprehension_slots() {
        let comprehension = Expr::comprehension(Expr::id("i"), "i", Expr::list(vec![Expr::int(1)]));
        let node = comprehension.id;
        let f = FuncDef::new(
            "f",
            vec![],
            TypeAnnotation::none(),
            vec![Declaration::var("a", int(), Expr::int(0))],
            vec![Stmt::expr(comprehension)],
        );
        let top = Expr::comprehension(Expr::id("j"), "j", Expr::list(vec![]));
        let top_node = top.id;
        let program = Program::new(vec![f.into()], vec![Stmt::expr(top)]);
        let layout = ProgramLayout::build(&program);

        let Some(SymbolInfo::Func(f)) = layout.resolve(None, "f") else {
            panic!("f is a function");
        };
        assert_eq!(layout.func(f).locals.len(), 2);
        assert_eq!(layout.func(f).comprehension_slot(node), Some(Slot::Local(1)));
        assert_eq!(layout.hidden_global(top_node).map(Label::as_str), Some("$comprehension.0"));
    }

    #[test]
    fn test_const_int_global() {
        let program = Program::new(
            vec![
                Declaration::constant("k", int(), Expr::int(42)),
                Declaration::var("v", int(), Expr::int(1)),
            ],
            vec![],
        );
        let layout = ProgramLayout::build(&program);
        assert_eq!(layout.global(0).const_int(), Some(42));
        assert_eq!(layout.global(1).const_int(), None);
        assert_eq!(layout.global(0).label().as_str(), "$k");
    }
}
