//! Constant pool
//!
//! Interned string literals and boxed `int`/`bool` constants, emitted as
//! statically allocated objects at the end of the program.

use std::collections::HashMap;

use super::asm::{Label, RiscVBackend};
use super::descriptors::{BOOL_TAG, INT_TAG, STR_TAG};

enum Constant {
    Bool(bool),
    Int(i32),
    Str(String),
}

#[derive(Default)]
pub struct ConstantPool {
    entries: Vec<(Label, Constant)>,
    strings: HashMap<String, Label>,
    ints: HashMap<i32, Label>,
}

impl ConstantPool {
    /// A pool holding `False` as `const_0` and `True` as `const_1`
    pub fn new() -> Self {
        let mut pool = Self::default();
        pool.push(Constant::Bool(false));
        pool.push(Constant::Bool(true));
        pool
    }

    fn push(&mut self, constant: Constant) -> Label {
        let label = Label::new(format!("const_{}", self.entries.len()));
        self.entries.push((label.clone(), constant));
        label
    }

    pub fn bool_label(&self, value: bool) -> Label {
        Label::new(if value { "const_1" } else { "const_0" })
    }

    pub fn int_label(&mut self, value: i32) -> Label {
        if let Some(label) = self.ints.get(&value) {
            return label.clone();
        }
        let label = self.push(Constant::Int(value));
        self.ints.insert(value, label.clone());
        label
    }

    pub fn str_label(&mut self, value: &str) -> Label {
        if let Some(label) = self.strings.get(value) {
            return label.clone();
        }
        let label = self.push(Constant::Str(value.to_string()));
        self.strings.insert(value.to_string(), label.clone());
        label
    }

    pub fn emit(&self, asm: &mut RiscVBackend) {
        asm.blank();
        asm.data_section();
        for (label, constant) in &self.entries {
            asm.global_label(label);
            match constant {
                Constant::Bool(value) => {
                    asm.word(BOOL_TAG, "type tag for class: bool");
                    asm.word(4, "object size");
                    asm.word_label(&Label::new("$bool$dispatchTable"), "pointer to dispatch table");
                    asm.word(*value as i32, "constant value of attribute: __bool__");
                }
                Constant::Int(value) => {
                    asm.word(INT_TAG, "type tag for class: int");
                    asm.word(4, "object size");
                    asm.word_label(&Label::new("$int$dispatchTable"), "pointer to dispatch table");
                    asm.word(*value, "constant value of attribute: __int__");
                }
                Constant::Str(value) => {
                    let len = value.len() as i32;
                    asm.word(STR_TAG, "type tag for class: str");
                    asm.word(4 + (len + 1 + 3) / 4, "object size");
                    asm.word_label(&Label::new("$str$dispatchTable"), "pointer to dispatch table");
                    asm.word(len, "constant value of attribute: __len__");
                    asm.string(value, "constant value of attribute: __str__");
                    asm.align(2);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_bool_constants() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.bool_label(false).as_str(), "const_0");
        assert_eq!(pool.bool_label(true).as_str(), "const_1");
        assert_eq!(pool.int_label(7).as_str(), "const_2");
    }

    #[test]
    fn test_strings_are_interned() {
        let mut pool = ConstantPool::new();
        let a = pool.str_label("hello");
        let b = pool.str_label("hello");
        assert_eq!(a, b);
        assert_ne!(a, pool.str_label("world"));
    }

    #[test]
    fn test_string_object_size() {
        let mut pool = ConstantPool::new();
        pool.str_label("abc");
        let mut asm = RiscVBackend::new();
        pool.emit(&mut asm);
        let text = asm.finish();
        // 3 header words, the length and 4 bytes of characters
        assert!(text.contains(".word 5"));
        assert!(text.contains(".string \"abc\""));
    }
}
