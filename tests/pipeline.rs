use std::rc::Rc;

use compseudo::bytecode::OpCode;
use compseudo::bytecode::compile::compile_source;
use compseudo::bytecode::disasm::{disassemble, disassemble_to_string};
use compseudo::bytecode::image::ChunkImage;
use compseudo::lang::object::Heap;
use compseudo::lang::value::Value;
use compseudo::{InterpretError, InterpretResult, Vm, parse};

fn eval(src: &str) -> Value {
    Vm::new()
        .interpret(src)
        .unwrap_or_else(|e| panic!("{:?} failed: {}", src, e))
}

fn eval_display(src: &str) -> String {
    let mut vm = Vm::new();
    let value = vm.interpret(src).expect("execution should succeed");
    value.display(vm.heap()).to_string()
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(eval("1 + 2 * 3"), Value::Integer(7));
    assert_eq!(eval("(1 + 2) * 3"), Value::Integer(9));
    assert_eq!(eval("2 * 3 = 6 AND NOT (1 > 2)"), Value::Bool(true));
}

#[test]
fn expression_may_span_lines() {
    assert_eq!(eval("1 +\n2\n* 3"), Value::Integer(7));
}

#[test]
fn results_render_as_values() {
    assert_eq!(eval_display("1 < 2"), "TRUE");
    assert_eq!(eval_display("'z'"), "'z'");
    assert_eq!(eval_display("1.0 / 3.0"), "0.333333");
    assert_eq!(eval_display("\"st\" & \"ring\""), "\"string\"");
}

#[test]
fn three_way_concatenation() {
    let mut vm = Vm::new();
    let value = vm.interpret("\"st\" & \"ri\" & \"ng\"").unwrap();
    let Value::Obj(r) = value else {
        panic!("expected string, got {:?}", value);
    };
    assert_eq!(vm.heap().as_str(r), Some("string"));
    assert_eq!(value.display(vm.heap()).to_string(), "\"string\"");
}

#[test]
fn deep_nesting_is_a_compile_error() {
    let mut vm = Vm::new();
    for src in [
        format!("{}1", "- ".repeat(5_000)),
        format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000)),
        format!("{}1", "1 + ".repeat(5_000)),
    ] {
        let err = vm.interpret(&src).unwrap_err();
        assert_eq!(err.kind(), InterpretResult::CompileError, "got: {}", err);
    }
    assert_eq!(vm.interpret(&format!("{}1", "- ".repeat(100))).unwrap(), Value::Integer(1));
}

#[test]
fn identical_literals_share_one_object() {
    let source: Rc<str> = Rc::from("\"ab\" = \"ab\"");
    let mut heap = Heap::new();
    let chunk = compile_source(&source, &mut heap).unwrap();

    assert_eq!(chunk.constants.len(), 2);
    assert_eq!(chunk.constants[0], chunk.constants[1]);
    assert_eq!(heap.len(), 1);

    let source: Rc<str> = Rc::from("\"ab\" = \"ab \"");
    let chunk = compile_source(&source, &mut heap).unwrap();
    assert_ne!(chunk.constants[0], chunk.constants[1]);
    assert_eq!(heap.len(), 2);
}

#[test]
fn mixed_bool_and_integer_ordering_fails() {
    let err = Vm::new().interpret("TRUE < 1").unwrap_err();
    assert_eq!(err.kind(), InterpretResult::RuntimeError);
    assert!(matches!(err, InterpretError::Runtime(_)));
}

#[test]
fn negative_zero() {
    assert_eq!(eval("-0"), Value::Integer(0));
    match eval("-0.0") {
        Value::Real(r) => assert!(r == 0.0 && r.is_sign_negative()),
        other => panic!("expected real, got {:?}", other),
    }
}

#[test]
fn line_table_covers_every_byte() {
    let source: Rc<str> = Rc::from("1\n+ 2\n* (3\n- 4)");
    let mut heap = Heap::new();
    let chunk = compile_source(&source, &mut heap).unwrap();

    let covered: u32 = chunk.lines().iter().map(|run| run.count).sum();
    assert_eq!(covered as usize, chunk.code.len());
    for offset in 0..chunk.code.len() {
        assert!(chunk.line_at(offset).is_some(), "offset {} has no line", offset);
    }
    assert_eq!(chunk.line_at(0), Some(1));
}

#[test]
fn disassembly_follows_tree_order() {
    let source: Rc<str> = Rc::from("-(1 + 2) * 3");
    let mut heap = Heap::new();
    let chunk = compile_source(&source, &mut heap).unwrap();

    let ops: Vec<OpCode> = disassemble(&chunk)
        .unwrap()
        .into_iter()
        .map(|i| i.opcode)
        .collect();
    assert_eq!(
        ops,
        vec![
            OpCode::Constant,
            OpCode::Constant,
            OpCode::Add,
            OpCode::Negate,
            OpCode::Constant,
            OpCode::Mul,
            OpCode::Return,
        ]
    );

    let listing = disassemble_to_string(&chunk, &heap, "expr");
    assert!(listing.starts_with("== expr ==\n"), "listing was:\n{}", listing);
    assert!(listing.contains("OP_NEGATE"), "listing was:\n{}", listing);
}

#[test]
fn compile_errors_carry_line() {
    let err = Vm::new().interpret("1 +\n\n)").unwrap_err();
    assert_eq!(err.kind(), InterpretResult::CompileError);
    assert!(err.to_string().contains("line 3"), "got: {}", err);
}

#[test]
fn runtime_errors_carry_line() {
    let err = Vm::new().interpret("1\n/\n0").unwrap_err();
    assert_eq!(err.to_string(), "runtime error: line 2: division by zero");
}

#[test]
fn parse_prints_parenthesised_tree() {
    let source: Rc<str> = Rc::from("1 + 2 * 3");
    let ast = parse(&source).unwrap();
    assert_eq!(ast.to_string(), "(1 + (2 * 3))");
}

#[test]
fn image_runs_in_a_fresh_vm() {
    let source: Rc<str> = Rc::from("\"pseudo\" & \"code\" = \"pseudocode\"");
    let mut heap = Heap::new();
    let chunk = compile_source(&source, &mut heap).unwrap();

    let bytes = ChunkImage::from_chunk(&chunk, &heap)
        .unwrap()
        .encode()
        .unwrap();

    let mut vm = Vm::new();
    let loaded = ChunkImage::decode(&bytes)
        .unwrap()
        .into_chunk(vm.heap_mut())
        .unwrap();

    assert_eq!(loaded.code, chunk.code);
    assert_eq!(vm.run(&loaded).unwrap(), Value::Bool(true));
}
