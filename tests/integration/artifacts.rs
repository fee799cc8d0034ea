//! File-level entry points: building artifacts, running bytecode and IR listings

use parce::frontend::ast::{BinOp, Expr, Program, Stmt};
use parce::middle::ir;
use parce::util::config::PipelineConfig;
use parce::vm;
use parce::{build_artifacts, execute, load_bytecode_file, load_program_file, optimize_ir_file};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sample_program() -> Program {
    Program::new(vec![
        Stmt::var_decl("n", Expr::read("n? ")),
        Stmt::var_decl("acc", Expr::number(1.0)),
        Stmt::For {
            variable: "i".to_string(),
            count: Expr::var("n"),
            block: vec![Stmt::reassign(
                "acc",
                Expr::binary(Expr::var("acc"), BinOp::Mul, Expr::number(2.0)),
            )],
        },
        Stmt::print("2^n =", vec![Expr::var("acc")]),
    ])
}

fn write_ast(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("program.json");
    fs::write(&path, serde_json::to_string_pretty(&sample_program()).unwrap()).unwrap();
    path
}

#[test]
fn test_build_writes_three_artifacts() {
    let dir = TempDir::new().unwrap();
    let ast = write_ast(dir.path());
    let out = dir.path().join("out");

    let (paths, report) =
        build_artifacts(&ast, &out, &PipelineConfig::default(), &mut "5\n".as_bytes()).unwrap();

    assert_eq!(fs::read_to_string(&paths.output).unwrap(), "n? 2^n =\n32\n");
    assert!(report.diagnostics.is_empty());

    let ir_text = fs::read_to_string(&paths.ir).unwrap();
    assert!(ir_text.starts_with("t0 = READ \"n? \"\n"));
    assert!(ir::parse_program(&ir_text).is_ok());

    let bytecode_text = fs::read_to_string(&paths.bytecode).unwrap();
    assert!(bytecode_text.starts_with("READ \"n? \"\nSTORE t0\n"));
    assert_eq!(paths.bytecode, out.join("bytecode.txt"));
}

#[test]
fn test_bytecode_file_runs_like_the_build() {
    let dir = TempDir::new().unwrap();
    let ast = write_ast(dir.path());
    let (paths, _) =
        build_artifacts(&ast, dir.path(), &PipelineConfig::default(), &mut "3\n".as_bytes())
            .unwrap();

    let bytecode = load_bytecode_file(&paths.bytecode).unwrap();
    let mut output = Vec::new();
    execute(bytecode, &PipelineConfig::default(), &mut "3\n".as_bytes(), &mut output).unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        fs::read_to_string(&paths.output).unwrap()
    );
}

#[test]
fn test_optimize_ir_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ir.txt");
    fs::write(&path, "x = 2\ny = 3\nz = x + y\nprint \"\", z\n").unwrap();

    let text = optimize_ir_file(&path, &PipelineConfig::default()).unwrap();
    assert_eq!(text, "z = 5\nprint \"\", z");

    let optimized = dir.path().join("opt.txt");
    fs::write(&optimized, &text).unwrap();
    assert_eq!(
        optimize_ir_file(&optimized, &PipelineConfig::default()).unwrap(),
        text
    );
}

#[test]
fn test_missing_inputs_have_context() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let err = load_program_file(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load AST"));

    let err = load_bytecode_file(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read bytecode"));
}

#[test]
fn test_malformed_inputs() {
    let dir = TempDir::new().unwrap();

    let ast = dir.path().join("bad.json");
    fs::write(&ast, r#"{ "statements": [ { "kind": "Goto" } ] }"#).unwrap();
    let err = load_program_file(&ast).unwrap_err();
    assert!(format!("{:#}", err).contains("malformed AST"));

    let bytecode = dir.path().join("bad.txt");
    fs::write(&bytecode, "PUSH 1\nHALT\n").unwrap();
    let err = load_bytecode_file(&bytecode).unwrap_err();
    assert!(format!("{:#}", err).contains("line 2: unknown opcode `HALT`"));
}

#[test]
fn test_undefined_label_in_bytecode_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jump.txt");
    fs::write(&path, "PRINT \"before\"\nJMP L9\n").unwrap();

    let code = load_bytecode_file(&path).unwrap();
    assert_eq!(code[1], vm::Instruction::Jmp("L9".to_string()));

    let mut output = Vec::new();
    let err = execute(code, &PipelineConfig::default(), &mut "".as_bytes(), &mut output)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("undefined label `L9`"));
    assert!(output.is_empty());
}

#[test]
fn test_written_artifacts_load_back() {
    let dir = TempDir::new().unwrap();
    let program = Program::new(vec![
        Stmt::var_decl("inf", Expr::read("x\"? ")),
        Stmt::print("say \"hi\"\nthen", vec![Expr::var("inf")]),
    ]);
    let ast = dir.path().join("quoted.json");
    fs::write(&ast, serde_json::to_string(&program).unwrap()).unwrap();

    let config = PipelineConfig::default();
    let (paths, _) = build_artifacts(&ast, dir.path(), &config, &mut "4\n".as_bytes()).unwrap();
    assert_eq!(
        fs::read_to_string(&paths.output).unwrap(),
        "x\"? say \"hi\"\nthen\n4\n"
    );

    let ir_text = fs::read_to_string(&paths.ir).unwrap();
    assert!(ir_text.contains("inf = t0"));
    assert_eq!(optimize_ir_file(&paths.ir, &config).unwrap(), ir_text.trim_end());

    let mut output = Vec::new();
    execute(
        load_bytecode_file(&paths.bytecode).unwrap(),
        &config,
        &mut "4\n".as_bytes(),
        &mut output,
    )
    .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        fs::read_to_string(&paths.output).unwrap()
    );
}
