//! End-to-end tests for the compiler pipeline.
//!
//! The execution tests assemble the output with the system `cc` and check
//! the exit status. They are skipped only when not on x86-64 Linux or when
//! `cc` is not installed; a `cc` failure on the generated assembly fails the
//! test.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use rtcc::{CompileError, generate_assembly};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn scratch_dir() -> PathBuf {
  let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
  let dir = std::env::temp_dir().join(format!("rtcc-test-{}-{id}", std::process::id()));
  fs::create_dir_all(&dir).unwrap();
  dir
}

/// Whether generated programs can be assembled and run on this host.
fn can_execute() -> bool {
  static AVAILABLE: OnceLock<bool> = OnceLock::new();
  *AVAILABLE.get_or_init(|| {
    if !cfg!(all(target_arch = "x86_64", target_os = "linux")) {
      return false;
    }
    let found = Command::new("cc").arg("--version").output().is_ok();
    if !found {
      eprintln!("skipping execution tests: cc not found");
    }
    found
  })
}

/// Compile, assemble and run `src`, returning the exit status.
fn run(src: &str) -> Option<i32> {
  if !can_execute() {
    return None;
  }

  let asm = generate_assembly(src).unwrap();
  let dir = scratch_dir();
  let asm_path = dir.join("prog.s");
  let exe_path = dir.join("prog");
  fs::write(&asm_path, &asm).unwrap();

  let assembled = Command::new("cc")
    .arg("-o")
    .arg(&exe_path)
    .arg(&asm_path)
    .output()
    .unwrap();
  if !assembled.status.success() {
    let _ = fs::remove_dir_all(&dir);
    panic!(
      "cc rejected the output for {src:?}:\n{}\n{asm}",
      String::from_utf8_lossy(&assembled.stderr)
    );
  }

  let status = Command::new(&exe_path).status();
  let _ = fs::remove_dir_all(&dir);
  status.unwrap().code()
}

fn assert_exit(src: &str, expected: i32) {
  if let Some(code) = run(src) {
    assert_eq!(code, expected, "program: {src}");
  }
}

#[test]
fn returns_literals_modulo_the_exit_width() {
  assert_exit("return 0;", 0);
  assert_exit("return 42;", 42);
  assert_exit("return 255;", 255);
  assert_exit("return 256;", 0);
  assert_exit("return 4294967338;", 42);
}

#[test]
fn respects_precedence_and_parentheses() {
  assert_exit("1+2*3;", 7);
  assert_exit("(1+2)*3;", 9);
  assert_exit("return 5+20-4;", 21);
  assert_exit("return (3+5)/2;", 4);
  assert_exit("return -10+20;", 10);
  assert_exit("return - -10;", 10);
  assert_exit("return - - +10;", 10);
}

#[test]
fn subtraction_and_assignment_associativity() {
  assert_exit("10-2-3;", 5);
  assert_exit("a=b=5; return a;", 5);
  assert_exit("a=b=5; return b;", 5);
  assert_exit("a=b=5; return a+b;", 10);
}

#[test]
fn comparisons_yield_zero_or_one() {
  for (src, expected) in [
    ("return 1<2;", 1),
    ("return 2<1;", 0),
    ("return 1==1;", 1),
    ("return 1!=1;", 0),
    ("return 2<=2;", 1),
    ("return 3<=2;", 0),
    ("return 2>1;", 1),
    ("return 1>2;", 0),
    ("return 2>=2;", 1),
    ("return 1>=2;", 0),
    ("return (1<2)+(3>4)*7+(5==5);", 2),
  ] {
    assert_exit(src, expected);
  }
}

#[test]
fn locals_keep_their_values() {
  assert_exit("a=3; b=5*6-8; return a+b/2;", 14);
  assert_exit("foo=3; bar=4; return foo*bar;", 12);
  assert_exit("ab=7; return a;", 7);
  assert_exit("x=2; xy=x+3; return x;", 5);
  assert_exit("x=1; x=x+1; x=x*10; return x;", 20);
}

#[test]
fn first_return_wins() {
  assert_exit("return 1; return 2;", 1);
  assert_exit("a=1; return a; a=2; return a;", 1);
}

#[test]
fn last_statement_value_is_left_in_rax() {
  assert_exit("1; 2; 3;", 3);
}

#[test]
fn emits_intel_syntax_header_for_main() {
  let asm = generate_assembly("return 1;").unwrap();
  let mut lines = asm.lines();
  assert_eq!(lines.next(), Some(".intel_syntax noprefix"));
  assert_eq!(lines.next(), Some(".global main"));
  assert_eq!(lines.next(), Some("main:"));
  assert!(asm.ends_with(".L.return:\n  mov rsp, rbp\n  pop rbp\n  ret\n"));
}

#[test]
fn large_literals_are_loaded_in_full() {
  let asm = generate_assembly("return 5000000000;").unwrap();
  assert!(asm.contains("  mov rax, 5000000000\n"));
}

#[test]
fn malformed_programs_report_the_failing_offset() {
  for (src, loc) in [("1+;", 2), ("(1+2;", 4), ("1=2;", 0), ("a=1; 2 $ 3;", 7)] {
    let err = generate_assembly(src).unwrap_err();
    assert_eq!(err.loc(), Some(loc), "program: {src}");
  }
}

#[test]
fn lvalue_errors_come_from_codegen() {
  let err = generate_assembly("a+1=2;").unwrap_err();
  assert!(matches!(err, CompileError::NotLvalue { .. }));
  assert_eq!(err.to_string(), "a+1=2;\n ^ not an lvalue");
}
