extern crate rkiln;
use rkiln::{compile, CompileError};
use std::path::Path;
// We use rvmkiln for convenient integration testing
// Not a build dependency, just for this test.
extern crate rvmkiln;
use rvmkiln::{read, Thread};

// Log needs to be initialized once in the async mess that is cargo test
use std::sync::Once;
static LOGGER_INIT: Once = Once::new();

fn ensure_log_init() {
    LOGGER_INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init()
    });
}

fn is_script(path: &Path) -> bool {
    path.is_file() && path.extension().map_or(false, |ext| ext == "kn")
}

fn compile_file(path: &Path) -> Result<String, CompileError> {
    let script_string = std::fs::read_to_string(path).expect("could not load given file");
    compile(&script_string)
}

fn compile_safe(path: &Path) -> String {
    match compile_file(path) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e);
            panic!("file test failed to compile");
        }
    }
}

fn load(path: &Path) -> Thread {
    let listing = compile_safe(path);
    match read(&listing) {
        Ok(ops) => Thread::new(ops),
        Err(e) => panic!("emitted listing did not read back: {}\n{}", e, listing),
    }
}

/// By convention IN THIS TEST SUITE ONLY the first line of every script is
/// `// exit: N` giving the status it should exit with
fn expected_status(path: &Path) -> u8 {
    let text = std::fs::read_to_string(path).expect("could not load given file");
    let first = text.lines().next().unwrap_or("");
    match first.trim().strip_prefix("// exit:") {
        Some(status) => status.trim().parse().expect("exit status should be 0-255"),
        None => panic!("{} has no `// exit: N` header", path.display()),
    }
}

fn run_in_dir(dir: &str) -> std::io::Result<()> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_script(&path) {
            println!("TESTING: {}", path.to_string_lossy());
            let expected = expected_status(&path);
            let mut thread = load(&path);
            assert_eq!(thread.run(), expected, "wrong exit status for {}", path.display());
            count += 1;
        }
    }
    assert!(count > 0, "no scripts found in {}", dir);
    Ok(())
}

#[test]
fn test_scripts() -> std::io::Result<()> {
    ensure_log_init();
    run_in_dir("tests/scripts")
}

fn test_should_fail(path: &Path) {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    println!("TESTING (SHOULD PANIC): {}", path.to_string_lossy());
    // Compilation should succeed
    // As well as LOADING into the vm
    let mut thread = load(path);
    let mut wrapped = AssertUnwindSafe(&mut thread);
    let result = catch_unwind(move || wrapped.run());
    assert!(result.is_err());
}

#[test]
fn test_fails() -> std::io::Result<()> {
    ensure_log_init();
    for entry in std::fs::read_dir("tests/scripts/fail")? {
        let path = entry?.path();
        if is_script(&path) {
            test_should_fail(&path);
        }
    }
    Ok(())
}

// errors / ui
#[test]
fn test_errors() -> std::io::Result<()> {
    ensure_log_init();
    for entry in std::fs::read_dir("tests/scripts/error")? {
        let path = entry?.path();
        if !is_script(&path) {
            continue;
        }
        println!("TESTING: {}", path.to_string_lossy());
        let out_path = path.with_extension("stderr");
        if !out_path.is_file() {
            panic!("no expected output for test at {}", out_path.to_string_lossy());
        }
        let expected = std::fs::read_to_string(&out_path)?;
        match compile_file(&path) {
            Ok(_) => panic!("{} compiled but should not have", path.display()),
            Err(e) => assert_eq!(e.to_string().trim(), expected.trim()),
        }
    }
    Ok(())
}

#[test]
fn listing_shape() {
    let listing = compile("let a = 2;\nexit(a);").expect("should compile");
    assert_eq!(
        listing,
        "global _start
_start:
    mov rax, 2
    push rax
    push QWORD [rsp]
    mov rax, 60
    pop rdi
    syscall
    mov rax, 60
    mov rdi, 0
    syscall
"
    );
}
