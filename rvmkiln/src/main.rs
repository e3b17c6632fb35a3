extern crate rvmkiln;
use rvmkiln::{read, Thread};

fn main() {
    env_logger::init();
    let code_filename = match std::env::args().nth(1) {
        Some(name) => name,
        None => {
            eprintln!("usage: rvmkiln <file.asm>");
            std::process::exit(2);
        }
    };
    let text = match std::fs::read_to_string(&code_filename) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("could not read {}: {}", code_filename, e);
            std::process::exit(2);
        }
    };
    let ops = match read(&text) {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let mut thread = Thread::new(ops);
    std::process::exit(i32::from(thread.run()));
}
