#[macro_use]
extern crate log;

pub mod read;
mod thread;

pub use read::{read, Op, Operand, ReadError, Reg};
pub use thread::Thread;

/// read then run a listing in one go
/// ```
/// let status = rvmkiln::run("mov rax, 60\nmov rdi, 3\nsyscall").unwrap();
/// assert_eq!(status, 3);
/// ```
pub fn run(text: &str) -> Result<u8, ReadError> {
    let mut thread = Thread::new(read(text)?);
    Ok(thread.run())
}
