/// a span is a location in the source, from the beginning (lo) to the end (hi)
/// represented as (line, col), both starting at 1. Every token carries one, and
/// the parser hands them on to the AST nodes that need them for diagnostics
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct Span {
    pub lo: (usize, usize),
    pub hi: (usize, usize),
}
impl Span {
    pub fn new() -> Self {
        Self::default()
    }
    /// a span covering exactly one position
    pub fn at(line: usize, col: usize) -> Self {
        Self { lo: (line, col), hi: (line, col) }
    }
}
impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if *self == Span::new() {
            write!(f, "internal")
        } else {
            write!(f, "{}:{}", self.lo.0, self.lo.1)
        }
    }
}
