//! Pipeline orchestration and the CLI-facing session (spec.md §11), grounded
//! in `original_source/src/main.c`'s straight-line `if (Error) { ...; return
//! 1; }` checks after every phase.
//!
//! [`Session`] owns the sticky error flag (as "do any diagnostics exist
//! yet", rather than a separate bool — the two are equivalent, and this way
//! there's only one thing to keep in sync) and runs parse → analyze →
//! codegen → liveness/color → emit, stopping at the first phase that
//! records a diagnostic.

use std::fmt::Write as _;

use crate::back::{asm, codegen, regalloc};
use crate::common::Diagnostic;
use crate::front;

/// Which `--t*` trace listings to collect, matching spec.md §6 exactly:
/// `--ts` tokens as scanned, `--tp` the tree, `--ta` the final symbol table,
/// `--tc` comments in the emitted assembly.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceFlags {
    pub tokens: bool,
    pub tree: bool,
    pub symtab: bool,
    pub comments: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    diagnostics: Vec<Diagnostic>,
    trace: TraceFlags,
    listing: String,
}

impl Session {
    pub fn new(trace: TraceFlags) -> Self {
        Session { diagnostics: Vec::new(), trace, listing: String::new() }
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Everything the `--t*` flags asked to have printed, in phase order.
    pub fn listing(&self) -> &str {
        &self.listing
    }

    /// Runs the full pipeline over `source`. Returns the emitted assembly
    /// text on success; on failure, diagnostics are available via
    /// [`Session::diagnostics`] and nothing further runs.
    pub fn compile(&mut self, source: &str) -> Option<String> {
        if self.trace.tokens {
            self.trace_tokens(source);
            if self.has_errors() {
                return None;
            }
        }

        let mut tree = match front::parse(source) {
            Ok(tree) => tree,
            Err(e) => {
                self.diagnostics.push(Diagnostic::error(e.to_string()));
                return None;
            }
        };

        if self.trace.tree {
            let _ = writeln!(self.listing, "{}", front::print::print_tree(&tree));
        }

        let result = crate::middle::analyze::Analyzer::analyze(&mut tree);
        self.diagnostics.extend(result.diagnostics);
        if self.has_errors() {
            return None;
        }
        let symtab = result.symtab;

        if self.trace.symtab {
            let _ = writeln!(self.listing, "{}", symtab.print(&tree));
        }

        let mut ir = codegen::generate(&tree, &symtab);

        regalloc::liveness(&mut ir);
        let graph = regalloc::InterferenceGraph::build(&ir);
        let colors = match regalloc::color(&graph, regalloc::DEFAULT_K) {
            Ok(colors) => colors,
            Err(e) => {
                self.diagnostics.push(Diagnostic::fatal(e.to_string()));
                return None;
            }
        };

        Some(asm::emit(&ir, &colors, self.trace.comments))
    }

    fn trace_tokens(&mut self, source: &str) {
        match front::lex::Lexer::new(source).tokenize() {
            Ok(tokens) => {
                for tok in tokens {
                    let _ = writeln!(self.listing, "{tok}");
                }
            }
            Err(e) => self.diagnostics.push(Diagnostic::fatal(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program() {
        let mut session = Session::new(TraceFlags::default());
        let asm = session.compile("int main(void) { return 0; }");
        assert!(!session.has_errors());
        assert!(asm.unwrap().contains("main:"));
    }

    #[test]
    fn missing_main_is_a_sticky_error_that_skips_codegen() {
        let mut session = Session::new(TraceFlags::default());
        let asm = session.compile("int notmain(void) { return 0; }");
        assert!(session.has_errors());
        assert!(asm.is_none());
    }

    #[test]
    fn parse_error_is_reported_and_halts_the_pipeline() {
        let mut session = Session::new(TraceFlags::default());
        let asm = session.compile("int main(void) { return 0 }");
        assert!(session.has_errors());
        assert!(asm.is_none());
    }

    #[test]
    fn trace_flags_populate_the_listing() {
        let mut session =
            Session::new(TraceFlags { tokens: true, tree: true, symtab: true, comments: false });
        let asm = session.compile("int main(void) { return 0; }");
        assert!(asm.is_some());
        assert!(session.listing().contains("kind:"));
        assert!(session.listing().contains("FuncDecl"));
        assert!(session.listing().contains("Variable Name"));
    }
}
