//! The syntax-directed AST → IR translator (spec.md §3.4/§4.4), grounded in
//! `original_source/src/backend/cgen.c`'s `gen_code`/`gen_condition`/
//! `calculate_local_size`.
//!
//! One function, [`generate`], walks the already-analyzed tree once and
//! builds an [`Ir`] program. Every declaration has been resolved to a
//! [`SymbolTable`] entry by this point, so the only thing codegen decides is
//! *which* addressing-mode case an access needs — never whether a name
//! exists or what type it has.

use crate::common::{Id, NodeId};
use crate::front::ast::{ExprKind, NodeKind, OpKind, StmtKind, Tree};
use crate::middle::analyze::array_length;
use crate::middle::symtab::{Entry, SymbolTable};

use super::ir::{Ir, IrId, MReg, Reg};

fn intern(s: String) -> Id {
    internment::Intern::new(s)
}

/// Per-function state that outlives any single statement: the label a
/// `Return` jumps to, and the jumps waiting for it to exist.
struct FuncCtx {
    end_label: Id,
    pending_returns: Vec<IrId>,
}

pub fn generate(tree: &Tree, symtab: &SymbolTable) -> Ir {
    let mut ir = Ir::new();

    ir.insert_comment("entry point");
    ir.insert_call(intern("main".to_string()));
    ir.insert_addi(Reg::Machine(MReg::A7), Reg::Machine(MReg::Zero), 10);
    ir.insert_ecall();

    for decl in tree.siblings(tree.root) {
        if matches!(tree.get(decl).kind, NodeKind::Expr(ExprKind::FuncDecl)) {
            gen_function(tree, symtab, &mut ir, decl);
        }
    }

    ir
}

/// Locals declared anywhere in `body` (the function's own block plus every
/// nested `Compound`, following `If`/`While` bodies but never a body-level
/// statement's *sibling* beyond what that recursion already visits) — the
/// same shape `build_symtab_stmt` walks in pass 1, so the byte count lines up
/// exactly with the offsets pass 1 assigned.
fn calculate_local_size(tree: &Tree, body: NodeId) -> i32 {
    let mut words: i64 = 0;
    walk_locals(tree, body, &mut words);
    4 * words as i32
}

fn walk_locals(tree: &Tree, id: NodeId, words: &mut i64) {
    let node = tree.get(id);
    match node.kind {
        NodeKind::Stmt(StmtKind::Compound) => {
            for decl in tree.siblings(node.children[0]) {
                *words += array_length(tree, tree.get(decl)).max(1);
            }
            for stmt in tree.siblings(node.children[1]) {
                walk_locals(tree, stmt, words);
            }
        }
        NodeKind::Stmt(StmtKind::If) => {
            walk_locals(tree, node.children[1].unwrap(), words);
            if let Some(else_id) = node.children[2] {
                walk_locals(tree, else_id, words);
            }
        }
        NodeKind::Stmt(StmtKind::While) => {
            walk_locals(tree, node.children[1].unwrap(), words);
        }
        _ => {}
    }
}

fn fp() -> Reg {
    Reg::Machine(MReg::Fp)
}
fn sp() -> Reg {
    Reg::Machine(MReg::Sp)
}
fn ra() -> Reg {
    Reg::Machine(MReg::Ra)
}
fn zero() -> Reg {
    Reg::Machine(MReg::Zero)
}
fn a0() -> Reg {
    Reg::Machine(MReg::A0)
}
fn a7() -> Reg {
    Reg::Machine(MReg::A7)
}
fn t0() -> Reg {
    Reg::Machine(MReg::T0)
}

/// Prologue saves the caller's frame pointer and return address just below
/// the incoming arguments (`fp+8`, `fp+12`, ... — `Pass1State::param_offset`
/// starts at 8 for exactly this reason), then reserves the local frame below
/// that. The epilogue undoes it in the opposite order and returns through
/// `JUMP_REG ra`.
fn gen_function(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, decl: NodeId) {
    let node = tree.get(decl).clone();
    let name = node.attr.name();
    let body = node.children[1].expect("function body");
    let local_bytes = calculate_local_size(tree, body);

    ir.insert_comment(format!("function {name}"));
    ir.insert_label(name);
    ir.insert_store(fp(), -8, sp());
    ir.insert_store(ra(), -4, sp());
    ir.insert_addi(fp(), sp(), -8);
    ir.insert_addi(sp(), sp(), -(8 + local_bytes));

    let end_label = intern(format!("end_{name}"));
    let mut ctx = FuncCtx { end_label, pending_returns: Vec::new() };

    let body_node = tree.get(body).clone();
    for stmt in tree.siblings(body_node.children[1]) {
        gen_stmt(tree, symtab, ir, stmt, &mut ctx);
    }

    let end_id = ir.insert_label(end_label);
    for jump in ctx.pending_returns {
        ir.set_target(jump, end_id);
    }
    ir.insert_load(ra(), 4, fp());
    ir.insert_load(t0(), 0, fp());
    ir.insert_addi(sp(), fp(), 8);
    ir.insert_mov(fp(), t0());
    ir.insert_jump_reg(ra());
}

// --- statements -------------------------------------------------------

fn gen_stmt(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, id: NodeId, ctx: &mut FuncCtx) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Stmt(StmtKind::Compound) => {
            for stmt in tree.siblings(node.children[1]) {
                gen_stmt(tree, symtab, ir, stmt, ctx);
            }
        }
        NodeKind::Stmt(StmtKind::If) => gen_if(tree, symtab, ir, &node, ctx),
        NodeKind::Stmt(StmtKind::While) => gen_while(tree, symtab, ir, &node, ctx),
        NodeKind::Stmt(StmtKind::Return) => {
            if let Some(value) = node.children[0] {
                let v = gen_expr(tree, symtab, ir, value);
                ir.insert_mov(a0(), v);
            }
            let jump = ir.insert_jump(ctx.end_label);
            ctx.pending_returns.push(jump);
        }
        NodeKind::Stmt(StmtKind::Read) => {
            ir.insert_addi(a7(), zero(), 5);
            ir.insert_ecall();
            gen_store(tree, symtab, ir, node.children[0].unwrap(), a0());
        }
        NodeKind::Stmt(StmtKind::Write) => {
            let v = gen_expr(tree, symtab, ir, node.children[0].unwrap());
            ir.insert_mov(a0(), v);
            ir.insert_addi(a7(), zero(), 1);
            ir.insert_ecall();
            ir.insert_addi(a0(), zero(), 10);
            ir.insert_addi(a7(), zero(), 11);
            ir.insert_ecall();
        }
        NodeKind::Stmt(StmtKind::Assign) => {
            let v = gen_expr(tree, symtab, ir, node.children[1].unwrap());
            gen_store(tree, symtab, ir, node.children[0].unwrap(), v);
        }
        NodeKind::Expr(_) => unreachable!("statement list contains a bare expression node"),
    }
}

/// Reverse-branch lowering (spec.md's table): the branch emitted is the
/// *negation* of the written condition, jumping past the then-body (or out
/// of the loop) when the condition is false.
fn gen_condition(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, cond: NodeId, target: Id) -> IrId {
    let node = tree.get(cond).clone();
    let lhs = gen_expr(tree, symtab, ir, node.children[0].unwrap());
    let rhs = gen_expr(tree, symtab, ir, node.children[1].unwrap());
    match node.attr.op() {
        OpKind::Eq => ir.insert_bne(lhs, rhs, target),
        OpKind::Ne => ir.insert_beq(lhs, rhs, target),
        OpKind::Lt => ir.insert_bge(lhs, rhs, target),
        OpKind::Le => ir.insert_bgt(lhs, rhs, target),
        OpKind::Gt => ir.insert_ble(lhs, rhs, target),
        OpKind::Ge => ir.insert_blt(lhs, rhs, target),
        _ => unreachable!("condition must be a relational operator"),
    }
}

fn gen_if(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, node: &crate::front::ast::Node, ctx: &mut FuncCtx) {
    let n = ir.next_if_label();
    let cond = node.children[0].unwrap();
    let then_body = node.children[1].unwrap();

    match node.children[2] {
        None => {
            let end_label = intern(format!("end_if_{n}"));
            let branch = gen_condition(tree, symtab, ir, cond, end_label);
            gen_stmt(tree, symtab, ir, then_body, ctx);
            let end_id = ir.insert_label(end_label);
            ir.set_target(branch, end_id);
        }
        Some(else_body) => {
            let else_label = intern(format!("else_{n}"));
            let end_label = intern(format!("end_if_{n}"));
            let branch = gen_condition(tree, symtab, ir, cond, else_label);
            gen_stmt(tree, symtab, ir, then_body, ctx);
            let skip_else = ir.insert_jump(end_label);
            let else_id = ir.insert_label(else_label);
            ir.set_target(branch, else_id);
            gen_stmt(tree, symtab, ir, else_body, ctx);
            let end_id = ir.insert_label(end_label);
            ir.set_target(skip_else, end_id);
        }
    }
}

fn gen_while(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, node: &crate::front::ast::Node, ctx: &mut FuncCtx) {
    let n = ir.next_while_label();
    let start_label = intern(format!("start_while_{n}"));
    let end_label = intern(format!("end_while_{n}"));

    let start_id = ir.insert_label(start_label);
    let cond = node.children[0].unwrap();
    let branch = gen_condition(tree, symtab, ir, cond, end_label);
    gen_stmt(tree, symtab, ir, node.children[1].unwrap(), ctx);
    let back = ir.insert_jump(start_label);
    ir.set_target(back, start_id);
    let end_id = ir.insert_label(end_label);
    ir.set_target(branch, end_id);
}

// --- expressions and addressing ----------------------------------------

fn resolve<'a>(tree: &Tree, symtab: &'a SymbolTable, id: NodeId) -> &'a Entry {
    let node = tree.get(id);
    let name = node.attr.name();
    let scope = node.scope.expect("analyzed tree resolves every name use to a scope");
    symtab.lookup(name, scope).expect("analyzed tree resolves every name use to an entry")
}

/// The address of element 0 of an array — computed directly for a global or
/// a local `ArrDecl` (the sign of `entry.offset` tells them apart from a
/// parameter), or loaded as a pointer for a `ParamArr`, which only ever
/// holds the address an earlier frame computed the same way. Element access
/// then adds `4 * index` uniformly on top of whichever of these three a
/// given name resolves to.
fn gen_array_base(ir: &mut Ir, entry: &Entry) -> Reg {
    if let Some(address) = entry.address {
        let base = ir.new_vreg();
        ir.insert_li(base, address as i64);
        base
    } else {
        let offset = entry.offset.expect("array entry has an address or a frame offset");
        if offset > 0 {
            let base = ir.new_vreg();
            ir.insert_load(base, offset, fp());
            base
        } else {
            let base = ir.new_vreg();
            ir.insert_addi(base, fp(), offset);
            base
        }
    }
}

fn gen_expr(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, id: NodeId) -> Reg {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Expr(ExprKind::Const) => {
            let dest = ir.new_vreg();
            ir.insert_li(dest, node.attr.int());
            dest
        }
        NodeKind::Expr(ExprKind::Op) => {
            let lhs = gen_expr(tree, symtab, ir, node.children[0].unwrap());
            let rhs = gen_expr(tree, symtab, ir, node.children[1].unwrap());
            let dest = ir.new_vreg();
            match node.attr.op() {
                OpKind::Add => ir.insert_add(dest, lhs, rhs),
                OpKind::Sub => ir.insert_sub(dest, lhs, rhs),
                OpKind::Mul => ir.insert_mul(dest, lhs, rhs),
                OpKind::Div => ir.insert_div(dest, lhs, rhs),
                OpKind::Mod => ir.insert_rem(dest, lhs, rhs),
                _ => unreachable!(
                    "relational operators only appear as If/While condition children \
                     in a tree that passed type-checking"
                ),
            };
            dest
        }
        NodeKind::Expr(ExprKind::Var) => {
            let entry = resolve(tree, symtab, id);
            if let Some(address) = entry.address {
                let base = ir.new_vreg();
                ir.insert_li(base, address as i64);
                let dest = ir.new_vreg();
                ir.insert_load(dest, 0, base);
                dest
            } else {
                let offset = entry.offset.expect("scalar entry has an address or a frame offset");
                let dest = ir.new_vreg();
                ir.insert_load(dest, offset, fp());
                dest
            }
        }
        NodeKind::Expr(ExprKind::Arr) => {
            let entry = resolve(tree, symtab, id).clone();
            let base = gen_array_base(ir, &entry);
            match node.children[0] {
                Some(index) => {
                    let idx = gen_expr(tree, symtab, ir, index);
                    let offset = ir.new_vreg();
                    ir.insert_slli(offset, idx, 2);
                    let addr = ir.new_vreg();
                    ir.insert_add(addr, base, offset);
                    let dest = ir.new_vreg();
                    ir.insert_load(dest, 0, addr);
                    dest
                }
                // A bare array name outside a call argument position only
                // type-checks in a call's argument list; everywhere else
                // this is unreachable for a program that passed analysis.
                None => base,
            }
        }
        NodeKind::Expr(ExprKind::FuncCall) => gen_call(tree, symtab, ir, id),
        NodeKind::Expr(
            ExprKind::VarDecl | ExprKind::ArrDecl | ExprKind::ParamVar | ExprKind::ParamArr | ExprKind::FuncDecl,
        ) => unreachable!("declarations are not evaluated as expressions"),
        NodeKind::Stmt(_) => unreachable!("statement reached through expression recursion"),
    }
}

fn gen_store(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, id: NodeId, value: Reg) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Expr(ExprKind::Var) => {
            let entry = resolve(tree, symtab, id);
            if let Some(address) = entry.address {
                let base = ir.new_vreg();
                ir.insert_li(base, address as i64);
                ir.insert_store(value, 0, base);
            } else {
                let offset = entry.offset.expect("scalar entry has an address or a frame offset");
                ir.insert_store(value, offset, fp());
            }
        }
        NodeKind::Expr(ExprKind::Arr) => {
            let entry = resolve(tree, symtab, id).clone();
            let base = gen_array_base(ir, &entry);
            let index = node.children[0].expect("a store target array access always carries an index");
            let idx = gen_expr(tree, symtab, ir, index);
            let offset = ir.new_vreg();
            ir.insert_slli(offset, idx, 2);
            let addr = ir.new_vreg();
            ir.insert_add(addr, base, offset);
            ir.insert_store(value, 0, addr);
        }
        _ => unreachable!("assignment/read target must be a Var or Arr node"),
    }
}

/// Evaluates a call's arguments left to right, passing a bare array name by
/// address in one of three ways depending on where it was declared, per
/// spec.md: a global array's known absolute address, a local array's
/// frame-relative address, or a parameter array's already-received pointer
/// forwarded unchanged.
fn gen_call(tree: &Tree, symtab: &SymbolTable, ir: &mut Ir, id: NodeId) -> Reg {
    let node = tree.get(id).clone();
    let args: Vec<NodeId> = tree.siblings(node.children[0]);

    let arg_regs: Vec<Reg> = args
        .iter()
        .map(|&arg| {
            let arg_node = tree.get(arg);
            let is_bare_array =
                matches!(arg_node.kind, NodeKind::Expr(ExprKind::Arr)) && arg_node.children[0].is_none();
            if is_bare_array {
                let entry = resolve(tree, symtab, arg).clone();
                gen_array_base(ir, &entry)
            } else {
                gen_expr(tree, symtab, ir, arg)
            }
        })
        .collect();

    if !arg_regs.is_empty() {
        ir.insert_addi(sp(), sp(), -4 * arg_regs.len() as i32);
        for (i, &reg) in arg_regs.iter().enumerate() {
            ir.insert_store(reg, 4 * i as i32, sp());
        }
    }
    ir.insert_call(node.attr.name());
    if !arg_regs.is_empty() {
        ir.insert_addi(sp(), sp(), 4 * arg_regs.len() as i32);
    }

    let dest = ir.new_vreg();
    ir.insert_mov(dest, a0());
    dest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse;
    use crate::middle::analyze::Analyzer;

    fn compile(src: &str) -> (Tree, SymbolTable) {
        let mut tree = parse(src).expect("parses");
        let result = Analyzer::analyze(&mut tree);
        assert!(!result.has_errors(), "unexpected diagnostics: {:?}", result.diagnostics);
        (tree, result.symtab)
    }

    #[test]
    fn entry_point_calls_main_then_exits() {
        let (tree, symtab) = compile("int main(void) { return 0; }");
        let ir = generate(&tree, &symtab);
        let ids: Vec<IrId> = ir.ids().collect();
        assert_eq!(ir.get(ids[0]).op, super::super::ir::Op::Comment);
        let call = ir.get(ids[1]);
        assert_eq!(call.op, super::super::ir::Op::Call);
        assert_eq!(call.text.as_deref(), Some("main"));
    }

    #[test]
    fn global_array_write_uses_absolute_address() {
        let (tree, symtab) = compile(
            "int a[10];
             void main(void) { a[0] = 5; }",
        );
        let ir = generate(&tree, &symtab);
        assert!(ir.ids().any(|id| ir.get(id).op == super::super::ir::Op::Store));
    }

    #[test]
    fn if_else_backpatches_both_labels() {
        let (tree, symtab) = compile(
            "int main(void) {
                 if (1 < 2) { return 1; } else { return 0; }
             }",
        );
        let ir = generate(&tree, &symtab);
        let branches: Vec<_> = ir.ids().filter(|&id| ir.get(id).op.is_branch()).collect();
        assert_eq!(branches.len(), 1);
        assert!(ir.get(branches[0]).target.is_some());
    }

    #[test]
    fn while_loop_jumps_back_to_its_start_label() {
        let (tree, symtab) = compile(
            "int main(void) {
                 int i;
                 i = 0;
                 while (i < 10) { i = i + 1; }
                 return 0;
             }",
        );
        let ir = generate(&tree, &symtab);
        let jump = ir.ids().find(|&id| ir.get(id).op == super::super::ir::Op::Jump).expect("back-edge jump");
        assert!(ir.get(jump).target.is_some());
    }

    #[test]
    fn recursive_call_reserves_and_restores_the_stack() {
        let (tree, symtab) = compile(
            "int fact(int n) {
                 if (n == 0) return 1;
                 return n * fact(n - 1);
             }
             int main(void) { return fact(5); }",
        );
        let ir = generate(&tree, &symtab);
        assert!(ir.ids().any(|id| ir.get(id).op == super::super::ir::Op::Call
            && ir.get(id).text.as_deref() == Some("fact")));
    }
}
