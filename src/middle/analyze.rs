//! Two-pass semantic analysis (spec.md §4.1/§4.2), grounded in
//! `original_source/src/frontend/analyze.c`.
//!
//! Pass 1 (`build_symtab`) walks the tree once, inserting every declaration
//! into the symbol table at the scope it belongs to and resolving every use
//! (`Var`/`Arr`/`FuncCall`) against the nearest active enclosing scope, as it
//! goes. A `Var` use that turns out to resolve to an array declaration is
//! reclassified to `Arr` in place, so pass 2 and code generation never have
//! to re-derive that fact. Pass 2 (`type_check`) walks the now fully
//! resolved tree once more, checking operand and condition types, call
//! arity/shape, and that every non-void function returns on all paths.
//!
//! Where the C original used module-level mutable globals for the scope
//! counter, the address/offset cursors, and the sticky error flag, this
//! version threads them through `Pass1State`/`Pass2State` instead.

use crate::common::{Diagnostic, Id, NodeId, ScopeId};
use crate::front::ast::{ExprKind, ExprType, NodeKind, StmtKind, Tree};

use super::symtab::{self, SymbolTable};

pub struct AnalysisResult {
    pub symtab: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

pub struct Analyzer;

impl Analyzer {
    pub fn analyze(tree: &mut Tree) -> AnalysisResult {
        let mut symtab = SymbolTable::new();
        let decls = tree.siblings(tree.root);

        let mut pass1 = Pass1State::new();
        for &decl in &decls {
            build_symtab_top(tree, &mut symtab, &mut pass1, decl);
        }

        let main = internment::Intern::new("main".to_string());
        let has_main = symtab
            .lookup(main, 0)
            .is_some_and(|e| matches!(tree.get(e.node).kind, NodeKind::Expr(ExprKind::FuncDecl)));
        if !has_main {
            pass1.diags.push(Diagnostic::error("main function not found"));
        }

        let mut diags = pass1.diags;
        for &decl in &decls {
            type_check_top(tree, &symtab, &mut diags, decl);
        }

        AnalysisResult { symtab, diagnostics: diags }
    }
}

// --- Pass 1: scope and symbol resolution -----------------------------------

struct Pass1State {
    next_scope: ScopeId,
    global_addr: u32,
    param_offset: i32,
    local_offset: i32,
    diags: Vec<Diagnostic>,
}

impl Pass1State {
    fn new() -> Self {
        Pass1State {
            next_scope: 1,
            global_addr: symtab::GLOBAL_BASE_ADDRESS,
            param_offset: 8,
            local_offset: 0,
            diags: Vec::new(),
        }
    }
}

fn build_symtab_top(tree: &mut Tree, symtab: &mut SymbolTable, st: &mut Pass1State, id: NodeId) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Expr(ExprKind::VarDecl) | NodeKind::Expr(ExprKind::ArrDecl) => {
            declare_global(tree, symtab, st, id);
        }
        NodeKind::Expr(ExprKind::FuncDecl) => {
            declare_function(tree, symtab, st, id);
        }
        _ => unreachable!("top-level declaration list contains a non-declaration node"),
    }
}

fn declare_global(tree: &mut Tree, symtab: &mut SymbolTable, st: &mut Pass1State, id: NodeId) {
    let node = tree.get(id).clone();
    let name = node.attr.name();
    let length = array_length(tree, &node);
    if let Some(existing) = symtab.lookup(name, 0) {
        if existing.active {
            st.diags.push(Diagnostic::var_error(
                "variable",
                name,
                "is redefined",
                node.line,
                0,
            ));
            return;
        }
    }
    let address = st.global_addr;
    st.global_addr += 4 * length.max(1);
    symtab.insert(name, id, 0, node.line, Some(address), None);
    tree.get_mut(id).scope = Some(0);
}

fn declare_function(tree: &mut Tree, symtab: &mut SymbolTable, st: &mut Pass1State, id: NodeId) {
    let node = tree.get(id).clone();
    let name = node.attr.name();
    if let Some(existing) = symtab.lookup(name, 0) {
        if existing.active {
            st.diags.push(Diagnostic::var_error(
                "function",
                name,
                "is redefined",
                node.line,
                0,
            ));
        }
    } else {
        symtab.insert(name, id, 0, node.line, None, None);
    }
    tree.get_mut(id).scope = Some(0);

    let scope = st.next_scope;
    st.next_scope += 1;
    st.param_offset = 8;
    st.local_offset = 0;

    let mut declared_here = Vec::new();
    for param in tree.siblings(node.children[0]) {
        declared_here.push(declare_param(tree, symtab, st, param, scope));
    }

    // The function body is a Compound, but it shares `scope` with the
    // parameters instead of opening a scope of its own.
    let body = node.children[1].expect("function body");
    let body_node = tree.get(body).clone();
    for decl in tree.siblings(body_node.children[0]) {
        declared_here.push(declare_local(tree, symtab, st, decl, scope));
    }
    tree.get_mut(body).scope = Some(scope);
    for stmt in tree.siblings(body_node.children[1]) {
        build_symtab_stmt(tree, symtab, st, stmt, scope);
    }

    for name in declared_here.into_iter().flatten() {
        symtab.delete(name, scope);
    }
}

/// A variable/parameter declaration clashes if a *function* with the same
/// name is already declared (functions always live at scope 0) — spec.md
/// §4.2/§7's "name-clashes-with-function" case, distinct from an ordinary
/// same-scope redeclaration.
fn clashes_with_function(tree: &Tree, symtab: &SymbolTable, name: Id) -> bool {
    symtab
        .lookup(name, 0)
        .is_some_and(|e| e.active && matches!(tree.get(e.node).kind, NodeKind::Expr(ExprKind::FuncDecl)))
}

/// Returns the declared name on success, so the caller can deactivate it
/// once the enclosing scope closes. `None` means the declaration itself was
/// rejected (redefinition) and nothing was inserted.
fn declare_param(
    tree: &mut Tree,
    symtab: &mut SymbolTable,
    st: &mut Pass1State,
    id: NodeId,
    scope: ScopeId,
) -> Option<Id> {
    let node = tree.get(id).clone();
    let name = node.attr.name();
    if symtab.lookup(name, scope).is_some_and(|e| e.active) {
        st.diags.push(Diagnostic::var_error("parameter", name, "is redefined", node.line, scope));
        return None;
    }
    if clashes_with_function(tree, symtab, name) {
        st.diags.push(Diagnostic::var_error(
            "parameter",
            name,
            "has the name of a function already declared",
            node.line,
            scope,
        ));
        return None;
    }
    let offset = st.param_offset;
    st.param_offset += 4;
    symtab.insert(name, id, scope, node.line, None, Some(offset));
    tree.get_mut(id).scope = Some(scope);
    Some(name)
}

fn declare_local(
    tree: &mut Tree,
    symtab: &mut SymbolTable,
    st: &mut Pass1State,
    id: NodeId,
    scope: ScopeId,
) -> Option<Id> {
    let node = tree.get(id).clone();
    let name = node.attr.name();
    let length = array_length(tree, &node);
    if symtab.lookup(name, scope).is_some_and(|e| e.active) {
        st.diags.push(Diagnostic::var_error("variable", name, "is redefined", node.line, scope));
        return None;
    }
    if clashes_with_function(tree, symtab, name) {
        st.diags.push(Diagnostic::var_error(
            "variable",
            name,
            "has the name of a function already declared",
            node.line,
            scope,
        ));
        return None;
    }
    st.local_offset -= 4 * length.max(1);
    let offset = st.local_offset;
    symtab.insert(name, id, scope, node.line, None, Some(offset));
    tree.get_mut(id).scope = Some(scope);
    Some(name)
}

pub(crate) fn array_length(tree: &Tree, decl: &crate::front::ast::Node) -> i64 {
    match decl.children[0] {
        Some(len_id) => tree.get(len_id).attr.int(),
        None => 1,
    }
}

fn build_symtab_stmt(tree: &mut Tree, symtab: &mut SymbolTable, st: &mut Pass1State, id: NodeId, scope: ScopeId) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Stmt(StmtKind::Compound) => {
            let inner = st.next_scope;
            st.next_scope += 1;
            let mut declared_here = Vec::new();
            for decl in tree.siblings(node.children[0]) {
                declared_here.push(declare_local(tree, symtab, st, decl, inner));
            }
            tree.get_mut(id).scope = Some(inner);
            for stmt in tree.siblings(node.children[1]) {
                build_symtab_stmt(tree, symtab, st, stmt, inner);
            }
            for name in declared_here.into_iter().flatten() {
                symtab.delete(name, inner);
            }
        }
        NodeKind::Stmt(StmtKind::If) => {
            build_symtab_expr(tree, symtab, st, node.children[0].unwrap(), scope);
            build_symtab_stmt(tree, symtab, st, node.children[1].unwrap(), scope);
            if let Some(else_id) = node.children[2] {
                build_symtab_stmt(tree, symtab, st, else_id, scope);
            }
        }
        NodeKind::Stmt(StmtKind::While) => {
            build_symtab_expr(tree, symtab, st, node.children[0].unwrap(), scope);
            build_symtab_stmt(tree, symtab, st, node.children[1].unwrap(), scope);
        }
        NodeKind::Stmt(StmtKind::Return) => {
            if let Some(value) = node.children[0] {
                build_symtab_expr(tree, symtab, st, value, scope);
            }
        }
        NodeKind::Stmt(StmtKind::Read) => {
            build_symtab_expr(tree, symtab, st, node.children[0].unwrap(), scope);
        }
        NodeKind::Stmt(StmtKind::Write) => {
            build_symtab_expr(tree, symtab, st, node.children[0].unwrap(), scope);
        }
        NodeKind::Stmt(StmtKind::Assign) => {
            build_symtab_expr(tree, symtab, st, node.children[0].unwrap(), scope);
            build_symtab_expr(tree, symtab, st, node.children[1].unwrap(), scope);
        }
        NodeKind::Expr(_) => build_symtab_expr(tree, symtab, st, id, scope),
    }
}

fn build_symtab_expr(tree: &mut Tree, symtab: &mut SymbolTable, st: &mut Pass1State, id: NodeId, scope: ScopeId) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Expr(ExprKind::Const) => {}
        NodeKind::Expr(ExprKind::Op) => {
            build_symtab_expr(tree, symtab, st, node.children[0].unwrap(), scope);
            build_symtab_expr(tree, symtab, st, node.children[1].unwrap(), scope);
        }
        NodeKind::Expr(ExprKind::Var) => {
            let name = node.attr.name();
            match symtab.lookup_soft(name) {
                None => {
                    st.diags.push(Diagnostic::var_error(
                        "variable",
                        name,
                        "is not declared",
                        node.line,
                        scope,
                    ));
                }
                Some(entry) => {
                    symtab.insert(name, entry.node, entry.scope, node.line, None, None);
                    let is_array = matches!(
                        tree.get(entry.node).kind,
                        NodeKind::Expr(ExprKind::ArrDecl) | NodeKind::Expr(ExprKind::ParamArr)
                    );
                    let resolved_scope = entry.scope;
                    let resolved = tree.get_mut(id);
                    resolved.scope = Some(resolved_scope);
                    if is_array {
                        resolved.kind = NodeKind::Expr(ExprKind::Arr);
                    }
                }
            }
        }
        NodeKind::Expr(ExprKind::Arr) => {
            let name = node.attr.name();
            match symtab.lookup_soft(name) {
                None => {
                    st.diags.push(Diagnostic::var_error(
                        "variable",
                        name,
                        "is not declared",
                        node.line,
                        scope,
                    ));
                }
                Some(entry) => {
                    symtab.insert(name, entry.node, entry.scope, node.line, None, None);
                    tree.get_mut(id).scope = Some(entry.scope);
                }
            }
            if let Some(index) = node.children[0] {
                build_symtab_expr(tree, symtab, st, index, scope);
            }
        }
        NodeKind::Expr(ExprKind::FuncCall) => {
            let name = node.attr.name();
            match symtab.lookup_soft(name) {
                None => {
                    st.diags.push(Diagnostic::var_error(
                        "function",
                        name,
                        "is not declared",
                        node.line,
                        scope,
                    ));
                }
                Some(entry) => {
                    let decl_is_func = matches!(tree.get(entry.node).kind, NodeKind::Expr(ExprKind::FuncDecl));
                    if !decl_is_func {
                        st.diags.push(Diagnostic::var_error(
                            "function",
                            name,
                            "is not a function",
                            node.line,
                            scope,
                        ));
                    } else {
                        symtab.insert(name, entry.node, entry.scope, node.line, None, None);
                        let ret_ty = tree.get(entry.node).ty;
                        let resolved = tree.get_mut(id);
                        resolved.scope = Some(entry.scope);
                        resolved.ty = ret_ty;
                    }
                }
            }
            for arg in tree.siblings(node.children[0]) {
                build_symtab_expr(tree, symtab, st, arg, scope);
            }
        }
        NodeKind::Expr(
            ExprKind::VarDecl | ExprKind::ArrDecl | ExprKind::ParamVar | ExprKind::ParamArr | ExprKind::FuncDecl,
        ) => unreachable!("declarations are not visited as expressions"),
    }
}

// --- Pass 2: type checking ---------------------------------------------

fn type_check_top(tree: &Tree, symtab: &SymbolTable, diags: &mut Vec<Diagnostic>, id: NodeId) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Expr(ExprKind::VarDecl) | NodeKind::Expr(ExprKind::ArrDecl) => {
            check_array_length(tree, diags, id);
        }
        NodeKind::Expr(ExprKind::FuncDecl) => {
            let body = node.children[1].expect("function body");
            let body_node = tree.get(body).clone();
            for decl in tree.siblings(body_node.children[0]) {
                check_array_length(tree, diags, decl);
            }
            for stmt in tree.siblings(body_node.children[1]) {
                type_check_stmt(tree, symtab, diags, stmt, node.ty);
            }
            if node.ty != ExprType::Void && !stmt_list_returns(tree, body_node.children[1]) {
                diags.push(Diagnostic::type_error(
                    node.line,
                    format!("function '{}' does not return a value on all control paths", node.attr.name()),
                ));
            }
        }
        _ => unreachable!("top-level declaration list contains a non-declaration node"),
    }
}

fn check_array_length(tree: &Tree, diags: &mut Vec<Diagnostic>, decl: NodeId) {
    let node = tree.get(decl);
    if node.kind == NodeKind::Expr(ExprKind::ArrDecl) {
        let length = node.children[0].map(|len| tree.get(len).attr.int()).unwrap_or(0);
        if length <= 0 {
            diags.push(Diagnostic::type_error(
                node.line,
                format!("array '{}' must have a positive length", node.attr.name()),
            ));
        }
    }
}

fn stmt_list_returns(tree: &Tree, first: Option<NodeId>) -> bool {
    tree.siblings(first).iter().any(|&s| stmt_always_returns(tree, s))
}

fn stmt_always_returns(tree: &Tree, id: NodeId) -> bool {
    let node = tree.get(id);
    match node.kind {
        NodeKind::Stmt(StmtKind::Return) => true,
        NodeKind::Stmt(StmtKind::Compound) => stmt_list_returns(tree, node.children[1]),
        NodeKind::Stmt(StmtKind::If) => match node.children[2] {
            Some(else_id) => {
                stmt_always_returns(tree, node.children[1].unwrap()) && stmt_always_returns(tree, else_id)
            }
            None => false,
        },
        _ => false,
    }
}

fn type_check_stmt(tree: &Tree, symtab: &SymbolTable, diags: &mut Vec<Diagnostic>, id: NodeId, ret_ty: ExprType) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Stmt(StmtKind::Compound) => {
            for stmt in tree.siblings(node.children[1]) {
                type_check_stmt(tree, symtab, diags, stmt, ret_ty);
            }
        }
        NodeKind::Stmt(StmtKind::If) => {
            let cond = node.children[0].unwrap();
            type_check_expr(tree, symtab, diags, cond);
            if tree.get(cond).ty != ExprType::Boolean {
                diags.push(Diagnostic::type_error(node.line, "if condition must be boolean"));
            }
            type_check_stmt(tree, symtab, diags, node.children[1].unwrap(), ret_ty);
            if let Some(else_id) = node.children[2] {
                type_check_stmt(tree, symtab, diags, else_id, ret_ty);
            }
        }
        NodeKind::Stmt(StmtKind::While) => {
            let cond = node.children[0].unwrap();
            type_check_expr(tree, symtab, diags, cond);
            if tree.get(cond).ty != ExprType::Boolean {
                diags.push(Diagnostic::type_error(node.line, "while condition must be boolean"));
            }
            type_check_stmt(tree, symtab, diags, node.children[1].unwrap(), ret_ty);
        }
        NodeKind::Stmt(StmtKind::Return) => match node.children[0] {
            Some(value) => {
                type_check_expr(tree, symtab, diags, value);
                if ret_ty == ExprType::Void {
                    diags.push(Diagnostic::type_error(node.line, "void function must not return a value"));
                } else if tree.get(value).ty != ExprType::Integer {
                    diags.push(Diagnostic::type_error(node.line, "return value must be an integer"));
                }
            }
            None => {
                if ret_ty != ExprType::Void {
                    diags.push(Diagnostic::type_error(node.line, "non-void function must return a value"));
                }
            }
        },
        NodeKind::Stmt(StmtKind::Read) => {
            let target = node.children[0].unwrap();
            type_check_expr(tree, symtab, diags, target);
            if matches!(tree.get(target).kind, NodeKind::Expr(ExprKind::Arr)) && tree.get(target).children[0].is_none()
            {
                diags.push(Diagnostic::type_error(node.line, "cannot read into a whole array"));
            }
        }
        NodeKind::Stmt(StmtKind::Write) => {
            let value = node.children[0].unwrap();
            type_check_expr(tree, symtab, diags, value);
            if tree.get(value).ty != ExprType::Integer {
                diags.push(Diagnostic::type_error(node.line, "write expects an integer value"));
            }
        }
        NodeKind::Stmt(StmtKind::Assign) => {
            let lvalue = node.children[0].unwrap();
            let rvalue = node.children[1].unwrap();
            type_check_expr(tree, symtab, diags, lvalue);
            type_check_expr(tree, symtab, diags, rvalue);
            if matches!(tree.get(lvalue).kind, NodeKind::Expr(ExprKind::Arr)) && tree.get(lvalue).children[0].is_none()
            {
                diags.push(Diagnostic::type_error(node.line, "cannot assign to a whole array"));
            } else if tree.get(rvalue).ty != ExprType::Integer {
                diags.push(Diagnostic::type_error(node.line, "assigned value must be an integer"));
            }
        }
        NodeKind::Expr(_) => type_check_expr(tree, symtab, diags, id),
    }
}

fn type_check_expr(tree: &Tree, symtab: &SymbolTable, diags: &mut Vec<Diagnostic>, id: NodeId) {
    let node = tree.get(id).clone();
    match node.kind {
        NodeKind::Expr(ExprKind::Const) => {}
        NodeKind::Expr(ExprKind::Var) => {}
        NodeKind::Expr(ExprKind::Op) => {
            let lhs = node.children[0].unwrap();
            let rhs = node.children[1].unwrap();
            type_check_expr(tree, symtab, diags, lhs);
            type_check_expr(tree, symtab, diags, rhs);
            if tree.get(lhs).ty != ExprType::Integer || tree.get(rhs).ty != ExprType::Integer {
                diags.push(Diagnostic::type_error(node.line, "operands of an operator must be integers"));
            }
        }
        NodeKind::Expr(ExprKind::Arr) => {
            if let Some(index) = node.children[0] {
                type_check_expr(tree, symtab, diags, index);
                if tree.get(index).ty != ExprType::Integer {
                    diags.push(Diagnostic::type_error(node.line, "array index must be an integer"));
                }
            }
        }
        NodeKind::Expr(ExprKind::FuncCall) => {
            let args: Vec<NodeId> = tree.siblings(node.children[0]);
            for &arg in &args {
                type_check_expr(tree, symtab, diags, arg);
            }
            let Some(scope) = node.scope else { return };
            let Some(entry) = symtab.lookup(node.attr.name(), scope) else { return };
            if !matches!(tree.get(entry.node).kind, NodeKind::Expr(ExprKind::FuncDecl)) {
                return;
            }
            let decl = tree.get(entry.node).clone();
            let params = tree.siblings(decl.children[0]);
            if params.len() != args.len() {
                diags.push(Diagnostic::type_error(
                    node.line,
                    format!(
                        "'{}' expects {} argument(s), got {}",
                        node.attr.name(),
                        params.len(),
                        args.len()
                    ),
                ));
                return;
            }
            for (&param, &arg) in params.iter().zip(args.iter()) {
                let param_is_array = matches!(tree.get(param).kind, NodeKind::Expr(ExprKind::ParamArr));
                let arg_node = tree.get(arg);
                let arg_is_array =
                    matches!(arg_node.kind, NodeKind::Expr(ExprKind::Arr)) && arg_node.children[0].is_none();
                if param_is_array != arg_is_array {
                    diags.push(Diagnostic::type_error(
                        node.line,
                        format!("argument to '{}' does not match the parameter's array-ness", node.attr.name()),
                    ));
                } else if !param_is_array && arg_node.ty != ExprType::Integer {
                    diags.push(Diagnostic::type_error(
                        node.line,
                        format!("argument to '{}' must be an integer", node.attr.name()),
                    ));
                }
            }
        }
        NodeKind::Expr(
            ExprKind::VarDecl | ExprKind::ArrDecl | ExprKind::ParamVar | ExprKind::ParamArr | ExprKind::FuncDecl,
        ) => unreachable!("declarations are not visited as expressions"),
        NodeKind::Stmt(_) => unreachable!("statement reached through expression recursion"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse;

    fn analyze(src: &str) -> (Tree, AnalysisResult) {
        let mut tree = parse(src).expect("parses");
        let result = Analyzer::analyze(&mut tree);
        (tree, result)
    }

    /// Every node reachable from the top-level declaration list, through
    /// both `children` and `sibling` links — a test-only traversal, since
    /// production code always knows which kind of list it's walking.
    fn all_nodes(tree: &Tree) -> Vec<NodeId> {
        fn walk(tree: &Tree, id: NodeId, out: &mut Vec<NodeId>) {
            out.push(id);
            for child in tree.get(id).children {
                for sibling in tree.siblings(child) {
                    walk(tree, sibling, out);
                }
            }
        }
        let mut out = Vec::new();
        for decl in tree.siblings(tree.root) {
            walk(tree, decl, &mut out);
        }
        out
    }

    #[test]
    fn scope_ids_assigned_to_distinct_compound_blocks_are_distinct() {
        let (tree, result) = analyze(
            "int main(void) {
                 { int a; }
                 { int b; }
                 return 0;
             }",
        );
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        let scopes: Vec<ScopeId> = all_nodes(&tree)
            .into_iter()
            .filter(|&id| matches!(tree.get(id).kind, NodeKind::Stmt(StmtKind::Compound)))
            .map(|id| tree.get(id).scope.expect("every Compound gets a scope"))
            .collect();
        let unique: std::collections::BTreeSet<ScopeId> = scopes.iter().copied().collect();
        assert_eq!(scopes.len(), unique.len(), "scope ids repeat across distinct blocks: {scopes:?}");
    }

    #[test]
    fn global_addresses_advance_in_source_order_by_four_times_length() {
        let (_tree, result) = analyze(
            "int x;
             int arr[5];
             int y;
             int main(void) { return 0; }",
        );
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        let x = result.symtab.lookup(internment::Intern::new("x".to_string()), 0).unwrap();
        let arr = result.symtab.lookup(internment::Intern::new("arr".to_string()), 0).unwrap();
        let y = result.symtab.lookup(internment::Intern::new("y".to_string()), 0).unwrap();
        let x_addr = x.address.unwrap();
        let arr_addr = arr.address.unwrap();
        let y_addr = y.address.unwrap();
        assert_eq!(arr_addr, x_addr + 4);
        assert_eq!(y_addr, arr_addr + 4 * 5);
    }

    #[test]
    fn local_offsets_descend_and_param_offsets_ascend() {
        let (_, result) = analyze(
            "int f(int p, int q) {
                 int a;
                 int b;
                 return a + b + p + q;
             }
             int main(void) { return f(1, 2); }",
        );
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        let scope = 1; // f's parameters and body share this scope
        let p = result.symtab.lookup(internment::Intern::new("p".to_string()), scope).unwrap();
        let q = result.symtab.lookup(internment::Intern::new("q".to_string()), scope).unwrap();
        let a = result.symtab.lookup(internment::Intern::new("a".to_string()), scope).unwrap();
        let b = result.symtab.lookup(internment::Intern::new("b".to_string()), scope).unwrap();
        assert_eq!(p.offset, Some(8));
        assert_eq!(q.offset, Some(12));
        assert_eq!(a.offset, Some(-4));
        assert_eq!(b.offset, Some(-8));
    }

    #[test]
    fn local_array_offset_is_the_bottom_of_its_region_not_the_top() {
        // A 3-element local array must occupy fp-12..fp-4, never reaching
        // up to fp+0/fp+4 (the saved caller-fp/ra the prologue writes
        // there) or down past its own 12 bytes.
        let (_, result) = analyze(
            "int main(void) {
                 int a[3];
                 int b;
                 a[0] = 1;
                 b = 2;
                 return 0;
             }",
        );
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        let scope = 1;
        let a = result.symtab.lookup(internment::Intern::new("a".to_string()), scope).unwrap();
        let b = result.symtab.lookup(internment::Intern::new("b".to_string()), scope).unwrap();
        assert_eq!(a.offset, Some(-12), "a 3-element array's base must leave room below fp, not above it");
        assert_eq!(b.offset, Some(-16));
    }

    #[test]
    fn bare_var_use_of_an_array_name_is_reclassified_to_arr() {
        // `f(a)` parses `a` as a bare `Var` (no `[`/`(` follows it); since
        // `a` actually declares an array, pass 1 must reclassify that use
        // node to `Arr` in place so codegen passes it by address.
        let (tree, result) = analyze(
            "int f(int v[]) { return v[0]; }
             int main(void) { int a[3]; write(f(a)); return 0; }",
        );
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        let a = internment::Intern::new("a".to_string());
        let uses: Vec<_> = all_nodes(&tree)
            .into_iter()
            .filter(|&id| tree.get(id).attr == crate::front::ast::Attr::Name(a))
            .filter(|&id| !tree.get(id).is_decl())
            .collect();
        assert_eq!(uses.len(), 1);
        assert!(matches!(tree.get(uses[0]).kind, NodeKind::Expr(ExprKind::Arr)));
        assert!(tree.get(uses[0]).children[0].is_none(), "a bare array use carries no index child");
    }

    #[test]
    fn array_shape_mismatch_on_a_call_argument_is_a_type_error() {
        let (_, result) = analyze(
            "int sum(int v[], int n) { return n; }
             int main(void) { int x; write(sum(x, 1)); return 0; }",
        );
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.to_string().contains("array-ness")));
    }

    #[test]
    fn if_without_else_and_no_trailing_return_is_not_all_paths() {
        let (_, result) = analyze(
            "int f(void) { if (1 < 2) return 1; } \
             int main(void) { return f(); }",
        );
        assert!(result.has_errors());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.to_string().contains("control paths")));
    }

    #[test]
    fn if_with_both_branches_returning_satisfies_all_paths() {
        let (_, result) = analyze(
            "int f(void) { if (1 < 2) return 1; else return 0; } \
             int main(void) { return f(); }",
        );
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn undeclared_name_is_never_defined() {
        let (_, result) = analyze("int main(void) { write(q); return 0; }");
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.to_string().contains("not declared")));
    }

    #[test]
    fn missing_main_is_reported() {
        let (_, result) = analyze("int notmain(void) { return 0; }");
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.to_string().contains("main")));
    }

    #[test]
    fn local_variable_named_after_a_function_is_a_clash_not_a_silent_shadow() {
        let (_, result) = analyze(
            "int f(void) { return 0; }
             int main(void) { int f; f = 1; return f; }",
        );
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.to_string().contains("name of a function")));
    }

    #[test]
    fn parameter_named_after_a_function_is_a_clash_not_a_silent_shadow() {
        let (_, result) = analyze(
            "int f(void) { return 0; }
             int main(void) { return 0; }
             int g(int f) { return f; }",
        );
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.to_string().contains("name of a function")));
    }
}
