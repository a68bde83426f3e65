//! Liveness analysis and Chaitin–Briggs simplify/select graph-coloring
//! register allocation (spec.md §4.5), grounded in
//! `original_source/src/backend/reg_allocation.c`.

use derive_more::Display;

use crate::common::Map;

use super::bitset::BitSet;
use super::ir::{Ir, IrId, Op, Reg};

/// The default palette size; spec.md §4.6 reserves a 7-register temp-name
/// table (`t0`..`t6`) even though only this many are actually handed out.
pub const DEFAULT_K: usize = 4;

/// Backward iterative dataflow to fixpoint, exactly per spec.md §4.5:
/// `out[v] = ⋃ in[w]` over successors, `in[v] = use(v) ∪ (out[v] - def(v))`.
/// Populates every non-comment node's `live_in`/`live_out`.
pub fn liveness(ir: &mut Ir) {
    let n = ir.vreg_count() as usize;
    let ids: Vec<IrId> = ir.ids().collect();

    for &id in &ids {
        if ir.get(id).op != Op::Comment {
            ir.get_mut(id).live_in = Some(BitSet::new(n));
            ir.get_mut(id).live_out = Some(BitSet::new(n));
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &id in ids.iter().rev() {
            if ir.get(id).op == Op::Comment {
                continue;
            }

            let mut new_out = BitSet::new(n);
            for succ in successors(ir, id) {
                if let Some(live_in) = &ir.get(succ).live_in {
                    new_out.union(live_in);
                }
            }

            let mut new_in = new_out.clone();
            let node = ir.get(id);
            if let Some(Reg::Virtual(d)) = node.dest {
                new_in.clear(d as usize);
            }
            if let Some(Reg::Virtual(s)) = node.src1 {
                new_in.set(s as usize);
            }
            if let Some(Reg::Virtual(s)) = node.src2 {
                new_in.set(s as usize);
            }

            let node = ir.get(id);
            if node.live_out.as_ref() != Some(&new_out) || node.live_in.as_ref() != Some(&new_in) {
                changed = true;
                let node = ir.get_mut(id);
                node.live_out = Some(new_out);
                node.live_in = Some(new_in);
            }
        }
    }
}

/// Successor instructions for the backward dataflow, per spec.md §4.5:
/// an unconditional `JUMP`'s only successor is its target; a conditional
/// branch's successors are the fall-through and the target; `JUMP_REG`
/// (the epilogue's return) has none — it's a call-return boundary; every
/// other instruction falls through to the next non-comment node.
fn successors(ir: &Ir, id: IrId) -> Vec<IrId> {
    let node = ir.get(id);
    match node.op {
        Op::Jump => node.target.into_iter().collect(),
        Op::JumpReg => Vec::new(),
        op if op.is_branch() => {
            let mut succs: Vec<IrId> = ir.fallthrough(id).into_iter().collect();
            succs.extend(node.target);
            succs
        }
        _ => ir.fallthrough(id).into_iter().collect(),
    }
}

/// Undirected adjacency list keyed by virtual register id, grounded in
/// `build_graph` in the C source.
#[derive(Debug, Default)]
pub struct InterferenceGraph {
    adjacency: Map<u32, std::collections::BTreeSet<u32>>,
}

impl InterferenceGraph {
    pub fn build(ir: &Ir) -> Self {
        let mut graph = InterferenceGraph::default();
        for v in 1..ir.vreg_count() {
            graph.adjacency.entry(v).or_default();
        }
        for id in ir.ids() {
            let node = ir.get(id);
            let Some(Reg::Virtual(d)) = node.dest else { continue };
            let Some(live_out) = &node.live_out else { continue };
            for w in live_out.iter() {
                let w = w as u32;
                if w != d && w > 0 {
                    graph.add_edge(d, w);
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, u: u32, v: u32) {
        self.adjacency.entry(u).or_default().insert(v);
        self.adjacency.entry(v).or_default().insert(u);
    }

    pub fn degree(&self, v: u32) -> usize {
        self.adjacency.get(&v).map_or(0, |n| n.len())
    }

    pub fn neighbors(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency.get(&v).into_iter().flatten().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.adjacency.keys().copied()
    }
}

pub type ColorMap = Map<u32, usize>;

#[derive(Debug, Clone, Display)]
#[display("{k} registers are not enough, must spill")]
pub struct SpillError {
    pub k: usize,
}

/// Chaitin–Briggs simplify/select coloring with `k` physical colors,
/// grounded in `color_graph` in the C source.
///
/// Simplify repeatedly removes a node of degree `< k` (pushing it onto a
/// stack); once no such node remains, it removes the highest-degree node
/// instead (a spill candidate — still pushed, not actually spilled: spill
/// code generation is an explicit non-goal, so running out of colors in the
/// select phase below is fatal). Select then walks the stack in reverse pop
/// order, giving each node the lowest color none of its already-colored
/// neighbors hold.
pub fn color(graph: &InterferenceGraph, k: usize) -> Result<ColorMap, SpillError> {
    let mut degree: Map<u32, usize> = graph.nodes().map(|v| (v, graph.degree(v))).collect();
    let mut stack = Vec::with_capacity(degree.len());

    while !degree.is_empty() {
        let pick = degree
            .iter()
            .filter(|&(_, &d)| d < k)
            .min_by_key(|&(_, &d)| d)
            .or_else(|| degree.iter().max_by_key(|&(_, &d)| d))
            .map(|(&v, _)| v)
            .expect("degree map is non-empty");

        for neighbor in graph.neighbors(pick) {
            if let Some(d) = degree.get_mut(&neighbor) {
                *d = d.saturating_sub(1);
            }
        }
        degree.remove(&pick);
        stack.push(pick);
    }

    let mut colors: ColorMap = Map::new();
    while let Some(v) = stack.pop() {
        let used: std::collections::BTreeSet<usize> =
            graph.neighbors(v).filter_map(|n| colors.get(&n).copied()).collect();
        match (0..k).find(|c| !used.contains(c)) {
            Some(c) => {
                colors.insert(v, c);
            }
            None => return Err(SpillError { k }),
        }
    }
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_ir() -> Ir {
        // r1 = 1; r2 = 2; r3 = r1 + r2; r4 = r3 + r1
        let mut ir = Ir::new();
        let r1 = ir.new_vreg();
        let r2 = ir.new_vreg();
        let r3 = ir.new_vreg();
        let r4 = ir.new_vreg();
        ir.insert_li(r1, 1);
        ir.insert_li(r2, 2);
        ir.insert_add(r3, r1, r2);
        ir.insert_add(r4, r3, r1);
        ir
    }

    #[test]
    fn liveness_fixpoint_is_idempotent() {
        let mut ir = chain_ir();
        liveness(&mut ir);
        let first: Vec<_> = ir.ids().map(|id| ir.get(id).live_in.clone()).collect();
        liveness(&mut ir);
        let second: Vec<_> = ir.ids().map(|id| ir.get(id).live_in.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn r1_interferes_with_r3_but_not_r2_alone() {
        let mut ir = chain_ir();
        liveness(&mut ir);
        let graph = InterferenceGraph::build(&ir);
        // r1 is live across the definition of r3 (it's used again by r4's add).
        assert!(graph.neighbors(1).any(|n| n == 3));
    }

    #[test]
    fn coloring_never_assigns_the_same_color_to_interfering_vregs() {
        let mut ir = chain_ir();
        liveness(&mut ir);
        let graph = InterferenceGraph::build(&ir);
        let colors = color(&graph, DEFAULT_K).expect("fits in K colors");
        for u in graph.nodes() {
            for v in graph.neighbors(u) {
                assert_ne!(colors[&u], colors[&v]);
            }
        }
    }

    #[test]
    fn insufficient_colors_report_spill() {
        // A 5-clique needs 5 mutually distinct colors; K=2 must fail.
        let mut graph = InterferenceGraph::default();
        for u in 1..=5 {
            for v in 1..=5 {
                if u != v {
                    graph.add_edge(u, v);
                }
            }
        }
        assert!(color(&graph, 2).is_err());
        assert!(color(&graph, 5).is_ok());
    }
}
