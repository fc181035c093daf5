//! Edge clique cover / separating edge clique cover (Module E). Two-phase
//! randomized greedy heuristic (Conte et al.), grounded on
//! `pygplib/ecc.py`'s `compute_ecc`/`compute_separating_ecc`. The `"rr"`
//! variant (random edge choice, random clique growth) is the only variant
//! implemented, threaded through a caller-supplied seeded `StdRng` rather
//! than a hidden global, so cover construction is reproducible for tests.

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// A simple undirected graph: a vertex set and an edge list (unordered
/// pairs, no loops, no duplicates).
#[derive(Debug, Clone)]
pub struct Graph {
    pub vertices: Vec<usize>,
    pub edges: Vec<(usize, usize)>,
}

struct AdjMap(HashMap<usize, HashSet<usize>>);

impl AdjMap {
    fn build(graph: &Graph) -> Self {
        let mut m: HashMap<usize, HashSet<usize>> = HashMap::new();
        for &v in &graph.vertices {
            m.entry(v).or_default();
        }
        for &(u, v) in &graph.edges {
            m.entry(u).or_default().insert(v);
            m.entry(v).or_default().insert(u);
        }
        AdjMap(m)
    }

    fn neighbors(&self, v: usize) -> &HashSet<usize> {
        static EMPTY: std::sync::OnceLock<HashSet<usize>> = std::sync::OnceLock::new();
        self.0.get(&v).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    fn degree(&self, v: usize) -> usize {
        self.neighbors(v).len()
    }
}

fn validate_no_isolated(graph: &Graph, adj: &AdjMap) -> Result<()> {
    for &v in &graph.vertices {
        if adj.degree(v) == 0 {
            return Err(Error::Structure(format!(
                "edge clique cover requires no isolated vertex; vertex {v} has degree 0"
            )));
        }
    }
    for &(u, v) in &graph.edges {
        if adj.degree(u) == 1 && adj.degree(v) == 1 {
            return Err(Error::Structure(format!(
                "edge clique cover requires no isolated edge; ({u},{v}) is isolated"
            )));
        }
    }
    Ok(())
}

fn common_neighbors(adj: &AdjMap, clique: &[usize]) -> HashSet<usize> {
    let mut it = clique.iter();
    let mut candidates = adj.neighbors(*it.next().expect("clique is non-empty")).clone();
    for &v in it {
        candidates = candidates.intersection(adj.neighbors(v)).cloned().collect();
    }
    for &v in clique {
        candidates.remove(&v);
    }
    candidates
}

fn grow_clique(adj: &AdjMap, mut clique: Vec<usize>, excluded: Option<usize>, rng: &mut StdRng) -> Vec<usize> {
    loop {
        let mut candidates = common_neighbors(adj, &clique);
        if let Some(e) = excluded {
            candidates.remove(&e);
        }
        if candidates.is_empty() {
            return clique;
        }
        let idx = rng.gen_range(0..candidates.len());
        let pick = *candidates.iter().nth(idx).expect("idx in range");
        clique.push(pick);
    }
}

/// Step 1: covering. Repeatedly picks an uncovered edge (uniform random
/// tie-break), grows a clique containing it, and marks its edges covered,
/// until every edge is covered.
pub fn compute_ecc(graph: &Graph, rng: &mut StdRng) -> Result<Vec<Vec<usize>>> {
    let adj = AdjMap::build(graph);
    validate_no_isolated(graph, &adj)?;

    let mut uncovered = graph.edges.clone();
    let mut cover = Vec::new();

    while !uncovered.is_empty() {
        let idx = rng.gen_range(0..uncovered.len());
        let (u, v) = uncovered[idx];
        let clique = grow_clique(&adj, vec![u, v], None, rng);
        let in_clique: HashSet<usize> = clique.iter().cloned().collect();
        uncovered.retain(|&(a, b)| !(in_clique.contains(&a) && in_clique.contains(&b)));
        cover.push(clique);
    }

    Ok(cover)
}

fn split_partition(partition: Vec<Vec<usize>>, clique: &[usize]) -> Vec<Vec<usize>> {
    let set: HashSet<usize> = clique.iter().cloned().collect();
    let mut out = Vec::new();
    for block in partition {
        let (inside, outside): (Vec<usize>, Vec<usize>) = block.into_iter().partition(|v| set.contains(v));
        if inside.len() >= 2 {
            out.push(inside);
        }
        if outside.len() >= 2 {
            out.push(outside);
        }
    }
    out
}

/// Step 2 on top of step 1: separates every remaining unseparated pair of
/// vertices by growing additional cliques that exclude one member of the
/// pair, re-splitting the partition after each.
pub fn compute_separating_ecc(graph: &Graph, rng: &mut StdRng) -> Result<Vec<Vec<usize>>> {
    let adj = AdjMap::build(graph);
    validate_no_isolated(graph, &adj)?;

    let mut cover = compute_ecc(graph, rng)?;
    let mut partition: Vec<Vec<usize>> = vec![graph.vertices.clone()];
    for clique in &cover {
        partition = split_partition(partition, clique);
    }

    loop {
        let Some(block) = partition.iter().find(|b| b.len() >= 2).cloned() else {
            break;
        };
        let i = rng.gen_range(0..block.len());
        let mut j = rng.gen_range(0..block.len() - 1);
        if j >= i {
            j += 1;
        }
        let (mut u, mut v) = (block[i], block[j]);
        if adj.degree(u) == 1 {
            std::mem::swap(&mut u, &mut v);
        }
        let clique = grow_clique(&adj, vec![u], Some(v), rng);
        partition = split_partition(partition, &clique);
        cover.push(clique);
    }

    log::debug!("separating ECC: {} cliques over {} vertices", cover.len(), graph.vertices.len());
    Ok(cover)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn k4() -> Graph {
        Graph {
            vertices: vec![1, 2, 3, 4],
            edges: vec![(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)],
        }
    }

    fn g7() -> Graph {
        Graph {
            vertices: (1..=7).collect(),
            edges: vec![(1, 2), (1, 3), (2, 4), (2, 5), (3, 6), (4, 7), (5, 7)],
        }
    }

    #[test]
    /// Every edge is contained in at least one clique of the cover.
    fn every_edge_is_covered() {
        let g = g7();
        let mut rng = StdRng::seed_from_u64(7);
        let cover = compute_ecc(&g, &mut rng).unwrap();
        for &(u, v) in &g.edges {
            assert!(cover.iter().any(|q| q.contains(&u) && q.contains(&v)));
        }
    }

    #[test]
    /// Every pair of distinct vertices is separated by some clique in the
    /// separating cover.
    fn every_pair_is_separated() {
        let g = g7();
        let mut rng = StdRng::seed_from_u64(42);
        let cover = compute_separating_ecc(&g, &mut rng).unwrap();
        for &u in &g.vertices {
            for &v in &g.vertices {
                if u >= v {
                    continue;
                }
                assert!(
                    cover.iter().any(|q| q.contains(&u) != q.contains(&v)),
                    "vertices {u} and {v} are not separated by any clique"
                );
            }
        }
    }

    #[test]
    /// A complete graph covers with a single clique (the whole vertex set).
    fn complete_graph_covers_with_one_clique() {
        let g = k4();
        let mut rng = StdRng::seed_from_u64(1);
        let cover = compute_ecc(&g, &mut rng).unwrap();
        assert_eq!(cover.len(), 1);
        assert_eq!(cover[0].len(), 4);
    }

    #[test]
    /// A graph with an isolated vertex is rejected.
    fn rejects_isolated_vertex() {
        let g = Graph {
            vertices: vec![1, 2, 3],
            edges: vec![(1, 2)],
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(compute_ecc(&g, &mut rng).is_err());
    }
}
