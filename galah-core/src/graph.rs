//! A small directed graph with labelled edges, used to find structs that
//! contain themselves.

#[derive(Debug, Clone)]
struct Edge<E> {
    to: usize,
    label: E,
}

/// Directed multigraph over nodes `0..node_count`.
#[derive(Debug, Clone)]
pub struct Graph<E> {
    edges: Vec<Edge<E>>,
    outgoing: Vec<Vec<usize>>,
}

/// A walk through the graph. `nodes` always has one more element than
/// `edges`; edge `i` leads from `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
}

impl Path {
    fn starting_at(node: usize) -> Self {
        Path {
            nodes: vec![node],
            edges: Vec::new(),
        }
    }

    fn extend(&mut self, edge: usize, node: usize) {
        self.edges.push(edge);
        self.nodes.push(node);
    }

    fn retract(&mut self) {
        self.edges.pop();
        self.nodes.pop();
    }

    fn extended(&self, edge: usize, node: usize) -> Self {
        let mut path = self.clone();
        path.extend(edge, node);
        path
    }

    pub fn first_node(&self) -> usize {
        self.nodes[0]
    }

    fn last_node(&self) -> usize {
        self.nodes[self.nodes.len() - 1]
    }

    /// The same cycle, starting from its `offset`th node. Only meaningful
    /// when the path is a cycle, i.e. it ends where it starts.
    pub fn rotated(&self, offset: usize) -> Path {
        let last = self.nodes.len() - 1;
        let mut nodes = Vec::with_capacity(self.nodes.len());
        nodes.extend_from_slice(&self.nodes[offset..last]);
        nodes.extend_from_slice(&self.nodes[..offset]);
        nodes.push(self.nodes[offset]);

        let mut edges = Vec::with_capacity(self.edges.len());
        edges.extend_from_slice(&self.edges[offset..]);
        edges.extend_from_slice(&self.edges[..offset]);

        Path { nodes, edges }
    }
}

impl<E> Graph<E> {
    pub fn new(node_count: usize) -> Self {
        Graph {
            edges: Vec::new(),
            outgoing: (0..node_count).map(|_| Vec::new()).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    /// Adds an edge and returns its index.
    pub fn add_edge(&mut self, from: usize, to: usize, label: E) -> usize {
        let index = self.edges.len();
        self.edges.push(Edge { to, label });
        self.outgoing[from].push(index);
        index
    }

    pub fn label(&self, edge: usize) -> &E {
        &self.edges[edge].label
    }

    /// Every elementary cycle, each reported once and starting from its
    /// smallest node.
    pub fn cycles(&self) -> Vec<Path> {
        let mut cycles = Vec::new();
        for seed in 0..self.node_count() {
            self.search_cycles(&mut Path::starting_at(seed), &mut cycles);
        }
        cycles
    }

    /// Depth-first extension of `path` through nodes greater than its first
    /// node. An edge back to the first node closes a cycle.
    fn search_cycles(&self, path: &mut Path, cycles: &mut Vec<Path>) {
        let seed = path.first_node();
        let node = path.last_node();
        for &edge in &self.outgoing[node] {
            let next = self.edges[edge].to;
            if next == seed {
                cycles.push(path.extended(edge, next));
            } else if next > seed && !path.nodes.contains(&next) {
                path.extend(edge, next);
                self.search_cycles(path, cycles);
                path.retract();
            }
        }
    }
}
