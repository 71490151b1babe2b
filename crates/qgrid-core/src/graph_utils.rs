use crate::{BusId, LineId, NetworkModel};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::VecDeque;

/// Summary statistics for `qgrid inspect` (degree distribution, components).
#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub bus_count: usize,
    pub line_count: usize,
    pub virtual_line_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// One connected component of the bus graph.
#[derive(Debug, Clone, Serialize)]
pub struct IslandSummary {
    pub island_id: usize,
    pub buses: Vec<BusId>,
    pub has_load: bool,
    pub has_generation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
    /// Island id of every bus, indexed by bus handle
    pub assignments: Vec<usize>,
}

impl IslandAnalysis {
    pub fn island_of(&self, bus: BusId) -> Option<usize> {
        self.assignments.get(bus.value()).copied()
    }

    pub fn is_connected(&self) -> bool {
        self.islands.len() <= 1
    }
}

/// Undirected bus graph; node weights are bus handles, edge weights line handles.
/// Node `i` is bus `i`.
pub fn bus_graph(network: &NetworkModel) -> UnGraph<BusId, LineId> {
    let mut graph = UnGraph::with_capacity(network.buses().len(), network.lines().len());
    for bus in network.buses() {
        graph.add_node(bus.id);
    }
    for line in network.lines() {
        if let Some((from, to)) = network.line_endpoints(line) {
            graph.add_edge(NodeIndex::new(from.value()), NodeIndex::new(to.value()), line.id);
        }
    }
    graph
}

pub fn graph_stats(network: &NetworkModel) -> GraphStats {
    let graph = bus_graph(network);
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors(node).count())
        .collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    GraphStats {
        bus_count: node_count,
        line_count: edge_count,
        virtual_line_count: network.lines().iter().filter(|l| l.is_virtual).count(),
        connected_components: connected_components(&graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}

/// Labels connected components by breadth-first search, in bus order, and
/// records whether each island carries load and generation.
pub fn find_islands(network: &NetworkModel) -> IslandAnalysis {
    let graph = bus_graph(network);
    let n = graph.node_count();
    let mut assignments = vec![usize::MAX; n];
    let mut islands = Vec::new();
    for start in graph.node_indices() {
        if assignments[start.index()] != usize::MAX {
            continue;
        }
        let island_id = islands.len();
        let mut queue = VecDeque::new();
        let mut members = Vec::new();
        assignments[start.index()] = island_id;
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            members.push(graph[node]);
            for neighbor in graph.neighbors(node) {
                if assignments[neighbor.index()] == usize::MAX {
                    assignments[neighbor.index()] = island_id;
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort();
        let has_load = members.iter().any(|b| network.bus_has_load(*b));
        let has_generation = members.iter().any(|b| network.bus_has_generation(*b));
        islands.push(IslandSummary {
            island_id,
            buses: members,
            has_load,
            has_generation,
        });
    }
    IslandAnalysis {
        islands,
        assignments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bus, BusRole, Carrier, Generator, Line, Load, SnapshotSet};
    use chrono::NaiveDate;

    fn network() -> NetworkModel {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut net = NetworkModel::new("islands", SnapshotSet::from_timestamps(vec![t0]).unwrap());
        let a = net.add_bus(Bus::new("A", BusRole::Prod));
        net.add_bus(Bus::new("B", BusRole::Conso));
        let c = net.add_bus(Bus::new("C", BusRole::Conso));
        net.add_line(Line::new("A-B", "A", "B")).unwrap();
        net.add_generator(Generator::new("g", a, Carrier::Thermal, 10.0))
            .unwrap();
        net.add_load(Load::new("load_C", c)).unwrap();
        net
    }

    #[test]
    fn finds_two_islands() {
        let net = network();
        let analysis = find_islands(&net);
        assert_eq!(analysis.islands.len(), 2);
        assert_eq!(analysis.island_of(BusId::new(1)), Some(0));
        assert_eq!(analysis.island_of(BusId::new(2)), Some(1));
        assert!(analysis.islands[0].has_generation);
        assert!(analysis.islands[1].has_load);
        assert!(!analysis.islands[1].has_generation);
    }

    #[test]
    fn stats_count_components() {
        let stats = graph_stats(&network());
        assert_eq!(stats.bus_count, 3);
        assert_eq!(stats.line_count, 1);
        assert_eq!(stats.connected_components, 2);
        assert_eq!(stats.max_degree, 1);
        assert_eq!(stats.min_degree, 0);
    }
}
