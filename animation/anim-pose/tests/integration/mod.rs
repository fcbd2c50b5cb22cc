mod hierarchy;
mod state_graph;
