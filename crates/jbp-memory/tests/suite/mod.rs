mod heuristic;
mod resolver_props;
