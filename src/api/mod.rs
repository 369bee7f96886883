pub mod subgraph;

pub use subgraph::{promotion_id_hex, SubgraphClient};
