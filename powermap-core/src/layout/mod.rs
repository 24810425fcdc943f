// Static layout rules.
//
// Everything here is a pure function of the node list and the configuration:
// - stacking: group nodes that share a grid cell
// - expansion: radial positions of an expanded stack
// - panel: where the edit panel goes next to the selected node
// - spatial_grid: rectangle lookup for overlap checks and hit testing
//
// Animation and interaction state live in `engine`.

pub mod expansion;
pub mod panel;
pub mod spatial_grid;
pub mod stacking;

pub use expansion::{expanded_positions, expansion_radius};
pub use panel::{place_panel, PanelPlacement, PanelPositioner, PlacementStrategy, Side};
pub use stacking::{group_nodes, StackKey, Stacking};
