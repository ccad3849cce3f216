pub mod admin;
pub mod labels;
pub mod proxy;

pub use labels::{render_labels, LabelFormat, RoutingLabelSet};
