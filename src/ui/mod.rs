pub mod heatmap;
pub mod panels;
pub mod results;
pub mod scatter;
