pub mod chart;
pub mod turning_point;

pub use chart::{render_chart, save_chart, ChartOptions};
pub use turning_point::overparameterized_onset;
