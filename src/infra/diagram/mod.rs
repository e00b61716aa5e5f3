pub mod models;
pub mod parsing;
pub mod style;

// Re-export core types for convenience
pub use models::*;
pub use parsing::{parse_drawio, read_diagram_file};
pub use style::parse_style;
