pub mod indent_parser;
pub mod outline;

pub use indent_parser::parse_indented;
pub use outline::{OutlineBody, OutlineNode, parse_outline, strip_fences, to_text};
