pub mod svg;

use crate::network::dag::Bbn;
use log::info;
use std::path::Path;

pub use svg::{layout, to_svg, RenderOptions};

/// Graphviz description of the network topology
pub fn to_dot(bbn: &Bbn) -> String {
    let mut out = String::from("digraph bbn {\n");
    for node in bbn.nodes() {
        out.push_str(&format!("    n{} [label=\"{}\"];\n", node.id(), escape(node.name())));
    }
    for (parent, child) in bbn.edges() {
        out.push_str(&format!("    n{} -> n{};\n", parent, child));
    }
    out.push_str("}\n");
    out
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Write the topology to `path`: DOT for a `.dot` extension, SVG otherwise
pub fn write_diagram<P: AsRef<Path>>(
    bbn: &Bbn,
    path: P,
    options: &RenderOptions,
) -> std::io::Result<()> {
    let path = path.as_ref();
    let is_dot = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dot"));
    let contents = if is_dot { to_dot(bbn) } else { to_svg(bbn, options) };
    std::fs::write(path, contents)?;
    info!("Network diagram saved to {}", path.display());
    Ok(())
}
