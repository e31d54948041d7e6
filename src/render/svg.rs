use crate::network::dag::Bbn;
use std::collections::BTreeMap;

/// Look of the static topology diagram
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub font_size: u32,
    pub node_radius: f64,
    pub node_color: String,
    pub outline_color: String,
    pub edge_color: String,
    pub line_width: f64,
    pub edge_width: f64,
    /// Fraction of the drawing size added on every side
    pub margin: f64,
    /// Pixels per layout unit
    pub scale: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            font_size: 12,
            node_radius: 50.0,
            node_color: "yellow".to_string(),
            outline_color: "black".to_string(),
            edge_color: "blue".to_string(),
            line_width: 5.0,
            edge_width: 5.0,
            margin: 0.10,
            scale: 100.0,
        }
    }
}

/// Layered positions in layout units, keyed by node id.
///
/// A node's layer is the length of the longest path reaching it from a root;
/// nodes in a layer are ordered by id and centered on x = 0. Layer 0 is at the top.
pub fn layout(bbn: &Bbn) -> BTreeMap<usize, (f64, f64)> {
    let mut depth: BTreeMap<usize, usize> = BTreeMap::new();
    let order = bbn.topological_order().unwrap_or_else(|_| bbn.node_ids());
    for id in order {
        let d = bbn
            .parents(id)
            .unwrap_or_default()
            .iter()
            .filter_map(|p| depth.get(p))
            .map(|d| d + 1)
            .max()
            .unwrap_or(0);
        depth.insert(id, d);
    }

    let mut layers: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (&id, &d) in &depth {
        layers.entry(d).or_default().push(id);
    }

    let mut positions = BTreeMap::new();
    for (d, ids) in layers {
        let offset = (ids.len() as f64 - 1.0) / 2.0;
        for (i, id) in ids.into_iter().enumerate() {
            positions.insert(id, (2.0 * (i as f64 - offset), -1.5 * d as f64));
        }
    }
    positions
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the topology as a standalone SVG document
pub fn to_svg(bbn: &Bbn, options: &RenderOptions) -> String {
    let positions = layout(bbn);
    let r = options.node_radius;

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for &(x, y) in positions.values() {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let content_w = (max_x - min_x) * options.scale + 2.0 * r;
    let content_h = (max_y - min_y) * options.scale + 2.0 * r;
    let pad_x = content_w * options.margin;
    let pad_y = content_h * options.margin;
    let width = content_w + 2.0 * pad_x;
    let height = content_h + 2.0 * pad_y;

    // layout y grows upwards, SVG y grows downwards
    let to_px = |(x, y): (f64, f64)| {
        (
            pad_x + r + (x - min_x) * options.scale,
            pad_y + r + (max_y - y) * options.scale,
        )
    };

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.1} {h:.1}">
  <defs>
    <marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="4" markerHeight="4" orient="auto-start-reverse">
      <path d="M 0 0 L 10 5 L 0 10 z" fill="{edge}"/>
    </marker>
  </defs>
"#,
        w = width,
        h = height,
        edge = options.edge_color,
    );

    for (parent, child) in bbn.edges() {
        let (Some(&from), Some(&to)) = (positions.get(&parent), positions.get(&child)) else {
            continue;
        };
        let (x1, y1) = to_px(from);
        let (x2, y2) = to_px(to);
        let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        if len <= 2.0 * r {
            continue;
        }
        let (ux, uy) = ((x2 - x1) / len, (y2 - y1) / len);
        let stop = r + options.line_width / 2.0;
        svg.push_str(&format!(
            "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#arrow)\"/>\n",
            x1 + ux * r,
            y1 + uy * r,
            x2 - ux * stop,
            y2 - uy * stop,
            options.edge_color,
            options.edge_width,
        ));
    }

    for node in bbn.nodes() {
        let Some(&pos) = positions.get(&node.id()) else {
            continue;
        };
        let (cx, cy) = to_px(pos);
        svg.push_str(&format!(
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
            cx, cy, r, options.node_color, options.outline_color, options.line_width,
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{}\" font-family=\"sans-serif\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>\n",
            cx,
            cy,
            options.font_size,
            escape(node.name()),
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
