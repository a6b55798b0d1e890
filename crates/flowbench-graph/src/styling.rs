//! Edge color palette keyed by source node kind.
//!
//! Source kinds never change after creation, but the palette is data rather
//! than something baked into the edge at connect time, so
//! [`WorkflowGraph::sync_edges`](crate::store::WorkflowGraph::sync_edges)
//! recolors every edge from this table whenever the node list changes.

use flowbench_types::{EdgeStyle, NodeKind};

/// Slate, used for unknown or missing sources.
pub const DEFAULT_STROKE: &str = "#64748b";

pub const STROKE_WIDTH: u32 = 2;

/// Fixed kind -> stroke lookup. Imputation and encoding have no palette
/// entry and fall through to the default, matching the original canvas.
pub fn stroke_for(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Dataset => "#3b82f6",       // blue-500
        NodeKind::Preprocessing => "#eab308", // yellow-500
        NodeKind::Split => "#a855f7",         // purple-500
        NodeKind::Model => "#06b6d4",         // cyan-500
        NodeKind::Result => "#10b981",        // emerald-500
        NodeKind::Imputation | NodeKind::Encoding => DEFAULT_STROKE,
    }
}

/// Style for an edge leaving a node of `kind`, or the default when the
/// source is unknown.
pub fn style_for(kind: Option<NodeKind>) -> EdgeStyle {
    EdgeStyle {
        stroke: kind.map(stroke_for).unwrap_or(DEFAULT_STROKE).to_string(),
        stroke_width: STROKE_WIDTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_matches_source_kinds() {
        assert_eq!(stroke_for(NodeKind::Dataset), "#3b82f6");
        assert_eq!(stroke_for(NodeKind::Preprocessing), "#eab308");
        assert_eq!(stroke_for(NodeKind::Split), "#a855f7");
        assert_eq!(stroke_for(NodeKind::Model), "#06b6d4");
        assert_eq!(stroke_for(NodeKind::Result), "#10b981");
    }

    #[test]
    fn imputation_and_encoding_use_default() {
        assert_eq!(stroke_for(NodeKind::Imputation), DEFAULT_STROKE);
        assert_eq!(stroke_for(NodeKind::Encoding), DEFAULT_STROKE);
    }

    #[test]
    fn missing_source_uses_default() {
        let style = style_for(None);
        assert_eq!(style.stroke, DEFAULT_STROKE);
        assert_eq!(style.stroke_width, STROKE_WIDTH);
    }
}
