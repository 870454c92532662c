//! Layout inspection for editor tooling: which parts of a composite source
//! are declarative schema and which are embedded expressions.

use gqlx_types::{Result, SourceFile, Span};
use serde::Serialize;

use crate::excise::excise;
use crate::extract::extract;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegionKind {
    Declarative,
    Expression,
}

/// A 1-based line/column together with the byte offset it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutRegion {
    pub kind: RegionKind,
    pub start: Position,
    pub end: Position,
}

/// The layout of one composite source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Alternating declarative and expression regions covering the whole
    /// text; empty declarative gaps are left out.
    pub regions: Vec<LayoutRegion>,
    pub schema_text: String,
    pub line_lengths: Vec<usize>,
    #[serde(skip)]
    file: SourceFile,
}

impl Layout {
    /// Line and column of a byte offset of the inspected source.
    pub fn position_at(&self, offset: usize) -> Position {
        position(&self.file, offset)
    }
}

fn position(file: &SourceFile, offset: usize) -> Position {
    let offset = offset.min(file.source.len());
    let (line, column) = file.position(offset);
    Position { line, column, offset }
}

fn region(file: &SourceFile, kind: RegionKind, span: Span) -> LayoutRegion {
    LayoutRegion {
        kind,
        start: position(file, span.start),
        end: position(file, span.end),
    }
}

/// Split `source` into declarative and expression regions.
///
/// Fails with the same errors as extraction.
pub fn inspect(name: &str, source: &str) -> Result<Layout> {
    let file = SourceFile::new(name, source);
    let extraction = extract(&file)?;
    let spans = extraction.spans();

    let mut regions = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;
    for span in &spans {
        if span.start > cursor {
            regions.push(region(&file, RegionKind::Declarative, Span::new(cursor, span.start)));
        }
        regions.push(region(&file, RegionKind::Expression, *span));
        cursor = span.end;
    }
    if cursor < source.len() {
        regions.push(region(&file, RegionKind::Declarative, Span::new(cursor, source.len())));
    }

    Ok(Layout {
        regions,
        schema_text: excise(source, &spans),
        line_lengths: file.line_lengths(),
        file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_alternate() {
        let src = "type Query {\n  a: Int { 1 }\n}\n";
        let layout = inspect("t", src).unwrap();
        let kinds: Vec<_> = layout.regions.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RegionKind::Declarative, RegionKind::Expression, RegionKind::Declarative]
        );
        let first = layout.regions[0].start;
        assert_eq!((first.line, first.column, first.offset), (1, 1, 0));
        let expr = layout.regions[1];
        assert_eq!((expr.start.line, expr.start.column), (2, 10));
        assert_eq!((expr.end.line, expr.end.column), (2, 15));
        assert_eq!(layout.schema_text, "type Query {\n  a: Int \n}\n");
    }

    #[test]
    fn test_plain_schema_is_one_region() {
        let layout = inspect("t", "type Item { id: ID }").unwrap();
        assert_eq!(layout.regions.len(), 1);
        assert_eq!(layout.regions[0].kind, RegionKind::Declarative);
        assert_eq!(layout.regions[0].end.offset, 20);
    }

    #[test]
    fn test_position_at() {
        let layout = inspect("t", "type Query {\n  a: Int { 1 }\n}").unwrap();
        let pos = layout.position_at(15);
        assert_eq!((pos.line, pos.column), (2, 3));
        assert_eq!(layout.line_lengths.len(), 3);
    }

    #[test]
    fn test_serializes_for_tooling() {
        let layout = inspect("t", "type Query { a: Int { 1 } }").unwrap();
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["regions"][1]["kind"], "Expression");
        assert!(json["schemaText"].is_string());
        assert!(json.get("file").is_none());
    }
}
