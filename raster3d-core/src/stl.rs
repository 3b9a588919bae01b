/// STL mesh sources, binary and line-oriented ASCII
use nom::{
    bytes::complete::take_till1,
    character::complete::{space0, space1},
    combinator::all_consuming,
    number::complete::float,
    sequence::preceded,
    IResult,
};
use std::path::Path;

use crate::error::{Error, Result};
use crate::geometry::{Mesh, Triangle};
use crate::point::Point;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file. Stored facet normals are ignored; normals are
/// always derived from the winding.
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh> {
    if data.len() < HEADER_LEN + 4 {
        return Err(Error::parse(0, "file too small to be a valid STL"));
    }

    let data = &data[HEADER_LEN..];
    let triangle_count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let facets = &data[4..];
    if facets.len() < triangle_count * FACET_LEN {
        return Err(Error::parse(
            0,
            format!(
                "unexpected end of file: {} triangles declared, room for {}",
                triangle_count,
                facets.len() / FACET_LEN
            ),
        ));
    }

    let read_f32 = |bytes: &[u8], at: usize| {
        f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    };

    let mut mesh = Mesh::with_capacity(triangle_count);
    for facet in facets.chunks_exact(FACET_LEN).take(triangle_count) {
        // Skip the 12-byte normal, then three vertices of 12 bytes each
        let vertex = |i: usize| {
            let at = 12 + i * 12;
            Point::new(read_f32(facet, at), read_f32(facet, at + 4), read_f32(facet, at + 8))
        };
        mesh.add_triangle(Triangle::new(vertex(0), vertex(1), vertex(2)));
    }

    Ok(mesh)
}

/// Parse an ASCII STL source.
///
/// Lines are read as records: `solid`/`endsolid` lines are skipped, a
/// `facet`/`outer loop` header opens a triangle, exactly three vertex lines
/// (`<tag> x y z`) follow, and `endloop`/`endfacet` lines close it.
pub fn parse_ascii_stl(input: &str) -> Result<Mesh> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    let mut mesh = Mesh::new();
    while let Some((number, line)) = lines.next() {
        let keyword = line.split_whitespace().next().unwrap_or_default();
        match keyword {
            "solid" | "endsolid" | "endloop" | "endfacet" => continue,
            "facet" => {
                if let Some((_, next)) = lines.peek() {
                    if next.starts_with("outer") {
                        lines.next();
                    }
                }
            }
            "outer" => {}
            _ => {
                return Err(Error::parse(
                    number,
                    format!("expected a facet or loop marker, found '{}'", line),
                ))
            }
        }

        let mut vertices = [Point::origin(); 3];
        for vertex in &mut vertices {
            let (number, line) = lines
                .next()
                .ok_or_else(|| Error::parse(number, "unexpected end of input inside a facet"))?;
            *vertex = parse_vertex_line(number, line)?;
        }
        mesh.add_triangle(Triangle::new(vertices[0], vertices[1], vertices[2]));
    }

    Ok(mesh)
}

fn parse_vertex_line(number: usize, line: &str) -> Result<Point> {
    match all_consuming(vertex)(line) {
        Ok((_, (x, y, z))) => Ok(Point::new(x, y, z)),
        Err(e) => Err(Error::parse(
            number,
            format!("malformed vertex line '{}': {:?}", line, e),
        )),
    }
}

fn vertex(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = take_till1(char::is_whitespace)(input)?;
    let (input, x) = preceded(space1, float)(input)?;
    let (input, y) = preceded(space1, float)(input)?;
    let (input, z) = preceded(space1, float)(input)?;
    let (input, _) = space0(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            // Binary headers may also start with "solid"
            if text.contains("vertex") || text.contains("endsolid") {
                return parse_ascii_stl(text);
            }
        }
    }

    parse_binary_stl(data)
}

/// Read and parse an STL file
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let data = std::fs::read(path.as_ref())?;
    let mesh = parse_stl(&data)?;
    log::debug!(
        "loaded {} triangles from {}",
        mesh.len(),
        path.as_ref().display()
    );
    Ok(mesh)
}
