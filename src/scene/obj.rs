//! Minimal Wavefront OBJ reader
//!
//! Reads `v`, `vt`, `vn`, `f` and `o`/`g` records. Polygons are
//! fan-triangulated and every distinct `v/vt/vn` triple becomes one shared
//! vertex. Materials and everything else are ignored.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use super::Mesh;
use crate::rasterizer::{Vec2, Vec3, Vertex};

/// Error type for mesh loading
#[derive(Debug)]
pub enum MeshError {
    IoError(std::io::Error),
    ParseError { line: usize, message: String },
}

impl From<std::io::Error> for MeshError {
    fn from(e: std::io::Error) -> Self {
        MeshError::IoError(e)
    }
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::IoError(e) => write!(f, "IO error: {}", e),
            MeshError::ParseError { line, message } => write!(f, "Parse error on line {}: {}", line, message),
        }
    }
}

impl std::error::Error for MeshError {}

/// Load every object in an OBJ file as a separate mesh
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Vec<Mesh>, MeshError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let meshes = parse_obj(&contents)?;
    log::debug!(
        "loaded {} mesh(es) from {}",
        meshes.len(),
        path.as_ref().display()
    );
    Ok(meshes)
}

/// Key of a face corner: position, texcoord and normal indices (0-based)
type Corner = (usize, Option<usize>, Option<usize>);

#[derive(Default)]
struct Builder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    lookup: HashMap<Corner, u32>,
}

impl Builder {
    fn finish(self, out: &mut Vec<Mesh>) {
        if !self.indices.is_empty() {
            out.push(Mesh::new(self.vertices, self.indices));
        }
    }
}

/// Parse OBJ text; one mesh per `o`/`g` group that has faces
pub fn parse_obj(src: &str) -> Result<Vec<Mesh>, MeshError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut texcoords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut meshes = Vec::new();
    let mut current = Builder::default();

    for (i, raw) in src.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else { continue };
        let args: Vec<&str> = parts.collect();

        match tag {
            "v" => positions.push(parse_vec3(&args, line_no)?),
            "vn" => normals.push(parse_vec3(&args, line_no)?),
            "vt" => {
                let u = parse_float(args.first(), line_no)?;
                let v = parse_float(args.get(1), line_no).unwrap_or(0.0);
                texcoords.push(Vec2::new(u, v));
            }
            "o" | "g" => {
                std::mem::take(&mut current).finish(&mut meshes);
            }
            "f" => {
                if args.len() < 3 {
                    return Err(parse_error(line_no, "face needs at least 3 vertices"));
                }
                let mut corners = Vec::with_capacity(args.len());
                for arg in &args {
                    let corner = parse_corner(arg, line_no, positions.len(), texcoords.len(), normals.len())?;
                    let index = match current.lookup.get(&corner) {
                        Some(&idx) => idx,
                        None => {
                            let (p, t, n) = corner;
                            let vertex = Vertex::new(
                                positions[p],
                                n.map(|n| normals[n]).unwrap_or(Vec3::ZERO),
                                t.map(|t| texcoords[t]).unwrap_or(Vec2::ZERO),
                            );
                            let idx = current.vertices.len() as u32;
                            current.vertices.push(vertex);
                            current.lookup.insert(corner, idx);
                            idx
                        }
                    };
                    corners.push(index);
                }
                // fan triangulation
                for k in 1..corners.len() - 1 {
                    current.indices.extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
                }
            }
            _ => {}
        }
    }

    current.finish(&mut meshes);
    Ok(meshes)
}

fn parse_error(line: usize, message: impl Into<String>) -> MeshError {
    MeshError::ParseError {
        line,
        message: message.into(),
    }
}

fn parse_float(s: Option<&&str>, line: usize) -> Result<f32, MeshError> {
    let s = s.ok_or_else(|| parse_error(line, "missing number"))?;
    s.parse::<f32>()
        .map_err(|_| parse_error(line, format!("invalid number '{}'", s)))
}

fn parse_vec3(args: &[&str], line: usize) -> Result<Vec3, MeshError> {
    Ok(Vec3::new(
        parse_float(args.first(), line)?,
        parse_float(args.get(1), line)?,
        parse_float(args.get(2), line)?,
    ))
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(s: &str, count: usize, line: usize) -> Result<usize, MeshError> {
    let raw: i64 = s
        .parse()
        .map_err(|_| parse_error(line, format!("invalid index '{}'", s)))?;
    let idx = if raw < 0 { count as i64 + raw } else { raw - 1 };
    if idx < 0 || idx as usize >= count {
        return Err(parse_error(line, format!("index {} out of range", raw)));
    }
    Ok(idx as usize)
}

fn parse_corner(s: &str, line: usize, np: usize, nt: usize, nn: usize) -> Result<Corner, MeshError> {
    let mut fields = s.split('/');
    let p = resolve_index(fields.next().unwrap_or(""), np, line)?;
    let t = match fields.next() {
        Some(f) if !f.is_empty() => Some(resolve_index(f, nt, line)?),
        _ => None,
    };
    let n = match fields.next() {
        Some(f) if !f.is_empty() => Some(resolve_index(f, nn, line)?),
        _ => None,
    };
    Ok((p, t, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# a unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 -1
f 1/1/1 4/4/1 3/3/1 2/2/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let meshes = parse_obj(QUAD).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[1].uv, Vec2::new(0.0, 1.0));
        assert_eq!(mesh.vertices[0].normal, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_shared_corners_are_deduplicated() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 3 2 4\n";
        let meshes = parse_obj(src).unwrap();
        assert_eq!(meshes[0].vertices.len(), 4);
        assert_eq!(meshes[0].triangle_count(), 2);
    }

    #[test]
    fn test_objects_split_meshes_and_negative_indices() {
        let src = "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\no b\nv 0 0 1\nf 1 2 4\n";
        let meshes = parse_obj(src).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[1].vertices[2].pos, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_bad_index_reports_line() {
        let err = parse_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
        match err {
            MeshError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load_obj("no/such/mesh.obj"), Err(MeshError::IoError(_))));
    }
}
