//! Triangle mesh parsing and vertex interleaving.
//!
//! Meshes are consumed from a line-oriented text format:
//!
//! ```text
//! o torus
//! v 1.0 0.0 0.0
//! vn 0.0 1.0 0.0
//! vt 0.5 0.5
//! f 1/1/1 2/2/2 3/3/3
//! ```
//!
//! - `o <name>` names the object
//! - `v <x> <y> <z>` declares a position
//! - `vn <x> <y> <z>` declares a normal
//! - `vt <u> <v>` declares a texture coordinate
//! - `f v/t/n v/t/n v/t/n` declares a triangle; indices are 1-based and
//!   reference the attribute arrays declared above
//!
//! Lines starting with anything else are skipped. Every line, including the
//! last one, must end with a newline; indices that do not resolve to a
//! declared attribute fail at parse time.
//!
//! [`Mesh::interleave`] flattens the faces into the vertex layout the
//! graphics pipeline consumes: `[position.xyz, normal.xyz, uv.xy]`,
//! 8 floats per vertex, 24 per triangle, in face order.

use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};

/// Floats per interleaved vertex: position (3) + normal (3) + uv (2).
pub const FLOATS_PER_VERTEX: usize = 8;

/// Indices of one face corner into the mesh attribute arrays (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerIndices {
    /// Index into the position array.
    pub position: usize,
    /// Index into the texture coordinate array.
    pub tex_coord: usize,
    /// Index into the normal array.
    pub normal: usize,
}

/// A triangle mesh parsed from the text format.
///
/// All faces are triangles and every corner index has been validated
/// against the attribute arrays, so [`Mesh::interleave`] cannot fail.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    name: Option<String>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    faces: Vec<[CornerIndices; 3]>,
}

impl Mesh {
    /// Reads and parses a mesh from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the content fails to
    /// parse.
    pub fn load(path: &Path) -> ResourceResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mesh = Self::parse(&text)?;
        debug!(
            "Loaded mesh '{}' from {:?}: {} triangles",
            mesh.name.as_deref().unwrap_or("<unnamed>"),
            path,
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Parses a mesh from text.
    ///
    /// Empty input yields an empty mesh. Non-empty input must end with a
    /// newline; a truncated final line is rejected rather than silently
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MeshParse`] with the offending line number
    /// when a directive is malformed or a face references an attribute that
    /// was never declared.
    pub fn parse(text: &str) -> ResourceResult<Self> {
        if text.is_empty() {
            return Ok(Self::default());
        }

        if !text.ends_with('\n') {
            return Err(ResourceError::MeshParse {
                line: text.lines().count(),
                message: "final line is missing its newline".to_string(),
            });
        }

        let mut name = None;
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();
        let mut faces = Vec::new();
        let mut face_lines = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let mut tokens = line.split_whitespace();

            let Some(prefix) = tokens.next() else {
                continue;
            };

            match prefix {
                "o" => {
                    let object = tokens.next().ok_or_else(|| ResourceError::MeshParse {
                        line: line_number,
                        message: "'o' directive is missing a name".to_string(),
                    })?;
                    name = Some(object.to_string());
                }
                "v" => positions.push(parse_vec3(&mut tokens, line_number, "v")?),
                "vn" => normals.push(parse_vec3(&mut tokens, line_number, "vn")?),
                "vt" => tex_coords.push(parse_vec2(&mut tokens, line_number)?),
                "f" => {
                    faces.push(parse_face(&mut tokens, line_number)?);
                    face_lines.push(line_number);
                }
                // Unknown prefixes (comments, smoothing groups, ...) are skipped
                _ => {}
            }
        }

        // Attributes may be declared anywhere in the file, so face indices
        // are checked once everything has been read.
        for (face, &line_number) in faces.iter().zip(&face_lines) {
            for corner in face {
                check_index(corner.position, positions.len(), "position", line_number)?;
                check_index(corner.tex_coord, tex_coords.len(), "texture coordinate", line_number)?;
                check_index(corner.normal, normals.len(), "normal", line_number)?;
            }
        }

        Ok(Self {
            name,
            positions,
            normals,
            tex_coords,
            faces,
        })
    }

    /// Returns the object name, if the file declared one.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns the number of vertices produced by [`Mesh::interleave`].
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.faces.len() * 3
    }

    /// Returns the parsed faces as corner index triples.
    #[inline]
    pub fn faces(&self) -> &[[CornerIndices; 3]] {
        &self.faces
    }

    /// Flattens the mesh into interleaved vertex data.
    ///
    /// Each face corner becomes one vertex of 8 floats:
    /// `[position.xyz, normal.xyz, uv.xy]`, emitted in face order. The
    /// result feeds a vertex buffer directly.
    pub fn interleave(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.vertex_count() * FLOATS_PER_VERTEX);

        for face in &self.faces {
            for corner in face {
                let position = self.positions[corner.position];
                let normal = self.normals[corner.normal];
                let uv = self.tex_coords[corner.tex_coord];

                data.extend_from_slice(&[
                    position.x, position.y, position.z, normal.x, normal.y, normal.z, uv.x, uv.y,
                ]);
            }
        }

        data
    }
}

fn parse_float<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    directive: &str,
) -> ResourceResult<f32> {
    let token = tokens.next().ok_or_else(|| ResourceError::MeshParse {
        line,
        message: format!("'{directive}' directive has too few components"),
    })?;

    token.parse().map_err(|_| ResourceError::MeshParse {
        line,
        message: format!("'{token}' is not a valid float"),
    })
}

fn parse_vec3<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    directive: &str,
) -> ResourceResult<Vec3> {
    let x = parse_float(tokens, line, directive)?;
    let y = parse_float(tokens, line, directive)?;
    let z = parse_float(tokens, line, directive)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec2<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> ResourceResult<Vec2> {
    let u = parse_float(tokens, line, "vt")?;
    let v = parse_float(tokens, line, "vt")?;
    Ok(Vec2::new(u, v))
}

/// Parses one `v/t/n` corner, converting from 1-based to 0-based indices.
fn parse_corner(token: &str, line: usize) -> ResourceResult<CornerIndices> {
    let mut parts = token.split('/');

    let mut next_index = |what: &str| -> ResourceResult<usize> {
        let part = parts.next().ok_or_else(|| ResourceError::MeshParse {
            line,
            message: format!("corner '{token}' is missing its {what} index"),
        })?;

        let index: usize = part.parse().map_err(|_| ResourceError::MeshParse {
            line,
            message: format!("'{part}' is not a valid index"),
        })?;

        if index == 0 {
            return Err(ResourceError::MeshParse {
                line,
                message: "face indices are 1-based, found 0".to_string(),
            });
        }

        Ok(index - 1)
    };

    let position = next_index("position")?;
    let tex_coord = next_index("texture coordinate")?;
    let normal = next_index("normal")?;

    if parts.next().is_some() {
        return Err(ResourceError::MeshParse {
            line,
            message: format!("corner '{token}' has more than three indices"),
        });
    }

    Ok(CornerIndices {
        position,
        tex_coord,
        normal,
    })
}

fn parse_face<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> ResourceResult<[CornerIndices; 3]> {
    let mut corners = [CornerIndices {
        position: 0,
        tex_coord: 0,
        normal: 0,
    }; 3];

    for corner in &mut corners {
        let token = tokens.next().ok_or_else(|| ResourceError::MeshParse {
            line,
            message: "'f' directive needs exactly three corners".to_string(),
        })?;
        *corner = parse_corner(token, line)?;
    }

    if tokens.next().is_some() {
        return Err(ResourceError::MeshParse {
            line,
            message: "'f' directive needs exactly three corners (only triangles are supported)"
                .to_string(),
        });
    }

    Ok(corners)
}

fn check_index(index: usize, count: usize, what: &str, line: usize) -> ResourceResult<()> {
    if index >= count {
        return Err(ResourceError::MeshParse {
            line,
            message: format!(
                "face references {what} {} but only {count} are declared",
                index + 1
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vn 0.0 0.0 1.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1/1 2/2/2 3/3/3
";

    #[test]
    fn test_parse_triangle() {
        let mesh = Mesh::parse(TRIANGLE).unwrap();

        assert_eq!(mesh.name(), Some("triangle"));
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);

        let expected = [
            CornerIndices {
                position: 0,
                tex_coord: 0,
                normal: 0,
            },
            CornerIndices {
                position: 1,
                tex_coord: 1,
                normal: 1,
            },
            CornerIndices {
                position: 2,
                tex_coord: 2,
                normal: 2,
            },
        ];
        assert_eq!(mesh.faces(), &[expected]);
    }

    #[test]
    fn test_interleave_layout() {
        let mesh = Mesh::parse(TRIANGLE).unwrap();
        let data = mesh.interleave();

        // 3 vertices of 8 floats each
        assert_eq!(data.len(), 24);

        // First vertex: position (0,0,0), normal (0,0,1), uv (0,0)
        assert_eq!(&data[0..8], &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        // Second vertex: position (1,0,0), normal (0,0,1), uv (1,0)
        assert_eq!(&data[8..16], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_interleave_resolves_each_index_kind() {
        // The corner 1/2/3 must pull position 1, uv 2 and normal 3,
        // not any other pairing of the three indices.
        let text = "\
v 5.0 5.0 5.0
v 6.0 6.0 6.0
vn 0.0 1.0 0.0
vn 0.0 0.0 1.0
vn 1.0 0.0 0.0
vt 0.25 0.25
vt 0.75 0.75
f 1/2/3 2/1/1 1/1/2
";
        let mesh = Mesh::parse(text).unwrap();
        let data = mesh.interleave();

        // First corner: position 1 -> (5,5,5), uv 2 -> (0.75,0.75), normal 3 -> (1,0,0)
        assert_eq!(&data[0..8], &[5.0, 5.0, 5.0, 1.0, 0.0, 0.0, 0.75, 0.75]);
    }

    #[test]
    fn test_missing_trailing_newline_is_rejected() {
        let text = "v 0.0 0.0 0.0";
        let err = Mesh::parse(text).unwrap_err();
        assert!(matches!(err, ResourceError::MeshParse { line: 1, .. }));
    }

    #[test]
    fn test_empty_input_is_an_empty_mesh() {
        let mesh = Mesh::parse("").unwrap();
        assert_eq!(mesh.triangle_count(), 0);
        assert!(mesh.interleave().is_empty());
    }

    #[test]
    fn test_unknown_prefixes_are_skipped() {
        let text = "\
# a comment
s off
v 0.0 0.0 0.0
";
        let mesh = Mesh::parse(text).unwrap();
        assert_eq!(mesh.positions.len(), 1);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_out_of_range_index_fails_at_parse_time() {
        let text = "\
v 0.0 0.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
f 1/1/1 2/1/1 1/1/1
";
        let err = Mesh::parse(text).unwrap_err();
        match err {
            ResourceError::MeshParse { line, message } => {
                assert_eq!(line, 4);
                assert!(message.contains("position"), "message: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_index_is_rejected() {
        let text = "\
v 0.0 0.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
f 0/1/1 1/1/1 1/1/1
";
        assert!(Mesh::parse(text).is_err());
    }

    #[test]
    fn test_malformed_float_reports_line() {
        let text = "\
v 0.0 0.0 0.0
v 1.0 nope 0.0
";
        let err = Mesh::parse(text).unwrap_err();
        assert!(matches!(err, ResourceError::MeshParse { line: 2, .. }));
    }

    #[test]
    fn test_quad_faces_are_rejected() {
        let text = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
f 1/1/1 2/1/1 3/1/1 4/1/1
";
        assert!(Mesh::parse(text).is_err());
    }

    #[test]
    fn test_truncated_face_is_rejected() {
        let text = "\
v 0.0 0.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
f 1/1/1 1/1/1
";
        assert!(Mesh::parse(text).is_err());
    }
}
