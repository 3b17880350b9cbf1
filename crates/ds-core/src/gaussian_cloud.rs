use std::io::{self, Write};
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Vertex properties in the order they are laid out in the PLY body.
pub const SPLAT_PROPERTIES: [&str; 17] = [
    "x", "y", "z",
    "nx", "ny", "nz",
    "f_dc_0", "f_dc_1", "f_dc_2",
    "opacity",
    "scale_0", "scale_1", "scale_2",
    "rot_0", "rot_1", "rot_2", "rot_3",
];

const FLOATS_PER_SPLAT: usize = SPLAT_PROPERTIES.len();
const END_HEADER: &[u8] = b"end_header\n";

/// One Gaussian, stored exactly as it appears in a PLY vertex row.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Splat {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub f_dc: [f32; 3],
    pub opacity: f32,
    pub scale: [f32; 3],
    pub rotation: [f32; 4],
}

#[derive(Error, Debug)]
pub enum PlyError {
    #[error("PLY header is missing or truncated")]
    MissingHeader,
    #[error("Unsupported PLY header line: {0}")]
    UnsupportedHeader(String),
    #[error("Expected {expected} vertex properties matching the splat layout, found {found:?}")]
    PropertyMismatch { expected: usize, found: Vec<String> },
    #[error("PLY body holds {actual} bytes, expected {expected}")]
    BodyLength { expected: usize, actual: usize },
}

/// A cloud of Gaussian splats that serializes to a self-describing binary PLY.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaussianCloud {
    pub splats: Vec<Splat>,
}

impl GaussianCloud {
    pub fn new(splats: Vec<Splat>) -> Self {
        Self { splats }
    }

    pub fn count(&self) -> usize {
        self.splats.len()
    }

    pub fn save_ply<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        let mut header = String::from("ply\nformat binary_little_endian 1.0\n");
        header.push_str(&format!("element vertex {}\n", self.splats.len()));
        for property in SPLAT_PROPERTIES {
            header.push_str(&format!("property float {property}\n"));
        }
        out.write_all(header.as_bytes())?;
        out.write_all(END_HEADER)?;

        let floats: &[f32] = bytemuck::cast_slice(&self.splats);
        let mut body = Vec::with_capacity(floats.len() * 4);
        for value in floats {
            body.extend_from_slice(&value.to_le_bytes());
        }
        out.write_all(&body)?;
        out.flush()
    }

    pub fn to_ply_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.save_ply(&mut buffer);
        buffer
    }

    pub fn from_ply(bytes: &[u8]) -> Result<Self, PlyError> {
        let header_end = bytes
            .windows(END_HEADER.len())
            .position(|window| window == END_HEADER)
            .ok_or(PlyError::MissingHeader)?;
        let header = std::str::from_utf8(&bytes[..header_end]).map_err(|_| PlyError::MissingHeader)?;
        let body = &bytes[header_end + END_HEADER.len()..];

        let mut lines = header.lines();
        if lines.next() != Some("ply") {
            return Err(PlyError::MissingHeader);
        }

        let mut vertex_count = None;
        let mut properties = Vec::new();
        for line in lines {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["format", "binary_little_endian", "1.0"] => {}
                ["comment", ..] | [] => {}
                ["element", "vertex", count] => {
                    let count = count
                        .parse::<usize>()
                        .map_err(|_| PlyError::UnsupportedHeader(line.to_string()))?;
                    vertex_count = Some(count);
                }
                ["property", "float", name] => properties.push(name.to_string()),
                _ => return Err(PlyError::UnsupportedHeader(line.to_string())),
            }
        }

        let vertex_count = vertex_count.ok_or(PlyError::MissingHeader)?;
        if properties.iter().map(String::as_str).ne(SPLAT_PROPERTIES) {
            return Err(PlyError::PropertyMismatch {
                expected: FLOATS_PER_SPLAT,
                found: properties,
            });
        }

        let expected = vertex_count * FLOATS_PER_SPLAT * 4;
        if body.len() != expected {
            return Err(PlyError::BodyLength { expected, actual: body.len() });
        }

        let floats: Vec<f32> = body
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        let splats = bytemuck::cast_slice::<f32, Splat>(&floats).to_vec();

        Ok(Self { splats })
    }
}
