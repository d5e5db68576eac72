//! Builds synthetic TMD files for tests.

use super::header::{FILE_HEADER_SIZE, TMD_MAGIC};
use super::object::{OBJECT_HEADER_SIZE, ObjectHeader};

/// `(output_len, flag, mode, payload)`; `input_len` is derived from the payload.
pub type PrimitiveSpec = (u8, u8, u8, Vec<u8>);

#[derive(Debug, Clone, Default)]
pub struct ObjectSpec {
    vertices: Vec<[i16; 3]>,
    normals: Vec<[u16; 3]>,
    primitives: Vec<PrimitiveSpec>,
    scale_exponent: i32,
    vertex_count_override: Option<u32>,
}

impl ObjectSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(mut self, vertices: &[[i16; 3]]) -> Self {
        self.vertices.extend_from_slice(vertices);
        self
    }

    pub fn normals(mut self, normals: &[[u16; 3]]) -> Self {
        self.normals.extend_from_slice(normals);
        self
    }

    pub fn primitive(mut self, primitive: PrimitiveSpec) -> Self {
        assert_eq!(primitive.3.len() % 4, 0, "payload must be whole words");
        self.primitives.push(primitive);
        self
    }

    pub fn scale_exponent(mut self, exponent: i32) -> Self {
        self.scale_exponent = exponent;
        self
    }

    /// Store a vertex count that disagrees with the vertices written.
    pub fn vertex_count_override(mut self, count: u32) -> Self {
        self.vertex_count_override = Some(count);
        self
    }
}

pub struct BuiltTmd {
    pub data: Vec<u8>,
    /// The object headers as written.
    pub objects: Vec<ObjectHeader>,
}

/// Lays out the file header, the object table, then each object's vertices,
/// normals and primitives in object order.
#[derive(Debug, Clone, Default)]
pub struct TmdBuilder {
    objects: Vec<ObjectSpec>,
}

impl TmdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object: ObjectSpec) -> Self {
        self.objects.push(object);
        self
    }

    pub fn build(&self) -> BuiltTmd {
        let mut body = Vec::new();
        let mut headers = Vec::with_capacity(self.objects.len());
        let table_len = self.objects.len() * OBJECT_HEADER_SIZE;

        for object in &self.objects {
            let offset = |body: &Vec<u8>| (table_len + body.len()) as u32;

            let vertices_offset = offset(&body);
            for [x, y, z] in &object.vertices {
                for word in [*x, *y, *z, 0] {
                    body.extend(word.to_le_bytes());
                }
            }

            let normals_offset = offset(&body);
            for [x, y, z] in &object.normals {
                for word in [*x, *y, *z, 0] {
                    body.extend(word.to_le_bytes());
                }
            }

            let primitives_offset = offset(&body);
            for (output_len, flag, mode, payload) in &object.primitives {
                body.extend([*output_len, (payload.len() / 4) as u8, *flag, *mode]);
                body.extend_from_slice(payload);
            }

            headers.push(ObjectHeader {
                vertices_offset,
                vertex_count: object
                    .vertex_count_override
                    .unwrap_or(object.vertices.len() as u32),
                normals_offset,
                normal_count: object.normals.len() as u32,
                primitives_offset,
                primitive_count: object.primitives.len() as u32,
                scale_exponent: object.scale_exponent,
            });
        }

        let mut data = Vec::with_capacity(FILE_HEADER_SIZE + table_len + body.len());
        data.extend(TMD_MAGIC.to_le_bytes());
        data.extend(0u32.to_le_bytes());
        data.extend((headers.len() as u32).to_le_bytes());
        for h in &headers {
            for word in [
                h.vertices_offset,
                h.vertex_count,
                h.normals_offset,
                h.normal_count,
                h.primitives_offset,
                h.primitive_count,
            ] {
                data.extend(word.to_le_bytes());
            }
            data.extend(h.scale_exponent.to_le_bytes());
        }
        data.extend(body);

        BuiltTmd {
            data,
            objects: headers,
        }
    }
}
