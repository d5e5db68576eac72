use bon::Builder;
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};

use super::header::{FileHeader, parse_file_header};
use super::object::{
    Normal, ObjectHeader, ObjectSections, Vertex, decode_normals, decode_vertices,
    parse_object_table, resolve_sections,
};
use super::primitive::{IndexBounds, Primitive, decode_primitives};

/// What to do when one object's sections or primitive stream do not fit in
/// the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectErrorPolicy {
    /// Fail the whole decode.
    #[default]
    Abort,
    /// Leave the object out and record the error in [`DecodedFile::issues`].
    Skip,
}

#[derive(Builder, Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    #[builder(default)]
    pub object_errors: ObjectErrorPolicy,
    /// Decode objects on the rayon thread pool. Ignored without the `rayon` feature.
    #[builder(default)]
    pub parallel: bool,
}

/// One decoded object. Primitive indices refer to this object's own arrays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedObject {
    /// Position in the object table.
    pub index: usize,
    pub header: ObjectHeader,
    pub vertices: Vec<Vertex>,
    pub normals: Vec<Normal>,
    pub primitives: Vec<Primitive>,
    /// Absolute offset just past the last primitive record.
    pub primitives_end: usize,
}

impl DecodedObject {
    pub fn scale(&self) -> f32 {
        self.header.scale()
    }

    pub fn vertex(&self, index: Option<u16>) -> Option<&Vertex> {
        self.vertices.get(usize::from(index?))
    }

    pub fn normal(&self, index: Option<u16>) -> Option<&Normal> {
        self.normals.get(usize::from(index?))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedFile {
    pub header: FileHeader,
    pub objects: Vec<DecodedObject>,
    /// Recoverable errors, and skipped objects under [`ObjectErrorPolicy::Skip`],
    /// in file order.
    pub issues: Vec<DecodeError>,
}

/// Decode `file_data` with the default (strict) options.
pub fn decode(file_data: &[u8]) -> DecodeResult<DecodedFile> {
    decode_with(file_data, &DecodeOptions::default())
}

pub fn decode_with(file_data: &[u8], options: &DecodeOptions) -> DecodeResult<DecodedFile> {
    let header = parse_file_header(file_data)?;
    debug!(object_count = header.object_count, len = file_data.len(), "parsed TMD header");

    let object_headers = parse_object_table(file_data, header.object_count)?;
    let results = decode_objects(file_data, &object_headers, options.parallel);

    let mut objects = Vec::with_capacity(results.len());
    let mut issues = Vec::new();
    for result in results {
        match result {
            Ok((object, object_issues)) => {
                objects.push(object);
                issues.extend(object_issues);
            }
            Err(err) => match options.object_errors {
                ObjectErrorPolicy::Abort => return Err(err),
                ObjectErrorPolicy::Skip => {
                    warn!(%err, "skipping object");
                    issues.push(err);
                }
            },
        }
    }

    Ok(DecodedFile {
        header,
        objects,
        issues,
    })
}

type ObjectResult = DecodeResult<(DecodedObject, Vec<DecodeError>)>;

#[cfg(feature = "rayon")]
fn decode_objects(
    file_data: &[u8],
    headers: &[ObjectHeader],
    parallel: bool,
) -> Vec<ObjectResult> {
    use rayon::prelude::*;

    if parallel {
        headers
            .par_iter()
            .enumerate()
            .map(|(index, header)| decode_object(file_data, index, header))
            .collect()
    } else {
        decode_objects_sequential(file_data, headers)
    }
}

#[cfg(not(feature = "rayon"))]
fn decode_objects(
    file_data: &[u8],
    headers: &[ObjectHeader],
    _parallel: bool,
) -> Vec<ObjectResult> {
    decode_objects_sequential(file_data, headers)
}

fn decode_objects_sequential(file_data: &[u8], headers: &[ObjectHeader]) -> Vec<ObjectResult> {
    headers
        .iter()
        .enumerate()
        .map(|(index, header)| decode_object(file_data, index, header))
        .collect()
}

fn decode_object(file_data: &[u8], index: usize, header: &ObjectHeader) -> ObjectResult {
    let ObjectSections {
        vertices,
        normals,
        primitives_start,
    } = resolve_sections(index, header, file_data.len())?;

    let vertices = decode_vertices(file_data, index, vertices)?;
    let normals = decode_normals(file_data, index, normals)?;

    let mut issues = Vec::new();
    let bounds = IndexBounds {
        vertex_count: header.vertex_count,
        normal_count: header.normal_count,
    };
    let stream = decode_primitives(
        file_data,
        index,
        primitives_start,
        header.primitive_count,
        bounds,
        &mut issues,
    )?;

    for issue in &issues {
        warn!(%issue, "recoverable decode issue");
    }
    debug!(
        object = index,
        vertices = vertices.len(),
        normals = normals.len(),
        primitives = stream.primitives.len(),
        scale = header.scale(),
        "decoded object"
    );

    Ok((
        DecodedObject {
            index,
            header: *header,
            vertices,
            normals,
            primitives: stream.primitives,
            primitives_end: stream.end,
        },
        issues,
    ))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::{IndexKind, Section};
    use crate::tmd::header::{FILE_HEADER_SIZE, TMD_MAGIC};
    use crate::tmd::primitive::{PrimitiveClass, PrimitiveRecord, Rgb};
    use crate::tmd::test_support::{ObjectSpec, TmdBuilder};

    fn flat_triangle(vertices: [u16; 3]) -> (u8, u8, u8, Vec<u8>) {
        let mut payload = vec![255, 0, 0, 0x20, 0, 0];
        for v in vertices {
            payload.extend(v.to_le_bytes());
        }
        (4, 0, 0x20, payload)
    }

    fn line(vertices: [u16; 2]) -> (u8, u8, u8, Vec<u8>) {
        let mut payload = vec![0, 255, 0, 0x40];
        for v in vertices {
            payload.extend(v.to_le_bytes());
        }
        (3, 1, 0x40, payload)
    }

    fn triangle_object() -> ObjectSpec {
        ObjectSpec::new()
            .vertices(&[[0, 0, 0], [10, 0, 0], [0, 10, 0]])
            .normals(&[[0, 0, 0x1000]])
            .primitive(flat_triangle([0, 1, 2]))
    }

    #[test]
    fn three_record_stream() {
        let object = ObjectSpec::new()
            .vertices(&[[1, 2, 3], [4, 5, 6], [7, 8, 9]])
            .normals(&[[0x1000, 0, 0]])
            .primitive(flat_triangle([0, 1, 2]))
            .primitive(line([2, 0]))
            .primitive((7, 0xFF, 0xFF, vec![0xEE; 8]));
        let built = TmdBuilder::new().object(object).build();

        let file = decode(&built.data).unwrap();
        assert!(file.issues.is_empty());
        let object = &file.objects[0];
        assert_eq!(object.primitives.len(), 3);

        assert!(matches!(object.primitives[0].record, PrimitiveRecord::FlatTriangle { .. }));
        assert_eq!(
            object.primitives[1].record,
            PrimitiveRecord::Line {
                color: Rgb { r: 0, g: 255, b: 0 },
                vertices: [Some(2), Some(0)],
            }
        );
        assert_eq!(
            object.primitives[2].record,
            PrimitiveRecord::Unknown {
                output_len: 7,
                input_len: 2
            }
        );
        assert_eq!(object.primitives[0].class(), PrimitiveClass::Polygon);
        assert_eq!(object.primitives[1].class(), PrimitiveClass::Line);

        let primitives_offset = built.objects[0].primitives_offset as usize;
        let stream_len: usize = [3usize, 2, 2].iter().map(|ilen| 4 + ilen * 4).sum();
        assert_eq!(object.primitives[0].offset, FILE_HEADER_SIZE + primitives_offset);
        assert_eq!(object.primitives_end, FILE_HEADER_SIZE + primitives_offset + stream_len);
    }

    #[test]
    fn out_of_range_index_is_collected() {
        let bad = ObjectSpec::new()
            .vertices(&[[0, 0, 0], [1, 1, 1]])
            .primitive(line([0, 5]));
        let built = TmdBuilder::new()
            .object(triangle_object())
            .object(bad)
            .object(triangle_object())
            .build();

        let file = decode(&built.data).unwrap();
        assert_eq!(file.objects.len(), 3);
        assert_eq!(
            file.issues,
            [DecodeError::IndexOutOfRange {
                object: 1,
                primitive: 0,
                kind: IndexKind::Vertex,
                index: 5,
                count: 2,
            }]
        );
        assert_eq!(
            file.objects[1].primitives[0].record,
            PrimitiveRecord::Line {
                color: Rgb { r: 0, g: 255, b: 0 },
                vertices: [Some(0), None],
            }
        );
        assert_eq!(file.objects[0].primitives[0].record, file.objects[2].primitives[0].record);
        let v = file.objects[1].vertex(Some(1)).unwrap();
        assert_eq!(*v, Vertex { x: 1, y: 1, z: 1 });
        assert_eq!(file.objects[1].vertex(None), None);
    }

    #[test]
    fn flat_triangle_without_normals_reports_only_its_vertex() {
        let bad = ObjectSpec::new()
            .vertices(&[[0, 0, 0], [1, 1, 1]])
            .primitive(flat_triangle([0, 1, 5]));
        let built = TmdBuilder::new().object(bad).build();
        assert_eq!(built.objects[0].normal_count, 0);

        let file = decode(&built.data).unwrap();
        assert_eq!(
            file.issues,
            [DecodeError::IndexOutOfRange {
                object: 0,
                primitive: 0,
                kind: IndexKind::Vertex,
                index: 5,
                count: 2,
            }]
        );
        assert_eq!(
            file.objects[0].primitives[0].record,
            PrimitiveRecord::FlatTriangle {
                color: Rgb { r: 255, g: 0, b: 0 },
                vertices: [Some(0), Some(1), None],
            }
        );
    }

    #[test]
    fn offsets_share_one_base() {
        let built = TmdBuilder::new()
            .object(triangle_object())
            .object(triangle_object())
            .build();
        let file = decode(&built.data).unwrap();
        for (object, written) in file.objects.iter().zip(&built.objects) {
            assert_eq!(object.header.vertices_offset, written.vertices_offset);
            let primitives_start = FILE_HEADER_SIZE + written.primitives_offset as usize;
            assert_eq!(object.primitives[0].offset, primitives_start);
            assert_eq!(object.vertices[1], Vertex { x: 10, y: 0, z: 0 });
            assert_eq!(object.normals[0].z, 1.0);
        }
    }

    #[test]
    fn scale_is_exposed_not_applied() {
        let built = TmdBuilder::new()
            .object(triangle_object().scale_exponent(-1))
            .object(triangle_object())
            .build();
        let file = decode(&built.data).unwrap();
        assert_eq!(file.objects[0].scale(), 0.5);
        assert_eq!(file.objects[1].scale(), 1.0);
        assert_eq!(file.objects[0].vertices[1].x, 10);
    }

    #[test]
    fn header_errors_are_fatal() {
        let mut built = TmdBuilder::new().object(triangle_object()).build();
        built.data[4] = 1;
        assert_eq!(decode(&built.data), Err(DecodeError::UnsupportedVariant { flag: 1 }));

        built.data[0] = 0x42;
        assert!(matches!(
            decode(&built.data),
            Err(DecodeError::FormatMismatch { found: Some(0x42), .. })
        ));
    }

    #[test]
    fn broken_object_aborts_by_default() {
        let built = TmdBuilder::new()
            .object(triangle_object())
            .object(triangle_object().vertex_count_override(1000))
            .build();
        assert!(matches!(
            decode(&built.data),
            Err(DecodeError::OffsetOutOfRange {
                object: 1,
                section: Section::Vertices,
                ..
            })
        ));
    }

    #[test]
    fn broken_object_can_be_skipped() {
        let built = TmdBuilder::new()
            .object(triangle_object())
            .object(triangle_object().vertex_count_override(1000))
            .object(triangle_object())
            .build();
        let options = DecodeOptions::builder().object_errors(ObjectErrorPolicy::Skip).build();
        let file = decode_with(&built.data, &options).unwrap();

        let indices: Vec<usize> = file.objects.iter().map(|o| o.index).collect();
        assert_eq!(indices, [0, 2]);
        assert_eq!(file.issues.len(), 1);
        assert_eq!(file.issues[0].object(), Some(1));
        assert!(!file.issues[0].is_recoverable());
    }

    #[test]
    fn truncated_stream_is_fatal_for_object() {
        let built = TmdBuilder::new()
            .object(triangle_object())
            .object(ObjectSpec::new().primitive((0, 0xFF, 0xFF, vec![0; 8])))
            .build();
        let mut data = built.data.clone();
        data.truncate(data.len() - 4);
        assert!(matches!(
            decode(&data),
            Err(DecodeError::TruncatedStream { object: 1, primitive: 0, .. })
        ));

        let options = DecodeOptions::builder().object_errors(ObjectErrorPolicy::Skip).build();
        let file = decode_with(&data, &options).unwrap();
        assert_eq!(file.objects.len(), 1);
    }

    #[test]
    fn empty_file() {
        let built = TmdBuilder::new().build();
        let file = decode(&built.data).unwrap();
        assert_eq!(file.header.magic, TMD_MAGIC);
        assert!(file.objects.is_empty());
        assert!(file.issues.is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut builder = TmdBuilder::new();
        for i in 0..16 {
            let object = if i % 5 == 3 {
                ObjectSpec::new().vertices(&[[0, 0, 0]]).primitive(line([0, 9]))
            } else {
                triangle_object()
            };
            builder = builder.object(object);
        }
        let built = builder.build();

        let sequential = decode(&built.data).unwrap();
        let options = DecodeOptions::builder().parallel(true).build();
        let parallel = decode_with(&built.data, &options).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.issues.len(), 3);
    }

    proptest! {
        #[test]
        fn short_buffers_are_format_mismatch(
            data in proptest::collection::vec(any::<u8>(), 0..FILE_HEADER_SIZE)
        ) {
            prop_assert_eq!(
                decode(&data),
                Err(DecodeError::FormatMismatch { found: None, expected: TMD_MAGIC })
            );
        }

        #[test]
        fn arbitrary_bodies_never_panic(
            object_count in 0u32..4,
            body in proptest::collection::vec(any::<u8>(), 0..512)
        ) {
            let mut data = Vec::new();
            data.extend(TMD_MAGIC.to_le_bytes());
            data.extend(0u32.to_le_bytes());
            data.extend(object_count.to_le_bytes());
            data.extend(body);
            let _ = decode(&data);
            let skip = DecodeOptions::builder().object_errors(ObjectErrorPolicy::Skip).build();
            let _ = decode_with(&data, &skip);
        }
    }
}
