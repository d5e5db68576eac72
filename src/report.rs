//! Human-readable dump of a [`DecodedFile`].

use std::fmt::{self, Write};

use crate::attributes::{ClutPosition, TexturePage};
use crate::tmd::{
    DecodedFile, DecodedObject, Normal, Primitive, PrimitiveClass, PrimitiveRecord, Rgb, Uv, Vertex,
};

const INDENT: &str = "    ";

struct V<'a>(Option<&'a Vertex>);

impl fmt::Display for V<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{{{}, {}, {}}}", v.x, v.y, v.z),
            None => f.write_str("<invalid>"),
        }
    }
}

struct N<'a>(Option<&'a Normal>);

impl fmt::Display for N<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{{{:.6}, {:.6}, {:.6}}}", n.x, n.y, n.z),
            None => f.write_str("<invalid>"),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB{{{:03} {:03} {:03}}}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Uv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:03} {:03}}}", self.u, self.v)
    }
}

fn write_vertices(
    out: &mut impl Write,
    object: &DecodedObject,
    indices: &[Option<u16>],
) -> fmt::Result {
    out.write_str(INDENT)?;
    out.write_str(INDENT)?;
    for (i, index) in indices.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "V{i}{}", V(object.vertex(*index)))?;
    }
    out.write_char('\n')
}

fn write_texture(
    out: &mut impl Write,
    uvs: &[Uv; 3],
    clut: &ClutPosition,
    tpage: &TexturePage,
) -> fmt::Result {
    writeln!(out, "{INDENT}{INDENT}UV0{}, UV1{}, UV2{}", uvs[0], uvs[1], uvs[2])?;
    writeln!(out, "{INDENT}{INDENT}CLUT{{{:03} {:03}}}", clut.x_block, clut.y)?;
    writeln!(out, "{INDENT}{INDENT}TPAGE = {}", tpage.page)?;
    writeln!(out, "{INDENT}{INDENT}TRANSPARENCY = {}", tpage.blend_mode())?;
    writeln!(out, "{INDENT}{INDENT}COLOR = {}", tpage.color_depth())
}

fn write_primitive(
    out: &mut impl Write,
    object: &DecodedObject,
    ordinal: usize,
    primitive: &Primitive,
) -> fmt::Result {
    let class = match primitive.class() {
        PrimitiveClass::Polygon => "Polygon",
        PrimitiveClass::Line => "Line",
    };
    writeln!(
        out,
        "{INDENT}{}. Prim {class} (flag = {}, mode = {}):",
        ordinal + 1,
        primitive.header.flag,
        primitive.header.mode
    )?;

    match &primitive.record {
        PrimitiveRecord::FlatTriangle { color, vertices } => {
            writeln!(out, "{INDENT}{INDENT}Triangle (Flat)")?;
            writeln!(out, "{INDENT}{INDENT}{color},")?;
            write_vertices(out, object, vertices)
        }
        PrimitiveRecord::GouraudTriangle { color, corners } => {
            writeln!(out, "{INDENT}{INDENT}Triangle (Gouraud)")?;
            writeln!(out, "{INDENT}{INDENT}{color},")?;
            writeln!(
                out,
                "{INDENT}{INDENT}N0{}, N1{}, N2{},",
                N(object.normal(corners[0].normal)),
                N(object.normal(corners[1].normal)),
                N(object.normal(corners[2].normal))
            )?;
            let vertices = [corners[0].vertex, corners[1].vertex, corners[2].vertex];
            write_vertices(out, object, &vertices)
        }
        PrimitiveRecord::Line { color, vertices } => {
            writeln!(out, "{INDENT}{INDENT}Line")?;
            writeln!(out, "{INDENT}{INDENT}{color},")?;
            write_vertices(out, object, vertices)
        }
        PrimitiveRecord::UnlitTriangle { color, vertices } => {
            writeln!(out, "{INDENT}{INDENT}Triangle (Flat, Non-lit)")?;
            writeln!(out, "{INDENT}{INDENT}{color},")?;
            write_vertices(out, object, vertices)
        }
        PrimitiveRecord::UnlitTexturedTriangle {
            uvs,
            clut,
            texture_page,
            color,
            vertices,
        } => {
            writeln!(out, "{INDENT}{INDENT}Triangle (Textured, Non-lit)")?;
            write_texture(out, uvs, clut, texture_page)?;
            writeln!(out, "{INDENT}{INDENT}{color},")?;
            write_vertices(out, object, vertices)
        }
        PrimitiveRecord::Unknown {
            output_len,
            input_len,
        } => writeln!(
            out,
            "{INDENT}{INDENT}Unknown (ilen = {input_len}, olen = {output_len})"
        ),
    }
}

/// Render `file` as the indented text listing.
pub fn render(file: &DecodedFile, out: &mut impl Write) -> fmt::Result {
    let layout = if file.header.uses_offsets() { "offsets" } else { "pointers" };
    writeln!(out, "! Uses offsets / pointers: {layout}")?;
    writeln!(out, "! Object count: {}", file.header.object_count)?;

    for object in &file.objects {
        writeln!(out, "\n- Object no. {}:", object.index + 1)?;
        writeln!(out, "* Scale = {:.6}", object.scale())?;
        writeln!(out, "* Vertices ({})", object.vertices.len())?;
        writeln!(out, "* Normals ({})", object.normals.len())?;
        writeln!(out, "* Primitives ({}):", object.primitives.len())?;
        for (ordinal, primitive) in object.primitives.iter().enumerate() {
            write_primitive(out, object, ordinal, primitive)?;
        }
    }

    if !file.issues.is_empty() {
        writeln!(out, "\n! Issues ({}):", file.issues.len())?;
        for issue in &file.issues {
            writeln!(out, "{INDENT}{issue}")?;
        }
    }

    Ok(())
}

pub fn render_to_string(file: &DecodedFile) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render(file, &mut out);
    out
}
