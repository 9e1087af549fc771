use crate::Reconstruction;
use ply_rs::{
    ply::{Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::io::{self, Write};

const TRAJECTORY_COLOR: [u8; 3] = [255, 0, 0];

fn to_u8(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Writes the point cloud and the camera trajectory as an ASCII PLY file.
///
/// Points come first as `vertex` elements with their colors, followed by one red vertex per
/// trajectory entry. Consecutive trajectory vertices are joined by `edge` elements.
pub fn export_ply(mut writer: impl Write, reconstruction: &Reconstruction) -> io::Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header
        .comments
        .push("Two-view reconstruction with camera trajectory".to_string());

    let mut point_element = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z"] {
        let p = PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Double));
        point_element.properties.add(p);
    }
    for name in ["red", "green", "blue"] {
        let p = PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::UChar));
        point_element.properties.add(p);
    }
    ply.header.elements.add(point_element);

    let mut edge_element = ElementDef::new("edge".to_string());
    for name in ["vertex1", "vertex2"] {
        let p = PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Int));
        edge_element.properties.add(p);
    }
    ply.header.elements.add(edge_element);

    let mut vertices: Vec<DefaultElement> = vec![];
    let mut add_vertex = |[x, y, z]: [f64; 3], [r, g, b]: [u8; 3]| {
        let mut point = DefaultElement::new();
        point.insert("x".to_string(), Property::Double(x));
        point.insert("y".to_string(), Property::Double(y));
        point.insert("z".to_string(), Property::Double(z));
        point.insert("red".to_string(), Property::UChar(r));
        point.insert("green".to_string(), Property::UChar(g));
        point.insert("blue".to_string(), Property::UChar(b));
        vertices.push(point);
    };

    for (p, c) in reconstruction.points.iter().zip(&reconstruction.colors) {
        add_vertex([p.x, p.y, p.z], c.map(to_u8));
    }
    for t in &reconstruction.trajectory {
        add_vertex([t.x, t.y, t.z], TRAJECTORY_COLOR);
    }

    let first_camera = reconstruction.points.len() as i32;
    let edges: Vec<DefaultElement> = (1..reconstruction.trajectory.len() as i32)
        .map(|ix| {
            let mut edge = DefaultElement::new();
            edge.insert("vertex1".to_string(), Property::Int(first_camera + ix - 1));
            edge.insert("vertex2".to_string(), Property::Int(first_camera + ix));
            edge
        })
        .collect();

    ply.payload.insert("vertex".to_string(), vertices);
    ply.payload.insert("edge".to_string(), edges);

    Writer::new().write_ply(&mut writer, &mut ply)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ply_rs::parser::Parser;
    use sfm_core::nalgebra::{Point3, Vector3};

    #[test]
    fn exports_points_trajectory_and_edges() {
        let reconstruction = Reconstruction {
            points: vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.5, 8.0)],
            colors: vec![[1.0, 0.0, 0.5], [0.2, 0.4, 0.6]],
            trajectory: vec![
                Vector3::new(-1.0, 0.0, 0.0),
                Vector3::new(-0.9, 0.1, 0.0),
                Vector3::new(-1.0, 0.0, 0.1),
            ],
        };
        let mut buffer = vec![];
        export_ply(&mut buffer, &reconstruction).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        let header: Vec<&str> = text.lines().map(str::trim_end).collect();
        assert_eq!(header[0], "ply");
        assert_eq!(header[1], "format ascii 1.0");
        assert!(header.contains(&"element vertex 5"));
        assert!(header.contains(&"element edge 2"));

        let ply = Parser::<DefaultElement>::new()
            .read_ply(&mut buffer.as_slice())
            .unwrap();
        let vertices = &ply.payload["vertex"];
        assert_eq!(vertices.len(), 5);
        assert_eq!(vertices[0]["z"], Property::Double(3.0));
        assert_eq!(vertices[0]["blue"], Property::UChar(128));
        assert_eq!(vertices[1]["green"], Property::UChar(102));
        assert_eq!(vertices[3]["x"], Property::Double(-0.9));
        assert_eq!(vertices[4]["red"], Property::UChar(255));
        assert_eq!(vertices[4]["green"], Property::UChar(0));

        let edges = &ply.payload["edge"];
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0]["vertex1"], Property::Int(2));
        assert_eq!(edges[0]["vertex2"], Property::Int(3));
        assert_eq!(edges[1]["vertex1"], Property::Int(3));
        assert_eq!(edges[1]["vertex2"], Property::Int(4));
    }

    #[test]
    fn empty_reconstruction_has_no_edges() {
        let mut buffer = vec![];
        export_ply(&mut buffer, &Reconstruction::new()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let header: Vec<&str> = text.lines().map(str::trim_end).collect();
        assert!(header.contains(&"element vertex 0"));
        assert!(header.contains(&"element edge 0"));
    }
}
