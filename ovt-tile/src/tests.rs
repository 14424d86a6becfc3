use bytes::Bytes;
use ovt_column::{ColumnCacheReader, ColumnKind};
use ovt_error::OvtError;
use ovt_geometry::{BBox, BBox3D, BoundingBox, Line, Point, Point3D};
use ovt_shape::{PrimitiveShape, Properties, Shape, Value};
use ovt_wire::{WireReader, WireWriter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

use crate::{
    Extent, FeatureType, OvtTile, VectorFeature, VectorGeometry, VectorLayer, VectorTile,
    WriteOptions, decode, encode,
};

fn props(pairs: &[(&str, Value)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn points(coords: &[(i32, i32)]) -> Vec<Point> {
    coords.iter().copied().map(Point::from).collect()
}

fn points_3d(coords: &[(i32, i32, i32)]) -> Vec<Point3D> {
    coords.iter().copied().map(Point3D::from).collect()
}

fn root_cause(err: &OvtError) -> &OvtError {
    match err {
        OvtError::Context(_, source) => root_cause(source),
        other => other,
    }
}

/// The column cache of an encoded tile.
fn columns(bytes: &Bytes) -> ColumnCacheReader {
    let mut reader = WireReader::new(bytes.clone());
    let mut body = None;
    reader
        .read_fields(bytes.len(), |field, _, r| {
            if field == 5 {
                body = Some(r.read_bytes()?);
            }
            Ok(())
        })
        .unwrap();
    ColumnCacheReader::new(body.unwrap()).unwrap()
}

fn geometries() -> Vec<VectorGeometry> {
    vec![
        VectorGeometry::Points(points(&[(1, 2), (3, 4), (-5, 4096)])),
        VectorGeometry::Lines(vec![
            Line::new(points(&[(0, 0), (10, 10), (20, 0)])),
            Line::new(points(&[(100, 100), (50, 150)])).with_offset(1.5),
        ]),
        VectorGeometry::polygons(vec![
            vec![
                Line::new(points(&[(0, 0), (4096, 0), (4096, 4096), (0, 4096), (0, 0)])),
                Line::new(points(&[(10, 10), (10, 20), (20, 20), (10, 10)])),
            ],
            vec![Line::new(points(&[(5000, 5000), (5100, 5000), (5000, 5100), (5000, 5000)]))],
        ])
        .with_indices(vec![0, 1, 2, 2, 3, 0])
        .with_flat_tessellation(&[2048, 2048, 1024, 3000])
        .unwrap(),
        VectorGeometry::Points3D(points_3d(&[(1, 2, 3), (-1, -2, -3)])),
        VectorGeometry::Lines3D(vec![Line::new(points_3d(&[(0, 0, 0), (1, 1, 100)]))]),
        VectorGeometry::polygons_3d(vec![vec![Line::new(points_3d(&[
            (0, 0, 5),
            (10, 0, 5),
            (10, 10, 6),
            (0, 0, 5),
        ]))]])
        .with_flat_tessellation(&[5, 5, 5])
        .unwrap(),
    ]
}

#[rstest]
#[case(FeatureType::Points)]
#[case(FeatureType::Lines)]
#[case(FeatureType::Polygons)]
#[case(FeatureType::Points3D)]
#[case(FeatureType::Lines3D)]
#[case(FeatureType::Polygons3D)]
fn roundtrip_each_feature_type(#[case] feature_type: FeatureType) {
    let geometry = geometries()
        .into_iter()
        .find(|g| g.feature_type() == feature_type)
        .unwrap();
    let feature = VectorFeature::new(geometry)
        .with_id(7)
        .with_properties(props(&[
            ("name", Value::from("park")),
            ("rank", Value::U64(3)),
            ("delta", Value::I64(-12)),
            ("area", Value::F64(12.75)),
            ("open", Value::Bool(true)),
        ]));
    let tile = VectorTile::new()
        .with_layer(VectorLayer::new("layer", Extent::E4096).with_feature(feature.clone()));

    let decoded = decode(encode(&tile).unwrap()).unwrap();
    let layer = decoded.layer("layer").unwrap().unwrap();
    let ovt_feature = layer.feature(0).unwrap();
    assert_eq!(ovt_feature.feature_type(), feature_type);
    assert_eq!(ovt_feature.id(), Some(7));
    assert_eq!(ovt_feature.to_vector_feature().unwrap(), feature);
}

#[test]
fn roundtrip_whole_tile() {
    let shape = Shape::new()
        .with_field("class", PrimitiveShape::String)
        .with_field("height", PrimitiveShape::F32);
    let mut buildings = VectorLayer::new("building", Extent::E8192).with_shape(shape.clone());
    for (i, geometry) in geometries().into_iter().enumerate() {
        buildings = buildings.with_feature(
            VectorFeature::new(geometry)
                .with_id(i as u64)
                .with_properties(props(&[
                    ("class", Value::from(if i % 2 == 0 { "house" } else { "shed" })),
                    ("height", Value::F32(i as f32 * 2.5)),
                ])),
        );
    }
    let water = VectorLayer::new("water", Extent::E512)
        .with_shape(Shape::new().with_field("kind", PrimitiveShape::String))
        .with_feature(
        VectorFeature::new(VectorGeometry::Points(points(&[(0, 0)])))
            .with_properties(props(&[("kind", Value::from("lake"))])),
    );
    let tile = VectorTile::new().with_layer(buildings).with_layer(water);

    let decoded = OvtTile::decode(encode(&tile).unwrap()).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.layer_names().collect::<Vec<_>>(), vec!["building", "water"]);
    let building = decoded.layer("building").unwrap().unwrap();
    assert_eq!(building.extent(), Extent::E8192);
    assert_eq!(building.version(), 1);
    assert_eq!(building.shape(), &shape);
    assert!(building.m_shape().is_none());
    assert_eq!(decoded.to_vector_tile().unwrap(), tile);
}

#[test]
fn single_point_is_inlined() {
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("poi", Extent::E4096)
            .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(12, 34)]))))
            .with_feature(VectorFeature::new(VectorGeometry::Points3D(points_3d(&[(1, 2, 3)])))),
    );
    let bytes = encode(&tile).unwrap();
    let cache = columns(&bytes);
    assert_eq!(cache.len(ColumnKind::Points), 0);
    assert_eq!(cache.len(ColumnKind::Points3D), 0);

    let decoded = decode(bytes).unwrap();
    let layer = decoded.layer("poi").unwrap().unwrap();
    assert_eq!(layer.feature(0).unwrap().load_points().unwrap(), &[Point::new(12, 34)]);
    assert_eq!(
        layer.feature(1).unwrap().load_points_3d().unwrap(),
        &[Point3D::new(1, 2, 3)]
    );
}

#[test]
fn repeated_geometry_is_stored_once() {
    let line = VectorGeometry::Lines(vec![Line::new(points(&[(0, 0), (5, 5)]))]);
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("roads", Extent::E4096)
            .with_feature(VectorFeature::new(line.clone()))
            .with_feature(VectorFeature::new(line)),
    );
    let cache = columns(&encode(&tile).unwrap());
    assert_eq!(cache.len(ColumnKind::Points), 1);
}

#[test]
fn feature_index_out_of_bounds() {
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("poi", Extent::E4096)
            .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(1, 1)]))))
            .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(2, 2)])))),
    );
    let decoded = decode(encode(&tile).unwrap()).unwrap();
    let layer = decoded.layer("poi").unwrap().unwrap();
    assert_eq!(layer.len(), 2);
    assert!(matches!(
        layer.feature(2),
        Err(OvtError::FeatureIndexOutOfBounds(2, 2, _))
    ));
    assert!(matches!(
        layer.feature(usize::MAX),
        Err(OvtError::FeatureIndexOutOfBounds(usize::MAX, 2, _))
    ));
    assert_eq!(layer.feature(1).unwrap().load_points().unwrap(), &[Point::new(2, 2)]);
}

#[test]
fn features_are_memoized() {
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("roads", Extent::E4096).with_feature(VectorFeature::new(
            VectorGeometry::Lines(vec![Line::new(points(&[(0, 0), (5, 5)]))]),
        )),
    );
    let decoded = decode(encode(&tile).unwrap()).unwrap();
    let layer = decoded.layer("roads").unwrap().unwrap();
    let first = layer.feature(0).unwrap();
    let second = layer.feature(0).unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(
        first.load_lines().unwrap(),
        second.load_lines().unwrap()
    ));
    assert!(matches!(
        first.load_points(),
        Err(OvtError::MismatchedTypes(..))
    ));
}

#[test]
fn bbox_within_quantization_error() {
    let bbox_2d = BBox::new(13.402, 52.541, 13.405, 52.545);
    let bbox_3d = BBox3D::new(-122.42, 37.77, -122.41, 37.78, 2.5, 310.0);
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("boxes", Extent::E4096)
            .with_feature(
                VectorFeature::new(VectorGeometry::Points(points(&[(1, 1)]))).with_bbox(bbox_2d),
            )
            .with_feature(
                VectorFeature::new(VectorGeometry::Points3D(points_3d(&[(1, 1, 1)])))
                    .with_bbox(bbox_3d),
            ),
    );
    let decoded = decode(encode(&tile).unwrap()).unwrap();
    let layer = decoded.layer("boxes").unwrap().unwrap();

    let Some(BoundingBox::BBox(back)) = layer.feature(0).unwrap().bbox().unwrap() else {
        panic!("expected a 2D bbox");
    };
    for (a, b) in [
        (back.left, bbox_2d.left),
        (back.bottom, bbox_2d.bottom),
        (back.right, bbox_2d.right),
        (back.top, bbox_2d.top),
    ] {
        assert!((a - b).abs() <= 1.1e-5, "{a} != {b}");
    }

    let Some(BoundingBox::BBox3D(back)) = layer.feature(1).unwrap().bbox().unwrap() else {
        panic!("expected a 3D bbox");
    };
    assert!((back.left - bbox_3d.left).abs() <= 1.1e-5);
    assert_eq!(back.near, 2.5);
    assert_eq!(back.far, 310.0);
}

#[test]
fn offsets_keep_three_decimals() {
    let tile = VectorTile::new().with_layer(VectorLayer::new("dashes", Extent::E4096).with_feature(
        VectorFeature::new(VectorGeometry::Lines(vec![
            Line::new(points(&[(0, 0), (1, 1)])).with_offset(0.123_45),
            Line::new(points(&[(2, 2), (3, 3)])),
        ])),
    ));
    let decoded = decode(encode(&tile).unwrap()).unwrap();
    let feature = decoded.layer("dashes").unwrap().unwrap().feature(0).unwrap();
    let lines = feature.load_lines().unwrap();
    assert!((lines[0].offset - 0.123_45).abs() < 1e-3);
    assert_eq!(lines[1].offset, 0.0);
}

#[test]
fn m_values_roundtrip() {
    let m_values = (0..3)
        .map(|i| props(&[("distance", Value::F64(f64::from(i) * 10.0))]))
        .collect::<Vec<_>>();
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("routes", Extent::E4096)
            .with_feature(
                VectorFeature::new(VectorGeometry::Lines(vec![Line::new(points(&[
                    (0, 0),
                    (1, 0),
                    (2, 0),
                ]))]))
                .with_m_values(m_values.clone()),
            )
            .with_feature(
                VectorFeature::new(VectorGeometry::Points(points(&[(4, 4)])))
                    .with_m_values(vec![props(&[("distance", Value::F64(1.0))])]),
            ),
    );
    let bytes = encode(&tile).unwrap();
    // A single point with M-values cannot be inlined.
    assert_eq!(columns(&bytes).len(ColumnKind::Points), 2);

    let decoded = decode(bytes).unwrap();
    let layer = decoded.layer("routes").unwrap().unwrap();
    assert_eq!(
        layer.m_shape(),
        Some(&Shape::new().with_field("distance", PrimitiveShape::F64))
    );
    let feature = layer.feature(1).unwrap();
    assert_eq!(feature.feature_type(), FeatureType::Lines);
    assert!(feature.has_m_values());
    assert_eq!(feature.m_values().unwrap(), Some(m_values.as_slice()));
    assert!(layer.feature(0).unwrap().has_m_values());
}

#[test]
fn m_value_count_must_match_vertices() {
    let tile = VectorTile::new().with_layer(VectorLayer::new("routes", Extent::E4096).with_feature(
        VectorFeature::new(VectorGeometry::Lines(vec![Line::new(points(&[(0, 0), (1, 0)]))]))
            .with_m_values(vec![Properties::new()]),
    ));
    let err = encode(&tile).unwrap_err();
    assert!(matches!(root_cause(&err), OvtError::InvalidArgument(..)));
}

#[test]
fn features_sorted_by_type() {
    let layer = VectorLayer::new("mixed", Extent::E4096)
        .with_feature(
            VectorFeature::new(VectorGeometry::Lines(vec![Line::new(points(&[(0, 0), (1, 1)]))]))
                .with_id(1),
        )
        .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(0, 0)]))).with_id(2))
        .with_feature(
            VectorFeature::new(VectorGeometry::polygons(vec![vec![Line::new(points(&[
                (0, 0),
                (1, 0),
                (0, 1),
                (0, 0),
            ]))]]))
            .with_id(3),
        )
        .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(5, 5)]))).with_id(4));
    let tile = VectorTile::new().with_layer(layer);

    let ids = |bytes: Bytes| {
        let decoded = decode(bytes).unwrap();
        decoded
            .layer("mixed")
            .unwrap()
            .unwrap()
            .features()
            .map(|f| f.unwrap().id().unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(encode(&tile).unwrap()), vec![2, 4, 1, 3]);
    let unsorted = WriteOptions::default().with_sort_features_by_type(false);
    assert_eq!(ids(unsorted.write(&tile).unwrap()), vec![1, 2, 3, 4]);
}

#[test]
fn missing_shape_without_inference() {
    let tile = VectorTile::new().with_layer(VectorLayer::new("empty", Extent::E4096));
    let options = WriteOptions::default().with_infer_shapes(false);
    let err = options.write(&tile).unwrap_err();
    assert!(matches!(root_cause(&err), OvtError::InvalidArgument(..)));

    let tile = VectorTile::new().with_layer(VectorLayer::new("empty", Extent::E4096).with_shape(Shape::new()));
    assert!(options.write(&tile).is_ok());
}

#[test]
fn empty_tile() {
    let bytes = encode(&VectorTile::new()).unwrap();
    // field 5, length-delimited, empty body
    assert_eq!(bytes.as_ref(), &[0x2A, 0x00]);
    let decoded = decode(bytes).unwrap();
    assert!(decoded.is_empty());
    assert!(decoded.layer("any").unwrap().is_none());
}

#[test]
fn tile_without_columns_and_unknown_fields() {
    let mut writer = WireWriter::new();
    writer.write_varint_field(9, 77);
    writer.write_string_field(12, "ignored");
    let decoded = decode(writer.finish()).unwrap();
    assert!(decoded.is_empty());
}

#[test]
fn layer_without_shape_is_rejected() {
    let mut columns = WireWriter::new();
    columns.write_string_field(ColumnKind::String.field(), "nameless");
    let mut writer = WireWriter::new();
    writer
        .write_message(4, |w| {
            w.write_varint_field(1, 1);
            w.write_varint_field(2, 0);
            w.write_varint_field(3, 3);
            Ok(())
        })
        .unwrap();
    writer.write_bytes_field(5, columns.as_slice());
    let decoded = decode(writer.finish()).unwrap();
    assert_eq!(decoded.layer_names().collect::<Vec<_>>(), vec!["nameless"]);
    let err = decoded.layer("nameless").err().unwrap();
    assert!(matches!(root_cause(&err), OvtError::InvalidSerde(..)));
}

#[test]
fn layer_without_name_is_rejected() {
    let mut writer = WireWriter::new();
    writer
        .write_message(4, |w| {
            w.write_varint_field(1, 1);
            Ok(())
        })
        .unwrap();
    let err = decode(writer.finish()).err().unwrap();
    assert!(matches!(root_cause(&err), OvtError::InvalidSerde(..)));
}

/// A tile whose first layer, "bad", carries an out-of-range extent code and whose second layer,
/// "good", is intact.
fn tile_with_broken_layer() -> Bytes {
    let tile = VectorTile::new()
        .with_layer(VectorLayer::new("bad", Extent::E4096).with_shape(Shape::new()))
        .with_layer(
            VectorLayer::new("good", Extent::E1024)
                .with_shape(Shape::new())
                .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(3, 4)])))),
        );
    let bytes = encode(&tile).unwrap();
    let mut writer = WireWriter::new();
    writer
        .write_message(4, |w| {
            w.write_varint_field(2, 0);
            w.write_varint_field(3, 6);
            w.write_varint_field(5, 0);
            Ok(())
        })
        .unwrap();
    // Keep everything after the original "bad" layer.
    let mut reader = WireReader::new(bytes.clone());
    reader.read_tag().unwrap();
    reader.skip(ovt_wire::WireType::LengthDelimited).unwrap();
    writer.write_raw_bytes(&bytes[reader.position()..]);
    writer.finish()
}

#[test]
fn invalid_extent_code_is_rejected() {
    let decoded = decode(tile_with_broken_layer()).unwrap();
    let err = decoded.layer("bad").err().unwrap();
    assert!(matches!(root_cause(&err), OvtError::InvalidExtent(6, _)));
    assert!(decoded.to_vector_tile().is_err());
}

#[test]
fn layers_are_decoded_on_access() {
    let decoded = decode(tile_with_broken_layer()).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.layer_names().collect::<Vec<_>>(), vec!["bad", "good"]);

    let good = decoded.layer("good").unwrap().unwrap();
    assert_eq!(good.extent(), Extent::E1024);
    assert_eq!(good.feature(0).unwrap().load_points().unwrap(), &[Point::new(3, 4)]);
    assert!(std::ptr::eq(good, decoded.layer_at(1).unwrap()));
    assert!(matches!(
        decoded.layer_at(2),
        Err(OvtError::OutOfBounds(2, 0, 2, _))
    ));
    assert!(decoded.layer_at(0).is_err());
    // A failed layer does not poison the others.
    assert!(decoded.layer("good").unwrap().is_some());
}

/// An encoded single-point layer and the offset of its only feature blob.
fn single_point_blob() -> (Vec<u8>, usize) {
    let tile = VectorTile::new().with_layer(
        VectorLayer::new("l", Extent::E4096)
            .with_shape(Shape::new())
            .with_feature(VectorFeature::new(VectorGeometry::Points(points(&[(1, 1)])))),
    );
    let bytes = encode(&tile).unwrap();
    // The feature blob is the last field of the layer: [type, flags, props, point].
    let blob_start = bytes
        .windows(2)
        .position(|w| w == [0x22, 0x04])
        .unwrap()
        + 2;
    (bytes.to_vec(), blob_start)
}

#[test]
fn unknown_feature_type_is_reported_on_access() {
    let (mut corrupt, blob_start) = single_point_blob();
    assert_eq!(corrupt[blob_start], 1);
    corrupt[blob_start] = 7;

    let decoded = decode(corrupt).unwrap();
    let layer = decoded.layer("l").unwrap().unwrap();
    let err = layer.feature(0).err().unwrap();
    assert!(matches!(root_cause(&err), OvtError::UnknownFeatureType(7, _)));
}

#[test]
fn unknown_flag_bit_is_rejected() {
    let (mut corrupt, blob_start) = single_point_blob();
    assert_eq!(corrupt[blob_start + 1], 0x40);
    corrupt[blob_start + 1] |= 0x80;

    let decoded = decode(corrupt).unwrap();
    let err = decoded.layer("l").unwrap().unwrap().feature(0).err().unwrap();
    assert!(matches!(root_cause(&err), OvtError::InvalidSerde(..)));
}

#[test]
fn malformed_tessellation() {
    let polygon = VectorGeometry::polygons(vec![]);
    assert!(matches!(
        polygon.clone().with_flat_tessellation(&[1, 2, 3]),
        Err(OvtError::MalformedTessellation(3, _))
    ));
    assert!(matches!(
        VectorGeometry::polygons_3d(vec![]).with_flat_tessellation(&[1, 2]),
        Err(OvtError::MalformedTessellation(2, _))
    ));
    let VectorGeometry::Polygons { tessellation, .. } =
        polygon.with_flat_tessellation(&[1, 2, 3, 4]).unwrap()
    else {
        unreachable!()
    };
    assert_eq!(tessellation, points(&[(1, 2), (3, 4)]));
}

#[test]
fn random_lines_roundtrip() {
    let mut rng = StdRng::seed_from_u64(1234);
    let mut layer = VectorLayer::new("random", Extent::E16384)
        .with_shape(Shape::new().with_field("rank", PrimitiveShape::U64));
    for id in 0..50 {
        let lines = (0..rng.random_range(1..4))
            .map(|_| {
                let mut x = rng.random_range(0..16384);
                let mut y = rng.random_range(0..16384);
                let points = (0..rng.random_range(2..40))
                    .map(|_| {
                        x += rng.random_range(-64..64);
                        y += rng.random_range(-64..64);
                        Point::new(x, y)
                    })
                    .collect();
                Line::new(points)
            })
            .collect();
        layer = layer.with_feature(
            VectorFeature::new(VectorGeometry::Lines(lines))
                .with_id(id)
                .with_properties(props(&[("rank", Value::U64(rng.random_range(0..5)))])),
        );
    }
    let tile = VectorTile::new().with_layer(layer);
    let decoded = decode(encode(&tile).unwrap()).unwrap();
    assert_eq!(decoded.to_vector_tile().unwrap(), tile);
}
