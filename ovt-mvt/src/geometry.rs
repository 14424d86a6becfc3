use ovt_error::{OvtResult, ovt_bail};
use ovt_geometry::{Line, Point, Polygon};
use ovt_zigzag::zigzag_decode_i32;

const MOVE_TO: u32 = 1;
const LINE_TO: u32 = 2;
const CLOSE_PATH: u32 = 7;

/// Decode a legacy command stream into paths.
///
/// Each command integer holds the opcode in its low three bits and a repeat count above them.
/// Move-to and line-to are followed by `count` zigzagged `dx, dy` pairs relative to the cursor,
/// which carries over between commands. Every move-to starts a new path and close-path repeats
/// the first point of the current path.
pub fn decode_commands(commands: &[u32]) -> OvtResult<Vec<Vec<Point>>> {
    let mut paths: Vec<Vec<Point>> = Vec::new();
    let mut cursor = Point::default();
    let mut i = 0;
    while i < commands.len() {
        let command = commands[i];
        let (op, count) = (command & 0x7, (command >> 3) as usize);
        i += 1;
        match op {
            MOVE_TO | LINE_TO => {
                let params = count * 2;
                let Some(deltas) = commands.get(i..i + params) else {
                    ovt_bail!(
                        InvalidSerde: "command {} at {} needs {} parameters, {} remain",
                        op,
                        i - 1,
                        params,
                        commands.len() - i
                    )
                };
                i += params;
                if op == MOVE_TO {
                    paths.push(Vec::with_capacity(count));
                }
                let Some(path) = paths.last_mut() else {
                    ovt_bail!(InvalidSerde: "line-to at {} before any move-to", i - params - 1)
                };
                for delta in deltas.chunks_exact(2) {
                    cursor = Point::new(
                        cursor.x.wrapping_add(zigzag_decode_i32(delta[0])),
                        cursor.y.wrapping_add(zigzag_decode_i32(delta[1])),
                    );
                    path.push(cursor);
                }
            }
            CLOSE_PATH => {
                let Some(path) = paths.last_mut() else {
                    ovt_bail!(InvalidSerde: "close-path at {} before any move-to", i - 1)
                };
                if let Some(&first) = path.first() {
                    path.push(first);
                }
            }
            _ => ovt_bail!(InvalidSerde: "unknown geometry command {} at {}", op, i - 1),
        }
    }
    Ok(paths)
}

/// Twice the signed area of a ring. Positive for rings that run clockwise on screen, where y
/// points down.
pub fn signed_area(ring: &[Point]) -> i64 {
    let Some(&last) = ring.last() else {
        return 0;
    };
    let mut prev = last;
    let mut area = 0i64;
    for &p in ring {
        area += i64::from(prev.x) * i64::from(p.y) - i64::from(p.x) * i64::from(prev.y);
        prev = p;
    }
    area
}

/// Group rings into polygons by winding.
///
/// A ring with positive area opens a new polygon and a ring with negative area is a hole of the
/// polygon before it. Zero-area rings are kept on the current polygon. The first ring always
/// opens a polygon whatever its winding. Self-intersecting rings go by their net area.
pub fn classify_rings(rings: Vec<Vec<Point>>) -> Vec<Polygon<Point>> {
    let mut polygons: Vec<Polygon<Point>> = Vec::new();
    for ring in rings {
        let area = signed_area(&ring);
        let line = Line::new(ring);
        match polygons.last_mut() {
            Some(polygon) if area <= 0 => polygon.push(line),
            _ => polygons.push(vec![line]),
        }
    }
    polygons
}

#[cfg(test)]
mod tests {
    use ovt_error::OvtError;
    use ovt_zigzag::zigzag_encode_i32;
    use rstest::rstest;

    use super::*;

    fn command(op: u32, count: u32) -> u32 {
        (count << 3) | op
    }

    fn zz(v: i32) -> u32 {
        zigzag_encode_i32(v)
    }

    fn points(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    fn square(x: i32, y: i32, size: i32, clockwise: bool) -> Vec<Point> {
        let mut ring = points(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)]);
        if !clockwise {
            ring.reverse();
        }
        ring.push(ring[0]);
        ring
    }

    #[test]
    fn multi_point() {
        let stream = [command(MOVE_TO, 2), zz(5), zz(7), zz(-2), zz(3)];
        assert_eq!(
            decode_commands(&stream).unwrap(),
            vec![points(&[(5, 7), (3, 10)])]
        );
    }

    #[test]
    fn cursor_carries_between_paths() {
        let stream = [
            command(MOVE_TO, 1),
            zz(2),
            zz(2),
            command(LINE_TO, 2),
            zz(0),
            zz(8),
            zz(8),
            zz(0),
            command(MOVE_TO, 1),
            zz(-10),
            zz(-10),
            command(LINE_TO, 1),
            zz(1),
            zz(1),
        ];
        assert_eq!(
            decode_commands(&stream).unwrap(),
            vec![
                points(&[(2, 2), (2, 10), (10, 10)]),
                points(&[(0, 0), (1, 1)])
            ]
        );
    }

    #[test]
    fn close_path_repeats_first_point() {
        let stream = [
            command(MOVE_TO, 1),
            zz(3),
            zz(6),
            command(LINE_TO, 2),
            zz(5),
            zz(6),
            zz(12),
            zz(22),
            command(CLOSE_PATH, 1),
        ];
        assert_eq!(
            decode_commands(&stream).unwrap(),
            vec![points(&[(3, 6), (8, 12), (20, 34), (3, 6)])]
        );
    }

    #[rstest]
    #[case::truncated(vec![command(MOVE_TO, 2), 1, 2, 3])]
    #[case::line_to_first(vec![command(LINE_TO, 1), 1, 2])]
    #[case::close_first(vec![command(CLOSE_PATH, 1)])]
    #[case::unknown_op(vec![command(MOVE_TO, 1), 0, 0, command(4, 1)])]
    fn malformed_streams(#[case] stream: Vec<u32>) {
        assert!(matches!(
            decode_commands(&stream),
            Err(OvtError::InvalidSerde(..))
        ));
    }

    #[test]
    fn area_sign_follows_winding() {
        assert_eq!(signed_area(&square(0, 0, 10, true)), 200);
        assert_eq!(signed_area(&square(0, 0, 10, false)), -200);
        assert_eq!(signed_area(&points(&[(0, 0), (5, 5), (10, 10)])), 0);
        assert_eq!(signed_area(&[]), 0);
    }

    #[test]
    fn holes_attach_to_preceding_exterior() {
        let rings = vec![
            square(0, 0, 100, true),
            square(10, 10, 10, false),
            square(200, 200, 50, true),
            square(210, 210, 5, false),
            square(220, 220, 5, false),
        ];
        let polygons = classify_rings(rings);
        assert_eq!(
            polygons.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn degenerate_rings() {
        let flat = points(&[(0, 0), (5, 0), (10, 0), (0, 0)]);
        // A leading hole or a zero-area ring still opens a polygon.
        let polygons = classify_rings(vec![flat.clone(), square(0, 0, 10, false)]);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 2);

        let polygons = classify_rings(vec![square(0, 0, 10, true), flat]);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 2);
    }

    #[test]
    fn bowtie_uses_net_area() {
        // Two lobes of equal area and opposite winding cancel out.
        let bowtie = points(&[(0, 0), (10, 10), (10, 0), (0, 10), (0, 0)]);
        assert_eq!(signed_area(&bowtie), 0);
        let polygons = classify_rings(vec![square(0, 0, 20, true), bowtie]);
        assert_eq!(polygons.len(), 1);
    }
}
