//! DNG emission scenarios: files are written through the public API and
//! re-parsed with a minimal test-side TIFF reader.

use mcraw::byte_order_rw::ByteOrderReader;
use mcraw::dng::{write_frame_dng, DngImage, DngWriter};
use mcraw::{ContainerMetadata, FrameMetadata, SensorArrangement};
use std::io::{Cursor, Read, Seek, SeekFrom};

#[derive(Debug, Clone, Copy)]
struct RawEntry {
    tag: u16,
    ty: u16,
    count: u32,
    value_or_offset: u32,
    inline: [u8; 4],
}

struct ParsedIfd {
    entries: Vec<RawEntry>,
    next_ifd: u32,
}

fn type_size(ty: u16) -> u32 {
    match ty {
        1 | 2 | 6 | 7 => 1,
        3 | 8 => 2,
        4 | 9 | 11 => 4,
        5 | 10 | 12 => 8,
        _ => panic!("unknown wire type {ty}"),
    }
}

fn parse_ifd(reader: &mut ByteOrderReader<Cursor<Vec<u8>>>, at: u32) -> ParsedIfd {
    reader.seek(SeekFrom::Start(u64::from(at))).unwrap();
    let count = reader.read_u16().unwrap();
    let mut entries = Vec::new();
    for _ in 0..count {
        let tag = reader.read_u16().unwrap();
        let ty = reader.read_u16().unwrap();
        let count = reader.read_u32().unwrap();
        let mut inline = [0u8; 4];
        reader.read_exact(&mut inline).unwrap();
        let value_or_offset = u32::from_le_bytes(inline);
        entries.push(RawEntry {
            tag,
            ty,
            count,
            value_or_offset,
            inline,
        });
    }
    let next_ifd = reader.read_u32().unwrap();
    ParsedIfd { entries, next_ifd }
}

fn parse_dng(bytes: Vec<u8>) -> (ByteOrderReader<Cursor<Vec<u8>>>, ParsedIfd) {
    assert_eq!(&bytes[..4], &[0x49, 0x49, 0x2A, 0x00], "little-endian TIFF magic");
    let mut reader = ByteOrderReader::new(Cursor::new(bytes), true);
    reader.seek(SeekFrom::Start(4)).unwrap();
    let first_ifd = reader.read_u32().unwrap();
    let ifd = parse_ifd(&mut reader, first_ifd);
    (reader, ifd)
}

impl ParsedIfd {
    fn find(&self, tag: u16) -> Option<RawEntry> {
        self.entries.iter().copied().find(|e| e.tag == tag)
    }
}

/// Integer values of an entry, following the offset when out of line.
fn int_values(reader: &mut ByteOrderReader<Cursor<Vec<u8>>>, entry: RawEntry) -> Vec<u64> {
    let total = entry.count * type_size(entry.ty);
    let mut read_one = |reader: &mut ByteOrderReader<Cursor<Vec<u8>>>| match entry.ty {
        1 | 7 => u64::from(reader.read_u8().unwrap()),
        3 => u64::from(reader.read_u16().unwrap()),
        4 => u64::from(reader.read_u32().unwrap()),
        _ => panic!("not an integer type {}", entry.ty),
    };

    if total <= 4 {
        let mut reader = ByteOrderReader::new(Cursor::new(entry.inline.to_vec()), true);
        (0..entry.count).map(|_| read_one(&mut reader)).collect()
    } else {
        reader
            .seek(SeekFrom::Start(u64::from(entry.value_or_offset)))
            .unwrap();
        (0..entry.count).map(|_| read_one(reader)).collect()
    }
}

fn rational_values(
    reader: &mut ByteOrderReader<Cursor<Vec<u8>>>,
    entry: RawEntry,
) -> Vec<(i64, i64)> {
    assert!(entry.ty == 5 || entry.ty == 10);
    reader
        .seek(SeekFrom::Start(u64::from(entry.value_or_offset)))
        .unwrap();
    (0..entry.count)
        .map(|_| {
            if entry.ty == 5 {
                let n = reader.read_u32().unwrap();
                let d = reader.read_u32().unwrap();
                (i64::from(n), i64::from(d))
            } else {
                let n = reader.read_i32().unwrap();
                let d = reader.read_i32().unwrap();
                (i64::from(n), i64::from(d))
            }
        })
        .collect()
}

fn container() -> ContainerMetadata {
    ContainerMetadata {
        black_level: vec![0.0; 4],
        white_level: 1023.0,
        sensor_arrangement: SensorArrangement::Bggr,
        color_matrix1: identity(),
        color_matrix2: identity(),
        forward_matrix1: identity(),
        forward_matrix2: identity(),
        software: Some("MotionCam".to_string()),
        orientation: None,
        model: None,
        extra_data: None,
    }
}

fn frame() -> FrameMetadata {
    FrameMetadata {
        width: 64,
        height: 4,
        compression_type: 7,
        as_shot_neutral: [1.0, 1.0, 1.0],
        orientation: None,
        iso: None,
        exposure_time: None,
    }
}

fn identity() -> Vec<f32> {
    vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
}

fn emit() -> Vec<u8> {
    let pixels = vec![0u16; 64 * 4];
    let mut out = Cursor::new(Vec::new());
    write_frame_dng(&mut out, &pixels, &frame(), &container()).unwrap();
    out.into_inner()
}

#[test]
fn emitted_tags_parse_back() {
    let (mut reader, ifd) = parse_dng(emit());

    assert_eq!(ifd.next_ifd, 0);

    let bits = ifd.find(258).expect("BitsPerSample");
    assert_eq!(int_values(&mut reader, bits), vec![16]);

    let cfa = ifd.find(33422).expect("CFAPattern");
    assert_eq!(cfa.count, 4);
    assert_eq!(int_values(&mut reader, cfa), vec![2, 1, 1, 0]);

    let strip_counts = ifd.find(279).expect("StripByteCounts");
    assert_eq!(int_values(&mut reader, strip_counts), vec![512]);

    let active_area = ifd.find(50829).expect("ActiveArea");
    assert_eq!(int_values(&mut reader, active_area), vec![0, 0, 4, 64]);

    let white = ifd.find(50717).expect("WhiteLevel");
    assert_eq!(int_values(&mut reader, white), vec![1023]);

    let black = ifd.find(50714).expect("BlackLevel");
    assert_eq!(int_values(&mut reader, black), vec![0, 0, 0, 0]);

    assert_eq!(
        int_values(&mut reader, ifd.find(262).expect("Photometric")),
        vec![32803]
    );
    assert_eq!(
        int_values(&mut reader, ifd.find(259).expect("Compression")),
        vec![1]
    );
    assert_eq!(
        int_values(&mut reader, ifd.find(277).expect("SamplesPerPixel")),
        vec![1]
    );
    assert_eq!(
        int_values(&mut reader, ifd.find(50778).expect("CalibrationIlluminant1")),
        vec![21]
    );
    assert_eq!(
        int_values(&mut reader, ifd.find(50779).expect("CalibrationIlluminant2")),
        vec![17]
    );
}

#[test]
fn ifd_entries_are_strictly_increasing() {
    let (_, ifd) = parse_dng(emit());
    assert!(!ifd.entries.is_empty());
    for pair in ifd.entries.windows(2) {
        assert!(
            pair[0].tag < pair[1].tag,
            "tags {} and {} out of order",
            pair[0].tag,
            pair[1].tag
        );
    }
}

#[test]
fn strip_data_is_reachable_and_zeroed() {
    let (mut reader, ifd) = parse_dng(emit());

    let offsets = ifd.find(273).expect("StripOffsets");
    assert_eq!(offsets.ty, 4);
    let at = int_values(&mut reader, offsets)[0];

    reader.seek(SeekFrom::Start(at)).unwrap();
    let mut strip = vec![0u8; 512];
    reader.read_exact(&mut strip).unwrap();
    assert!(strip.iter().all(|&b| b == 0));
}

#[test]
fn rational_tags_hold_exact_values() {
    let (mut reader, ifd) = parse_dng(emit());

    let neutral = ifd.find(50728).expect("AsShotNeutral");
    assert_eq!(neutral.ty, 5);
    assert_eq!(
        rational_values(&mut reader, neutral),
        vec![(1, 1), (1, 1), (1, 1)]
    );

    let matrix = ifd.find(50721).expect("ColorMatrix1");
    assert_eq!(matrix.ty, 10);
    let values = rational_values(&mut reader, matrix);
    assert_eq!(values.len(), 9);
    for (i, &(n, d)) in values.iter().enumerate() {
        let expected = if i % 4 == 0 { 1 } else { 0 };
        assert_eq!(n, expected, "numerator {i}");
        assert_eq!(d, 1, "denominator {i}");
    }
}

#[test]
fn emission_is_deterministic() {
    assert_eq!(emit(), emit());
}

#[test]
fn big_endian_files_carry_the_mm_magic() {
    let mut image = DngImage::new(false);
    image.set_image_width(2);
    image.set_image_length(2);
    image.set_samples_per_pixel(1).unwrap();
    image.set_bits_per_sample(&[16]).unwrap();
    image.set_rows_per_strip(2).unwrap();
    image.set_image_data(&[1, 2, 3, 4]).unwrap();

    let mut out = Cursor::new(Vec::new());
    DngWriter::write_dng(&mut out, false, vec![image]).unwrap();
    let bytes = out.into_inner();
    assert_eq!(&bytes[..4], &[0x4D, 0x4D, 0x00, 0x2A]);
}

#[test]
fn endianness_mismatch_is_rejected() {
    let mut image = DngImage::new(true);
    image.set_image_width(2);
    image.set_image_length(2);
    image.set_samples_per_pixel(1).unwrap();
    image.set_bits_per_sample(&[16]).unwrap();
    image.set_image_data(&[1, 2]).unwrap();

    let mut out = Cursor::new(Vec::new());
    assert!(DngWriter::write_dng(&mut out, false, vec![image]).is_err());
}

#[test]
fn multiple_images_chain_their_ifds() {
    let make = || {
        let mut image = DngImage::new(true);
        image.set_image_width(2);
        image.set_image_length(2);
        image.set_samples_per_pixel(1).unwrap();
        image.set_bits_per_sample(&[16]).unwrap();
        image.set_rows_per_strip(2).unwrap();
        image.set_image_data(&[9, 9, 9, 9]).unwrap();
        image
    };

    let mut out = Cursor::new(Vec::new());
    DngWriter::write_dng(&mut out, true, vec![make(), make()]).unwrap();
    let bytes = out.into_inner();

    let mut reader = ByteOrderReader::new(Cursor::new(bytes), true);
    reader.seek(SeekFrom::Start(4)).unwrap();
    let first = reader.read_u32().unwrap();
    let first_ifd = parse_ifd(&mut reader, first);
    assert_ne!(first_ifd.next_ifd, 0);

    let second_ifd = parse_ifd(&mut reader, first_ifd.next_ifd);
    assert_eq!(second_ifd.next_ifd, 0);
    assert_eq!(first_ifd.entries.len(), second_ifd.entries.len());
}
