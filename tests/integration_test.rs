//! Integration tests for frame encode/decode

use ndarray::{array, Array2};
use proptest::prelude::*;
use tempfile::TempDir;

use ucm::codec::wire::WireWriter;
use ucm::codec::{self, Endian, WindowRecord, MAGIC};
use ucm::config::{ByteOrder, Config};
use ucm::{Ccd, Frame, Header, HeaderItem, HeaderValue, TypeTag, UcmError, UtcTime, Window};

/// One CCD, one 3x2 window at (10, 20), 2x2 binning on a 100x100 chip
fn exposure_frame() -> Frame {
    let mut header = Header::new();
    header.set_value("Exposure.Time", HeaderValue::Double(30.0), "seconds");
    let window = Window::new(10, 20, array![[1.0, 2.0, 3.0], [4.0, 5.5, -6.25]]);
    Frame::new(header, vec![Ccd::new(vec![window])], 2, 2, 100, 100)
}

/// Three CCDs with differing window counts and a header using every
/// supported type
fn ultracam_frame() -> Frame {
    let mut header = Header::new();
    header.set(HeaderItem::directory("Site", "observing site"));
    header.set_value(
        "Site.Observatory",
        HeaderValue::String("Roque de los Muchachos".into()),
        "observatory",
    );
    header.set_value("Site.Altitude", HeaderValue::Float(2332.0), "metres");
    header.set_value(
        "UT_date",
        HeaderValue::Time(UtcTime::new(53592, 2.580_092_173_302_546_1)),
        "UT at the centre of the exposure",
    );
    header.set_value("Frame.Number", HeaderValue::Int(-3), "");
    header.set_value("Frame.Count", HeaderValue::UInt(123_456), "");
    header.set_value("Frame.Good", HeaderValue::Bool(true), "");
    header.set_value("Frame.Flag", HeaderValue::UChar(b'Y'), "");
    header.set_value("Frame.Gain", HeaderValue::USInt(4), "");
    header.set_value("Cal.Coeffs", HeaderValue::DVector(vec![1.0, 0.5, 1e-7]), "");
    header.set_value("Cal.Cols", HeaderValue::IVector(vec![512, 513]), "bad columns");
    header.set_value("Cal.Weights", HeaderValue::FVector(vec![0.25; 4]), "");

    let ramp = |nx: usize, ny: usize, scale: f32| {
        Array2::from_shape_fn((ny, nx), |(y, x)| (y * nx + x) as f32 * scale)
    };

    let red = Ccd::new(vec![
        Window::new(1, 1, ramp(24, 16, 1.5)),
        Window::new(513, 1, ramp(24, 16, -0.5)),
    ]);
    let green = Ccd::new(vec![Window::new(100, 200, ramp(8, 8, 3.0))]);
    let blue = Ccd::default();
    Frame::new(header, vec![red, green, blue], 1, 1, 1080, 1032)
}

fn assert_pixels_equal(a: &Frame, b: &Frame) {
    for (ca, cb) in a.ccds().iter().zip(b.ccds()) {
        for (wa, wb) in ca.windows().iter().zip(cb.windows()) {
            let bits_a: Vec<u32> = wa.data().iter().map(|v| v.to_bits()).collect();
            let bits_b: Vec<u32> = wb.data().iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
    }
}

#[test]
fn test_exposure_scenario() {
    let frame = exposure_frame();
    let bytes = frame.to_bytes().unwrap();
    let decoded = Frame::from_bytes(&bytes).unwrap();

    assert!(decoded.same_layout(&frame));
    assert_eq!(decoded.ccd_count(), 1);
    assert_eq!(decoded.window_count(0), Some(1));
    assert_eq!(decoded.shape(0, 0), Some((2, 3)));
    assert_eq!(decoded.offset(0, 0), Some((10, 20)));
    assert_eq!(
        (decoded.xbin(), decoded.ybin(), decoded.nxtot(), decoded.nytot()),
        (2, 2, 100, 100)
    );

    let item = decoded.header().get("Exposure.Time").unwrap();
    assert_eq!(item.type_tag(), TypeTag::Double);
    assert_eq!(item.comment, "seconds");
    match item.value {
        HeaderValue::Double(v) => assert_eq!(v.to_bits(), 30.0f64.to_bits()),
        ref other => panic!("unexpected value {other:?}"),
    }
    assert_pixels_equal(&frame, &decoded);
}

#[test]
fn test_full_roundtrip_both_byte_orders() {
    let frame = ultracam_frame();
    for endian in [Endian::Little, Endian::Big] {
        let mut bytes = Vec::new();
        codec::encode_with(&frame, &mut bytes, endian).unwrap();
        let decoded = codec::decode(bytes.as_slice()).unwrap();

        assert!(decoded.same_layout(&frame));
        assert_pixels_equal(&frame, &decoded);

        let original: Vec<_> = frame.header().items().collect();
        let restored: Vec<_> = decoded.header().items().collect();
        assert_eq!(original, restored);
    }
}

#[test]
fn test_reencode_is_byte_identical() {
    let bytes = ultracam_frame().to_bytes().unwrap();
    let again = Frame::from_bytes(&bytes).unwrap().to_bytes().unwrap();
    assert_eq!(bytes, again);
}

/// Byte-swap a native encoding of `exposure_frame()` field by field
fn swap_exposure_bytes(native: &[u8]) -> Vec<u8> {
    fn take<'a>(src: &mut &'a [u8], n: usize) -> &'a [u8] {
        let (head, rest) = src.split_at(n);
        *src = rest;
        head
    }
    fn swapped(src: &mut &[u8], width: usize, out: &mut Vec<u8>) {
        out.extend(take(src, width).iter().rev());
    }
    fn string(src: &mut &[u8], out: &mut Vec<u8>) {
        let len = i32::from_ne_bytes(src[..4].try_into().unwrap()) as usize;
        swapped(src, 4, out);
        out.extend_from_slice(take(src, len));
    }

    let mut src = native;
    let mut out = Vec::new();
    swapped(&mut src, 4, &mut out); // magic
    swapped(&mut src, 4, &mut out); // item count
    string(&mut src, &mut out); // name
    swapped(&mut src, 4, &mut out); // type
    string(&mut src, &mut out); // comment
    swapped(&mut src, 8, &mut out); // double
    swapped(&mut src, 4, &mut out); // ccd count
    swapped(&mut src, 4, &mut out); // window count
    for _ in 0..9 {
        swapped(&mut src, 4, &mut out);
    }
    while !src.is_empty() {
        swapped(&mut src, 4, &mut out);
    }
    out
}

#[test]
fn test_manually_swapped_stream_decodes() {
    let frame = exposure_frame();
    let native = frame.to_bytes().unwrap();
    let swapped = swap_exposure_bytes(&native);
    assert_ne!(native, swapped);

    let reader = codec::FrameReader::new(swapped.as_slice(), Default::default()).unwrap();
    assert_eq!(reader.endian(), Endian::NATIVE.swapped());
    let decoded = reader.read_frame().unwrap();

    assert!(decoded.same_layout(&frame));
    assert_pixels_equal(&frame, &decoded);
    assert_eq!(
        decoded.header().get("Exposure.Time").unwrap().value,
        HeaderValue::Double(30.0)
    );

    // Writing in swapped order directly gives the same bytes
    let mut direct = Vec::new();
    codec::encode_with(&frame, &mut direct, Endian::NATIVE.swapped()).unwrap();
    assert_eq!(direct, swapped);
}

#[test]
fn test_uint16_window_widened() {
    let mut w = WireWriter::new(Vec::new(), Endian::Big);
    w.write_i32(MAGIC).unwrap();
    w.write_i32(0).unwrap(); // no header items
    w.write_i32(1).unwrap(); // one ccd
    w.write_i32(1).unwrap(); // one window
    let record = WindowRecord {
        llx: 5,
        lly: 6,
        nx: 2,
        ny: 1,
        xbin: 1,
        ybin: 1,
        nxtot: 1080,
        nytot: 1032,
        iout: 1,
    };
    w.write_bytes(&record.to_wire(Endian::Big)).unwrap();
    w.write_u16_array(&[0, 65535]).unwrap();
    let bytes = w.into_inner();

    let frame = Frame::from_bytes(&bytes).unwrap();
    let win = frame.window(0, 0).unwrap();
    assert_eq!(win.data(), &array![[0.0f32, 65535.0]]);

    // Written back as floats
    let rewritten = frame.to_bytes().unwrap();
    assert_eq!(rewritten.len(), bytes.len() + 4);
    let again = Frame::from_bytes(&rewritten).unwrap();
    assert_eq!(again.window(0, 0).unwrap().data(), win.data());
}

#[test]
fn test_bad_magic() {
    let mut bytes = exposure_frame().to_bytes().unwrap();
    bytes[..4].copy_from_slice(b"SIMP");
    let err = Frame::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, UcmError::BadMagic { .. }));
    assert!(err.to_string().contains("not a recognized frame file"));
}

#[test]
fn test_unsupported_types_fail_both_ways() {
    let reserved = [
        HeaderValue::Char,
        HeaderValue::LInt,
        HeaderValue::ULInt,
        HeaderValue::Date,
        HeaderValue::Position,
        HeaderValue::Telescope,
    ];
    for value in reserved {
        let tag = value.type_tag();
        assert!(!tag.is_supported());

        let mut frame = exposure_frame();
        frame.header_mut().set_value("Reserved", value, "");
        let err = frame.to_bytes().unwrap_err();
        assert!(err.is_unsupported(), "{tag}: {err}");

        let mut w = WireWriter::new(Vec::new(), Endian::NATIVE);
        w.write_i32(MAGIC).unwrap();
        w.write_i32(1).unwrap();
        w.write_string("Reserved").unwrap();
        w.write_i32(tag.code()).unwrap();
        w.write_string("").unwrap();
        w.write_bytes(&[0; 16]).unwrap();
        let err = Frame::from_bytes(&w.into_inner()).unwrap_err();
        assert!(err.is_unsupported(), "{tag}: {err}");
        assert!(!err.is_format_error());
    }
}

#[test]
fn test_every_truncation_is_a_format_error() {
    let bytes = ultracam_frame().to_bytes().unwrap();
    for len in 0..bytes.len() {
        let err = Frame::from_bytes(&bytes[..len]).unwrap_err();
        assert!(
            matches!(err, UcmError::Truncated { .. }),
            "length {len}: {err}"
        );
    }
}

#[test]
fn test_save_and_open() {
    let dir = TempDir::new().unwrap();
    let frame = ultracam_frame();

    let written = frame.save(&dir.path().join("run017_0042")).unwrap();
    assert_eq!(written.extension().unwrap(), "ucm");

    let reopened = Frame::open(&written).unwrap();
    assert!(reopened.same_layout(&frame));
    assert_pixels_equal(&frame, &reopened);
    assert_eq!(reopened.min(0), frame.min(0));
    assert_eq!(reopened.max(1), Some(63.0 * 3.0));
    assert_eq!(reopened.min(2), Some(0.0));
}

#[test]
fn test_save_big_endian_without_extension() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.output.byte_order = ByteOrder::Big;
    config.output.append_extension = false;

    let path = dir.path().join("frame.dat");
    let written = exposure_frame().save_with(&path, &config).unwrap();
    assert_eq!(written, path);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], &MAGIC.to_be_bytes());
    assert!(Frame::open(&path).unwrap().same_layout(&exposure_frame()));
}

#[test]
fn test_open_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.ucm");
    std::fs::write(&path, b"").unwrap();
    let err = Frame::open(&path).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_failed_save_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = exposure_frame().save(&dir.path().join("run")).unwrap();
    let before = std::fs::read(&path).unwrap();

    let mut frame = exposure_frame();
    frame.header_mut().set_value("Obs.Date", HeaderValue::Date, "");
    let err = frame.save(&path).unwrap_err();
    assert!(err.is_unsupported());

    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert!(Frame::open(&path).is_ok());
}

#[test]
fn test_latin1_comment_decodes() {
    let mut w = WireWriter::new(Vec::new(), Endian::Little);
    w.write_i32(MAGIC).unwrap();
    w.write_i32(1).unwrap();
    w.write_string("Site.Temp").unwrap();
    w.write_i32(TypeTag::Float.code()).unwrap();
    w.write_i32(5).unwrap();
    w.write_bytes(b"deg\xB0C").unwrap();
    w.write_f32(12.5).unwrap();
    w.write_i32(0).unwrap(); // no ccds
    let bytes = w.into_inner();

    let frame = Frame::from_bytes(&bytes).unwrap();
    let item = frame.header().get("Site.Temp").unwrap();
    assert_eq!(item.comment, "deg\u{b0}C");
    assert_eq!(item.value, HeaderValue::Float(12.5));
}

#[test]
fn test_limits_reject_oversized_counts() {
    let bytes = ultracam_frame().to_bytes().unwrap();
    let mut config = Config::default();
    config.limits.max_windows = 1;
    let err = codec::decode_with(bytes.as_slice(), &config.limits).unwrap_err();
    assert!(matches!(err, UcmError::InvalidFormat { .. }));
}

fn arb_window() -> impl Strategy<Value = Window> {
    (0usize..6, 0usize..6, -50i32..2000, -50i32..2000).prop_flat_map(|(nx, ny, llx, lly)| {
        prop::collection::vec(any::<f32>(), nx * ny).prop_map(move |pixels| {
            Window::new(llx, lly, Array2::from_shape_vec((ny, nx), pixels).unwrap())
        })
    })
}

fn arb_frame() -> impl Strategy<Value = Frame> {
    (
        prop::collection::vec(prop::collection::vec(arb_window(), 0..3), 0..4),
        prop::collection::vec((any::<f64>(), "[A-Za-z.]{1,12}"), 0..5),
        1i32..9,
        1i32..9,
        1i32..4096,
        1i32..4096,
    )
        .prop_map(|(ccds, items, xbin, ybin, nxtot, nytot)| {
            let header = items
                .into_iter()
                .map(|(v, name)| HeaderItem::new(name, HeaderValue::Double(v), "generated"))
                .collect();
            let ccds = ccds.into_iter().map(Ccd::new).collect();
            Frame::new(header, ccds, xbin, ybin, nxtot, nytot)
        })
}

proptest! {
    #[test]
    fn prop_roundtrip_preserves_layout_and_pixels(frame in arb_frame(), big in any::<bool>()) {
        let endian = if big { Endian::Big } else { Endian::Little };
        let mut bytes = Vec::new();
        codec::encode_with(&frame, &mut bytes, endian).unwrap();
        let decoded = codec::decode(bytes.as_slice()).unwrap();

        // A frame with no windows cannot carry its binning through the file
        let has_windows = frame.ccds().iter().any(|c| !c.is_empty());
        if has_windows {
            prop_assert!(decoded.same_layout(&frame));
        }
        prop_assert_eq!(decoded.ccd_count(), frame.ccd_count());
        assert_pixels_equal(&frame, &decoded);
        prop_assert_eq!(decoded.header().len(), frame.header().len());
    }

    #[test]
    fn prop_truncation_never_panics(frame in arb_frame(), cut in any::<prop::sample::Index>()) {
        let bytes = frame.to_bytes().unwrap();
        let len = cut.index(bytes.len());
        let result = Frame::from_bytes(&bytes[..len]);
        let truncated = matches!(result, Err(UcmError::Truncated { .. }));
        prop_assert!(truncated, "length {}: {:?}", len, result.err());
    }
}
