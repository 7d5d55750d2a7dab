//! Proptest generators for property-based testing.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proptest::prelude::*;

use persistkit_core::{Color, CountStyle, DataSize, MediaTime, Point, Rect, Size};

/// A finite double, weighted towards boundary values.
pub fn finite_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(0.0),
        1 => Just(-0.0),
        1 => Just(f64::MAX),
        1 => Just(f64::MIN),
        1 => Just(f64::MIN_POSITIVE),
        1 => Just(f64::EPSILON),
        6 => -1.0e12..1.0e12f64,
    ]
}

/// An integer, weighted towards boundary values.
pub fn edge_i64() -> impl Strategy<Value = i64> {
    prop_oneof![
        1 => Just(0i64),
        1 => Just(-1i64),
        1 => Just(i64::MAX),
        1 => Just(i64::MIN),
        6 => any::<i64>(),
    ]
}

pub fn point() -> impl Strategy<Value = Point> {
    (finite_f64(), finite_f64()).prop_map(|(x, y)| Point::new(x, y))
}

pub fn size() -> impl Strategy<Value = Size> {
    (finite_f64(), finite_f64()).prop_map(|(w, h)| Size::new(w, h))
}

pub fn rect() -> impl Strategy<Value = Rect> {
    (point(), size()).prop_map(|(origin, size)| Rect { origin, size })
}

/// Colors with components in the unit range, the range displays use.
pub fn color() -> impl Strategy<Value = Color> {
    (0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64)
        .prop_map(|(r, g, b, a)| Color::rgba(r, g, b, a))
}

pub fn duration() -> impl Strategy<Value = Duration> {
    prop_oneof![
        Just(Duration::ZERO),
        Just(Duration::MAX),
        (any::<u64>(), 0u32..1_000_000_000).prop_map(|(s, n)| Duration::new(s, n)),
    ]
}

/// Times within roughly a century either side of the epoch.
pub fn system_time() -> impl Strategy<Value = SystemTime> {
    (-3_000_000_000i64..3_000_000_000, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
        let base = if secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(secs as u64)
        } else {
            UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
        };
        base + Duration::from_nanos(u64::from(nanos))
    })
}

pub fn count_style() -> impl Strategy<Value = CountStyle> {
    prop_oneof![
        Just(CountStyle::File),
        Just(CountStyle::Memory),
        Just(CountStyle::Decimal),
        Just(CountStyle::Binary),
    ]
}

pub fn data_size() -> impl Strategy<Value = DataSize> {
    (edge_i64(), count_style()).prop_map(|(bytes, style)| DataSize::new(bytes, style))
}

pub fn media_time() -> impl Strategy<Value = MediaTime> {
    (edge_i64(), prop_oneof![Just(1i32), Just(600), Just(i32::MAX), 1..=i32::MAX])
        .prop_map(|(value, timescale)| MediaTime::new(value, timescale))
}

pub fn path() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec("[a-zA-Z0-9 _.\u{e9}\u{4e2d}-]{1,12}", 0..5)
        .prop_map(|parts| {
            let mut path = PathBuf::from("/");
            path.extend(parts);
            path
        })
}
