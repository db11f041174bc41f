//! Evenly spaced sampling along lines

use adaslope_core::{Error, Result};
use geo::{Coord, Euclidean, Length, LineString};

/// Sample positions closer than this to the line end are folded into it.
const END_TOLERANCE: f64 = 1e-6;

/// Check a sampling interval is a positive, finite distance.
pub fn validate_interval(interval: f64) -> Result<()> {
    if interval.is_finite() && interval > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "interval",
            value: interval.to_string(),
            reason: "must be a positive distance".to_string(),
        })
    }
}

/// Points every `interval` units of arc length from the start of `line`,
/// always ending with its last vertex.
///
/// A line shorter than `interval` yields its two endpoints. An empty line
/// yields nothing and a single vertex yields itself.
pub fn densify(line: &LineString<f64>, interval: f64) -> Result<Vec<Coord<f64>>> {
    validate_interval(interval)?;

    let coords = &line.0;
    let (first, last) = match (coords.first(), coords.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Ok(Vec::new()),
    };
    if coords.len() == 1 {
        return Ok(vec![first]);
    }

    let length = line.length::<Euclidean>();
    let interior = ((length - END_TOLERANCE) / interval).ceil().max(1.0) as usize;

    let mut out = Vec::with_capacity(interior + 1);
    out.push(first);

    // walk segments once, distances are increasing
    let mut target = interval;
    let mut walked = 0.0;
    for seg in line.lines() {
        let seg_len = (seg.end.x - seg.start.x).hypot(seg.end.y - seg.start.y);
        while target < length - END_TOLERANCE && target <= walked + seg_len {
            let t = if seg_len > 0.0 {
                (target - walked) / seg_len
            } else {
                0.0
            };
            out.push(Coord {
                x: seg.start.x + t * (seg.end.x - seg.start.x),
                y: seg.start.y + t * (seg.end.y - seg.start.y),
            });
            target += interval;
        }
        walked += seg_len;
    }

    out.push(last);
    Ok(out)
}
