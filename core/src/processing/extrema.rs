use crate::prelude::Sample;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Nearest and farthest sample of one revolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extrema {
    pub nearest: Sample,
    pub farthest: Sample,
}

/// Ties on distance go to the smallest angle, then to the earliest sample.
pub fn find_extrema(samples: &[Sample]) -> Option<Extrema> {
    let nearest = samples
        .iter()
        .min_by_key(|s| (s.distance_mm, s.angle))?;
    let farthest = samples
        .iter()
        .min_by_key(|s| (Reverse(s.distance_mm), s.angle))?;

    Some(Extrema {
        nearest: *nearest,
        farthest: *farthest,
    })
}
