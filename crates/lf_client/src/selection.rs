use lf_core::curve::ResponseCurve;
use lf_protocol::ImageKind;
use rand::Rng;

use crate::record::ImageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Any,
    Only(ImageKind),
    Animals,
    /// Everything that is not an animal.
    Plants,
}

impl KindFilter {
    pub fn accepts(self, kind: ImageKind) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Only(wanted) => kind == wanted,
            KindFilter::Animals => kind.is_animal(),
            KindFilter::Plants => !kind.is_animal(),
        }
    }
}

/// Pick one record, favouring positions the age curve weights higher.
///
/// Candidates are the records `accept` lets through, visited in store order
/// (newest first). Each gets `weight = curve(rank / count)` and a score of
/// `uniform(0,1) * weight`; the highest score wins and ties keep the earlier
/// candidate. Returns `None` when nothing is accepted.
pub fn weighted_random<'a, F, R>(
    records: &'a [ImageRecord],
    accept: F,
    curve: &ResponseCurve,
    rng: &mut R,
) -> Option<&'a ImageRecord>
where
    F: Fn(&ImageRecord) -> bool,
    R: Rng + ?Sized,
{
    let count = records.iter().filter(|r| accept(*r)).count();
    if count == 0 {
        return None;
    }

    let mut best: Option<(&ImageRecord, f32)> = None;
    let candidates = records.iter().filter(|r| accept(*r));
    for (rank, record) in candidates.enumerate() {
        let weight = curve.evaluate(rank as f32 / count as f32);
        let score = rng.gen::<f32>() * weight;
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((record, score)),
        }
    }
    best.map(|(record, _)| record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;
    use lf_core::curve::CurveKey;
    use lf_protocol::Facing;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::path::Path;

    fn choose<'a>(
        recs: &'a [ImageRecord],
        filter: KindFilter,
        curve: &ResponseCurve,
        rng: &mut StdRng,
    ) -> Option<&'a ImageRecord> {
        weighted_random(recs, |r| filter.accepts(r.kind), curve, rng)
    }

    fn records(kinds: &[ImageKind]) -> Vec<ImageRecord> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                ImageRecord::new(RecordId::from(format!("r{i}")), Path::new("img"), *kind, Facing::Right)
            })
            .collect()
    }

    #[test]
    fn empty_candidates_give_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let curve = ResponseCurve::default();
        assert!(choose(&[], KindFilter::Any, &curve, &mut rng).is_none());
        let plants = records(&[ImageKind::Plant, ImageKind::Tree]);
        assert!(choose(&plants, KindFilter::Animals, &curve, &mut rng).is_none());
    }

    #[test]
    fn filter_restricts_candidates() {
        let mut rng = StdRng::seed_from_u64(2);
        let curve = ResponseCurve::default();
        let recs = records(&[ImageKind::Plant, ImageKind::Animal, ImageKind::Bush]);
        for _ in 0..50 {
            let pick = choose(&recs, KindFilter::Animals, &curve, &mut rng).expect("animal");
            assert_eq!(pick.id.as_str(), "r1");
            let pick = choose(&recs, KindFilter::Only(ImageKind::Bush), &curve, &mut rng)
                .expect("bush");
            assert_eq!(pick.id.as_str(), "r2");
            let pick = choose(&recs, KindFilter::Plants, &curve, &mut rng).expect("plant");
            assert_ne!(pick.kind, ImageKind::Animal);
        }
    }

    #[test]
    fn constant_curve_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let curve = ResponseCurve::Constant { value: 1.0 };
        let recs = records(&[ImageKind::Animal; 5]);
        let trials = 20_000;
        let mut hits: HashMap<String, usize> = HashMap::new();
        for _ in 0..trials {
            let pick = choose(&recs, KindFilter::Any, &curve, &mut rng).expect("pick");
            *hits.entry(pick.id.to_string()).or_default() += 1;
        }
        let expected = trials / recs.len();
        for record in &recs {
            let count = hits.get(record.id.as_str()).copied().unwrap_or(0);
            let deviation = (count as f64 - expected as f64).abs() / expected as f64;
            assert!(deviation < 0.08, "{} picked {count} times, expected ~{expected}", record.id);
        }
    }

    #[test]
    fn zero_weight_tail_is_never_picked_over_live_head() {
        let mut rng = StdRng::seed_from_u64(9);
        // Weight drops to zero from halfway down the list.
        let curve = ResponseCurve::Keyframes {
            points: vec![
                CurveKey { t: 0.0, value: 1.0 },
                CurveKey { t: 0.4, value: 1.0 },
                CurveKey { t: 0.5, value: 0.0 },
            ],
        };
        let recs = records(&[ImageKind::Animal; 4]);
        for _ in 0..200 {
            let pick = choose(&recs, KindFilter::Any, &curve, &mut rng).expect("pick");
            assert!(pick.id.as_str() == "r0" || pick.id.as_str() == "r1");
        }
    }

    #[test]
    fn all_zero_weights_keep_the_first_candidate() {
        let mut rng = StdRng::seed_from_u64(3);
        let curve = ResponseCurve::Constant { value: 0.0 };
        let recs = records(&[ImageKind::Animal; 3]);
        let pick = choose(&recs, KindFilter::Any, &curve, &mut rng).expect("pick");
        assert_eq!(pick.id.as_str(), "r0");
    }
}
