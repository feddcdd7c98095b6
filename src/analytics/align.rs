use chrono::{DateTime, Duration, Utc};

use crate::types::HistoryPoint;

/// Select the observation at or before `target` that is closest to it.
///
/// Points after `target` are never eligible. If the best candidate lies more
/// than `tolerance` before `target` the series has no usable observation for
/// this instant and `None` is returned. Equal distances keep the first point
/// seen.
pub fn nearest_preceding<'a>(
    points: &'a [HistoryPoint],
    target: DateTime<Utc>,
    tolerance: Duration,
) -> Option<&'a HistoryPoint> {
    let mut best: Option<(&HistoryPoint, Duration)> = None;

    for point in points {
        if point.timestamp > target {
            continue;
        }
        let distance = target - point.timestamp;
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((point, distance));
        }
    }

    best.filter(|(_, d)| *d <= tolerance).map(|(p, _)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuxMetrics;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn point(secs: i64, implied: f64) -> HistoryPoint {
        HistoryPoint {
            timestamp: at(secs),
            pt_discount: Some(0.01),
            implied_apy: Some(implied),
            metrics: AuxMetrics::default(),
        }
    }

    const DAY: i64 = 86_400;

    #[test]
    fn empty_series_has_no_match() {
        assert!(nearest_preceding(&[], at(0), Duration::days(2)).is_none());
    }

    #[test]
    fn picks_preceding_not_following() {
        let series = vec![point(0, 0.1), point(10 * DAY, 0.2), point(11 * DAY, 0.3)];
        // target sits much closer to the following point
        let target = at(10 * DAY + DAY / 2 + DAY / 4 + 100);
        let hit = nearest_preceding(&series, target, Duration::days(2)).unwrap();
        assert_eq!(hit.timestamp, at(10 * DAY));
    }

    #[test]
    fn exact_timestamp_matches() {
        let series = vec![point(0, 0.1), point(DAY, 0.2)];
        let hit = nearest_preceding(&series, at(DAY), Duration::days(2)).unwrap();
        assert_eq!(hit.implied_apy, Some(0.2));
    }

    #[test]
    fn stale_candidate_is_rejected() {
        let series = vec![point(0, 0.1), point(10 * DAY, 0.2)];
        let target = at(2 * DAY + 1);
        assert!(nearest_preceding(&series, target, Duration::days(2)).is_none());
        // exactly at the tolerance is still accepted
        assert!(nearest_preceding(&series, at(2 * DAY), Duration::days(2)).is_some());
    }

    #[test]
    fn only_future_points_is_no_match() {
        let series = vec![point(5 * DAY, 0.1), point(6 * DAY, 0.2)];
        assert!(nearest_preceding(&series, at(4 * DAY), Duration::days(2)).is_none());
    }

    #[test]
    fn duplicate_timestamps_keep_first() {
        let series = vec![point(DAY, 0.1), point(DAY, 0.2)];
        let hit = nearest_preceding(&series, at(DAY + 60), Duration::days(2)).unwrap();
        assert_eq!(hit.implied_apy, Some(0.1));
    }
}
