use crate::query::timeseries::TimeSeriesPoint;
use std::collections::BTreeSet;

/// Which traffic sources are drawn on the per-day chart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    visible: BTreeSet<String>,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visible.contains(name)
    }

    /// Flip a single source. Returns whether it is now visible.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.visible.remove(name) {
            false
        } else {
            self.visible.insert(name.to_string());
            true
        }
    }

    /// Select every available source, or clear the set if all of them are
    /// already selected.
    pub fn toggle_all<'a, I>(&mut self, available: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let available: BTreeSet<String> = available.into_iter().map(str::to_string).collect();
        if available.iter().all(|name| self.visible.contains(name)) {
            self.visible.clear();
        } else {
            self.visible = available;
        }
    }

    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Copy of `points` keeping only visible channels.
    pub fn retain_visible(&self, points: &[TimeSeriesPoint]) -> Vec<TimeSeriesPoint> {
        points
            .iter()
            .map(|point| {
                let mut point = point.clone();
                point.channels.retain(|name, _| self.is_visible(name));
                point
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const SOURCES: [&str; 3] = ["Facebook", "Reddit", "Direct/Other"];

    #[test]
    fn test_toggle_single() {
        let mut vis = Visibility::new();
        assert!(vis.toggle("Facebook"));
        assert!(vis.is_visible("Facebook"));
        assert!(!vis.toggle("Facebook"));
        assert!(!vis.is_visible("Facebook"));
    }

    #[test]
    fn test_toggle_all_from_empty_then_back() {
        let mut vis = Visibility::new();
        vis.toggle_all(SOURCES);
        assert_eq!(vis.len(), 3);
        assert!(SOURCES.iter().all(|s| vis.is_visible(s)));

        vis.toggle_all(SOURCES);
        assert!(vis.is_empty());
    }

    #[test]
    fn test_toggle_all_from_partial_selects_all() {
        let mut vis = Visibility::new();
        vis.toggle("Reddit");
        vis.toggle_all(SOURCES);
        assert_eq!(vis.len(), 3);
    }

    #[test]
    fn test_toggle_all_drops_stale_names() {
        let mut vis = Visibility::new();
        vis.toggle("Gone");
        vis.toggle_all(SOURCES);
        assert!(!vis.is_visible("Gone"));
        assert_eq!(vis.visible().count(), 3);
    }

    #[test]
    fn test_retain_visible() {
        let mut channels = BTreeMap::new();
        channels.insert("Facebook".to_string(), 4);
        channels.insert("Reddit".to_string(), 2);
        let points = vec![TimeSeriesPoint {
            date_key: "2024-01-01".to_string(),
            orders: 1,
            channels,
            is_estimated: true,
        }];

        let mut vis = Visibility::new();
        vis.toggle("Reddit");
        let filtered = vis.retain_visible(&points);
        assert_eq!(filtered[0].channels.len(), 1);
        assert_eq!(filtered[0].channels["Reddit"], 2);
        assert_eq!(filtered[0].orders, 1);
    }
}
