use serde::Serialize;

const CAFETERIA_BUCKET: &str = "cafeteria management committee";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Committee {
    #[serde(rename = "committee")]
    pub name: String,
    pub category: String,
}

/// Ordered committee → category table. Lookup order is significant: the first
/// entry that matches wins.
#[derive(Debug, Clone)]
pub struct CommitteeTable {
    entries: Vec<Committee>,
}

impl CommitteeTable {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|(name, category)| Committee {
                name: name.to_string(),
                category: category.to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn campus() -> Self {
        Self::new(&[
            ("Hostel", "Hostel Management"),
            ("Academic", "Academic Affairs"),
            ("Cafeteria Management Committee", "Canteen"),
            ("Infrastructure", "Infrastructure & Maintenance"),
            ("Transport", "Transport Services"),
            ("Library", "Library Services"),
            ("Sports", "Sports & Recreation"),
            ("Security", "Campus Security"),
            ("Anti-Ragging", "Anti-Ragging Cell"),
            ("Examination", "Examination Cell"),
        ])
    }

    pub fn committees(&self) -> &[Committee] {
        &self.entries
    }

    /// Maps a committee label to its committee entry. `None` means the label is
    /// not a known committee, which callers report as "no data".
    pub fn resolve(&self, label: &str) -> Option<&Committee> {
        self.match_value(label)
    }

    /// Two-phase match shared by label resolution and category bucketing:
    /// exact name/category match first, then committee-name containment.
    pub fn match_value(&self, value: &str) -> Option<&Committee> {
        self.match_position(value).map(|index| &self.entries[index])
    }

    /// Table index of the committee `value` belongs to.
    pub fn match_position(&self, value: &str) -> Option<usize> {
        let folded = fold(value);
        if folded.is_empty() {
            return None;
        }
        let needle = unify(&folded);

        self.entries
            .iter()
            .position(|entry| fold(&entry.name) == needle || fold(&entry.category) == needle)
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|entry| needle.contains(fold(&entry.name).as_str()))
            })
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Canteen and every "Cafeteria…" variant share one bucket.
fn unify(folded: &str) -> &str {
    if folded == "canteen" || folded.starts_with("cafeteria") {
        CAFETERIA_BUCKET
    } else {
        folded
    }
}
